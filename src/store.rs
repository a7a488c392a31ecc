use std::fmt::Debug;

use crate::error::StoreResult;

pub mod file;
pub mod memory;

pub use file::{DocumentFile, FileType};
pub use memory::MemoryFileStore;

/// Source and sink of raw document text
///
/// Dialogs and disk access live with the host; the engine only exchanges
/// text with it.
pub trait FileStore: Send + Sync + Debug {
    /// Read the text stored under `path`
    ///
    /// # Errors
    ///
    /// Returns an error if nothing is stored under the path or reading fails
    fn read_text(&self, path: &str) -> StoreResult<String>;

    /// Write `text` under `path`, replacing what was there
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails
    fn write_text(&mut self, path: &str, text: &str) -> StoreResult<()>;
}

/// Read a file from `store` and describe it as a document
///
/// # Errors
///
/// Returns an error if the store cannot read the path
pub fn load(store: &dyn FileStore, path: &str) -> StoreResult<DocumentFile> {
    let content = store.read_text(path)?;
    Ok(DocumentFile::from_path(path, content))
}
