use std::collections::BTreeMap;

use crate::error::{StoreError, StoreResult};
use crate::store::FileStore;

/// In-memory file store
#[derive(Debug, Default, Clone)]
pub struct MemoryFileStore {
    files: BTreeMap<String, String>,
}

impl MemoryFileStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths currently stored, sorted
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }
}

impl FileStore for MemoryFileStore {
    fn read_text(&self, path: &str) -> StoreResult<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::not_found(path))
    }

    fn write_text(&mut self, path: &str, text: &str) -> StoreResult<()> {
        if path.is_empty() {
            return Err(StoreError::write_failed(path, "empty path"));
        }
        self.files.insert(path.to_string(), text.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_basic_operations() {
        let mut store = MemoryFileStore::new();
        store.write_text("b.md", "second").unwrap();
        store.write_text("a.md", "first").unwrap();

        assert_eq!(store.read_text("a.md").unwrap(), "first");
        assert_eq!(store.paths(), vec!["a.md".to_string(), "b.md".to_string()]);

        store.write_text("a.md", "rewritten").unwrap();
        assert_eq!(store.read_text("a.md").unwrap(), "rewritten");
    }

    #[test]
    fn empty_path_is_rejected() {
        let mut store = MemoryFileStore::new();
        assert!(matches!(
            store.write_text("", "x"),
            Err(StoreError::WriteFailed { .. })
        ));
    }
}
