#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Live extraction, validation and cursor sync for Mermaid diagrams
//! embedded in a text document.

uniffi::setup_scaffolding!();

pub mod config;
pub mod document;
pub mod error;
pub mod ffi;
pub mod parser;
pub mod render;
pub mod session;
pub mod settings;
pub mod store;
pub mod sync;

pub use config::EngineConfig;
pub use document::{CursorPosition, DiagramMapper};
pub use error::{
    CheckerError, ConfigError, ConfigResult, ParchError, ParchResult, PipelineFault, RenderError,
    SessionError, StoreError, StoreResult,
};
pub use parser::{DiagramBlock, DiagramId, DiagramKind, ParseResult, Severity, SyntaxError};
pub use render::RenderOutput;
pub use session::{DocumentSession, EditorHost};
pub use store::{DocumentFile, FileStore, FileType};
pub use sync::{LiveHandle, LiveSession};
