//! Error types for the parch engine
//!
//! Per-diagram failures (syntax errors, render failures) travel as data on the
//! parse result. The types here cover the infrastructure around them.

use std::any::Any;
use std::path::PathBuf;

use thiserror::Error;

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file does not exist
    #[error("Configuration file not found: {}", .0.display())]
    MissingFile(PathBuf),

    /// The configuration file could not be read
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration is not valid TOML for this schema
    #[error("Invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A record could not be written back as TOML
    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A field parsed but holds an unusable value
    #[error("Invalid value for `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl ConfigError {
    /// Create an invalid value error
    pub fn invalid_value(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// The grammar checker itself could not run
///
/// This is distinct from the checker rejecting a diagram, which is reported
/// as a `SyntaxError` on the block.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckerError {
    /// The backend is unreachable or crashed
    #[error("Grammar checker unavailable: {0}")]
    Unavailable(String),
}

impl CheckerError {
    /// Create an unavailable error
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable(reason.into())
    }
}

/// Rendering errors reported by the external renderer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// The renderer rejected syntactically valid content
    #[error("Render failed: {0}")]
    Failed(String),

    /// No renderer is attached to the session
    #[error("No renderer attached")]
    NoRenderer,
}

impl RenderError {
    /// Create a render failure
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }
}

/// An unexpected internal failure while producing a parse result
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Internal parse failure: {reason}")]
pub struct PipelineFault {
    pub reason: String,
}

impl PipelineFault {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Build a fault from a caught panic payload
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        Self::new(panic_message(payload))
    }
}

/// Text carried by a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// File store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Nothing stored under the path
    #[error("File not found: {0}")]
    NotFound(String),

    /// The store refused or failed the write
    #[error("Failed to write {path}: {reason}")]
    WriteFailed { path: String, reason: String },
}

impl StoreError {
    /// Create a not found error
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create a write failure
    pub fn write_failed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::WriteFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for file store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Document session errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Save requested for a document that has never had a path
    #[error("Document has no file path")]
    MissingPath,

    /// The file store failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The live session driving the document has shut down
    #[error("Document session has stopped")]
    Stopped,
}

/// Unified error type handed to hosts
#[derive(Debug, Error, uniffi::Error)]
#[uniffi(flat_error)]
pub enum ParchError {
    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// File store error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Session error
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Result type for host-facing operations
pub type ParchResult<T> = Result<T, ParchError>;
