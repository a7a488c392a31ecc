//! Diagram extraction pipeline
//!
//! A document is split into fenced diagram blocks, each block is classified
//! and validated on its own, and block identities are carried from one parse
//! generation to the next.
//!
//! Key properties:
//! - Line numbers are 1-based and document-absolute
//! - A failure in one block never changes the outcome of another
//! - Raw block content is preserved exactly for fingerprinting

pub mod checkers;
pub mod classifier;
pub mod detector;
pub mod identity;
pub mod interface;
pub mod manager;
pub mod validator;

pub use checkers::{BuiltinChecker, FallbackChecker, FallbackPolicy};
pub use classifier::classify;
pub use detector::{DetectionConfig, FenceScanner, RawBlock, ScanMode};
pub use identity::{IdentityTracker, Reconciliation};
pub use interface::{DiagramRenderer, GrammarChecker, GrammarOutcome};
pub use manager::DiagramPipeline;
pub use validator::{Validation, Validator};

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Diagram type tag assigned by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagramKind {
    Flowchart,
    Sequence,
    Class,
    State,
    #[serde(rename = "er")]
    EntityRelationship,
    Gantt,
    Pie,
    Journey,
    #[serde(rename = "gitgraph")]
    GitGraph,
    Requirement,
    #[serde(rename = "c4context")]
    C4Context,
    Mindmap,
    Timeline,
    Unknown,
}

impl DiagramKind {
    /// The wire tag for this kind
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Flowchart => "flowchart",
            Self::Sequence => "sequence",
            Self::Class => "class",
            Self::State => "state",
            Self::EntityRelationship => "er",
            Self::Gantt => "gantt",
            Self::Pie => "pie",
            Self::Journey => "journey",
            Self::GitGraph => "gitgraph",
            Self::Requirement => "requirement",
            Self::C4Context => "c4context",
            Self::Mindmap => "mindmap",
            Self::Timeline => "timeline",
            Self::Unknown => "unknown",
        }
    }

    #[must_use]
    pub const fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl fmt::Display for DiagramKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Stable opaque identifier of a diagram within one document session
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiagramId(String);

impl DiagramId {
    /// Mint a fresh identifier
    #[must_use]
    pub fn mint() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for DiagramId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for DiagramId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for DiagramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Severity of a located diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

/// A located diagnostic, document-absolute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxError {
    pub line: usize,
    pub column: usize,
    pub message: String,
    pub severity: Severity,
}

impl SyntaxError {
    pub fn error(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
            severity: Severity::Error,
        }
    }

    pub fn warning(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
            severity: Severity::Warning,
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// One fenced diagram region of the current document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramBlock {
    pub id: DiagramId,
    #[serde(rename = "type")]
    pub kind: DiagramKind,
    /// Inner text between the fences
    pub content: String,
    /// Line of the opening fence
    pub start_line: usize,
    /// Line of the closing fence, or the last line for an unclosed block
    pub end_line: usize,
    /// Line holding the first line of `content`
    pub content_start_line: usize,
    /// False when the block runs to the end of the document without a fence
    pub closed: bool,
    pub has_error: bool,
    pub error_message: Option<String>,
}

impl DiagramBlock {
    /// Check whether a 1-based line falls inside this block
    #[must_use]
    pub const fn contains_line(&self, line: usize) -> bool {
        line >= self.start_line && line <= self.end_line
    }
}

/// Outcome of one parse generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResult {
    pub generation: u64,
    pub diagrams: Vec<DiagramBlock>,
    pub errors: Vec<SyntaxError>,
    pub parsing_time_ms: u64,
    /// Set when the pipeline faulted and the result stands in for it
    pub degraded: bool,
}

impl ParseResult {
    /// An empty result, used before the first publication
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            generation: 0,
            diagrams: Vec::new(),
            errors: Vec::new(),
            parsing_time_ms: 0,
            degraded: false,
        }
    }

    /// The result published when the pipeline itself failed
    #[must_use]
    pub fn degraded(generation: u64, message: impl Into<String>) -> Self {
        Self {
            generation,
            diagrams: Vec::new(),
            errors: vec![SyntaxError::error(1, 1, message)],
            parsing_time_ms: 0,
            degraded: true,
        }
    }

    /// Find a diagram by id
    #[must_use]
    pub fn diagram(&self, id: &DiagramId) -> Option<&DiagramBlock> {
        self.diagrams.iter().find(|d| &d.id == id)
    }

    /// Number of error-severity diagnostics
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors.iter().filter(|e| e.is_error()).count()
    }

    /// Summary statistics for status displays
    #[must_use]
    pub fn stats(&self) -> ParseStats {
        let mut diagrams_by_type = BTreeMap::new();
        for diagram in &self.diagrams {
            *diagrams_by_type
                .entry(diagram.kind.tag().to_string())
                .or_insert(0) += 1;
        }

        ParseStats {
            total_diagrams: self.diagrams.len(),
            total_errors: self.error_count(),
            parsing_time_ms: self.parsing_time_ms,
            diagrams_by_type,
        }
    }
}

impl Default for ParseResult {
    fn default() -> Self {
        Self::empty()
    }
}

/// Parsing statistics for one result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseStats {
    pub total_diagrams: usize,
    pub total_errors: usize,
    pub parsing_time_ms: u64,
    pub diagrams_by_type: BTreeMap<String, usize>,
}
