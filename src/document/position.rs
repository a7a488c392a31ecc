use serde::{Deserialize, Serialize};

/// A caret position in document coordinates, 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CursorPosition {
    pub line: usize,
    pub column: usize,
}

impl CursorPosition {
    #[must_use]
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Start of a line
    #[must_use]
    pub const fn line_start(line: usize) -> Self {
        Self { line, column: 1 }
    }
}
