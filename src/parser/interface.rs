//! Collaborator traits at the edges of the pipeline

use crate::error::{CheckerError, RenderError};

/// Verdict of a grammar checker on one diagram text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrammarOutcome {
    /// The text parses
    Ok,
    /// The text was rejected; the message may mention "line N"
    Failure(String),
}

impl GrammarOutcome {
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure(message.into())
    }

    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// Trait for diagram grammar checkers
///
/// Implementations are called from several threads at once, one call per
/// block.
pub trait GrammarChecker: Send + Sync {
    /// A short name for logging
    fn name(&self) -> &str;

    /// Check one diagram text
    ///
    /// # Errors
    ///
    /// Returns an error if the checker itself could not run. A rejected
    /// diagram is `Ok(GrammarOutcome::Failure(..))`, not an error.
    fn check(&self, diagram_text: &str) -> Result<GrammarOutcome, CheckerError>;

    /// Called once before the blocks of a parse pass are checked
    fn begin_pass(&self) {}
}

/// Trait for the external diagram renderer
pub trait DiagramRenderer: Send + Sync {
    /// Render one diagram text into an opaque artifact
    ///
    /// `diagram_id` only correlates the call; the output must depend on the
    /// text alone.
    ///
    /// # Errors
    ///
    /// Returns an error if the rendering engine fails on the text
    fn render(&self, diagram_id: &str, diagram_text: &str) -> Result<Vec<u8>, RenderError>;
}
