//! Cursor ↔ diagram lookup against the published parse result

use std::sync::Arc;

use super::position::CursorPosition;
use crate::parser::{DiagramBlock, DiagramId, ParseResult};

/// Bidirectional lookup between text positions and diagrams
///
/// Holds the latest published result only; it is swapped wholesale on
/// publication and never sees a discarded generation.
#[derive(Debug, Clone, Default)]
pub struct DiagramMapper {
    result: Arc<ParseResult>,
}

impl DiagramMapper {
    #[must_use]
    pub fn new(result: Arc<ParseResult>) -> Self {
        Self { result }
    }

    /// Replace the result lookups run against
    pub fn publish(&mut self, result: Arc<ParseResult>) {
        self.result = result;
    }

    #[must_use]
    pub fn result(&self) -> &Arc<ParseResult> {
        &self.result
    }

    /// The diagram whose fenced range contains the position's line
    #[must_use]
    pub fn diagram_at(&self, position: CursorPosition) -> Option<&DiagramBlock> {
        let diagrams = &self.result.diagrams;
        // blocks are sorted and disjoint
        let index = diagrams.partition_point(|d| d.end_line < position.line);
        diagrams
            .get(index)
            .filter(|d| d.contains_line(position.line))
    }

    /// Where the editor caret should go when a diagram is selected
    #[must_use]
    pub fn target_position_for(&self, id: &DiagramId) -> Option<CursorPosition> {
        self.result
            .diagram(id)
            .map(|d| CursorPosition::line_start(d.start_line))
    }
}
