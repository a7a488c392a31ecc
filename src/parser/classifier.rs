//! Diagram type classification from the declaration line

use std::sync::LazyLock;

use regex::Regex;

use super::DiagramKind;

/// Ordered declaration patterns; the first match wins.
static DECLARATIONS: LazyLock<Vec<(DiagramKind, Regex)>> = LazyLock::new(|| {
    [
        (DiagramKind::Flowchart, r"^(?:graph|flowchart)\b"),
        (DiagramKind::Sequence, r"^sequencediagram\b"),
        (DiagramKind::Class, r"^classdiagram(?:-v2)?\b"),
        (DiagramKind::State, r"^statediagram(?:-v2)?\b"),
        (DiagramKind::EntityRelationship, r"^erdiagram\b"),
        (DiagramKind::Gantt, r"^gantt\b"),
        (DiagramKind::Pie, r"^pie\b"),
        (DiagramKind::Journey, r"^journey\b"),
        (DiagramKind::GitGraph, r"^gitgraph\b"),
        (DiagramKind::Requirement, r"^requirementdiagram\b"),
        (
            DiagramKind::C4Context,
            r"^c4(?:context|container|component|dynamic|deployment)\b",
        ),
        (DiagramKind::Mindmap, r"^mindmap\b"),
        (DiagramKind::Timeline, r"^timeline\b"),
    ]
    .into_iter()
    .map(|(kind, pattern)| {
        let regex = Regex::new(&format!("(?i){pattern}")).expect("declaration pattern is valid");
        (kind, regex)
    })
    .collect()
});

/// The first non-blank line of a block, trimmed
#[must_use]
pub fn declaration_line(content: &str) -> Option<(usize, &str)> {
    content
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .find(|(_, line)| !line.is_empty())
}

/// Classify a block by its declaration line
#[must_use]
pub fn classify(content: &str) -> DiagramKind {
    declaration_line(content).map_or(DiagramKind::Unknown, |(_, line)| classify_line(line))
}

/// Classify a single, already trimmed declaration line
#[must_use]
pub fn classify_line(line: &str) -> DiagramKind {
    DECLARATIONS
        .iter()
        .find(|(_, regex)| regex.is_match(line))
        .map_or(DiagramKind::Unknown, |(kind, _)| *kind)
}
