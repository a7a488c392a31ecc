//! Per-block syntax validation
//!
//! Turns grammar checker verdicts into document-located diagnostics. Blocks
//! are validated in parallel; results are keyed by diagram id so that the
//! order in which checks finish never matters.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use rayon::prelude::*;
use regex::Regex;

use super::detector::RawBlock;
use super::interface::{GrammarChecker, GrammarOutcome};
use super::{DiagramId, DiagramKind, SyntaxError};

static LINE_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bline\s+(\d+)").expect("line pattern is valid"));

static NODE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*)\s*[\[\(]").expect("node id pattern is valid")
});

const EMPTY_CONTENT: &str = "Empty diagram content";
const MAX_NODE_ID_LEN: usize = 50;

/// Validation verdict for one block
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Validation {
    pub is_valid: bool,
    /// Diagnostics, document-absolute, errors first
    pub errors: Vec<SyntaxError>,
}

impl Validation {
    /// First error-severity message, if any
    #[must_use]
    pub fn first_error(&self) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.is_error())
            .map(|e| e.message.as_str())
    }
}

/// Block validator backed by a grammar checker
#[derive(Clone)]
pub struct Validator {
    checker: Arc<dyn GrammarChecker>,
    lint: bool,
}

impl Validator {
    #[must_use]
    pub fn new(checker: Arc<dyn GrammarChecker>) -> Self {
        Self {
            checker,
            lint: true,
        }
    }

    /// Enable or disable the warning-level lint pass
    #[must_use]
    pub fn with_lint(mut self, lint: bool) -> Self {
        self.lint = lint;
        self
    }

    #[must_use]
    pub fn checker(&self) -> &Arc<dyn GrammarChecker> {
        &self.checker
    }

    /// Validate one block
    #[must_use]
    pub fn validate(&self, block: &RawBlock, kind: DiagramKind) -> Validation {
        if block.content.trim().is_empty() {
            return Validation {
                is_valid: false,
                errors: vec![SyntaxError::error(block.content_start_line, 1, EMPTY_CONTENT)],
            };
        }

        let mut errors = Vec::new();
        match self.checker.check(&block.content) {
            Ok(GrammarOutcome::Ok) => {}
            Ok(GrammarOutcome::Failure(message)) => {
                let line = locate(block, reported_line(&message));
                errors.push(SyntaxError::error(line, 1, message));
            }
            Err(err) => {
                errors.push(SyntaxError::error(block.content_start_line, 1, err.to_string()));
            }
        }

        if self.lint {
            errors.extend(lint(block, kind));
        }

        Validation {
            is_valid: !errors.iter().any(SyntaxError::is_error),
            errors,
        }
    }

    /// Validate a generation's blocks in parallel, correlated by id
    #[must_use]
    pub fn validate_all(
        &self,
        blocks: &[(DiagramId, &RawBlock, DiagramKind)],
    ) -> HashMap<DiagramId, Validation> {
        self.checker.begin_pass();
        blocks
            .par_iter()
            .map(|(id, block, kind)| (id.clone(), self.validate(block, *kind)))
            .collect()
    }
}

/// Block-relative line mentioned in a checker message, defaulting to 1
fn reported_line(message: &str) -> usize {
    LINE_REFERENCE
        .captures(message)
        .and_then(|caps| caps[1].parse::<usize>().ok())
        .filter(|line| *line > 0)
        .unwrap_or(1)
}

/// Map a block-relative content line to a document line inside the block
fn locate(block: &RawBlock, relative: usize) -> usize {
    let offset = relative.saturating_sub(1).min(block.line_count());
    (block.content_start_line + offset)
        .clamp(block.content_start_line, block.end_line.max(block.content_start_line))
}

/// Warning-level checks that never invalidate a block
fn lint(block: &RawBlock, kind: DiagramKind) -> Vec<SyntaxError> {
    let mut warnings = Vec::new();

    for (index, line) in block.content.lines().enumerate() {
        let line_number = block.content_start_line + index;

        // erDiagram cardinality markers like `||--o{` are not brackets
        if kind != DiagramKind::EntityRelationship && has_unmatched_brackets(line) {
            warnings.push(SyntaxError::warning(line_number, 1, "Unmatched brackets detected"));
        }

        if has_invalid_node_id(line) {
            warnings.push(SyntaxError::warning(line_number, 1, "Invalid characters in node ID"));
        }
    }

    warnings
}

fn has_unmatched_brackets(line: &str) -> bool {
    let mut stack = Vec::new();
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            _ if in_quotes => {}
            '(' => stack.push(')'),
            '[' => stack.push(']'),
            '{' => stack.push('}'),
            ')' | ']' | '}' => {
                if stack.pop() != Some(ch) {
                    return true;
                }
            }
            _ => {}
        }
    }

    !stack.is_empty()
}

fn has_invalid_node_id(line: &str) -> bool {
    NODE_ID.captures_iter(line).any(|caps| {
        let id = &caps[1];
        id.len() > MAX_NODE_ID_LEN || id.starts_with("__")
    })
}
