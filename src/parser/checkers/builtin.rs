//! Local heuristic grammar checker
#![allow(clippy::unused_self)]

use crate::error::CheckerError;
use crate::parser::classifier::{classify_line, declaration_line};
use crate::parser::interface::{GrammarChecker, GrammarOutcome};
use crate::parser::DiagramKind;

/// In-process checker used when no external grammar engine is attached,
/// and as the fallback when one fails
///
/// It only knows the declaration keywords and, for flowcharts, bracket
/// balance. Anything deeper is left to the external engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinChecker;

impl GrammarChecker for BuiltinChecker {
    fn name(&self) -> &str {
        "builtin"
    }

    fn check(&self, diagram_text: &str) -> Result<GrammarOutcome, CheckerError> {
        let Some((line_number, line)) = declaration_line(diagram_text) else {
            return Ok(GrammarOutcome::failure("Empty diagram content"));
        };

        let kind = classify_line(line);
        if !kind.is_known() {
            return Ok(GrammarOutcome::failure(format!(
                "Invalid diagram declaration at line {line_number}: '{line}'"
            )));
        }

        if kind == DiagramKind::Flowchart {
            if let Some(outcome) = self.check_brackets(diagram_text) {
                return Ok(outcome);
            }
        }

        Ok(GrammarOutcome::Ok)
    }
}

impl BuiltinChecker {
    /// Bracket balance across the whole block, ignoring quoted text
    fn check_brackets(&self, text: &str) -> Option<GrammarOutcome> {
        let mut stack: Vec<(char, usize)> = Vec::new();

        for (index, line) in text.lines().enumerate() {
            let line_number = index + 1;
            let mut in_quotes = false;

            for ch in line.chars() {
                match ch {
                    '"' => in_quotes = !in_quotes,
                    _ if in_quotes => {}
                    '(' | '[' | '{' => stack.push((ch, line_number)),
                    ')' | ']' | '}' => {
                        let expected = match ch {
                            ')' => '(',
                            ']' => '[',
                            _ => '{',
                        };
                        match stack.pop() {
                            Some((open, _)) if open == expected => {}
                            _ => {
                                return Some(GrammarOutcome::failure(format!(
                                    "Unexpected '{ch}' at line {line_number}"
                                )));
                            }
                        }
                    }
                    _ => {}
                }
            }
        }

        stack.pop().map(|(open, line_number)| {
            GrammarOutcome::failure(format!("Unclosed '{open}' opened at line {line_number}"))
        })
    }
}
