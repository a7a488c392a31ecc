//! The scan → reconcile → classify/validate pipeline for one generation

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use log::debug;

use super::checkers::BuiltinChecker;
use super::classifier::classify;
use super::detector::{FenceScanner, ScanMode};
use super::identity::{IdentityTracker, Reconciliation};
use super::validator::Validator;
use super::{DiagramBlock, ParseResult};
use crate::error::PipelineFault;

/// A finished parse and the id plan it was built with
#[derive(Debug, Clone)]
pub struct ParseOutput {
    pub result: ParseResult,
    pub reconciliation: Reconciliation,
}

/// Stateless parse pipeline, shared between the session and worker threads
#[derive(Clone)]
pub struct DiagramPipeline {
    scanner: FenceScanner,
    validator: Validator,
}

impl DiagramPipeline {
    #[must_use]
    pub const fn new(scanner: FenceScanner, validator: Validator) -> Self {
        Self { scanner, validator }
    }

    /// Copy of this pipeline scanning in another mode
    #[must_use]
    pub fn with_scan_mode(&self, mode: ScanMode) -> Self {
        Self {
            scanner: self.scanner.clone().with_mode(mode),
            validator: self.validator.clone(),
        }
    }

    #[must_use]
    pub const fn scanner(&self) -> &FenceScanner {
        &self.scanner
    }

    /// Parse a document snapshot for `generation`
    ///
    /// `identities` holds the ids of the last published generation; the
    /// returned plan must be committed by the caller if it publishes.
    ///
    /// # Errors
    ///
    /// Returns a `PipelineFault` if any stage panics, for example inside a
    /// foreign grammar checker
    pub fn run(
        &self,
        text: &str,
        generation: u64,
        identities: &IdentityTracker,
    ) -> Result<ParseOutput, PipelineFault> {
        panic::catch_unwind(AssertUnwindSafe(|| self.run_inner(text, generation, identities)))
            .map_err(|payload| PipelineFault::from_panic(payload.as_ref()))
    }

    fn run_inner(&self, text: &str, generation: u64, identities: &IdentityTracker) -> ParseOutput {
        let started = Instant::now();

        let raw_blocks = self.scanner.scan(text);
        let reconciliation = identities.reconcile(raw_blocks.len());

        let work: Vec<_> = reconciliation
            .ids
            .iter()
            .zip(&raw_blocks)
            .map(|(id, block)| (id.clone(), block, classify(&block.content)))
            .collect();

        let mut validations = self.validator.validate_all(&work);

        let mut diagrams = Vec::with_capacity(work.len());
        let mut errors = Vec::new();

        for (id, block, kind) in work {
            let validation = validations.remove(&id).unwrap_or_default();
            let error_message = validation.first_error().map(ToString::to_string);

            errors.extend(validation.errors);
            diagrams.push(DiagramBlock {
                id,
                kind,
                content: block.content.clone(),
                start_line: block.start_line,
                end_line: block.end_line,
                content_start_line: block.content_start_line,
                closed: block.closed,
                has_error: error_message.is_some(),
                error_message,
            });
        }

        let parsing_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        debug!(
            generation = generation,
            diagrams = diagrams.len(),
            errors = errors.len(),
            parsing_time_ms = parsing_time_ms;
            "Parsed document"
        );

        ParseOutput {
            result: ParseResult {
                generation,
                diagrams,
                errors,
                parsing_time_ms,
                degraded: false,
            },
            reconciliation,
        }
    }
}

impl Default for DiagramPipeline {
    fn default() -> Self {
        Self::new(FenceScanner::new(), Validator::new(Arc::new(BuiltinChecker)))
    }
}
