//! Primary/fallback checker composition

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::CheckerError;
use crate::parser::interface::{GrammarChecker, GrammarOutcome};

/// When a degraded checker tries its primary backend again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Stay on the fallback for the rest of the session after one failure
    #[default]
    Permanent,
    /// Probe the primary again on every Nth parse pass while degraded
    RetryEvery(u32),
}

/// Checker that prefers `primary` and switches to `fallback` when the
/// primary cannot run
pub struct FallbackChecker {
    primary: Arc<dyn GrammarChecker>,
    fallback: Arc<dyn GrammarChecker>,
    policy: FallbackPolicy,
    degraded: AtomicBool,
    probing: AtomicBool,
    passes_degraded: AtomicU32,
}

impl FallbackChecker {
    #[must_use]
    pub fn new(
        primary: Arc<dyn GrammarChecker>,
        fallback: Arc<dyn GrammarChecker>,
        policy: FallbackPolicy,
    ) -> Self {
        Self {
            primary,
            fallback,
            policy,
            degraded: AtomicBool::new(false),
            probing: AtomicBool::new(false),
            passes_degraded: AtomicU32::new(0),
        }
    }

    /// Whether checks currently go to the fallback
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    #[must_use]
    pub const fn policy(&self) -> FallbackPolicy {
        self.policy
    }

    fn use_primary(&self) -> bool {
        !self.is_degraded() || self.probing.load(Ordering::SeqCst)
    }

    fn degrade(&self, err: &CheckerError) {
        self.probing.store(false, Ordering::SeqCst);
        if !self.degraded.swap(true, Ordering::SeqCst) {
            warn!(
                primary = self.primary.name(),
                fallback = self.fallback.name(),
                error:% = err;
                "Grammar checker failed, switching to fallback"
            );
        }
    }

    fn recover(&self) {
        if self.degraded.swap(false, Ordering::SeqCst) {
            info!(primary = self.primary.name(); "Grammar checker recovered");
        }
        self.probing.store(false, Ordering::SeqCst);
        self.passes_degraded.store(0, Ordering::SeqCst);
    }
}

impl GrammarChecker for FallbackChecker {
    fn name(&self) -> &str {
        if self.is_degraded() {
            self.fallback.name()
        } else {
            self.primary.name()
        }
    }

    fn check(&self, diagram_text: &str) -> Result<GrammarOutcome, CheckerError> {
        if self.use_primary() {
            match self.primary.check(diagram_text) {
                Ok(outcome) => {
                    if self.is_degraded() {
                        self.recover();
                    }
                    return Ok(outcome);
                }
                Err(err) => self.degrade(&err),
            }
        }
        self.fallback.check(diagram_text)
    }

    fn begin_pass(&self) {
        self.primary.begin_pass();
        self.fallback.begin_pass();

        if let FallbackPolicy::RetryEvery(every) = self.policy {
            if every > 0 && self.is_degraded() {
                let passes = self.passes_degraded.fetch_add(1, Ordering::SeqCst) + 1;
                self.probing.store(passes % every == 0, Ordering::SeqCst);
            }
        }
    }
}
