//! Engine configuration
//!
//! Every section is optional in the TOML file; missing keys take their
//! defaults.
//!
//! ```toml
//! [scheduler]
//! input_debounce_ms = 300
//! render_debounce_ms = 500
//!
//! [scanner]
//! fence = "```"
//! aliases = ["mermaid", "mmd"]
//! bare_fence_is_diagram = false
//!
//! [validation]
//! lint = true
//! fallback = { retry_every = 5 }
//! ```

use std::fs;
use std::path::Path;
use std::sync::Arc;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::parser::{
    BuiltinChecker, DetectionConfig, DiagramPipeline, FallbackChecker, FallbackPolicy,
    FenceScanner, GrammarChecker, Validator,
};
use crate::sync::SchedulerConfig;

/// Validation options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Emit warning-level lint records
    pub lint: bool,
    /// When a failed primary grammar checker is tried again
    pub fallback: FallbackPolicy,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            lint: true,
            fallback: FallbackPolicy::Permanent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub scheduler: SchedulerConfig,
    pub scanner: DetectionConfig,
    pub validation: ValidationConfig,
}

impl EngineConfig {
    /// Load and validate a configuration file
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable, not valid TOML, or
    /// holds unusable values
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::MissingFile(path.to_path_buf()));
        }

        info!(path = path.display().to_string(); "Loading engine configuration");
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML or holds unusable values
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first offending field
    pub fn validate(&self) -> ConfigResult<()> {
        if self.scheduler.input_debounce_ms == 0 {
            return Err(ConfigError::invalid_value(
                "scheduler.input_debounce_ms",
                "must be greater than zero",
            ));
        }
        if self.scheduler.render_debounce_ms == 0 {
            return Err(ConfigError::invalid_value(
                "scheduler.render_debounce_ms",
                "must be greater than zero",
            ));
        }
        if self.scanner.fence.trim().is_empty() {
            return Err(ConfigError::invalid_value("scanner.fence", "must not be empty"));
        }
        if self.validation.fallback == FallbackPolicy::RetryEvery(0) {
            return Err(ConfigError::invalid_value(
                "validation.fallback.retry_every",
                "must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Build the parse pipeline these options describe
    ///
    /// With a `primary` checker the built-in grammar serves as its fallback;
    /// without one the built-in grammar is used directly.
    #[must_use]
    pub fn build_pipeline(&self, primary: Option<Arc<dyn GrammarChecker>>) -> DiagramPipeline {
        let builtin: Arc<dyn GrammarChecker> = Arc::new(BuiltinChecker);
        let checker: Arc<dyn GrammarChecker> = match primary {
            Some(primary) => Arc::new(FallbackChecker::new(
                primary,
                builtin,
                self.validation.fallback,
            )),
            None => builtin,
        };

        DiagramPipeline::new(
            FenceScanner::with_config(self.scanner.clone()),
            Validator::new(checker).with_lint(self.validation.lint),
        )
    }
}
