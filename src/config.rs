//! Configuration System
//!
//! Layered configuration for the guard: built-in defaults, an optional TOML file,
//! then `CONTEXT_GUARD__*` environment overrides. Tests included.

use crate::error::GuardError;
use crate::handler::ViolationPolicy;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

mod merge;
mod sources;

use merge::merge_policy;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Tracking state and violation policy
    #[serde(default)]
    pub tracking: TrackingConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Tracking settings applied when a guard is built from configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Whether the guard starts with tracking on
    #[serde(default = "default_true")]
    pub enabled_at_start: bool,

    /// What to do on a cross-context access
    #[serde(default)]
    pub policy: ViolationPolicy,
}

fn default_true() -> bool {
    true
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            enabled_at_start: default_true(),
            policy: ViolationPolicy::default(),
        }
    }
}

impl GuardConfig {
    /// Validate the configuration, collecting every problem found
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.tracking.policy == ViolationPolicy::Abort && !self.tracking.enabled_at_start {
            // Not an error, but almost always a mistake worth surfacing.
            tracing::warn!("Abort policy configured with tracking disabled at start");
        }

        if let Err(e) = self.logging.validate() {
            errors.push(format!("Logging: {}", e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Loads [`GuardConfig`] from its sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults, then `path` if given, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<GuardConfig, GuardError> {
        let mut builder = merge_policy::builder_with_defaults()?;
        if let Some(path) = path {
            builder = sources::file::add_to_builder(builder, path)?;
        }
        builder = sources::environment::add_to_builder(builder);
        Self::finish(builder)
    }

    /// Defaults and a required TOML file, without environment overrides
    pub fn load_from_file(path: &Path) -> Result<GuardConfig, GuardError> {
        if !path.exists() {
            return Err(GuardError::ConfigError(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let builder = sources::file::add_to_builder(merge_policy::builder_with_defaults()?, path)?;
        Self::finish(builder)
    }

    /// Built-in defaults only
    pub fn default() -> GuardConfig {
        GuardConfig::default()
    }

    fn finish(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<GuardConfig, GuardError> {
        let config: GuardConfig = builder.build()?.try_deserialize()?;
        config.validate().map_err(|errors| {
            GuardError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                errors.join("\n")
            ))
        })?;
        Ok(config)
    }
}
