//! Environment source: `CONTEXT_GUARD__*` overrides.

use config::builder::DefaultState;
use config::{ConfigBuilder, Environment};

/// Prefix of environment overrides, e.g. `CONTEXT_GUARD__TRACKING__POLICY=panic`
pub const ENV_PREFIX: &str = "CONTEXT_GUARD";

/// Add environment overrides; `__` separates both the prefix and nested keys.
pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    )
}
