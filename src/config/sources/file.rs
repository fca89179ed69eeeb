//! TOML file source: an explicit path handed to the loader.

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File, FileFormat};
use std::path::Path;
use tracing::debug;

/// Add a TOML file source. The file must exist.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    path: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| ConfigError::Message(format!("Non UTF-8 config path: {:?}", path)))?;
    debug!(config_path = %path.display(), "Adding config file source");
    Ok(builder.add_source(File::new(path_str, FileFormat::Toml).required(true)))
}
