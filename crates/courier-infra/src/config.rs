//! Relay configuration loader.
//!
//! Reads the optional TOML tunables file and deserializes it into
//! [`RelayConfig`]. A missing file means defaults; a file that exists but
//! cannot be read, parsed or validated is an error, so a typo never silently
//! runs the relay with settings the operator did not ask for.

use std::path::Path;

use courier_types::config::{ConfigError, RelayConfig};

/// Default config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "courier.toml";

/// Load and validate the relay configuration from `path`.
pub async fn load_relay_config(path: &Path) -> Result<RelayConfig, ConfigError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(RelayConfig::default());
        }
        Err(err) => {
            return Err(ConfigError::Read {
                path: path.display().to_string(),
                message: err.to_string(),
            });
        }
    };

    let config = parse_relay_config(&content).map_err(|e| match e {
        ConfigError::Parse { message, .. } => ConfigError::Parse {
            path: path.display().to_string(),
            message,
        },
        other => other,
    })?;
    tracing::info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Parse and validate TOML text.
pub fn parse_relay_config(content: &str) -> Result<RelayConfig, ConfigError> {
    let config: RelayConfig = toml::from_str(content).map_err(|e| ConfigError::Parse {
        path: "<inline>".to_string(),
        message: e.to_string(),
    })?;
    config.validate()?;
    Ok(config)
}
