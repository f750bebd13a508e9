//! Configuration loading from disk and environment.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Overrides `provider.endpoint`.
pub const ENV_RPC_URL: &str = "GATEWAY_RPC_URL";
/// Sets the deployment address for the expected network.
pub const ENV_CONTRACT_ADDRESS: &str = "GATEWAY_CONTRACT_ADDRESS";
/// Overrides `server.bind_address`.
pub const ENV_BIND_ADDRESS: &str = "GATEWAY_BIND_ADDRESS";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a config file without applying overrides or validating. No path
/// means all defaults.
pub fn read_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(GatewayConfig::default());
    };
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

/// Apply overrides looked up through `lookup`.
pub fn apply_overrides<F>(config: &mut GatewayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(ENV_RPC_URL) {
        tracing::debug!(endpoint = %url, "Provider endpoint overridden from environment");
        config.provider.endpoint = url;
    }
    if let Some(address) = lookup(ENV_CONTRACT_ADDRESS) {
        let network = config.network.expected_network_id.to_string();
        tracing::debug!(network = %network, address = %address, "Contract address overridden from environment");
        config.contract.addresses.insert(network, address);
    }
    if let Some(bind) = lookup(ENV_BIND_ADDRESS) {
        config.server.bind_address = bind;
    }
}

/// Apply overrides from the process environment.
pub fn apply_env_overrides(config: &mut GatewayConfig) {
    apply_overrides(config, |key| std::env::var(key).ok().filter(|v| !v.is_empty()));
}

/// Read, override from the environment, and validate.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let mut config = read_config(path)?;
    apply_env_overrides(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}
