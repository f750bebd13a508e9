//! Configuration validation.
//!
//! Pure function over a parsed config. Returns every problem found, not
//! just the first one.

use alloy::primitives::Address;
use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;
use crate::gateway::types::NetworkId;

/// One semantic problem in the configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match Url::parse(&config.provider.endpoint) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::new(
            "provider.endpoint",
            format!("unsupported scheme '{}', expected http or https", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new("provider.endpoint", e.to_string())),
    }
    if config.provider.probe_timeout_secs == 0 {
        errors.push(ValidationError::new("provider.probe_timeout_secs", "must be greater than zero"));
    }
    if config.provider.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("provider.rpc_timeout_secs", "must be greater than zero"));
    }
    if let Some(var) = &config.provider.private_key_env {
        if var.trim().is_empty() {
            errors.push(ValidationError::new("provider.private_key_env", "must not be empty when set"));
        }
    }

    let mut expected_has_address = false;
    for (network, address) in &config.contract.addresses {
        let field = format!("contract.addresses.{}", network);
        match network.parse::<NetworkId>() {
            Ok(id) if id == config.expected_network() => expected_has_address = true,
            Ok(_) => {}
            Err(_) => errors.push(ValidationError::new(field.clone(), "network id must be an unsigned integer")),
        }
        if address.parse::<Address>().is_err() {
            errors.push(ValidationError::new(field, format!("'{}' is not a valid address", address)));
        }
    }
    if !expected_has_address {
        errors.push(ValidationError::new(
            "contract.addresses",
            format!(
                "no deployment address for expected network {}",
                config.network.expected_network_id
            ),
        ));
    }

    if config.contract.gas_limit == 0 {
        errors.push(ValidationError::new("contract.gas_limit", "must be greater than zero"));
    }
    if config.contract.confirmation_timeout_secs == 0 {
        errors.push(ValidationError::new("contract.confirmation_timeout_secs", "must be greater than zero"));
    }
    if config.contract.poll_interval_ms == 0 {
        errors.push(ValidationError::new("contract.poll_interval_ms", "must be greater than zero"));
    }
    // U256 holds at most 77 decimal digits.
    if config.contract.decimals > 77 {
        errors.push(ValidationError::new("contract.decimals", "must be at most 77"));
    }

    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::new("retries.max_attempts", "must be at least 1"));
    }
    if config.retries.base_delay_ms > config.retries.max_delay_ms {
        errors.push(ValidationError::new("retries.base_delay_ms", "must not exceed retries.max_delay_ms"));
    }

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.bind_address",
            format!("'{}' is not a socket address", config.server.bind_address),
        ));
    }
    if config.server.request_timeout_secs <= config.contract.confirmation_timeout_secs {
        errors.push(ValidationError::new(
            "server.request_timeout_secs",
            "must exceed contract.confirmation_timeout_secs",
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
