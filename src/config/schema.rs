//! Configuration schema definitions.
//!
//! Every section and field has a default, so an empty file is a complete
//! (if not yet valid) configuration.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::gateway::contract::{Deployments, GatewaySettings};
use crate::gateway::provider::EndpointSettings;
use crate::gateway::types::NetworkId;
use crate::listings::units::DEFAULT_DECIMALS;
use crate::resilience::RetryPolicy;

/// Root configuration for the listing gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Fallback provider endpoint and timeouts.
    pub provider: ProviderConfig,

    /// Network the contract deployment belongs to.
    pub network: NetworkConfig,

    /// Deployment addresses and submission tuning.
    pub contract: ContractConfig,

    /// Read retry policy.
    pub retries: RetryConfig,

    /// REST listener.
    pub server: ServerConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// JSON-RPC endpoint used when no injected provider is present.
    pub endpoint: String,

    /// Deadline for the liveness probe in seconds.
    pub probe_timeout_secs: u64,

    /// Deadline for every other RPC call in seconds.
    pub rpc_timeout_secs: u64,

    /// Name of the environment variable holding a local signing key.
    /// Without it, the node's own accounts sign.
    pub private_key_env: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:7545".to_string(),
            probe_timeout_secs: 5,
            rpc_timeout_secs: 30,
            private_key_env: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Network id the deployment is expected on (5777 = Ganache).
    pub expected_network_id: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            expected_network_id: 5777,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContractConfig {
    /// Deployment address per network id, e.g. `"5777" = "0x..."`.
    pub addresses: BTreeMap<String, String>,

    /// Gas allowance attached to every mutation.
    pub gas_limit: u64,

    /// How long a mutation is awaited before it is reported as timed out.
    pub confirmation_timeout_secs: u64,

    /// Receipt polling interval.
    pub poll_interval_ms: u64,

    /// Decimals between the display unit and the base unit.
    pub decimals: u8,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            addresses: BTreeMap::new(),
            gas_limit: 3_000_000,
            confirmation_timeout_secs: 60,
            poll_interval_ms: 1000,
            decimals: DEFAULT_DECIMALS,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts for a listing read, including the first.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            base_delay_ms: policy.base_delay_ms,
            max_delay_ms: policy.max_delay_ms,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:5001").
    pub bind_address: String,

    /// Per-request deadline in seconds. Must exceed the confirmation timeout.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5001".to_string(),
            request_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

impl GatewayConfig {
    pub fn expected_network(&self) -> NetworkId {
        NetworkId(self.network.expected_network_id)
    }

    /// Parsed deployment table. Entries that fail to parse are skipped;
    /// validation reports them.
    pub fn deployments(&self) -> Deployments {
        let mut deployments = Deployments::new();
        for (network, address) in &self.contract.addresses {
            if let (Ok(network), Ok(address)) =
                (network.parse::<NetworkId>(), address.parse::<Address>())
            {
                deployments.insert(network, address);
            }
        }
        deployments
    }

    pub fn endpoint_settings(&self) -> EndpointSettings {
        EndpointSettings {
            url: self.provider.endpoint.clone(),
            rpc_timeout: Duration::from_secs(self.provider.rpc_timeout_secs),
            probe_timeout: Duration::from_secs(self.provider.probe_timeout_secs),
            private_key_env: self.provider.private_key_env.clone(),
        }
    }

    pub fn gateway_settings(&self) -> GatewaySettings {
        GatewaySettings {
            gas_limit: self.contract.gas_limit,
            poll_interval: Duration::from_millis(self.contract.poll_interval_ms),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retries.max_attempts,
            base_delay_ms: self.retries.base_delay_ms,
            max_delay_ms: self.retries.max_delay_ms,
        }
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.contract.confirmation_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: GatewayConfig = toml::from_str("").unwrap();
        assert_eq!(config.provider.endpoint, "http://127.0.0.1:7545");
        assert_eq!(config.expected_network(), NetworkId(5777));
        assert_eq!(config.contract.gas_limit, 3_000_000);
        assert_eq!(config.contract.decimals, 18);
        assert_eq!(config.server.bind_address, "0.0.0.0:5001");
        assert!(config.deployments().is_empty());
    }

    #[test]
    fn test_deployment_table() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [network]
            expected_network_id = 1337

            [contract.addresses]
            "1337" = "0x3F2e28eAf710b19e7472195CE825ca4277a9803C"
            "5777" = "not-an-address"
            "#,
        )
        .unwrap();

        let deployments = config.deployments();
        assert_eq!(deployments.len(), 1);
        assert!(deployments.address_for(NetworkId(1337)).is_ok());
    }

    #[test]
    fn test_derived_settings() {
        let mut config = GatewayConfig::default();
        config.contract.poll_interval_ms = 250;
        config.retries.max_attempts = 5;
        assert_eq!(config.gateway_settings().poll_interval, Duration::from_millis(250));
        assert_eq!(config.retry_policy().max_attempts, 5);
        assert_eq!(config.confirmation_timeout(), Duration::from_secs(60));
    }
}
