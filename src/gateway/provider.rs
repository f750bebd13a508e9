//! Provider resolution.
//!
//! Resolution order, first present path wins and is the only one attempted:
//! 1. injected provider, after the user authorizes account access
//! 2. legacy injected provider, no authorization step
//! 3. configured remote endpoint, after a liveness probe
//!
//! A declined authorization on path 1 never falls through to path 2 or 3.

use alloy::primitives::Address;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::gateway::rpc::RpcTransport;
use crate::gateway::transport::{ChainTransport, ProviderKind};
use crate::gateway::types::{GatewayError, GatewayResult};
use crate::gateway::wallet::Wallet;

/// Settings for the fallback remote endpoint.
#[derive(Debug, Clone)]
pub struct EndpointSettings {
    pub url: String,
    pub rpc_timeout: Duration,
    pub probe_timeout: Duration,
    /// Environment variable holding a local signing key, if any.
    pub private_key_env: Option<String>,
}

/// An established connection to a chain node.
#[derive(Clone)]
pub struct ProviderHandle {
    transport: Arc<dyn ChainTransport>,
    kind: ProviderKind,
    /// Accounts granted during authorization (injected providers only).
    authorized: Option<Vec<Address>>,
}

impl ProviderHandle {
    pub fn transport(&self) -> &Arc<dyn ChainTransport> {
        &self.transport
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn authorized_accounts(&self) -> Option<&[Address]> {
        self.authorized.as_deref()
    }
}

impl std::fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderHandle")
            .field("kind", &self.kind)
            .field("authorized", &self.authorized)
            .finish()
    }
}

/// Finds a provider to connect through.
#[derive(Clone, Default)]
pub struct ProviderResolver {
    injected: Option<Arc<dyn ChainTransport>>,
    legacy: Option<Arc<dyn ChainTransport>>,
    endpoint: Option<EndpointSettings>,
}

impl ProviderResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a host-injected provider that requires authorization.
    pub fn with_injected(mut self, transport: Arc<dyn ChainTransport>) -> Self {
        self.injected = Some(transport);
        self
    }

    /// Register a legacy injected provider.
    pub fn with_legacy_injected(mut self, transport: Arc<dyn ChainTransport>) -> Self {
        self.legacy = Some(transport);
        self
    }

    /// Configure the fallback remote endpoint.
    pub fn with_endpoint(mut self, settings: EndpointSettings) -> Self {
        self.endpoint = Some(settings);
        self
    }

    /// Establish a provider handle.
    pub async fn resolve(&self) -> GatewayResult<ProviderHandle> {
        if let Some(injected) = &self.injected {
            tracing::info!("Injected provider detected, requesting account authorization");
            let accounts = injected.request_accounts().await.map_err(|e| match e {
                GatewayError::Declined | GatewayError::AuthorizationDenied => {
                    tracing::warn!("Account authorization denied by user");
                    GatewayError::AuthorizationDenied
                }
                other => other,
            })?;
            tracing::info!(accounts = accounts.len(), "Account access granted");
            return Ok(ProviderHandle {
                transport: Arc::clone(injected),
                kind: ProviderKind::Injected,
                authorized: Some(accounts),
            });
        }

        if let Some(legacy) = &self.legacy {
            tracing::info!("Legacy injected provider detected");
            return Ok(ProviderHandle {
                transport: Arc::clone(legacy),
                kind: ProviderKind::LegacyInjected,
                authorized: None,
            });
        }

        let Some(settings) = &self.endpoint else {
            tracing::error!("No injected provider and no endpoint configured");
            return Err(GatewayError::NoProviderAvailable);
        };

        tracing::info!(endpoint = %settings.url, "No injected provider, falling back to endpoint");
        let wallet = settings
            .private_key_env
            .as_deref()
            .map(Wallet::from_env)
            .transpose()?;
        let transport = RpcTransport::connect(&settings.url, wallet, settings.rpc_timeout)?;

        match timeout(settings.probe_timeout, transport.probe()).await {
            Ok(Ok(())) => {
                tracing::info!(endpoint = %settings.url, "Endpoint is live");
            }
            Ok(Err(e)) => {
                tracing::error!(endpoint = %settings.url, error = %e, "Endpoint probe failed");
                return Err(match e {
                    GatewayError::ProviderUnreachable(_) => e,
                    other => GatewayError::ProviderUnreachable(other.to_string()),
                });
            }
            Err(_) => {
                tracing::error!(endpoint = %settings.url, "Endpoint probe timed out");
                return Err(GatewayError::ProviderUnreachable(format!(
                    "probe of {} timed out after {:?}",
                    settings.url, settings.probe_timeout
                )));
            }
        }

        Ok(ProviderHandle {
            transport: Arc::new(transport),
            kind: ProviderKind::Endpoint,
            authorized: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::memory::InMemoryChain;
    use crate::gateway::types::NetworkId;
    use alloy::primitives::address;

    const CONTRACT: Address = address!("0x3F2e28eAf710b19e7472195CE825ca4277a9803C");
    const ALICE: Address = address!("0x00000000000000000000000000000000000000a1");

    fn unreachable_endpoint() -> EndpointSettings {
        EndpointSettings {
            url: "http://127.0.0.1:1".to_string(),
            rpc_timeout: Duration::from_secs(2),
            probe_timeout: Duration::from_secs(2),
            private_key_env: None,
        }
    }

    #[tokio::test]
    async fn test_nothing_configured() {
        let result = ProviderResolver::new().resolve().await;
        assert!(matches!(result, Err(GatewayError::NoProviderAvailable)));
    }

    #[tokio::test]
    async fn test_injected_wins_and_authorizes() {
        let chain = InMemoryChain::new(NetworkId(5777), CONTRACT);
        let resolver = ProviderResolver::new()
            .with_injected(chain.provider(vec![ALICE]))
            .with_endpoint(unreachable_endpoint());

        let handle = resolver.resolve().await.unwrap();
        assert_eq!(handle.kind(), ProviderKind::Injected);
        assert_eq!(handle.authorized_accounts(), Some(&[ALICE][..]));
    }

    #[tokio::test]
    async fn test_denied_authorization_does_not_fall_back() {
        let chain = InMemoryChain::new(NetworkId(5777), CONTRACT);
        let injected = chain.provider(vec![ALICE]);
        injected.deny_authorization();
        let resolver = ProviderResolver::new()
            .with_injected(injected)
            .with_legacy_injected(chain.provider(vec![ALICE]));

        let result = resolver.resolve().await;
        assert!(matches!(result, Err(GatewayError::AuthorizationDenied)));
    }

    #[tokio::test]
    async fn test_legacy_has_no_authorization_step() {
        let chain = InMemoryChain::new(NetworkId(5777), CONTRACT);
        let legacy = chain.provider(vec![ALICE]);
        legacy.deny_authorization();
        let handle = ProviderResolver::new()
            .with_legacy_injected(legacy)
            .resolve()
            .await
            .unwrap();
        assert_eq!(handle.kind(), ProviderKind::LegacyInjected);
        assert!(handle.authorized_accounts().is_none());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        let result = ProviderResolver::new()
            .with_endpoint(unreachable_endpoint())
            .resolve()
            .await;
        assert!(matches!(result, Err(GatewayError::ProviderUnreachable(_))));
    }
}
