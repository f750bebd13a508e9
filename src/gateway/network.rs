//! Network identity validation.
//!
//! A mismatch is reported, not raised: reads may still be attempted and
//! fail on their own at contract resolution. Mutations call
//! [`NetworkCheck::require_match`] and fail closed.

use crate::gateway::transport::ChainTransport;
use crate::gateway::types::{GatewayError, GatewayResult, NetworkId};

/// Result of comparing the provider's network with the deployment's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkCheck {
    pub observed: NetworkId,
    pub expected: NetworkId,
}

impl NetworkCheck {
    pub fn is_match(&self) -> bool {
        self.observed == self.expected
    }

    /// The mismatch condition, if any.
    pub fn mismatch(&self) -> Option<GatewayError> {
        (!self.is_match()).then_some(GatewayError::NetworkMismatch {
            expected: self.expected,
            actual: self.observed,
        })
    }

    /// Fail closed on mismatch.
    pub fn require_match(&self) -> GatewayResult<NetworkId> {
        match self.mismatch() {
            Some(err) => Err(err),
            None => Ok(self.observed),
        }
    }
}

/// Checks a provider against the expected network.
#[derive(Debug, Clone, Copy)]
pub struct NetworkValidator {
    expected: NetworkId,
}

impl NetworkValidator {
    pub fn new(expected: NetworkId) -> Self {
        Self { expected }
    }

    pub fn expected(&self) -> NetworkId {
        self.expected
    }

    /// Read the provider's network identity. Always asks the provider: the
    /// user may have switched networks since the last check.
    pub async fn validate(&self, transport: &dyn ChainTransport) -> GatewayResult<NetworkCheck> {
        let observed = transport.network_id().await?;
        let check = NetworkCheck {
            observed,
            expected: self.expected,
        };

        if check.is_match() {
            tracing::debug!(network = %observed, "Network check passed");
        } else {
            tracing::warn!(
                expected = %self.expected,
                actual = %observed,
                "Connected to a different network than the configured deployment"
            );
        }

        Ok(check)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::memory::InMemoryChain;
    use alloy::primitives::address;

    #[test]
    fn test_require_match() {
        let ok = NetworkCheck {
            observed: NetworkId(5777),
            expected: NetworkId(5777),
        };
        assert_eq!(ok.require_match(), Ok(NetworkId(5777)));
        assert!(ok.mismatch().is_none());

        let bad = NetworkCheck {
            observed: NetworkId(1),
            expected: NetworkId(5777),
        };
        assert_eq!(
            bad.require_match(),
            Err(GatewayError::NetworkMismatch {
                expected: NetworkId(5777),
                actual: NetworkId(1)
            })
        );
    }

    #[tokio::test]
    async fn test_validate_rechecks_every_time() {
        let chain = InMemoryChain::new(
            NetworkId(5777),
            address!("0x3F2e28eAf710b19e7472195CE825ca4277a9803C"),
        );
        let provider = chain.provider(vec![]);
        let validator = NetworkValidator::new(NetworkId(5777));

        assert!(validator.validate(provider.as_ref()).await.unwrap().is_match());
        provider.switch_network(NetworkId(1));
        let check = validator.validate(provider.as_ref()).await.unwrap();
        assert!(!check.is_match());
        assert_eq!(check.observed, NetworkId(1));
    }
}
