//! Chain-facing types and the gateway error taxonomy.

use alloy::primitives::{Address, TxHash, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Network identity as reported by `net_version` (e.g. 5777 for Ganache).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NetworkId(pub u64);

impl From<u64> for NetworkId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<NetworkId> for u64 {
    fn from(id: NetworkId) -> Self {
        id.0
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NetworkId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(Self)
    }
}

/// Ledger-assigned listing identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListingId(pub U256);

impl From<u64> for ListingId {
    fn from(id: u64) -> Self {
        Self(U256::from(id))
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ListingId {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        U256::from_str_radix(s.trim(), 10)
            .map(Self)
            .map_err(|e| GatewayError::InvalidInput(format!("invalid listing id '{}': {}", s, e)))
    }
}

/// One marketplace entry, decoded from the contract's record type.
///
/// Every field but `is_sold` is fixed for the listing's lifetime, and
/// `is_sold` only ever moves from false to true.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub id: ListingId,
    pub name: String,
    pub description: String,
    /// Price in base units.
    pub price: U256,
    pub seller: Address,
    pub is_sold: bool,
}

/// The ledger's confirmation record for a mined operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub tx_hash: TxHash,
    pub block_number: u64,
}

/// Receipt summary returned by a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxOutcome {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub success: bool,
}

/// Errors that can occur while talking to the ledger.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// No injected provider is present and no fallback endpoint is configured.
    #[error("No provider available: install a wallet provider or configure an RPC endpoint")]
    NoProviderAvailable,

    /// The provider could not be reached.
    #[error("Provider unreachable: {0}")]
    ProviderUnreachable(String),

    /// The user declined the account authorization request.
    #[error("Account authorization denied")]
    AuthorizationDenied,

    /// The provider is connected to a different network than the deployment.
    #[error("Network mismatch: expected {expected}, connected to {actual}")]
    NetworkMismatch { expected: NetworkId, actual: NetworkId },

    /// No contract address is known for the connected network.
    #[error("Contract is not deployed on network {0}")]
    NotDeployedOnNetwork(NetworkId),

    /// No signing account is available.
    #[error("No account available")]
    NoAccount,

    /// Input rejected before reaching the ledger.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The requested listing does not exist on the ledger.
    #[error("Listing {0} not found")]
    ListingNotFound(ListingId),

    /// The signer rejected the transaction prompt.
    #[error("Transaction declined by signer")]
    Declined,

    /// The ledger rejected the operation.
    #[error("Transaction reverted: {0}")]
    Reverted(String),

    /// The listing was already sold.
    #[error("Listing already sold")]
    AlreadySold,

    /// Confirmation did not arrive in time.
    #[error("Confirmation not received within {0:?}")]
    Timeout(Duration),

    /// Illegal pending-operation state transition.
    #[error("Invalid operation transition: {0}")]
    InvalidTransition(String),

    /// Unclassified provider failure; carries the raw diagnostic.
    #[error("Unknown provider error: {0}")]
    Unknown(String),
}

impl GatewayError {
    /// Errors raised while establishing or validating the connection.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::NoProviderAvailable
                | Self::ProviderUnreachable(_)
                | Self::AuthorizationDenied
                | Self::NetworkMismatch { .. }
                | Self::NotDeployedOnNetwork(_)
        )
    }

    /// Errors raised for a specific submitted operation.
    pub fn is_submission_error(&self) -> bool {
        matches!(
            self,
            Self::Declined | Self::Reverted(_) | Self::AlreadySold | Self::Timeout(_)
        )
    }

    /// Whether a read that failed with this error may succeed if repeated
    /// without user action.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProviderUnreachable(_) | Self::Timeout(_) | Self::Unknown(_)
        )
    }

    /// Short machine-readable name for logs, metrics and API bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoProviderAvailable => "no_provider_available",
            Self::ProviderUnreachable(_) => "provider_unreachable",
            Self::AuthorizationDenied => "authorization_denied",
            Self::NetworkMismatch { .. } => "network_mismatch",
            Self::NotDeployedOnNetwork(_) => "not_deployed_on_network",
            Self::NoAccount => "no_account",
            Self::InvalidInput(_) => "invalid_input",
            Self::ListingNotFound(_) => "listing_not_found",
            Self::Declined => "declined",
            Self::Reverted(_) => "reverted",
            Self::AlreadySold => "already_sold",
            Self::Timeout(_) => "timeout",
            Self::InvalidTransition(_) => "invalid_transition",
            Self::Unknown(_) => "unknown",
        }
    }
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_id_conversion() {
        let id = NetworkId::from(5777u64);
        assert_eq!(u64::from(id), 5777);
        assert_eq!("5777".parse::<NetworkId>().unwrap(), id);
        assert_eq!(id.to_string(), "5777");
    }

    #[test]
    fn test_listing_id_parse() {
        let id: ListingId = "42".parse().unwrap();
        assert_eq!(id, ListingId::from(42));
        assert!(matches!(
            "forty-two".parse::<ListingId>(),
            Err(GatewayError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_error_phases() {
        assert!(GatewayError::AuthorizationDenied.is_connection_error());
        assert!(GatewayError::NotDeployedOnNetwork(NetworkId(1)).is_connection_error());
        assert!(GatewayError::AlreadySold.is_submission_error());
        assert!(!GatewayError::InvalidInput("x".into()).is_submission_error());
    }

    #[test]
    fn test_retryable() {
        assert!(GatewayError::ProviderUnreachable("refused".into()).is_retryable());
        assert!(GatewayError::Unknown("boom".into()).is_retryable());
        assert!(!GatewayError::NetworkMismatch {
            expected: NetworkId(5777),
            actual: NetworkId(1)
        }
        .is_retryable());
        assert!(!GatewayError::Declined.is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = GatewayError::NetworkMismatch {
            expected: NetworkId(5777),
            actual: NetworkId(1),
        };
        assert_eq!(err.to_string(), "Network mismatch: expected 5777, connected to 1");
        assert_eq!(err.kind(), "network_mismatch");
    }
}
