//! The provider transport seam.
//!
//! Everything the gateway needs from a chain node goes through
//! [`ChainTransport`]. The trait is object safe so a session can hold any
//! provider (remote RPC endpoint, host-injected wallet, in-memory ledger)
//! behind the same handle.

use alloy::primitives::{Address, Bytes, TxHash};
use alloy::rpc::types::TransactionRequest;
use futures_util::future::BoxFuture;
use tokio::sync::watch;

use crate::gateway::types::{GatewayResult, NetworkId, TxOutcome};

/// Transport/session object through which the gateway reaches the ledger.
pub trait ChainTransport: Send + Sync {
    /// Ask the user to authorize account access. Providers without an
    /// authorization step return the current account set.
    fn request_accounts(&self) -> BoxFuture<'_, GatewayResult<Vec<Address>>>;

    /// Current account set, without prompting.
    fn accounts(&self) -> BoxFuture<'_, GatewayResult<Vec<Address>>>;

    /// Network identity reported by the node.
    fn network_id(&self) -> BoxFuture<'_, GatewayResult<NetworkId>>;

    /// Lightweight liveness check.
    fn probe(&self) -> BoxFuture<'_, GatewayResult<()>>;

    /// Execute a read-only call and return the raw return data.
    fn call(&self, tx: TransactionRequest) -> BoxFuture<'_, GatewayResult<Bytes>>;

    /// Submit a state-changing transaction. Returns as soon as the ledger
    /// has accepted it.
    fn send_transaction(&self, tx: TransactionRequest) -> BoxFuture<'_, GatewayResult<TxHash>>;

    /// Receipt for a submitted transaction, `None` while still pending.
    fn transaction_receipt(&self, tx_hash: TxHash)
        -> BoxFuture<'_, GatewayResult<Option<TxOutcome>>>;

    /// Account-change event stream, if the provider emits one.
    fn account_events(&self) -> Option<watch::Receiver<Vec<Address>>> {
        None
    }
}

/// How a provider handle was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Host-injected provider that required account authorization.
    Injected,
    /// Legacy injected provider, no authorization step.
    LegacyInjected,
    /// Configured remote endpoint.
    Endpoint,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Injected => "injected",
            Self::LegacyInjected => "legacy_injected",
            Self::Endpoint => "endpoint",
        }
    }
}
