//! JSON-RPC transport backed by an alloy HTTP provider.
//!
//! # Responsibilities
//! - Connect to a configured JSON-RPC endpoint
//! - Bound every request with a timeout
//! - Sign through node-managed accounts or a local [`Wallet`]
//! - Classify provider failures into the gateway taxonomy

use alloy::primitives::{Address, Bytes, TxHash};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::transports::TransportResult;
use futures_util::future::BoxFuture;
use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use url::Url;

use crate::gateway::classify::classify_rpc_error;
use crate::gateway::transport::ChainTransport;
use crate::gateway::types::{GatewayError, GatewayResult, NetworkId, TxOutcome};
use crate::gateway::wallet::Wallet;

/// Remote endpoint transport.
#[derive(Clone)]
pub struct RpcTransport {
    provider: Arc<dyn Provider + Send + Sync>,
    endpoint: Url,
    wallet: Option<Wallet>,
    timeout_duration: Duration,
}

impl RpcTransport {
    /// Build a transport for `endpoint`. No request is made here; liveness is
    /// checked separately with [`ChainTransport::probe`].
    pub fn connect(endpoint: &str, wallet: Option<Wallet>, timeout_duration: Duration) -> GatewayResult<Self> {
        let url: Url = endpoint.parse().map_err(|e| {
            GatewayError::InvalidInput(format!("Invalid RPC URL '{}': {}", endpoint, e))
        })?;

        let provider: Arc<dyn Provider + Send + Sync> = match &wallet {
            Some(w) => Arc::new(
                ProviderBuilder::new()
                    .wallet(w.ethereum_wallet())
                    .connect_http(url.clone()),
            ),
            None => Arc::new(ProviderBuilder::new().connect_http(url.clone())),
        };

        Ok(Self {
            provider,
            endpoint: url,
            wallet,
            timeout_duration,
        })
    }

    /// The endpoint this transport talks to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn guarded<T, F>(&self, method: &'static str, fut: F) -> GatewayResult<T>
    where
        F: Future<Output = TransportResult<T>>,
    {
        match timeout(self.timeout_duration, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                let classified = classify_rpc_error(&e);
                tracing::warn!(
                    method,
                    endpoint = %self.endpoint,
                    kind = classified.kind(),
                    error = %e,
                    "RPC request failed"
                );
                Err(classified)
            }
            Err(_) => {
                tracing::warn!(method, endpoint = %self.endpoint, "RPC timeout");
                Err(GatewayError::ProviderUnreachable(format!(
                    "{} timed out after {:?}",
                    method, self.timeout_duration
                )))
            }
        }
    }
}

impl ChainTransport for RpcTransport {
    fn request_accounts(&self) -> BoxFuture<'_, GatewayResult<Vec<Address>>> {
        // A remote endpoint has no authorization prompt.
        self.accounts()
    }

    fn accounts(&self) -> BoxFuture<'_, GatewayResult<Vec<Address>>> {
        Box::pin(async move {
            if let Some(wallet) = &self.wallet {
                return Ok(vec![wallet.address()]);
            }
            self.guarded("eth_accounts", self.provider.get_accounts()).await
        })
    }

    fn network_id(&self) -> BoxFuture<'_, GatewayResult<NetworkId>> {
        Box::pin(async move {
            let id = self
                .guarded("net_version", self.provider.get_net_version())
                .await?;
            Ok(NetworkId(id))
        })
    }

    fn probe(&self) -> BoxFuture<'_, GatewayResult<()>> {
        Box::pin(async move {
            self.guarded("eth_blockNumber", self.provider.get_block_number())
                .await
                .map(|_| ())
                .map_err(|e| match e {
                    GatewayError::ProviderUnreachable(_) => e,
                    other => GatewayError::ProviderUnreachable(other.to_string()),
                })
        })
    }

    fn call(&self, tx: TransactionRequest) -> BoxFuture<'_, GatewayResult<Bytes>> {
        Box::pin(async move { self.guarded("eth_call", self.provider.call(tx).into_future()).await })
    }

    fn send_transaction(&self, tx: TransactionRequest) -> BoxFuture<'_, GatewayResult<TxHash>> {
        Box::pin(async move {
            let pending = self
                .guarded("eth_sendTransaction", self.provider.send_transaction(tx))
                .await?;
            Ok(*pending.tx_hash())
        })
    }

    fn transaction_receipt(
        &self,
        tx_hash: TxHash,
    ) -> BoxFuture<'_, GatewayResult<Option<TxOutcome>>> {
        Box::pin(async move {
            let receipt = self
                .guarded(
                    "eth_getTransactionReceipt",
                    self.provider.get_transaction_receipt(tx_hash),
                )
                .await?;
            Ok(receipt.map(|r| TxOutcome {
                tx_hash: r.transaction_hash,
                block_number: r.block_number.unwrap_or_default(),
                success: r.status(),
            }))
        })
    }
}

impl std::fmt::Debug for RpcTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcTransport")
            .field("endpoint", &self.endpoint.as_str())
            .field("local_wallet", &self.wallet.as_ref().map(|w| w.address()))
            .field("timeout", &self.timeout_duration)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url_rejected() {
        let result = RpcTransport::connect("not a url", None, Duration::from_secs(1));
        assert!(matches!(result, Err(GatewayError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_probe_unreachable_endpoint() {
        // Port 1 is never served locally; the connection is refused.
        let transport =
            RpcTransport::connect("http://127.0.0.1:1", None, Duration::from_secs(2)).unwrap();
        let result = transport.probe().await;
        assert!(matches!(result, Err(GatewayError::ProviderUnreachable(_))));
    }

    #[tokio::test]
    async fn test_local_wallet_accounts_without_rpc() {
        let wallet = Wallet::from_private_key(
            "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        )
        .unwrap();
        let address = wallet.address();
        let transport =
            RpcTransport::connect("http://127.0.0.1:1", Some(wallet), Duration::from_secs(1))
                .unwrap();
        assert_eq!(transport.accounts().await.unwrap(), vec![address]);
    }
}
