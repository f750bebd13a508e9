//! Marketplace contract binding.
//!
//! # Responsibilities
//! - Declare the contract's external interface once (`sol!`)
//! - Resolve the deployment address for the connected network
//! - Encode calls, submit them with a bounded gas allowance
//! - Decode raw return data into [`Listing`] exactly once
//! - Wait for settlement inside the caller's future

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::sol;
use alloy::sol_types::SolCall;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, timeout, MissedTickBehavior};

use crate::gateway::transport::ChainTransport;
use crate::gateway::types::{
    GatewayError, GatewayResult, Listing, ListingId, NetworkId, Settlement,
};

sol! {
    /// On-chain listing record as returned by `listListings`.
    #[derive(Debug, PartialEq, Eq)]
    struct ListingRecord {
        uint256 id;
        string name;
        string description;
        uint256 price;
        address seller;
        bool isSold;
    }

    /// External interface of the marketplace contract.
    #[derive(Debug)]
    interface IMarketplace {
        function listListings() external view returns (ListingRecord[] memory);
        function createListing(string name, string description, uint256 price) external;
        function purchaseListing(uint256 id) external payable;
    }
}

impl From<ListingRecord> for Listing {
    fn from(record: ListingRecord) -> Self {
        Self {
            id: ListingId(record.id),
            name: record.name,
            description: record.description,
            price: record.price,
            seller: record.seller,
            is_sold: record.isSold,
        }
    }
}

/// Contract deployment addresses keyed by network.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Deployments(BTreeMap<NetworkId, Address>);

impl Deployments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, network: NetworkId, address: Address) -> Self {
        self.0.insert(network, address);
        self
    }

    pub fn insert(&mut self, network: NetworkId, address: Address) {
        self.0.insert(network, address);
    }

    /// Deployment address on `network`.
    pub fn address_for(&self, network: NetworkId) -> GatewayResult<Address> {
        self.0
            .get(&network)
            .copied()
            .ok_or(GatewayError::NotDeployedOnNetwork(network))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Submission tuning.
#[derive(Debug, Clone, Copy)]
pub struct GatewaySettings {
    /// Gas allowance attached to every mutating call.
    pub gas_limit: u64,
    /// Receipt polling interval while waiting for settlement.
    pub poll_interval: Duration,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            gas_limit: 3_000_000,
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// A transaction accepted by the ledger, not yet settled.
#[derive(Debug, Clone)]
pub struct Submission {
    pub tx_hash: TxHash,
    /// Network the transaction was sent on.
    pub network: NetworkId,
    /// The exact request that was submitted, kept to recover a revert reason.
    pub request: TransactionRequest,
}

/// The contract bound to a provider and a network-specific address.
#[derive(Clone)]
pub struct ContractGateway {
    transport: Arc<dyn ChainTransport>,
    network: NetworkId,
    address: Address,
    settings: GatewaySettings,
}

impl ContractGateway {
    /// Bind the contract for `network`. Fails with `NotDeployedOnNetwork`
    /// when no address is configured for it.
    pub fn bind(
        transport: Arc<dyn ChainTransport>,
        network: NetworkId,
        deployments: &Deployments,
        settings: GatewaySettings,
    ) -> GatewayResult<Self> {
        let address = deployments.address_for(network)?;
        Ok(Self {
            transport,
            network,
            address,
            settings,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn network(&self) -> NetworkId {
        self.network
    }

    /// Read every listing, in ledger order.
    pub async fn list_listings(&self) -> GatewayResult<Vec<Listing>> {
        let request = TransactionRequest::default()
            .with_to(self.address)
            .with_input(IMarketplace::listListingsCall {}.abi_encode());

        let raw = self.transport.call(request).await?;
        if raw.is_empty() {
            // No code at the address on this network.
            return Err(GatewayError::NotDeployedOnNetwork(self.network));
        }

        let records = IMarketplace::listListingsCall::abi_decode_returns(&raw).map_err(|e| {
            GatewayError::Unknown(format!("undecodable listListings return data: {}", e))
        })?;

        Ok(records.into_iter().map(Listing::from).collect())
    }

    /// Submit `createListing`. `price` is in base units and must be positive.
    pub async fn create_listing(
        &self,
        from: Address,
        name: &str,
        description: &str,
        price: U256,
    ) -> GatewayResult<Submission> {
        if price.is_zero() {
            return Err(GatewayError::InvalidInput(
                "price must be greater than zero".to_string(),
            ));
        }

        let call = IMarketplace::createListingCall {
            name: name.to_string(),
            description: description.to_string(),
            price,
        };
        let request = self.mutating_request(from, call.abi_encode(), U256::ZERO);
        self.submit("createListing", request).await
    }

    /// Submit `purchaseListing` with `payment` attached.
    ///
    /// Whether the listing is still unsold is not checked here; the ledger
    /// picks the single winner among concurrent purchasers.
    pub async fn purchase_listing(
        &self,
        from: Address,
        id: ListingId,
        payment: U256,
    ) -> GatewayResult<Submission> {
        let call = IMarketplace::purchaseListingCall { id: id.0 };
        let request = self.mutating_request(from, call.abi_encode(), payment);
        self.submit("purchaseListing", request).await
    }

    /// Wait up to `wait` for the submission to settle.
    ///
    /// Polls the receipt from within the caller's future. Dropping the future
    /// stops waiting locally; the on-chain effect is unaffected.
    pub async fn wait_for_settlement(
        &self,
        submission: &Submission,
        wait: Duration,
    ) -> GatewayResult<Settlement> {
        let tx_hash = submission.tx_hash;

        let result = timeout(wait, async {
            let mut ticker = interval(self.settings.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                let outcome = match self.transport.transaction_receipt(tx_hash).await? {
                    Some(outcome) => outcome,
                    None => {
                        tracing::debug!(tx_hash = %tx_hash, "Transaction pending");
                        continue;
                    }
                };

                if outcome.success {
                    return Ok(Settlement {
                        tx_hash: outcome.tx_hash,
                        block_number: outcome.block_number,
                    });
                }

                return Err(self.recover_revert(&submission.request).await);
            }
        })
        .await;

        match result {
            Ok(settled) => settled,
            Err(_) => Err(GatewayError::Timeout(wait)),
        }
    }

    fn mutating_request(&self, from: Address, input: Vec<u8>, value: U256) -> TransactionRequest {
        TransactionRequest::default()
            .with_from(from)
            .with_to(self.address)
            .with_input(input)
            .with_value(value)
            .with_gas_limit(self.settings.gas_limit)
    }

    async fn submit(
        &self,
        method: &'static str,
        request: TransactionRequest,
    ) -> GatewayResult<Submission> {
        match self.transport.send_transaction(request.clone()).await {
            Ok(tx_hash) => {
                tracing::info!(
                    method,
                    tx_hash = %tx_hash,
                    contract = %self.address,
                    network = %self.network,
                    "Transaction submitted"
                );
                Ok(Submission {
                    tx_hash,
                    network: self.network,
                    request,
                })
            }
            Err(e) => {
                tracing::warn!(method, kind = e.kind(), error = %e, "Submission failed");
                Err(e)
            }
        }
    }

    /// Replay a failed transaction as a call to recover its revert reason.
    async fn recover_revert(&self, request: &TransactionRequest) -> GatewayError {
        match self.transport.call(request.clone()).await {
            Err(e @ (GatewayError::AlreadySold | GatewayError::Reverted(_))) => e,
            Ok(_) => GatewayError::Reverted("reverted on-chain; reason not recoverable".to_string()),
            Err(other) => GatewayError::Reverted(format!(
                "reverted on-chain; reason lookup failed: {}",
                other
            )),
        }
    }
}

impl std::fmt::Debug for ContractGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractGateway")
            .field("network", &self.network)
            .field("address", &self.address)
            .field("gas_limit", &self.settings.gas_limit)
            .finish()
    }
}
