//! Listing client.
//!
//! The public API over the gateway: reads, creates and purchases with input
//! validation, exact unit conversion, error classification and local
//! reconciliation.
//!
//! # Flow
//! ```text
//! create/purchase:
//!     validate input (local) → capture account → network must match
//!     → [purchase: pre-flight read] → submit → PendingOperation
//! confirm:
//!     wait for settlement (caller's future) → Confirmed | Reverted | TimedOut
//! ```

use alloy::primitives::{Address, U256};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::config::GatewayConfig;
use crate::gateway::accounts::AccountSubscription;
use crate::gateway::contract::ContractGateway;
use crate::gateway::network::{NetworkCheck, NetworkValidator};
use crate::gateway::provider::ProviderResolver;
use crate::gateway::session::ConnectionSession;
use crate::gateway::types::{GatewayError, GatewayResult, Listing, ListingId, Settlement};
use crate::listings::cache::{Overlay, PendingCreate, ReconciliationCache};
use crate::listings::pending::{OperationKind, OperationState, PendingOperation};
use crate::listings::units::{to_base_units, DEFAULT_DECIMALS};
use crate::observability::metrics;
use crate::resilience::{retry_with_backoff, RetryPolicy};

/// Coarse class of a failed listing read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorClass {
    Unreachable,
    NetworkMismatch,
    Unknown,
}

impl fmt::Display for FetchErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unreachable => "unreachable",
            Self::NetworkMismatch => "network_mismatch",
            Self::Unknown => "unknown",
        })
    }
}

/// A listing read failure with its retry guidance.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("listing read failed ({class}): {source}")]
pub struct FetchError {
    pub class: FetchErrorClass,
    /// Whether repeating the read without user action may succeed.
    pub retryable: bool,
    #[source]
    pub source: GatewayError,
}

impl From<GatewayError> for FetchError {
    fn from(source: GatewayError) -> Self {
        let class = match &source {
            GatewayError::NoProviderAvailable
            | GatewayError::ProviderUnreachable(_)
            | GatewayError::Timeout(_) => FetchErrorClass::Unreachable,
            GatewayError::NetworkMismatch { .. } | GatewayError::NotDeployedOnNetwork(_) => {
                FetchErrorClass::NetworkMismatch
            }
            _ => FetchErrorClass::Unknown,
        };
        // Denied authorization and a missing provider need user action
        // before a repeat can succeed.
        let retryable = source.is_retryable();
        Self {
            class,
            retryable,
            source,
        }
    }
}

/// Seller input for a new listing. `price` is a display amount ("1.5").
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewListing {
    pub name: String,
    pub description: String,
    pub price: String,
}

struct ValidatedListing {
    name: String,
    description: String,
    price: U256,
}

#[derive(Debug, Clone, Copy)]
pub struct ClientSettings {
    /// Decimals between display and base units.
    pub decimals: u8,
    /// Default wait used by the submit-and-confirm helpers.
    pub confirmation_timeout: Duration,
    pub read_retry: RetryPolicy,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            decimals: DEFAULT_DECIMALS,
            confirmation_timeout: Duration::from_secs(60),
            read_retry: RetryPolicy::default(),
        }
    }
}

/// Public entry point for listing reads and mutations.
pub struct ListingClient {
    session: Arc<ConnectionSession>,
    cache: ReconciliationCache,
    settings: ClientSettings,
}

impl ListingClient {
    pub fn new(session: Arc<ConnectionSession>, settings: ClientSettings) -> Self {
        Self {
            session,
            cache: ReconciliationCache::with_overlay_ttl(settings.confirmation_timeout),
            settings,
        }
    }

    /// Client using the configured endpoint as its only provider path.
    pub fn from_config(config: &GatewayConfig) -> Self {
        let resolver = ProviderResolver::new().with_endpoint(config.endpoint_settings());
        Self::with_resolver(config, resolver)
    }

    /// Client with a caller-built resolver (e.g. one with an injected
    /// provider) and everything else from `config`.
    pub fn with_resolver(config: &GatewayConfig, resolver: ProviderResolver) -> Self {
        let session = ConnectionSession::new(
            resolver,
            NetworkValidator::new(config.expected_network()),
            config.deployments(),
            config.gateway_settings(),
        );
        Self::new(
            Arc::new(session),
            ClientSettings {
                decimals: config.contract.decimals,
                confirmation_timeout: config.confirmation_timeout(),
                read_retry: config.retry_policy(),
            },
        )
    }

    pub fn session(&self) -> &Arc<ConnectionSession> {
        &self.session
    }

    pub fn cache(&self) -> &ReconciliationCache {
        &self.cache
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Read every listing from the ledger and refresh the cache.
    ///
    /// The cache only tracks the expected network. A read served by another
    /// network's deployment is returned but not installed.
    pub async fn fetch_listings(&self) -> Result<Vec<Listing>, FetchError> {
        let started = Instant::now();
        match self.read_listings().await {
            Ok((listings, check)) => {
                metrics::record_read("success", started);
                if check.is_match() {
                    self.cache.replace(listings.clone());
                } else {
                    tracing::debug!(
                        network = %check.observed,
                        listings = listings.len(),
                        "Listing read from another network left out of the cache"
                    );
                }
                Ok(listings)
            }
            Err(e) => {
                let err = FetchError::from(e);
                metrics::record_read("failure", started);
                tracing::warn!(
                    class = %err.class,
                    retryable = err.retryable,
                    error = %err.source,
                    "Listing read failed"
                );
                Err(err)
            }
        }
    }

    /// [`Self::fetch_listings`], retrying retryable failures with backoff.
    pub async fn fetch_listings_with_retry(&self) -> Result<Vec<Listing>, FetchError> {
        retry_with_backoff(
            &self.settings.read_retry,
            || self.fetch_listings(),
            |e: &FetchError| e.retryable,
        )
        .await
    }

    /// Reads proceed on a mismatched network; if they then fail, the
    /// mismatch is what gets reported.
    async fn read_listings(&self) -> GatewayResult<(Vec<Listing>, NetworkCheck)> {
        let check = self.session.check_network().await?;
        let result = match self.session.contract(&check).await {
            Ok(gateway) => gateway.list_listings().await,
            Err(e) => Err(e),
        };
        match (result, check.mismatch()) {
            (Err(_), Some(mismatch)) => Err(mismatch),
            (result, _) => result.map(|listings| (listings, check)),
        }
    }

    /// Listings from the last read with local reconciliation applied.
    pub fn cached_listings(&self) -> Vec<Listing> {
        self.cache.listings()
    }

    pub fn pending_creates(&self) -> Vec<PendingCreate> {
        self.cache.pending_creates()
    }

    /// Validate and submit a new listing. Returns once the ledger accepted
    /// the transaction; use [`Self::confirm`] to wait for settlement.
    pub async fn create_listing(&self, input: NewListing) -> GatewayResult<PendingOperation> {
        let validated = self.validate_new_listing(&input).inspect_err(|e| {
            metrics::record_operation(OperationKind::Create.as_str(), e.kind());
        })?;

        let account = self.capture_account(OperationKind::Create).await?;
        let gateway = self.gateway_for_mutation(OperationKind::Create).await?;

        let mut op = PendingOperation::draft(OperationKind::Create, None, account, U256::ZERO);
        op.transition(OperationState::Validated)?;
        self.ensure_account_bound(&op)?;

        let submitted = gateway
            .create_listing(account, &validated.name, &validated.description, validated.price)
            .await;
        match submitted {
            Ok(submission) => {
                op.mark_submitted(submission)?;
                self.cache.apply_optimistic(
                    op.id(),
                    Overlay::Create(PendingCreate {
                        operation_id: op.id(),
                        seller: account,
                        name: validated.name,
                        description: validated.description,
                        price: validated.price.to_string(),
                    }),
                );
                metrics::record_operation(op.kind().as_str(), "submitted");
                Ok(op)
            }
            Err(e) => Err(self.reject(&mut op, e)),
        }
    }

    /// Purchase `id` at its current ledger price.
    ///
    /// A listing already known locally as sold fails with `AlreadySold`
    /// without touching the provider. Otherwise the listing is re-read
    /// first; that check is best effort and the ledger still decides
    /// between concurrent buyers.
    pub async fn purchase_listing(&self, id: ListingId) -> GatewayResult<PendingOperation> {
        if self.cache.known_sold(id) {
            tracing::info!(listing = %id, "Purchase refused locally, listing already sold");
            metrics::record_operation(OperationKind::Purchase.as_str(), "already_sold");
            return Err(GatewayError::AlreadySold);
        }

        let kind = OperationKind::Purchase;
        let account = self.capture_account(kind).await?;
        let gateway = self.gateway_for_mutation(kind).await?;

        let listings = gateway.list_listings().await.inspect_err(|e| {
            metrics::record_operation(kind.as_str(), e.kind());
        })?;
        self.cache.replace(listings.clone());
        let Some(listing) = listings.into_iter().find(|l| l.id == id) else {
            metrics::record_operation(kind.as_str(), "listing_not_found");
            return Err(GatewayError::ListingNotFound(id));
        };
        if listing.is_sold {
            tracing::info!(listing = %id, "Purchase refused, pre-flight read shows listing sold");
            metrics::record_operation(kind.as_str(), "already_sold");
            return Err(GatewayError::AlreadySold);
        }

        let mut op = PendingOperation::draft(kind, Some(id), account, listing.price);
        op.transition(OperationState::Validated)?;
        self.ensure_account_bound(&op)?;

        match gateway.purchase_listing(account, id, listing.price).await {
            Ok(submission) => {
                op.mark_submitted(submission)?;
                self.cache.apply_optimistic(op.id(), Overlay::Purchase(id));
                metrics::record_operation(op.kind().as_str(), "submitted");
                Ok(op)
            }
            Err(e) => Err(self.reject(&mut op, e)),
        }
    }

    /// Wait up to `wait` for a submitted operation to settle.
    ///
    /// On `Timeout` the operation moves to `TimedOut` and may be waited on
    /// again. Dropping the future only stops waiting; the ledger may still
    /// apply the operation.
    pub async fn confirm(
        &self,
        op: &mut PendingOperation,
        wait: Duration,
    ) -> GatewayResult<Settlement> {
        let Some(submission) = op.submission().cloned() else {
            return Err(GatewayError::InvalidTransition(format!(
                "operation {} has not been submitted",
                op.id()
            )));
        };
        if !op.state().is_in_flight() {
            return Err(GatewayError::InvalidTransition(format!(
                "operation {} is already {}",
                op.id(),
                op.state()
            )));
        }

        let gateway = self.session.contract_on(submission.network).await?;
        match gateway.wait_for_settlement(&submission, wait).await {
            Ok(settlement) => {
                op.mark_confirmed(settlement)?;
                self.cache.resolve(op.id(), true);
                // The overlay may have expired while the caller waited.
                if let (OperationKind::Purchase, Some(id)) = (op.kind(), op.target_id()) {
                    self.cache.mark_sold(id);
                }
                metrics::record_operation(op.kind().as_str(), "confirmed");
                tracing::info!(
                    operation = %op.id(),
                    kind = op.kind().as_str(),
                    tx_hash = %settlement.tx_hash,
                    block = settlement.block_number,
                    "Operation confirmed"
                );
                Ok(settlement)
            }
            Err(GatewayError::Timeout(waited)) => {
                op.transition(OperationState::TimedOut)?;
                metrics::record_operation(op.kind().as_str(), "timed_out");
                tracing::warn!(
                    operation = %op.id(),
                    tx_hash = %submission.tx_hash,
                    waited = ?waited,
                    "Operation not confirmed in time"
                );
                Err(GatewayError::Timeout(waited))
            }
            Err(e @ (GatewayError::Reverted(_) | GatewayError::AlreadySold)) => {
                Err(self.reject(op, e))
            }
            // Provider trouble while polling says nothing about the outcome.
            Err(e) => Err(e),
        }
    }

    /// Submit a listing and wait for it with the configured timeout.
    pub async fn create_and_confirm(&self, input: NewListing) -> GatewayResult<Settlement> {
        let mut op = self.create_listing(input).await?;
        self.confirm(&mut op, self.settings.confirmation_timeout).await
    }

    /// Purchase a listing and wait for it with the configured timeout.
    pub async fn purchase_and_confirm(&self, id: ListingId) -> GatewayResult<Settlement> {
        let mut op = self.purchase_listing(id).await?;
        self.confirm(&mut op, self.settings.confirmation_timeout).await
    }

    /// The selected signer, as last reported by the provider.
    pub fn current_account(&self) -> Option<Address> {
        self.session.current_account()
    }

    /// Re-read the signer from the provider, connecting if needed.
    pub async fn refresh_account(&self) -> GatewayResult<Option<Address>> {
        self.session.refresh_accounts().await
    }

    /// Register `handler` for signer changes. `None` means no account.
    pub fn on_account_changed<F>(&self, handler: F) -> AccountSubscription
    where
        F: Fn(Option<Address>) + Send + Sync + 'static,
    {
        self.session
            .on_accounts_changed(move |accounts| handler(accounts.first().copied()))
    }

    /// Provider liveness.
    pub async fn probe(&self) -> GatewayResult<()> {
        let result = self.session.probe().await;
        metrics::record_provider_health(result.is_ok());
        result
    }

    /// Tear down the session.
    pub fn close(&self) {
        self.session.close();
    }

    /// Whitespace-only text is rejected; accepted text is submitted as given.
    fn validate_new_listing(&self, input: &NewListing) -> GatewayResult<ValidatedListing> {
        if input.name.trim().is_empty() {
            return Err(GatewayError::InvalidInput("name is required".to_string()));
        }
        if input.description.trim().is_empty() {
            return Err(GatewayError::InvalidInput("description is required".to_string()));
        }
        let price = to_base_units(&input.price, self.settings.decimals)?;
        if price.is_zero() {
            return Err(GatewayError::InvalidInput(
                "price must be greater than zero".to_string(),
            ));
        }
        Ok(ValidatedListing {
            name: input.name.clone(),
            description: input.description.clone(),
            price,
        })
    }

    async fn capture_account(&self, kind: OperationKind) -> GatewayResult<Address> {
        match self.session.refresh_accounts().await {
            Ok(Some(account)) => Ok(account),
            Ok(None) => {
                tracing::warn!(kind = kind.as_str(), "No account available, operation aborted");
                metrics::record_operation(kind.as_str(), "no_account");
                Err(GatewayError::NoAccount)
            }
            Err(e) => {
                metrics::record_operation(kind.as_str(), e.kind());
                Err(e)
            }
        }
    }

    /// The contract for a mutation. Fails closed on a network mismatch.
    async fn gateway_for_mutation(&self, kind: OperationKind) -> GatewayResult<ContractGateway> {
        let bound = async {
            let check = self.session.check_network().await?;
            check.require_match()?;
            self.session.contract(&check).await
        }
        .await;
        bound.inspect_err(|e| {
            tracing::warn!(
                kind = kind.as_str(),
                error = %e,
                "Operation aborted before submission"
            );
            metrics::record_operation(kind.as_str(), e.kind());
        })
    }

    /// The account captured by `op` must still be available to sign.
    fn ensure_account_bound(&self, op: &PendingOperation) -> GatewayResult<()> {
        if self.session.account_binder().contains(&op.submitted_account()) {
            return Ok(());
        }
        tracing::warn!(
            operation = %op.id(),
            account = %op.submitted_account(),
            "Captured account no longer available, operation aborted"
        );
        metrics::record_operation(op.kind().as_str(), "no_account");
        Err(GatewayError::NoAccount)
    }

    /// Record a rejection on `op` and hand the error back.
    fn reject(&self, op: &mut PendingOperation, error: GatewayError) -> GatewayError {
        let next = match &error {
            GatewayError::Declined => Some(OperationState::Declined),
            GatewayError::Reverted(_) | GatewayError::AlreadySold => Some(OperationState::Reverted),
            _ => None,
        };
        if let Some(next) = next {
            if let Err(e) = op.transition(next) {
                tracing::error!(operation = %op.id(), error = %e, "Rejection could not be recorded");
            }
            self.cache.resolve(op.id(), false);
        }
        if matches!(error, GatewayError::AlreadySold) {
            if let Some(id) = op.target_id() {
                self.cache.mark_sold(id);
            }
        }

        metrics::record_operation(op.kind().as_str(), error.kind());
        tracing::warn!(
            operation = %op.id(),
            kind = op.kind().as_str(),
            state = %op.state(),
            error = %error,
            "Operation rejected"
        );
        error
    }
}

impl fmt::Debug for ListingClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListingClient")
            .field("session", &self.session)
            .field("settings", &self.settings)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::contract::{Deployments, GatewaySettings};
    use crate::gateway::memory::{InMemoryChain, InMemoryProvider};
    use crate::gateway::types::NetworkId;
    use alloy::primitives::address;

    const CONTRACT: Address = address!("0x3F2e28eAf710b19e7472195CE825ca4277a9803C");
    const SELLER: Address = address!("0x00000000000000000000000000000000000000a1");
    const BUYER: Address = address!("0x00000000000000000000000000000000000000b2");

    fn client_for(provider: Arc<InMemoryProvider>) -> ListingClient {
        let session = ConnectionSession::new(
            ProviderResolver::new().with_injected(provider),
            NetworkValidator::new(NetworkId(5777)),
            Deployments::new().with(NetworkId(5777), CONTRACT),
            GatewaySettings {
                gas_limit: 3_000_000,
                poll_interval: Duration::from_millis(5),
            },
        );
        ListingClient::new(
            Arc::new(session),
            ClientSettings {
                confirmation_timeout: Duration::from_secs(1),
                read_retry: RetryPolicy {
                    max_attempts: 3,
                    base_delay_ms: 1,
                    max_delay_ms: 2,
                },
                ..ClientSettings::default()
            },
        )
    }

    fn new_listing(price: &str) -> NewListing {
        NewListing {
            name: "Vision model".to_string(),
            description: "Image classifier".to_string(),
            price: price.to_string(),
        }
    }

    #[test]
    fn test_fetch_error_classes() {
        let unreachable = FetchError::from(GatewayError::ProviderUnreachable("refused".into()));
        assert_eq!(unreachable.class, FetchErrorClass::Unreachable);
        assert!(unreachable.retryable);

        let mismatch = FetchError::from(GatewayError::NotDeployedOnNetwork(NetworkId(1)));
        assert_eq!(mismatch.class, FetchErrorClass::NetworkMismatch);
        assert!(!mismatch.retryable);

        let unknown = FetchError::from(GatewayError::Unknown("weird".into()));
        assert_eq!(unknown.class, FetchErrorClass::Unknown);
        assert!(unknown.retryable);
    }

    #[test]
    fn test_connection_setup_failures_are_not_retryable() {
        let denied = FetchError::from(GatewayError::AuthorizationDenied);
        assert_eq!(denied.class, FetchErrorClass::Unknown);
        assert!(!denied.retryable);

        let missing = FetchError::from(GatewayError::NoProviderAvailable);
        assert_eq!(missing.class, FetchErrorClass::Unreachable);
        assert!(!missing.retryable);
    }

    #[tokio::test]
    async fn test_invalid_input_never_connects() {
        let chain = InMemoryChain::new(NetworkId(5777), CONTRACT);
        let provider = chain.provider(vec![SELLER]);
        provider.set_reachable(false);
        let client = client_for(provider);

        for input in [
            new_listing("0"),
            new_listing("0.0"),
            new_listing("-1"),
            new_listing("abc"),
            NewListing {
                name: "  ".into(),
                ..new_listing("1.0")
            },
            NewListing {
                description: String::new(),
                ..new_listing("1.0")
            },
        ] {
            assert!(matches!(
                client.create_listing(input).await,
                Err(GatewayError::InvalidInput(_))
            ));
        }
        assert_eq!(chain.submitted_count(), 0);
    }

    #[tokio::test]
    async fn test_create_converts_price_exactly() {
        let chain = InMemoryChain::new(NetworkId(5777), CONTRACT);
        chain.set_auto_mine(true);
        let client = client_for(chain.provider(vec![SELLER]));

        let mut op = client.create_listing(new_listing("0.5")).await.unwrap();
        assert_eq!(op.state(), OperationState::Submitted);
        assert_eq!(op.submitted_account(), SELLER);
        assert_eq!(client.pending_creates().len(), 1);

        client.confirm(&mut op, Duration::from_secs(1)).await.unwrap();
        assert_eq!(op.state(), OperationState::Confirmed);
        assert!(client.pending_creates().is_empty());

        let listings = client.fetch_listings().await.unwrap();
        assert_eq!(listings[0].price, U256::from(500_000_000_000_000_000u64));
        assert_eq!(listings[0].seller, SELLER);
    }

    #[tokio::test]
    async fn test_listing_text_is_submitted_as_given() {
        let chain = InMemoryChain::new(NetworkId(5777), CONTRACT);
        chain.set_auto_mine(true);
        let client = client_for(chain.provider(vec![SELLER]));

        let input = NewListing {
            name: "  Vision model ".to_string(),
            description: "Image classifier\n".to_string(),
            price: "1".to_string(),
        };
        let mut op = client.create_listing(input).await.unwrap();
        client.confirm(&mut op, Duration::from_secs(1)).await.unwrap();

        let listings = client.fetch_listings().await.unwrap();
        assert_eq!(listings[0].name, "  Vision model ");
        assert_eq!(listings[0].description, "Image classifier\n");
    }

    #[tokio::test]
    async fn test_unconfirmed_create_settles_on_read() {
        let chain = InMemoryChain::new(NetworkId(5777), CONTRACT);
        chain.set_auto_mine(true);
        let client = client_for(chain.provider(vec![SELLER]));

        drop(client.create_listing(new_listing("3")).await.unwrap());
        assert_eq!(client.pending_creates().len(), 1);

        let listings = client.fetch_listings().await.unwrap();
        assert_eq!(listings.len(), 1);
        assert!(client.pending_creates().is_empty());
        assert_eq!(client.cache().overlay_count(), 0);
    }

    #[tokio::test]
    async fn test_declined_signature() {
        let chain = InMemoryChain::new(NetworkId(5777), CONTRACT);
        let provider = chain.provider(vec![SELLER]);
        let client = client_for(provider.clone());

        provider.decline_next_signature();
        assert_eq!(
            client.create_listing(new_listing("1")).await.unwrap_err(),
            GatewayError::Declined
        );
        assert_eq!(chain.submitted_count(), 0);
        assert!(client.pending_creates().is_empty());
    }

    #[tokio::test]
    async fn test_purchase_pays_listed_price() {
        let chain = InMemoryChain::new(NetworkId(5777), CONTRACT);
        chain.set_auto_mine(true);
        let id = chain.seed_listing("LLM", "Text model", U256::from(777), SELLER);
        let client = client_for(chain.provider(vec![BUYER]));

        let mut op = client.purchase_listing(id).await.unwrap();
        assert_eq!(op.submitted_value(), U256::from(777));
        assert_eq!(op.target_id(), Some(id));
        client.confirm(&mut op, Duration::from_secs(1)).await.unwrap();

        assert_eq!(chain.is_sold(id), Some(true));
        assert!(client.cache().known_sold(id));
    }

    #[tokio::test]
    async fn test_purchase_unknown_listing() {
        let chain = InMemoryChain::new(NetworkId(5777), CONTRACT);
        let client = client_for(chain.provider(vec![BUYER]));
        assert_eq!(
            client.purchase_listing(ListingId::from(3)).await.unwrap_err(),
            GatewayError::ListingNotFound(ListingId::from(3))
        );
        assert_eq!(chain.submitted_count(), 0);
    }

    #[tokio::test]
    async fn test_preflight_read_latches_sold() {
        let chain = InMemoryChain::new(NetworkId(5777), CONTRACT);
        chain.set_auto_mine(true);
        let id = chain.seed_listing("LLM", "Text model", U256::from(5), SELLER);
        let other = client_for(chain.provider(vec![SELLER]));
        other.purchase_and_confirm(id).await.unwrap();

        let client = client_for(chain.provider(vec![BUYER]));
        assert_eq!(client.purchase_listing(id).await.unwrap_err(), GatewayError::AlreadySold);
        assert!(client.cache().known_sold(id));
        assert_eq!(chain.submitted_count(), 1);
    }

    #[tokio::test]
    async fn test_timed_out_operation_can_be_confirmed_later() {
        let chain = InMemoryChain::new(NetworkId(5777), CONTRACT);
        let client = client_for(chain.provider(vec![SELLER]));

        let mut op = client.create_listing(new_listing("2")).await.unwrap();
        assert_eq!(
            client.confirm(&mut op, Duration::from_millis(20)).await,
            Err(GatewayError::Timeout(Duration::from_millis(20)))
        );
        assert_eq!(op.state(), OperationState::TimedOut);
        assert_eq!(client.pending_creates().len(), 1);

        chain.mine();
        client.confirm(&mut op, Duration::from_secs(1)).await.unwrap();
        assert_eq!(op.state(), OperationState::Confirmed);
        assert_eq!(chain.submitted_count(), 1);
    }

    #[tokio::test]
    async fn test_confirm_rejects_settled_operation() {
        let chain = InMemoryChain::new(NetworkId(5777), CONTRACT);
        chain.set_auto_mine(true);
        let client = client_for(chain.provider(vec![SELLER]));

        let mut op = client.create_listing(new_listing("2")).await.unwrap();
        client.confirm(&mut op, Duration::from_secs(1)).await.unwrap();
        assert!(matches!(
            client.confirm(&mut op, Duration::from_secs(1)).await,
            Err(GatewayError::InvalidTransition(_))
        ));
    }

    #[tokio::test]
    async fn test_account_change_handler_sees_selected_account() {
        let chain = InMemoryChain::new(NetworkId(5777), CONTRACT);
        let provider = chain.provider(vec![SELLER]);
        let client = client_for(provider.clone());
        client.refresh_account().await.unwrap();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let _sub = client.on_account_changed(move |account| {
            let _ = tx.send(account);
        });

        provider.set_accounts(vec![]);
        let seen = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(seen, None);
        assert_eq!(client.current_account(), None);
    }
}
