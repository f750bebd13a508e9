//! Connection session.
//!
//! Owns the provider handle for one user context. The handle is resolved
//! lazily on first use and kept until [`ConnectionSession::close`]; account
//! changes mutate the binder in place without tearing the session down.

use alloy::primitives::Address;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;

use crate::gateway::accounts::{AccountBinder, AccountSubscription};
use crate::gateway::contract::{ContractGateway, Deployments, GatewaySettings};
use crate::gateway::network::{NetworkCheck, NetworkValidator};
use crate::gateway::provider::{ProviderHandle, ProviderResolver};
use crate::gateway::types::{GatewayError, GatewayResult, NetworkId};

/// One active binding between the client and a provider.
pub struct ConnectionSession {
    resolver: ProviderResolver,
    validator: NetworkValidator,
    deployments: Deployments,
    settings: GatewaySettings,
    handle: OnceCell<ProviderHandle>,
    accounts: Arc<AccountBinder>,
    forwarder: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl ConnectionSession {
    pub fn new(
        resolver: ProviderResolver,
        validator: NetworkValidator,
        deployments: Deployments,
        settings: GatewaySettings,
    ) -> Self {
        Self {
            resolver,
            validator,
            deployments,
            settings,
            handle: OnceCell::new(),
            accounts: Arc::new(AccountBinder::new()),
            forwarder: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// The provider handle, resolving it on first use. A failed resolution
    /// is not cached; the next call attempts it again.
    pub async fn provider(&self) -> GatewayResult<&ProviderHandle> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(GatewayError::ProviderUnreachable("session closed".to_string()));
        }
        self.handle.get_or_try_init(|| self.establish()).await
    }

    async fn establish(&self) -> GatewayResult<ProviderHandle> {
        let handle = self.resolver.resolve().await?;

        let initial = match handle.authorized_accounts() {
            Some(granted) => granted.to_vec(),
            None => handle.transport().accounts().await?,
        };
        self.accounts.update(initial);

        if let Some(mut events) = handle.transport().account_events() {
            let binder = Arc::clone(&self.accounts);
            let task = tokio::spawn(async move {
                while events.changed().await.is_ok() {
                    let next = events.borrow_and_update().clone();
                    binder.update(next);
                }
            });
            let mut slot = self.forwarder.lock().unwrap_or_else(|p| p.into_inner());
            if let Some(previous) = slot.replace(task) {
                previous.abort();
            }
        }

        tracing::info!(
            provider = handle.kind().as_str(),
            account = ?self.accounts.current_account(),
            "Session established"
        );
        Ok(handle)
    }

    /// Compare the provider's current network with the expected one.
    pub async fn check_network(&self) -> GatewayResult<NetworkCheck> {
        let handle = self.provider().await?;
        self.validator.validate(handle.transport().as_ref()).await
    }

    /// Bind the contract for the network observed in `check`.
    pub async fn contract(&self, check: &NetworkCheck) -> GatewayResult<ContractGateway> {
        self.contract_on(check.observed).await
    }

    /// Bind the contract deployed on `network`.
    pub async fn contract_on(&self, network: NetworkId) -> GatewayResult<ContractGateway> {
        let handle = self.provider().await?;
        ContractGateway::bind(
            Arc::clone(handle.transport()),
            network,
            &self.deployments,
            self.settings,
        )
    }

    /// Re-read the account set from the provider.
    pub async fn refresh_accounts(&self) -> GatewayResult<Option<Address>> {
        let handle = self.provider().await?;
        let accounts = handle.transport().accounts().await?;
        self.accounts.update(accounts);
        Ok(self.accounts.current_account())
    }

    /// Check the provider is still answering.
    pub async fn probe(&self) -> GatewayResult<()> {
        self.provider().await?.transport().probe().await
    }

    pub fn account_binder(&self) -> &AccountBinder {
        &self.accounts
    }

    pub fn current_account(&self) -> Option<Address> {
        self.accounts.current_account()
    }

    pub fn on_accounts_changed<F>(&self, handler: F) -> AccountSubscription
    where
        F: Fn(&[Address]) + Send + Sync + 'static,
    {
        self.accounts.on_accounts_changed(handler)
    }

    pub fn expected_network(&self) -> NetworkId {
        self.validator.expected()
    }

    pub fn deployments(&self) -> &Deployments {
        &self.deployments
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Tear the session down: stop event forwarding and drop all handlers.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.stop_forwarder();
        self.accounts.clear_handlers();
        tracing::info!("Session closed");
    }

    fn stop_forwarder(&self) {
        let mut slot = self.forwarder.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(task) = slot.take() {
            task.abort();
        }
    }
}

impl Drop for ConnectionSession {
    fn drop(&mut self) {
        self.stop_forwarder();
    }
}

impl std::fmt::Debug for ConnectionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSession")
            .field("expected_network", &self.validator.expected())
            .field("deployments", &self.deployments.len())
            .field("handle", &self.handle.get())
            .field("closed", &self.is_closed())
            .finish()
    }
}
