//! Active signer tracking.
//!
//! The account set is held behind an `ArcSwap`, so every read is a snapshot.
//! Handlers registered with [`AccountBinder::on_accounts_changed`] stay
//! registered until their [`AccountSubscription`] is dropped or the binder
//! is cleared at session teardown.

use alloy::primitives::Address;
use arc_swap::ArcSwap;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

type AccountHandler = Arc<dyn Fn(&[Address]) + Send + Sync>;
type HandlerMap = DashMap<u64, AccountHandler>;

/// Tracks the provider's account set over a session's lifetime.
pub struct AccountBinder {
    accounts: ArcSwap<Vec<Address>>,
    handlers: Arc<HandlerMap>,
    next_handler_id: AtomicU64,
}

impl AccountBinder {
    pub fn new() -> Self {
        Self {
            accounts: ArcSwap::from_pointee(Vec::new()),
            handlers: Arc::new(DashMap::new()),
            next_handler_id: AtomicU64::new(0),
        }
    }

    /// The selected signer, if any.
    pub fn current_account(&self) -> Option<Address> {
        self.accounts.load().first().copied()
    }

    /// Snapshot of the whole account set.
    pub fn accounts(&self) -> Arc<Vec<Address>> {
        self.accounts.load_full()
    }

    pub fn contains(&self, account: &Address) -> bool {
        self.accounts.load().contains(account)
    }

    /// Replace the account set. Handlers run only when it actually changed.
    /// Returns whether it changed.
    pub fn update(&self, next: Vec<Address>) -> bool {
        let next = Arc::new(next);
        let previous = self.accounts.swap(Arc::clone(&next));
        if *previous == *next {
            return false;
        }

        tracing::info!(
            previous = ?previous.first(),
            current = ?next.first(),
            accounts = next.len(),
            "Active accounts changed"
        );

        // Clone handlers out so none runs while a map shard is locked.
        let handlers: Vec<AccountHandler> =
            self.handlers.iter().map(|entry| Arc::clone(entry.value())).collect();
        for handler in handlers {
            handler(&next);
        }
        true
    }

    /// Register a callback invoked with the new account set on every change.
    pub fn on_accounts_changed<F>(&self, handler: F) -> AccountSubscription
    where
        F: Fn(&[Address]) + Send + Sync + 'static,
    {
        let id = self.next_handler_id.fetch_add(1, Ordering::Relaxed);
        self.handlers.insert(id, Arc::new(handler));
        AccountSubscription {
            id,
            handlers: Arc::downgrade(&self.handlers),
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Drop every registered handler.
    pub fn clear_handlers(&self) {
        self.handlers.clear();
    }
}

impl Default for AccountBinder {
    fn default() -> Self {
        Self::new()
    }
}

/// Registration handle; dropping it unregisters the handler.
#[must_use = "dropping the subscription unregisters the handler"]
pub struct AccountSubscription {
    id: u64,
    handlers: Weak<HandlerMap>,
}

impl AccountSubscription {
    /// Unregister now.
    pub fn unsubscribe(self) {}
}

impl Drop for AccountSubscription {
    fn drop(&mut self) {
        if let Some(handlers) = self.handlers.upgrade() {
            handlers.remove(&self.id);
        }
    }
}
