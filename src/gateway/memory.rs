//! In-memory ledger.
//!
//! A deterministic stand-in for a chain node running the marketplace
//! contract. Calls go through the real ABI encoding, mutations are queued in
//! submission order and only take effect when mined, and each connected
//! [`InMemoryProvider`] behaves like a wallet: it has its own account set,
//! may deny authorization, decline a signature or switch networks. A
//! provider can be given further ledgers to reach when it switches to their
//! network.

use alloy::network::{Ethereum, TransactionBuilder};
use alloy::primitives::{keccak256, Address, Bytes, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::{Revert, SolCall, SolError, SolInterface};
use futures_util::future::BoxFuture;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

use crate::gateway::classify::classify_revert;
use crate::gateway::contract::{IMarketplace, ListingRecord};
use crate::gateway::transport::ChainTransport;
use crate::gateway::types::{GatewayError, GatewayResult, ListingId, NetworkId, TxOutcome};

struct QueuedTx {
    hash: TxHash,
    from: Address,
    value: U256,
    input: Bytes,
    /// Sent while the wallet pointed at another network; has no contract effect.
    foreign: bool,
}

struct ChainState {
    listings: Vec<ListingRecord>,
    mempool: VecDeque<QueuedTx>,
    receipts: HashMap<TxHash, TxOutcome>,
    block_number: u64,
    tx_counter: u64,
    submitted: usize,
    auto_mine: bool,
}

/// Shared ledger state.
pub struct InMemoryChain {
    network_id: NetworkId,
    contract: Address,
    state: Mutex<ChainState>,
}

impl InMemoryChain {
    pub fn new(network_id: NetworkId, contract: Address) -> Arc<Self> {
        Arc::new(Self {
            network_id,
            contract,
            state: Mutex::new(ChainState {
                listings: Vec::new(),
                mempool: VecDeque::new(),
                receipts: HashMap::new(),
                block_number: 0,
                tx_counter: 0,
                submitted: 0,
                auto_mine: false,
            }),
        })
    }

    pub fn network_id(&self) -> NetworkId {
        self.network_id
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    /// Connect a wallet-like provider holding `accounts`.
    pub fn provider(self: &Arc<Self>, accounts: Vec<Address>) -> Arc<InMemoryProvider> {
        let (accounts_tx, _) = watch::channel(accounts);
        Arc::new(InMemoryProvider {
            chain: Arc::clone(self),
            accounts: accounts_tx,
            network_id: AtomicU64::new(self.network_id.0),
            networks: Mutex::new(Vec::new()),
            authorize: AtomicBool::new(true),
            authorization_requests: AtomicUsize::new(0),
            decline_next: AtomicBool::new(false),
            reachable: AtomicBool::new(true),
        })
    }

    /// Mine every submission as soon as it arrives.
    pub fn set_auto_mine(&self, enabled: bool) {
        self.state().auto_mine = enabled;
    }

    /// Mine all queued transactions in submission order. Returns how many
    /// were mined.
    pub fn mine(&self) -> usize {
        let mut state = self.state();
        Self::mine_locked(&mut state)
    }

    /// Total transactions ever accepted.
    pub fn submitted_count(&self) -> usize {
        self.state().submitted
    }

    /// Transactions waiting to be mined.
    pub fn pending_count(&self) -> usize {
        self.state().mempool.len()
    }

    /// Insert a listing directly, bypassing transactions.
    pub fn seed_listing(&self, name: &str, description: &str, price: U256, seller: Address) -> ListingId {
        let mut state = self.state();
        let id = U256::from(state.listings.len());
        state.listings.push(ListingRecord {
            id,
            name: name.to_string(),
            description: description.to_string(),
            price,
            seller,
            isSold: false,
        });
        ListingId(id)
    }

    /// Mark `id` sold directly, bypassing transactions.
    pub fn force_sold(&self, id: ListingId) {
        if let Some(record) = self.state().listings.iter_mut().find(|r| r.id == id.0) {
            record.isSold = true;
        }
    }

    /// Whether the ledger records `id` as sold.
    pub fn is_sold(&self, id: ListingId) -> Option<bool> {
        self.state()
            .listings
            .iter()
            .find(|r| r.id == id.0)
            .map(|r| r.isSold)
    }

    fn state(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn mine_locked(state: &mut ChainState) -> usize {
        let mut mined = 0;
        while let Some(tx) = state.mempool.pop_front() {
            state.block_number += 1;
            let success = tx.foreign || execute(&mut state.listings, tx.from, tx.value, &tx.input).is_ok();
            state.receipts.insert(
                tx.hash,
                TxOutcome {
                    tx_hash: tx.hash,
                    block_number: state.block_number,
                    success,
                },
            );
            mined += 1;
        }
        mined
    }
}

fn revert(reason: &str) -> Bytes {
    Revert {
        reason: reason.to_string(),
    }
    .abi_encode()
    .into()
}

/// Run one contract call against `listings`, mimicking the contract's checks.
fn execute(
    listings: &mut Vec<ListingRecord>,
    from: Address,
    value: U256,
    input: &[u8],
) -> Result<Bytes, Bytes> {
    let call = IMarketplace::IMarketplaceCalls::abi_decode(input).map_err(|_| Bytes::new())?;

    match call {
        IMarketplace::IMarketplaceCalls::listListings(_) => Ok(
            IMarketplace::listListingsCall::abi_encode_returns(listings).into(),
        ),
        IMarketplace::IMarketplaceCalls::createListing(c) => {
            if c.name.is_empty() || c.description.is_empty() {
                return Err(revert("Name and description are required"));
            }
            if c.price.is_zero() {
                return Err(revert("Price must be greater than zero"));
            }
            let id = U256::from(listings.len());
            listings.push(ListingRecord {
                id,
                name: c.name,
                description: c.description,
                price: c.price,
                seller: from,
                isSold: false,
            });
            Ok(Bytes::new())
        }
        IMarketplace::IMarketplaceCalls::purchaseListing(c) => {
            let record = listings
                .iter_mut()
                .find(|r| r.id == c.id)
                .ok_or_else(|| revert("Listing does not exist"))?;
            if record.isSold {
                return Err(revert("Listing already sold"));
            }
            if value != record.price {
                return Err(revert("Incorrect payment amount"));
            }
            record.isSold = true;
            Ok(Bytes::new())
        }
    }
}

/// One wallet connection to an [`InMemoryChain`].
pub struct InMemoryProvider {
    chain: Arc<InMemoryChain>,
    accounts: watch::Sender<Vec<Address>>,
    network_id: AtomicU64,
    authorize: AtomicBool,
    decline_next: AtomicBool,
    reachable: AtomicBool,
    /// Other ledgers reachable after a network switch.
    networks: Mutex<Vec<Arc<InMemoryChain>>>,
    authorization_requests: AtomicUsize,
}

impl InMemoryProvider {
    /// Make `chain` reachable while the wallet points at its network.
    pub fn add_network(&self, chain: Arc<InMemoryChain>) {
        self.networks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(chain);
    }

    /// How many times authorization was requested.
    pub fn authorization_requests(&self) -> usize {
        self.authorization_requests.load(Ordering::SeqCst)
    }

    /// Replace the account set, notifying subscribers.
    pub fn set_accounts(&self, accounts: Vec<Address>) {
        self.accounts.send_replace(accounts);
    }

    /// Make the next authorization request fail as if the user refused.
    pub fn deny_authorization(&self) {
        self.authorize.store(false, Ordering::SeqCst);
    }

    /// Make the next signature prompt fail as if the user refused.
    pub fn decline_next_signature(&self) {
        self.decline_next.store(true, Ordering::SeqCst);
    }

    /// Point the wallet at another network.
    pub fn switch_network(&self, network: NetworkId) {
        self.network_id.store(network.0, Ordering::SeqCst);
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn chain(&self) -> &Arc<InMemoryChain> {
        &self.chain
    }

    fn ensure_reachable(&self) -> GatewayResult<()> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(GatewayError::ProviderUnreachable(
                "in-memory provider disconnected".to_string(),
            ))
        }
    }

    /// The ledger behind the wallet's current network, if it has one.
    fn active_chain(&self) -> Option<Arc<InMemoryChain>> {
        let current = self.network_id.load(Ordering::SeqCst);
        if current == self.chain.network_id.0 {
            return Some(Arc::clone(&self.chain));
        }
        self.networks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .find(|chain| chain.network_id.0 == current)
            .cloned()
    }

    fn all_chains(&self) -> Vec<Arc<InMemoryChain>> {
        let mut chains = vec![Arc::clone(&self.chain)];
        chains.extend(
            self.networks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .iter()
                .cloned(),
        );
        chains
    }
}

impl ChainTransport for InMemoryProvider {
    fn request_accounts(&self) -> BoxFuture<'_, GatewayResult<Vec<Address>>> {
        Box::pin(async move {
            self.ensure_reachable()?;
            self.authorization_requests.fetch_add(1, Ordering::SeqCst);
            if !self.authorize.swap(true, Ordering::SeqCst) {
                return Err(GatewayError::AuthorizationDenied);
            }
            Ok(self.accounts.borrow().clone())
        })
    }

    fn accounts(&self) -> BoxFuture<'_, GatewayResult<Vec<Address>>> {
        Box::pin(async move {
            self.ensure_reachable()?;
            Ok(self.accounts.borrow().clone())
        })
    }

    fn network_id(&self) -> BoxFuture<'_, GatewayResult<NetworkId>> {
        Box::pin(async move {
            self.ensure_reachable()?;
            Ok(NetworkId(self.network_id.load(Ordering::SeqCst)))
        })
    }

    fn probe(&self) -> BoxFuture<'_, GatewayResult<()>> {
        Box::pin(async move { self.ensure_reachable() })
    }

    fn call(&self, tx: TransactionRequest) -> BoxFuture<'_, GatewayResult<Bytes>> {
        Box::pin(async move {
            self.ensure_reachable()?;
            let Some(chain) = self.active_chain().filter(|c| TransactionBuilder::<Ethereum>::to(&tx) == Some(c.contract)) else {
                return Ok(Bytes::new());
            };

            let from = TransactionBuilder::<Ethereum>::from(&tx).unwrap_or_default();
            let value = TransactionBuilder::<Ethereum>::value(&tx).unwrap_or_default();
            let input = TransactionBuilder::<Ethereum>::input(&tx).cloned().unwrap_or_default();

            // Calls never persist: run against a copy of the state.
            let mut scratch = chain.state().listings.clone();
            execute(&mut scratch, from, value, &input).map_err(|data| classify_revert(&data))
        })
    }

    fn send_transaction(&self, tx: TransactionRequest) -> BoxFuture<'_, GatewayResult<TxHash>> {
        Box::pin(async move {
            self.ensure_reachable()?;
            if self.decline_next.swap(false, Ordering::SeqCst) {
                return Err(GatewayError::Declined);
            }

            let from = TransactionBuilder::<Ethereum>::from(&tx).unwrap_or_default();
            if !self.accounts.borrow().contains(&from) {
                return Err(GatewayError::Unknown(format!(
                    "account {} is not managed by this provider",
                    from
                )));
            }

            let target = self.active_chain().filter(|c| TransactionBuilder::<Ethereum>::to(&tx) == Some(c.contract));
            let foreign = target.is_none();
            let chain = target.unwrap_or_else(|| Arc::clone(&self.chain));

            let mut state = chain.state();
            state.tx_counter += 1;
            state.submitted += 1;
            let mut seed = [0u8; 16];
            seed[..8].copy_from_slice(&chain.network_id.0.to_be_bytes());
            seed[8..].copy_from_slice(&state.tx_counter.to_be_bytes());
            let hash = keccak256(seed);
            state.mempool.push_back(QueuedTx {
                hash,
                from,
                value: TransactionBuilder::<Ethereum>::value(&tx).unwrap_or_default(),
                input: TransactionBuilder::<Ethereum>::input(&tx).cloned().unwrap_or_default(),
                foreign,
            });
            if state.auto_mine {
                InMemoryChain::mine_locked(&mut state);
            }
            Ok(hash)
        })
    }

    fn transaction_receipt(
        &self,
        tx_hash: TxHash,
    ) -> BoxFuture<'_, GatewayResult<Option<TxOutcome>>> {
        Box::pin(async move {
            self.ensure_reachable()?;
            Ok(self
                .all_chains()
                .iter()
                .find_map(|chain| chain.state().receipts.get(&tx_hash).copied()))
        })
    }

    fn account_events(&self) -> Option<watch::Receiver<Vec<Address>>> {
        Some(self.accounts.subscribe())
    }
}
