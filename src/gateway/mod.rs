//! Chain gateway subsystem.
//!
//! # Data Flow
//! ```text
//! provider.rs  (injected → legacy injected → configured endpoint)
//!     → session.rs (lazy, owns the handle, forwards account events)
//!     → network.rs (re-checks network identity on every operation)
//!     → contract.rs (address for the observed network, ABI encode/decode,
//!                    bounded-gas submission, settlement wait)
//! accounts.rs tracks the signer set; classify.rs maps provider failures.
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables, never logged
//! - Mutations fail closed on network mismatch
//! - A captured signer is never swapped for another one

pub mod accounts;
pub mod classify;
pub mod contract;
pub mod memory;
pub mod network;
pub mod provider;
pub mod rpc;
pub mod session;
pub mod transport;
pub mod types;
pub mod wallet;

pub use accounts::{AccountBinder, AccountSubscription};
pub use contract::{ContractGateway, Deployments, GatewaySettings, Submission};
pub use memory::{InMemoryChain, InMemoryProvider};
pub use network::{NetworkCheck, NetworkValidator};
pub use provider::{EndpointSettings, ProviderHandle, ProviderResolver};
pub use rpc::RpcTransport;
pub use session::ConnectionSession;
pub use transport::{ChainTransport, ProviderKind};
pub use types::{GatewayError, GatewayResult, Listing, ListingId, NetworkId, Settlement};
pub use wallet::Wallet;
