//! Listing subsystem: the public client API over the chain gateway.
//!
//! # Data Flow
//! ```text
//! caller (api/, embedding application)
//!     → client.rs (validation, account capture, classification)
//!         → units.rs (display amount ↔ base units, exact)
//!         → pending.rs (per-operation state machine)
//!         → gateway/ (session, network check, contract)
//!     → cache.rs (last read + optimistic overlays)
//! ```

pub mod cache;
pub mod client;
pub mod pending;
pub mod units;

pub use cache::{Overlay, PendingCreate, ReconciliationCache};
pub use client::{ClientSettings, FetchError, FetchErrorClass, ListingClient, NewListing};
pub use pending::{OperationKind, OperationState, PendingOperation};
pub use units::{to_base_units, to_display_units, DEFAULT_DECIMALS};
