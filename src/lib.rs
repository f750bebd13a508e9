//! Listing gateway library.
//!
//! Client-side gateway to an on-chain AI-model marketplace: provider
//! resolution, network validation, signer tracking, contract binding and a
//! typed listing API with local reconciliation.

pub mod api;
pub mod config;
pub mod gateway;
pub mod lifecycle;
pub mod listings;
pub mod observability;
pub mod resilience;

pub use config::GatewayConfig;
pub use gateway::{GatewayError, GatewayResult, Listing, ListingId, NetworkId};
pub use lifecycle::Shutdown;
pub use listings::{FetchError, ListingClient, NewListing};
