//! REST surface over the listing client.
//!
//! # Routes
//! - `GET  /listings` fresh read, reconciled view plus pending creates
//! - `POST /listings` create and wait for confirmation
//! - `POST /listings/{id}/purchase` purchase at the ledger price and wait
//! - `GET  /account` current signer
//! - `GET  /health` provider liveness and network identity

pub mod error;
pub mod handlers;
pub mod server;

pub use error::ApiError;
pub use server::{build_router, ApiServer, AppState};
