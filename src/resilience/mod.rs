//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Listing read:
//!     → retries.rs (retry only retryable failures)
//!     → backoff.rs (exponential delay with jitter between attempts)
//! ```
//!
//! # Design Decisions
//! - Every provider call already carries its own deadline (gateway/rpc.rs)
//! - Reads are idempotent and may be retried; mutations never are

pub mod backoff;
pub mod retries;

pub use retries::{retry_with_backoff, RetryPolicy};
