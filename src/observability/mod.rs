//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! gateway + listings + api:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Request id (`x-request-id`) is attached to every HTTP span
//! - Private keys and raw signer material are never logged

pub mod logging;
pub mod metrics;
