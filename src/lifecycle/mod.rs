//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build client → Bind listener
//!
//! Shutdown (shutdown.rs):
//!     Ctrl+C → Stop accepting → Drain requests → Close gateway session
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;
