//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → HTTP server stops accepting and drains
//!             → orchestrator task exits its command loop
//! ```
//!
//! # Design Decisions
//! - Ordered startup lives in main: config, logging, store, listener
//! - One broadcast channel fans the stop signal out to every task

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
