//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, graceful shutdown)
//!     → /api/*      → admin.rs (REST over the orchestrator)
//!     → /api/ws     → websocket.rs (control sessions)
//!     → everything else → mock.rs (route table, then static files)
//! ```

pub mod admin;
pub mod error;
pub mod mock;
pub mod server;
pub mod websocket;

pub use error::ApiError;
pub use server::{AppState, HttpServer};
