//! Mock route subsystem.
//!
//! # Data Flow
//! ```text
//! Store mutation (orchestrator)
//!     → router.rs (EndpointRouter: register / unregister / update)
//!     → table.rs (RouteSubstrate::bind / unbind)
//!
//! Incoming request (method, path)
//!     → table.rs (RouteTable::lookup, exact match)
//!     → handler.rs (MockHandler::respond)
//!     → payload.rs (expected field checks, body-bearing methods only)
//! ```
//!
//! # Design Decisions
//! - One live route per endpoint, at `/` + name for its configured method
//! - Handlers are immutable snapshots; reconfiguring means replacing them
//! - Unknown (method, path) pairs fall through to the HTTP layer's not-found

pub mod handler;
pub mod payload;
pub mod router;
pub mod table;

pub use handler::MockHandler;
pub use payload::{FieldViolation, PayloadRejection};
pub use router::EndpointRouter;
pub use table::{RouteKey, RouteSubstrate, RouteTable};
