//! Control plane: serialized mutations and change fan-out.
//!
//! # Data Flow
//! ```text
//! WebSocket frame / admin request
//!     → message.rs (ClientMessage → MutationRequest)
//!     → orchestrator.rs (queue → store → router, one command at a time)
//!     → broadcaster.rs (configUpdate to every session, in commit order)
//!     → ack or error event to the requester only
//! ```
//!
//! # Design Decisions
//! - Mutation order is the orchestrator's queue order
//! - Every session observes the same sequence of snapshots
//! - Failed mutations broadcast nothing

pub mod broadcaster;
pub mod message;
pub mod orchestrator;

pub use broadcaster::{ChangeBroadcaster, SESSION_QUEUE_CAPACITY};
pub use message::{
    ClientMessage, MutationKind, MutationOutcome, MutationRequest, ServerEvent, SessionId,
};
pub use orchestrator::{apply_mutation, ControlError, Orchestrator, OrchestratorTask, Session};
