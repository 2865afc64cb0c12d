//! Fan-out of control events to connected sessions.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::control::message::{ServerEvent, SessionId};
use crate::observability::metrics;
use crate::store::Snapshot;

/// Events a session may have queued before it is treated as stalled.
pub const SESSION_QUEUE_CAPACITY: usize = 64;

/// Tracks connected observer sessions and pushes events to them.
///
/// Each session has its own bounded FIFO queue; the broadcaster is only
/// driven from the orchestrator task, so every session sees events in commit
/// order. A session whose queue is full is detached rather than skipped, so
/// no session ever observes a gap. Closing its queue ends the connection and
/// the client gets a fresh snapshot when it reconnects.
#[derive(Debug, Default)]
pub struct ChangeBroadcaster {
    sessions: HashMap<SessionId, mpsc::Sender<ServerEvent>>,
}

impl ChangeBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session and send it `snapshot` as its first event.
    pub fn attach(
        &mut self,
        session: SessionId,
        events: mpsc::Sender<ServerEvent>,
        snapshot: Arc<Snapshot>,
    ) {
        self.sessions.insert(session, events);
        metrics::record_sessions(self.sessions.len());
        tracing::info!(session = %session, sessions = self.sessions.len(), "Client connected");
        self.send_to(session, ServerEvent::ConfigUpdate(snapshot));
    }

    pub fn detach(&mut self, session: SessionId) -> bool {
        let removed = self.sessions.remove(&session).is_some();
        if removed {
            metrics::record_sessions(self.sessions.len());
            tracing::info!(session = %session, sessions = self.sessions.len(), "Client disconnected");
        }
        removed
    }

    /// Send one event to one session. A closed or stalled session is dropped.
    pub fn send_to(&mut self, session: SessionId, event: ServerEvent) -> bool {
        let Some(events) = self.sessions.get(&session) else {
            return false;
        };
        if let Err(e) = events.try_send(event) {
            self.drop_session(session, &e);
            return false;
        }
        true
    }

    /// Push `snapshot` to every session. Returns how many received it.
    pub fn push_all(&mut self, snapshot: Arc<Snapshot>) -> usize {
        let event = ServerEvent::ConfigUpdate(snapshot);
        let mut failed = Vec::new();
        let mut delivered = 0;

        for (session, events) in &self.sessions {
            match events.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => failed.push((*session, e)),
            }
        }

        for (session, e) in failed {
            self.drop_session(session, &e);
        }

        tracing::debug!(sessions = delivered, "Broadcast configuration update");
        delivered
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    fn drop_session(&mut self, session: SessionId, error: &TrySendError<ServerEvent>) {
        if let TrySendError::Full(_) = error {
            tracing::warn!(
                session = %session,
                capacity = SESSION_QUEUE_CAPACITY,
                "Disconnecting slow client (event queue full)"
            );
            metrics::record_slow_session();
        }
        self.detach(session);
    }
}
