//! Control-plane message types.
//!
//! Wire format: JSON envelopes `{"event": "<name>", "data": <payload>}`.
//!
//! ```text
//! inbound  addEndpoint {endpoint, config}   removeEndpoint "<name>"
//!          updateConfig {"<name>": {...}}   renameEndpoint {oldName, newName}
//! outbound configUpdate <snapshot>
//!          addSuccess / addError, removeSuccess / removeError,
//!          updateSuccess / updateError, renameSuccess / renameError, error
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::{EndpointChanges, EndpointDraft, Snapshot, StoreError};

/// Identity of one connected control session.
pub type SessionId = Uuid;

/// Frame sent by a control client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    AddEndpoint {
        endpoint: String,
        #[serde(default)]
        config: EndpointDraft,
    },
    RemoveEndpoint(String),
    UpdateConfig(EndpointChanges),
    RenameEndpoint {
        old_name: String,
        new_name: String,
    },
}

/// A mutation of the registry, independent of where it came from.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationRequest {
    Add {
        endpoint: String,
        config: EndpointDraft,
    },
    /// Acks and errors name the first endpoint in `changes`.
    Update {
        changes: EndpointChanges,
    },
    Remove {
        endpoint: String,
    },
    Rename {
        old_name: String,
        new_name: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Add,
    Update,
    Remove,
    Rename,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::Add => "add",
            MutationKind::Update => "update",
            MutationKind::Remove => "remove",
            MutationKind::Rename => "rename",
        }
    }
}

impl MutationRequest {
    pub fn kind(&self) -> MutationKind {
        match self {
            MutationRequest::Add { .. } => MutationKind::Add,
            MutationRequest::Update { .. } => MutationKind::Update,
            MutationRequest::Remove { .. } => MutationKind::Remove,
            MutationRequest::Rename { .. } => MutationKind::Rename,
        }
    }

    /// The kind-tagged error event for a failed request.
    pub fn error_event(&self, error: &StoreError) -> ServerEvent {
        let message = error.to_string();
        match self {
            MutationRequest::Add { endpoint, .. } => ServerEvent::AddError {
                endpoint: endpoint.clone(),
                message,
            },
            MutationRequest::Update { changes } => ServerEvent::UpdateError {
                endpoint: changes.keys().next().cloned(),
                message,
            },
            MutationRequest::Remove { endpoint } => ServerEvent::RemoveError {
                endpoint: endpoint.clone(),
                message,
            },
            MutationRequest::Rename { old_name, new_name } => ServerEvent::RenameError {
                old_name: old_name.clone(),
                new_name: new_name.clone(),
                message,
            },
        }
    }
}

impl From<ClientMessage> for MutationRequest {
    fn from(message: ClientMessage) -> Self {
        match message {
            ClientMessage::AddEndpoint { endpoint, config } => {
                MutationRequest::Add { endpoint, config }
            }
            ClientMessage::RemoveEndpoint(endpoint) => MutationRequest::Remove { endpoint },
            ClientMessage::UpdateConfig(changes) => MutationRequest::Update { changes },
            ClientMessage::RenameEndpoint { old_name, new_name } => {
                MutationRequest::Rename { old_name, new_name }
            }
        }
    }
}

/// Result of a committed mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    Added { endpoint: String },
    Updated { endpoint: String },
    Removed { endpoint: String },
    Renamed { old_name: String, new_name: String },
}

impl MutationOutcome {
    /// The success acknowledgment sent to the requester.
    pub fn ack(&self, timestamp: String) -> ServerEvent {
        match self {
            MutationOutcome::Added { endpoint } => ServerEvent::AddSuccess {
                endpoint: endpoint.clone(),
                timestamp,
            },
            MutationOutcome::Updated { endpoint } => ServerEvent::UpdateSuccess {
                endpoint: endpoint.clone(),
                timestamp,
            },
            MutationOutcome::Removed { endpoint } => ServerEvent::RemoveSuccess {
                endpoint: endpoint.clone(),
                timestamp,
            },
            MutationOutcome::Renamed { old_name, new_name } => ServerEvent::RenameSuccess {
                old_name: old_name.clone(),
                new_name: new_name.clone(),
                timestamp,
            },
        }
    }
}

/// Frame sent to control clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// Full snapshot, broadcast after every committed mutation.
    ConfigUpdate(Arc<Snapshot>),
    AddSuccess {
        endpoint: String,
        timestamp: String,
    },
    AddError {
        endpoint: String,
        message: String,
    },
    RemoveSuccess {
        endpoint: String,
        timestamp: String,
    },
    RemoveError {
        endpoint: String,
        message: String,
    },
    UpdateSuccess {
        endpoint: String,
        timestamp: String,
    },
    UpdateError {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        endpoint: Option<String>,
        message: String,
    },
    RenameSuccess {
        old_name: String,
        new_name: String,
        timestamp: String,
    },
    RenameError {
        old_name: String,
        new_name: String,
        message: String,
    },
    /// An inbound frame could not be understood.
    Error {
        message: String,
    },
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::ConfigUpdate(_) => "configUpdate",
            ServerEvent::AddSuccess { .. } => "addSuccess",
            ServerEvent::AddError { .. } => "addError",
            ServerEvent::RemoveSuccess { .. } => "removeSuccess",
            ServerEvent::RemoveError { .. } => "removeError",
            ServerEvent::UpdateSuccess { .. } => "updateSuccess",
            ServerEvent::UpdateError { .. } => "updateError",
            ServerEvent::RenameSuccess { .. } => "renameSuccess",
            ServerEvent::RenameError { .. } => "renameError",
            ServerEvent::Error { .. } => "error",
        }
    }
}

/// Display timestamp carried by success acknowledgments.
pub fn display_timestamp() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}
