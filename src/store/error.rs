//! Error taxonomy for the endpoint registry.

use thiserror::Error;

/// Errors produced by [`ConfigStore`](crate::store::ConfigStore) operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Malformed or out-of-range endpoint configuration.
    #[error("{0}")]
    Validation(String),

    /// Name collision on add or rename target.
    #[error("{0}")]
    Conflict(String),

    /// Operation on an unknown endpoint name.
    #[error("{0}")]
    NotFound(String),

    /// Malformed persisted file or inbound JSON.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The full rewrite of the persisted file failed; nothing was committed.
    #[error("Failed to persist endpoints: {0}")]
    Storage(#[from] std::io::Error),
}

impl StoreError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Validation(_) => "validation",
            StoreError::Conflict(_) => "conflict",
            StoreError::NotFound(_) => "not_found",
            StoreError::Parse(_) => "parse",
            StoreError::Storage(_) => "storage",
        }
    }
}
