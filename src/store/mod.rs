//! Endpoint configuration store.
//!
//! # Data Flow
//! ```text
//! endpoints.json
//!     → persist.rs (read, migrate legacy entries)
//!     → ConfigStore (canonical map, validated mutations)
//!     → Arc<Snapshot> handed to the router and to observers
//!
//! On mutation:
//!     EndpointDraft → endpoint.rs (defaults + checks)
//!     → next map → persist.rs (full rewrite) → swap in
//! ```
//!
//! # Design Decisions
//! - The store is the only owner of endpoint data; everything else holds
//!   derived copies
//! - Load problems never stop startup; the built-in default set is used instead

pub mod config_store;
pub mod endpoint;
pub mod error;
pub mod persist;

pub use config_store::ConfigStore;
pub use endpoint::{
    validate_name, EndpointChanges, EndpointConfig, EndpointDraft, Method, Snapshot,
};
pub use error::StoreError;

use serde_json::json;

/// Endpoints served when no persisted file can be loaded.
pub fn default_endpoints(base_url: &str) -> Snapshot {
    ["a", "b", "c"]
        .into_iter()
        .map(|name| {
            let config = EndpointConfig {
                body: json!({ "message": format!("Response from {}/{}", base_url, name) }),
                ..EndpointConfig::default()
            };
            (name.to_string(), config)
        })
        .collect()
}
