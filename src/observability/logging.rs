//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once at startup
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - `RUST_LOG` wins over the configured level
//! - The configured level applies to this crate and tower_http only

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_FILTER: &str = "mock_api=debug,tower_http=debug";

/// Build the filter used when `RUST_LOG` is unset.
pub fn default_filter(level: Option<&str>) -> String {
    match level {
        Some(level) => format!("mock_api={level},tower_http={level}"),
        None => DEFAULT_FILTER.to_string(),
    }
}

/// Install the global subscriber. Calling it twice is harmless.
pub fn init(level: Option<&str>) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(level).into());

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
