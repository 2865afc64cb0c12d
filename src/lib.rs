//! Mock API server library: a live-reconfigurable registry of canned HTTP endpoints.

pub mod config;
pub mod control;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod registry;
pub mod routing;
pub mod store;

pub use config::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use registry::Registry;
