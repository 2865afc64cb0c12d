//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! bound listener port + configured public address
//!     → address.rs (DisplayAddress: host detection, base URL, origins)
//!     → default endpoint bodies, CORS origins, /api/config
//! ```

pub mod address;

pub use address::{local_ipv4, DisplayAddress};
