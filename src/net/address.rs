//! Display address resolution.
//!
//! # Responsibilities
//! - Decide which host the server advertises in URLs and CORS origins
//!
//! # Design Decisions
//! - Explicit public address first, then the outbound local IPv4, then localhost
//! - The local IPv4 comes from a connected UDP socket; no packet is sent

use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};

const PROBE_TARGET: &str = "8.8.8.8:80";

/// Host and port under which the server is reachable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayAddress {
    pub host: String,
    pub port: u16,
}

impl DisplayAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Pick the advertised host for a server listening on `port`.
    pub fn resolve(public_address: Option<&str>, port: u16) -> Self {
        if let Some(host) = public_address.map(str::trim).filter(|h| !h.is_empty()) {
            return Self::new(host, port);
        }

        match local_ipv4() {
            Some(ip) => Self::new(ip.to_string(), port),
            None => Self::new("localhost", port),
        }
    }

    /// `http://<host>:<port>`
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Origins a browser UI served by this process may send.
    pub fn origins(&self) -> Vec<String> {
        let mut origins = vec![
            self.base_url(),
            format!("http://localhost:{}", self.port),
            format!("http://127.0.0.1:{}", self.port),
        ];
        origins.dedup();
        origins
    }
}

/// First non-loopback IPv4 the host would route outbound traffic from.
pub fn local_ipv4() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))).ok()?;
    socket.connect(PROBE_TARGET).ok()?;
    match socket.local_addr().ok()?.ip() {
        IpAddr::V4(ip) if !ip.is_loopback() && !ip.is_unspecified() => Some(ip),
        _ => None,
    }
}
