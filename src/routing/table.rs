//! Dynamic dispatch table for mock routes.
//!
//! # Responsibilities
//! - Define the capability the endpoint router needs from a request router
//!   ([`RouteSubstrate`]: bind and unbind a handler at path + method)
//! - Provide the concrete table consulted by the HTTP fallback handler
//!
//! # Design Decisions
//! - Exact (method, path) keys; no prefix or pattern matching
//! - Lookups clone the handler `Arc` out of the map, so no lock is held while
//!   a request is being answered

use std::sync::Arc;

use dashmap::DashMap;

use crate::routing::handler::MockHandler;
use crate::store::Method;

/// Exact match key for one mock route.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    pub method: Method,
    pub path: String,
}

impl RouteKey {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }

    /// The route for endpoint `name`: `/` + name.
    pub fn for_endpoint(name: &str, method: Method) -> Self {
        Self::new(method, format!("/{}", name))
    }
}

/// Minimal request-router capability used by [`EndpointRouter`](crate::routing::EndpointRouter).
pub trait RouteSubstrate: Send + Sync {
    /// Install `handler` at `key`, replacing any previous handler there.
    fn bind(&self, key: RouteKey, handler: Arc<MockHandler>);

    /// Remove the handler at `key`. Returns false if nothing was bound.
    fn unbind(&self, key: &RouteKey) -> bool;
}

/// Concurrent (method, path) → handler map.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: DashMap<RouteKey, Arc<MockHandler>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the handler for a request, if any.
    pub fn lookup(&self, method: Method, path: &str) -> Option<Arc<MockHandler>> {
        self.routes
            .get(&RouteKey::new(method, path))
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// All bound keys, sorted by path then method.
    pub fn keys(&self) -> Vec<RouteKey> {
        let mut keys: Vec<RouteKey> = self.routes.iter().map(|r| r.key().clone()).collect();
        keys.sort_by(|a, b| a.path.cmp(&b.path).then(a.method.cmp(&b.method)));
        keys
    }
}

impl RouteSubstrate for RouteTable {
    fn bind(&self, key: RouteKey, handler: Arc<MockHandler>) {
        self.routes.insert(key, handler);
    }

    fn unbind(&self, key: &RouteKey) -> bool {
        self.routes.remove(key).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_exact() {
        let table = RouteTable::new();
        let key = RouteKey::for_endpoint("users", Method::Get);
        table.bind(key.clone(), Arc::new(MockHandler::new("users", None)));

        assert!(table.lookup(Method::Get, "/users").is_some());
        assert!(table.lookup(Method::Post, "/users").is_none());
        assert!(table.lookup(Method::Get, "/users/1").is_none());
        assert!(table.lookup(Method::Get, "/user").is_none());

        assert!(table.unbind(&key));
        assert!(!table.unbind(&key));
        assert!(table.is_empty());
    }
}
