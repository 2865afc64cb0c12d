//! Bridge from store entries to live routes.
//!
//! # Responsibilities
//! - Keep at most one registration per endpoint name
//! - Translate register/unregister/update into substrate bind/unbind
//! - Report which endpoints are currently bound
//!
//! # Design Decisions
//! - Holds no authoritative data, only name → method so it can find the
//!   route to unbind
//! - Update is unregister followed by register; a request arriving between the
//!   two sees not-found, never the previous handler

use std::collections::HashMap;
use std::sync::Arc;

use crate::routing::handler::MockHandler;
use crate::routing::table::{RouteKey, RouteSubstrate};
use crate::store::{EndpointConfig, Method, Snapshot};

pub struct EndpointRouter {
    bindings: HashMap<String, Method>,
    substrate: Arc<dyn RouteSubstrate>,
}

impl EndpointRouter {
    pub fn new(substrate: Arc<dyn RouteSubstrate>) -> Self {
        Self {
            bindings: HashMap::new(),
            substrate,
        }
    }

    /// Bind `/name` for the config's method. No-op if `name` is already bound.
    ///
    /// Returns whether a new registration was made.
    pub fn register(&mut self, name: &str, config: Option<&EndpointConfig>) -> bool {
        if self.bindings.contains_key(name) {
            tracing::debug!(endpoint = %name, "Endpoint already registered");
            return false;
        }

        let method = config.map(|c| c.method).unwrap_or(Method::Get);
        let handler = Arc::new(MockHandler::new(name, config.cloned()));
        self.substrate
            .bind(RouteKey::for_endpoint(name, method), handler);
        self.bindings.insert(name.to_string(), method);

        tracing::info!(endpoint = %name, method = %method, "Registered endpoint: /{}", name);
        true
    }

    /// Remove the binding for `name`. No-op if absent.
    pub fn unregister(&mut self, name: &str) -> bool {
        let Some(method) = self.bindings.remove(name) else {
            return false;
        };

        self.substrate.unbind(&RouteKey::for_endpoint(name, method));
        tracing::info!(endpoint = %name, method = %method, "Unregistered endpoint: /{}", name);
        true
    }

    /// Replace the registration for `name` with one built from `config`.
    pub fn update_endpoint(&mut self, name: &str, config: Option<&EndpointConfig>) {
        self.unregister(name);
        self.register(name, config);
    }

    /// Register every endpoint in `snapshot`.
    pub fn initialize(&mut self, snapshot: &Snapshot) {
        for (name, config) in snapshot {
            self.register(name, Some(config));
        }
        tracing::info!(routes = self.bindings.len(), "Endpoint routes initialized");
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn method_of(&self, name: &str) -> Option<Method> {
        self.bindings.get(name).copied()
    }

    /// Names of all bound endpoints, sorted.
    pub fn registered_routes(&self) -> Vec<String> {
        let mut names: Vec<String> = self.bindings.keys().cloned().collect();
        names.sort();
        names
    }
}
