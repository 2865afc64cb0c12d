//! Wiring of store, router and orchestrator into one shared handle.

use std::sync::Arc;

use crate::control::{Orchestrator, OrchestratorTask};
use crate::routing::{EndpointRouter, RouteTable};
use crate::store::ConfigStore;

/// Shared entry point for the HTTP layer.
///
/// Mutations go through the orchestrator; mock traffic reads the route table
/// directly without touching the orchestrator queue.
#[derive(Clone)]
pub struct Registry {
    orchestrator: Orchestrator,
    routes: Arc<RouteTable>,
}

impl Registry {
    /// Build the route table from `store` and hand ownership of both to a new
    /// orchestrator. The returned task must be spawned.
    pub fn new(store: ConfigStore) -> (Self, OrchestratorTask) {
        let routes = Arc::new(RouteTable::new());
        let mut router = EndpointRouter::new(routes.clone());
        router.initialize(&store.get_all());

        let (orchestrator, task) = Orchestrator::new(store, router);
        (
            Self {
                orchestrator,
                routes,
            },
            task,
        )
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn routes(&self) -> &Arc<RouteTable> {
        &self.routes
    }
}
