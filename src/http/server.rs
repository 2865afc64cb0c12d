//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the admin surface and the mock fallback
//! - Wire up middleware (body limit, request ID, tracing, CORS; timeout on `/api`)
//! - Spawn the orchestrator task next to the server
//! - Bind server to listener with graceful shutdown

use std::io;
use std::path::Path;
use std::time::Duration;

use axum::{
    http::{HeaderValue, Method},
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{CorsConfig, ServerConfig};
use crate::control::OrchestratorTask;
use crate::http::{admin, mock};
use crate::lifecycle::Shutdown;
use crate::net::DisplayAddress;
use crate::registry::Registry;
use crate::store::ConfigStore;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Registry,
    pub display: DisplayAddress,
    pub max_body_size: usize,
    pub static_files: Option<ServeDir>,
}

/// HTTP server for the mock registry.
pub struct HttpServer {
    router: Router,
    registry: Registry,
    orchestrator: OrchestratorTask,
}

impl HttpServer {
    /// Create a server around `store`. Routes are bound before this returns.
    pub fn new(config: &ServerConfig, store: ConfigStore, display: DisplayAddress) -> Self {
        let (registry, orchestrator) = Registry::new(store);

        let static_files = config.ui.public_dir.as_deref().map(static_service);

        let state = AppState {
            registry: registry.clone(),
            display,
            max_body_size: config.limits.max_body_size,
            static_files,
        };

        let router = Self::build_router(config, state);
        Self {
            router,
            registry,
            orchestrator,
        }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// The request timeout covers the admin surface only. Mock routes answer
    /// after their configured delay, however long that is.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, state: AppState) -> Router {
        let cors = cors_layer(&config.cors, &state.display);
        let admin = admin::routes().layer(TimeoutLayer::new(Duration::from_secs(
            config.timeouts.request_secs,
        )));

        Router::new()
            .nest("/api", admin)
            .fallback(mock::dispatch)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(RequestBodyLimitLayer::new(config.limits.max_body_size))
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(cors),
            )
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Run the server until `shutdown` is triggered.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let orchestrator = tokio::spawn(self.orchestrator.run(shutdown.subscribe()));

        let mut stop = shutdown.subscribe();
        let served = axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = stop.recv().await;
            })
            .await;

        // stop the orchestrator as well if the server failed on its own
        shutdown.trigger();
        if let Err(e) = orchestrator.await {
            tracing::error!(error = %e, "Orchestrator task failed");
        }

        served?;
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn static_service(dir: &Path) -> ServeDir {
    tracing::info!(dir = %dir.display(), "Serving static files");
    ServeDir::new(dir)
}

fn cors_layer(config: &CorsConfig, display: &DisplayAddress) -> CorsLayer {
    let origin = if config.allow_any_origin {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = display
            .origins()
            .iter()
            .filter_map(|o| HeaderValue::from_str(o).ok())
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers(Any)
}
