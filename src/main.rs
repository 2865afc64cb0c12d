//! Mock API server
//!
//! Serves canned JSON responses for a set of named endpoints that can be
//! added, changed, renamed and removed while the server runs.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────────┐
//!                       │                    MOCK API                       │
//!                       │                                                   │
//!   Mock request        │  ┌─────────┐   ┌─────────────┐   ┌────────────┐  │
//!   ────────────────────┼─▶│  http   │──▶│ RouteTable  │──▶│MockHandler │  │
//!                       │  │fallback │   │  (dashmap)  │   │delay, body │  │
//!                       │  └─────────┘   └──────▲──────┘   └────────────┘  │
//!                       │                       │ bind/unbind               │
//!   Admin REST / WS     │  ┌─────────┐   ┌──────┴──────┐   ┌────────────┐  │
//!   ────────────────────┼─▶│  /api   │──▶│Orchestrator │──▶│ConfigStore │──┼──▶ endpoints.json
//!   ◀───────────────────┼──│         │◀──│   (actor)   │   └────────────┘  │
//!   configUpdate, acks  │  └─────────┘   └─────────────┘                    │
//!                       └──────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use mock_api::config::{load_config, ServerConfig};
use mock_api::lifecycle::{signals, Shutdown};
use mock_api::net::DisplayAddress;
use mock_api::observability::{logging, metrics};
use mock_api::store::{default_endpoints, ConfigStore};
use mock_api::HttpServer;

#[derive(Parser, Debug)]
#[command(name = "mock-api", version, about = "Dynamic mock endpoint server")]
struct Cli {
    /// TOML settings file
    #[arg(short, long, env = "MOCK_API_CONFIG")]
    config: Option<PathBuf>,

    /// Listening port
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Host advertised in URLs (falls back to SERVER_IP)
    #[arg(long, env = "PUBLIC_IP")]
    public_address: Option<String>,

    /// Endpoint store file
    #[arg(long, env = "MOCK_API_STORE")]
    store: Option<PathBuf>,

    /// Directory with the browser UI
    #[arg(long, env = "PUBLIC_DIR")]
    public_dir: Option<PathBuf>,
}

impl Cli {
    fn apply(self, config: &mut ServerConfig) {
        if let Some(port) = self.port {
            config.listener.set_port(port);
        }
        if let Some(address) = self
            .public_address
            .or_else(|| std::env::var("SERVER_IP").ok())
        {
            config.listener.public_address = Some(address);
        }
        if let Some(store) = self.store {
            config.store.path = store;
        }
        if let Some(dir) = self.public_dir {
            config.ui.public_dir = Some(dir);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let from_file = cli.config.is_some();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    cli.apply(&mut config);

    logging::init(from_file.then_some(config.observability.log_level.as_str()));
    tracing::info!("mock-api v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        store = %config.store.path.display(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    // Bind TCP listener
    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let local_addr = listener.local_addr()?;

    let display = DisplayAddress::resolve(config.listener.public_address.as_deref(), local_addr.port());
    let store = ConfigStore::open(config.store.path.clone(), default_endpoints(&display.base_url()));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    tokio::spawn(signals::forward_to(shutdown.clone()));

    let base_url = display.base_url();
    let server = HttpServer::new(&config, store, display);
    tracing::info!(address = %local_addr, "Mock API server running on {}", base_url);
    tracing::info!("Web interface available at {}", base_url);

    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
