//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use mock_api::config::ServerConfig;
use mock_api::http::HttpServer;
use mock_api::lifecycle::Shutdown;
use mock_api::net::DisplayAddress;
use mock_api::store::{default_endpoints, ConfigStore};
use serde_json::Value;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

pub type ControlSocket = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// A server running on an ephemeral port with its store in a temp directory.
pub struct TestServer {
    pub addr: SocketAddr,
    pub store_path: PathBuf,
    pub shutdown: Shutdown,
    _dir: Option<TempDir>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/api/ws", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start a server with the default endpoints and a fresh store file.
pub async fn start_server() -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("endpoints.json");
    let mut server = start_server_at(&path).await;
    server._dir = Some(dir);
    server
}

/// Start a server whose store lives at `store_path`.
pub async fn start_server_at(store_path: &Path) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let display = DisplayAddress::new("127.0.0.1", addr.port());
    let store = ConfigStore::open(store_path, default_endpoints(&display.base_url()));
    let server = HttpServer::new(&ServerConfig::default(), store, display);

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestServer {
        addr,
        store_path: store_path.to_path_buf(),
        shutdown,
        _dir: None,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Open a control session and consume its initial snapshot.
pub async fn connect_control(server: &TestServer) -> (ControlSocket, Value) {
    let (mut socket, _) = connect_async(server.ws_url()).await.unwrap();
    let first = next_event(&mut socket).await;
    assert_eq!(first["event"], "configUpdate");
    (socket, first["data"].clone())
}

/// Next JSON text frame, failing the test after two seconds.
pub async fn next_event(socket: &mut ControlSocket) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(2), socket.next())
            .await
            .expect("timed out waiting for control event")
            .expect("control socket closed")
            .expect("control socket error");
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).unwrap();
        }
    }
}
