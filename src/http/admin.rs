//! Administrative REST surface under `/api`.
//!
//! Mutations are sent through the orchestrator, so connected control sessions
//! see admin changes the same way they see their own.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::control::{MutationRequest, Orchestrator};
use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::http::websocket;
use crate::store::{EndpointDraft, StoreError};

/// Body of `POST /api/endpoints`.
#[derive(Debug, Deserialize)]
pub struct CreateEndpoint {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub config: Option<Value>,
}

/// Body of `GET /api/config`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub base_url: String,
    pub local_ip: String,
    pub port: u16,
}

/// Body of `GET /api/status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusReport {
    pub version: String,
    pub status: String,
    pub endpoints: usize,
    pub sessions: usize,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/endpoints", get(list_endpoints).post(create_endpoint))
        .route("/endpoints/{name}", delete(delete_endpoint))
        .route("/routes", get(list_routes))
        .route("/config", get(server_info))
        .route("/status", get(status))
        .route("/ws", get(websocket::upgrade))
}

fn orchestrator(state: &AppState) -> &Orchestrator {
    state.registry.orchestrator()
}

async fn list_endpoints(State(state): State<AppState>) -> impl IntoResponse {
    Json(orchestrator(&state).snapshot())
}

async fn create_endpoint(
    State(state): State<AppState>,
    body: Result<Json<CreateEndpoint>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;

    let (endpoint, config) = match (body.endpoint, body.config) {
        (Some(endpoint), Some(config)) if !endpoint.is_empty() && !config.is_null() => {
            (endpoint, config)
        }
        _ => return Err(ApiError::BadRequest("Missing endpoint or config".into())),
    };
    let config: EndpointDraft = serde_json::from_value(config).map_err(StoreError::Parse)?;

    orchestrator(&state)
        .mutate(MutationRequest::Add {
            endpoint: endpoint.clone(),
            config,
        })
        .await?;

    tracing::info!(endpoint = %endpoint, "Endpoint created via admin API");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Endpoint created", "endpoint": endpoint })),
    ))
}

async fn delete_endpoint(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    orchestrator(&state)
        .mutate(MutationRequest::Remove {
            endpoint: name.clone(),
        })
        .await?;

    tracing::info!(endpoint = %name, "Endpoint deleted via admin API");
    Ok(Json(json!({ "message": "Endpoint deleted", "endpoint": name })))
}

async fn list_routes(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(orchestrator(&state).registered_routes().await?))
}

async fn server_info(State(state): State<AppState>) -> Json<ServerInfo> {
    Json(ServerInfo {
        base_url: state.display.base_url(),
        local_ip: state.display.host.clone(),
        port: state.display.port,
    })
}

async fn status(State(state): State<AppState>) -> Result<Json<StatusReport>, ApiError> {
    let orchestrator = orchestrator(&state);
    Ok(Json(StatusReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "ok".to_string(),
        endpoints: orchestrator.snapshot().len(),
        sessions: orchestrator.session_count().await?,
    }))
}
