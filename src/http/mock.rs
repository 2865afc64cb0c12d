//! Mock traffic dispatch.
//!
//! # Responsibilities
//! - Resolve (method, percent-decoded path) against the live route table
//! - Read the body only for handlers that inspect it
//! - Serve the static UI for paths no mock route claims
//! - Record per-request metrics
//!
//! # Data Flow
//! ```text
//! Request (fallback of the axum Router)
//!     → urlencoding::decode(path)
//!     → RouteTable::lookup (Arc<MockHandler> captured here)
//!     → MockHandler::respond (payload check, delay, canned response)
//!
//! No route:
//!     → GET/HEAD with public_dir → ServeDir
//!     → otherwise 404 {"error": "Not found", "path": ...}
//! ```

use std::convert::Infallible;
use std::time::Instant;

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tower::ServiceExt;

use crate::http::server::AppState;
use crate::observability::metrics;
use crate::store::Method;

const UNMATCHED: &str = "unmatched";

/// Fallback handler for every path the admin surface does not claim.
pub async fn dispatch(State(state): State<AppState>, request: Request) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    // route keys hold the decoded endpoint name
    let handler = match (Method::from_http(&method), urlencoding::decode(&path)) {
        (Some(m), Ok(decoded)) => state.registry.routes().lookup(m, &decoded),
        _ => None,
    };

    let Some(handler) = handler else {
        let response = not_found(&state, request, &path).await;
        metrics::record_mock_request(UNMATCHED, method.as_str(), response.status().as_u16(), start);
        return response;
    };

    let payload = if handler.inspects_payload() {
        match axum::body::to_bytes(request.into_body(), state.max_body_size).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!(endpoint = %handler.name(), error = %e, "Failed to read request body");
                return (
                    StatusCode::PAYLOAD_TOO_LARGE,
                    Json(json!({ "error": "Request body too large" })),
                )
                    .into_response();
            }
        }
    } else {
        Bytes::new()
    };

    let response = handler.respond(&payload).await;

    tracing::debug!(
        endpoint = %handler.name(),
        method = %method,
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Served mock response"
    );
    metrics::record_mock_request(
        handler.name(),
        method.as_str(),
        response.status().as_u16(),
        start,
    );
    response
}

async fn not_found(state: &AppState, request: Request<Body>, path: &str) -> Response {
    let servable = request.method() == axum::http::Method::GET
        || request.method() == axum::http::Method::HEAD;

    if let (true, Some(static_files)) = (servable, &state.static_files) {
        let result: Result<_, Infallible> = static_files.clone().oneshot(request).await;
        let response = match result {
            Ok(response) => response.into_response(),
            Err(never) => match never {},
        };
        if response.status() != StatusCode::NOT_FOUND {
            return response;
        }
    }

    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Not found", "path": path })),
    )
        .into_response()
}
