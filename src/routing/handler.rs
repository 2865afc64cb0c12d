//! Response-producing handler bound to one mock route.
//!
//! # Design Decisions
//! - A handler is immutable: it carries the config snapshot it was built
//!   from, and the body is serialized once so every call returns the same bytes
//! - Requests hold an `Arc` to the handler for their whole lifetime, so a
//!   delayed response finishes with the config that was live when it started

use axum::{
    body::Bytes,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::routing::payload::check_payload;
use crate::store::EndpointConfig;

#[derive(Debug)]
pub struct MockHandler {
    name: String,
    config: Option<EndpointConfig>,
    status: StatusCode,
    body: Bytes,
}

impl MockHandler {
    /// Build a handler for `name`. With no config it answers 404.
    pub fn new(name: impl Into<String>, config: Option<EndpointConfig>) -> Self {
        let (status, body) = match &config {
            Some(config) => (
                StatusCode::from_u16(config.status_code)
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                Bytes::from(serde_json::to_vec(&config.body).unwrap_or_default()),
            ),
            None => (StatusCode::NOT_FOUND, Bytes::new()),
        };

        Self {
            name: name.into(),
            config,
            status,
            body,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> Option<&EndpointConfig> {
        self.config.as_ref()
    }

    /// Whether the request body must be read before responding.
    pub fn inspects_payload(&self) -> bool {
        self.config
            .as_ref()
            .is_some_and(EndpointConfig::validates_payload)
    }

    /// Answer one request.
    ///
    /// Order: missing config → 404; payload check for body-bearing methods
    /// with expected fields → 400 listing all failures; configured delay;
    /// configured status and body.
    pub async fn respond(&self, payload: &[u8]) -> Response {
        let Some(config) = &self.config else {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "Endpoint not found" })),
            )
                .into_response();
        };

        if config.validates_payload() {
            let expected = config.expected_fields.as_deref().unwrap_or_default();
            if let Err(rejection) = check_payload(expected, payload) {
                tracing::debug!(endpoint = %self.name, ?rejection, "Rejected request payload");
                return rejection.into_response();
            }
        }

        if config.delay > 0 {
            tokio::time::sleep(config.delay_duration()).await;
        }

        (
            self.status,
            [(header::CONTENT_TYPE, "application/json")],
            self.body.clone(),
        )
            .into_response()
    }
}
