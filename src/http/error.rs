//! Error responses for the administrative surface.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::control::ControlError;
use crate::store::StoreError;

/// Everything an admin handler can fail with. Rendered as `{"error": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Control(#[from] ControlError),

    #[error("Invalid JSON in request body")]
    InvalidJson,

    #[error("{0}")]
    BadRequest(String),
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        ApiError::Control(ControlError::Store(error))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection, "Rejected admin request body");
        ApiError::InvalidJson
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Control(ControlError::Store(e)) => match e {
                StoreError::Validation(_) | StoreError::Parse(_) => StatusCode::BAD_REQUEST,
                StoreError::Conflict(_) => StatusCode::CONFLICT,
                StoreError::NotFound(_) => StatusCode::NOT_FOUND,
                StoreError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Control(ControlError::Closed) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::InvalidJson | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Admin request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
