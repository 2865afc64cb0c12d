//! Request payload checks for body-bearing mock endpoints.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// One failing field in a rejected payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

/// Why a payload was refused.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadRejection {
    /// The body was not JSON at all.
    InvalidJson,
    /// Every expected field that was absent or null.
    MissingFields(Vec<FieldViolation>),
}

impl IntoResponse for PayloadRejection {
    fn into_response(self) -> Response {
        let body = match self {
            PayloadRejection::InvalidJson => json!({ "error": "Invalid JSON in request body" }),
            PayloadRejection::MissingFields(details) => json!({
                "error": "Validation failed",
                "details": details,
            }),
        };
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

/// Check a raw request body against the expected field list.
///
/// An empty body counts as `{}`. A JSON value that is not an object has none
/// of the fields.
pub fn check_payload(expected: &[String], raw: &[u8]) -> Result<(), PayloadRejection> {
    let payload: Value = if raw.iter().all(u8::is_ascii_whitespace) {
        Value::Object(Default::default())
    } else {
        serde_json::from_slice(raw).map_err(|_| PayloadRejection::InvalidJson)?
    };

    let violations = missing_fields(expected, &payload);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(PayloadRejection::MissingFields(violations))
    }
}

/// Collect a violation for every expected field that is absent or null.
pub fn missing_fields(expected: &[String], payload: &Value) -> Vec<FieldViolation> {
    expected
        .iter()
        .filter_map(|field| match payload.get(field) {
            None => Some(FieldViolation {
                field: field.clone(),
                message: format!("Field '{}' is required", field),
            }),
            Some(Value::Null) => Some(FieldViolation {
                field: field.clone(),
                message: format!("Field '{}' must not be null", field),
            }),
            Some(_) => None,
        })
        .collect()
}
