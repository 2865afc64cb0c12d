//! Endpoint configuration types.
//!
//! # Responsibilities
//! - Define the persisted shape of one mock endpoint ([`EndpointConfig`])
//! - Accept loosely typed inbound configuration ([`EndpointDraft`])
//! - Apply defaults and range checks when a draft becomes a config
//!
//! # Design Decisions
//! - Drafts keep every field as raw JSON so a wrong type is reported as a
//!   validation message instead of a deserialization failure
//! - An explicit `null` in a draft means "use the default", which also lets a
//!   partial update clear `expectedFields`

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

use crate::store::StoreError;

/// Full name → config map at a point in time.
pub type Snapshot = BTreeMap<String, EndpointConfig>;

/// Partial updates keyed by endpoint name, in the order the client sent them.
pub type EndpointChanges = IndexMap<String, EndpointDraft>;

/// HTTP methods a mock endpoint can answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub const ALL: [Method; 5] = [
        Method::Get,
        Method::Post,
        Method::Put,
        Method::Patch,
        Method::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    /// POST, PUT and PATCH carry a request payload checked against `expectedFields`.
    pub fn has_body(&self) -> bool {
        matches!(self, Method::Post | Method::Put | Method::Patch)
    }

    /// Map an incoming HTTP method, `None` for methods mocks never answer.
    pub fn from_http(method: &axum::http::Method) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == method.as_str())
    }

    pub fn to_http(&self) -> axum::http::Method {
        match self {
            Method::Get => axum::http::Method::GET,
            Method::Post => axum::http::Method::POST,
            Method::Put => axum::http::Method::PUT,
            Method::Patch => axum::http::Method::PATCH,
            Method::Delete => axum::http::Method::DELETE,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(invalid_method)
    }
}

fn invalid_method() -> StoreError {
    let allowed: Vec<&str> = Method::ALL.iter().map(Method::as_str).collect();
    StoreError::validation(format!("Method must be one of: {}", allowed.join(", ")))
}

/// Validated configuration of one mock endpoint, as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointConfig {
    pub method: Method,

    /// Status returned on every successful call (100-599).
    pub status_code: u16,

    /// Response delay in milliseconds.
    pub delay: u64,

    /// Response body, returned verbatim.
    pub body: Value,

    /// Fields a POST/PUT/PATCH payload must carry with a non-null value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_fields: Option<Vec<String>>,

    /// Passthrough schema kept for UI tooling; not interpreted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_schema: Option<Value>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            method: Method::Get,
            status_code: 200,
            delay: 0,
            body: json!({}),
            expected_fields: None,
            request_schema: None,
        }
    }
}

impl EndpointConfig {
    pub fn delay_duration(&self) -> Duration {
        Duration::from_millis(self.delay)
    }

    /// Whether requests must be checked against `expected_fields`.
    pub fn validates_payload(&self) -> bool {
        self.method.has_body() && self.expected_fields.is_some()
    }

    /// Express this config as a draft so a partial update can be laid over it.
    pub fn to_draft(&self) -> EndpointDraft {
        EndpointDraft {
            method: Some(Value::String(self.method.as_str().to_string())),
            status_code: Some(Value::from(self.status_code)),
            delay: Some(Value::from(self.delay)),
            body: Some(self.body.clone()),
            expected_fields: self
                .expected_fields
                .as_ref()
                .map(|fields| Value::from(fields.clone())),
            request_schema: self.request_schema.clone(),
        }
    }
}

/// Loosely typed endpoint configuration as received from clients or read from
/// a legacy file. Absent fields stay `None`; an explicit `null` is kept as
/// `Some(Value::Null)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointDraft {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub method: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub status_code: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub delay: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub expected_fields: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub request_schema: Option<Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// `None` and `Some(null)` both mean "not set".
fn given(value: Option<Value>) -> Option<Value> {
    value.filter(|v| !v.is_null())
}

impl EndpointDraft {
    /// Lay `self` over `base`: every field present in `self` wins.
    pub fn merged_over(self, base: &EndpointConfig) -> EndpointDraft {
        let base = base.to_draft();
        EndpointDraft {
            method: self.method.or(base.method),
            status_code: self.status_code.or(base.status_code),
            delay: self.delay.or(base.delay),
            body: self.body.or(base.body),
            expected_fields: self.expected_fields.or(base.expected_fields),
            request_schema: self.request_schema.or(base.request_schema),
        }
    }

    /// Apply defaults, then range and type checks.
    pub fn validate(self) -> Result<EndpointConfig, StoreError> {
        let method = match given(self.method) {
            None => Method::Get,
            Some(Value::String(s)) => s.parse()?,
            Some(_) => return Err(invalid_method()),
        };

        let status_code = match given(self.status_code) {
            None => 200,
            Some(v) => v
                .as_u64()
                .filter(|code| (100..=599).contains(code))
                .map(|code| code as u16)
                .ok_or_else(|| {
                    StoreError::validation("Status code must be a number between 100 and 599")
                })?,
        };

        let delay = match given(self.delay) {
            None => 0,
            Some(v) => v.as_u64().ok_or_else(|| {
                StoreError::validation("Delay must be a non-negative integer (milliseconds)")
            })?,
        };

        let body = given(self.body).unwrap_or_else(|| json!({}));

        let expected_fields = match given(self.expected_fields) {
            None => None,
            Some(Value::Array(items)) => Some(
                items
                    .into_iter()
                    .map(|item| match item {
                        Value::String(field) => Ok(field),
                        _ => Err(StoreError::validation(
                            "expectedFields must be a list of strings",
                        )),
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Some(_) => {
                return Err(StoreError::validation(
                    "expectedFields must be a list of strings",
                ))
            }
        };

        let request_schema = match given(self.request_schema) {
            None => None,
            Some(schema @ Value::Object(_)) => Some(schema),
            Some(_) => return Err(StoreError::validation("requestSchema must be an object")),
        };

        Ok(EndpointConfig {
            method,
            status_code,
            delay,
            body,
            expected_fields,
            request_schema,
        })
    }
}

impl From<&EndpointConfig> for EndpointDraft {
    fn from(config: &EndpointConfig) -> Self {
        config.to_draft()
    }
}

/// Endpoint names become a single path segment: non-empty, no `/`, `\` or spaces.
pub fn validate_name(name: &str) -> Result<(), StoreError> {
    if name.is_empty() {
        return Err(StoreError::validation("Endpoint name must not be empty"));
    }
    if name.contains(['/', '\\', ' ']) {
        return Err(StoreError::validation(format!(
            "Endpoint name '{}' must not contain '/', '\\' or spaces",
            name
        )));
    }
    // dot segments are collapsed by clients before the request is sent
    if name == "." || name == ".." || name.chars().any(char::is_control) {
        return Err(StoreError::validation(format!(
            "Endpoint name '{}' is not a usable path segment",
            name.escape_debug()
        )));
    }
    Ok(())
}
