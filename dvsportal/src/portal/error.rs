//! Portal client error types.

use serde_json::Value;

use crate::domain::DomainError;

/// Errors from the DVSPortal client.
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    /// Transport failure or timeout. The underlying cause is always kept.
    #[error("{message}")]
    Connection {
        message: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// Credentials rejected by the portal
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Non-JSON response, HTTP error status, or an `ErrorMessage` in the body
    #[error("{}", format_api_error(*status, body))]
    Api { status: Option<u16>, body: Value },

    /// Upstream payload did not match the expected schema
    #[error("failed to decode {endpoint} response: {message}")]
    Decode { endpoint: String, message: String },

    /// Request payload could not be serialized
    #[error("failed to encode {endpoint} request: {message}")]
    Encode { endpoint: String, message: String },

    /// Command target could not be resolved
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Request issued after `close()`
    #[error("client session has been closed")]
    SessionClosed,

    /// Value cannot be sent as an HTTP header
    #[error("invalid header value: {0}")]
    InvalidHeader(String),
}

impl PortalError {
    /// Build an API error that did not come with an HTTP status.
    pub(crate) fn api_message(message: impl Into<String>) -> Self {
        PortalError::Api {
            status: None,
            body: Value::String(message.into()),
        }
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, PortalError::Connection { .. })
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, PortalError::Auth(_))
    }

    pub fn is_api(&self) -> bool {
        matches!(self, PortalError::Api { .. })
    }

    /// HTTP status attached to an API error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            PortalError::Api { status, .. } => *status,
            _ => None,
        }
    }
}

fn format_api_error(status: Option<u16>, body: &Value) -> String {
    let detail = match body {
        Value::String(s) => s.clone(),
        Value::Object(map) => map
            .get("ErrorMessage")
            .or_else(|| map.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| body.to_string()),
        other => other.to_string(),
    };
    match status {
        Some(status) => format!("API error {status}: {detail}"),
        None => format!("API error: {detail}"),
    }
}
