//! HTTP failure classification.
//!
//! DESIGN
//! ======
//! `classify` turns a raw failure (status + body) into one `ErrorKind` and a
//! ready-to-display message so callers never branch on status codes. Rules
//! are evaluated top to bottom and the first match wins: body-derived
//! messages take precedence over status-derived ones.
//!
//! Status 0 means no response was received at all.

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;

use serde_json::Value;

/// Markers the auth backend emits when its token-signing key is unusable.
const MISCONFIGURATION_SIGNATURES: [&str; 2] = ["IDX10720", "Unable to create KeyedHashAlgorithm"];

pub const MSG_MISCONFIGURED: &str = "Server configuration error: Authentication system is not properly configured. \
                                     Please contact the administrator.";
pub const MSG_UNREACHABLE: &str = "Unable to connect to the server. Please check if the server is running.";
pub const MSG_BAD_REQUEST: &str = "Invalid request data. Please check your input.";
pub const MSG_UNAUTHORIZED: &str = "Unauthorized. Please check your credentials.";
pub const MSG_FORBIDDEN: &str = "Access denied. You do not have permission to access this resource.";
pub const MSG_NOT_FOUND: &str = "The requested resource was not found.";
pub const MSG_CONFLICT: &str = "Email already exists. Please use a different email.";
pub const MSG_SERVER_ERROR: &str = "Server error. Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Unreachable,
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    ServerMisconfigured,
    ServerError,
    ServerMessage,
    ValidationErrors,
    Unknown,
}

impl ErrorKind {
    #[must_use]
    pub fn error_code(self) -> &'static str {
        match self {
            Self::Unreachable => "E_UNREACHABLE",
            Self::BadRequest => "E_BAD_REQUEST",
            Self::Unauthorized => "E_UNAUTHORIZED",
            Self::Forbidden => "E_FORBIDDEN",
            Self::NotFound => "E_NOT_FOUND",
            Self::Conflict => "E_CONFLICT",
            Self::ServerMisconfigured => "E_SERVER_MISCONFIGURED",
            Self::ServerError => "E_SERVER_ERROR",
            Self::ServerMessage => "E_SERVER_MESSAGE",
            Self::ValidationErrors => "E_VALIDATION",
            Self::Unknown => "E_UNKNOWN",
        }
    }
}

// =============================================================================
// RAW FAILURE
// =============================================================================

/// Response body as observed on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Absent,
    Text(String),
    Json(Value),
}

impl ResponseBody {
    /// Interpret a raw body. JSON content types that parse become `Json`;
    /// anything else non-empty stays `Text`.
    #[must_use]
    pub fn from_raw(content_type: Option<&str>, raw: String) -> Self {
        if raw.trim().is_empty() {
            return Self::Absent;
        }
        if content_type.is_some_and(is_json_content_type) {
            if let Ok(value) = serde_json::from_str(&raw) {
                return Self::Json(value);
            }
        }
        Self::Text(raw)
    }

    fn contains_signature(&self) -> bool {
        match self {
            Self::Absent => false,
            Self::Text(text) => has_misconfiguration_signature(text),
            Self::Json(value) => has_misconfiguration_signature(&value.to_string()),
        }
    }
}

fn is_json_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}

/// A failed exchange: a non-success status, or status 0 when nothing came back.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("http failure: status {status}")]
pub struct HttpFailure {
    pub status: u16,
    pub body: ResponseBody,
    /// Transport-level detail (connection refused, timeout). Log-only.
    pub detail: Option<String>,
}

impl HttpFailure {
    #[must_use]
    pub fn new(status: u16, body: ResponseBody) -> Self {
        Self { status, body, detail: None }
    }

    /// A request that never produced a response.
    #[must_use]
    pub fn unreachable(detail: impl Into<String>) -> Self {
        Self { status: 0, body: ResponseBody::Absent, detail: Some(detail.into()) }
    }

    /// 401 or 403: the API refused the credentials we sent.
    #[must_use]
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self.status, 401 | 403)
    }
}

// =============================================================================
// CLASSIFIED
// =============================================================================

/// Normalized failure carrying exactly one user-facing message.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub message: String,
    #[source]
    pub cause: HttpFailure,
}

impl ClassifiedError {
    /// A failure detected locally after an otherwise successful exchange
    /// (e.g. a 2xx body missing a required field).
    #[must_use]
    pub fn unexpected_response(status: u16, body: ResponseBody, message: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Unknown, message: message.into(), cause: HttpFailure::new(status, body) }
    }
}

impl From<HttpFailure> for ClassifiedError {
    fn from(failure: HttpFailure) -> Self {
        let (kind, message) = derive(failure.status, &failure.body);
        Self { kind, message, cause: failure }
    }
}

/// Classify a raw `(status, body)` pair. Pure; never fails.
#[must_use]
pub fn classify(status: u16, body: &ResponseBody) -> ClassifiedError {
    ClassifiedError::from(HttpFailure::new(status, body.clone()))
}

fn derive(status: u16, body: &ResponseBody) -> (ErrorKind, String) {
    // Rule 1 covers JSON-typed bodies too: auth endpoints may answer with
    // either content type for the same failure.
    if body.contains_signature() {
        return (ErrorKind::ServerMisconfigured, MSG_MISCONFIGURED.to_owned());
    }

    match body {
        ResponseBody::Text(text) => {
            match serde_json::from_str::<Value>(text) {
                Ok(value) => {
                    if let Some(message) = message_field(&value) {
                        return (ErrorKind::ServerMessage, message);
                    }
                }
                Err(_) => return (ErrorKind::ServerMessage, text.clone()),
            }
        }
        ResponseBody::Json(value) => {
            if let Some(errors) = validation_errors(value) {
                return (ErrorKind::ValidationErrors, errors);
            }
            if let Some(message) = message_field(value) {
                return (ErrorKind::ServerMessage, message);
            }
        }
        ResponseBody::Absent => {}
    }

    match status {
        0 => (ErrorKind::Unreachable, MSG_UNREACHABLE.to_owned()),
        400 => (ErrorKind::BadRequest, MSG_BAD_REQUEST.to_owned()),
        401 => (ErrorKind::Unauthorized, MSG_UNAUTHORIZED.to_owned()),
        403 => (ErrorKind::Forbidden, MSG_FORBIDDEN.to_owned()),
        404 => (ErrorKind::NotFound, MSG_NOT_FOUND.to_owned()),
        409 => (ErrorKind::Conflict, MSG_CONFLICT.to_owned()),
        500 => (ErrorKind::ServerError, MSG_SERVER_ERROR.to_owned()),
        other => (ErrorKind::Unknown, format!("Server error: {other}")),
    }
}

fn has_misconfiguration_signature(text: &str) -> bool {
    MISCONFIGURATION_SIGNATURES
        .iter()
        .any(|signature| text.contains(signature))
}

/// Non-empty string `message` field of a JSON object.
fn message_field(value: &Value) -> Option<String> {
    value
        .get("message")
        .and_then(Value::as_str)
        .filter(|message| !message.is_empty())
        .map(ToOwned::to_owned)
}

/// Non-empty `errors` array, one entry per line.
fn validation_errors(value: &Value) -> Option<String> {
    let errors = value.get("errors")?.as_array()?;
    if errors.is_empty() {
        return None;
    }
    let lines: Vec<String> = errors
        .iter()
        .map(|entry| match entry {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        })
        .collect();
    Some(lines.join("\n"))
}
