//! Error types used throughout the client

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for ODataLink
///
/// Addressing and cardinality errors are raised by the call that detects
/// them. Transport and decode errors surface from the execute calls and
/// abort the remaining queries of the drain pass.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientError {
    /// A resource path could not be resolved, or a key had the wrong shape.
    #[error("Addressing error: {message}")]
    Addressing { message: String },

    /// `first` found no match.
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// `single` found more than one match.
    #[error("Ambiguous result: {message}")]
    AmbiguousResult { message: String },

    /// Non-2xx response or network failure. `status` is `None` when the
    /// request never produced a response.
    #[error("Transport error{}: {url}: {body}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Transport { status: Option<u16>, url: String, body: String },

    /// Malformed response payload (multipart body, JSON body).
    #[error("Decode error: {message}")]
    Decode { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Authentication error: {message}")]
    Auth { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ClientError {
    pub fn addressing(message: impl Into<String>) -> Self {
        Self::Addressing { message: message.into() }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound { message: message.into() }
    }

    pub fn ambiguous(message: impl Into<String>) -> Self {
        Self::AmbiguousResult { message: message.into() }
    }

    pub fn transport(status: Option<u16>, url: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Transport { status, url: url.into(), body: body.into() }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode { message: message.into() }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth { message: message.into() }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput { message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    /// HTTP status carried by a transport error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Whether an external retry wrapper may resend the request.
    ///
    /// The engine never retries on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { status: None, .. } => true,
            Self::Transport { status: Some(code), .. } => *code == 429 || (500..=599).contains(code),
            _ => false,
        }
    }
}

/// Result type alias for ODataLink operations
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_display_includes_status() {
        let err = ClientError::transport(Some(404), "https://host/users/1", "missing");
        assert_eq!(err.to_string(), "Transport error (404): https://host/users/1: missing");
    }

    #[test]
    fn transport_display_without_status() {
        let err = ClientError::transport(None, "https://host/", "connection refused");
        assert_eq!(err.to_string(), "Transport error: https://host/: connection refused");
    }

    #[test]
    fn retryable_classification() {
        assert!(ClientError::transport(None, "u", "b").is_retryable());
        assert!(ClientError::transport(Some(503), "u", "b").is_retryable());
        assert!(ClientError::transport(Some(429), "u", "b").is_retryable());
        assert!(!ClientError::transport(Some(400), "u", "b").is_retryable());
        assert!(!ClientError::not_found("x").is_retryable());
    }

    #[test]
    fn serializes_with_type_tag() {
        let json = serde_json::to_value(ClientError::ambiguous("two matches")).unwrap();
        assert_eq!(json["type"], "AmbiguousResult");
        assert_eq!(json["message"], "two matches");
    }
}
