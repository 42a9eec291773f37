//! Gateway error types and their HTTP mapping.

use std::fmt;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use custgate_remote::RemoteError;
use serde_json::json;

/// Why a request failed session revalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRejection {
    /// No session cookie, or one that failed signature checks.
    NoSession,
    /// The cookie names a session this process never registered.
    UnknownSession,
    /// The remote service no longer honours the session.
    Invalidated,
    /// Resolving and probing the session took too long.
    TimedOut,
}

impl SessionRejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoSession => "no_session",
            Self::UnknownSession => "unknown_session",
            Self::Invalidated => "invalidated",
            Self::TimedOut => "timed_out",
        }
    }
}

impl fmt::Display for SessionRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSession => write!(f, "no session, authenticate at /auth"),
            Self::UnknownSession => write!(f, "unknown session, authenticate at /auth"),
            Self::Invalidated => {
                write!(f, "session rejected by remote service, authenticate at /auth")
            }
            Self::TimedOut => write!(f, "session validation timed out, authenticate at /auth"),
        }
    }
}

/// Errors surfaced to gateway callers.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// A credential field was missing or empty (400).
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The remote service refused the credentials (401).
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// A filter or field name is reserved for the remote protocol (400).
    #[error("Invalid filter: {0} is reserved")]
    InvalidFilter(String),

    /// No live session backs this request (401).
    #[error("Unauthorized: {0}")]
    Unauthorized(SessionRejection),

    /// The remote service failed a query or write (502).
    #[error("Upstream error: {0}")]
    Upstream(#[source] RemoteError),
}

impl GatewayError {
    /// Classify a failed remote query or write.
    pub fn from_remote(err: RemoteError) -> Self {
        match err {
            RemoteError::ReservedField(name) => Self::InvalidFilter(name),
            other => Self::Upstream(other),
        }
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::InvalidCredentials => (StatusCode::BAD_REQUEST, "invalid_credentials"),
            Self::AuthenticationFailed => (StatusCode::UNAUTHORIZED, "authentication_failed"),
            Self::InvalidFilter(_) => (StatusCode::BAD_REQUEST, "invalid_filter"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            Self::Upstream(_) => (StatusCode::BAD_GATEWAY, "upstream_error"),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let body = json!({
            "error": code,
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            GatewayError::InvalidCredentials.status_and_code().0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GatewayError::AuthenticationFailed.status_and_code().0,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            GatewayError::Unauthorized(SessionRejection::Invalidated)
                .status_and_code()
                .0,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            GatewayError::Upstream(RemoteError::decode("boom"))
                .status_and_code()
                .0,
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_invalid_filter_is_bad_request() {
        let err = GatewayError::from_remote(RemoteError::ReservedField("request".into()));
        assert_eq!(err.status_and_code(), (StatusCode::BAD_REQUEST, "invalid_filter"));
        assert_eq!(err.to_string(), "Invalid filter: request is reserved");
    }

    #[test]
    fn test_upstream_message_passes_through() {
        let err = GatewayError::Upstream(RemoteError::rejected("getCustomers", 1002, "sessionKey"));
        assert_eq!(
            err.to_string(),
            "Upstream error: getCustomers rejected with code 1002: sessionKey"
        );
    }

    #[test]
    fn test_invalidated_hint_mentions_auth() {
        let err = GatewayError::Unauthorized(SessionRejection::Invalidated);
        assert!(err.to_string().contains("/auth"));
    }
}
