//! Remote API error types.

/// Errors returned by the remote customer-management API.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// A required credential field was empty.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// A caller-supplied field collides with one the client sets itself.
    #[error("Reserved field: {0}")]
    ReservedField(String),

    /// The API answered, but with a non-ok status.
    #[error("{request} rejected with code {code}: {message}")]
    Rejected {
        /// API request name (e.g. `verifyUser`).
        request: String,
        /// Error code reported by the API.
        code: i64,
        /// Additional detail, usually the offending field.
        message: String,
    },

    /// The request never produced an API answer.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a payload we could not interpret.
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// The configured API endpoint is not a valid URL.
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

impl RemoteError {
    /// Creates a new `Rejected` error.
    #[must_use]
    pub fn rejected(request: impl Into<String>, code: i64, message: impl Into<String>) -> Self {
        Self::Rejected {
            request: request.into(),
            code,
            message: message.into(),
        }
    }

    /// Creates a new `Decode` error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// Returns `true` if the remote service explicitly refused the request.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. } | Self::MissingField(_))
    }
}
