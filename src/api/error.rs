// ABOUTME: Application-management API error types with SNAFU pattern.
// ABOUTME: Separates transport failures from platform rejections for programmatic handling.

use snafu::Snafu;

/// Errors returned by the application-management API.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ApiError {
    #[snafu(display("invalid API endpoint {url}: {reason}"))]
    InvalidEndpoint { url: String, reason: String },

    #[snafu(display("transport error: {message}"))]
    Transport { message: String },

    #[snafu(display("invalid response from {path}: {source}"))]
    Decode {
        path: String,
        source: serde_json::Error,
    },

    #[snafu(display("authentication failed: {description}"))]
    Unauthorized { description: String },

    #[snafu(display("no one-click app named {name} in the repository"))]
    UnknownApp { name: String },

    #[snafu(display("{path} rejected with status {status}: {description}"))]
    Rejected {
        path: String,
        status: i64,
        description: String,
    },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Endpoint URL cannot be used.
    InvalidEndpoint,
    /// Connection, I/O, or timeout failure.
    Transport,
    /// Response body was not the expected envelope.
    Decode,
    /// Credentials were refused.
    Unauthorized,
    /// Repository has no template under the requested name.
    UnknownApp,
    /// Platform answered with an error status.
    Rejected,
}

impl ApiError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> ApiErrorKind {
        match self {
            ApiError::InvalidEndpoint { .. } => ApiErrorKind::InvalidEndpoint,
            ApiError::Transport { .. } => ApiErrorKind::Transport,
            ApiError::Decode { .. } => ApiErrorKind::Decode,
            ApiError::Unauthorized { .. } => ApiErrorKind::Unauthorized,
            ApiError::UnknownApp { .. } => ApiErrorKind::UnknownApp,
            ApiError::Rejected { .. } => ApiErrorKind::Rejected,
        }
    }

    /// Returns the platform status code if the request was rejected.
    pub fn status(&self) -> Option<i64> {
        match self {
            ApiError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn transport(message: impl std::fmt::Display) -> Self {
        ApiError::Transport {
            message: message.to_string(),
        }
    }
}
