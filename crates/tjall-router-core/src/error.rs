//! Error types for Tjall Router
//!
//! Two layers of errors flow through a dispatch:
//!
//! - [`ApiError`] is raised on purpose by application code and carries the
//!   HTTP status the client should see (a missing resource is
//!   [`ApiError::not_found`]).
//! - [`RouterError`] is what callbacks, middleware and the router itself
//!   return. It separates intentional responses from unexpected failures so
//!   the error boundary can decide what to render.

use http::StatusCode;
use serde::Serialize;
use std::fmt;

/// Boxed error used for unexpected failures inside callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type alias for router operations
pub type Result<T, E = RouterError> = std::result::Result<T, E>;

/// Status-carrying error raised intentionally by application code.
#[derive(Debug, Clone)]
pub struct ApiError {
    /// HTTP status code
    pub status: StatusCode,
    /// Error type identifier
    pub error_type: String,
    /// Human-readable error message
    pub message: String,
    /// Internal details, logged but never rendered
    pub(crate) internal: Option<String>,
}

impl ApiError {
    /// Create a new API error
    pub fn new(status: StatusCode, error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            error_type: error_type.into(),
            message: message.into(),
            internal: None,
        }
    }

    /// Create a 400 Bad Request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    /// Create a 404 Not Found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    /// Create a 500 Internal Server Error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }

    /// Add internal details (for logging, hidden from the response)
    pub fn with_internal(mut self, details: impl Into<String>) -> Self {
        self.internal = Some(details.into());
        self
    }

    /// Internal details attached with [`ApiError::with_internal`]
    pub fn internal_details(&self) -> Option<&str> {
        self.internal.as_deref()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error_type, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::bad_request(format!("Invalid JSON: {}", err))
    }
}

/// JSON representation of an error response
#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorBody {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}

impl From<ApiError> for ErrorResponse {
    fn from(err: ApiError) -> Self {
        Self {
            error: ErrorBody {
                error_type: err.error_type,
                message: err.message,
            },
        }
    }
}

/// Everything that can go wrong between matching a request and ending its response.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// Intentional failure carrying the status to respond with.
    #[error(transparent)]
    Response(#[from] ApiError),

    /// Unexpected failure raised by a callback or a group middleware.
    #[error("dispatch failed: {0}")]
    Dispatch(#[source] BoxError),

    /// An error-route chain was requested for a status nobody declared.
    #[error("no error route registered for status {status}")]
    Configuration { status: StatusCode },

    /// A body was sent twice on the same response.
    #[error("response body already sent")]
    AlreadySent,

    /// The response was finalized twice.
    #[error("response already ended")]
    AlreadyEnded,
}

impl RouterError {
    /// Wrap any error as an unexpected dispatch failure
    pub fn dispatch(err: impl Into<BoxError>) -> Self {
        RouterError::Dispatch(err.into())
    }

    /// Status code this error maps to when rendered
    pub fn status(&self) -> StatusCode {
        match self {
            RouterError::Response(err) => err.status,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether application code raised this error on purpose
    pub fn is_intentional(&self) -> bool {
        matches!(self, RouterError::Response(_))
    }
}
