//! Error types for the controller layer.

use thiserror::Error;
use wsctl_core::SessionName;

/// Errors from talking to the platform API.
#[derive(Error, Debug, Clone)]
pub enum ApiError {
    /// Connection, DNS, or timeout failure before a response arrived
    #[error("transport error: {0}")]
    Transport(String),

    /// Server answered with a non-2xx status
    #[error("server returned {status}: {message}")]
    Status {
        status: u16,
        /// Server message, forwarded verbatim to notifications
        message: String,
    },

    /// Response body did not match the wire contract
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Returns true for a 404 response.
    ///
    /// Session lookups translate this to "record absent" instead of an
    /// error; everything else treats it like any other status failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}

/// Errors surfaced by controller operations.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The session record is gone while the caller still expected it
    #[error("session not found: {name}")]
    SessionNotFound { name: SessionName },

    /// A user-initiated mutation failed; already reported to the
    /// notification sink with the same title
    #[error("{title}: {source}")]
    Mutation {
        title: &'static str,
        #[source]
        source: ApiError,
    },

    /// Any other API failure
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Result type for controller operations.
pub type Result<T> = std::result::Result<T, ClientError>;
