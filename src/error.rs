//! Heimdall error types

/// Heimdall error types
#[derive(Debug, thiserror::Error)]
pub enum HeimdallError {
    // Transport errors
    /// Network-level failure with no response available (connect error,
    /// timeout). Rate-limit accounting is skipped for these.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The remote API answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The concurrency gate refused admission under its `Refuse` policy.
    /// The network call was never attempted; retrying is the caller's call.
    #[error("concurrent request limit exceeded")]
    ExceededRateLimit,

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl HeimdallError {
    /// The HTTP status carried by this error, if the remote produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            HeimdallError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this is a server-produced failure (5xx).
    ///
    /// Client errors (4xx) and network-level failures are excluded — this
    /// classification drives the paginated fallback in
    /// [`CompareClient`](crate::compare::CompareClient), which only retries
    /// the failure class the server itself may resolve on a smaller request.
    pub fn is_server_failure(&self) -> bool {
        matches!(self, HeimdallError::Api { status, .. } if (500..600).contains(status))
    }
}

/// Result type alias for heimdall operations
pub type Result<T> = std::result::Result<T, HeimdallError>;
