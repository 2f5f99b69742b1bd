//! Errors surfaced by the hosted platform adapter.

/// Errors from platform calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    /// The HTTP request could not be sent or the connection dropped.
    #[error("platform request failed: {0}")]
    Request(String),

    /// The platform answered with a non-success status.
    #[error("platform responded {status}: {message}")]
    Response { status: u16, message: String },

    /// The response body did not have the expected shape.
    #[error("platform response parse failed: {0}")]
    Parse(String),

    /// The operation needs a signed-in session and there is none.
    #[error("not signed in")]
    NotSignedIn,

    /// Email/password rejected, or a bearer token the platform does not accept.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// A uniqueness constraint was hit (duplicate account or profile).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl PlatformError {
    /// Whether retrying the same call might succeed.
    #[must_use]
    pub fn retryable(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Response { status: 429 | 500..=599, .. })
    }
}

impl From<reqwest::Error> for PlatformError {
    fn from(e: reqwest::Error) -> Self {
        Self::Request(e.to_string())
    }
}
