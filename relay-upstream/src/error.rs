//! Error types for the upstream crate.

/// Errors that can occur while calling Dify or Google Cloud Vision.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum UpstreamError {
    /// The upstream answered with something other than HTTP 200.
    #[error("upstream returned HTTP {status}")]
    Status { status: u16, body: String },

    /// The request never produced a response (connect, TLS, timeout).
    #[error("{0}")]
    Transport(String),

    /// A 200 response whose body could not be decoded.
    #[error("invalid upstream response: {0}")]
    Decode(String),

    /// OCR was requested but no Vision credentials are configured or usable.
    #[error("vision credentials unavailable: {0}")]
    Credentials(String),

    /// The OAuth token exchange for a service account failed.
    #[error("token exchange failed: {0}")]
    Token(String),

    /// Vision accepted the request but reported a per-image error.
    #[error("vision error: {0}")]
    Vision(String),

    /// A request shape could not be encoded.
    #[error(transparent)]
    Core(#[from] relay_core::CoreError),

    /// Reading a credentials file failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}
