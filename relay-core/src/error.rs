/// Errors produced by the `relay-core` crate.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CoreError {
    /// A path identifier could not be used as a single URL segment.
    #[error("invalid {kind} id: {reason}")]
    InvalidId { kind: &'static str, reason: String },

    /// A file-upload settings document could not be encoded.
    #[error("failed to encode upload settings: {0}")]
    Encode(#[from] serde_json::Error),
}
