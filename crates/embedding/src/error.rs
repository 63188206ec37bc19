use thiserror::Error;

/// Errors surfaced while turning text into an embedding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EmbeddingError {
    /// The text was rejected before any network call (empty or whitespace-only).
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Endpoint unreachable, non-success status, or the call timed out.
    #[error("inference unavailable: {0}")]
    InferenceUnavailable(String),
    /// The response body could not be decoded or had no usable `embedding` field.
    #[error("inference response malformed: {0}")]
    InferenceResponseMalformed(String),
    /// The model returned a vector whose length disagrees with the configured dimension.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    /// Model or client configuration is unusable.
    #[error("invalid embedding config: {0}")]
    InvalidConfig(String),
}

impl EmbeddingError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, EmbeddingError::InferenceUnavailable(_))
    }
}
