//! Error surface of the ingestion pipeline.
//!
//! Each stage keeps its own typed error; [`IngestError`] wraps them unchanged
//! so callers can still match on the original variant, and [`ErrorKind`]
//! flattens them into the taxonomy the invoking layer uses for retry and
//! status decisions.
//!
//! | Kind | Status | Retryable |
//! |------|--------|-----------|
//! | `InvalidInput` | 400 | no |
//! | `SecretUnavailable` | 503 | yes |
//! | `SecretMalformed` | 502 | no |
//! | `InferenceUnavailable` | 503 | yes |
//! | `InferenceResponseMalformed` | 502 | no |
//! | `DatabaseConnectionFailed` | 503 | yes |
//! | `DatabaseWriteFailed` | 500 | unless a constraint was violated |
//! | `Config` | 500 | no |

use credentials::CredentialError;
use embedding::EmbeddingError;
use serde::{Deserialize, Serialize};
use store::{StoreError, VectorError};
use thiserror::Error;

/// Flat classification of every pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidInput,
    SecretUnavailable,
    SecretMalformed,
    InferenceUnavailable,
    InferenceResponseMalformed,
    DatabaseConnectionFailed,
    DatabaseWriteFailed,
    Config,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "InvalidInput",
            ErrorKind::SecretUnavailable => "SecretUnavailable",
            ErrorKind::SecretMalformed => "SecretMalformed",
            ErrorKind::InferenceUnavailable => "InferenceUnavailable",
            ErrorKind::InferenceResponseMalformed => "InferenceResponseMalformed",
            ErrorKind::DatabaseConnectionFailed => "DatabaseConnectionFailed",
            ErrorKind::DatabaseWriteFailed => "DatabaseWriteFailed",
            ErrorKind::Config => "Config",
        }
    }

    /// HTTP-style status code reported by [`IngestResponse`](crate::IngestResponse).
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::InvalidInput => 400,
            ErrorKind::SecretMalformed | ErrorKind::InferenceResponseMalformed => 502,
            ErrorKind::SecretUnavailable
            | ErrorKind::InferenceUnavailable
            | ErrorKind::DatabaseConnectionFailed => 503,
            ErrorKind::DatabaseWriteFailed | ErrorKind::Config => 500,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while ingesting a document.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IngestError {
    #[error("credential resolution failed: {0}")]
    Credentials(#[from] CredentialError),

    #[error("embedding generation failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("vector encoding failed: {0}")]
    Vector(#[from] VectorError),

    #[error("document store failed: {0}")]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl IngestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IngestError::Credentials(CredentialError::SecretMalformed(_)) => {
                ErrorKind::SecretMalformed
            }
            IngestError::Credentials(_) => ErrorKind::SecretUnavailable,
            IngestError::Embedding(err) => match err {
                EmbeddingError::InvalidInput(_) => ErrorKind::InvalidInput,
                EmbeddingError::InferenceUnavailable(_) => ErrorKind::InferenceUnavailable,
                EmbeddingError::InvalidConfig(_) => ErrorKind::Config,
                _ => ErrorKind::InferenceResponseMalformed,
            },
            IngestError::Vector(_) => ErrorKind::InvalidInput,
            IngestError::Store(err) => match err {
                StoreError::ConnectionFailed(_) => ErrorKind::DatabaseConnectionFailed,
                StoreError::InvalidConfig(_) => ErrorKind::Config,
                _ => ErrorKind::DatabaseWriteFailed,
            },
            IngestError::Config(_) => ErrorKind::Config,
        }
    }

    /// Whether re-running the whole ingestion might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            IngestError::Credentials(err) => err.is_retryable(),
            IngestError::Embedding(err) => err.is_retryable(),
            IngestError::Store(err) => err.is_retryable(),
            IngestError::Vector(_) | IngestError::Config(_) => false,
        }
    }
}
