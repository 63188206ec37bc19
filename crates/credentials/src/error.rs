//! Error types produced by the credentials crate.
//!
//! Messages carried by these variants describe *what* went wrong with the
//! lookup, never the secret material itself. Parsing failures report the JSON
//! error category and position only, because the underlying serde messages can
//! quote fragments of the payload.
//!
//! | Error | Retryable | Description |
//! |-------|-----------|-------------|
//! | [`SecretUnavailable`](CredentialError::SecretUnavailable) | yes | Store unreachable, timed out, or returned no payload |
//! | [`SecretMalformed`](CredentialError::SecretMalformed) | no | Payload is not a `{username, password}` object |
use thiserror::Error;

/// Errors that can occur while resolving a credential bundle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CredentialError {
    /// The secret store could not be reached, timed out, or returned no payload.
    #[error("secret unavailable: {0}")]
    SecretUnavailable(String),

    /// The payload could not be decoded into the expected username/password shape.
    #[error("secret malformed: {0}")]
    SecretMalformed(String),
}

impl CredentialError {
    /// Whether re-running the whole ingestion may succeed without operator action.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CredentialError::SecretUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_is_retryable() {
        let err = CredentialError::SecretUnavailable("connection reset".into());
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "secret unavailable: connection reset");
    }

    #[test]
    fn malformed_is_not_retryable() {
        let err = CredentialError::SecretMalformed("missing `password` field".into());
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("missing `password` field"));
    }
}
