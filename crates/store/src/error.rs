use thiserror::Error;

/// Errors raised by document stores.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreError {
    /// Store configuration is unusable (bad table name, unreadable CA bundle, ...).
    #[error("invalid store config: {0}")]
    InvalidConfig(String),
    /// Could not open (or lost) the database connection.
    #[error("database connection failed: {0}")]
    ConnectionFailed(String),
    /// The insert statement failed for a reason other than a constraint.
    #[error("database write failed: {0}")]
    WriteFailed(String),
    /// The insert violated a constraint (SQLSTATE class 23); retrying will not help.
    #[error("database constraint violation: {0}")]
    ConstraintViolation(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::ConnectionFailed(_) | StoreError::WriteFailed(_)
        )
    }

    pub(crate) fn poisoned() -> Self {
        StoreError::WriteFailed("poisoned lock".into())
    }
}
