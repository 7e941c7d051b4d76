//! Access service error types

use thiserror::Error;

pub type AccessResult<T> = Result<T, AccessError>;

#[derive(Debug, Error)]
pub enum AccessError {
    /// Registry read failed (RPC error, malformed response). Never means "denied".
    #[error("Registry unavailable: {0}")]
    RegistryUnavailable(String),

    #[error("Transaction reverted: {0}")]
    Reverted(String),

    #[error("File may already be registered: {0}")]
    AlreadyRegistered(String),

    /// Pre-flight estimation failed; nothing was submitted.
    #[error("Gas estimation failed: {0}")]
    EstimationFailed(String),

    #[error("Transaction submission timed out")]
    SubmissionTimedOut,

    #[error("No signer or network connection: {0}")]
    Connection(String),

    #[error("Operation not supported: {0}")]
    NotSupported(&'static str),

    #[error("Mirror write failed: {0}")]
    MirrorWriteFailed(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("Invalid content id: {0}")]
    InvalidContentId(String),

    #[cfg(feature = "sqlite")]
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl AccessError {
    /// Whether a caller may reasonably retry the same operation later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AccessError::RegistryUnavailable(_)
                | AccessError::EstimationFailed(_)
                | AccessError::SubmissionTimedOut
                | AccessError::Connection(_)
        )
    }
}
