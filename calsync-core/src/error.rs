//! Error types for the calsync ecosystem.

use thiserror::Error;

use crate::remote::RemoteError;

/// Errors that can occur in calsync operations.
#[derive(Error, Debug)]
pub enum CalSyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Schedule error: {0}")]
    Schedule(String),

    #[error("State store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("Failed {label} after {attempts} attempts (quota exceeded)")]
    SyncExhausted { label: String, attempts: u32 },

    #[error("Cancelled")]
    Cancelled,

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Provider '{0}' not found in PATH")]
    ProviderNotInstalled(String),

    #[error("Provider request timed out after {0}s")]
    ProviderTimeout(u64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for calsync operations.
pub type CalSyncResult<T> = Result<T, CalSyncError>;
