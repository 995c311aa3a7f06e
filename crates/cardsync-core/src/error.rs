//! Error types for cardsync-core

use thiserror::Error;

use crate::remote::RemoteError;

/// Result type alias using cardsync-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in cardsync-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid or incomplete configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Document store error
    #[error("Document error: {0}")]
    Document(String),

    /// Sync state could not be written; fatal for the run
    #[error("Failed to persist sync state: {0}")]
    StatePersistence(String),

    /// Remote card service error outside the per-card reconcile loop
    #[error(transparent)]
    Remote(#[from] RemoteError),
}
