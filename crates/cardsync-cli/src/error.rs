use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] cardsync_core::Error),
    #[error(transparent)]
    Remote(#[from] cardsync_core::remote::RemoteError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(
        "No API key configured. Run `cardsync config init --api-key <KEY>` or set CARDSYNC_API_KEY."
    )]
    MissingApiKey,
    #[error(
        "No documents directory configured. Pass --documents <DIR> or set CARDSYNC_DOCUMENTS."
    )]
    MissingDocumentsRoot,
    #[error("Another sync is already running (lock held on {})", .0.display())]
    RunInProgress(PathBuf),
    #[error("{0} card(s) failed to sync")]
    CardsFailed(usize),
}

impl CliError {
    /// Whether the error was already shown to the user as part of the command output.
    pub const fn already_reported(&self) -> bool {
        matches!(self, Self::CardsFailed(_))
    }
}
