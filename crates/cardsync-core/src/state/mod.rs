//! Persisted sync state: which local card maps to which remote card, and the
//! fingerprint it had when it was last pushed.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::util::write_atomic;
use crate::{Error, Result};

/// Current on-disk format version.
pub const STATE_VERSION: u32 = 1;

/// Sync bookkeeping for one card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncEntry {
    pub remote_id: String,
    pub content_hash: String,
    /// Unix milliseconds
    pub last_sync_timestamp: i64,
}

/// Everything remembered between runs.
///
/// Entries are only ever added or overwritten, never removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub cards: BTreeMap<String, SyncEntry>,
    /// Deck display name to remote deck id
    #[serde(default)]
    pub decks: BTreeMap<String, String>,
}

const fn default_version() -> u32 {
    STATE_VERSION
}

impl Default for SyncState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            cards: BTreeMap::new(),
            decks: BTreeMap::new(),
        }
    }
}

impl SyncState {
    #[must_use]
    pub fn entry(&self, local_id: &str) -> Option<&SyncEntry> {
        self.cards.get(local_id)
    }

    /// Insert or overwrite the entry for `local_id`.
    pub fn record_sync(
        &mut self,
        local_id: impl Into<String>,
        remote_id: impl Into<String>,
        content_hash: impl Into<String>,
        timestamp_ms: i64,
    ) {
        self.cards.insert(
            local_id.into(),
            SyncEntry {
                remote_id: remote_id.into(),
                content_hash: content_hash.into(),
                last_sync_timestamp: timestamp_ms,
            },
        );
    }

    /// Look up a deck id by display name. Names compare after trimming.
    #[must_use]
    pub fn deck_id(&self, name: &str) -> Option<&str> {
        self.decks.get(name.trim()).map(String::as_str)
    }

    /// Replace the deck table with a fresh listing.
    pub fn replace_decks<I>(&mut self, decks: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.decks = decks
            .into_iter()
            .map(|(name, id)| (name.trim().to_string(), id))
            .collect();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// Trait for loading and saving [`SyncState`]
pub trait StateStore {
    /// Load the state, returning the default state when none was saved yet
    fn load(&self) -> Result<SyncState>;

    /// Save the state atomically
    fn persist(&self, state: &SyncState) -> Result<()>;
}

/// Pretty-printed JSON file implementation of [`StateStore`]
#[derive(Debug, Clone)]
pub struct JsonFileStateStore {
    path: PathBuf,
}

impl JsonFileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persistence_error(&self, error: impl fmt::Display) -> Error {
        Error::StatePersistence(format!("{}: {error}", self.path.display()))
    }
}

impl StateStore for JsonFileStateStore {
    fn load(&self) -> Result<SyncState> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No sync state yet, starting empty");
                return Ok(SyncState::default());
            }
            Err(error) => return Err(error.into()),
        };

        if raw.trim().is_empty() {
            return Ok(SyncState::default());
        }

        let state: SyncState = serde_json::from_str(&raw)?;
        if state.version > STATE_VERSION {
            tracing::warn!(
                version = state.version,
                supported = STATE_VERSION,
                "Sync state was written by a newer version"
            );
        }
        Ok(state)
    }

    fn persist(&self, state: &SyncState) -> Result<()> {
        let mut payload =
            serde_json::to_vec_pretty(state).map_err(|error| self.persistence_error(error))?;
        payload.push(b'\n');
        write_atomic(&self.path, &payload).map_err(|error| self.persistence_error(error))?;
        tracing::debug!(path = %self.path.display(), cards = state.len(), "Persisted sync state");
        Ok(())
    }
}
