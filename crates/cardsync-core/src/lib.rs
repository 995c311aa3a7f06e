//! cardsync-core - Core library for cardsync
//!
//! This crate contains the card models, the document extractor, the sync state
//! store, the remote service contract, and the reconciler used by the CLI.

pub mod config;
pub mod documents;
pub mod error;
pub mod extract;
pub mod fingerprint;
pub mod models;
pub mod reconcile;
pub mod remote;
pub mod state;
pub mod sync;
pub mod util;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
pub use models::{CardKind, CardPayload, CardRecord, DocumentHandle};
