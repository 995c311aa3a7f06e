//! Data models for cardsync

mod card;
mod document;

pub use card::{CardKind, CardPayload, CardRecord, QA_SEPARATOR};
pub use document::DocumentHandle;
