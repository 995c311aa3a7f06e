//! Content fingerprints used for change detection between runs.

use sha2::{Digest, Sha256};

use crate::models::{CardPayload, CardRecord};

/// Hex SHA-256 over the card's semantic content.
///
/// Cloze: `content + tags.join(",")`. Question/answer:
/// `question + answer + tags.join(",")`. Deck, source and raw text are not
/// part of the fingerprint.
#[must_use]
pub fn fingerprint(card: &CardRecord) -> String {
    let mut hasher = Sha256::new();
    match &card.payload {
        CardPayload::Cloze { content } => hasher.update(content.as_bytes()),
        CardPayload::QuestionAnswer { question, answer } => {
            hasher.update(question.as_bytes());
            hasher.update(answer.as_bytes());
        }
    }
    hasher.update(card.tags.join(",").as_bytes());
    hex::encode(hasher.finalize())
}
