//! Card model

use serde::{Deserialize, Serialize};

use super::DocumentHandle;

/// Separator line placed between question and answer when a card is sent
/// to the remote service.
pub const QA_SEPARATOR: &str = "---";

/// The two card shapes the extractor recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardKind {
    QuestionAnswer,
    Cloze,
}

impl CardKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::QuestionAnswer => "qa",
            Self::Cloze => "cloze",
        }
    }
}

/// Semantic content of a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CardPayload {
    /// Two-sided card split by a separator line
    QuestionAnswer { question: String, answer: String },
    /// Running text with `{{1::hidden}}` tokens, already canonicalized
    Cloze { content: String },
}

impl CardPayload {
    #[must_use]
    pub const fn kind(&self) -> CardKind {
        match self {
            Self::QuestionAnswer { .. } => CardKind::QuestionAnswer,
            Self::Cloze { .. } => CardKind::Cloze,
        }
    }

    /// Whether every field required by this kind carries non-blank text.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        match self {
            Self::QuestionAnswer { question, answer } => {
                !question.trim().is_empty() && !answer.trim().is_empty()
            }
            Self::Cloze { content } => !content.trim().is_empty(),
        }
    }

    /// Render the body sent to the remote service.
    #[must_use]
    pub fn remote_content(&self) -> String {
        match self {
            Self::QuestionAnswer { question, answer } => {
                format!("{question}\n{QA_SEPARATOR}\n{answer}")
            }
            Self::Cloze { content } => content.clone(),
        }
    }
}

/// One flashcard extracted from a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRecord {
    /// Identifier written into the source block; stable across runs
    pub local_id: String,
    pub payload: CardPayload,
    /// Tags in the order they were written
    pub tags: Vec<String>,
    /// Deck display-name override
    pub deck: Option<String>,
    /// Document the block was found in
    pub source: DocumentHandle,
    /// Block body exactly as parsed (never persisted)
    #[serde(skip)]
    pub raw_text: String,
}

impl CardRecord {
    #[must_use]
    pub const fn kind(&self) -> CardKind {
        self.payload.kind()
    }

    /// Records handed to the reconciler must satisfy this.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.local_id.trim().is_empty() && self.payload.is_complete()
    }

    /// First line of the card's front side, truncated to `max_len` characters.
    #[must_use]
    pub fn title_preview(&self, max_len: usize) -> String {
        let front = match &self.payload {
            CardPayload::QuestionAnswer { question, .. } => question,
            CardPayload::Cloze { content } => content,
        };
        front
            .lines()
            .next()
            .unwrap_or("")
            .chars()
            .take(max_len)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qa(question: &str, answer: &str) -> CardRecord {
        CardRecord {
            local_id: "abc123def456".to_string(),
            payload: CardPayload::QuestionAnswer {
                question: question.to_string(),
                answer: answer.to_string(),
            },
            tags: Vec::new(),
            deck: None,
            source: DocumentHandle::new("notes/geo.md"),
            raw_text: String::new(),
        }
    }

    #[test]
    fn qa_remote_content_uses_separator_line() {
        let card = qa("Q: capital of X", "A: Y");
        assert_eq!(card.payload.remote_content(), "Q: capital of X\n---\nA: Y");
    }

    #[test]
    fn cloze_remote_content_is_verbatim() {
        let payload = CardPayload::Cloze {
            content: "The {{1::sun}} is a star".to_string(),
        };
        assert_eq!(payload.remote_content(), "The {{1::sun}} is a star");
        assert_eq!(payload.kind(), CardKind::Cloze);
    }

    #[test]
    fn blank_side_makes_record_invalid() {
        assert!(qa("Q", "A").is_valid());
        assert!(!qa("Q", "  ").is_valid());

        let mut missing_id = qa("Q", "A");
        missing_id.local_id = " ".to_string();
        assert!(!missing_id.is_valid());
    }

    #[test]
    fn title_preview_takes_first_line() {
        let card = qa("First line\nSecond line", "A");
        assert_eq!(card.title_preview(50), "First line");
        assert_eq!(card.title_preview(5), "First");
    }
}
