//! Remote card service contract.
//!
//! The reconciler only talks to a [`RemoteService`]. [`HttpCardService`] is the
//! production transport, [`RetryingService`] layers the rate-limit retry policy
//! over any service, and [`mock::MockCardService`] backs tests.

mod http;
pub mod mock;
mod retry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use http::{HttpCardService, DEFAULT_API_BASE_URL};
pub use retry::{RetryOutcome, RetryPolicy, RetryingService};

/// Remote identifier recorded when a create succeeded but the response body
/// carried no recognizable identifier.
pub const UNKNOWN_REMOTE_ID: &str = "unknown";

/// JSON pointers tried in order when reading a card identifier from a response.
const REMOTE_ID_CANDIDATES: &[&str] = &["/id", "/_id", "/cardId", "/card/id"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("Deck not found: {0}")]
    DeckNotFound(String),
    #[error("Rate limited by remote service")]
    RateLimited,
    #[error("Remote service error: {0}")]
    Service(String),
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Reference to a card stored by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCardRef {
    pub id: String,
}

impl RemoteCardRef {
    /// Build a reference from a response body, falling back to
    /// [`UNKNOWN_REMOTE_ID`] for unrecognized shapes.
    #[must_use]
    pub fn from_response(body: &Value) -> Self {
        Self {
            id: extract_remote_id(body).unwrap_or_else(|| UNKNOWN_REMOTE_ID.to_string()),
        }
    }

    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.id == UNKNOWN_REMOTE_ID
    }
}

/// Read a card identifier from the first matching candidate field.
///
/// String and integer values are accepted; blank strings are skipped.
#[must_use]
pub fn extract_remote_id(body: &Value) -> Option<String> {
    REMOTE_ID_CANDIDATES
        .iter()
        .filter_map(|pointer| body.pointer(pointer))
        .find_map(|value| match value {
            Value::String(id) if !id.trim().is_empty() => Some(id.trim().to_string()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        })
}

/// A deck known to the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteDeck {
    pub id: String,
    pub name: String,
}

/// Operations the reconciler needs from a remote card service.
///
/// Implementations report HTTP 429 (or equivalent) as
/// [`RemoteError::RateLimited`] and leave retrying to [`RetryingService`].
#[async_trait]
pub trait RemoteService: Send + Sync {
    /// Create a card in `deck_id`.
    ///
    /// Fails with [`RemoteError::DeckNotFound`] when `deck_id` is empty or
    /// unknown to the service.
    async fn create_card(
        &self,
        content: &str,
        deck_id: &str,
        tags: &[String],
    ) -> RemoteResult<RemoteCardRef>;

    /// Replace the content and tags of an existing card.
    ///
    /// `remote_id` may be [`UNKNOWN_REMOTE_ID`]; such calls are expected to fail.
    async fn update_card(
        &self,
        remote_id: &str,
        content: &str,
        tags: &[String],
    ) -> RemoteResult<RemoteCardRef>;

    /// List all decks.
    async fn list_decks(&self) -> RemoteResult<Vec<RemoteDeck>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_each_supported_shape() {
        assert_eq!(extract_remote_id(&json!({"id": "a"})).as_deref(), Some("a"));
        assert_eq!(extract_remote_id(&json!({"_id": "b"})).as_deref(), Some("b"));
        assert_eq!(
            extract_remote_id(&json!({"cardId": "c"})).as_deref(),
            Some("c")
        );
        assert_eq!(
            extract_remote_id(&json!({"card": {"id": "d"}})).as_deref(),
            Some("d")
        );
    }

    #[test]
    fn top_level_id_takes_precedence() {
        let body = json!({"card": {"id": "nested"}, "_id": "underscore", "id": "top"});
        assert_eq!(extract_remote_id(&body).as_deref(), Some("top"));
    }

    #[test]
    fn numeric_ids_are_stringified() {
        assert_eq!(
            extract_remote_id(&json!({"cardId": 42})).as_deref(),
            Some("42")
        );
    }

    #[test]
    fn blank_candidates_fall_through() {
        let body = json!({"id": "  ", "card": {"id": "nested"}});
        assert_eq!(extract_remote_id(&body).as_deref(), Some("nested"));
    }

    #[test]
    fn unrecognized_shape_yields_sentinel() {
        let card = RemoteCardRef::from_response(&json!({"data": {"uuid": "x"}}));
        assert_eq!(card.id, UNKNOWN_REMOTE_ID);
        assert!(card.is_unknown());

        let null_body = RemoteCardRef::from_response(&Value::Null);
        assert!(null_body.is_unknown());
    }
}
