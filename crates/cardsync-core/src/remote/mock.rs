//! In-memory [`RemoteService`] that records calls, for tests.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{RemoteCardRef, RemoteDeck, RemoteError, RemoteResult, RemoteService, UNKNOWN_REMOTE_ID};

/// A call observed by [`MockCardService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    Create {
        content: String,
        deck_id: String,
        tags: Vec<String>,
    },
    Update {
        remote_id: String,
        content: String,
        tags: Vec<String>,
    },
    ListDecks,
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<RemoteCall>,
    decks: Vec<RemoteDeck>,
    failures: VecDeque<RemoteError>,
    create_response: Option<Value>,
    next_id: u32,
}

/// Records every call and answers from canned data.
///
/// Queued failures are returned by the next calls in order, regardless of
/// operation. Created cards get identifiers `remote-1`, `remote-2`, and so on
/// unless a fixed create response is configured.
#[derive(Debug, Default)]
pub struct MockCardService {
    state: Mutex<MockState>,
}

impl MockCardService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_decks(self, decks: Vec<RemoteDeck>) -> Self {
        self.lock().decks = decks;
        self
    }

    /// Answer every create with `body` instead of a generated identifier.
    #[must_use]
    pub fn with_create_response(self, body: Value) -> Self {
        self.lock().create_response = Some(body);
        self
    }

    /// Queue an error for the next call.
    pub fn fail_next(&self, error: RemoteError) {
        self.lock().failures.push_back(error);
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.lock().calls.clone()
    }

    pub fn create_count(&self) -> usize {
        self.count(|call| matches!(call, RemoteCall::Create { .. }))
    }

    pub fn update_count(&self) -> usize {
        self.count(|call| matches!(call, RemoteCall::Update { .. }))
    }

    pub fn list_count(&self) -> usize {
        self.count(|call| matches!(call, RemoteCall::ListDecks))
    }

    fn count(&self, predicate: impl Fn(&RemoteCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|call| predicate(call)).count()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: RemoteCall) -> RemoteResult<MutexGuard<'_, MockState>> {
        let mut state = self.lock();
        state.calls.push(call);
        match state.failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(state),
        }
    }
}

#[async_trait]
impl RemoteService for MockCardService {
    async fn create_card(
        &self,
        content: &str,
        deck_id: &str,
        tags: &[String],
    ) -> RemoteResult<RemoteCardRef> {
        let mut state = self.record(RemoteCall::Create {
            content: content.to_string(),
            deck_id: deck_id.to_string(),
            tags: tags.to_vec(),
        })?;

        if deck_id.trim().is_empty() {
            return Err(RemoteError::DeckNotFound(
                "no deck id configured for card".to_string(),
            ));
        }

        let body = if let Some(body) = &state.create_response {
            body.clone()
        } else {
            state.next_id += 1;
            json!({ "id": format!("remote-{}", state.next_id) })
        };
        Ok(RemoteCardRef::from_response(&body))
    }

    async fn update_card(
        &self,
        remote_id: &str,
        content: &str,
        tags: &[String],
    ) -> RemoteResult<RemoteCardRef> {
        let _state = self.record(RemoteCall::Update {
            remote_id: remote_id.to_string(),
            content: content.to_string(),
            tags: tags.to_vec(),
        })?;

        if remote_id == UNKNOWN_REMOTE_ID {
            return Err(RemoteError::Service(format!(
                "card '{remote_id}' does not exist"
            )));
        }
        Ok(RemoteCardRef {
            id: remote_id.to_string(),
        })
    }

    async fn list_decks(&self) -> RemoteResult<Vec<RemoteDeck>> {
        let state = self.record(RemoteCall::ListDecks)?;
        Ok(state.decks.clone())
    }
}
