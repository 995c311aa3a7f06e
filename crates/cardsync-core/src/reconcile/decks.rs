//! Deck resolution for card creation.

use super::Reconciler;
use crate::models::CardRecord;
use crate::remote::{RemoteError, RemoteResult, RemoteService};
use crate::state::SyncState;

impl<S> Reconciler<'_, S>
where
    S: RemoteService + ?Sized,
{
    /// Remote deck id for a new card.
    ///
    /// A `Deck:` override is looked up by name in the state's deck table,
    /// refreshing the table from the service at most once per run. Cards
    /// without an override use the configured default, which may be empty.
    pub(super) async fn resolve_deck(
        &mut self,
        card: &CardRecord,
        state: &mut SyncState,
    ) -> RemoteResult<String> {
        let Some(name) = card
            .deck
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
        else {
            return Ok(self.options.default_deck_id.clone().unwrap_or_default());
        };

        if let Some(deck_id) = state.deck_id(name) {
            return Ok(deck_id.to_string());
        }

        if !self.decks_refreshed {
            self.decks_refreshed = true;
            self.refresh_decks(state).await;
            if let Some(deck_id) = state.deck_id(name) {
                return Ok(deck_id.to_string());
            }
        }

        Err(RemoteError::DeckNotFound(name.to_string()))
    }

    async fn refresh_decks(&mut self, state: &mut SyncState) {
        self.pacer.wait().await;
        let result = self.service.list_decks().await;
        self.pacer.mark();

        match result {
            Ok(decks) => {
                tracing::info!(count = decks.len(), "Refreshed deck table");
                state.replace_decks(decks.into_iter().map(|deck| (deck.name, deck.id)));
            }
            Err(error) => {
                tracing::warn!("Failed to list decks: {}", error);
            }
        }
    }
}
