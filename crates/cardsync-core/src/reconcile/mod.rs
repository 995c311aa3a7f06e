//! Reconciliation of extracted cards against sync state and the remote service.
//!
//! Cards are processed strictly in the order given. Each card is either left
//! alone (fingerprint unchanged), created, or updated. A failure only affects
//! the card it happened on: it is logged, reported in the summary, and the
//! state entry for that card is left untouched.

mod decks;

use std::collections::HashSet;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::fingerprint::fingerprint;
use crate::models::{CardRecord, DocumentHandle};
use crate::remote::{RemoteResult, RemoteService};
use crate::state::SyncState;
use crate::util::unix_timestamp_now_ms;

/// Spacing between remote calls when none is configured.
pub const DEFAULT_CALL_SPACING: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Minimum time between the start of one remote call and the next
    pub call_spacing: Duration,
    /// Deck used for cards without a `Deck:` override
    pub default_deck_id: Option<String>,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            call_spacing: DEFAULT_CALL_SPACING,
            default_deck_id: None,
        }
    }
}

/// A card that could not be synced during this run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardFailure {
    pub local_id: String,
    pub source: DocumentHandle,
    pub error: String,
}

/// Counters for one reconcile pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub total_found: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub failures: Vec<CardFailure>,
}

impl SyncSummary {
    fn record_failure(&mut self, card: &CardRecord, error: impl std::fmt::Display) {
        self.failed += 1;
        self.failures.push(CardFailure {
            local_id: card.local_id.clone(),
            source: card.source.clone(),
            error: error.to_string(),
        });
    }

    #[must_use]
    pub const fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// What has to happen to one card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardAction {
    Create,
    Update { remote_id: String },
    Unchanged,
}

/// Decide the action for a card with the given fingerprint.
#[must_use]
pub fn plan(state: &SyncState, local_id: &str, content_hash: &str) -> CardAction {
    match state.entry(local_id) {
        None => CardAction::Create,
        Some(entry) if entry.content_hash == content_hash => CardAction::Unchanged,
        Some(entry) => CardAction::Update {
            remote_id: entry.remote_id.clone(),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CardOutcome {
    Created,
    Updated,
    Unchanged,
}

/// Keeps remote calls at least `spacing` apart.
#[derive(Debug)]
struct Pacer {
    spacing: Duration,
    last_call: Option<Instant>,
}

impl Pacer {
    const fn new(spacing: Duration) -> Self {
        Self {
            spacing,
            last_call: None,
        }
    }

    async fn wait(&self) {
        if let Some(last_call) = self.last_call {
            tokio::time::sleep_until(last_call + self.spacing).await;
        }
    }

    fn mark(&mut self) {
        self.last_call = Some(Instant::now());
    }
}

/// Drives one reconcile pass against a remote service.
pub struct Reconciler<'a, S: ?Sized> {
    service: &'a S,
    options: ReconcileOptions,
    pacer: Pacer,
    decks_refreshed: bool,
}

impl<'a, S> Reconciler<'a, S>
where
    S: RemoteService + ?Sized,
{
    pub fn new(service: &'a S, options: ReconcileOptions) -> Self {
        let pacer = Pacer::new(options.call_spacing);
        Self {
            service,
            options,
            pacer,
            decks_refreshed: false,
        }
    }

    /// Reconcile `cards` in order, mutating `state` for every success.
    pub async fn reconcile(&mut self, cards: &[CardRecord], state: &mut SyncState) -> SyncSummary {
        let mut summary = SyncSummary {
            total_found: cards.len(),
            ..SyncSummary::default()
        };
        let mut seen = HashSet::new();

        for card in cards {
            if !card.is_valid() {
                tracing::warn!(local_id = %card.local_id, document = %card.source, "Skipping incomplete card");
                summary.record_failure(card, "card is missing required content");
                continue;
            }
            if !seen.insert(card.local_id.as_str()) {
                tracing::warn!(
                    local_id = %card.local_id,
                    document = %card.source,
                    "Duplicate card identifier, only the first occurrence is synced"
                );
                summary.record_failure(card, "duplicate card identifier");
                continue;
            }

            match self.sync_card(card, state).await {
                Ok(CardOutcome::Created) => summary.created += 1,
                Ok(CardOutcome::Updated) => summary.updated += 1,
                Ok(CardOutcome::Unchanged) => summary.unchanged += 1,
                Err(error) => {
                    tracing::warn!(
                        local_id = %card.local_id,
                        document = %card.source,
                        "Failed to sync card: {}",
                        error
                    );
                    summary.record_failure(card, error);
                }
            }
        }

        tracing::info!(
            found = summary.total_found,
            created = summary.created,
            updated = summary.updated,
            unchanged = summary.unchanged,
            failed = summary.failed,
            "Reconcile finished"
        );
        summary
    }

    async fn sync_card(
        &mut self,
        card: &CardRecord,
        state: &mut SyncState,
    ) -> RemoteResult<CardOutcome> {
        let content_hash = fingerprint(card);

        match plan(state, &card.local_id, &content_hash) {
            CardAction::Unchanged => {
                tracing::debug!(local_id = %card.local_id, "Card unchanged");
                Ok(CardOutcome::Unchanged)
            }
            CardAction::Create => {
                let deck_id = self.resolve_deck(card, state).await?;
                let content = card.payload.remote_content();

                self.pacer.wait().await;
                let result = self
                    .service
                    .create_card(&content, &deck_id, &card.tags)
                    .await;
                self.pacer.mark();

                let remote = result?;
                if remote.is_unknown() {
                    tracing::warn!(
                        local_id = %card.local_id,
                        "Created card but the response carried no identifier"
                    );
                }
                tracing::info!(local_id = %card.local_id, remote_id = %remote.id, "Created card");
                state.record_sync(
                    card.local_id.clone(),
                    remote.id,
                    content_hash,
                    unix_timestamp_now_ms(),
                );
                Ok(CardOutcome::Created)
            }
            CardAction::Update { remote_id } => {
                let content = card.payload.remote_content();

                self.pacer.wait().await;
                let result = self
                    .service
                    .update_card(&remote_id, &content, &card.tags)
                    .await;
                self.pacer.mark();

                result?;
                tracing::info!(local_id = %card.local_id, remote_id = %remote_id, "Updated card");
                state.record_sync(
                    card.local_id.clone(),
                    remote_id,
                    content_hash,
                    unix_timestamp_now_ms(),
                );
                Ok(CardOutcome::Updated)
            }
        }
    }
}
