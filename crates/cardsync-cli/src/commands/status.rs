use cardsync_core::fingerprint::fingerprint;
use cardsync_core::reconcile::{plan, CardAction};
use cardsync_core::state::{StateStore, SyncState};
use cardsync_core::sync::{scan_documents, ScanReport};
use serde::Serialize;

use crate::cli::GlobalArgs;
use crate::commands::common::{document_store, format_sync_timestamp, load_config, state_store};
use crate::error::CliError;

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub tracked_cards: usize,
    pub cards_without_remote_id: usize,
    pub last_sync_timestamp: Option<i64>,
    pub cards_found: usize,
    pub pending_create: usize,
    pub pending_update: usize,
    pub unchanged: usize,
    pub documents_needing_ids: usize,
}

pub fn run_status(args: &GlobalArgs, as_json: bool) -> Result<(), CliError> {
    let config = load_config(args)?;
    let state = state_store(&config)?.load()?;
    let scan = scan_documents(&document_store(&config)?, &config.fence_tag)?;
    let status = build_status(&state, &scan);

    if as_json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    for line in format_status_lines(&status) {
        println!("{line}");
    }
    Ok(())
}

pub fn build_status(state: &SyncState, scan: &ScanReport) -> StatusReport {
    let mut status = StatusReport {
        tracked_cards: state.len(),
        cards_without_remote_id: state
            .cards
            .values()
            .filter(|entry| entry.remote_id == cardsync_core::remote::UNKNOWN_REMOTE_ID)
            .count(),
        last_sync_timestamp: state
            .cards
            .values()
            .map(|entry| entry.last_sync_timestamp)
            .max(),
        cards_found: scan.cards.len(),
        documents_needing_ids: scan.documents_needing_ids.len(),
        ..StatusReport::default()
    };

    for card in &scan.cards {
        match plan(state, &card.local_id, &fingerprint(card)) {
            CardAction::Create => status.pending_create += 1,
            CardAction::Update { .. } => status.pending_update += 1,
            CardAction::Unchanged => status.unchanged += 1,
        }
    }
    status
}

pub fn format_status_lines(status: &StatusReport) -> Vec<String> {
    let last_sync = status
        .last_sync_timestamp
        .map_or_else(|| "never".to_string(), format_sync_timestamp);

    let mut lines = vec![
        format!("Tracked cards: {}", status.tracked_cards),
        format!("Last sync: {last_sync}"),
        format!(
            "Documents: {} card(s) found, {} to create, {} to update, {} unchanged",
            status.cards_found, status.pending_create, status.pending_update, status.unchanged
        ),
    ];
    if status.documents_needing_ids > 0 {
        lines.push(format!(
            "{} document(s) will receive new identifiers",
            status.documents_needing_ids
        ));
    }
    if status.cards_without_remote_id > 0 {
        lines.push(format!(
            "{} tracked card(s) have no known remote id and cannot be updated",
            status.cards_without_remote_id
        ));
    }
    lines
}
