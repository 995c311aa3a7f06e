use cardsync_core::sync::{scan_documents, ScanReport};
use cardsync_core::CardRecord;
use serde::Serialize;

use crate::cli::GlobalArgs;
use crate::commands::common::{document_store, load_config};
use crate::error::CliError;

const PREVIEW_LEN: usize = 60;

#[derive(Debug, Serialize)]
pub struct CardListItem {
    pub local_id: String,
    pub kind: &'static str,
    pub preview: String,
    pub tags: Vec<String>,
    pub deck: Option<String>,
    pub source: String,
}

pub fn run_scan(args: &GlobalArgs, as_json: bool) -> Result<(), CliError> {
    let config = load_config(args)?;
    let documents = document_store(&config)?;
    let report = scan_documents(&documents, &config.fence_tag)?;

    if as_json {
        let items = report.cards.iter().map(card_to_item).collect::<Vec<_>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    for line in format_scan_lines(&report) {
        println!("{line}");
    }
    Ok(())
}

pub fn card_to_item(card: &CardRecord) -> CardListItem {
    CardListItem {
        local_id: card.local_id.clone(),
        kind: card.kind().label(),
        preview: card.title_preview(PREVIEW_LEN),
        tags: card.tags.clone(),
        deck: card.deck.clone(),
        source: card.source.to_string(),
    }
}

pub fn format_scan_lines(report: &ScanReport) -> Vec<String> {
    if report.cards.is_empty() {
        return vec![format!(
            "No cards found in {} document(s).",
            report.documents_scanned
        )];
    }

    let mut lines = report
        .cards
        .iter()
        .map(|card| {
            let tags = if card.tags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", card.tags.join(", "))
            };
            format!(
                "{} {:<5} {}{}  ({})",
                card.local_id,
                card.kind().label(),
                card.title_preview(PREVIEW_LEN),
                tags,
                card.source
            )
        })
        .collect::<Vec<_>>();

    lines.push(format!(
        "{} card(s) in {} document(s)",
        report.cards.len(),
        report.documents_scanned
    ));
    if !report.documents_needing_ids.is_empty() {
        lines.push(format!(
            "{} document(s) will receive new identifiers on the next sync",
            report.documents_needing_ids.len()
        ));
    }
    lines
}
