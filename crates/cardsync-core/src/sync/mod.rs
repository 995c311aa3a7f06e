//! One end-to-end sync run: extract, write back identifiers, reconcile, persist.

use serde::Serialize;

use crate::documents::DocumentStore;
use crate::extract::{Extractor, DEFAULT_FENCE_TAG};
use crate::models::{CardRecord, DocumentHandle};
use crate::reconcile::{ReconcileOptions, Reconciler, SyncSummary};
use crate::remote::RemoteService;
use crate::state::StateStore;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub fence_tag: String,
    pub reconcile: ReconcileOptions,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            fence_tag: DEFAULT_FENCE_TAG.to_string(),
            reconcile: ReconcileOptions::default(),
        }
    }
}

/// Outcome of a full run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub documents_scanned: usize,
    pub documents_rewritten: usize,
    /// Documents that could not be read, or whose new identifiers could not be
    /// written back
    pub documents_skipped: Vec<DocumentHandle>,
    pub summary: SyncSummary,
}

/// Cards found by [`scan_documents`], without touching anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub documents_scanned: usize,
    /// Documents that would receive new identifiers on the next sync
    pub documents_needing_ids: Vec<DocumentHandle>,
    pub documents_skipped: Vec<DocumentHandle>,
    pub cards: Vec<CardRecord>,
}

/// Run a complete sync.
///
/// Per-card remote failures are reported in the summary. Failing to list
/// documents or to load or persist state aborts the run with an error;
/// remote changes made before a persistence failure are not rolled back.
pub async fn run_sync<D, T, S>(
    documents: &D,
    state_store: &T,
    service: &S,
    options: &SyncOptions,
) -> Result<SyncReport>
where
    D: DocumentStore + ?Sized,
    T: StateStore + ?Sized,
    S: RemoteService + ?Sized,
{
    let mut extractor = Extractor::new(&options.fence_tag)?;
    let mut state = state_store.load()?;
    let handles = documents.list_documents()?;

    let mut report = SyncReport {
        documents_scanned: handles.len(),
        ..SyncReport::default()
    };
    let mut cards = Vec::new();

    for handle in &handles {
        let text = match documents.read_document(handle) {
            Ok(text) => text,
            Err(error) => {
                tracing::warn!(document = %handle, "Skipping unreadable document: {}", error);
                report.documents_skipped.push(handle.clone());
                continue;
            }
        };

        let mut extraction = extractor.extract(&text, handle);

        if let Some(rewritten) = &extraction.rewritten {
            match documents.write_document(handle, rewritten) {
                Ok(()) => {
                    tracing::info!(
                        document = %handle,
                        assigned = extraction.assigned_ids.len(),
                        "Wrote card identifiers"
                    );
                    report.documents_rewritten += 1;
                }
                Err(error) => {
                    tracing::warn!(
                        document = %handle,
                        "Failed to write card identifiers, skipping new cards: {}",
                        error
                    );
                    let assigned = &extraction.assigned_ids;
                    extraction
                        .cards
                        .retain(|card| !assigned.contains(&card.local_id));
                    report.documents_skipped.push(handle.clone());
                }
            }
        }

        tracing::debug!(document = %handle, cards = extraction.cards.len(), "Extracted cards");
        cards.extend(extraction.cards);
    }

    report.summary = Reconciler::new(service, options.reconcile.clone())
        .reconcile(&cards, &mut state)
        .await;

    state_store.persist(&state)?;
    Ok(report)
}

/// Extract cards from every document without writing anything.
pub fn scan_documents<D>(documents: &D, fence_tag: &str) -> Result<ScanReport>
where
    D: DocumentStore + ?Sized,
{
    let mut extractor = Extractor::new(fence_tag)?;
    let handles = documents.list_documents()?;
    let mut report = ScanReport {
        documents_scanned: handles.len(),
        ..ScanReport::default()
    };

    for handle in &handles {
        let text = match documents.read_document(handle) {
            Ok(text) => text,
            Err(error) => {
                tracing::warn!(document = %handle, "Skipping unreadable document: {}", error);
                report.documents_skipped.push(handle.clone());
                continue;
            }
        };

        let extraction = extractor.extract(&text, handle);
        if extraction.rewritten.is_some() {
            report.documents_needing_ids.push(handle.clone());
        }
        report.cards.extend(extraction.cards);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::mock::MockCardService;
    use crate::remote::RemoteError;
    use crate::testing::{MemoryDocumentStore, MemoryStateStore};
    use crate::Error;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    const GEO: &str = "# Geo\n\n```flashcard\nQ: capital of X\n---\nA: Y\nTags: geo, easy\n```\n";

    fn options() -> SyncOptions {
        SyncOptions {
            fence_tag: DEFAULT_FENCE_TAG.to_string(),
            reconcile: ReconcileOptions {
                call_spacing: Duration::from_millis(500),
                default_deck_id: Some("deck-1".to_string()),
            },
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_and_second_run() {
        let documents = MemoryDocumentStore::new([("geo.md", GEO)]);
        let state_store = MemoryStateStore::new();
        let service = MockCardService::new();

        let first = run_sync(&documents, &state_store, &service, &options())
            .await
            .unwrap();
        assert_eq!(first.documents_scanned, 1);
        assert_eq!(first.documents_rewritten, 1);
        assert_eq!(first.summary.created, 1);

        let rewritten = documents.text("geo.md");
        assert!(rewritten.contains("```flashcard\n<!-- id: "));
        let saved = state_store.saved().unwrap();
        assert_eq!(saved.len(), 1);

        let second = run_sync(&documents, &state_store, &service, &options())
            .await
            .unwrap();
        assert_eq!(second.documents_rewritten, 0);
        assert_eq!(second.summary.unchanged, 1);
        assert_eq!(second.summary.created, 0);
        assert_eq!(documents.text("geo.md"), rewritten);
        assert_eq!(documents.writes().len(), 1);
        assert_eq!(service.create_count(), 1);
        assert_eq!(state_store.saved().unwrap(), saved);
    }

    #[tokio::test(start_paused = true)]
    async fn editing_a_card_triggers_one_update() {
        let documents = MemoryDocumentStore::new([("geo.md", GEO)]);
        let state_store = MemoryStateStore::new();
        let service = MockCardService::new();
        run_sync(&documents, &state_store, &service, &options())
            .await
            .unwrap();

        let edited = documents.text("geo.md").replace("A: Y", "A: Z");
        documents
            .write_document(&DocumentHandle::new("geo.md"), &edited)
            .unwrap();

        let report = run_sync(&documents, &state_store, &service, &options())
            .await
            .unwrap();
        assert_eq!(report.summary.updated, 1);
        assert_eq!(service.update_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn persistence_failure_is_fatal_after_remote_changes() {
        let documents = MemoryDocumentStore::new([("geo.md", GEO)]);
        let state_store = MemoryStateStore::failing();
        let service = MockCardService::new();

        let error = run_sync(&documents, &state_store, &service, &options())
            .await
            .unwrap_err();
        assert!(matches!(error, Error::StatePersistence(_)));
        assert_eq!(service.create_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unreadable_documents_are_skipped() {
        let documents = MemoryDocumentStore::new([("a.md", GEO), ("b.md", GEO)]).unreadable("a.md");
        let state_store = MemoryStateStore::new();
        let service = MockCardService::new();

        let report = run_sync(&documents, &state_store, &service, &options())
            .await
            .unwrap();
        assert_eq!(report.documents_skipped, vec![DocumentHandle::new("a.md")]);
        assert_eq!(report.summary.created, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_rewrite_excludes_only_new_cards() {
        let text = "```flashcard\n<!-- id: known -->\nq1\n---\na1\n```\n```flashcard\nq2\n---\na2\n```\n";
        let documents = MemoryDocumentStore::new([("a.md", text)]).read_only("a.md");
        let state_store = MemoryStateStore::new();
        let service = MockCardService::new();

        let report = run_sync(&documents, &state_store, &service, &options())
            .await
            .unwrap();
        assert_eq!(report.documents_rewritten, 0);
        assert_eq!(report.documents_skipped, vec![DocumentHandle::new("a.md")]);
        assert_eq!(report.summary.total_found, 1);
        assert_eq!(report.summary.created, 1);

        let saved = state_store.saved().unwrap();
        assert!(saved.entry("known").is_some());
        assert_eq!(saved.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn remote_failures_still_persist_state() {
        let documents = MemoryDocumentStore::new([(
            "a.md",
            "```flashcard\n<!-- id: one -->\nq1\n---\na1\n```\n```flashcard\n<!-- id: two -->\nq2\n---\na2\n```\n",
        )]);
        let state_store = MemoryStateStore::new();
        let service = MockCardService::new();
        service.fail_next(RemoteError::Service("down".to_string()));

        let report = run_sync(&documents, &state_store, &service, &options())
            .await
            .unwrap();
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.summary.created, 1);
        let saved = state_store.saved().unwrap();
        assert!(saved.entry("one").is_none());
        assert!(saved.entry("two").is_some());
    }

    #[test]
    fn scan_reports_cards_without_writing() {
        let documents = MemoryDocumentStore::new([
            ("a.md", GEO),
            ("b.md", "```flashcard\n<!-- id: fixed -->\nThe {{c1::sun}} rises\n```\n"),
        ]);

        let report = scan_documents(&documents, DEFAULT_FENCE_TAG).unwrap();
        assert_eq!(report.documents_scanned, 2);
        assert_eq!(report.cards.len(), 2);
        assert_eq!(report.documents_needing_ids, vec![DocumentHandle::new("a.md")]);
        assert!(documents.writes().is_empty());
        assert_eq!(documents.text("a.md"), GEO);
    }

    #[test]
    fn scan_rejects_invalid_fence_tag() {
        let documents = MemoryDocumentStore::new(Vec::<(&str, &str)>::new());
        assert!(matches!(
            scan_documents(&documents, ""),
            Err(Error::InvalidInput(_))
        ));
    }
}
