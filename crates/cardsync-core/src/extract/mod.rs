//! Card extraction from document text.
//!
//! A card lives in a fenced block tagged with the configured fence tag:
//!
//! ````text
//! ```flashcard
//! <!-- id: 3f9a0c21b7d4 -->
//! What is the capital of France?
//! ---
//! Paris
//! Tags: geo, europe
//! Deck: Geography
//! ```
//! ````
//!
//! Blocks without an identifier line get one inserted; all insertions for a
//! document are collected and applied in a single pass.

mod block;
mod patch;

use std::collections::HashSet;

use regex::Regex;
use uuid::Uuid;

use crate::models::{CardRecord, DocumentHandle};
use crate::{Error, Result};

use block::{id_annotation, parse_block, take_id_annotation};
pub use patch::{apply_patches, TextPatch};

/// Fence tag used when none is configured.
pub const DEFAULT_FENCE_TAG: &str = "flashcard";

/// Length of generated local identifiers (lowercase hex).
pub const LOCAL_ID_LEN: usize = 12;

/// Result of extracting one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Records in document order
    pub cards: Vec<CardRecord>,
    /// New document text, present only when identifiers were inserted
    pub rewritten: Option<String>,
    /// Identifiers generated for this document during this extraction
    pub assigned_ids: Vec<String>,
}

/// Extracts cards from documents, remembering every identifier it has seen so
/// generated identifiers stay unique across the corpus for one run.
#[derive(Debug)]
pub struct Extractor {
    fence: Regex,
    known_ids: HashSet<String>,
}

struct Block<'a> {
    body_start: usize,
    body: &'a str,
}

impl Extractor {
    /// Create an extractor for blocks fenced with ```` ```<fence_tag> ````.
    pub fn new(fence_tag: &str) -> Result<Self> {
        let fence_tag = fence_tag.trim();
        if fence_tag.is_empty() || fence_tag.chars().any(char::is_whitespace) {
            return Err(Error::InvalidInput(format!(
                "fence tag must be a single non-empty word, got '{fence_tag}'"
            )));
        }

        let pattern = format!(
            r"(?ms)^```{}[ \t]*\r?\n(.*?)^```[ \t]*\r?$",
            regex::escape(fence_tag)
        );
        let fence = Regex::new(&pattern)
            .map_err(|error| Error::InvalidInput(format!("invalid fence tag: {error}")))?;

        Ok(Self {
            fence,
            known_ids: HashSet::new(),
        })
    }

    /// Extract all well-formed cards from `text`.
    ///
    /// Malformed blocks produce neither a record nor a patch.
    pub fn extract(&mut self, text: &str, source: &DocumentHandle) -> Extraction {
        let blocks = self.find_blocks(text);

        // Existing identifiers are reserved before any new one is generated.
        for block in &blocks {
            if let Some((local_id, _)) = take_id_annotation(block.body) {
                self.known_ids.insert(local_id);
            }
        }

        let mut cards = Vec::with_capacity(blocks.len());
        let mut patches = Vec::new();
        let mut assigned_ids = Vec::new();

        for block in &blocks {
            let (local_id, parsed) = if let Some((local_id, rest)) = take_id_annotation(block.body) {
                let Some(parsed) = parse_block(&rest) else {
                    tracing::debug!(document = %source, local_id = %local_id, "Skipping malformed card block");
                    continue;
                };
                (local_id, parsed)
            } else {
                let Some(parsed) = parse_block(block.body) else {
                    tracing::debug!(document = %source, offset = block.body_start, "Skipping malformed card block");
                    continue;
                };
                let local_id = self.generate_local_id();
                let ending = line_ending(text, block.body_start);
                patches.push(TextPatch::insert(
                    block.body_start,
                    format!("{}{ending}", id_annotation(&local_id)),
                ));
                assigned_ids.push(local_id.clone());
                (local_id, parsed)
            };

            cards.push(CardRecord {
                local_id,
                payload: parsed.payload,
                tags: parsed.tags,
                deck: parsed.deck,
                source: source.clone(),
                raw_text: block.body.to_string(),
            });
        }

        if patches.is_empty() {
            return Extraction {
                cards,
                rewritten: None,
                assigned_ids,
            };
        }

        match apply_patches(text, patches) {
            Ok(rewritten) => Extraction {
                cards,
                rewritten: Some(rewritten),
                assigned_ids,
            },
            Err(error) => {
                tracing::error!(document = %source, "Failed to insert card identifiers: {}", error);
                cards.retain(|card| !assigned_ids.contains(&card.local_id));
                Extraction {
                    cards,
                    rewritten: None,
                    assigned_ids: Vec::new(),
                }
            }
        }
    }

    fn find_blocks<'a>(&self, text: &'a str) -> Vec<Block<'a>> {
        self.fence
            .captures_iter(text)
            .filter_map(|captures| captures.get(1))
            .map(|body| Block {
                body_start: body.start(),
                body: body.as_str(),
            })
            .collect()
    }

    fn generate_local_id(&mut self) -> String {
        loop {
            let candidate = Uuid::new_v4().simple().to_string()[..LOCAL_ID_LEN].to_string();
            if self.known_ids.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

/// Line ending of the line that ends right before `offset`.
fn line_ending(text: &str, offset: usize) -> &'static str {
    if text[..offset].ends_with("\r\n") {
        "\r\n"
    } else {
        "\n"
    }
}
