//! Parsing of a single card block body.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::CardPayload;

/// Card content parsed out of a block body, before identity is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParsedBlock {
    pub payload: CardPayload,
    pub tags: Vec<String>,
    pub deck: Option<String>,
}

fn id_annotation_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*<!--\s*id:\s*([\w-]+)\s*-->\s*$").expect("Invalid regex"))
}

fn tags_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*tags:(.*)$").expect("Invalid regex"))
}

fn deck_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*deck:(.*)$").expect("Invalid regex"))
}

fn cloze_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{[A-Za-z]?(\d+)::?([^}]*)\}\}").expect("Invalid regex"))
}

fn separator_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*-{3,}\s*$").expect("Invalid regex"))
}

/// Render the annotation line that carries a card identifier.
pub(crate) fn id_annotation(local_id: &str) -> String {
    format!("<!-- id: {local_id} -->")
}

/// Return the identifier if `line` is an identifier annotation.
pub(crate) fn parse_id_annotation(line: &str) -> Option<String> {
    id_annotation_regex()
        .captures(line.trim_end_matches('\r'))
        .map(|captures| captures[1].trim().to_string())
}

/// Find the identifier annotation near the top of a block body.
///
/// Only blank and metadata lines may precede the annotation. Returns the
/// identifier and the body with the annotation line removed.
pub(crate) fn take_id_annotation(body: &str) -> Option<(String, String)> {
    let lines: Vec<&str> = body.lines().collect();

    for (index, line) in lines.iter().enumerate() {
        if let Some(local_id) = parse_id_annotation(line) {
            let rest = lines
                .iter()
                .enumerate()
                .filter(|(other, _)| *other != index)
                .map(|(_, line)| *line)
                .collect::<Vec<_>>()
                .join("\n");
            return Some((local_id, rest));
        }
        if !line.trim().is_empty() && !is_metadata_line(line) {
            return None;
        }
    }
    None
}

fn is_metadata_line(line: &str) -> bool {
    tags_regex().is_match(line) || deck_regex().is_match(line)
}

/// Parse a block body (identifier line already removed).
///
/// Returns `None` for malformed blocks; they are skipped, never reported.
pub(crate) fn parse_block(body: &str) -> Option<ParsedBlock> {
    let mut tags = Vec::new();
    let mut deck = None;
    let mut content_lines = Vec::new();

    for line in body.lines() {
        if let Some(captures) = tags_regex().captures(line) {
            tags.extend(
                captures[1]
                    .split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_string),
            );
        } else if let Some(captures) = deck_regex().captures(line) {
            let name = captures[1].trim();
            deck = (!name.is_empty()).then(|| name.to_string());
        } else {
            content_lines.push(line);
        }
    }

    let payload = classify(&content_lines)?;
    Some(ParsedBlock {
        payload,
        tags,
        deck,
    })
}

fn classify(lines: &[&str]) -> Option<CardPayload> {
    let content = lines.join("\n");

    if cloze_regex().is_match(&content) {
        let content = normalize_cloze(&content).trim().to_string();
        return Some(CardPayload::Cloze { content });
    }

    let separator = lines.iter().position(|line| separator_regex().is_match(line))?;
    let question = lines[..separator].join("\n").trim().to_string();
    let answer = lines[separator + 1..].join("\n").trim().to_string();
    if question.is_empty() || answer.is_empty() {
        return None;
    }

    Some(CardPayload::QuestionAnswer { question, answer })
}

/// Rewrite every cloze token to `{{<index>::text}}`, dropping any letter
/// prefix on the index.
pub(crate) fn normalize_cloze(content: &str) -> String {
    cloze_regex()
        .replace_all(content, "{{${1}::${2}}}")
        .into_owned()
}
