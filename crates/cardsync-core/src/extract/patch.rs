//! Collect-then-apply text edits over a single document.

use crate::{Error, Result};

/// Replace the byte range `start..end` of a document with `replacement`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextPatch {
    pub start: usize,
    pub end: usize,
    pub replacement: String,
}

impl TextPatch {
    /// Pure insertion at `offset`.
    #[must_use]
    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self {
            start: offset,
            end: offset,
            replacement: text.into(),
        }
    }
}

/// Apply all patches in one pass.
///
/// Patches are spliced in descending start order so offsets computed against
/// the original text stay valid. Ranges must not overlap and must fall on
/// UTF-8 boundaries.
pub fn apply_patches(text: &str, mut patches: Vec<TextPatch>) -> Result<String> {
    patches.sort_by(|a, b| b.start.cmp(&a.start).then(b.end.cmp(&a.end)));

    let mut upper_bound = text.len();
    for patch in &patches {
        if patch.start > patch.end
            || patch.end > upper_bound
            || !text.is_char_boundary(patch.start)
            || !text.is_char_boundary(patch.end)
        {
            return Err(Error::InvalidInput(format!(
                "text patch {}..{} overlaps another patch or is out of bounds",
                patch.start, patch.end
            )));
        }
        upper_bound = patch.start;
    }

    let extra: usize = patches.iter().map(|patch| patch.replacement.len()).sum();
    let mut output = String::with_capacity(text.len() + extra);
    output.push_str(text);
    for patch in &patches {
        output.replace_range(patch.start..patch.end, &patch.replacement);
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn insertions_keep_original_offsets_valid() {
        let text = "aaa\nbbb\nccc\n";
        let patches = vec![
            TextPatch::insert(0, "1\n"),
            TextPatch::insert(8, "3\n"),
            TextPatch::insert(4, "2\n"),
        ];
        assert_eq!(
            apply_patches(text, patches).unwrap(),
            "1\naaa\n2\nbbb\n3\nccc\n"
        );
    }

    #[test]
    fn replacement_and_insertion_combine() {
        let text = "hello world";
        let patches = vec![
            TextPatch {
                start: 6,
                end: 11,
                replacement: "there".to_string(),
            },
            TextPatch::insert(0, ">> "),
        ];
        assert_eq!(apply_patches(text, patches).unwrap(), ">> hello there");
    }

    #[test]
    fn overlapping_ranges_are_rejected() {
        let patches = vec![
            TextPatch {
                start: 0,
                end: 5,
                replacement: String::new(),
            },
            TextPatch {
                start: 3,
                end: 7,
                replacement: String::new(),
            },
        ];
        assert!(apply_patches("hello world", patches).is_err());
    }

    #[test]
    fn out_of_bounds_and_split_chars_are_rejected() {
        assert!(apply_patches("abc", vec![TextPatch::insert(10, "x")]).is_err());
        assert!(apply_patches("é", vec![TextPatch::insert(1, "x")]).is_err());
    }

    #[test]
    fn no_patches_returns_text_unchanged() {
        assert_eq!(apply_patches("same", Vec::new()).unwrap(), "same");
    }
}
