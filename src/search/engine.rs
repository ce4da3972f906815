//! Core matching: non-overlapping, case-insensitive literal search.
//!
//! Matches are discovered left to right; a successful match advances the
//! cursor past its own end, so overlapping occurrences are not reported
//! ("ababab" contains one "aba", not two). Zero-length matches advance one
//! character. A hard iteration cap guards against pathological inputs: on
//! hitting it the result set is truncated and flagged, but no error reaches
//! the caller.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::SearchConfig;

/// One match in the source text.
///
/// `index` and `length` are byte offsets into the UTF-8 source, always on
/// character boundaries; `preview` carries the match with surrounding
/// context for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub index: usize,
    pub length: usize,
    pub preview: String,
}

/// Outcome of one full scan of the text.
#[derive(Debug, Clone, Default)]
pub struct MatchOutcome {
    /// Matches ordered by ascending index, never overlapping.
    pub results: Vec<SearchResult>,
    /// True when the iteration cap cut the scan short.
    pub truncated: bool,
}

/// Scan `text` with a compiled pattern, collecting every non-overlapping
/// match up to the configured iteration cap.
pub(crate) fn find_matches(text: &str, regex: &Regex, config: &SearchConfig) -> MatchOutcome {
    let mut outcome = MatchOutcome::default();
    let mut pos = 0;
    let mut iterations = 0;

    while pos <= text.len() {
        if iterations >= config.max_iterations {
            warn!(
                "search hit the {}-iteration cap; results truncated",
                config.max_iterations
            );
            outcome.truncated = true;
            break;
        }
        iterations += 1;

        let Some(m) = regex.find_at(text, pos) else {
            break;
        };

        if m.is_empty() {
            // Zero-length match: advance one character to avoid spinning.
            match next_char_boundary(text, m.start()) {
                Some(next) => pos = next,
                None => break,
            }
            continue;
        }

        outcome.results.push(SearchResult {
            index: m.start(),
            length: m.len(),
            preview: preview(text, m.start(), m.end(), config.preview_context),
        });
        pos = m.end();
    }

    outcome
}

/// Slice out the match plus up to `context` characters on each side,
/// clamped to character boundaries.
fn preview(text: &str, start: usize, end: usize, context: usize) -> String {
    let from = text[..start]
        .char_indices()
        .rev()
        .take(context)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(start);
    let to = text[end..]
        .char_indices()
        .take(context)
        .last()
        .map(|(i, c)| end + i + c.len_utf8())
        .unwrap_or(end);
    text[from..to.min(text.len())].to_string()
}

/// The byte index of the character after the one starting at `at`.
fn next_char_boundary(text: &str, at: usize) -> Option<usize> {
    text[at..].chars().next().map(|c| at + c.len_utf8()).filter(|&n| n < text.len())
}
