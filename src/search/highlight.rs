//! Structured highlight segmentation.
//!
//! Given a result set, the source text is partitioned into an ordered
//! sequence of alternating plain and matched segments; the current match is
//! tagged. Hosts render segments however they like — the library never
//! synthesises markup strings from match text.
//!
//! Invariant: concatenating every segment's text reproduces the source
//! exactly.

use serde::Serialize;

use crate::search::engine::SearchResult;

/// One piece of the partitioned text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub text: String,
    pub is_match: bool,
    /// True only for the match at the navigation cursor.
    pub is_current: bool,
    /// Position of this match within the result set; `None` for plain text.
    pub match_index: Option<usize>,
}

impl Segment {
    fn plain(text: &str) -> Self {
        Self {
            text: text.to_string(),
            is_match: false,
            is_current: false,
            match_index: None,
        }
    }

    fn matched(text: &str, match_index: usize, is_current: bool) -> Self {
        Self {
            text: text.to_string(),
            is_match: true,
            is_current,
            match_index: Some(match_index),
        }
    }
}

/// Partition `text` into plain and matched segments.
///
/// `results` must be ordered by ascending index and non-overlapping, which
/// the matcher guarantees; anything violating that is skipped rather than
/// double-counted.
pub fn segments(text: &str, results: &[SearchResult], current: Option<usize>) -> Vec<Segment> {
    if results.is_empty() {
        return if text.is_empty() {
            Vec::new()
        } else {
            vec![Segment::plain(text)]
        };
    }

    let mut out = Vec::with_capacity(results.len() * 2 + 1);
    let mut cursor = 0;

    for (i, result) in results.iter().enumerate() {
        let end = result.index + result.length;
        if result.index < cursor || end > text.len() {
            continue;
        }
        if result.index > cursor {
            out.push(Segment::plain(&text[cursor..result.index]));
        }
        out.push(Segment::matched(
            &text[result.index..end],
            i,
            current == Some(i),
        ));
        cursor = end;
    }

    if cursor < text.len() {
        out.push(Segment::plain(&text[cursor..]));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(index: usize, length: usize) -> SearchResult {
        SearchResult {
            index,
            length,
            preview: String::new(),
        }
    }

    fn concat(segments: &[Segment]) -> String {
        segments.iter().map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn no_results_yields_one_plain_segment() {
        let segs = segments("hello world", &[], None);
        assert_eq!(segs.len(), 1);
        assert!(!segs[0].is_match);
        assert_eq!(concat(&segs), "hello world");
    }

    #[test]
    fn empty_text_yields_no_segments() {
        assert!(segments("", &[], None).is_empty());
    }

    #[test]
    fn partitions_around_matches() {
        let text = "the cat sat on the mat";
        let results = [result(5, 2), result(9, 2), result(20, 2)];
        let segs = segments(text, &results, Some(1));

        assert_eq!(concat(&segs), text);
        let matched: Vec<&Segment> = segs.iter().filter(|s| s.is_match).collect();
        assert_eq!(matched.len(), 3);
        assert!(matched.iter().all(|s| s.text == "at"));
        assert!(matched[1].is_current);
        assert!(!matched[0].is_current);
        assert!(!matched[2].is_current);
        assert_eq!(matched[2].match_index, Some(2));
    }

    #[test]
    fn adjacent_matches_have_no_plain_gap() {
        let text = "abab";
        let segs = segments(text, &[result(0, 2), result(2, 2)], Some(0));
        assert_eq!(segs.len(), 2);
        assert!(segs.iter().all(|s| s.is_match));
        assert_eq!(concat(&segs), text);
    }

    #[test]
    fn match_at_the_very_start_and_end() {
        let text = "xx middle xx";
        let segs = segments(text, &[result(0, 2), result(10, 2)], None);
        assert_eq!(concat(&segs), text);
        assert!(segs.first().unwrap().is_match);
        assert!(segs.last().unwrap().is_match);
    }

    #[test]
    fn overlapping_input_is_never_double_counted() {
        // The matcher never produces overlaps; if a caller does, the second
        // span is dropped and the round-trip invariant still holds.
        let text = "ababab";
        let segs = segments(text, &[result(0, 3), result(2, 3)], None);
        assert_eq!(concat(&segs), text);
        assert_eq!(segs.iter().filter(|s| s.is_match).count(), 1);
    }

    #[test]
    fn round_trip_holds_for_unicode_text() {
        let text = "héllo wörld héllo";
        let results = [result(0, 6), result(14, 6)];
        let segs = segments(text, &results, Some(0));
        assert_eq!(concat(&segs), text);
    }
}
