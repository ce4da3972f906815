//! Statistics over extracted text: lines, words, characters, reading time.

use serde::{Deserialize, Serialize};

/// Average adult reading speed, words per minute.
const READING_WPM: usize = 200;

/// Summary statistics for a block of text.
///
/// Blank or whitespace-only text yields all zeroes. `characters` counts
/// Unicode scalar values, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextStats {
    pub lines: usize,
    pub words: usize,
    pub characters: usize,
    pub characters_no_whitespace: usize,
    /// Estimated reading time in whole minutes, rounded up.
    pub reading_time_minutes: usize,
}

impl TextStats {
    pub fn of(text: &str) -> Self {
        if text.trim().is_empty() {
            return Self::default();
        }

        let words = text.split_whitespace().count();
        Self {
            lines: text.lines().count(),
            words,
            characters: text.chars().count(),
            characters_no_whitespace: text.chars().filter(|c| !c.is_whitespace()).count(),
            reading_time_minutes: words.div_ceil(READING_WPM),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.characters == 0
    }
}
