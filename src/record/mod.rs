//! Records - the per-date vocabulary documents held by the store.
//!
//! A [`DayRecord`] is keyed by its ISO date and owns an ordered list of
//! [`WordEntry`] values. Day numbers are never part of a stored record; the
//! numbered projection is the separate [`NumberedDay`] type produced by the
//! sequencer.
//!
//! ## Example
//!
//! ```ignore
//! use dayx_core::{DayRecord, WordColor};
//!
//! let mut day = DayRecord::new("2024-01-05", "Fri");
//! day.push_word("ephemeral");
//! day.words[0].color = WordColor::Green;
//! ```

mod wire;

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub(crate) use wire::{decode_stored, encode_stored, parse_payload, parse_records_json};

/// Highlight color of a word entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordColor {
    #[default]
    Grey,
    Green,
    Blue,
    Red,
}

impl WordColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            WordColor::Grey => "grey",
            WordColor::Green => "green",
            WordColor::Blue => "blue",
            WordColor::Red => "red",
        }
    }

    /// Parse a wire color name. Unknown names are `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "grey" => Some(WordColor::Grey),
            "green" => Some(WordColor::Green),
            "blue" => Some(WordColor::Blue),
            "red" => Some(WordColor::Red),
            _ => None,
        }
    }
}

impl fmt::Display for WordColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single recorded word. Identified only by its position in the owning record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordEntry {
    pub text: String,
    pub color: WordColor,
}

impl WordEntry {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: WordColor::Grey,
        }
    }

    pub fn with_color(mut self, color: WordColor) -> Self {
        self.color = color;
        self
    }
}

/// All words recorded on one calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayRecord {
    pub date: String,
    pub weekday: String,
    pub words: Vec<WordEntry>,
    pub review_count: u32,
}

impl DayRecord {
    pub fn new(date: impl Into<String>, weekday: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            weekday: weekday.into(),
            words: Vec::new(),
            review_count: 0,
        }
    }

    pub fn with_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.words.extend(words.into_iter().map(WordEntry::new));
        self
    }

    pub fn with_review_count(mut self, count: u32) -> Self {
        self.review_count = count;
        self
    }

    /// Append a grey entry.
    pub fn push_word(&mut self, text: impl Into<String>) {
        self.words.push(WordEntry::new(text));
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn contains_text(&self, text: &str) -> bool {
        self.words.iter().any(|w| w.text == text)
    }
}

/// A record together with its derived day number.
///
/// Only ever built from a full sorted snapshot; see [`crate::DerivedSequencer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NumberedDay {
    pub day_number: usize,
    #[serde(flatten)]
    pub record: DayRecord,
}

impl NumberedDay {
    pub fn date(&self) -> &str {
        &self.record.date
    }

    pub fn words(&self) -> &[WordEntry] {
        &self.record.words
    }

    pub fn into_record(self) -> DayRecord {
        self.record
    }
}

/// English three-letter weekday code (`Mon`, `Tue`, ...) for an ISO date.
///
/// Returns `None` when `date` is not a valid `YYYY-MM-DD` date.
pub fn weekday_for(date: &str) -> Option<String> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .map(|d| d.format("%a").to_string())
}
