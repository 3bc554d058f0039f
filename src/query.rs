//! Read-side queries over the numbered view.
//!
//! The free functions work on any `&[NumberedDay]` sorted by date (what the
//! sequencer produces); the [`RecordStore`] methods run them against the
//! cached view.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::StoreError;
use crate::medium::RecordMedium;
use crate::record::NumberedDay;
use crate::store::RecordStore;

/// Where a word was first recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordLocation {
    pub date: String,
    pub day_number: usize,
}

/// One distinct word text and the dates it appears on, ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordOccurrences {
    pub word: String,
    pub dates: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total_days: usize,
    pub total_words: usize,
}

impl Stats {
    pub fn average_per_day(&self) -> f64 {
        if self.total_days == 0 {
            0.0
        } else {
            self.total_words as f64 / self.total_days as f64
        }
    }
}

/// For each offset, the day numbered `max - offset`, or `None` when that
/// number is not positive or not present.
pub fn days_at_offsets(view: &[NumberedDay], offsets: &[u32]) -> Vec<Option<NumberedDay>> {
    let Some(max) = view.iter().map(|d| d.day_number).max() else {
        return vec![None; offsets.len()];
    };

    offsets
        .iter()
        .map(|&offset| {
            let target = max.checked_sub(offset as usize).filter(|n| *n > 0)?;
            view.iter().find(|d| d.day_number == target).cloned()
        })
        .collect()
}

/// First day, by ascending date, holding an entry whose text equals `text`.
pub fn locate_word(view: &[NumberedDay], text: &str) -> Option<WordLocation> {
    view.iter()
        .find(|d| d.record.contains_text(text))
        .map(|d| WordLocation {
            date: d.record.date.clone(),
            day_number: d.day_number,
        })
}

/// Substring search grouped by exact word text, ordered case-insensitively.
pub fn group_matches(
    view: &[NumberedDay],
    query: &str,
    case_insensitive: bool,
) -> Vec<WordOccurrences> {
    let needle = if case_insensitive {
        query.to_lowercase()
    } else {
        query.to_string()
    };

    let mut grouped: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for day in view {
        for word in day.words() {
            let hit = if case_insensitive {
                word.text.to_lowercase().contains(&needle)
            } else {
                word.text.contains(&needle)
            };
            if !hit {
                continue;
            }
            let dates = grouped.entry(word.text.as_str()).or_default();
            if dates.last().map(String::as_str) != Some(day.date()) {
                dates.push(day.date().to_string());
            }
        }
    }

    let mut results: Vec<WordOccurrences> = grouped
        .into_iter()
        .map(|(word, dates)| WordOccurrences {
            word: word.to_string(),
            dates,
        })
        .collect();
    results.sort_by_cached_key(|m| m.word.to_lowercase());
    results
}

impl<M: RecordMedium> RecordStore<M> {
    /// Alias for the full numbered view.
    pub fn all_days(&self) -> Result<Vec<NumberedDay>, StoreError> {
        self.view()
    }

    pub fn get_by_offsets(&self, offsets: &[u32]) -> Result<Vec<Option<NumberedDay>>, StoreError> {
        Ok(days_at_offsets(&self.view()?, offsets))
    }

    pub fn get_by_date(&self, date: &str) -> Result<Option<NumberedDay>, StoreError> {
        Ok(self.view()?.into_iter().find(|d| d.record.date == date))
    }

    /// Exact-text lookup used for duplicate checks before `add_word`.
    pub fn find_word(&self, text: &str) -> Result<Option<WordLocation>, StoreError> {
        Ok(locate_word(&self.view()?, text))
    }

    pub fn search_words(
        &self,
        query: &str,
        case_insensitive: bool,
    ) -> Result<Vec<WordOccurrences>, StoreError> {
        Ok(group_matches(&self.view()?, query, case_insensitive))
    }

    /// `(date, number of words)` per stored day, ascending.
    pub fn dates_with_word_counts(&self) -> Result<Vec<(String, usize)>, StoreError> {
        Ok(self
            .view()?
            .into_iter()
            .map(|d| {
                let count = d.record.word_count();
                (d.record.date, count)
            })
            .collect())
    }

    /// Total words per `YYYY-MM` for the months of `year` that have data.
    pub fn monthly_word_counts(&self, year: i32) -> Result<BTreeMap<String, usize>, StoreError> {
        let prefix = format!("{:04}-", year);
        let mut months = BTreeMap::new();
        for day in self.view()? {
            if !day.date().starts_with(&prefix) {
                continue;
            }
            let Some(month) = day.date().get(..7) else {
                continue;
            };
            *months.entry(month.to_string()).or_insert(0) += day.record.word_count();
        }
        Ok(months)
    }

    pub fn stats(&self) -> Result<Stats, StoreError> {
        let view = self.view()?;
        Ok(Stats {
            total_days: view.len(),
            total_words: view.iter().map(|d| d.record.word_count()).sum(),
        })
    }
}
