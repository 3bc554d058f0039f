//! RecordStore - exclusive owner of day record persistence.
//!
//! Every mutation runs under a store-wide write lock, writes through the
//! [`RecordMedium`], and invalidates the [`ReadCache`] before returning, so
//! the next read on any task sees the change.
//!
//! ## Example
//!
//! ```ignore
//! use dayx_core::{InMemoryMedium, RecordStore, WordColor};
//!
//! let store = RecordStore::new(InMemoryMedium::new());
//! store.add_word("2024-01-05", "Fri", "ephemeral")?;
//! store.set_word_color(1, 0, WordColor::Green)?;
//! let today = store.get_by_offsets(&[0])?;
//! ```

use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use log::{debug, info};
use serde_json::Value;

use crate::cache::ReadCache;
use crate::error::StoreError;
use crate::medium::RecordMedium;
use crate::record::{
    decode_stored, encode_stored, parse_payload, parse_records_json, DayRecord, NumberedDay,
    WordColor, WordEntry,
};

/// What a word-list mutation left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayChange {
    /// The record still has words.
    Updated(DayRecord),
    /// The word list became empty and the record for `date` was deleted.
    Removed { date: String },
}

impl DayChange {
    pub fn is_removed(&self) -> bool {
        matches!(self, DayChange::Removed { .. })
    }
}

pub struct RecordStore<M> {
    medium: M,
    cache: ReadCache,
    write_lock: Mutex<()>,
}

impl<M: RecordMedium> RecordStore<M> {
    pub fn new(medium: M) -> Self {
        Self {
            medium,
            cache: ReadCache::new(),
            write_lock: Mutex::new(()),
        }
    }

    /// Access the underlying medium.
    pub fn medium(&self) -> &M {
        &self.medium
    }

    /// Access the read cache (for inspection; writers only invalidate).
    pub fn cache(&self) -> &ReadCache {
        &self.cache
    }

    // ------------------------------------------------------------------------
    // read path
    // ------------------------------------------------------------------------

    fn load_all(&self) -> Result<Vec<DayRecord>, StoreError> {
        self.medium
            .scan_raw()?
            .iter()
            .map(|bytes| decode_stored(bytes))
            .collect()
    }

    /// The full numbered view, ascending by date. Always a private copy.
    pub fn view(&self) -> Result<Vec<NumberedDay>, StoreError> {
        self.cache.get_or_rebuild(|| self.load_all())
    }

    fn resolve_date(&self, day_number: usize) -> Result<String, StoreError> {
        self.view()?
            .into_iter()
            .find(|d| d.day_number == day_number)
            .map(|d| d.record.date)
            .ok_or_else(|| StoreError::day_not_found(day_number))
    }

    fn load_record(&self, date: &str) -> Result<Option<DayRecord>, StoreError> {
        self.medium
            .get_raw(date)?
            .map(|bytes| decode_stored(&bytes))
            .transpose()
    }

    // ------------------------------------------------------------------------
    // write path
    // ------------------------------------------------------------------------

    fn lock_writes(&self) -> Result<MutexGuard<'_, ()>, StoreError> {
        self.write_lock
            .lock()
            .map_err(|_| StoreError::poisoned("store write"))
    }

    fn save_record(&self, record: &DayRecord) -> Result<(), StoreError> {
        self.medium.put_raw(&record.date, encode_stored(record)?)
    }

    /// Load the record behind `day_number`, apply `change`, and persist it.
    /// A record whose last word goes away is deleted; with `drop_empty` an
    /// empty result is deleted even if the record had no words before.
    fn update_day<F>(
        &self,
        day_number: usize,
        drop_empty: bool,
        change: F,
    ) -> Result<DayChange, StoreError>
    where
        F: FnOnce(&mut DayRecord) -> Result<(), StoreError>,
    {
        let _guard = self.lock_writes()?;
        let date = self.resolve_date(day_number)?;
        let mut record = self
            .load_record(&date)?
            .ok_or_else(|| StoreError::NotFound(format!("record for {}", date)))?;

        let had_words = !record.words.is_empty();
        change(&mut record)?;

        let outcome = if (had_words || drop_empty) && record.words.is_empty() {
            self.medium.remove(&date)?;
            debug!("removed {} after its last word was deleted", date);
            DayChange::Removed { date }
        } else {
            check_record(&record, 1)?;
            self.save_record(&record)?;
            DayChange::Updated(record)
        };
        self.cache.invalidate();
        Ok(outcome)
    }

    fn update_existing<F>(&self, day_number: usize, change: F) -> Result<DayRecord, StoreError>
    where
        F: FnOnce(&mut DayRecord) -> Result<(), StoreError>,
    {
        match self.update_day(day_number, false, change)? {
            DayChange::Updated(record) => Ok(record),
            DayChange::Removed { date } => Err(StoreError::NotFound(format!("record for {}", date))),
        }
    }

    fn check_index(record: &DayRecord, index: usize) -> Result<(), StoreError> {
        if index < record.words.len() {
            Ok(())
        } else {
            Err(StoreError::Index {
                date: record.date.clone(),
                index,
                len: record.words.len(),
            })
        }
    }

    fn check_text(text: &str) -> Result<(), StoreError> {
        if text.is_empty() {
            Err(StoreError::Validation("word text must not be empty".into()))
        } else {
            Ok(())
        }
    }

    fn check_key(date: &str, weekday: &str) -> Result<(), StoreError> {
        if date.is_empty() || weekday.is_empty() {
            Err(StoreError::Validation("date and weekday must not be empty".into()))
        } else {
            Ok(())
        }
    }

    /// Append `text` to the record for `date`, creating the record if needed.
    ///
    /// Duplicates are accepted; callers check with [`RecordStore::find_word`]
    /// first if they care.
    pub fn add_word(&self, date: &str, weekday: &str, text: &str) -> Result<DayRecord, StoreError> {
        Self::check_text(text)?;
        Self::check_key(date, weekday)?;
        let _guard = self.lock_writes()?;
        let mut record = self
            .load_record(date)?
            .unwrap_or_else(|| DayRecord::new(date, weekday));
        record.words.push(WordEntry::new(text));
        self.save_record(&record)?;
        self.cache.invalidate();
        Ok(record)
    }

    /// Remove the word at `index`; deletes the whole record when it was the last one.
    pub fn delete_word(&self, day_number: usize, index: usize) -> Result<DayChange, StoreError> {
        self.update_day(day_number, false, |record| {
            Self::check_index(record, index)?;
            record.words.remove(index);
            Ok(())
        })
    }

    /// Replace the word list wholesale. The new list is not checked against
    /// the old one; an empty list deletes the record.
    pub fn reorder_words(
        &self,
        day_number: usize,
        words: Vec<WordEntry>,
    ) -> Result<DayChange, StoreError> {
        self.update_day(day_number, true, |record| {
            record.words = words;
            Ok(())
        })
    }

    pub fn set_word_color(
        &self,
        day_number: usize,
        index: usize,
        color: WordColor,
    ) -> Result<DayRecord, StoreError> {
        self.update_existing(day_number, |record| {
            Self::check_index(record, index)?;
            record.words[index].color = color;
            Ok(())
        })
    }

    pub fn set_word_text(
        &self,
        day_number: usize,
        index: usize,
        text: &str,
    ) -> Result<DayRecord, StoreError> {
        Self::check_text(text)?;
        self.update_existing(day_number, |record| {
            Self::check_index(record, index)?;
            record.words[index].text = text.to_string();
            Ok(())
        })
    }

    /// Store `count` as given. Clamping belongs to the caller.
    pub fn set_review_count(&self, day_number: usize, count: u32) -> Result<DayRecord, StoreError> {
        self.update_existing(day_number, |record| {
            record.review_count = count;
            Ok(())
        })
    }

    pub fn clear_all(&self) -> Result<(), StoreError> {
        let _guard = self.lock_writes()?;
        self.medium.clear()?;
        self.cache.invalidate();
        info!("cleared all records");
        Ok(())
    }

    /// Validate a wire payload and replace the whole store with it.
    ///
    /// Nothing is written unless every element is well formed. Returns the
    /// number of records stored.
    pub fn bulk_replace(&self, payload: &Value) -> Result<usize, StoreError> {
        let records = parse_payload(payload)?;
        self.bulk_replace_records(records)
    }

    /// Replace the whole store with already-typed records.
    ///
    /// When two records share a date the later one wins.
    pub fn bulk_replace_records(&self, records: Vec<DayRecord>) -> Result<usize, StoreError> {
        let mut entries = Vec::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            check_record(record, i + 1)?;
            entries.push((record.date.clone(), encode_stored(record)?));
        }

        let _guard = self.lock_writes()?;
        self.medium.replace_all(entries)?;
        self.cache.invalidate();

        let stored = self.medium.scan_raw()?.len();
        info!("bulk replace stored {} records", stored);
        Ok(stored)
    }

    /// Parse a JSON document and bulk replace with it.
    pub fn import_json(&self, bytes: &[u8]) -> Result<usize, StoreError> {
        let records = parse_records_json(bytes)?;
        self.bulk_replace_records(records)
    }

    pub fn import_from_file(&self, path: impl AsRef<Path>) -> Result<usize, StoreError> {
        let bytes = fs::read(path)?;
        self.import_json(&bytes)
    }

    /// Deep copy of every record, ascending by date, without day numbers.
    pub fn export_all(&self) -> Result<Vec<DayRecord>, StoreError> {
        Ok(self
            .view()?
            .into_iter()
            .map(NumberedDay::into_record)
            .collect())
    }

    /// Pretty-printed record array, the same format `import_json` accepts.
    pub fn export_json(&self) -> Result<String, StoreError> {
        serde_json::to_string_pretty(&self.export_all()?)
            .map_err(|e| StoreError::Storage(format!("encode export: {}", e)))
    }

    pub fn export_to_file(&self, path: impl AsRef<Path>) -> Result<usize, StoreError> {
        let records = self.export_all()?;
        let json = serde_json::to_string_pretty(&records)
            .map_err(|e| StoreError::Storage(format!("encode export: {}", e)))?;
        fs::write(path, json)?;
        Ok(records.len())
    }
}

/// Shape rules every stored record must satisfy, so that whatever is
/// written can be read back. `position` is 1-based and only used in messages.
fn check_record(record: &DayRecord, position: usize) -> Result<(), StoreError> {
    if record.date.is_empty() || record.weekday.is_empty() {
        return Err(StoreError::Validation(format!(
            "record {}: missing or empty date/weekday",
            position
        )));
    }
    if let Some(i) = record.words.iter().position(|w| w.text.is_empty()) {
        return Err(StoreError::Validation(format!(
            "record {} ({}): word {} is empty",
            position,
            record.date,
            i + 1
        )));
    }
    Ok(())
}
