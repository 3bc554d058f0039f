//! The record-array wire format shared by storage, backups and file import.
//!
//! Words may arrive in the legacy bare-string shape. They are normalized to
//! [`WordEntry`] here and nowhere else, so nothing past this boundary ever
//! sees the old shape.

use serde::Deserialize;
use serde_json::Value;

use super::{DayRecord, WordColor, WordEntry};
use crate::error::StoreError;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawWord {
    Bare(String),
    Entry {
        text: String,
        #[serde(default)]
        color: Option<String>,
    },
}

impl RawWord {
    fn normalize(self) -> WordEntry {
        match self {
            RawWord::Bare(text) => WordEntry::new(text),
            RawWord::Entry { text, color } => WordEntry {
                text,
                color: color
                    .as_deref()
                    .and_then(WordColor::parse)
                    .unwrap_or_default(),
            },
        }
    }
}

fn required_str<'a>(
    obj: &'a serde_json::Map<String, Value>,
    field: &str,
    position: usize,
) -> Result<&'a str, StoreError> {
    match obj.get(field).and_then(Value::as_str) {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Err(StoreError::Validation(format!(
            "record {}: missing or empty {}",
            position, field
        ))),
    }
}

/// Normalize one wire element. `position` is 1-based and only used in messages.
fn record_from_value(value: &Value, position: usize) -> Result<DayRecord, StoreError> {
    let obj = value.as_object().ok_or_else(|| {
        StoreError::Validation(format!("record {}: expected an object", position))
    })?;

    let date = required_str(obj, "date", position)?;
    let weekday = required_str(obj, "weekday", position)?;
    let raw_words = obj.get("words").and_then(Value::as_array).ok_or_else(|| {
        StoreError::Validation(format!("record {} ({}): words must be an array", position, date))
    })?;

    let mut words = Vec::with_capacity(raw_words.len());
    for (i, raw) in raw_words.iter().enumerate() {
        let entry = RawWord::deserialize(raw)
            .map_err(|_| {
                StoreError::Validation(format!(
                    "record {} ({}): word {} has no text",
                    position,
                    date,
                    i + 1
                ))
            })?
            .normalize();
        if entry.text.is_empty() {
            return Err(StoreError::Validation(format!(
                "record {} ({}): word {} is empty",
                position,
                date,
                i + 1
            )));
        }
        words.push(entry);
    }

    let review_count = obj
        .get("review_count")
        .and_then(Value::as_u64)
        .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
        .unwrap_or(0);

    Ok(DayRecord {
        date: date.to_string(),
        weekday: weekday.to_string(),
        words,
        review_count,
    })
}

/// Validate an entire payload before anything is written.
pub(crate) fn parse_payload(payload: &Value) -> Result<Vec<DayRecord>, StoreError> {
    let items = payload
        .as_array()
        .ok_or_else(|| StoreError::Validation("payload must be an array of records".into()))?;

    items
        .iter()
        .enumerate()
        .map(|(i, item)| record_from_value(item, i + 1))
        .collect()
}

pub(crate) fn parse_records_json(bytes: &[u8]) -> Result<Vec<DayRecord>, StoreError> {
    let payload: Value = serde_json::from_slice(bytes)
        .map_err(|e| StoreError::Validation(format!("not valid JSON: {}", e)))?;
    parse_payload(&payload)
}

pub(crate) fn encode_stored(record: &DayRecord) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(record).map_err(|e| StoreError::Storage(format!("encode record: {}", e)))
}

/// Decode a stored document. Legacy words are normalized in the returned
/// value only; the stored bytes are left as they are.
pub(crate) fn decode_stored(bytes: &[u8]) -> Result<DayRecord, StoreError> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| StoreError::Storage(format!("corrupt record: {}", e)))?;
    record_from_value(&value, 1).map_err(|e| StoreError::Storage(format!("corrupt record: {}", e)))
}
