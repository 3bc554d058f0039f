//! Record media - the persistent byte storage under the [`crate::RecordStore`].
//!
//! A medium is a flat map from ISO date to an encoded record document. The
//! documents stay encoded so that older shapes can be read (and normalized)
//! without being rewritten.

mod file;
mod in_memory;

use crate::error::StoreError;

/// Abstract keyed document storage for day records.
pub trait RecordMedium: Send + Sync {
    /// Get the stored document for a date. Returns None if absent.
    fn get_raw(&self, date: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Insert or overwrite the document for a date.
    fn put_raw(&self, date: &str, bytes: Vec<u8>) -> Result<(), StoreError>;

    /// Remove the document for a date. Returns true if it existed.
    fn remove(&self, date: &str) -> Result<bool, StoreError>;

    /// Every stored document, in no particular order.
    fn scan_raw(&self) -> Result<Vec<Vec<u8>>, StoreError>;

    /// Remove every document.
    fn clear(&self) -> Result<(), StoreError>;

    /// Replace the full contents in one step. Either every entry is stored or
    /// the previous contents remain.
    fn replace_all(&self, entries: Vec<(String, Vec<u8>)>) -> Result<(), StoreError>;
}

pub use file::{FileMedium, FILE_FORMAT_VERSION};
pub use in_memory::InMemoryMedium;
