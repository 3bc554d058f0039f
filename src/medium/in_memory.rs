//! InMemoryMedium - HashMap-backed medium for tests and ephemeral sessions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use super::RecordMedium;
use crate::error::StoreError;

/// In-memory medium backed by a HashMap.
///
/// Clone-friendly via Arc: clones share the same documents and the same
/// availability switch.
#[derive(Clone)]
pub struct InMemoryMedium {
    storage: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    available: Arc<AtomicBool>,
}

impl Default for InMemoryMedium {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMedium {
    pub fn new() -> Self {
        Self {
            storage: Arc::new(RwLock::new(HashMap::new())),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Simulate the medium going away (quota, revoked permission, closed
    /// connection). Every call fails with `StoreError::Storage` while unset.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.storage.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Storage("medium unavailable".into()))
        }
    }
}

impl RecordMedium for InMemoryMedium {
    fn get_raw(&self, date: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.check_available()?;
        let storage = self
            .storage
            .read()
            .map_err(|_| StoreError::poisoned("medium read"))?;
        Ok(storage.get(date).cloned())
    }

    fn put_raw(&self, date: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        self.check_available()?;
        let mut storage = self
            .storage
            .write()
            .map_err(|_| StoreError::poisoned("medium write"))?;
        storage.insert(date.to_string(), bytes);
        Ok(())
    }

    fn remove(&self, date: &str) -> Result<bool, StoreError> {
        self.check_available()?;
        let mut storage = self
            .storage
            .write()
            .map_err(|_| StoreError::poisoned("medium write"))?;
        Ok(storage.remove(date).is_some())
    }

    fn scan_raw(&self) -> Result<Vec<Vec<u8>>, StoreError> {
        self.check_available()?;
        let storage = self
            .storage
            .read()
            .map_err(|_| StoreError::poisoned("medium read"))?;
        Ok(storage.values().cloned().collect())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.check_available()?;
        let mut storage = self
            .storage
            .write()
            .map_err(|_| StoreError::poisoned("medium write"))?;
        storage.clear();
        Ok(())
    }

    fn replace_all(&self, entries: Vec<(String, Vec<u8>)>) -> Result<(), StoreError> {
        self.check_available()?;
        let replacement: HashMap<String, Vec<u8>> = entries.into_iter().collect();
        let mut storage = self
            .storage
            .write()
            .map_err(|_| StoreError::poisoned("medium write"))?;
        *storage = replacement;
        Ok(())
    }
}
