//! Cloud backup contract.
//!
//! The sync engine only needs four remote calls plus sign-out. Backups are
//! plain record-array JSON documents; anything not named `*.json` is not a
//! backup and never shows up in [`CloudStorage::list_backups`].

mod in_memory;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use in_memory::InMemoryCloud;

/// File-name suffix every backup object carries.
pub const BACKUP_SUFFIX: &str = ".json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloudError {
    /// Not signed in, or the session was rejected.
    Auth(String),
    /// Transport failure; worth retrying.
    Network(String),
    /// The requested object does not exist.
    NotFound(String),
}

impl fmt::Display for CloudError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloudError::Auth(msg) => write!(f, "cloud auth error: {}", msg),
            CloudError::Network(msg) => write!(f, "cloud network error: {}", msg),
            CloudError::NotFound(id) => write!(f, "cloud object not found: {}", id),
        }
    }
}

impl std::error::Error for CloudError {}

/// Metadata for one stored backup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupObject {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub size_bytes: u64,
}

/// Remote object storage holding backups.
#[allow(async_fn_in_trait)]
pub trait CloudStorage {
    async fn is_authenticated(&self) -> Result<bool, CloudError>;

    /// Backups only (`*.json`), in no particular order.
    async fn list_backups(&self) -> Result<Vec<BackupObject>, CloudError>;

    async fn upload(&self, name: &str, bytes: Vec<u8>) -> Result<BackupObject, CloudError>;

    async fn download(&self, id: &str) -> Result<Vec<u8>, CloudError>;

    async fn sign_out(&self) -> Result<(), CloudError>;
}

pub fn is_backup_name(name: &str) -> bool {
    name.ends_with(BACKUP_SUFFIX)
}

/// Most recent backup by `created_at`; on a tie the earliest listed wins.
pub fn newest_backup(backups: &[BackupObject]) -> Option<&BackupObject> {
    backups.iter().fold(None, |best: Option<&BackupObject>, candidate| match best {
        Some(current) if current.created_at >= candidate.created_at => Some(current),
        _ => Some(candidate),
    })
}

/// Sort newest first, keeping listing order among equal timestamps.
pub fn sort_newest_first(backups: &mut [BackupObject]) {
    backups.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
