use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use log::info;

use super::SyncError;
use crate::cloud::{sort_newest_first, BackupObject, CloudError, CloudStorage, BACKUP_SUFFIX};
use crate::medium::RecordMedium;
use crate::store::RecordStore;

/// `YYYY-MM-DD-HHMMSS.json` in the clock's own zone.
pub fn default_backup_name<Tz>(now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    format!("{}{}", now.format("%Y-%m-%d-%H%M%S"), BACKUP_SUFFIX)
}

/// User-initiated backup and restore. Errors surface immediately; nothing
/// here retries.
pub struct BackupService<M, C> {
    store: Arc<RecordStore<M>>,
    cloud: C,
}

impl<M: RecordMedium, C: CloudStorage> BackupService<M, C> {
    pub fn new(store: Arc<RecordStore<M>>, cloud: C) -> Self {
        Self { store, cloud }
    }

    pub fn cloud(&self) -> &C {
        &self.cloud
    }

    async fn require_auth(&self) -> Result<(), SyncError> {
        if self.cloud.is_authenticated().await? {
            Ok(())
        } else {
            Err(CloudError::Auth("not signed in".into()).into())
        }
    }

    /// Upload the full store as a pretty JSON record array.
    ///
    /// `name` defaults to [`default_backup_name`] for the current time and
    /// gets a `.json` suffix when missing.
    pub async fn backup_now(&self, name: Option<&str>) -> Result<BackupObject, SyncError> {
        self.require_auth().await?;

        let mut name = match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => name.to_string(),
            None => default_backup_name(&Utc::now()),
        };
        if !name.ends_with(BACKUP_SUFFIX) {
            name.push_str(BACKUP_SUFFIX);
        }

        let json = self.store.export_json()?;
        let backup = self.cloud.upload(&name, json.into_bytes()).await?;
        info!("uploaded backup {} ({} bytes)", backup.name, backup.size_bytes);
        Ok(backup)
    }

    /// Available backups, newest first.
    pub async fn list(&self) -> Result<Vec<BackupObject>, SyncError> {
        let mut backups = self.cloud.list_backups().await?;
        sort_newest_first(&mut backups);
        Ok(backups)
    }

    /// Replace the store with backup `id`. Returns the number of days restored.
    pub async fn restore(&self, id: &str) -> Result<usize, SyncError> {
        let bytes = self.cloud.download(id).await?;
        let count = self.store.import_json(&bytes)?;
        info!("restored {} days from backup {}", count, id);
        Ok(count)
    }

    pub async fn sign_out(&self) -> Result<(), SyncError> {
        self.cloud.sign_out().await?;
        Ok(())
    }
}
