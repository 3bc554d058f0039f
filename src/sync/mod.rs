//! Cloud synchronization: one-shot backup/restore and the startup reconciler.

mod backup;
mod observer;
mod reconciler;

use std::fmt;

use crate::cloud::CloudError;
use crate::error::StoreError;

pub use backup::{default_backup_name, BackupService};
#[cfg(feature = "emitter")]
pub use observer::EmitterObserver;
pub use observer::{NoopObserver, RecordingObserver, SyncObserver};
pub use reconciler::{
    CancelToken, DoneReason, ReconcileReport, ReconcileState, StartupReconciler,
    DEFAULT_BACKOFF, DEFAULT_MAX_ATTEMPTS,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    Cloud(CloudError),
    Store(StoreError),
    /// Downloaded bytes are not a usable record array.
    Payload(String),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::Cloud(err) => write!(f, "{}", err),
            SyncError::Store(err) => write!(f, "{}", err),
            SyncError::Payload(msg) => write!(f, "invalid backup payload: {}", msg),
        }
    }
}

impl std::error::Error for SyncError {}

impl From<CloudError> for SyncError {
    fn from(err: CloudError) -> Self {
        SyncError::Cloud(err)
    }
}

impl From<StoreError> for SyncError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(msg) => SyncError::Payload(msg),
            other => SyncError::Store(other),
        }
    }
}
