mod cache;
mod cloud;
mod config;
mod error;
mod medium;
mod query;
mod record;
mod sequencer;
mod store;
mod sync;

pub use cache::ReadCache;
pub use cloud::{
    is_backup_name, newest_backup, sort_newest_first, BackupObject, CloudError, CloudStorage,
    InMemoryCloud, BACKUP_SUFFIX,
};
pub use config::{parse_offsets, ConfigError, Settings, DEFAULT_COLUMNS_PER_ROW, DEFAULT_OFFSETS};
pub use error::StoreError;
pub use medium::{FileMedium, InMemoryMedium, RecordMedium, FILE_FORMAT_VERSION};
pub use query::{days_at_offsets, group_matches, locate_word, Stats, WordLocation, WordOccurrences};
pub use record::{weekday_for, DayRecord, NumberedDay, WordColor, WordEntry};
pub use sequencer::DerivedSequencer;
pub use store::{DayChange, RecordStore};
pub use sync::{
    default_backup_name, BackupService, CancelToken, DoneReason, NoopObserver, ReconcileReport,
    ReconcileState, RecordingObserver, StartupReconciler, SyncError, SyncObserver,
    DEFAULT_BACKOFF, DEFAULT_MAX_ATTEMPTS,
};

#[cfg(feature = "emitter")]
pub use sync::EmitterObserver;

// Re-export the EventEmitter so listeners can be registered without a direct dependency
#[cfg(feature = "emitter")]
pub use event_emitter_rs::EventEmitter;
