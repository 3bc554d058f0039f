//! StartupReconciler - replaces local data with the newest cloud backup.
//!
//! Runs once at startup as a single loop over [`ReconcileState`]:
//!
//! ```text
//! Idle -> CheckingAuth -> FetchingList -> Downloading -> Importing -> Done
//!                              ^______________ retry ______________|
//! ```
//!
//! Failures while listing, downloading or importing are retried from
//! `FetchingList` after a fixed backoff, up to `max_attempts` attempts in
//! total, then the run ends in `Failed`. A [`CancelToken`] is checked at
//! every step boundary and during the backoff wait; a cancelled run never
//! touches the store.
//!
//! Local edits made while the run is in flight are overwritten by the import.
//!
//! ## Example
//!
//! ```ignore
//! let reconciler = StartupReconciler::new(store.clone(), cloud)
//!     .with_enabled(settings.sync_on_startup)
//!     .with_observer(observer)
//!     .with_ready_signal(ready_rx);
//! let cancel = reconciler.cancel_token();
//! let report = reconciler.run().await;
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::{watch, Notify};

use super::observer::{NoopObserver, SyncObserver};
use super::SyncError;
use crate::cloud::{newest_backup, BackupObject, CloudStorage};
use crate::medium::RecordMedium;
use crate::store::RecordStore;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

/// Why a run finished without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoneReason {
    /// Startup sync is turned off; nothing ran.
    Disabled,
    NotAuthenticated,
    NoBackups,
    /// The store now holds this many days from the backup.
    Imported(usize),
}

impl fmt::Display for DoneReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DoneReason::Disabled => write!(f, "disabled"),
            DoneReason::NotAuthenticated => write!(f, "not-authenticated"),
            DoneReason::NoBackups => write!(f, "no-backups"),
            DoneReason::Imported(count) => write!(f, "imported {}", count),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileState {
    Idle,
    CheckingAuth,
    FetchingList,
    Downloading,
    Importing,
    Done(DoneReason),
    Cancelled,
    Failed,
}

impl ReconcileState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReconcileState::Done(_) | ReconcileState::Cancelled | ReconcileState::Failed
        )
    }
}

impl fmt::Display for ReconcileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileState::Idle => write!(f, "idle"),
            ReconcileState::CheckingAuth => write!(f, "checking-auth"),
            ReconcileState::FetchingList => write!(f, "fetching-list"),
            ReconcileState::Downloading => write!(f, "downloading"),
            ReconcileState::Importing => write!(f, "importing"),
            ReconcileState::Done(reason) => write!(f, "done({})", reason),
            ReconcileState::Cancelled => write!(f, "cancelled"),
            ReconcileState::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Cooperative cancellation flag. Clones share the same flag.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`CancelToken::cancel`] has been called.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Outcome of one reconciler run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub state: ReconcileState,
    /// List/download/import attempts started.
    pub attempts: u32,
    /// The backup selected on the last successful listing.
    pub backup: Option<BackupObject>,
    pub last_error: Option<SyncError>,
}

impl ReconcileReport {
    fn new() -> Self {
        Self {
            state: ReconcileState::Idle,
            attempts: 0,
            backup: None,
            last_error: None,
        }
    }

    pub fn imported(&self) -> Option<usize> {
        match self.state {
            ReconcileState::Done(DoneReason::Imported(count)) => Some(count),
            _ => None,
        }
    }
}

pub struct StartupReconciler<M, C> {
    store: Arc<RecordStore<M>>,
    cloud: C,
    observer: Arc<dyn SyncObserver>,
    cancel: CancelToken,
    ready: Option<watch::Receiver<bool>>,
    enabled: bool,
    max_attempts: u32,
    backoff: Duration,
}

impl<M, C> StartupReconciler<M, C> {
    pub fn new(store: Arc<RecordStore<M>>, cloud: C) -> Self {
        Self {
            store,
            cloud,
            observer: Arc::new(NoopObserver),
            cancel: CancelToken::new(),
            ready: None,
            enabled: true,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
        }
    }

    /// Whether the run does anything at all (`Settings::sync_on_startup`).
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_observer(mut self, observer: impl SyncObserver + 'static) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    pub fn with_shared_observer(mut self, observer: Arc<dyn SyncObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Hold back `data_replaced` until this channel reads `true`.
    pub fn with_ready_signal(mut self, ready: watch::Receiver<bool>) -> Self {
        self.ready = Some(ready);
        self
    }

    /// Total attempts before giving up. Values below 1 are treated as 1.
    pub fn with_max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = max.max(1);
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// A handle that cancels this reconciler's run.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn store(&self) -> &Arc<RecordStore<M>> {
        &self.store
    }
}

impl<M: RecordMedium, C: CloudStorage> StartupReconciler<M, C> {
    pub async fn run(&self) -> ReconcileReport {
        let mut report = ReconcileReport::new();
        if !self.enabled {
            debug!("startup sync disabled");
            report.state = ReconcileState::Done(DoneReason::Disabled);
            return report;
        }

        self.observer.freeze();
        let mut state = self.enter(ReconcileState::CheckingAuth);
        let mut chosen: Option<String> = None;
        let mut payload: Option<Vec<u8>> = None;

        while !state.is_terminal() {
            if self.cancel.is_cancelled() {
                state = self.enter(ReconcileState::Cancelled);
                break;
            }

            let next = match state {
                ReconcileState::CheckingAuth => self.check_auth().await,
                ReconcileState::FetchingList => {
                    report.attempts += 1;
                    match self.cloud.list_backups().await {
                        Ok(backups) => match newest_backup(&backups) {
                            Some(backup) => {
                                debug!("newest backup is {} ({})", backup.name, backup.created_at);
                                chosen = Some(backup.id.clone());
                                report.backup = Some(backup.clone());
                                ReconcileState::Downloading
                            }
                            None => ReconcileState::Done(DoneReason::NoBackups),
                        },
                        Err(err) => self.retry(&mut report, err.into()).await,
                    }
                }
                ReconcileState::Downloading => match &chosen {
                    Some(id) => match self.cloud.download(id).await {
                        Ok(bytes) => {
                            payload = Some(bytes);
                            ReconcileState::Importing
                        }
                        Err(err) => self.retry(&mut report, err.into()).await,
                    },
                    None => ReconcileState::FetchingList,
                },
                ReconcileState::Importing => match payload.take() {
                    Some(bytes) => match self.store.import_json(&bytes) {
                        Ok(count) => {
                            self.announce(count).await;
                            ReconcileState::Done(DoneReason::Imported(count))
                        }
                        Err(err) => self.retry(&mut report, err.into()).await,
                    },
                    None => ReconcileState::FetchingList,
                },
                other => other,
            };
            state = self.enter(next);
        }

        self.observer.unfreeze();
        report.state = state;
        report
    }

    fn enter(&self, state: ReconcileState) -> ReconcileState {
        info!("startup sync: {}", state);
        self.observer.transition(&state);
        state
    }

    async fn check_auth(&self) -> ReconcileState {
        match self.cloud.is_authenticated().await {
            Ok(true) => ReconcileState::FetchingList,
            Ok(false) => ReconcileState::Done(DoneReason::NotAuthenticated),
            Err(err) => {
                warn!("auth check failed, treating as signed out: {}", err);
                ReconcileState::Done(DoneReason::NotAuthenticated)
            }
        }
    }

    async fn retry(&self, report: &mut ReconcileReport, err: SyncError) -> ReconcileState {
        if report.attempts >= self.max_attempts {
            warn!(
                "startup sync giving up after {} attempts: {}",
                report.attempts, err
            );
            report.last_error = Some(err);
            return ReconcileState::Failed;
        }

        warn!(
            "startup sync attempt {}/{} failed: {}; retrying in {:?}",
            report.attempts, self.max_attempts, err, self.backoff
        );
        report.last_error = Some(err);
        tokio::select! {
            _ = self.cancel.cancelled() => ReconcileState::Cancelled,
            _ = tokio::time::sleep(self.backoff) => ReconcileState::FetchingList,
        }
    }

    async fn announce(&self, count: usize) {
        if let Some(ready) = &self.ready {
            let mut ready = ready.clone();
            if ready.wait_for(|r| *r).await.is_err() {
                debug!("ready signal dropped before it was set; not announcing import");
                return;
            }
        }
        self.observer.data_replaced(count);
    }
}
