//! Integration tests for startup reconciliation and manual backups.

mod backup;

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use dayx_core::{
    CloudError, DoneReason, InMemoryCloud, InMemoryMedium, ReconcileState, RecordStore,
    RecordingObserver, Settings, StartupReconciler,
};

const PAYLOAD: &str = r#"[
    { "date": "2024-01-01", "weekday": "Mon", "words": [{ "text": "alpha", "color": "green" }] },
    { "date": "2024-01-02", "weekday": "Tue", "words": ["beta", "gamma"], "review_count": 2 }
]"#;

fn local_store() -> Arc<RecordStore<InMemoryMedium>> {
    let store = Arc::new(RecordStore::new(InMemoryMedium::new()));
    store.add_word("2023-06-01", "Thu", "local").unwrap();
    store
}

fn expected_records() -> Vec<dayx_core::DayRecord> {
    let reference = RecordStore::new(InMemoryMedium::new());
    reference.import_json(PAYLOAD.as_bytes()).unwrap();
    reference.export_all().unwrap()
}

// =============================================================================
// Retry
// =============================================================================

#[tokio::test]
async fn two_transient_failures_then_success() {
    let cloud = InMemoryCloud::new();
    cloud.insert("2024-01-02-080000.json", Utc::now(), PAYLOAD);
    cloud.fail_next(2, CloudError::Network("timeout".into()));

    let store = local_store();
    let reconciler = StartupReconciler::new(store.clone(), cloud.clone())
        .with_backoff(Duration::from_millis(5));

    let report = reconciler.run().await;
    assert_eq!(report.state, ReconcileState::Done(DoneReason::Imported(2)));
    assert_eq!(report.attempts, 3);
    assert_eq!(cloud.list_calls(), 3);
    assert_eq!(store.export_all().unwrap(), expected_records());
}

#[tokio::test]
async fn download_failure_restarts_from_listing() {
    let cloud = InMemoryCloud::new();
    let old = cloud.insert("old.json", Utc.timestamp_opt(1_000, 0).unwrap(), "[]");
    let newest = cloud.insert("new.json", Utc.timestamp_opt(2_000, 0).unwrap(), PAYLOAD);
    cloud.insert("new.txt", Utc.timestamp_opt(3_000, 0).unwrap(), "not a backup");

    let store = local_store();
    let observer = RecordingObserver::new();
    let reconciler = StartupReconciler::new(store.clone(), cloud.clone())
        .with_observer(observer.clone())
        .with_backoff(Duration::from_millis(5));

    cloud.fail_next_downloads(1, CloudError::Network("reset".into()));

    let report = reconciler.run().await;
    assert_eq!(report.backup.as_ref().map(|b| &b.id), Some(&newest.id));
    assert_ne!(newest.id, old.id);
    assert_eq!(report.imported(), Some(2));
    assert_eq!(report.attempts, 2);
    assert_eq!((cloud.list_calls(), cloud.download_calls()), (2, 2));
    assert!(observer.events().contains(&"data-replaced 2".to_string()));
}

#[tokio::test]
async fn edit_made_during_sync_is_overwritten_by_import() {
    let cloud = InMemoryCloud::new();
    cloud.insert("b.json", Utc::now(), PAYLOAD);

    let store = local_store();
    let editor = store.clone();
    cloud.on_download(move || {
        editor.add_word("2024-07-01", "Mon", "mid-sync").unwrap();
    });

    let report = StartupReconciler::new(store.clone(), cloud.clone())
        .run()
        .await;

    assert_eq!(report.imported(), Some(2));
    assert_eq!(store.export_all().unwrap(), expected_records());
    assert!(store.find_word("mid-sync").unwrap().is_none());
    assert!(store.get_by_date("2024-07-01").unwrap().is_none());
}

// =============================================================================
// Cancellation
// =============================================================================

#[tokio::test]
async fn cancel_during_download_leaves_store_unchanged() {
    let cloud = InMemoryCloud::new();
    cloud.insert("b.json", Utc::now(), PAYLOAD);

    let store = local_store();
    let before = store.export_all().unwrap();
    let observer = RecordingObserver::new();
    let reconciler = StartupReconciler::new(store.clone(), cloud.clone())
        .with_observer(observer.clone());

    let token = reconciler.cancel_token();
    cloud.on_download(move || token.cancel());

    let report = reconciler.run().await;
    assert_eq!(report.state, ReconcileState::Cancelled);
    assert_eq!(cloud.download_calls(), 1);
    assert_eq!(store.export_all().unwrap(), before);

    let events = observer.events();
    assert!(events.contains(&"state cancelled".to_string()));
    assert!(!events.iter().any(|e| e.starts_with("data-replaced")));
    assert_eq!(events.last().map(String::as_str), Some("unfreeze"));
}

// =============================================================================
// Settings
// =============================================================================

#[tokio::test]
async fn default_settings_skip_startup_sync() {
    let cloud = InMemoryCloud::new();
    cloud.insert("b.json", Utc::now(), PAYLOAD);

    let store = local_store();
    let settings = Settings::default();
    let report = StartupReconciler::new(store.clone(), cloud.clone())
        .with_enabled(settings.sync_on_startup)
        .run()
        .await;

    assert_eq!(report.state, ReconcileState::Done(DoneReason::Disabled));
    assert_eq!(cloud.list_calls(), 0);
    assert_eq!(store.stats().unwrap().total_days, 1);
}
