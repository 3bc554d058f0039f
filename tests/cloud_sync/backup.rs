use std::sync::Arc;

use dayx_core::{
    BackupService, CloudError, InMemoryCloud, InMemoryMedium, RecordStore, SyncError,
};

fn service() -> BackupService<InMemoryMedium, InMemoryCloud> {
    let store = Arc::new(RecordStore::new(InMemoryMedium::new()));
    BackupService::new(store, InMemoryCloud::new())
}

#[tokio::test]
async fn backup_then_restore_into_another_store() {
    let source = Arc::new(RecordStore::new(InMemoryMedium::new()));
    source.add_word("2024-01-01", "Mon", "alpha").unwrap();
    source.add_word("2024-01-03", "Wed", "gamma").unwrap();

    let cloud = InMemoryCloud::new();
    let uploader = BackupService::new(source.clone(), cloud.clone());
    let backup = uploader.backup_now(None).await.unwrap();
    assert!(backup.name.ends_with(".json"));

    let target = Arc::new(RecordStore::new(InMemoryMedium::new()));
    target.add_word("2030-01-01", "Tue", "stale").unwrap();
    let restorer = BackupService::new(target.clone(), cloud);

    assert_eq!(restorer.restore(&backup.id).await.unwrap(), 2);
    assert_eq!(target.export_all().unwrap(), source.export_all().unwrap());
}

#[tokio::test]
async fn list_is_newest_first() {
    let service = service();
    let first = service.backup_now(Some("first")).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = service.backup_now(Some("second")).await.unwrap();

    let names: Vec<String> = service
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|b| b.name)
        .collect();
    assert_eq!(names, vec![second.name, first.name]);
}

#[tokio::test]
async fn restoring_garbage_is_a_payload_error() {
    let service = service();
    let bad = service
        .cloud()
        .insert("bad.json", chrono::Utc::now(), "{ not json");
    let err = service.restore(&bad.id).await.unwrap_err();
    assert!(matches!(err, SyncError::Payload(_)));
}

#[tokio::test]
async fn sign_out_blocks_further_backups() {
    let service = service();
    service.sign_out().await.unwrap();
    assert!(matches!(
        service.backup_now(None).await,
        Err(SyncError::Cloud(CloudError::Auth(_)))
    ));
}
