//! End-to-end sync scenarios against an in-memory workbook

mod common;

use std::sync::Arc;

use common::{status_tab, workbook, workbook_with_failing_tab};
use sheetsync_core::{
    Cell, FieldClassifier, HealthStatus, InMemorySource, JsonFilePersistence, RecordStore,
    SheetFetcher, SheetSyncConfig, SourceError, SyncDriver, SyncError, SyncOrchestrator,
};

#[tokio::test]
async fn test_status_sheet_classifies_into_three_buckets() {
    let source = InMemorySource::new().with_tab(status_tab());
    let sheet = SheetFetcher::new(&source, "A:Z")
        .fetch_sheet(Some("Status"))
        .await
        .unwrap();

    assert_eq!(sheet.records.len(), 3);
    assert_eq!(sheet.schema.columns, vec!["vendor", "support_status"]);

    let classifier = FieldClassifier::default();
    let buckets: Vec<_> = sheet
        .records
        .iter()
        .map(|r| {
            let vendor = r.text("vendor").unwrap().into_owned();
            let status = classifier.classify_status(&r.text("support_status").unwrap());
            (vendor, status)
        })
        .collect();
    assert_eq!(
        buckets,
        vec![
            ("Acme".to_string(), Some(HealthStatus::Ready)),
            ("Acme".to_string(), Some(HealthStatus::Blocked)),
            ("Beta Co".to_string(), Some(HealthStatus::InProgress)),
        ]
    );

    let store = RecordStore::default();
    let mut snapshot = sheetsync_core::Snapshot::new();
    snapshot.insert_sheet("Status", sheet);
    store.replace_snapshot(snapshot);

    assert_eq!(store.unique_values("vendor", Some("Status")), vec!["Acme", "Beta Co"]);

    let health = store.insights("Status", &classifier).health.unwrap();
    assert_eq!(health.ready, 1);
    assert_eq!(health.blocked, 1);
    assert_eq!(health.in_progress, 1);
    assert_eq!(health.unclassified, 0);
}

#[tokio::test]
async fn test_wip_tab_is_excluded_entirely() {
    let source = workbook();
    let snapshot = SyncOrchestrator::new(&source, "A:Z", "wip")
        .fetch_all_sheets()
        .await
        .unwrap();

    assert!(!snapshot.sheets.contains_key("Integrations WIP"));
    assert_eq!(snapshot.sheet_names(), vec!["Catalog", "Status"]);
}

#[tokio::test]
async fn test_failing_tab_yields_empty_sequence() {
    let source = workbook_with_failing_tab();
    let batch = SyncOrchestrator::new(&source, "A:Z", "wip")
        .sync_all()
        .await
        .unwrap();

    assert_eq!(batch.snapshot.sheet("Status").len(), 3);
    assert!(batch.snapshot.sheets.contains_key("Catalog"));
    assert!(batch.snapshot.sheet("Catalog").is_empty());
    assert_eq!(batch.failures.len(), 1);
    assert!(matches!(
        batch.failures[0].error,
        SourceError::Status { status: 500, .. }
    ));
}

#[tokio::test]
async fn test_all_cell_variants_survive_sync() {
    let source = workbook();
    let snapshot = SyncOrchestrator::new(&source, "A:Z", "wip")
        .fetch_all_sheets()
        .await
        .unwrap();
    let catalog = snapshot.sheet("Catalog");

    assert!(matches!(catalog[0].get("docs"), Some(Cell::Link { url, .. }) if url == "https://docs.example.com/widget"));
    assert!(matches!(catalog[1].get("docs"), Some(Cell::RichText { .. })));
    assert_eq!(catalog[1].text("docs").unwrap(), "See KB article");
    assert!(matches!(catalog[1].get("certified"), Some(Cell::Annotated { .. })));
    assert_eq!(catalog[0].get("product_name"), Some(&Cell::plain("Widget")));

    let notes = &snapshot.schema("Catalog").unwrap().header_notes;
    assert_eq!(notes.get("certified").map(String::as_str), Some("Signed off by QA"));
}

#[tokio::test]
async fn test_driver_persists_and_restart_restores() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("storage-data.json");

    let store = Arc::new(RecordStore::new(Some(Arc::new(JsonFilePersistence::new(&path)))));
    let driver = SyncDriver::new(Arc::new(workbook()), store, SheetSyncConfig::default());
    let report = driver.trigger_sync().await.unwrap();
    assert_eq!(report.record_count, 5);
    assert_eq!(report.excluded_sheets, vec!["Integrations WIP"]);
    assert!(path.exists());

    let restarted = RecordStore::new(Some(Arc::new(JsonFilePersistence::new(&path))));
    assert!(restarted.load_from_persistence());
    assert_eq!(restarted.stats().total_records, 5);
    assert_eq!(restarted.last_sync_time(), report.synced_at);
}

#[tokio::test]
async fn test_enumeration_failure_surfaces_to_driver() {
    let source = workbook().with_listing_failure(SourceError::RequestFailed("dns".into()));
    let store = Arc::new(RecordStore::default());
    let driver = SyncDriver::new(Arc::new(source), store.clone(), SheetSyncConfig::default());

    let err = driver.trigger_sync().await.unwrap_err();
    assert!(matches!(err, SyncError::Source(SourceError::RequestFailed(_))));
    assert!(store.current().is_empty());
    assert!(store.last_sync_time().is_none());
}
