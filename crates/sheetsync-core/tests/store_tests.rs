//! Record store query properties

mod common;

use std::collections::BTreeMap;
use std::sync::Arc;

use rstest::{fixture, rstest};
use sheetsync_core::{
    JsonFilePersistence, RecordStore, SnapshotPersistence, SyncOrchestrator,
};

#[fixture]
fn store() -> RecordStore {
    let source = common::workbook();
    let snapshot = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(SyncOrchestrator::new(&source, "A:Z", "wip").fetch_all_sheets())
        .unwrap();
    let store = RecordStore::default();
    store.replace_snapshot(snapshot);
    store
}

#[rstest]
fn test_blank_search_is_identity(store: RecordStore) {
    for query in ["", "   ", "\t"] {
        let hits = store.search(query, Some("Status")).into_sheet().unwrap();
        assert_eq!(hits, store.get_sheet("Status"));
    }
    let all = store.search("", None).into_sheets().unwrap();
    assert_eq!(all, store.get_all_sheets());
}

#[rstest]
#[case("acme")]
#[case("SUPPORTED")]
#[case("kb.example")]
#[case("Tech preview")]
#[case("nothing matches this")]
fn test_search_ignores_case(store: RecordStore, #[case] query: &str) {
    let lower = store.search(&query.to_lowercase(), None);
    let upper = store.search(&query.to_uppercase(), None);
    assert_eq!(lower, upper);
}

#[rstest]
#[case("acme", 2)]
#[case("supported", 2)]
#[case("kb.example.com", 1)]
#[case("docs.example.com/widget", 1)]
fn test_search_counts(store: RecordStore, #[case] query: &str, #[case] expected: usize) {
    assert_eq!(store.search(query, None).total(), expected);
}

#[rstest]
fn test_empty_filter_is_identity(store: RecordStore) {
    let filtered = store.filter(&BTreeMap::new(), Some("Status")).into_sheet().unwrap();
    assert_eq!(filtered, store.get_sheet("Status"));
}

#[rstest]
fn test_filter_requires_every_field(store: RecordStore) {
    let filters = BTreeMap::from([
        ("vendor".to_string(), "ACME".to_string()),
        ("support_status".to_string(), "not".to_string()),
    ]);
    let hits = store.filter(&filters, Some("Status")).into_sheet().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, 2);
}

#[rstest]
fn test_filter_across_sheets_skips_sheets_without_field(store: RecordStore) {
    let filters = BTreeMap::from([("vendor".to_string(), "beta".to_string())]);
    let sheets = store.filter(&filters, None).into_sheets().unwrap();
    assert_eq!(sheets["Status"].len(), 1);
    assert!(sheets["Catalog"].is_empty());
}

#[rstest]
#[case("vendor", Some("Status"))]
#[case("support_status", None)]
#[case("product_name", None)]
#[case("certified", Some("Catalog"))]
#[case("missing", None)]
fn test_unique_values_sorted_without_blanks(
    store: RecordStore,
    #[case] field: &str,
    #[case] sheet: Option<&str>,
) {
    let values = store.unique_values(field, sheet);
    assert!(values.iter().all(|v| !v.trim().is_empty()));
    assert!(values.windows(2).all(|w| w[0] < w[1]));
}

#[rstest]
fn test_unknown_sheet_is_empty_not_error(store: RecordStore) {
    assert!(store.get_sheet("Nope").is_empty());
    assert_eq!(store.search("acme", Some("Nope")).total(), 0);
    assert!(store.unique_values("vendor", Some("Nope")).is_empty());
    assert!(store.header_notes("Nope").is_empty());
}

#[rstest]
fn test_stats_and_sheet_names(store: RecordStore) {
    let stats = store.stats();
    assert_eq!(stats.total_records, 5);
    assert_eq!(stats.sheet_count, 2);
    assert_eq!(store.sheet_names(), vec!["Catalog", "Status"]);
    assert!(stats.data_fields.contains(&"support_status".to_string()));
    assert!(stats.data_fields.contains(&"product_name".to_string()));
}

#[rstest]
fn test_snapshot_file_round_trip(store: RecordStore) {
    let dir = tempfile::tempdir().unwrap();
    let persistence = JsonFilePersistence::new(dir.path().join("data/storage-data.json"));
    let snapshot = store.current();
    persistence.save(&snapshot).unwrap();

    let loaded = persistence.load().unwrap().unwrap();
    assert_eq!(&loaded, snapshot.as_ref());
}

#[rstest]
fn test_corrupt_snapshot_file_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("storage-data.json");
    std::fs::write(&path, "not json at all").unwrap();

    let store = RecordStore::new(Some(Arc::new(JsonFilePersistence::new(&path))));
    assert!(!store.load_from_persistence());
    assert!(store.current().is_empty());
}
