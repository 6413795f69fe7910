//! SheetSync Server - Record store API
//!
//! HTTP shell over the sync driver and record store consumed by the
//! dashboard.

pub mod http;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use tokio::task::JoinHandle;

use sheetsync_core::{
    FieldClassifier, RecordStore, SheetSource, SheetSyncConfig, SnapshotPersistence, SourceError,
    SyncDriver, UnavailableSource,
};

/// Shared application state
pub struct AppState {
    pub store: Arc<RecordStore>,
    pub driver: Arc<SyncDriver>,
    pub classifier: FieldClassifier,
}

impl AppState {
    /// Build state around a driver; the store is the driver's own.
    pub fn new(driver: Arc<SyncDriver>) -> Self {
        let classifier = FieldClassifier::new(driver.config().classifier.clone());
        Self {
            store: driver.store().clone(),
            driver,
            classifier,
        }
    }
}

/// Running service: shared state plus the periodic sync task, if one was
/// scheduled.
pub struct Service {
    pub state: Arc<AppState>,
    pub scheduler: Option<JoinHandle<()>>,
}

/// Restore the last snapshot and wire the sync driver.
///
/// When the source could not be built the stored data is still served;
/// startup and periodic syncs are skipped and a manual sync reports the
/// source error.
pub async fn start(
    config: SheetSyncConfig,
    source: Result<Arc<dyn SheetSource>, SourceError>,
    persistence: Option<Arc<dyn SnapshotPersistence>>,
) -> Service {
    let store = Arc::new(RecordStore::new(persistence));
    store.load_from_persistence();

    let (source, configured): (Arc<dyn SheetSource>, bool) = match source {
        Ok(source) => (source, true),
        Err(e) => {
            tracing::warn!("Sheet source unavailable, serving stored data only: {}", e);
            (Arc::new(UnavailableSource::new(e)), false)
        }
    };

    let sync_on_startup = configured && config.sync.sync_on_startup;
    let driver = Arc::new(SyncDriver::new(source, store, config));

    if sync_on_startup {
        if let Err(e) = driver.trigger_sync().await {
            tracing::warn!("Initial sync failed, serving stored data: {}", e);
        }
    }
    let scheduler = configured.then(|| driver.clone().spawn_periodic());

    Service {
        state: Arc::new(AppState::new(driver)),
        scheduler,
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Record store
        .route("/api/storage", get(http::get_storage))
        .route("/api/storage/sheets", get(http::list_sheets))
        .route("/api/storage/search", get(http::search))
        .route("/api/storage/filter", post(http::filter))
        .route("/api/storage/fields/{field}/values", get(http::field_values))
        .route("/api/storage/filters", get(http::filter_fields))
        .route("/api/storage/insights", get(http::insights))
        .route("/api/storage/stats", get(http::storage_stats))
        .route("/api/storage/sync", post(http::trigger_sync))
        .route("/api/storage/export/{format}", get(http::export))
        // Sync monitoring
        .route("/api/health", get(http::health))
        .route("/api/sync/stats", get(http::sync_stats))
        .route("/api/sync/history", get(http::sync_history))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the server
pub async fn serve(addr: &str, state: Arc<AppState>) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("SheetSync server listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use chrono::Utc;
    use sheetsync_core::{
        Cell, FetchedSheet, InMemorySource, MemoryPersistence, MemoryTab, Record, SheetSchema,
        Snapshot,
    };
    use tower::ServiceExt;

    fn source() -> InMemorySource {
        InMemorySource::new()
            .with_tab(
                MemoryTab::new("Status")
                    .row(["Vendor", "Support Status"])
                    .row(["Acme", "Fully Supported"])
                    .row(["Acme", "Not Supported"])
                    .row(["Beta Co", "Tech Preview"]),
            )
            .with_tab(MemoryTab::new("Roadmap WIP").row(["Item"]).row(["Later"]))
    }

    fn state_with(source: InMemorySource) -> Arc<AppState> {
        let driver = SyncDriver::new(
            Arc::new(source),
            Arc::new(RecordStore::default()),
            SheetSyncConfig::default(),
        );
        Arc::new(AppState::new(Arc::new(driver)))
    }

    async fn synced_state() -> Arc<AppState> {
        let state = state_with(source());
        state.driver.trigger_sync().await.unwrap();
        state
    }

    async fn send(state: Arc<AppState>, request: Request<Body>) -> (StatusCode, Value) {
        let response = create_router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post(uri: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn unconfigured_source_still_serves_restored_data() {
        let mut stored = Snapshot::new();
        stored.insert_sheet(
            "Status",
            FetchedSheet {
                schema: SheetSchema {
                    columns: vec!["vendor".into()],
                    header_notes: [("vendor".to_string(), "Legal name".to_string())].into(),
                },
                records: vec![Record::new(1, "Status", Utc::now())
                    .with_field("vendor", Cell::plain("Acme"))],
            },
        );
        let persistence: Arc<dyn SnapshotPersistence> =
            Arc::new(MemoryPersistence::with_snapshot(stored));
        let service = start(
            SheetSyncConfig::default(),
            Err(SourceError::NotConfigured("spreadsheet_id".into())),
            Some(persistence),
        )
        .await;
        assert!(service.scheduler.is_none());
        assert_eq!(service.state.driver.monitor().stats().total_syncs, 0);

        let (status, body) = send(service.state.clone(), get("/api/storage")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["Status"][0]["fields"]["vendor"]["text"], "Acme");
        assert_eq!(body["sheetNames"], serde_json::json!(["Status"]));
        assert_eq!(body["headerNotes"]["Status"]["vendor"], "Legal name");

        let (status, body) = send(service.state, post("/api/storage/sync")).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("not configured"));
    }

    #[tokio::test]
    async fn configured_source_syncs_on_startup() {
        let source: Arc<dyn SheetSource> = Arc::new(source());
        let persistence: Arc<dyn SnapshotPersistence> = Arc::new(MemoryPersistence::new());
        let service = start(SheetSyncConfig::default(), Ok(source), Some(persistence))
        .await;
        let scheduler = service.scheduler.expect("scheduler");
        scheduler.abort();

        let (_, body) = send(service.state, get("/api/storage")).await;
        assert_eq!(body["sheetNames"], serde_json::json!(["Status"]));
        assert_eq!(body["data"]["Status"].as_array().unwrap().len(), 3);
        assert_eq!(body["headerNotes"], serde_json::json!({}));
    }

    #[tokio::test]
    async fn sheet_listing_skips_wip_tabs() {
        let (status, body) = send(synced_state().await, get("/api/storage/sheets")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sheets"], serde_json::json!(["Status"]));
    }

    #[tokio::test]
    async fn search_is_scoped_to_sheet() {
        let (_, body) = send(
            synced_state().await,
            get("/api/storage/search?q=ACME&sheet=Status"),
        )
        .await;
        assert_eq!(body["success"], true);
        assert_eq!(body["total"], 2);
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn filter_by_body() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/storage/filter")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"sheet": "Status", "filters": {"vendor": "beta", "support_status": ""}}"#,
            ))
            .unwrap();
        let (status, body) = send(synced_state().await, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);
    }

    #[tokio::test]
    async fn field_values_and_insights() {
        let state = synced_state().await;
        let (_, values) = send(state.clone(), get("/api/storage/fields/vendor/values")).await;
        assert_eq!(values["values"], serde_json::json!(["Acme", "Beta Co"]));

        let (_, body) = send(state.clone(), get("/api/storage/insights?sheet=Status")).await;
        let health = &body["insights"]["health"];
        assert_eq!(health["ready"], 1);
        assert_eq!(health["blocked"], 1);
        assert_eq!(health["in-progress"], 1);

        let (_, body) = send(state, get("/api/storage/filters")).await;
        assert_eq!(body["sheet"], "Status");
        let roles: Vec<_> = body["filters"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["role"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(roles, vec!["partner", "status"]);
    }

    #[tokio::test]
    async fn enumeration_failure_is_bad_gateway() {
        let state = state_with(source().with_listing_failure(SourceError::RateLimited));
        let (status, body) = send(state.clone(), post("/api/storage/sync")).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["success"], false);

        let (_, health) = send(state, get("/api/health")).await;
        assert_eq!(health["status"], "warning");
        assert_eq!(health["recentFailures"], 1);
    }

    #[tokio::test]
    async fn csv_export_of_default_sheet() {
        let response = create_router(synced_state().await)
            .oneshot(get("/api/storage/export/csv"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.starts_with("id,vendor,support_status"));
        assert_eq!(text.lines().count(), 4);
    }

    #[tokio::test]
    async fn unknown_export_format_is_rejected() {
        let (status, _) = send(synced_state().await, get("/api/storage/export/xml")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn sync_history_reports_attempts() {
        let (_, body) = send(synced_state().await, get("/api/sync/history?limit=5")).await;
        let history = body["history"].as_array().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0]["success"], true);
        assert_eq!(history[0]["recordCount"], 3);
    }
}
