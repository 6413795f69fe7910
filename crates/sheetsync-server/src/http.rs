//! HTTP endpoint handlers
//!
//! Every JSON response carries a `success` flag; failures add an `error`
//! message.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use sheetsync_core::{export_csv, export_json, SyncError};

use crate::AppState;

type ApiError = (StatusCode, Json<Value>);
type ApiResult = Result<Json<Value>, ApiError>;

fn failure(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(json!({ "success": false, "error": message.into() })),
    )
}

/// Optional `?sheet=` scope
#[derive(Debug, Default, Deserialize)]
pub struct SheetQuery {
    pub sheet: Option<String>,
}

impl SheetQuery {
    fn sheet(&self) -> Option<&str> {
        self.sheet.as_deref().filter(|s| !s.trim().is_empty())
    }
}

/// The requested sheet, or the first one when none was named.
fn sheet_or_first(state: &AppState, query: &SheetQuery) -> Option<String> {
    query
        .sheet()
        .map(str::to_string)
        .or_else(|| state.store.sheet_names().into_iter().next())
}

/// Get one sheet's records, or every sheet's
pub async fn get_storage(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SheetQuery>,
) -> Json<Value> {
    let store = &state.store;
    match query.sheet() {
        Some(sheet) => Json(json!({
            "success": true,
            "sheet": sheet,
            "data": store.get_sheet(sheet),
            "headerNotes": store.header_notes(sheet),
            "lastSyncTime": store.last_sync_time(),
        })),
        None => {
            let snapshot = store.current();
            Json(json!({
                "success": true,
                "data": snapshot.sheets,
                "sheetNames": snapshot.sheet_names(),
                "headerNotes": snapshot.all_header_notes(),
                "lastSyncTime": snapshot.last_sync_time,
            }))
        }
    }
}

pub async fn list_sheets(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({ "success": true, "sheets": state.store.sheet_names() }))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub sheet: Option<String>,
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Json<Value> {
    let sheet = query.sheet.as_deref().filter(|s| !s.trim().is_empty());
    let results = state.store.search(&query.q, sheet);
    Json(json!({
        "success": true,
        "query": query.q,
        "total": results.total(),
        "data": results,
    }))
}

#[derive(Debug, Deserialize)]
pub struct FilterRequest {
    pub sheet: Option<String>,
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
}

pub async fn filter(
    State(state): State<Arc<AppState>>,
    Json(request): Json<FilterRequest>,
) -> Json<Value> {
    let sheet = request.sheet.as_deref().filter(|s| !s.trim().is_empty());
    let results = state.store.filter(&request.filters, sheet);
    Json(json!({
        "success": true,
        "total": results.total(),
        "data": results,
    }))
}

pub async fn field_values(
    State(state): State<Arc<AppState>>,
    Path(field): Path<String>,
    Query(query): Query<SheetQuery>,
) -> Json<Value> {
    let values = state.store.unique_values(&field, query.sheet());
    Json(json!({ "success": true, "field": field, "values": values }))
}

/// Filter fields the classifier proposes for a sheet
pub async fn filter_fields(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SheetQuery>,
) -> Json<Value> {
    let Some(sheet) = sheet_or_first(&state, &query) else {
        return Json(json!({ "success": true, "sheet": null, "filters": [] }));
    };
    let fields = state.store.filter_fields(&sheet, &state.classifier);
    Json(json!({ "success": true, "sheet": sheet, "filters": fields }))
}

pub async fn insights(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SheetQuery>,
) -> Json<Value> {
    let Some(sheet) = sheet_or_first(&state, &query) else {
        return Json(json!({ "success": true, "sheet": null, "insights": null }));
    };
    let insights = state.store.insights(&sheet, &state.classifier);
    Json(json!({ "success": true, "sheet": sheet, "insights": insights }))
}

pub async fn storage_stats(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({ "success": true, "stats": state.store.stats() }))
}

/// Run a sync now
pub async fn trigger_sync(State(state): State<Arc<AppState>>) -> ApiResult {
    match state.driver.trigger_sync().await {
        Ok(report) => Ok(Json(json!({
            "success": true,
            "message": format!(
                "Synced {} records from {} sheets",
                report.record_count, report.sheet_count
            ),
            "report": report,
        }))),
        Err(SyncError::AlreadyRunning) => Err(failure(
            StatusCode::CONFLICT,
            SyncError::AlreadyRunning.to_string(),
        )),
        Err(e @ SyncError::Source(_)) => Err(failure(StatusCode::BAD_GATEWAY, e.to_string())),
        Err(e) => Err(failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

/// Download a sheet as CSV or JSON
pub async fn export(
    State(state): State<Arc<AppState>>,
    Path(format): Path<String>,
    Query(query): Query<SheetQuery>,
) -> Result<Response, ApiError> {
    let Some(sheet) = sheet_or_first(&state, &query) else {
        return Err(failure(StatusCode::NOT_FOUND, "No sheets synced yet"));
    };
    let snapshot = state.store.current();
    let records = snapshot.sheet(&sheet);

    let (body, content_type, extension) = match format.as_str() {
        "csv" => (
            export_csv(&snapshot.columns(&sheet), records),
            "text/csv; charset=utf-8",
            "csv",
        ),
        "json" => (export_json(records), "application/json", "json"),
        other => {
            return Err(failure(
                StatusCode::BAD_REQUEST,
                format!("Unsupported export format: {}", other),
            ))
        }
    };
    let body = body.map_err(|e| failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let disposition = format!(
        "attachment; filename=\"{}.{}\"",
        sheet.replace('"', "'"),
        extension
    );
    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

/// Service health from recent sync attempts
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let report = state.driver.monitor().health();
    let stats = state.store.stats();
    Json(json!({
        "status": report.status,
        "message": report.message,
        "recentFailures": report.recent_failures,
        "lastSync": report.last_sync,
        "lastSyncTime": stats.last_sync_time,
        "totalRecords": stats.total_records,
        "timestamp": chrono::Utc::now(),
    }))
}

pub async fn sync_stats(State(state): State<Arc<AppState>>) -> Json<Value> {
    let stats = state.driver.monitor().stats();
    Json(json!({ "success": true, "stats": stats }))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

pub async fn sync_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Json<Value> {
    let history = state.driver.monitor().history(query.limit.unwrap_or(10));
    Json(json!({ "success": true, "history": history }))
}
