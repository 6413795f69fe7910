//! SheetSync Core - Spreadsheet-to-record sync engine
//!
//! This crate mirrors the tabs of a remote spreadsheet into a locally
//! queryable record store:
//!
//! - **Cell**: Unified cell model (plain, link, rich text, annotated) with one canonical text
//! - **Normalize**: Folds a raw value and its formatting metadata into a cell
//! - **Source**: Remote spreadsheet abstraction, with Google Sheets and in-memory backends
//! - **Fetcher**: Two aligned retrievals per tab turned into records
//! - **Orchestrator**: Multi-tab sync with work-in-progress exclusion and per-tab fail-soft
//! - **Store**: Snapshot owner with search, filter and unique-value queries
//! - **Classifier**: Keyword heuristics for column roles and status health
//! - **Insight**: Health distribution, per-partner breakdown, certification coverage
//! - **Persistence**: Versioned JSON snapshot file with atomic replacement
//! - **Monitor**: Bounded sync attempt history with derived health
//! - **Sync**: Driver running syncs under an in-flight guard, plus the periodic scheduler
//! - **Export**: CSV and JSON rendering of records
//! - **Config**: Source, timing, storage, server and keyword-table configuration
//!
//! # Data flow
//!
//! ```text
//! SheetSource → SheetFetcher → normalize_cell → Snapshot → RecordStore → FieldClassifier
//!                    ↑
//!            SyncOrchestrator ← SyncDriver (on demand or every interval)
//! ```

pub mod cell;
pub mod classifier;
pub mod config;
pub mod error;
pub mod export;
pub mod fetcher;
pub mod insight;
pub mod monitor;
pub mod normalize;
pub mod orchestrator;
pub mod persistence;
pub mod record;
pub mod snapshot;
pub mod source;
pub mod store;
pub mod sync;

pub use cell::{Cell, TextRun};
pub use classifier::{FieldClassifier, FilterField, HealthStatus, Role};
pub use config::{
    ClassifierConfig, ServerConfig, SheetSyncConfig, SourceConfig, StorageConfig, SyncSettings,
};
pub use error::{
    ConfigError, ExportError, PersistenceError, Result, SourceError, SyncError,
};
pub use export::{export_csv, export_json};
pub use fetcher::{build_sheet, SheetFetcher};
pub use insight::{compute_insights, CertificationRatio, HealthCounts, Insights};
pub use monitor::{HealthLevel, HealthReport, SyncAttempt, SyncMonitor, SyncStats};
pub use normalize::{normalize_cell, CellFormat};
pub use orchestrator::{is_excluded, SyncBatch, SyncOrchestrator, TabFailure};
pub use persistence::{JsonFilePersistence, MemoryPersistence, SnapshotPersistence};
pub use record::{field_name_from_header, unique_values, Fields, Record};
pub use snapshot::{FetchedSheet, SheetSchema, Snapshot};
#[cfg(feature = "google")]
pub use source::GoogleSheetsSource;
pub use source::{
    InMemorySource, MemoryTab, SheetRange, SheetSource, TabInfo, UnavailableSource,
};
pub use store::{RecordStore, ScopedRecords, StoreStats};
pub use sync::{SyncDriver, SyncReport};
