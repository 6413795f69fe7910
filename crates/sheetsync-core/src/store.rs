//! The record store: owner of the current snapshot and its query surface.
//!
//! Readers take a cheap `Arc` clone of the snapshot and work on that, so a
//! query never observes a half-applied sync. A new sync swaps the whole
//! snapshot in one step.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classifier::{FieldClassifier, FilterField};
use crate::insight::{compute_insights, Insights};
use crate::persistence::SnapshotPersistence;
use crate::record::{unique_values, Record};
use crate::snapshot::Snapshot;

/// Query result: one sheet's records, or a mapping over every sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScopedRecords {
    Sheet(Vec<Record>),
    Sheets(BTreeMap<String, Vec<Record>>),
}

impl ScopedRecords {
    /// Number of records across the scope.
    pub fn total(&self) -> usize {
        match self {
            ScopedRecords::Sheet(records) => records.len(),
            ScopedRecords::Sheets(sheets) => sheets.values().map(Vec::len).sum(),
        }
    }

    /// Records of a single-sheet result; `None` for a mapping.
    pub fn into_sheet(self) -> Option<Vec<Record>> {
        match self {
            ScopedRecords::Sheet(records) => Some(records),
            ScopedRecords::Sheets(_) => None,
        }
    }

    pub fn into_sheets(self) -> Option<BTreeMap<String, Vec<Record>>> {
        match self {
            ScopedRecords::Sheet(_) => None,
            ScopedRecords::Sheets(sheets) => Some(sheets),
        }
    }
}

/// Summary counts of the current snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub total_records: usize,
    pub sheet_count: usize,
    pub sheets: BTreeMap<String, usize>,
    pub last_sync_time: Option<DateTime<Utc>>,
    /// Sorted union of field names seen in any record
    pub data_fields: Vec<String>,
}

pub struct RecordStore {
    snapshot: RwLock<Arc<Snapshot>>,
    persistence: Option<Arc<dyn SnapshotPersistence>>,
    save_lock: Mutex<()>,
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new(None)
    }
}

impl RecordStore {
    pub fn new(persistence: Option<Arc<dyn SnapshotPersistence>>) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(Snapshot::new())),
            persistence,
            save_lock: Mutex::new(()),
        }
    }

    /// Restore the last persisted snapshot, if any.
    ///
    /// A missing, corrupt or unreadable file leaves the store empty; the
    /// problem is logged rather than returned. Returns whether a snapshot
    /// was restored.
    pub fn load_from_persistence(&self) -> bool {
        let Some(persistence) = &self.persistence else {
            return false;
        };
        match persistence.load() {
            Ok(Some(snapshot)) => {
                tracing::info!(
                    "Restored {} records across {} sheets from persistence",
                    snapshot.record_count(),
                    snapshot.sheet_count()
                );
                self.swap(Arc::new(snapshot));
                true
            }
            Ok(None) => {
                tracing::info!("No persisted snapshot found, starting empty");
                false
            }
            Err(e) => {
                tracing::warn!("Ignoring unreadable persisted snapshot: {}", e);
                false
            }
        }
    }

    /// Publish a freshly synced snapshot, stamping it with the current time.
    ///
    /// Swap and save run under one lock, so the persisted snapshot is always
    /// the live one once concurrent publishers return. The save blocks on
    /// IO; async callers should run this on a blocking thread. A failed save
    /// is logged and the new snapshot stays live.
    pub fn replace_snapshot(&self, mut snapshot: Snapshot) -> Arc<Snapshot> {
        let _guard = self.save_lock.lock().unwrap_or_else(PoisonError::into_inner);
        snapshot.last_sync_time = Some(Utc::now());
        let snapshot = Arc::new(snapshot);
        self.swap(snapshot.clone());

        if let Some(persistence) = &self.persistence {
            if let Err(e) = persistence.save(&snapshot) {
                tracing::error!("Failed to persist snapshot: {}", e);
            }
        }
        snapshot
    }

    fn swap(&self, snapshot: Arc<Snapshot>) {
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }

    /// The current snapshot.
    pub fn current(&self) -> Arc<Snapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Records of a sheet; empty for unknown names.
    pub fn get_sheet(&self, name: &str) -> Vec<Record> {
        self.current().sheet(name).to_vec()
    }

    pub fn get_all_sheets(&self) -> BTreeMap<String, Vec<Record>> {
        self.current().sheets.clone()
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.current().sheet_names()
    }

    pub fn last_sync_time(&self) -> Option<DateTime<Utc>> {
        self.current().last_sync_time
    }

    /// Header comments of a sheet, keyed by field name.
    pub fn header_notes(&self, sheet: &str) -> BTreeMap<String, String> {
        self.current()
            .schema(sheet)
            .map(|s| s.header_notes.clone())
            .unwrap_or_default()
    }

    /// Header comments of every sheet that has any.
    pub fn all_header_notes(&self) -> BTreeMap<String, BTreeMap<String, String>> {
        self.current().all_header_notes()
    }

    /// Case-insensitive substring search over every cell's canonical text
    /// and link targets. A blank query returns the scope unchanged.
    pub fn search(&self, query: &str, sheet: Option<&str>) -> ScopedRecords {
        if query.trim().is_empty() {
            return self.scoped(sheet, |_| true);
        }
        let needle = query.to_lowercase();
        self.scoped(sheet, |r| r.matches_lowercase(&needle))
    }

    /// Keep records whose every constrained field contains the given
    /// substring (case-insensitive). Blank constraints are ignored; a
    /// record lacking a constrained field does not pass.
    pub fn filter(&self, filters: &BTreeMap<String, String>, sheet: Option<&str>) -> ScopedRecords {
        let constraints: Vec<(&str, String)> = filters
            .iter()
            .filter(|(_, v)| !v.trim().is_empty())
            .map(|(k, v)| (k.as_str(), v.to_lowercase()))
            .collect();

        self.scoped(sheet, |record| {
            constraints.iter().all(|(field, needle)| {
                record
                    .text(field)
                    .is_some_and(|value| value.to_lowercase().contains(needle.as_str()))
            })
        })
    }

    /// Distinct non-blank values of a field in one sheet or across all.
    pub fn unique_values(&self, field: &str, sheet: Option<&str>) -> Vec<String> {
        let snapshot = self.current();
        match sheet {
            Some(name) => unique_values(snapshot.sheet(name), field),
            None => unique_values(snapshot.sheets.values().flatten(), field),
        }
    }

    pub fn stats(&self) -> StoreStats {
        let snapshot = self.current();
        let data_fields: BTreeSet<&str> = snapshot
            .sheets
            .values()
            .flatten()
            .flat_map(|r| r.fields.names())
            .collect();

        StoreStats {
            total_records: snapshot.record_count(),
            sheet_count: snapshot.sheet_count(),
            sheets: snapshot
                .sheets
                .iter()
                .map(|(name, records)| (name.clone(), records.len()))
                .collect(),
            last_sync_time: snapshot.last_sync_time,
            data_fields: data_fields.into_iter().map(str::to_string).collect(),
        }
    }

    /// Filter fields proposed for one sheet's current records.
    pub fn filter_fields(&self, sheet: &str, classifier: &FieldClassifier) -> Vec<FilterField> {
        classifier.detect_filter_fields(self.current().sheet(sheet))
    }

    pub fn insights(&self, sheet: &str, classifier: &FieldClassifier) -> Insights {
        compute_insights(classifier, self.current().sheet(sheet))
    }

    fn scoped<F>(&self, sheet: Option<&str>, keep: F) -> ScopedRecords
    where
        F: Fn(&Record) -> bool,
    {
        let snapshot = self.current();
        let select = |records: &[Record]| -> Vec<Record> {
            records.iter().filter(|r| keep(r)).cloned().collect()
        };
        match sheet {
            Some(name) => ScopedRecords::Sheet(select(snapshot.sheet(name))),
            None => ScopedRecords::Sheets(
                snapshot
                    .sheets
                    .iter()
                    .map(|(name, records)| (name.clone(), select(records)))
                    .collect(),
            ),
        }
    }
}
