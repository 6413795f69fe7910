//! Snapshots: one complete sync result.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::Record;

/// Per-sheet schema inferred from the header row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetSchema {
    /// Field names in header order
    pub columns: Vec<String>,
    /// Comments attached to header cells, keyed by field name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub header_notes: BTreeMap<String, String>,
}

/// Result of fetching one sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedSheet {
    pub schema: SheetSchema,
    pub records: Vec<Record>,
}

/// All sheets' records plus the time they were published.
///
/// Never patched in place: a new sync builds a new snapshot and the store
/// swaps it in whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub sheets: BTreeMap<String, Vec<Record>>,
    #[serde(default)]
    pub schemas: BTreeMap<String, SheetSchema>,
    pub last_sync_time: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_sheet(&mut self, name: impl Into<String>, sheet: FetchedSheet) {
        let name = name.into();
        self.schemas.insert(name.clone(), sheet.schema);
        self.sheets.insert(name, sheet.records);
    }

    /// Records of a sheet; empty for unknown names.
    pub fn sheet(&self, name: &str) -> &[Record] {
        self.sheets.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn schema(&self, name: &str) -> Option<&SheetSchema> {
        self.schemas.get(name)
    }

    /// Field names of a sheet in header order; falls back to the first
    /// record's fields when the schema was not captured.
    pub fn columns(&self, name: &str) -> Vec<String> {
        match self.schemas.get(name) {
            Some(schema) if !schema.columns.is_empty() => schema.columns.clone(),
            _ => self
                .sheet(name)
                .first()
                .map(|r| r.fields.names().map(str::to_string).collect())
                .unwrap_or_default(),
        }
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.keys().cloned().collect()
    }

    /// Header comments keyed by sheet, then field; sheets without any are
    /// left out.
    pub fn all_header_notes(&self) -> BTreeMap<String, BTreeMap<String, String>> {
        self.schemas
            .iter()
            .filter(|(_, schema)| !schema.header_notes.is_empty())
            .map(|(name, schema)| (name.clone(), schema.header_notes.clone()))
            .collect()
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    pub fn record_count(&self) -> usize {
        self.sheets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}
