//! Multi-sheet sync: enumerate tabs, skip work-in-progress ones, fetch the
//! rest, and assemble one snapshot.

use crate::config::SheetSyncConfig;
use crate::error::SourceError;
use crate::fetcher::SheetFetcher;
use crate::snapshot::{FetchedSheet, Snapshot};
use crate::source::SheetSource;

/// Whether a tab name carries the exclusion marker (case-insensitive).
pub fn is_excluded(sheet_name: &str, marker: &str) -> bool {
    !marker.is_empty() && sheet_name.to_lowercase().contains(&marker.to_lowercase())
}

/// A tab whose fetch failed and was recorded as empty.
#[derive(Debug, Clone, PartialEq)]
pub struct TabFailure {
    pub sheet: String,
    pub error: SourceError,
}

/// Outcome of one orchestrated sync.
#[derive(Debug, Clone, Default)]
pub struct SyncBatch {
    pub snapshot: Snapshot,
    /// Tabs recorded as empty because their fetch failed
    pub failures: Vec<TabFailure>,
    /// Tabs skipped by the exclusion marker
    pub excluded: Vec<String>,
}

/// Drives a full fetch of every eligible tab.
pub struct SyncOrchestrator<'a> {
    source: &'a dyn SheetSource,
    column_span: String,
    exclude_marker: String,
}

impl<'a> SyncOrchestrator<'a> {
    pub fn new(
        source: &'a dyn SheetSource,
        column_span: impl Into<String>,
        exclude_marker: impl Into<String>,
    ) -> Self {
        Self {
            source,
            column_span: column_span.into(),
            exclude_marker: exclude_marker.into(),
        }
    }

    pub fn from_config(source: &'a dyn SheetSource, config: &SheetSyncConfig) -> Self {
        Self::new(
            source,
            config.source.column_span.clone(),
            config.sync.exclude_marker.clone(),
        )
    }

    /// Fetch every eligible tab into a snapshot.
    ///
    /// Only enumeration failure is returned as an error.
    pub async fn fetch_all_sheets(&self) -> Result<Snapshot, SourceError> {
        Ok(self.sync_all().await?.snapshot)
    }

    /// Like [`Self::fetch_all_sheets`], also reporting failed and excluded tabs.
    pub async fn sync_all(&self) -> Result<SyncBatch, SourceError> {
        let tabs = self.source.list_tabs().await?;
        let fetcher = SheetFetcher::new(self.source, self.column_span.clone());
        let mut batch = SyncBatch::default();

        for tab in tabs {
            if is_excluded(&tab.name, &self.exclude_marker) {
                tracing::info!("Skipping work-in-progress sheet {:?}", tab.name);
                batch.excluded.push(tab.name);
                continue;
            }

            match fetcher.fetch_sheet(Some(&tab.name)).await {
                Ok(sheet) => {
                    tracing::info!(
                        "Fetched {} records from sheet {:?}",
                        sheet.records.len(),
                        tab.name
                    );
                    batch.snapshot.insert_sheet(tab.name, sheet);
                }
                Err(error) => {
                    tracing::warn!("Failed to fetch sheet {:?}: {}", tab.name, error);
                    batch
                        .snapshot
                        .insert_sheet(tab.name.clone(), FetchedSheet::default());
                    batch.failures.push(TabFailure {
                        sheet: tab.name,
                        error,
                    });
                }
            }
        }

        Ok(batch)
    }
}
