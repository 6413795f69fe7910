//! Remote spreadsheet source abstraction
//!
//! The sync engine only needs three things from a spreadsheet backend: the
//! list of tabs, a value grid for a range, and a formatting grid aligned to
//! the same range.

#[cfg(feature = "google")]
pub mod google;
pub mod memory;
pub mod unavailable;

#[cfg(feature = "google")]
pub use google::GoogleSheetsSource;
pub use memory::{InMemorySource, MemoryTab};
pub use unavailable::UnavailableSource;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SourceError;
use crate::normalize::CellFormat;

/// Raw cell values, row-major. Rows may be ragged.
pub type ValueGrid = Vec<Vec<String>>;

/// Formatting entries aligned by (row, column) with a [`ValueGrid`].
/// Missing entries mean "no formatting".
pub type FormatGrid = Vec<Vec<CellFormat>>;

/// A tab of the remote spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabInfo {
    pub name: String,
    pub row_count: u32,
    pub column_count: u32,
}

impl TabInfo {
    pub fn new(name: impl Into<String>, row_count: u32, column_count: u32) -> Self {
        Self {
            name: name.into(),
            row_count,
            column_count,
        }
    }
}

/// A rectangular A1 range, optionally qualified by a tab name.
///
/// `sheet == None` addresses the default (first) tab.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SheetRange {
    pub sheet: Option<String>,
    pub columns: String,
}

impl SheetRange {
    pub fn new(sheet: Option<&str>, columns: impl Into<String>) -> Self {
        Self {
            sheet: sheet.map(str::to_string),
            columns: columns.into(),
        }
    }

    /// A1 notation, e.g. `'Tab ''One'''!A:Z` or `A:Z`.
    pub fn to_a1(&self) -> String {
        match &self.sheet {
            Some(name) => format!("'{}'!{}", name.replace('\'', "''"), self.columns),
            None => self.columns.clone(),
        }
    }
}

impl fmt::Display for SheetRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1())
    }
}

/// A remote spreadsheet backend.
#[async_trait]
pub trait SheetSource: Send + Sync {
    /// Enumerate tabs in display order.
    async fn list_tabs(&self) -> Result<Vec<TabInfo>, SourceError>;

    /// Raw display values over a range.
    async fn get_values(&self, range: &SheetRange) -> Result<ValueGrid, SourceError>;

    /// Formatting metadata over the same range as [`SheetSource::get_values`].
    async fn get_formatting(&self, range: &SheetRange) -> Result<FormatGrid, SourceError>;
}
