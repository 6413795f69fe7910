//! In-memory spreadsheet source

use async_trait::async_trait;

use super::{FormatGrid, SheetRange, SheetSource, TabInfo, ValueGrid};
use crate::error::SourceError;
use crate::normalize::CellFormat;

/// One tab held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryTab {
    pub name: String,
    pub values: ValueGrid,
    pub formats: FormatGrid,
    /// When set, value and formatting retrievals for this tab fail
    pub failure: Option<SourceError>,
}

impl MemoryTab {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Append a row of raw values.
    pub fn row<I, S>(mut self, cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values.push(cells.into_iter().map(Into::into).collect());
        self
    }

    /// Attach formatting to the cell at (row, column), zero-based including
    /// the header row.
    pub fn format(mut self, row: usize, column: usize, format: CellFormat) -> Self {
        if self.formats.len() <= row {
            self.formats.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.formats[row];
        if cells.len() <= column {
            cells.resize_with(column + 1, CellFormat::default);
        }
        cells[column] = format;
        self
    }

    /// Make every retrieval for this tab fail.
    pub fn failing(mut self, error: SourceError) -> Self {
        self.failure = Some(error);
        self
    }

    fn info(&self) -> TabInfo {
        let columns = self.values.iter().map(Vec::len).max().unwrap_or(0);
        TabInfo::new(self.name.clone(), self.values.len() as u32, columns as u32)
    }
}

/// A [`SheetSource`] backed by in-memory grids.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    tabs: Vec<MemoryTab>,
    listing_failure: Option<SourceError>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tab(mut self, tab: MemoryTab) -> Self {
        self.tabs.push(tab);
        self
    }

    /// Make tab enumeration fail.
    pub fn with_listing_failure(mut self, error: SourceError) -> Self {
        self.listing_failure = Some(error);
        self
    }

    fn tab(&self, range: &SheetRange) -> Result<&MemoryTab, SourceError> {
        let tab = match &range.sheet {
            Some(name) => self.tabs.iter().find(|t| &t.name == name),
            None => self.tabs.first(),
        };
        let tab = tab.ok_or_else(|| {
            SourceError::SheetNotFound(range.sheet.clone().unwrap_or_default())
        })?;
        match &tab.failure {
            Some(err) => Err(err.clone()),
            None => Ok(tab),
        }
    }
}

#[async_trait]
impl SheetSource for InMemorySource {
    async fn list_tabs(&self) -> Result<Vec<TabInfo>, SourceError> {
        if let Some(err) = &self.listing_failure {
            return Err(err.clone());
        }
        Ok(self.tabs.iter().map(MemoryTab::info).collect())
    }

    async fn get_values(&self, range: &SheetRange) -> Result<ValueGrid, SourceError> {
        Ok(self.tab(range)?.values.clone())
    }

    async fn get_formatting(&self, range: &SheetRange) -> Result<FormatGrid, SourceError> {
        Ok(self.tab(range)?.formats.clone())
    }
}
