//! Sheet fetching: two aligned retrievals turned into records.

use chrono::{DateTime, Utc};

use crate::error::SourceError;
use crate::normalize::{normalize_cell, CellFormat};
use crate::record::{field_name_from_header, Record};
use crate::snapshot::{FetchedSheet, SheetSchema};
use crate::source::{FormatGrid, SheetRange, SheetSource, ValueGrid};

/// Fetches a single tab from a [`SheetSource`].
pub struct SheetFetcher<'a> {
    source: &'a dyn SheetSource,
    column_span: String,
}

impl<'a> SheetFetcher<'a> {
    pub fn new(source: &'a dyn SheetSource, column_span: impl Into<String>) -> Self {
        Self {
            source,
            column_span: column_span.into(),
        }
    }

    /// Fetch one tab; `None` means the default (first) tab.
    ///
    /// Values and formatting are retrieved concurrently over the same range.
    /// Either retrieval failing fails the fetch. A tab with only a header
    /// row (or nothing at all) yields no records.
    pub async fn fetch_sheet(&self, sheet: Option<&str>) -> Result<FetchedSheet, SourceError> {
        let sheet_name = match sheet {
            Some(name) => name.to_string(),
            None => self
                .source
                .list_tabs()
                .await?
                .into_iter()
                .next()
                .map(|t| t.name)
                .unwrap_or_default(),
        };

        let range = SheetRange::new(sheet, self.column_span.clone());
        let (values, formats) = tokio::join!(
            self.source.get_values(&range),
            self.source.get_formatting(&range)
        );
        let values = values?;
        let formats = formats?;

        let fetched = build_sheet(&sheet_name, &values, &formats, Utc::now());
        tracing::debug!(
            "Fetched {} records from sheet {:?}",
            fetched.records.len(),
            sheet_name
        );
        Ok(fetched)
    }
}

fn format_at(formats: &FormatGrid, row: usize, column: usize) -> Option<&CellFormat> {
    formats.get(row).and_then(|r| r.get(column))
}

/// Turn aligned value and formatting grids into a sheet's schema and records.
///
/// The first value row is the header. Record ids are the 1-based position
/// below the header, so dropped blank rows leave gaps rather than shifting
/// later ids. Columns with a blank header are not mapped to a field.
pub fn build_sheet(
    sheet_name: &str,
    values: &ValueGrid,
    formats: &FormatGrid,
    fetched_at: DateTime<Utc>,
) -> FetchedSheet {
    let Some(header) = values.first() else {
        return FetchedSheet::default();
    };

    let mut schema = SheetSchema::default();
    let mut columns: Vec<(usize, String)> = Vec::with_capacity(header.len());

    for (col, raw) in header.iter().enumerate() {
        let cell = normalize_cell(raw, format_at(formats, 0, col));
        let name = field_name_from_header(&cell.canonical_text());
        if name.is_empty() {
            continue;
        }
        if let Some(note) = cell.comment() {
            schema.header_notes.insert(name.clone(), note.to_string());
        }
        if !schema.columns.contains(&name) {
            schema.columns.push(name.clone());
        }
        columns.push((col, name));
    }

    let mut records = Vec::with_capacity(values.len().saturating_sub(1));
    for (row_idx, row) in values.iter().enumerate().skip(1) {
        let mut record = Record::new(row_idx, sheet_name, fetched_at);
        for (col, name) in &columns {
            let raw = row.get(*col).map(String::as_str).unwrap_or("");
            let cell = normalize_cell(raw, format_at(formats, row_idx, *col));
            record.fields.insert(name.clone(), cell);
        }
        if !record.is_blank() {
            records.push(record);
        }
    }

    FetchedSheet { schema, records }
}
