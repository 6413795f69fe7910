//! CSV and JSON export of record sequences.

use crate::error::ExportError;
use crate::record::Record;

/// Render records as CSV: an `id` column followed by `columns` in order,
/// one row per record of canonical text. Missing fields are empty.
pub fn export_csv(columns: &[String], records: &[Record]) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = Vec::with_capacity(columns.len() + 1);
    header.push("id");
    header.extend(columns.iter().map(String::as_str));
    writer.write_record(&header)?;

    for record in records {
        let mut row = Vec::with_capacity(columns.len() + 1);
        row.push(record.id.to_string());
        row.extend(
            columns
                .iter()
                .map(|c| record.text(c).map(|t| t.into_owned()).unwrap_or_default()),
        );
        writer.write_record(&row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Csv(e.error().to_string()))?;
    String::from_utf8(bytes).map_err(|e| ExportError::Csv(e.to_string()))
}

/// Render records as pretty JSON, cells keeping their variant.
pub fn export_json(records: &[Record]) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(records)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{Cell, TextRun};
    use chrono::Utc;

    fn records() -> Vec<Record> {
        let now = Utc::now();
        vec![
            Record::new(1, "Status", now)
                .with_field("vendor", Cell::plain("Acme, Inc."))
                .with_field(
                    "docs",
                    Cell::RichText {
                        runs: vec![TextRun::plain("See "), TextRun::linked("guide", "https://g")],
                        comment: None,
                    },
                ),
            Record::new(3, "Status", now).with_field("vendor", Cell::plain("Beta Co")),
        ]
    }

    #[test]
    fn csv_uses_canonical_text_and_quotes() {
        let columns = vec!["vendor".to_string(), "docs".to_string()];
        let csv = export_csv(&columns, &records()).unwrap();
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines[0], "id,vendor,docs");
        assert_eq!(lines[1], "1,\"Acme, Inc.\",See guide");
        assert_eq!(lines[2], "3,Beta Co,");
    }

    #[test]
    fn csv_of_nothing_is_just_header() {
        let csv = export_csv(&[], &[]).unwrap();
        assert_eq!(csv.trim_end(), "id");
    }

    #[test]
    fn json_keeps_cell_variants() {
        let original = records();
        let json = export_json(&original).unwrap();
        let back: Vec<Record> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, original);
        assert!(json.contains("rich_text"));
    }
}
