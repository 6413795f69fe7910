//! Records: one spreadsheet row keyed by field name.
//!
//! Schemas are inferred per fetch, so a record is an ordered string-keyed
//! map rather than a fixed struct. Field order follows the header row.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::cell::Cell;

/// Derive a field name from a header cell's canonical text.
///
/// Lower-cases and replaces each run of whitespace with a single underscore.
/// Leading and trailing whitespace is dropped first.
pub fn field_name_from_header(header: &str) -> String {
    header
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

/// Ordered field-name → cell map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields(Vec<(String, Cell)>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field. A repeated name overwrites the earlier value in place.
    pub fn insert(&mut self, name: impl Into<String>, cell: Cell) {
        let name = name.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = cell,
            None => self.0.push((name, cell)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Cell> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Cell)> {
        self.0.iter().map(|(n, c)| (n.as_str(), c))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.0.iter().map(|(_, c)| c)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Cell)> for Fields {
    fn from_iter<I: IntoIterator<Item = (String, Cell)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (name, cell) in iter {
            fields.insert(name, cell);
        }
        fields
    }
}

impl Serialize for Fields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, cell) in &self.0 {
            map.serialize_entry(name, cell)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Fields {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldsVisitor;

        impl<'de> Visitor<'de> for FieldsVisitor {
            type Value = Fields;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of field names to cells")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut fields = Fields::new();
                while let Some((name, cell)) = access.next_entry::<String, Cell>()? {
                    fields.insert(name, cell);
                }
                Ok(fields)
            }
        }

        deserializer.deserialize_map(FieldsVisitor)
    }
}

/// One data row of a sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// 1-based row position below the header; blank rows keep their slot
    pub id: usize,
    pub sheet_name: String,
    pub last_updated: DateTime<Utc>,
    pub fields: Fields,
}

impl Record {
    pub fn new(id: usize, sheet_name: impl Into<String>, last_updated: DateTime<Utc>) -> Self {
        Self {
            id,
            sheet_name: sheet_name.into(),
            last_updated,
            fields: Fields::new(),
        }
    }

    /// Builder-style field insertion.
    pub fn with_field(mut self, name: impl Into<String>, cell: Cell) -> Self {
        self.fields.insert(name, cell);
        self
    }

    pub fn get(&self, field: &str) -> Option<&Cell> {
        self.fields.get(field)
    }

    /// Canonical text of a field, if the field exists.
    pub fn text(&self, field: &str) -> Option<Cow<'_, str>> {
        self.fields.get(field).map(Cell::canonical_text)
    }

    /// True when every cell's canonical text is blank.
    pub fn is_blank(&self) -> bool {
        self.fields.cells().all(Cell::is_blank)
    }

    /// Case-insensitive match of a lower-cased needle against any cell.
    pub fn matches_lowercase(&self, needle: &str) -> bool {
        self.fields.cells().any(|c| c.matches_lowercase(needle))
    }
}

/// Distinct non-blank canonical values of a field, trimmed and sorted.
///
/// Records without the field contribute nothing.
pub fn unique_values<'a, I>(records: I, field: &str) -> Vec<String>
where
    I: IntoIterator<Item = &'a Record>,
{
    let values: BTreeSet<String> = records
        .into_iter()
        .filter_map(|r| r.text(field))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    values.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_to_field_name() {
        assert_eq!(field_name_from_header("Support Status"), "support_status");
        assert_eq!(field_name_from_header("  Vendor   Name "), "vendor_name");
        assert_eq!(field_name_from_header("CSI\tDriver"), "csi_driver");
        assert_eq!(field_name_from_header("ID"), "id");
    }

    #[test]
    fn fields_keep_header_order_and_overwrite_in_place() {
        let mut fields = Fields::new();
        fields.insert("vendor", Cell::plain("Acme"));
        fields.insert("status", Cell::plain("GA"));
        fields.insert("vendor", Cell::plain("Beta"));
        let names: Vec<_> = fields.names().collect();
        assert_eq!(names, vec!["vendor", "status"]);
        assert_eq!(fields.get("vendor"), Some(&Cell::plain("Beta")));
    }

    #[test]
    fn fields_serialize_as_ordered_map() {
        let fields: Fields = vec![
            ("zeta".to_string(), Cell::plain("1")),
            ("alpha".to_string(), Cell::plain("2")),
        ]
        .into_iter()
        .collect();
        let json = serde_json::to_string(&fields).unwrap();
        assert!(json.find("zeta").unwrap() < json.find("alpha").unwrap());
        let back: Fields = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fields);
    }

    #[test]
    fn blank_record() {
        let record = Record::new(1, "Sheet1", Utc::now())
            .with_field("a", Cell::plain(" "))
            .with_field("b", Cell::empty());
        assert!(record.is_blank());
        let record = record.with_field("c", Cell::plain("x"));
        assert!(!record.is_blank());
    }

    #[test]
    fn unique_values_sorted_trimmed_without_blanks() {
        let now = Utc::now();
        let records = vec![
            Record::new(1, "S", now).with_field("vendor", Cell::plain("Beta Co")),
            Record::new(2, "S", now).with_field("vendor", Cell::plain(" Acme ")),
            Record::new(3, "S", now).with_field("vendor", Cell::plain("   ")),
            Record::new(4, "S", now).with_field("vendor", Cell::plain("Acme")),
            Record::new(5, "S", now).with_field("other", Cell::plain("Zed")),
        ];
        assert_eq!(unique_values(&records, "vendor"), vec!["Acme", "Beta Co"]);
        assert!(unique_values(&records, "missing").is_empty());
    }
}
