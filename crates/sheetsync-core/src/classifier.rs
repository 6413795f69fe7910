//! Field classification: semantic roles for columns and a tri-state health
//! signal for status values.
//!
//! Both halves are keyword heuristics driven by the ordered tables in
//! [`ClassifierConfig`]. Results are recomputed on demand from the current
//! snapshot and never cached across syncs.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ClassifierConfig;
use crate::record::{unique_values, Record};

/// Semantic role of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Partner,
    Product,
    Status,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Partner, Role::Product, Role::Status];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Partner => "partner",
            Role::Product => "product",
            Role::Status => "status",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tri-state health signal derived from a status value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HealthStatus {
    Ready,
    InProgress,
    Blocked,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Ready => "ready",
            HealthStatus::InProgress => "in-progress",
            HealthStatus::Blocked => "blocked",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A column usable as a categorical filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterField {
    pub role: Role,
    pub source_field: String,
    pub label: String,
    /// Distinct non-blank values, sorted
    pub values: Vec<String>,
}

/// Human label for a field name: `support_status` → `Support Status`.
pub fn field_label(field: &str) -> String {
    field
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Keyword-driven classifier.
#[derive(Debug, Clone, Default)]
pub struct FieldClassifier {
    config: ClassifierConfig,
}

impl FieldClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    fn role_keywords(&self, role: Role) -> &[String] {
        match role {
            Role::Partner => &self.config.partner_keywords,
            Role::Product => &self.config.product_keywords,
            Role::Status => &self.config.status_keywords,
        }
    }

    /// First field (in column order) whose name contains a keyword of the role.
    pub fn role_field<'a, I>(&self, role: Role, columns: I) -> Option<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let keywords = self.role_keywords(role);
        columns.into_iter().find(|name| {
            let name = name.to_lowercase();
            keywords.iter().any(|k| name.contains(&k.to_lowercase()))
        })
    }

    /// Role field found in a record sequence's schema, by name only.
    pub fn role_field_in(&self, role: Role, records: &[Record]) -> Option<String> {
        let first = records.first()?;
        self.role_field(role, first.fields.names()).map(str::to_string)
    }

    /// Propose filter fields for a record sequence.
    ///
    /// For each role, the first name-matching field is accepted only when its
    /// distinct value count lies in `(min_distinct, max_distinct]`. Roles
    /// without a qualifying field are omitted.
    pub fn detect_filter_fields(&self, records: &[Record]) -> Vec<FilterField> {
        Role::ALL
            .iter()
            .filter_map(|&role| {
                let field = self.role_field_in(role, records)?;
                let values = unique_values(records, &field);
                let count = values.len();
                if count <= self.config.min_distinct || count > self.config.max_distinct {
                    tracing::debug!(
                        "Field {:?} rejected as {} filter ({} distinct values)",
                        field,
                        role,
                        count
                    );
                    return None;
                }
                Some(FilterField {
                    role,
                    label: field_label(&field),
                    source_field: field,
                    values,
                })
            })
            .collect()
    }

    /// Classify a status value into a health bucket.
    ///
    /// Keywords match whole words of the lower-cased, whitespace-collapsed
    /// value. Buckets are tried ready, blocked, in-progress; the first with
    /// a match wins. A match lying inside a longer match from another bucket
    /// does not count, so "not supported" is blocked even though "supported"
    /// is a ready keyword. Values matching nothing stay unclassified.
    pub fn classify_status(&self, value: &str) -> Option<HealthStatus> {
        let text = value
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        if text.is_empty() {
            return None;
        }

        let buckets = [
            (HealthStatus::Ready, &self.config.ready_keywords),
            (HealthStatus::Blocked, &self.config.blocked_keywords),
            (HealthStatus::InProgress, &self.config.in_progress_keywords),
        ];
        let spans: Vec<(HealthStatus, Vec<(usize, usize)>)> = buckets
            .iter()
            .map(|(status, keywords)| {
                let found = keywords
                    .iter()
                    .flat_map(|k| word_spans(&text, &k.to_lowercase()))
                    .collect();
                (*status, found)
            })
            .collect();

        spans.iter().find_map(|(status, own)| {
            let masked = |span: &(usize, usize)| {
                spans
                    .iter()
                    .filter(|(other, _)| other != status)
                    .flat_map(|(_, others)| others.iter())
                    .any(|o| o.0 <= span.0 && span.1 <= o.1 && o.1 - o.0 > span.1 - span.0)
            };
            own.iter().any(|s| !masked(s)).then_some(*status)
        })
    }
}

/// Byte spans of `keyword` in `text` bounded by non-alphanumeric characters.
fn word_spans(text: &str, keyword: &str) -> Vec<(usize, usize)> {
    if keyword.is_empty() {
        return Vec::new();
    }
    text.match_indices(keyword)
        .filter(|(start, _)| {
            let end = start + keyword.len();
            let before = text[..*start].chars().next_back();
            let after = text[end..].chars().next();
            !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
        })
        .map(|(start, _)| (start, start + keyword.len()))
        .collect()
}
