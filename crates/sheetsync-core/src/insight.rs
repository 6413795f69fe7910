//! Aggregate views over a record sequence: health distribution, per-partner
//! breakdown and certification coverage.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::classifier::{FieldClassifier, HealthStatus, Role};
use crate::record::Record;

/// Record counts per health bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCounts {
    pub ready: usize,
    #[serde(rename = "in-progress")]
    pub in_progress: usize,
    pub blocked: usize,
    pub unclassified: usize,
}

impl HealthCounts {
    pub fn add(&mut self, status: Option<HealthStatus>) {
        match status {
            Some(HealthStatus::Ready) => self.ready += 1,
            Some(HealthStatus::InProgress) => self.in_progress += 1,
            Some(HealthStatus::Blocked) => self.blocked += 1,
            None => self.unclassified += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.ready + self.in_progress + self.blocked + self.unclassified
    }
}

/// Share of affirmative values in a certification-like column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificationRatio {
    pub field: String,
    pub certified: usize,
    /// Records with a non-blank value in the field
    pub total: usize,
    pub ratio: f64,
}

/// Derived aggregates for one record sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insights {
    pub total_records: usize,
    pub status_field: Option<String>,
    pub partner_field: Option<String>,
    /// Present only when a status field was found
    pub health: Option<HealthCounts>,
    /// Health per partner value; empty without both partner and status fields
    pub by_partner: BTreeMap<String, HealthCounts>,
    pub certification: Option<CertificationRatio>,
}

/// Compute insights for a record sequence.
///
/// Status and partner fields are found by name; a blank partner value is
/// grouped under `"(none)"`.
pub fn compute_insights(classifier: &FieldClassifier, records: &[Record]) -> Insights {
    let status_field = classifier.role_field_in(Role::Status, records);
    let partner_field = classifier.role_field_in(Role::Partner, records);

    let status_of = |record: &Record| -> Option<HealthStatus> {
        let field = status_field.as_deref()?;
        record
            .text(field)
            .and_then(|value| classifier.classify_status(&value))
    };

    let health = status_field.as_ref().map(|_| {
        let mut counts = HealthCounts::default();
        for record in records {
            counts.add(status_of(record));
        }
        counts
    });

    let mut by_partner: BTreeMap<String, HealthCounts> = BTreeMap::new();
    if let (Some(partner), Some(_)) = (partner_field.as_deref(), status_field.as_deref()) {
        for record in records {
            let key = record
                .text(partner)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "(none)".to_string());
            by_partner.entry(key).or_default().add(status_of(record));
        }
    }

    Insights {
        total_records: records.len(),
        certification: certification_ratio(classifier, records),
        status_field,
        partner_field,
        health,
        by_partner,
    }
}

fn certification_ratio(classifier: &FieldClassifier, records: &[Record]) -> Option<CertificationRatio> {
    let config = classifier.config();
    let first = records.first()?;
    let field = first.fields.names().find(|name| {
        let name = name.to_lowercase();
        config
            .certification_keywords
            .iter()
            .any(|k| name.contains(&k.to_lowercase()))
    })?;

    let affirmative: Vec<String> = config
        .affirmative_values
        .iter()
        .map(|v| v.to_lowercase())
        .collect();

    let (certified, total) = records
        .iter()
        .filter_map(|r| r.text(field))
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .fold((0, 0), |(certified, total), v| {
            let hit = affirmative.iter().any(|a| *a == v);
            (certified + usize::from(hit), total + 1)
        });

    let ratio = if total == 0 {
        0.0
    } else {
        certified as f64 / total as f64
    };
    Some(CertificationRatio {
        field: field.to_string(),
        certified,
        total,
        ratio,
    })
}
