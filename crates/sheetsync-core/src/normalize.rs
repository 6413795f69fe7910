//! Cell normalization: raw value plus formatting metadata into one [`Cell`].

use serde::{Deserialize, Serialize};

use crate::cell::{Cell, TextRun};

/// Formatting metadata for one cell, positionally aligned with its value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellFormat {
    /// Hyperlink covering the whole cell
    #[serde(default)]
    pub hyperlink: Option<String>,
    /// Rich-text runs, in display order
    #[serde(default)]
    pub text_runs: Option<Vec<TextRun>>,
    /// Reviewer comment / note
    #[serde(default)]
    pub comment: Option<String>,
}

impl CellFormat {
    pub fn with_hyperlink(url: impl Into<String>) -> Self {
        Self {
            hyperlink: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn with_comment(comment: impl Into<String>) -> Self {
        Self {
            comment: Some(comment.into()),
            ..Default::default()
        }
    }

    pub fn with_runs(runs: Vec<TextRun>) -> Self {
        Self {
            text_runs: Some(runs),
            ..Default::default()
        }
    }
}

/// Fold a raw value and its (possibly missing) formatting into a [`Cell`].
///
/// Precedence: any linked run makes the whole cell `RichText`; otherwise a
/// whole-cell hyperlink on non-blank text makes it a `Link`; otherwise a
/// comment makes it `Annotated`; otherwise `Plain`. Runs whose text does not
/// reassemble into the raw value are treated as malformed and the cell
/// degrades to `Plain` with the raw text.
pub fn normalize_cell(raw: &str, format: Option<&CellFormat>) -> Cell {
    let Some(format) = format else {
        return Cell::plain(raw);
    };

    let comment = non_blank(format.comment.as_deref());

    if let Some(runs) = format.text_runs.as_deref() {
        if runs.iter().any(|r| non_blank(r.url.as_deref()).is_some()) {
            let joined: String = runs.iter().map(|r| r.text.as_str()).collect();
            if joined != raw {
                tracing::debug!(
                    "Text runs do not reassemble cell value ({:?} vs {:?}), keeping plain text",
                    joined,
                    raw
                );
                return Cell::plain(raw);
            }
            let runs = runs
                .iter()
                .map(|r| TextRun {
                    text: r.text.clone(),
                    url: non_blank(r.url.as_deref()).map(str::to_string),
                })
                .collect();
            return Cell::RichText {
                runs,
                comment: comment.map(str::to_string),
            };
        }
    }

    if let Some(url) = non_blank(format.hyperlink.as_deref()) {
        if !raw.trim().is_empty() {
            return Cell::Link {
                text: raw.to_string(),
                url: url.to_string(),
                comment: comment.map(str::to_string),
            };
        }
    }

    match comment {
        Some(comment) => Cell::Annotated {
            text: raw.to_string(),
            comment: comment.to_string(),
        },
        None => Cell::plain(raw),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
