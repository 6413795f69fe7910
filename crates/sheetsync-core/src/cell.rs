//! The unified cell model.
//!
//! A spreadsheet cell arrives with a value, and optionally a whole-cell
//! hyperlink, rich-text runs, and a reviewer comment. Every combination is
//! folded into exactly one [`Cell`] variant. Consumers that need text
//! (search, filter, classification, export) go through
//! [`Cell::canonical_text`], never through the variant's fields.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One run of rich text, optionally linked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl TextRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: None,
        }
    }

    pub fn linked(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: Some(url.into()),
        }
    }
}

/// A normalized spreadsheet cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Cell {
    /// Bare text
    Plain { text: String },
    /// Whole-cell hyperlink
    Link {
        text: String,
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        comment: Option<String>,
    },
    /// Run sequence where at least one run is linked
    RichText {
        runs: Vec<TextRun>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        comment: Option<String>,
    },
    /// Text carrying a reviewer comment, no link
    Annotated { text: String, comment: String },
}

impl Cell {
    pub fn plain(text: impl Into<String>) -> Self {
        Cell::Plain { text: text.into() }
    }

    pub fn empty() -> Self {
        Cell::Plain {
            text: String::new(),
        }
    }

    /// The single display string all comparisons operate on.
    pub fn canonical_text(&self) -> Cow<'_, str> {
        match self {
            Cell::Plain { text } | Cell::Link { text, .. } | Cell::Annotated { text, .. } => {
                Cow::Borrowed(text.as_str())
            }
            Cell::RichText { runs, .. } => match runs.as_slice() {
                [single] => Cow::Borrowed(single.text.as_str()),
                _ => Cow::Owned(runs.iter().map(|r| r.text.as_str()).collect()),
            },
        }
    }

    /// Link targets carried by the cell, in display order.
    pub fn link_targets(&self) -> Vec<&str> {
        match self {
            Cell::Link { url, .. } => vec![url.as_str()],
            Cell::RichText { runs, .. } => runs.iter().filter_map(|r| r.url.as_deref()).collect(),
            Cell::Plain { .. } | Cell::Annotated { .. } => Vec::new(),
        }
    }

    pub fn comment(&self) -> Option<&str> {
        match self {
            Cell::Link { comment, .. } | Cell::RichText { comment, .. } => comment.as_deref(),
            Cell::Annotated { comment, .. } => Some(comment.as_str()),
            Cell::Plain { .. } => None,
        }
    }

    /// True when the canonical text is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.canonical_text().trim().is_empty()
    }

    /// Case-insensitive substring match against the canonical text and,
    /// for linked cells, the link targets. `needle` must already be
    /// lower-cased.
    pub fn matches_lowercase(&self, needle: &str) -> bool {
        self.canonical_text().to_lowercase().contains(needle)
            || self
                .link_targets()
                .iter()
                .any(|url| url.to_lowercase().contains(needle))
    }
}

impl Default for Cell {
    fn default() -> Self {
        Cell::empty()
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_text_of_each_variant() {
        assert_eq!(Cell::plain("Acme").canonical_text(), "Acme");
        let link = Cell::Link {
            text: "Docs".into(),
            url: "https://example.com/docs".into(),
            comment: None,
        };
        assert_eq!(link.canonical_text(), "Docs");
        let rich = Cell::RichText {
            runs: vec![TextRun::plain("See "), TextRun::linked("KB-12", "https://kb/12")],
            comment: None,
        };
        assert_eq!(rich.canonical_text(), "See KB-12");
        let note = Cell::Annotated {
            text: "Pending".into(),
            comment: "waiting on vendor".into(),
        };
        assert_eq!(note.canonical_text(), "Pending");
    }

    #[test]
    fn link_targets_only_from_linked_variants() {
        let rich = Cell::RichText {
            runs: vec![
                TextRun::linked("a", "https://a"),
                TextRun::plain(" and "),
                TextRun::linked("b", "https://b"),
            ],
            comment: None,
        };
        assert_eq!(rich.link_targets(), vec!["https://a", "https://b"]);
        assert!(Cell::plain("https://not-a-link").link_targets().is_empty());
    }

    #[test]
    fn matches_url_text() {
        let link = Cell::Link {
            text: "Guide".into(),
            url: "https://docs.vendor.io/CSI".into(),
            comment: Some("reviewed".into()),
        };
        assert!(link.matches_lowercase("vendor.io"));
        assert!(link.matches_lowercase("guide"));
        assert!(!link.matches_lowercase("reviewed"));
    }

    #[test]
    fn blank_detection_ignores_whitespace() {
        assert!(Cell::plain("   ").is_blank());
        assert!(Cell::empty().is_blank());
        assert!(!Cell::plain(" x ").is_blank());
    }

    #[test]
    fn serde_keeps_variant() {
        let cells = vec![
            Cell::plain("x"),
            Cell::Link {
                text: "t".into(),
                url: "u".into(),
                comment: Some("c".into()),
            },
            Cell::RichText {
                runs: vec![TextRun::plain("a"), TextRun::linked("b", "u")],
                comment: None,
            },
            Cell::Annotated {
                text: "t".into(),
                comment: "c".into(),
            },
        ];
        let json = serde_json::to_string(&cells).unwrap();
        let back: Vec<Cell> = serde_json::from_str(&json).unwrap();
        assert_eq!(cells, back);
    }
}
