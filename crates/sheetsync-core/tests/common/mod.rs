//! Shared sources and builders for integration tests

use sheetsync_core::{CellFormat, InMemorySource, MemoryTab, SourceError, TextRun};

/// The "Status" tab used across scenarios.
pub fn status_tab() -> MemoryTab {
    MemoryTab::new("Status")
        .row(["Vendor", "Support Status"])
        .row(["Acme", "Fully Supported"])
        .row(["Acme", "Not Supported"])
        .row(["Beta Co", "Tech Preview"])
}

/// A tab mixing every cell variant.
pub fn catalog_tab() -> MemoryTab {
    MemoryTab::new("Catalog")
        .row(["Product Name", "Docs", "Certified"])
        .row(["Widget", "Install guide", "Yes"])
        .row(["Gadget", "See KB article", "no"])
        .format(0, 2, CellFormat::with_comment("Signed off by QA"))
        .format(1, 1, CellFormat::with_hyperlink("https://docs.example.com/widget"))
        .format(
            2,
            1,
            CellFormat::with_runs(vec![
                TextRun::plain("See "),
                TextRun::linked("KB article", "https://kb.example.com/42"),
            ]),
        )
        .format(2, 2, CellFormat::with_comment("Retest in Q3"))
}

/// Status, a work-in-progress tab, and a catalog.
pub fn workbook() -> InMemorySource {
    InMemorySource::new()
        .with_tab(status_tab())
        .with_tab(
            MemoryTab::new("Integrations WIP")
                .row(["Vendor", "Support Status"])
                .row(["Draft Corp", "Supported"]),
        )
        .with_tab(catalog_tab())
}

/// Workbook whose catalog fetch fails.
#[allow(dead_code)]
pub fn workbook_with_failing_tab() -> InMemorySource {
    InMemorySource::new()
        .with_tab(status_tab())
        .with_tab(catalog_tab().failing(SourceError::Status {
            status: 500,
            body: "backend error".into(),
        }))
}
