//! Stand-in source for a deployment whose backend could not be set up

use async_trait::async_trait;

use super::{FormatGrid, SheetRange, SheetSource, TabInfo, ValueGrid};
use crate::error::SourceError;

/// A [`SheetSource`] that fails every call with the error that kept the
/// real backend from being built.
#[derive(Debug, Clone)]
pub struct UnavailableSource {
    reason: SourceError,
}

impl UnavailableSource {
    pub fn new(reason: SourceError) -> Self {
        Self { reason }
    }

    pub fn reason(&self) -> &SourceError {
        &self.reason
    }
}

#[async_trait]
impl SheetSource for UnavailableSource {
    async fn list_tabs(&self) -> Result<Vec<TabInfo>, SourceError> {
        Err(self.reason.clone())
    }

    async fn get_values(&self, _range: &SheetRange) -> Result<ValueGrid, SourceError> {
        Err(self.reason.clone())
    }

    async fn get_formatting(&self, _range: &SheetRange) -> Result<FormatGrid, SourceError> {
        Err(self.reason.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_call_reports_the_reason() {
        let source = UnavailableSource::new(SourceError::NotConfigured("spreadsheet_id".into()));
        let range = SheetRange::new(None, "A:Z");
        assert_eq!(
            source.list_tabs().await,
            Err(SourceError::NotConfigured("spreadsheet_id".into()))
        );
        assert!(source.get_values(&range).await.is_err());
        assert!(source.get_formatting(&range).await.is_err());
    }
}
