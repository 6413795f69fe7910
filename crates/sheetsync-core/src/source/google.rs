//! Google Sheets v4 REST source using reqwest
//!
//! API docs: https://developers.google.com/sheets/api/reference/rest
//!
//! Credentials are not acquired here: the source is handed an already-issued
//! OAuth bearer token or an API key.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{FormatGrid, SheetRange, SheetSource, TabInfo, ValueGrid};
use crate::cell::TextRun;
use crate::config::SourceConfig;
use crate::error::SourceError;
use crate::normalize::CellFormat;

const TAB_FIELDS: &str = "sheets.properties(title,gridProperties(rowCount,columnCount))";
const FORMAT_FIELDS: &str =
    "sheets.data.rowData.values(formattedValue,hyperlink,note,textFormatRuns(startIndex,format.link.uri))";

/// How requests are authorized.
#[derive(Debug, Clone)]
pub enum GoogleAuth {
    /// OAuth access token sent as `Authorization: Bearer`
    Bearer(String),
    /// API key sent as the `key` query parameter (public sheets only)
    ApiKey(String),
}

/// Spreadsheet metadata response
#[derive(Debug, Deserialize)]
struct SpreadsheetResponse {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: Option<SheetProperties>,
    #[serde(default)]
    data: Vec<GridData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    title: String,
    grid_properties: Option<GridProperties>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GridProperties {
    #[serde(default)]
    row_count: u32,
    #[serde(default)]
    column_count: u32,
}

/// `values.get` response
#[derive(Debug, Deserialize)]
struct ValueRangeResponse {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GridData {
    #[serde(default)]
    row_data: Vec<RowData>,
}

#[derive(Debug, Deserialize)]
struct RowData {
    #[serde(default)]
    values: Vec<CellData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CellData {
    formatted_value: Option<String>,
    hyperlink: Option<String>,
    note: Option<String>,
    text_format_runs: Option<Vec<TextFormatRun>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TextFormatRun {
    #[serde(default)]
    start_index: usize,
    format: Option<TextFormat>,
}

#[derive(Debug, Deserialize)]
struct TextFormat {
    link: Option<LinkTarget>,
}

#[derive(Debug, Deserialize)]
struct LinkTarget {
    uri: Option<String>,
}

/// Google Sheets client bound to one spreadsheet.
pub struct GoogleSheetsSource {
    client: Client,
    api_base: String,
    spreadsheet_id: String,
    auth: GoogleAuth,
}

impl GoogleSheetsSource {
    pub fn new(
        spreadsheet_id: impl Into<String>,
        auth: GoogleAuth,
        api_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            auth,
        })
    }

    /// Build from configuration, reading the token or API key from the
    /// environment variables the config names.
    pub fn from_config(config: &SourceConfig) -> Result<Self, SourceError> {
        if config.spreadsheet_id.trim().is_empty() {
            return Err(SourceError::NotConfigured(
                "spreadsheet_id is empty".to_string(),
            ));
        }

        let auth = std::env::var(&config.access_token_env)
            .ok()
            .filter(|t| !t.is_empty())
            .map(GoogleAuth::Bearer)
            .or_else(|| {
                std::env::var(&config.api_key_env)
                    .ok()
                    .filter(|k| !k.is_empty())
                    .map(GoogleAuth::ApiKey)
            })
            .ok_or_else(|| {
                SourceError::NotConfigured(format!(
                    "neither {} nor {} is set",
                    config.access_token_env, config.api_key_env
                ))
            })?;

        Self::new(
            config.spreadsheet_id.clone(),
            auth,
            config.api_base.clone(),
            Duration::from_secs(config.timeout_seconds),
        )
    }

    fn spreadsheet_url(&self) -> String {
        format!("{}/v4/spreadsheets/{}", self.api_base, self.spreadsheet_id)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<T, SourceError> {
        let mut request = self.client.get(url).query(params);
        request = match &self.auth {
            GoogleAuth::Bearer(token) => request.bearer_auth(token),
            GoogleAuth::ApiKey(key) => request.query(&[("key", key.as_str())]),
        };

        let response = request.send().await?;
        let status = response.status();

        if status.as_u16() == 429 {
            return Err(SourceError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))
    }
}

#[async_trait]
impl SheetSource for GoogleSheetsSource {
    async fn list_tabs(&self) -> Result<Vec<TabInfo>, SourceError> {
        let response: SpreadsheetResponse = self
            .get_json(&self.spreadsheet_url(), &[("fields", TAB_FIELDS)])
            .await?;

        Ok(response
            .sheets
            .into_iter()
            .filter_map(|s| s.properties)
            .map(|p| {
                let grid = p.grid_properties.unwrap_or_default();
                TabInfo::new(p.title, grid.row_count, grid.column_count)
            })
            .collect())
    }

    async fn get_values(&self, range: &SheetRange) -> Result<ValueGrid, SourceError> {
        let url = format!(
            "{}/values/{}",
            self.spreadsheet_url(),
            urlencoding::encode(&range.to_a1())
        );
        let response: ValueRangeResponse = self
            .get_json(&url, &[("valueRenderOption", "FORMATTED_VALUE")])
            .await?;

        Ok(response
            .values
            .into_iter()
            .map(|row| row.into_iter().map(value_to_string).collect())
            .collect())
    }

    async fn get_formatting(&self, range: &SheetRange) -> Result<FormatGrid, SourceError> {
        let a1 = range.to_a1();
        let response: SpreadsheetResponse = self
            .get_json(
                &self.spreadsheet_url(),
                &[
                    ("ranges", a1.as_str()),
                    ("includeGridData", "true"),
                    ("fields", FORMAT_FIELDS),
                ],
            )
            .await?;

        // Row data is indexed relative to the requested range, the same
        // origin the values retrieval uses.
        let grid = response
            .sheets
            .into_iter()
            .flat_map(|s| s.data)
            .next()
            .map(|g| g.row_data)
            .unwrap_or_default();

        Ok(grid
            .into_iter()
            .map(|row| row.values.into_iter().map(cell_format).collect())
            .collect())
    }
}

fn value_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn cell_format(cell: CellData) -> CellFormat {
    let text_runs = match (&cell.formatted_value, cell.text_format_runs) {
        (Some(value), Some(runs)) if !runs.is_empty() => Some(runs_to_spans(value, runs)),
        _ => None,
    };
    CellFormat {
        hyperlink: cell.hyperlink,
        text_runs,
        comment: cell.note,
    }
}

/// Convert Sheets text-format runs (UTF-16 start offsets) into text spans.
fn runs_to_spans(value: &str, mut runs: Vec<TextFormatRun>) -> Vec<TextRun> {
    let units: Vec<u16> = value.encode_utf16().collect();
    runs.sort_by_key(|r| r.start_index);

    let mut spans = Vec::with_capacity(runs.len() + 1);
    if let Some(first) = runs.first() {
        let head = first.start_index.min(units.len());
        if head > 0 {
            spans.push(TextRun::plain(String::from_utf16_lossy(&units[..head])));
        }
    }

    for (i, run) in runs.iter().enumerate() {
        let start = run.start_index.min(units.len());
        let end = runs
            .get(i + 1)
            .map(|next| next.start_index)
            .unwrap_or(units.len())
            .min(units.len());
        if start >= end {
            continue;
        }
        let url = run
            .format
            .as_ref()
            .and_then(|f| f.link.as_ref())
            .and_then(|l| l.uri.clone());
        spans.push(TextRun {
            text: String::from_utf16_lossy(&units[start..end]),
            url,
        });
    }

    spans
}
