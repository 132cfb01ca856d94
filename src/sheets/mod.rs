//! Record source adapter.
//!
//! Reads the first worksheet of the inventory spreadsheet through the
//! Sheets v4 REST API and maps each row (columns A..H, header skipped)
//! onto a [`Costume`]. Missing cells become empty strings or `false`.

pub mod auth;
pub mod drive;

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::model::Costume;
use auth::{ServiceAccountKey, TokenProvider};

pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
pub const DEFAULT_SHEET_NAME: &str = "Sheet1";
pub const COSTUME_COLUMNS: &str = "A2:H";
pub const AVAILABLE_MARKER: &str = "TRUE";

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("invalid service account credentials: {source}")]
    Credentials {
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to sign token assertion: {source}")]
    Signing {
        #[source]
        source: jsonwebtoken::errors::Error,
    },

    #[error("failed to build HTTP client: {source}")]
    HttpClientBuild {
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid sheets API base URL: {url}")]
    InvalidApiBase { url: String },

    #[error("request failed: {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("token exchange rejected with status {status}: {body}")]
    Token { status: u16, body: String },

    #[error("sheets API returned status {status} for {url}: {body}")]
    Status { url: String, status: u16, body: String },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to read rows file: {path}: {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse rows file: {path}: {source}")]
    FileDecode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Default, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Default, Deserialize)]
struct SheetMeta {
    #[serde(default)]
    properties: Option<SheetProperties>,
}

#[derive(Debug, Default, Deserialize)]
struct SheetProperties {
    #[serde(default)]
    title: Option<String>,
}

/// Shape of a `values.get` response. Also accepted as a local rows file.
#[derive(Debug, Default, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Option<Vec<Vec<serde_json::Value>>>,
}

impl ValueRange {
    fn into_rows(self) -> Vec<Vec<String>> {
        self.values
            .unwrap_or_default()
            .into_iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect()
    }
}

fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        serde_json::Value::Bool(true) => AVAILABLE_MARKER.to_string(),
        serde_json::Value::Bool(false) => "FALSE".to_string(),
        other => other.to_string(),
    }
}

fn first_sheet_title(meta: &SpreadsheetMeta) -> String {
    meta.sheets
        .first()
        .and_then(|s| s.properties.as_ref())
        .and_then(|p| p.title.as_deref())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_SHEET_NAME)
        .to_string()
}

/// Builds an A1 range, quoting sheet titles that are not plain words.
pub fn a1_range(sheet_title: &str, columns: &str) -> String {
    let plain = sheet_title
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_');
    if plain {
        format!("{sheet_title}!{columns}")
    } else {
        format!("'{}'!{columns}", sheet_title.replace('\'', "''"))
    }
}

pub fn parse_available(cell: &str) -> bool {
    cell == AVAILABLE_MARKER
}

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(String::as_str).unwrap_or_default()
}

pub fn row_to_costume(row: &[String]) -> Costume {
    Costume {
        id: cell(row, 0).to_string(),
        name: cell(row, 1).to_string(),
        category: cell(row, 2).to_string(),
        size: cell(row, 3).to_string(),
        color: cell(row, 4).to_string(),
        image_url: drive::normalize_image_url(cell(row, 5)),
        description: cell(row, 6).to_string(),
        available: parse_available(cell(row, 7)),
    }
}

pub fn rows_to_costumes(rows: &[Vec<String>]) -> Vec<Costume> {
    rows.iter().map(|row| row_to_costume(row)).collect()
}

#[derive(Clone, Debug)]
pub struct SheetsOptions {
    pub spreadsheet_id: String,
    pub credentials_json: String,
    pub timeout_seconds: usize,
    pub api_base: String,
}

impl Default for SheetsOptions {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            credentials_json: String::new(),
            timeout_seconds: 10,
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SheetsClient {
    spreadsheet_id: String,
    api_base: reqwest::Url,
    http: reqwest::Client,
    tokens: Arc<TokenProvider>,
}

fn build_http_client(timeout_seconds: usize) -> Result<reqwest::Client, SheetsError> {
    let timeout = Duration::from_secs(timeout_seconds.try_into().unwrap_or(10));
    reqwest::Client::builder()
        .user_agent(concat!("costume-gallery/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
        .map_err(|e| SheetsError::HttpClientBuild { source: e })
}

impl SheetsClient {
    pub fn new(options: &SheetsOptions) -> Result<Self, SheetsError> {
        let key = ServiceAccountKey::from_json(&options.credentials_json)?;
        let api_base =
            reqwest::Url::parse(&options.api_base).map_err(|_| SheetsError::InvalidApiBase {
                url: options.api_base.clone(),
            })?;
        if api_base.cannot_be_a_base() {
            return Err(SheetsError::InvalidApiBase {
                url: options.api_base.clone(),
            });
        }
        let http = build_http_client(options.timeout_seconds)?;
        Ok(Self {
            spreadsheet_id: options.spreadsheet_id.clone(),
            api_base,
            tokens: Arc::new(TokenProvider::new(key, http.clone())),
            http,
        })
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    fn endpoint(&self, segments: &[&str]) -> reqwest::Url {
        let mut url = self.api_base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push(&self.spreadsheet_id);
            for segment in segments {
                path.push(segment);
            }
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: reqwest::Url) -> Result<T, SheetsError> {
        let token = self.tokens.access_token().await?;
        let resp = self
            .http
            .get(url.clone())
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| SheetsError::Request {
                url: url.to_string(),
                source: e,
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SheetsError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<T>().await.map_err(|e| SheetsError::Decode {
            url: url.to_string(),
            source: e,
        })
    }

    /// Title of the first worksheet, or [`DEFAULT_SHEET_NAME`].
    pub async fn first_sheet_title(&self) -> Result<String, SheetsError> {
        let mut url = self.endpoint(&[]);
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties.title");
        let meta: SpreadsheetMeta = self.get_json(url).await?;
        Ok(first_sheet_title(&meta))
    }

    pub async fn fetch_rows(&self) -> Result<Vec<Vec<String>>, SheetsError> {
        let title = self.first_sheet_title().await?;
        let range = a1_range(&title, COSTUME_COLUMNS);
        debug!(spreadsheet = %self.spreadsheet_id, %range, "fetching rows");
        let values: ValueRange = self.get_json(self.endpoint(&["values", range.as_str()])).await?;
        Ok(values.into_rows())
    }
}

/// Where snapshot rows come from.
#[derive(Clone, Debug)]
pub enum RecordSource {
    Sheets(SheetsClient),
    /// A saved `values.get` response (`{"values": [[...], ...]}`), re-read on every fetch.
    FilePath(String),
    Inline(Vec<Vec<String>>),
}

impl RecordSource {
    pub fn inline<R, C>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = C>,
        C: Into<String>,
    {
        Self::Inline(
            rows.into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        )
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Sheets(client) => format!("sheets:{}", client.spreadsheet_id()),
            Self::FilePath(path) => format!("file:{path}"),
            Self::Inline(rows) => format!("inline:{} rows", rows.len()),
        }
    }

    pub async fn fetch_rows(&self) -> Result<Vec<Vec<String>>, SheetsError> {
        match self {
            Self::Sheets(client) => client.fetch_rows().await,
            Self::FilePath(path) => load_rows_file(path).await,
            Self::Inline(rows) => Ok(rows.clone()),
        }
    }

    pub async fn fetch_costumes(&self) -> Result<Vec<Costume>, SheetsError> {
        let rows = self.fetch_rows().await?;
        Ok(rows_to_costumes(&rows))
    }
}

async fn load_rows_file(path: &str) -> Result<Vec<Vec<String>>, SheetsError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SheetsError::FileRead {
            path: path.to_string(),
            source: e,
        })?;
    let values: ValueRange = serde_json::from_str(&raw).map_err(|e| SheetsError::FileDecode {
        path: path.to_string(),
        source: e,
    })?;
    Ok(values.into_rows())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn maps_columns_positionally() {
        let costume = row_to_costume(&row(&[
            "c-1",
            "Rose Gown",
            "Dress",
            "M",
            "Red",
            "https://drive.google.com/file/d/IMG1/view",
            "Silk gown",
            "TRUE",
            "ignored extra column",
        ]));
        assert_eq!(costume.id, "c-1");
        assert_eq!(costume.name, "Rose Gown");
        assert_eq!(costume.category, "Dress");
        assert_eq!(costume.size, "M");
        assert_eq!(costume.color, "Red");
        assert_eq!(
            costume.image_url,
            "https://drive.google.com/uc?export=view&id=IMG1"
        );
        assert_eq!(costume.description, "Silk gown");
        assert!(costume.available);
    }

    #[test]
    fn short_rows_take_defaults() {
        let costume = row_to_costume(&row(&["c-2", "Cape"]));
        assert_eq!(costume.id, "c-2");
        assert_eq!(costume.name, "Cape");
        assert_eq!(costume.category, "");
        assert_eq!(costume.image_url, "");
        assert!(!costume.available);

        assert_eq!(row_to_costume(&[]), Costume::default());
    }

    #[test]
    fn availability_is_exact_match() {
        assert!(parse_available("TRUE"));
        assert!(!parse_available("true"));
        assert!(!parse_available("True"));
        assert!(!parse_available(""));
        assert!(!parse_available(" TRUE"));
    }

    #[test]
    fn first_sheet_title_falls_back() {
        assert_eq!(first_sheet_title(&SpreadsheetMeta::default()), "Sheet1");

        let meta: SpreadsheetMeta =
            serde_json::from_str(r#"{"sheets":[{"properties":{"title":"  "}}]}"#).unwrap();
        assert_eq!(first_sheet_title(&meta), "Sheet1");

        let meta: SpreadsheetMeta = serde_json::from_str(
            r#"{"sheets":[{"properties":{"title":"衣装"}},{"properties":{"title":"Other"}}]}"#,
        )
        .unwrap();
        assert_eq!(first_sheet_title(&meta), "衣装");
    }

    #[test]
    fn a1_range_quotes_titles_with_spaces() {
        assert_eq!(a1_range("Sheet1", COSTUME_COLUMNS), "Sheet1!A2:H");
        assert_eq!(a1_range("My Sheet", COSTUME_COLUMNS), "'My Sheet'!A2:H");
        assert_eq!(a1_range("Bob's", COSTUME_COLUMNS), "'Bob''s'!A2:H");
    }

    #[test]
    fn missing_values_is_empty_not_error() {
        let values: ValueRange = serde_json::from_str(r#"{"range":"Sheet1!A2:H1000"}"#).unwrap();
        assert!(values.into_rows().is_empty());
    }

    #[test]
    fn non_string_cells_are_stringified() {
        let values: ValueRange =
            serde_json::from_str(r#"{"values":[["7","Hat",null,3,"","",true]]}"#).unwrap();
        let rows = values.into_rows();
        assert_eq!(rows[0], row(&["7", "Hat", "", "3", "", "", "TRUE"]));
    }

    #[test]
    fn client_rejects_bad_credentials() {
        let err = SheetsClient::new(&SheetsOptions {
            spreadsheet_id: "sheet".to_string(),
            credentials_json: "not json".to_string(),
            ..SheetsOptions::default()
        })
        .unwrap_err();
        assert!(matches!(err, SheetsError::Credentials { .. }));
    }

    #[tokio::test]
    async fn inline_source_maps_rows() {
        let source = RecordSource::inline([
            vec!["1", "Alice", "Dress", "S"],
            vec!["2", "Bob", "Suit", "L", "", "", "", "TRUE"],
        ]);
        let costumes = source.fetch_costumes().await.unwrap();
        assert_eq!(costumes.len(), 2);
        assert_eq!(costumes[0].name, "Alice");
        assert!(!costumes[0].available);
        assert!(costumes[1].available);
    }

    #[tokio::test]
    async fn file_source_reads_values_document() {
        let path = std::env::temp_dir().join(format!(
            "costume_gallery_rows_{}.json",
            std::process::id()
        ));
        std::fs::write(
            &path,
            r#"{"values":[["9","Veil","Accessory","","White","https://drive.google.com/open?id=V9","","TRUE"]]}"#,
        )
        .unwrap();
        let source = RecordSource::FilePath(path.to_string_lossy().to_string());
        let costumes = source.fetch_costumes().await.unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(costumes.len(), 1);
        assert_eq!(
            costumes[0].image_url,
            "https://drive.google.com/uc?export=view&id=V9"
        );
        assert!(costumes[0].available);
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let source = RecordSource::FilePath("/nonexistent/costume_rows.json".to_string());
        let err = source.fetch_rows().await.unwrap_err();
        assert!(matches!(err, SheetsError::FileRead { .. }));
    }
}
