//! Spreadsheet reader: loads a CSV table from a local file or a remote URL.
//!
//! The first row is the header row. Headers are exposed both as written
//! (trimmed) and normalized (trimmed + lower-cased); the rest of the crate
//! matches columns by the normalized form.

use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;

use crate::error::{SheetError, ValidationError};

const GOOGLE_SHEETS_PREFIX: &str = "https://docs.google.com/spreadsheets/d/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetSource {
    File(PathBuf),
    Url(String),
}

impl SheetSource {
    pub fn parse(locator: &str) -> Result<Self, ValidationError> {
        let locator = locator.trim();
        if locator.is_empty() {
            return Err(ValidationError::Missing("source"));
        }
        let lower = locator.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Ok(SheetSource::Url(locator.to_string()))
        } else {
            Ok(SheetSource::File(PathBuf::from(locator)))
        }
    }

    pub fn describe(&self) -> String {
        match self {
            SheetSource::File(p) => p.to_string_lossy().to_string(),
            SheetSource::Url(u) => u.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SheetCredentials {
    pub access_token: Option<String>,
    pub timeout: Duration,
}

impl Default for SheetCredentials {
    fn default() -> Self {
        Self {
            access_token: None,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetColumn {
    /// Header as written in the sheet, trimmed.
    pub label: String,
    /// Trimmed, lower-cased header.
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SheetTable {
    columns: Vec<SheetColumn>,
    rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Copy)]
pub struct SheetRow<'a> {
    table: &'a SheetTable,
    cells: &'a [String],
}

impl<'a> SheetRow<'a> {
    pub fn cell(&self, idx: usize) -> Option<&'a str> {
        self.cells.get(idx).map(String::as_str)
    }

    /// Cell under the first column whose normalized header equals `key`.
    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.table.column_index(key).and_then(|i| self.cell(i))
    }
}

pub fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}').trim().to_lowercase()
}

impl SheetTable {
    pub fn from_csv<R: Read>(reader: R) -> Result<Self, SheetError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut records = rdr.records();
        let header = match records.next() {
            Some(rec) => rec.map_err(|e| SheetError::SourceUnavailable(e.to_string()))?,
            None => {
                return Err(SheetError::SourceUnavailable(
                    "sheet has no header row".to_string(),
                ))
            }
        };
        let columns = header
            .iter()
            .map(|h| SheetColumn {
                label: h.trim_start_matches('\u{feff}').trim().to_string(),
                key: normalize_header(h),
            })
            .collect::<Vec<_>>();

        let mut rows = Vec::new();
        for rec in records {
            let rec = rec.map_err(|e| SheetError::SourceUnavailable(e.to_string()))?;
            if rec.iter().all(|c| c.trim().is_empty()) {
                continue;
            }
            rows.push(rec.iter().map(str::to_string).collect());
        }

        Ok(SheetTable { columns, rows })
    }

    pub fn columns(&self) -> &[SheetColumn] {
        &self.columns
    }

    /// Normalized headers in sheet order.
    pub fn headers(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.key.as_str()).collect()
    }

    pub fn column_index(&self, key: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.key == key)
    }

    pub fn rows(&self) -> impl Iterator<Item = SheetRow<'_>> + '_ {
        self.rows.iter().map(move |cells| SheetRow {
            table: self,
            cells,
        })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Rewrites a Google Sheets document link to its CSV export endpoint.
/// Other URLs are returned unchanged.
pub fn csv_export_url(url: &str) -> String {
    let Some(rest) = url.strip_prefix(GOOGLE_SHEETS_PREFIX) else {
        return url.to_string();
    };
    let id: String = rest
        .chars()
        .take_while(|c| !matches!(c, '/' | '?' | '#'))
        .collect();
    if id.is_empty() || rest[id.len()..].starts_with("/export") {
        return url.to_string();
    }
    let gid = rest.find("gid=").map(|i| {
        rest[i + 4..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect::<String>()
    });
    match gid.filter(|g| !g.is_empty()) {
        Some(gid) => format!("{GOOGLE_SHEETS_PREFIX}{id}/export?format=csv&gid={gid}"),
        None => format!("{GOOGLE_SHEETS_PREFIX}{id}/export?format=csv"),
    }
}

pub fn read_sheet(
    source: &SheetSource,
    credentials: &SheetCredentials,
) -> Result<SheetTable, SheetError> {
    let table = match source {
        SheetSource::File(path) => {
            let file = std::fs::File::open(path).map_err(|e| {
                SheetError::SourceUnavailable(format!("{}: {}", path.to_string_lossy(), e))
            })?;
            SheetTable::from_csv(file)?
        }
        SheetSource::Url(url) => fetch_remote(url, credentials)?,
    };
    tracing::debug!(
        source = %source.describe(),
        headers = ?table.headers(),
        rows = table.row_count(),
        "read sheet"
    );
    Ok(table)
}

fn fetch_remote(url: &str, credentials: &SheetCredentials) -> Result<SheetTable, SheetError> {
    let client = Client::builder()
        .timeout(credentials.timeout)
        .build()
        .map_err(|e| SheetError::SourceUnavailable(format!("http client: {e}")))?;
    fetch_csv(&client, url, credentials.access_token.as_deref())
}

fn fetch_csv(
    client: &Client,
    url: &str,
    access_token: Option<&str>,
) -> Result<SheetTable, SheetError> {
    let export_url = csv_export_url(url);
    let mut req = client.get(&export_url);
    if let Some(token) = access_token {
        req = req.bearer_auth(token);
    }
    let resp = req
        .send()
        .map_err(|e| SheetError::SourceUnavailable(format!("{export_url}: {e}")))?;

    let status = resp.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(SheetError::Auth(format!("{export_url}: HTTP {status}")));
    }
    if !status.is_success() {
        return Err(SheetError::SourceUnavailable(format!(
            "{export_url}: HTTP {status}"
        )));
    }
    let is_html = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase().starts_with("text/html"))
        .unwrap_or(false);
    if is_html {
        return Err(SheetError::SourceUnavailable(format!(
            "{export_url}: expected CSV but got an HTML page (is the sheet shared?)"
        )));
    }

    let body = resp
        .bytes()
        .map_err(|e| SheetError::SourceUnavailable(format!("{export_url}: {e}")))?;
    SheetTable::from_csv(&body[..])
}
