use crate::error::{PipelineError, Result};
use crate::types::{Cell, Table};
use csv::ReaderBuilder;
use reqwest::blocking::Client;
use serde_json::Value;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Anything that can hand the pipeline one snapshot of the tracking sheet.
pub trait RecordSource {
    /// Human-readable identifier used in logs and errors.
    fn describe(&self) -> String;

    fn fetch(&self) -> Result<Table>;
}

/// A CSV or JSON export on local disk.
pub struct FileSource {
    pub path: PathBuf,
}

impl RecordSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self) -> Result<Table> {
        let body = std::fs::read_to_string(&self.path).map_err(|e| PipelineError::Fetch {
            source_id: self.describe(),
            reason: e.to_string(),
        })?;
        let is_json = self
            .path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));
        let table = if is_json {
            decode_json(&body, &self.describe())?
        } else {
            decode_csv(&body, &self.describe())?
        };
        ensure_rows(table, &self.describe())
    }
}

/// A sheet export served over HTTP(S), authenticated with a bearer token.
/// The body may be CSV, a JSON array of row objects, or a Sheets-style
/// `{"values": [[header...], [row...]]}` document.
pub struct HttpSource {
    pub url: String,
    pub token: String,
    pub timeout: Duration,
}

impl RecordSource for HttpSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    fn fetch(&self) -> Result<Table> {
        let fetch_err = |e: reqwest::Error| PipelineError::Fetch {
            source_id: self.describe(),
            reason: e.to_string(),
        };
        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(fetch_err)?;
        info!(url = %self.url, "fetching sheet export");
        let body = client
            .get(&self.url)
            .bearer_auth(&self.token)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.text())
            .map_err(fetch_err)?;
        debug!(bytes = body.len(), "sheet export downloaded");

        let trimmed = body.trim_start();
        let table = if trimmed.starts_with('[') || trimmed.starts_with('{') {
            decode_json(&body, &self.describe())?
        } else {
            decode_csv(&body, &self.describe())?
        };
        ensure_rows(table, &self.describe())
    }
}

/// Pick a source for an identifier: URLs go over HTTP and need a token,
/// anything else is a local path.
pub fn source_for(id: &str, token: Option<&str>) -> Result<Box<dyn RecordSource>> {
    let id = id.trim();
    if id.is_empty() {
        return Err(PipelineError::MissingSource);
    }
    if id.starts_with("http://") || id.starts_with("https://") {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| PipelineError::MissingSecret(id.to_string()))?;
        return Ok(Box::new(HttpSource {
            url: id.to_string(),
            token: token.to_string(),
            timeout: Duration::from_secs(60),
        }));
    }
    Ok(Box::new(FileSource {
        path: PathBuf::from(id),
    }))
}

fn ensure_rows(table: Table, source_id: &str) -> Result<Table> {
    if table.is_empty() {
        return Err(PipelineError::EmptySource(source_id.to_string()));
    }
    info!(source = %source_id, rows = table.len(), columns = table.headers.len(), "data loaded");
    Ok(table)
}

fn push_unless_blank(table: &mut Table, row: Vec<Cell>) {
    if row.iter().all(Cell::is_empty) {
        return;
    }
    table.push_row(row);
}

pub fn decode_csv(body: &str, source_id: &str) -> Result<Table> {
    let decode_err = |e: csv::Error| PipelineError::Decode {
        source_id: source_id.to_string(),
        reason: e.to_string(),
    };
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .from_reader(body.as_bytes());
    let headers: Vec<String> = rdr
        .headers()
        .map_err(decode_err)?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();
    let mut table = Table::new(headers);
    for result in rdr.records() {
        let record = result.map_err(decode_err)?;
        push_unless_blank(&mut table, record.iter().map(Cell::from_text).collect());
    }
    Ok(table)
}

pub fn decode_json(body: &str, source_id: &str) -> Result<Table> {
    let decode_err = |reason: String| PipelineError::Decode {
        source_id: source_id.to_string(),
        reason,
    };
    let doc: Value = serde_json::from_str(body).map_err(|e| decode_err(e.to_string()))?;
    match doc {
        Value::Array(rows) => table_from_objects(&rows).map_err(decode_err),
        Value::Object(mut obj) => match obj.remove("values") {
            Some(Value::Array(grid)) => table_from_grid(&grid).map_err(decode_err),
            _ => Err(decode_err("expected an array of rows or a \"values\" grid".into())),
        },
        _ => Err(decode_err("expected an array of rows or a \"values\" grid".into())),
    }
}

fn table_from_objects(rows: &[Value]) -> std::result::Result<Table, String> {
    let mut headers: Vec<String> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    for row in rows {
        let obj = row
            .as_object()
            .ok_or_else(|| "row is not a JSON object".to_string())?;
        for key in obj.keys() {
            if seen.insert(key.as_str()) {
                headers.push(key.clone());
            }
        }
    }
    let mut table = Table::new(headers);
    for row in rows {
        if let Some(obj) = row.as_object() {
            let cells = table
                .headers
                .iter()
                .map(|h| obj.get(h).map(Cell::from_json).unwrap_or(Cell::Empty))
                .collect();
            push_unless_blank(&mut table, cells);
        }
    }
    Ok(table)
}

fn table_from_grid(grid: &[Value]) -> std::result::Result<Table, String> {
    let mut rows = grid.iter().map(|r| {
        r.as_array()
            .ok_or_else(|| "grid row is not an array".to_string())
    });
    let headers: Vec<String> = match rows.next() {
        Some(first) => first?
            .iter()
            .map(|v| Cell::from_json(v).as_text().into_owned())
            .collect(),
        None => return Ok(Table::default()),
    };
    let mut table = Table::new(headers);
    for row in rows {
        push_unless_blank(&mut table, row?.iter().map(Cell::from_json).collect());
    }
    Ok(table)
}
