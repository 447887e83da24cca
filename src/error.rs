use thiserror::Error;

/// Failures that stop a run. Row-level data problems never show up here;
/// they are absorbed by the normalizer and the metrics engine.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("no data source configured (set SHEET_SOURCE or pass --source)")]
    MissingSource,

    #[error("source {0} requires an access token (set SHEET_ACCESS_TOKEN or pass --token)")]
    MissingSecret(String),

    #[error("fetch failed for {source_id}: {reason}")]
    Fetch { source_id: String, reason: String },

    #[error("could not decode {source_id}: {reason}")]
    Decode { source_id: String, reason: String },

    #[error("source {0} returned no data rows")]
    EmptySource(String),

    #[error("required columns missing from source: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
