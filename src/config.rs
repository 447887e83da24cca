use crate::error::{PipelineError, Result};
use crate::schema::Schema;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Html,
    Both,
}

impl OutputFormat {
    pub fn wants_json(self) -> bool {
        matches!(self, OutputFormat::Json | OutputFormat::Both)
    }

    pub fn wants_html(self) -> bool {
        matches!(self, OutputFormat::Html | OutputFormat::Both)
    }
}

/// Publish the energy-efficiency tracking sheet as site data and a dashboard
#[derive(Parser, Debug)]
#[command(name = "impact-report")]
#[command(about = "Derive environmental-impact metrics from the recommendation tracking sheet")]
pub struct Args {
    /// Sheet export to read: a local .csv/.json path or an http(s) URL
    #[arg(long, env = "SHEET_SOURCE")]
    pub source: Option<String>,

    /// Bearer token for URL sources
    #[arg(long, env = "SHEET_ACCESS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Where to write the per-project JSON data
    #[arg(long, default_value = "site_data.json")]
    pub json_out: PathBuf,

    /// Where to write the HTML dashboard
    #[arg(long, default_value = "index.html")]
    pub html_out: PathBuf,

    /// Which artifacts to produce
    #[arg(long, value_enum, default_value_t = OutputFormat::Both)]
    pub format: OutputFormat,

    /// JSON file overriding column names, emission factors or constants
    #[arg(long, env = "IMPACT_SCHEMA")]
    pub schema: Option<PathBuf>,

    /// Rows in the dashboard's top-projects table
    #[arg(long, default_value_t = 10)]
    pub top: usize,
}

/// Validated run configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub source: String,
    pub token: Option<String>,
    pub json_out: PathBuf,
    pub html_out: PathBuf,
    pub format: OutputFormat,
    pub schema: Schema,
    pub top: usize,
}

impl Config {
    pub fn from_args(args: Args) -> Result<Self> {
        let source = args
            .source
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(PipelineError::MissingSource)?;
        let schema = match &args.schema {
            Some(path) => Schema::load(path)?,
            None => Schema::default(),
        };
        Ok(Config {
            source,
            token: args.token,
            json_out: args.json_out,
            html_out: args.html_out,
            format: args.format,
            schema,
            top: args.top,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply() {
        let args = Args::try_parse_from(["impact-report", "--source", "sheet.csv"]).unwrap();
        let cfg = Config::from_args(args).unwrap();
        assert_eq!(cfg.source, "sheet.csv");
        assert_eq!(cfg.json_out, PathBuf::from("site_data.json"));
        assert_eq!(cfg.html_out, PathBuf::from("index.html"));
        assert_eq!(cfg.format, OutputFormat::Both);
        assert_eq!(cfg.top, 10);
        assert_eq!(cfg.schema, Schema::default());
    }

    #[test]
    fn format_flags() {
        let args = Args::try_parse_from([
            "impact-report",
            "--source",
            "sheet.csv",
            "--format",
            "json",
            "--top",
            "3",
        ])
        .unwrap();
        assert!(args.format.wants_json());
        assert!(!args.format.wants_html());
        assert_eq!(args.top, 3);
    }

    #[test]
    fn blank_source_is_fatal() {
        let args = Args {
            source: Some("   ".into()),
            token: None,
            json_out: "a.json".into(),
            html_out: "a.html".into(),
            format: OutputFormat::Both,
            schema: None,
            top: 10,
        };
        assert!(matches!(Config::from_args(args), Err(PipelineError::MissingSource)));
    }
}
