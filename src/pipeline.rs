// Stage wiring: normalize → privacy filter → derive → aggregate → render.
// `run` and `render` are pure; `publish` is the only step touching disk.
use crate::aggregate::{aggregate, Aggregation};
use crate::config::OutputFormat;
use crate::error::Result;
use crate::html::render_html;
use crate::metrics::{derive_all, DeriveReport};
use crate::normalize::{normalize, NormalizeReport};
use crate::output::{render_json, write_atomic};
use crate::privacy::strip_sensitive;
use crate::schema::Schema;
use crate::types::{ProjectRecord, Table};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone)]
pub struct RunOutput {
    pub records: Vec<ProjectRecord>,
    pub aggregation: Aggregation,
    pub normalize: NormalizeReport,
    pub derive: DeriveReport,
}

pub fn run(table: Table, schema: &Schema) -> Result<RunOutput> {
    let (table, normalize_report) = normalize(table, schema)?;
    let table = strip_sensitive(table, &schema.columns.sensitive);
    let (records, derive_report) = derive_all(&table, schema);
    let aggregation = aggregate(&records, schema);
    Ok(RunOutput {
        records,
        aggregation,
        normalize: normalize_report,
        derive: derive_report,
    })
}

/// Rendered documents, held in memory until every requested one succeeded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Artifacts {
    pub json: Option<String>,
    pub html: Option<String>,
}

pub fn render(
    out: &RunOutput,
    schema: &Schema,
    format: OutputFormat,
    top_n: usize,
    generated_at: &str,
) -> Result<Artifacts> {
    let json = if format.wants_json() {
        Some(render_json(&out.records, schema)?)
    } else {
        None
    };
    let html = if format.wants_html() {
        Some(render_html(&out.records, &out.aggregation, top_n, generated_at))
    } else {
        None
    };
    Ok(Artifacts { json, html })
}

pub fn publish(artifacts: &Artifacts, json_out: &Path, html_out: &Path) -> Result<()> {
    if let Some(json) = &artifacts.json {
        write_atomic(json_out, json)?;
        info!(path = %json_out.display(), "site data written");
    }
    if let Some(html) = &artifacts.html {
        write_atomic(html_out, html)?;
        info!(path = %html_out.display(), "dashboard written");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::decode_csv;

    #[test]
    fn json_only_skips_html() {
        let schema = Schema::default();
        let table = decode_csv("Implemented,Company\nYes,Acme\n", "test").unwrap();
        let out = run(table, &schema).unwrap();
        let art = render(&out, &schema, OutputFormat::Json, 5, "now").unwrap();
        assert!(art.json.is_some());
        assert!(art.html.is_none());
        assert!(!art.json.unwrap().contains("Acme"));
    }

    #[test]
    fn reports_are_carried_through() {
        let schema = Schema::default();
        let table = decode_csv(
            "Implemented,Electric Savings (kWh/yr),Total Cost Savings\nYes,1000,TBD\nNo,,$5\n",
            "test",
        )
        .unwrap();
        let out = run(table, &schema).unwrap();
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.normalize.coerced_total(), 1);
        assert_eq!(out.derive.co2_fallback_rows, 1);
        assert_eq!(out.aggregation.completed.count, 1);
    }
}
