// Entry point: one batch pass per invocation.
//
// Fetch the tracking sheet, normalize and derive, then overwrite the site data
// file and/or the dashboard. Any fatal problem exits non-zero before an
// artifact is touched.
use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use impact_report::aggregate::region_summary;
use impact_report::config::{Args, Config};
use impact_report::loader::source_for;
use impact_report::output::preview_table_rows;
use impact_report::pipeline;
use impact_report::util::{format_int, format_number};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

fn execute(args: Args) -> Result<()> {
    let config = Config::from_args(args).context("invalid configuration")?;
    let source = source_for(&config.source, config.token.as_deref())
        .context("cannot set up data source")?;

    info!(source = %source.describe(), "opening sheet export");
    let table = source.fetch().context("error loading sheet")?;
    let out = pipeline::run(table, &config.schema).context("error processing sheet")?;

    println!(
        "Processing dataset... ({} rows loaded, {} completed, {} in progress)",
        format_int(out.records.len()),
        format_int(out.aggregation.completed.count),
        format_int(out.aggregation.pipeline.count)
    );
    if !out.normalize.synthesized.is_empty() {
        println!(
            "Warning: {} expected columns missing, filled with defaults.",
            format_int(out.normalize.synthesized.len())
        );
    }
    if out.normalize.coerced_total() > 0 {
        println!(
            "Note: {} numeric cells could not be parsed and were set to 0.",
            format_int(out.normalize.coerced_total())
        );
    }
    if out.derive.undated + out.derive.bad_region_codes > 0 {
        println!(
            "Note: {} dates without a year, {} unreadable region codes.",
            format_int(out.derive.undated),
            format_int(out.derive.bad_region_codes)
        );
    }
    println!();

    println!("Completed Projects by County\n");
    preview_table_rows(&region_summary(&out.aggregation.completed_by_region), 10);
    println!(
        "Completed: {} tons CO2/yr avoided, ${} saved/yr, {} cars equivalent\n",
        format_number(out.aggregation.completed.total_co2_tons, 2),
        format_number(out.aggregation.completed.total_cost_savings, 2),
        format_number(out.aggregation.completed.cars_equivalent, 1)
    );

    let generated_at = Utc::now().format("%Y-%m-%d %H:%M UTC").to_string();
    let artifacts = pipeline::render(
        &out,
        &config.schema,
        config.format,
        config.top,
        &generated_at,
    )
    .context("error rendering artifacts")?;
    pipeline::publish(&artifacts, &config.json_out, &config.html_out)
        .context("error writing artifacts")?;

    if artifacts.json.is_some() {
        println!("Success: {} saved.", config.json_out.display());
    }
    if artifacts.html.is_some() {
        println!("Success: {} generated.", config.html_out.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match execute(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
