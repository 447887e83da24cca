use crate::schema::Schema;
use crate::types::{Cell, Pollutant, PollutantFigures, ProjectRecord, Table};
use crate::util::{average, coerce_numeric, extract_year, pad_region_code, safe_ratio};
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeriveReport {
    pub rows: usize,
    /// Rows whose date text yielded no year.
    pub undated: usize,
    /// Rows with a non-empty region code that could not be parsed.
    pub bad_region_codes: usize,
    /// Rows where the electric CO2 amount came from the fallback factor.
    pub co2_fallback_rows: usize,
}

/// Electric-sourced amount for one pollutant.
///
/// A supplied low/high pair wins: both non-zero gives their mean, a single
/// non-zero bound is used as is. Only when neither bound is supplied and the
/// row saves electricity does the fallback factor apply. Returns the amount
/// and whether the fallback was used.
pub fn electric_amount(low: f64, high: f64, electric_kwh: f64, fallback: Option<f64>) -> (f64, bool) {
    match (low != 0.0, high != 0.0) {
        (true, true) => (average(&[low, high]), false),
        (true, false) => (low, false),
        (false, true) => (high, false),
        (false, false) => match fallback {
            Some(factor) if electric_kwh > 0.0 => (electric_kwh * factor, true),
            _ => (0.0, false),
        },
    }
}

fn text(table: &Table, row: &[Cell], column: &str) -> String {
    table.get(row, column).as_text().trim().to_string()
}

fn number(table: &Table, row: &[Cell], column: &str) -> f64 {
    coerce_numeric(table.get(row, column))
}

/// Build one fully derived record from a normalized row. Nothing here can
/// fail: zero-defaulted inputs simply give zero-valued outputs.
pub fn derive_record(table: &Table, row: &[Cell], schema: &Schema) -> ProjectRecord {
    let c = &schema.columns;
    let mut rec = ProjectRecord {
        id: text(table, row, &c.id),
        name: text(table, row, &c.name),
        status: text(table, row, &c.status),
        region: text(table, row, &c.region),
        fips: text(table, row, &c.fips),
        equipment_type: text(table, row, &c.equipment_type),
        date: text(table, row, &c.date),
        gas_savings_mmbtu: number(table, row, &c.gas_savings),
        electric_savings_kwh: number(table, row, &c.electric_savings),
        total_cost_savings: number(table, row, &c.total_cost_savings),
        implementation_cost: number(table, row, &c.implementation_cost),
        percent_progress: number(table, row, &c.percent_progress),
        ..ProjectRecord::default()
    };

    for p in Pollutant::ALL {
        let factor = schema.factors.get(p);
        let low = number(table, row, &schema.low_column(p));
        let high = number(table, row, &schema.high_column(p));
        let gas_lb = rec.gas_savings_mmbtu * factor.gas_lb_per_mmbtu;
        let (elec_lb, _) = electric_amount(
            low,
            high,
            rec.electric_savings_kwh,
            factor.elec_fallback_lb_per_kwh,
        );
        *rec.pollutants.get_mut(p) = PollutantFigures {
            low,
            high,
            gas_lb,
            elec_lb,
            total_lb: gas_lb + elec_lb,
        };
    }

    rec.total_co2_tons = safe_ratio(rec.pollutants.co2.total_lb, schema.lb_per_ton);
    rec.cars_equivalent = safe_ratio(rec.total_co2_tons, schema.tons_co2_per_car);
    rec.net_savings = rec.total_cost_savings - rec.implementation_cost;
    rec.payback_years = if rec.total_cost_savings > 0.0 {
        safe_ratio(rec.implementation_cost, rec.total_cost_savings)
    } else {
        0.0
    };
    rec.fips_code = pad_region_code(table.get(row, &c.fips), schema.fips_width);
    rec.year = extract_year(&rec.date).unwrap_or(0);
    rec
}

/// Derive every row of a normalized, privacy-filtered table, in source order.
pub fn derive_all(table: &Table, schema: &Schema) -> (Vec<ProjectRecord>, DeriveReport) {
    let mut report = DeriveReport {
        rows: table.len(),
        ..DeriveReport::default()
    };
    let co2 = &schema.factors.co2;
    let records: Vec<ProjectRecord> = table
        .rows
        .iter()
        .map(|row| {
            let rec = derive_record(table, row, schema);
            if rec.year == 0 && !rec.date.is_empty() {
                warn!(id = %rec.id, date = %rec.date, "no year in date text");
                report.undated += 1;
            }
            if rec.fips_code.is_none() && !rec.fips.is_empty() {
                warn!(id = %rec.id, fips = %rec.fips, "unparseable region code");
                report.bad_region_codes += 1;
            }
            let fig = rec.pollutants.co2;
            let (_, used_fallback) = electric_amount(
                fig.low,
                fig.high,
                rec.electric_savings_kwh,
                co2.elec_fallback_lb_per_kwh,
            );
            if used_fallback {
                report.co2_fallback_rows += 1;
            }
            rec
        })
        .collect();

    info!(
        rows = report.rows,
        undated = report.undated,
        bad_region_codes = report.bad_region_codes,
        co2_fallback_rows = report.co2_fallback_rows,
        "derived metrics"
    );
    (records, report)
}
