use crate::error::Result;
use crate::schema::Schema;
use crate::types::{Pollutant, ProjectRecord};
use serde_json::{json, Map, Value};
use std::io::Write;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};
use tempfile::NamedTempFile;

/// One record as a JSON object keyed by canonical column names, inputs first
/// and derived fields after, in a fixed order.
pub fn record_json(record: &ProjectRecord, schema: &Schema) -> Value {
    let c = &schema.columns;
    let mut obj = Map::new();
    obj.insert(c.id.clone(), json!(record.id));
    obj.insert(c.name.clone(), json!(record.name));
    obj.insert(c.status.clone(), json!(record.status));
    obj.insert(c.region.clone(), json!(record.region));
    obj.insert(c.fips.clone(), json!(record.fips));
    obj.insert(c.equipment_type.clone(), json!(record.equipment_type));
    obj.insert(c.date.clone(), json!(record.date));
    obj.insert(c.gas_savings.clone(), json!(record.gas_savings_mmbtu));
    obj.insert(c.electric_savings.clone(), json!(record.electric_savings_kwh));
    obj.insert(c.total_cost_savings.clone(), json!(record.total_cost_savings));
    obj.insert(c.implementation_cost.clone(), json!(record.implementation_cost));
    obj.insert(c.percent_progress.clone(), json!(record.percent_progress));
    for p in Pollutant::ALL {
        let fig = record.pollutants.get(p);
        obj.insert(schema.low_column(p), json!(fig.low));
        obj.insert(schema.high_column(p), json!(fig.high));
    }
    for p in Pollutant::ALL {
        let fig = record.pollutants.get(p);
        obj.insert(format!("Gas_{}_lb", p.key()), json!(fig.gas_lb));
        obj.insert(format!("Elec_{}_lb", p.key()), json!(fig.elec_lb));
        obj.insert(format!("Total_{}_lb", p.key()), json!(fig.total_lb));
    }
    obj.insert("Total_CO2_Tons".into(), json!(record.total_co2_tons));
    obj.insert("Cars_Equivalent".into(), json!(record.cars_equivalent));
    obj.insert("Net_Savings".into(), json!(record.net_savings));
    obj.insert("Payback_Years".into(), json!(record.payback_years));
    obj.insert("FIPS_Code".into(), json!(record.fips_code));
    obj.insert("Year".into(), json!(record.year));
    Value::Object(obj)
}

/// The site data file: a pretty-printed array with one object per record,
/// in source order. No timestamps, so identical input gives identical bytes.
pub fn render_json(records: &[ProjectRecord], schema: &Schema) -> Result<String> {
    let rows: Vec<Value> = records.iter().map(|r| record_json(r, schema)).collect();
    let mut s = serde_json::to_string_pretty(&rows)?;
    s.push('\n');
    Ok(s)
}

/// Replace `path` as a whole: write a sibling temp file, then rename it over
/// the target. Readers see either the old file or the new one.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}
