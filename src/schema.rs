// The canonical schema every normalized record guarantees, plus the factor
// table the metrics engine applies. Formula changes are edits to this data,
// either here in `Default` or in a JSON override file passed with --schema.
use crate::error::{PipelineError, Result};
use crate::types::{Pollutant, PollutantSet};
use serde::Deserialize;
use std::path::Path;

/// Canonical names of the input columns.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Columns {
    pub id: String,
    pub name: String,
    pub status: String,
    pub region: String,
    pub fips: String,
    pub equipment_type: String,
    pub date: String,
    /// Identifying column that must never reach an artifact.
    pub sensitive: String,
    pub gas_savings: String,
    pub electric_savings: String,
    pub total_cost_savings: String,
    pub implementation_cost: String,
    pub percent_progress: String,
}

impl Default for Columns {
    fn default() -> Self {
        Columns {
            id: "ID".to_string(),
            name: "Name".to_string(),
            status: "Implemented".to_string(),
            region: "County".to_string(),
            fips: "FIPS".to_string(),
            equipment_type: "Equipment Type".to_string(),
            date: "Date".to_string(),
            sensitive: "Company".to_string(),
            gas_savings: "Gas Savings (MMBtu/yr)".to_string(),
            electric_savings: "Electric Savings (kWh/yr)".to_string(),
            total_cost_savings: "Total Cost Savings".to_string(),
            implementation_cost: "Implementation Costs".to_string(),
            percent_progress: "Percent Progress".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PollutantFactor {
    /// lb emitted per MMBtu of natural gas.
    pub gas_lb_per_mmbtu: f64,
    /// lb per kWh applied only when no low/high estimate was supplied.
    #[serde(default)]
    pub elec_fallback_lb_per_kwh: Option<f64>,
}

impl PollutantFactor {
    const fn new(gas_lb_per_mmbtu: f64, elec_fallback_lb_per_kwh: Option<f64>) -> Self {
        PollutantFactor {
            gas_lb_per_mmbtu,
            elec_fallback_lb_per_kwh,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Schema {
    pub columns: Columns,
    /// Columns whose absence makes the whole run meaningless.
    pub essential: Vec<String>,
    pub factors: PollutantSet<PollutantFactor>,
    pub lb_per_ton: f64,
    pub tons_co2_per_car: f64,
    pub fips_width: usize,
}

impl Default for Schema {
    fn default() -> Self {
        let columns = Columns::default();
        Schema {
            essential: vec![columns.status.clone()],
            columns,
            factors: PollutantSet {
                co2: PollutantFactor::new(117.0, Some(1.5)),
                nox: PollutantFactor::new(0.092, Some(0.001)),
                so2: PollutantFactor::new(0.0006, None),
                pm25: PollutantFactor::new(0.0075, None),
            },
            lb_per_ton: 2000.0,
            tons_co2_per_car: 5.07,
            fips_width: 5,
        }
    }
}

impl Schema {
    /// Load a schema override from a JSON file. Keys left out keep their
    /// default values.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let schema: Schema = serde_json::from_str(&text)
            .map_err(|e| PipelineError::Schema(format!("{}: {}", path.display(), e)))?;
        schema.validate()?;
        Ok(schema)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.lb_per_ton.is_finite() && self.lb_per_ton > 0.0) {
            return Err(PipelineError::Schema("lb_per_ton must be positive".into()));
        }
        if !(self.tons_co2_per_car.is_finite() && self.tons_co2_per_car > 0.0) {
            return Err(PipelineError::Schema("tons_co2_per_car must be positive".into()));
        }
        if self.fips_width == 0 {
            return Err(PipelineError::Schema("fips_width must be at least 1".into()));
        }
        for p in Pollutant::ALL {
            let f = self.factors.get(p);
            let fallback_ok = f
                .elec_fallback_lb_per_kwh
                .map_or(true, |v| v.is_finite() && v >= 0.0);
            if !(f.gas_lb_per_mmbtu.is_finite() && f.gas_lb_per_mmbtu >= 0.0) || !fallback_ok {
                return Err(PipelineError::Schema(format!(
                    "emission factors for {} must be finite and non-negative",
                    p.label()
                )));
            }
        }
        if self.canonical_columns().contains(&self.columns.sensitive) {
            return Err(PipelineError::Schema(format!(
                "sensitive column {:?} is also a canonical column",
                self.columns.sensitive
            )));
        }
        Ok(())
    }

    pub fn low_column(&self, p: Pollutant) -> String {
        format!("{} Low (lb/yr)", p.label())
    }

    pub fn high_column(&self, p: Pollutant) -> String {
        format!("{} High (lb/yr)", p.label())
    }

    pub fn text_columns(&self) -> Vec<String> {
        let c = &self.columns;
        vec![
            c.id.clone(),
            c.name.clone(),
            c.status.clone(),
            c.region.clone(),
            c.fips.clone(),
            c.equipment_type.clone(),
            c.date.clone(),
        ]
    }

    /// Columns coerced to numbers by the normalizer.
    pub fn numeric_columns(&self) -> Vec<String> {
        let c = &self.columns;
        let mut cols = vec![
            c.gas_savings.clone(),
            c.electric_savings.clone(),
            c.total_cost_savings.clone(),
            c.implementation_cost.clone(),
            c.percent_progress.clone(),
        ];
        for p in Pollutant::ALL {
            cols.push(self.low_column(p));
            cols.push(self.high_column(p));
        }
        cols
    }

    /// Every input column a normalized table is guaranteed to carry.
    pub fn canonical_columns(&self) -> Vec<String> {
        let mut cols = self.text_columns();
        cols.extend(self.numeric_columns());
        cols
    }
}
