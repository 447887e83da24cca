use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tabled::Tabled;

/// A single scalar as delivered by the upstream source.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    pub fn from_json(value: &serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Cell::Empty,
            Value::String(s) if s.trim().is_empty() => Cell::Empty,
            Value::String(s) => Cell::Text(s.clone()),
            Value::Number(n) => n.as_f64().map(Cell::Number).unwrap_or(Cell::Empty),
            Value::Bool(b) => Cell::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
            other => Cell::Text(other.to_string()),
        }
    }

    pub fn from_text(s: &str) -> Self {
        if s.trim().is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }

    /// Textual view of the cell. Whole numbers print without a fraction so a
    /// numeric year or code reads the same as its text form.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Cell::Empty => Cow::Borrowed(""),
            Cell::Text(s) => Cow::Borrowed(s.as_str()),
            Cell::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => {
                Cow::Owned(format!("{}", *n as i64))
            }
            Cell::Number(n) => Cow::Owned(n.to_string()),
        }
    }
}

static EMPTY_CELL: Cell = Cell::Empty;

/// Column-oriented view of one upstream fetch: ordered headers plus rows in
/// source order. Every row has exactly `headers.len()` cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Table {
            headers,
            rows: Vec::new(),
        }
    }

    /// Append a row, padding or truncating it to the header width.
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.headers.len(), Cell::Empty);
        self.rows.push(row);
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn column_indices(&self, name: &str) -> Vec<usize> {
        self.headers
            .iter()
            .enumerate()
            .filter(|(_, h)| h.as_str() == name)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn add_column(&mut self, name: &str, default: Cell) {
        self.headers.push(name.to_string());
        for row in &mut self.rows {
            row.push(default.clone());
        }
    }

    /// Drop every column whose header equals `name`. Returns how many went.
    pub fn remove_columns(&mut self, name: &str) -> usize {
        let doomed = self.column_indices(name);
        for &idx in doomed.iter().rev() {
            self.headers.remove(idx);
            for row in &mut self.rows {
                row.remove(idx);
            }
        }
        doomed.len()
    }

    /// Fold every column named `name` into the first one, keeping the first
    /// non-empty cell of each row. Returns how many copies were dropped.
    pub fn coalesce_columns(&mut self, name: &str) -> usize {
        let indices = self.column_indices(name);
        let Some((&keep, rest)) = indices.split_first() else {
            return 0;
        };
        for row in &mut self.rows {
            if row[keep].is_empty() {
                if let Some(&src) = rest.iter().find(|&&i| !row[i].is_empty()) {
                    row[keep] = row[src].clone();
                }
            }
        }
        for &idx in rest.iter().rev() {
            self.headers.remove(idx);
            for row in &mut self.rows {
                row.remove(idx);
            }
        }
        rest.len()
    }

    /// First non-empty cell among all columns named `name`, or `Cell::Empty`.
    pub fn get<'a>(&'a self, row: &'a [Cell], name: &str) -> &'a Cell {
        self.headers
            .iter()
            .zip(row.iter())
            .filter(|(h, _)| h.as_str() == name)
            .map(|(_, c)| c)
            .find(|c| !c.is_empty())
            .unwrap_or(&EMPTY_CELL)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Implementation status of a recommendation, classified by exact value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Completed,
    InProgress,
    Other,
}

impl Status {
    pub fn classify(raw: &str) -> Self {
        match raw {
            "Yes" => Status::Completed,
            "In Progress" => Status::InProgress,
            _ => Status::Other,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Status::Completed => "Completed",
            Status::InProgress => "In Progress",
            Status::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pollutant {
    Co2,
    Nox,
    So2,
    Pm25,
}

impl Pollutant {
    pub const ALL: [Pollutant; 4] = [Pollutant::Co2, Pollutant::Nox, Pollutant::So2, Pollutant::Pm25];

    /// Display name, also used in the low/high input column names.
    pub fn label(self) -> &'static str {
        match self {
            Pollutant::Co2 => "CO2",
            Pollutant::Nox => "NOx",
            Pollutant::So2 => "SO2",
            Pollutant::Pm25 => "PM2.5",
        }
    }

    /// Identifier-safe name used in derived field keys (`Total_PM25_lb`).
    pub fn key(self) -> &'static str {
        match self {
            Pollutant::Co2 => "CO2",
            Pollutant::Nox => "NOx",
            Pollutant::So2 => "SO2",
            Pollutant::Pm25 => "PM25",
        }
    }
}

/// One value per pollutant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PollutantSet<T> {
    #[serde(rename = "CO2")]
    pub co2: T,
    #[serde(rename = "NOx")]
    pub nox: T,
    #[serde(rename = "SO2")]
    pub so2: T,
    #[serde(rename = "PM2.5")]
    pub pm25: T,
}

impl<T> PollutantSet<T> {
    pub fn get(&self, p: Pollutant) -> &T {
        match p {
            Pollutant::Co2 => &self.co2,
            Pollutant::Nox => &self.nox,
            Pollutant::So2 => &self.so2,
            Pollutant::Pm25 => &self.pm25,
        }
    }

    pub fn get_mut(&mut self, p: Pollutant) -> &mut T {
        match p {
            Pollutant::Co2 => &mut self.co2,
            Pollutant::Nox => &mut self.nox,
            Pollutant::So2 => &mut self.so2,
            Pollutant::Pm25 => &mut self.pm25,
        }
    }
}

/// Input estimates and derived amounts for one pollutant on one row (lb/yr).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PollutantFigures {
    pub low: f64,
    pub high: f64,
    pub gas_lb: f64,
    pub elec_lb: f64,
    pub total_lb: f64,
}

/// A normalized, fully derived project row. The sensitive column has no
/// field here, so it cannot reach an exporter through this type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectRecord {
    pub id: String,
    pub name: String,
    pub status: String,
    pub region: String,
    pub fips: String,
    pub equipment_type: String,
    pub date: String,

    pub gas_savings_mmbtu: f64,
    pub electric_savings_kwh: f64,
    pub total_cost_savings: f64,
    pub implementation_cost: f64,
    pub percent_progress: f64,

    pub pollutants: PollutantSet<PollutantFigures>,
    pub total_co2_tons: f64,
    pub cars_equivalent: f64,
    pub net_savings: f64,
    pub payback_years: f64,
    pub fips_code: Option<String>,
    pub year: i32,
}

impl ProjectRecord {
    pub fn status_class(&self) -> Status {
        Status::classify(&self.status)
    }

    pub fn total_lb(&self, p: Pollutant) -> f64 {
        self.pollutants.get(p).total_lb
    }
}

/// Totals over one status segment.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SegmentTotals {
    pub label: String,
    pub count: usize,
    pub total_co2_tons: f64,
    pub total_cost_savings: f64,
    pub implementation_cost: f64,
    pub pollutant_lb: PollutantSet<f64>,
    pub cars_equivalent: f64,
}

/// Totals for one bucket of a categorical grouping.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupTotals {
    pub key: String,
    pub count: usize,
    pub total_co2_tons: f64,
    pub total_cost_savings: f64,
    pub total_nox_lb: f64,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct RegionSummaryRow {
    #[tabled(rename = "County")]
    pub region: String,
    #[tabled(rename = "Projects")]
    pub projects: usize,
    #[tabled(rename = "CO2 (tons/yr)")]
    pub co2_tons: String,
    #[tabled(rename = "NOx (lb/yr)")]
    pub nox_lb: String,
    #[tabled(rename = "Cost Savings")]
    pub cost_savings: String,
}
