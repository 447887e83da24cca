use crate::error::{PipelineError, Result};
use crate::schema::Schema;
use crate::types::{Cell, Table};
use crate::util::{fold_header, parse_numeric};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// What the normalizer had to repair. This is the data-quality hook: callers
/// can log it, print it, or fail on it as they see fit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizeReport {
    pub total_rows: usize,
    /// Headers rewritten to their canonical spelling.
    pub renamed_headers: usize,
    /// Canonical columns the source did not supply, filled with defaults.
    pub synthesized: Vec<String>,
    /// Canonical names that appeared more than once after folding.
    pub duplicate_headers: Vec<String>,
    /// Non-empty numeric cells that failed to parse, per column.
    pub coerced_to_zero: Vec<(String, usize)>,
    /// Source columns outside the canonical schema.
    pub passthrough: Vec<String>,
}

impl NormalizeReport {
    pub fn coerced_total(&self) -> usize {
        self.coerced_to_zero.iter().map(|(_, n)| n).sum()
    }
}

/// Bring an untrusted table onto the canonical schema.
///
/// - every header is trimmed and, when it folds to a known column name,
///   rewritten to that exact spelling;
/// - repeated canonical columns are merged, first non-empty cell wins;
/// - essential columns must be present, anything else missing is synthesized;
/// - numeric columns become `Cell::Number`, with unparseable cells as `0.0`;
/// - text in canonical text columns is trimmed.
///
/// Rows are never dropped.
pub fn normalize(table: Table, schema: &Schema) -> Result<(Table, NormalizeReport)> {
    let mut table = table;
    let mut report = NormalizeReport {
        total_rows: table.len(),
        ..NormalizeReport::default()
    };

    let mut known: HashMap<String, String> = schema
        .canonical_columns()
        .into_iter()
        .map(|c| (fold_header(&c), c))
        .collect();
    known.insert(
        fold_header(&schema.columns.sensitive),
        schema.columns.sensitive.clone(),
    );

    let mut seen: HashSet<String> = HashSet::new();
    for header in table.headers.iter_mut() {
        let trimmed = header.trim().to_string();
        let canonical = match known.get(&fold_header(&trimmed)) {
            Some(c) => c.clone(),
            None => {
                if !trimmed.is_empty() {
                    report.passthrough.push(trimmed.clone());
                }
                trimmed
            }
        };
        if canonical != *header {
            report.renamed_headers += 1;
        }
        if known.contains_key(&fold_header(&canonical))
            && canonical != schema.columns.sensitive
            && !seen.insert(canonical.clone())
        {
            report.duplicate_headers.push(canonical.clone());
        }
        *header = canonical;
    }
    // Merge copies before numeric coercion turns blanks into zeros.
    let mut merged: HashSet<String> = HashSet::new();
    report.duplicate_headers.retain(|c| merged.insert(c.clone()));
    for dup in &report.duplicate_headers {
        let dropped = table.coalesce_columns(dup);
        warn!(column = %dup, dropped, "column appears more than once; first non-empty value wins");
    }

    let missing: Vec<String> = schema
        .essential
        .iter()
        .filter(|c| !table.has_column(c))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::MissingColumns(missing));
    }

    let numeric = schema.numeric_columns();
    for col in schema.canonical_columns() {
        if table.has_column(&col) {
            continue;
        }
        let default = if numeric.contains(&col) {
            Cell::Number(0.0)
        } else {
            Cell::Empty
        };
        debug!(column = %col, "synthesizing missing column");
        table.add_column(&col, default);
        report.synthesized.push(col);
    }
    if !report.synthesized.is_empty() {
        warn!(
            columns = %report.synthesized.join(", "),
            "source is missing optional columns; filled with defaults"
        );
    }

    let text_cols: HashSet<String> = schema.text_columns().into_iter().collect();
    let mut failures: HashMap<usize, usize> = HashMap::new();
    for row in table.rows.iter_mut() {
        for (idx, (header, cell)) in table.headers.iter().zip(row.iter_mut()).enumerate() {
            if numeric.contains(header) {
                let value = match &*cell {
                    Cell::Number(n) if n.is_finite() => *n,
                    Cell::Text(s) if !s.trim().is_empty() => parse_numeric(s).unwrap_or_else(|| {
                        *failures.entry(idx).or_insert(0) += 1;
                        0.0
                    }),
                    _ => 0.0,
                };
                *cell = Cell::Number(value);
            } else if text_cols.contains(header) {
                let trimmed = match &*cell {
                    Cell::Text(s) => Some(Cell::from_text(s.trim())),
                    _ => None,
                };
                if let Some(t) = trimmed {
                    *cell = t;
                }
            }
        }
    }

    let mut coerced: Vec<(String, usize)> = failures
        .into_iter()
        .map(|(idx, n)| (table.headers[idx].clone(), n))
        .collect();
    coerced.sort();
    for (col, n) in &coerced {
        warn!(column = %col, cells = n, "unparseable numeric cells set to 0");
    }
    report.coerced_to_zero = coerced;

    info!(
        rows = report.total_rows,
        renamed = report.renamed_headers,
        synthesized = report.synthesized.len(),
        coerced = report.coerced_total(),
        "normalized columns"
    );
    Ok((table, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> Table {
        let mut t = Table::new(headers.iter().map(|h| h.to_string()).collect());
        for r in rows {
            t.push_row(r.iter().map(|c| Cell::from_text(c)).collect());
        }
        t
    }

    #[test]
    fn headers_are_trimmed_and_canonicalized() {
        let schema = Schema::default();
        let raw = table(
            &["  implemented ", "GAS SAVINGS (MMBTU/YR)", " Notes "],
            &[&["Yes", "100", "x"]],
        );
        let (t, report) = normalize(raw, &schema).unwrap();
        assert!(t.has_column("Implemented"));
        assert!(t.has_column("Gas Savings (MMBtu/yr)"));
        assert!(t.has_column("Notes"));
        assert_eq!(report.passthrough, vec!["Notes".to_string()]);
        assert_eq!(report.renamed_headers, 3);
    }

    #[test]
    fn every_canonical_column_is_present() {
        let schema = Schema::default();
        let raw = table(&["Implemented"], &[&["Yes"], &["No"]]);
        let (t, report) = normalize(raw, &schema).unwrap();
        for col in schema.canonical_columns() {
            assert!(t.has_column(&col), "missing {col}");
        }
        assert_eq!(report.synthesized.len(), schema.canonical_columns().len() - 1);
        let row = &t.rows[0];
        assert_eq!(t.get(row, "Total Cost Savings"), &Cell::Number(0.0));
        assert_eq!(t.get(row, "County"), &Cell::Empty);
    }

    #[test]
    fn numeric_columns_are_coerced() {
        let schema = Schema::default();
        let raw = table(
            &["Implemented", "Total Cost Savings", "Percent Progress", "Implementation Costs"],
            &[
                &["Yes", "$1,234.50", "12%", "TBD"],
                &["No", "", "100", "$0"],
            ],
        );
        let (t, report) = normalize(raw, &schema).unwrap();
        assert_eq!(t.get(&t.rows[0], "Total Cost Savings"), &Cell::Number(1234.5));
        assert_eq!(t.get(&t.rows[0], "Percent Progress"), &Cell::Number(12.0));
        assert_eq!(t.get(&t.rows[0], "Implementation Costs"), &Cell::Number(0.0));
        assert_eq!(t.get(&t.rows[1], "Total Cost Savings"), &Cell::Number(0.0));
        assert_eq!(t.len(), 2);
        assert_eq!(
            report.coerced_to_zero,
            vec![("Implementation Costs".to_string(), 1)]
        );
    }

    #[test]
    fn missing_essential_column_is_fatal() {
        let schema = Schema::default();
        let raw = table(&["Gas Savings (MMBtu/yr)"], &[&["10"]]);
        match normalize(raw, &schema) {
            Err(PipelineError::MissingColumns(cols)) => {
                assert_eq!(cols, vec!["Implemented".to_string()])
            }
            other => panic!("expected MissingColumns, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_headers_are_reported() {
        let schema = Schema::default();
        let raw = table(&["Implemented", "County", " county"], &[&["Yes", "", "Utah"]]);
        let (t, report) = normalize(raw, &schema).unwrap();
        assert_eq!(report.duplicate_headers, vec!["County".to_string()]);
        assert_eq!(t.get(&t.rows[0], "County"), &Cell::Text("Utah".into()));
        assert_eq!(t.column_indices("County").len(), 1);
    }

    #[test]
    fn blank_numeric_copy_does_not_shadow_later_value() {
        let schema = Schema::default();
        let raw = table(
            &["Implemented", "Total Cost Savings", " total cost savings"],
            &[&["Yes", "", "$5"], &["No", "$7", "$9"], &["No", "", ""]],
        );
        let (t, report) = normalize(raw, &schema).unwrap();
        assert_eq!(report.duplicate_headers, vec!["Total Cost Savings".to_string()]);
        assert_eq!(t.column_indices("Total Cost Savings").len(), 1);
        assert_eq!(t.get(&t.rows[0], "Total Cost Savings"), &Cell::Number(5.0));
        assert_eq!(t.get(&t.rows[1], "Total Cost Savings"), &Cell::Number(7.0));
        assert_eq!(t.get(&t.rows[2], "Total Cost Savings"), &Cell::Number(0.0));
    }

    #[test]
    fn sensitive_header_variants_share_one_name() {
        let schema = Schema::default();
        let raw = table(&["Implemented", "company", " COMPANY "], &[&["Yes", "Acme", "Acme"]]);
        let (t, _) = normalize(raw, &schema).unwrap();
        assert_eq!(t.column_indices("Company").len(), 2);
    }
}
