// Utility helpers for parsing and formatting.
//
// This module centralizes all the "dirty" spreadsheet handling (currency and
// percent strings, free-form dates, numeric codes) so the rest of the code can
// assume clean, typed values.
use crate::types::Cell;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use num_format::{Locale, ToFormattedString};
use once_cell::sync::Lazy;
use regex::Regex;

static NUMERIC_NOISE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[$,%]").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
// A 4-digit run that is not part of a longer run of digits.
static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:^|\D)(\d{4})(?:\D|$)").unwrap());

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%Y/%m/%d",
    "%m/%d/%y",
    "%y-%m-%d",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d-%b-%Y",
];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%m/%d/%Y %H:%M:%S"];

/// Parse a spreadsheet number such as `"$1,234.50"` or `"12%"`.
///
/// - Strips `$`, `%` and `,` in a single pass, then trims.
/// - Returns `None` for empty or non-numeric text (`"TBD"`) and for anything
///   that would parse to NaN or infinity.
pub fn parse_numeric(s: &str) -> Option<f64> {
    let cleaned = NUMERIC_NOISE_RE.replace_all(s, "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Coerce any cell to a number, resolving every failure to `0.0`.
pub fn coerce_numeric(cell: &Cell) -> f64 {
    match cell {
        Cell::Number(n) if n.is_finite() => *n,
        Cell::Number(_) | Cell::Empty => 0.0,
        Cell::Text(s) => parse_numeric(s).unwrap_or(0.0),
    }
}

/// Matching key for a header: trimmed, lowercased, inner whitespace collapsed.
pub fn fold_header(s: &str) -> String {
    WHITESPACE_RE.replace_all(s.trim(), " ").to_lowercase()
}

// chrono's `%Y` also accepts one to three digits, so `3/15/22` would parse as
// year 22 under `%m/%d/%Y`. Such dates must fall through to the `%y` formats.
fn full_year(d: NaiveDate) -> Option<NaiveDate> {
    (d.year() >= 1000).then_some(d)
}

pub fn parse_date_safe(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(d) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok().and_then(full_year))
    {
        return Some(d);
    }
    if let Some(d) = DATETIME_FORMATS.iter().find_map(|fmt| {
        NaiveDateTime::parse_from_str(s, fmt)
            .ok()
            .and_then(|dt| full_year(dt.date()))
    }) {
        return Some(d);
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

/// Calendar year of a free-text date. Falls back to the first standalone
/// 4-digit run when the text is not a recognizable date.
pub fn extract_year(s: &str) -> Option<i32> {
    if let Some(d) = parse_date_safe(s) {
        return Some(d.year());
    }
    YEAR_RE
        .captures(s)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<i32>().ok())
}

/// Fixed-width, zero-padded geographic code (`49035.0` → `"49035"`,
/// `1001` → `"01001"`). Absent or unparseable input yields `None`, never a
/// string of zeros.
pub fn pad_region_code(cell: &Cell, width: usize) -> Option<String> {
    let value = match cell {
        Cell::Empty => return None,
        Cell::Number(n) => *n,
        Cell::Text(s) => s.trim().parse::<f64>().ok()?,
    };
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    let code = value.trunc() as u64;
    Some(format!("{:0width$}", code, width = width))
}

/// Mean of the given bounds, `0.0` when there are none.
pub fn average(bounds: &[f64]) -> f64 {
    match bounds.len() {
        0 => 0.0,
        n => bounds.iter().sum::<f64>() / n as f64,
    }
}

/// Divide, resolving a zero or non-finite result to `0.0`.
pub fn safe_ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        return 0.0;
    }
    let r = num / den;
    if r.is_finite() {
        r
    } else {
        0.0
    }
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Format a floating-point value with:
    // - a fixed number of decimal places, and
    // - locale-aware thousands separators (e.g., `1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let abs_n = n.abs();
    let s = format!("{:.*}", decimals, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    if neg && res.chars().any(|c| c.is_ascii_digit() && c != '0') {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Thin wrapper around `num-format` for counts in console messages
    // (e.g., `1,204 rows loaded`).
    n.to_formatted_string(&Locale::en)
}
