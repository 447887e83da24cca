//! HTML dashboard generation
//!
//! Produces a single self-contained page: summary cards, Plotly charts loaded
//! from the CDN, and a top-N project table. The generation timestamp appears
//! once, in the header; everything else is a pure function of the records.

use crate::aggregate::{pollutant_rows, segment, top_by_co2, Aggregation, NO_GROUP};
use crate::types::{GroupTotals, ProjectRecord, SegmentTotals};
use crate::util::{format_int, format_number};
use serde_json::{json, Value};

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

/// Render the dashboard page.
pub fn render_html(
    records: &[ProjectRecord],
    agg: &Aggregation,
    top_n: usize,
    generated_at: &str,
) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Project Environmental Dashboard</title>
    <script src="{cdn}"></script>
    <style>{css}</style>
</head>
<body>
    <div class="card">
        <h1>Project Environmental Dashboard</h1>
        <p class="meta">{count} projects tracked | Updated: {generated_at}</p>
    </div>
    {completed}
    {pipeline}
    {charts}
    {top_table}
    <script>{js}</script>
</body>
</html>
"#,
        cdn = PLOTLY_CDN,
        css = inline_css(),
        count = format_int(agg.all.count),
        generated_at = escape_html(generated_at),
        completed = render_segment_cards("Completed Projects", &agg.completed),
        pipeline = render_segment_cards("In-Progress Pipeline", &agg.pipeline),
        charts = render_chart_divs(),
        top_table = render_top_table(records, top_n),
        js = chart_script(records, agg),
    )
}

fn inline_css() -> &'static str {
    r#"
body { font-family: system-ui, -apple-system, 'Segoe UI', sans-serif; max-width: 1100px; margin: auto; padding: 20px; background: #f4f6f8; color: #1f2937; }
.card { background: white; padding: 20px; border-radius: 8px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); margin-bottom: 20px; }
h1 { color: #2c3e50; margin: 0 0 0.5rem 0; }
h2 { color: #2c3e50; font-size: 1.2rem; margin-top: 0; }
.meta { color: #6b7280; font-size: 0.9rem; }
.summary { display: grid; grid-template-columns: repeat(auto-fit, minmax(160px, 1fr)); gap: 1rem; }
.metric { background: #f9fafb; padding: 0.75rem 1rem; border-radius: 6px; border-left: 4px solid #10b981; }
.metric h3 { font-size: 0.8rem; font-weight: 600; color: #6b7280; margin: 0 0 0.25rem 0; }
.metric .value { font-size: 1.4rem; font-weight: 700; }
.charts { display: grid; grid-template-columns: repeat(auto-fit, minmax(480px, 1fr)); gap: 20px; }
.chart { min-height: 360px; }
table { width: 100%; border-collapse: collapse; font-size: 0.9rem; }
th, td { padding: 6px 8px; border-bottom: 1px solid #e5e7eb; text-align: left; }
td.num { text-align: right; font-variant-numeric: tabular-nums; }
"#
}

fn metric(title: &str, value: String) -> String {
    format!(
        r#"<div class="metric"><h3>{}</h3><div class="value">{}</div></div>"#,
        escape_html(title),
        escape_html(&value)
    )
}

fn render_segment_cards(title: &str, totals: &SegmentTotals) -> String {
    let mut cards = vec![
        metric("Projects", format_int(totals.count)),
        metric("CO2 Avoided (tons/yr)", format_number(totals.total_co2_tons, 1)),
        metric("Cost Savings ($/yr)", format_number(totals.total_cost_savings, 0)),
        metric("Cars Off the Road", format_number(totals.cars_equivalent, 1)),
    ];
    for (label, lb) in pollutant_rows(&totals.pollutant_lb).into_iter().skip(1) {
        cards.push(metric(&format!("{} Avoided (lb/yr)", label), format_number(lb, 1)));
    }
    format!(
        r#"<div class="card">
        <h2>{}</h2>
        <div class="summary">{}</div>
    </div>"#,
        escape_html(title),
        cards.join("")
    )
}

fn render_chart_divs() -> String {
    r#"<div class="card charts">
        <div id="chart-status" class="chart"></div>
        <div id="chart-region" class="chart"></div>
        <div id="chart-cost" class="chart"></div>
        <div id="chart-year" class="chart"></div>
    </div>"#
        .to_string()
}

fn render_top_table(records: &[ProjectRecord], top_n: usize) -> String {
    let seg = segment(records);
    let top = top_by_co2(&seg.all, top_n);
    if top.is_empty() {
        return r#"<div class="card"><h2>Top Projects</h2><p>No projects yet.</p></div>"#
            .to_string();
    }
    let rows: Vec<String> = top
        .iter()
        .map(|r| {
            format!(
                r#"<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td class="num">{}</td><td class="num">{}</td><td class="num">{}</td></tr>"#,
                escape_html(&r.id),
                escape_html(&r.name),
                escape_html(&r.region),
                escape_html(&r.status),
                escape_html(&r.equipment_type),
                format_number(r.total_co2_tons, 2),
                format_number(r.total_cost_savings, 0),
                format_number(r.cars_equivalent, 2),
            )
        })
        .collect();
    format!(
        r#"<div class="card">
        <h2>Top {n} Projects by CO2 Impact</h2>
        <table>
            <thead><tr><th>ID</th><th>Name</th><th>County</th><th>Status</th><th>Equipment</th><th>CO2 (tons/yr)</th><th>Cost Savings ($/yr)</th><th>Cars</th></tr></thead>
            <tbody>{rows}</tbody>
        </table>
    </div>"#,
        n = top.len(),
        rows = rows.join("\n")
    )
}

fn group_axes(groups: &[GroupTotals]) -> (Vec<&str>, Vec<f64>) {
    groups
        .iter()
        .map(|g| (g.key.as_str(), g.total_co2_tons))
        .unzip()
}

/// Plotly figures as JSON, one `newPlot` call per chart.
fn chart_script(records: &[ProjectRecord], agg: &Aggregation) -> String {
    let (status_labels, status_values) = group_axes(&agg.by_status);
    let (region_x, region_y) = group_axes(&agg.completed_by_region);
    let dated: Vec<GroupTotals> = agg
        .completed_by_year
        .iter()
        .filter(|g| g.key != NO_GROUP)
        .cloned()
        .collect();
    let (year_x, year_y) = group_axes(&dated);
    let cost_x: Vec<f64> = records.iter().map(|r| r.implementation_cost).collect();
    let savings_y: Vec<f64> = records.iter().map(|r| r.total_cost_savings).collect();
    let hover: Vec<&str> = records
        .iter()
        .map(|r| if r.name.is_empty() { r.id.as_str() } else { r.name.as_str() })
        .collect();

    let figures: Vec<(&str, Value)> = vec![
        (
            "chart-status",
            json!({
                "data": [{ "type": "pie", "labels": status_labels, "values": status_values, "hole": 0.4 }],
                "layout": { "title": "CO2 Avoided by Status (tons/yr)" }
            }),
        ),
        (
            "chart-region",
            json!({
                "data": [{ "type": "bar", "x": region_x, "y": region_y, "marker": { "color": "#10b981" } }],
                "layout": { "title": "Completed CO2 Reductions by County (tons/yr)" }
            }),
        ),
        (
            "chart-cost",
            json!({
                "data": [{
                    "type": "scatter",
                    "mode": "markers",
                    "x": cost_x,
                    "y": savings_y,
                    "text": hover
                }],
                "layout": {
                    "title": "Implementation Cost vs. Annual Savings",
                    "xaxis": { "title": "Implementation Cost ($)" },
                    "yaxis": { "title": "Cost Savings ($/yr)" }
                }
            }),
        ),
        (
            "chart-year",
            json!({
                "data": [{ "type": "scatter", "mode": "lines+markers", "x": year_x, "y": year_y }],
                "layout": { "title": "Completed CO2 Reductions by Year (tons/yr)" }
            }),
        ),
    ];

    figures
        .into_iter()
        .map(|(id, fig)| {
            format!(
                "(function (f) {{ Plotly.newPlot('{}', f.data, f.layout, {{responsive: true}}); }})({});",
                id,
                script_json(&fig)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// JSON safe to inline in a `<script>` block.
fn script_json(v: &Value) -> String {
    v.to_string().replace("</", "<\\/")
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::schema::Schema;

    fn sample() -> Vec<ProjectRecord> {
        vec![
            ProjectRecord {
                id: "1".into(),
                name: "LED retrofit".into(),
                status: "Yes".into(),
                region: "Salt Lake".into(),
                total_co2_tons: 6.6,
                year: 2024,
                ..ProjectRecord::default()
            },
            ProjectRecord {
                id: "2".into(),
                name: "<script>alert(1)</script>".into(),
                status: "In Progress".into(),
                region: "Utah".into(),
                total_co2_tons: 1.0,
                ..ProjectRecord::default()
            },
        ]
    }

    #[test]
    fn page_has_every_section() {
        let records = sample();
        let agg = aggregate(&records, &Schema::default());
        let page = render_html(&records, &agg, 10, "2026-01-05 12:00 UTC");
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("Completed Projects"));
        assert!(page.contains("In-Progress Pipeline"));
        assert!(page.contains("Top 2 Projects by CO2 Impact"));
        for id in ["chart-status", "chart-region", "chart-cost", "chart-year"] {
            assert!(page.contains(&format!("Plotly.newPlot('{}'", id)));
            assert!(page.contains(&format!("id=\"{}\"", id)));
        }
        assert_eq!(page.matches("2026-01-05 12:00 UTC").count(), 1);
    }

    #[test]
    fn embedded_text_is_escaped() {
        let records = sample();
        let agg = aggregate(&records, &Schema::default());
        let page = render_html(&records, &agg, 10, "now");
        assert!(!page.contains("<script>alert(1)</script>"));
        assert!(page.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    }

    #[test]
    fn top_n_limits_table_rows() {
        let records = sample();
        let agg = aggregate(&records, &Schema::default());
        let page = render_html(&records, &agg, 1, "now");
        assert!(page.contains("Top 1 Projects by CO2 Impact"));
        assert!(page.contains("LED retrofit"));
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_html(r#"A & "B" <c>"#), "A &amp; &quot;B&quot; &lt;c&gt;");
    }
}
