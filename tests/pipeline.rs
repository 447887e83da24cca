use impact_report::config::OutputFormat;
use impact_report::error::PipelineError;
use impact_report::loader::{decode_csv, decode_json, source_for};
use impact_report::pipeline::{publish, render, run};
use impact_report::schema::Schema;
use serde_json::Value;
use tempfile::tempdir;

const SHEET: &str = "\
ID,Name,Company,Implemented,County,FIPS,Equipment Type,Date,Gas Savings (MMBtu/yr),Electric Savings (kWh/yr),Total Cost Savings,Implementation Costs,Percent Progress,CO2 Low (lb/yr),CO2 High (lb/yr)
AR-1,Boiler tune-up,Acme Foundry,Yes,Salt Lake,49035.0,Boiler,2024-03-15,100,\"1,000\",\"$1,234.50\",$500,100%,,
AR-2,LED retrofit,Beehive Mills,Yes,Utah,49049,Lighting,see notes 2023 survey,0,1000,$800,\"$2,000\",100%,800,1200
AR-3,VFD on fans,Acme Foundry,In Progress,Salt Lake,49035,Motors,unknown,TBD,500,TBD,$750,40%,,
AR-4,Compressed air leaks,,No,,,Compressed Air,,5,,,,0%,,
AR-5,Steam traps,Wasatch Paper,In Progress,Weber,1001,Steam,03/02/2022,20,0,$300,$100,10%,,
AR-6,Insulation,Wasatch Paper,Yes,Utah,49049,Envelope,2021,10,,$90,$60,100%,,
";

fn json_rows(text: &str) -> Vec<Value> {
    serde_json::from_str::<Vec<Value>>(text).unwrap()
}

#[test]
fn end_to_end_metrics() {
    let schema = Schema::default();
    let out = run(decode_csv(SHEET, "sheet").unwrap(), &schema).unwrap();
    assert_eq!(out.records.len(), 6);

    let ar1 = &out.records[0];
    assert_eq!(ar1.total_cost_savings, 1234.5);
    assert_eq!(ar1.percent_progress, 100.0);
    assert_eq!(ar1.pollutants.co2.elec_lb, 1500.0);
    assert_eq!(ar1.total_co2_tons, 6.6);
    assert!((ar1.cars_equivalent - 1.3018).abs() < 1e-4);
    assert_eq!(ar1.fips_code.as_deref(), Some("49035"));
    assert_eq!(ar1.year, 2024);

    let ar2 = &out.records[1];
    assert_eq!(ar2.pollutants.co2.elec_lb, 1000.0);
    assert_eq!(ar2.year, 2023);

    let ar3 = &out.records[2];
    assert_eq!(ar3.gas_savings_mmbtu, 0.0);
    assert_eq!(ar3.total_cost_savings, 0.0);
    assert_eq!(ar3.year, 0);

    let ar4 = &out.records[3];
    assert_eq!(ar4.fips_code, None);
    assert_eq!(ar4.region, "");

    assert_eq!(out.records[4].fips_code.as_deref(), Some("01001"));
    assert_eq!(out.records[4].year, 2022);
    assert_eq!(out.records[5].year, 2021);
    assert_eq!(out.derive.undated, 1);
    assert_eq!(out.derive.bad_region_codes, 0);
}

#[test]
fn status_segments_and_region_sums() {
    let schema = Schema::default();
    let out = run(decode_csv(SHEET, "sheet").unwrap(), &schema).unwrap();
    let agg = &out.aggregation;
    assert_eq!(agg.completed.count, 3);
    assert_eq!(agg.pipeline.count, 2);
    assert_eq!(agg.all.count, 6);

    for g in &agg.completed_by_region {
        let mut expected = 0.0;
        for r in out.records.iter().filter(|r| r.status == "Yes" && r.region == g.key) {
            expected += r.total_co2_tons;
        }
        assert_eq!(g.total_co2_tons, expected, "bucket {}", g.key);
    }
    let keys: Vec<&str> = agg.by_status.iter().map(|g| g.key.as_str()).collect();
    assert_eq!(keys, vec!["Yes", "In Progress", "No"]);
}

#[test]
fn sensitive_column_never_reaches_artifacts() {
    let schema = Schema::default();
    let variants = [
        SHEET.to_string(),
        // duplicated and differently cased headers
        "ID, company ,Implemented,COMPANY\n1,Acme Foundry,Yes,Acme Foundry\n2,,No,Beehive Mills\n"
            .to_string(),
        // reordered, with a null-ish value
        "Implemented,Company,ID\nIn Progress,,3\nYes,Wasatch Paper,4\n".to_string(),
    ];
    for csv in variants {
        let out = run(decode_csv(&csv, "sheet").unwrap(), &schema).unwrap();
        let art = render(&out, &schema, OutputFormat::Both, 10, "2026-10-16 00:00 UTC").unwrap();
        let json = art.json.unwrap();
        let html = art.html.unwrap();
        for name in ["Acme Foundry", "Beehive Mills", "Wasatch Paper"] {
            assert!(!json.contains(name), "{name} leaked into JSON");
            assert!(!html.contains(name), "{name} leaked into HTML");
        }
        for row in json_rows(&json) {
            let obj = row.as_object().unwrap();
            assert!(obj.keys().all(|k| !k.eq_ignore_ascii_case("company")));
        }
    }

    let from_json = decode_json(
        r#"[{"Implemented": "Yes", "Company": "Acme Foundry"}, {"Implemented": "No", "Company": null}]"#,
        "sheet",
    )
    .unwrap();
    let out = run(from_json, &schema).unwrap();
    let art = render(&out, &schema, OutputFormat::Json, 10, "now").unwrap();
    assert!(!art.json.unwrap().contains("Acme"));
}

#[test]
fn every_canonical_field_is_exported() {
    let schema = Schema::default();
    for csv in ["Implemented\nYes\n", "Implemented,FIPS\nNo,1001\n", SHEET] {
        let out = run(decode_csv(csv, "sheet").unwrap(), &schema).unwrap();
        let json = render(&out, &schema, OutputFormat::Json, 10, "now")
            .unwrap()
            .json
            .unwrap();
        for row in json_rows(&json) {
            let obj = row.as_object().unwrap();
            for col in schema.canonical_columns() {
                assert!(obj.contains_key(&col), "missing {col}");
            }
            for derived in ["Total_CO2_Tons", "Cars_Equivalent", "FIPS_Code", "Year"] {
                assert!(obj.contains_key(derived), "missing {derived}");
            }
            for (_, v) in obj {
                if let Some(n) = v.as_f64() {
                    assert!(n.is_finite());
                }
            }
        }
    }
}

#[test]
fn json_output_is_idempotent() {
    let schema = Schema::default();
    let first = run(decode_csv(SHEET, "sheet").unwrap(), &schema).unwrap();
    let second = run(decode_csv(SHEET, "sheet").unwrap(), &schema).unwrap();
    let a = render(&first, &schema, OutputFormat::Both, 10, "2026-10-16 08:00 UTC").unwrap();
    let b = render(&second, &schema, OutputFormat::Both, 10, "2026-10-17 08:00 UTC").unwrap();
    assert_eq!(a.json, b.json);

    let html_a = a.html.unwrap().replace("2026-10-16 08:00 UTC", "");
    let html_b = b.html.unwrap().replace("2026-10-17 08:00 UTC", "");
    assert_eq!(html_a, html_b);
}

#[test]
fn publish_overwrites_both_files() {
    let tmp = tempdir().unwrap();
    let sheet = tmp.path().join("sheet.csv");
    std::fs::write(&sheet, SHEET).unwrap();
    let json_out = tmp.path().join("site_data.json");
    let html_out = tmp.path().join("index.html");
    std::fs::write(&json_out, "stale").unwrap();

    let schema = Schema::default();
    let table = source_for(sheet.to_str().unwrap(), None).unwrap().fetch().unwrap();
    let out = run(table, &schema).unwrap();
    let art = render(&out, &schema, OutputFormat::Both, 3, "now").unwrap();
    publish(&art, &json_out, &html_out).unwrap();

    let written = std::fs::read_to_string(&json_out).unwrap();
    assert_eq!(json_rows(&written).len(), 6);
    let page = std::fs::read_to_string(&html_out).unwrap();
    assert!(page.contains("Top 3 Projects by CO2 Impact"));
}

#[test]
fn fatal_errors_leave_previous_artifacts_alone() {
    let tmp = tempdir().unwrap();
    let json_out = tmp.path().join("site_data.json");
    std::fs::write(&json_out, "[\"previous\"]").unwrap();

    let empty = tmp.path().join("empty.csv");
    std::fs::write(&empty, "ID,Implemented\n").unwrap();
    let err = source_for(empty.to_str().unwrap(), None).unwrap().fetch().err().unwrap();
    assert!(matches!(err, PipelineError::EmptySource(_)));

    let schema = Schema::default();
    let no_status = decode_csv("ID,Gas Savings (MMBtu/yr)\n1,10\n", "sheet").unwrap();
    assert!(matches!(run(no_status, &schema), Err(PipelineError::MissingColumns(_))));

    assert_eq!(std::fs::read_to_string(&json_out).unwrap(), "[\"previous\"]");
}
