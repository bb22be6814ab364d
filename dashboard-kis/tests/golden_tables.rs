use std::fs;

use chrono::NaiveDate;
use dashboard_core::{align, align_field, DashboardConfig, DateKey};
use dashboard_kis::projection::project_deaths;
use dashboard_kis::{extract_dated, parse_dated_records, parse_records};
use serde_json::Value;

fn fixture_path(name: &str) -> String {
    format!("{}/tests/data/{name}", env!("CARGO_MANIFEST_DIR"))
}

fn read_fixture(name: &str) -> String {
    fs::read_to_string(fixture_path(name)).expect("fixture is readable")
}

#[test]
fn death_table_matches_golden() {
    let records = parse_records(&read_fixture("deaths_export.json")).expect("export parses");

    let rows = project_deaths(&records, &DashboardConfig::default()).expect("rows project");
    let actual = serde_json::to_value(&rows).expect("rows serialize");

    let expected: Value =
        serde_json::from_str(&read_fixture("deaths_table.json")).expect("golden is valid");
    assert_eq!(actual, expected);

    // Column order is part of the table layout.
    let labels: Vec<&str> = rows[0].labels().collect();
    let expected_labels: Vec<&str> = expected[0]
        .as_object()
        .expect("golden row is an object")
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(labels, expected_labels);
}

#[test]
fn weekly_series_matches_golden() {
    let config = DashboardConfig::default();
    let end = NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid date");
    let grid = config.window_ending_on(end);

    let log_json = read_fixture("daily_log.json");
    let log = parse_dated_records(&log_json).expect("log parses");

    let expected: Value =
        serde_json::from_str(&read_fixture("weekly_series.json")).expect("golden is valid");
    assert_eq!(serde_json::to_value(&grid).expect("grid serializes"), expected["grid"]);

    for field in ["arrived", "deads"] {
        let series = align_field(&log, field, &grid);
        assert_eq!(series.len(), grid.len());
        assert_eq!(serde_json::to_value(&series).expect("series serializes"), expected[field]);
    }

    // The raw path through extract_dated must agree with the typed one.
    let raw = parse_records(&log_json).expect("log parses as raw records");
    let via_raw = align(&extract_dated(&raw, "arrived"), &grid);
    assert_eq!(via_raw, align_field(&log, "arrived", &grid));
    assert_eq!(grid.keys().last(), Some(&DateKey::from("01.03.2024")));
}
