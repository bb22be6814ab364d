//! WASM bridge between the dashboard transformations and the JavaScript chart code.

use dashboard_core::{
    align, compare, pad_front, percent_change, rolling_lookup, DashboardConfig, DashboardError,
    DateGrid, DateKey, DateKeyFormat, DatedRecord, DenseSeries,
};
use dashboard_kis::{extract_dated, project, records_from_value, ViewKind};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_wasm_bindgen::{from_value, Serializer};
use wasm_bindgen::prelude::*;

#[derive(Deserialize)]
struct JsDashboardConfig {
    #[serde(default)]
    date_key_format: Option<String>,
    #[serde(default)]
    timestamp_offset_hours: Option<i64>,
    #[serde(default)]
    window_days: Option<u32>,
    #[serde(default)]
    metric_fields: Option<Vec<String>>,
    #[serde(default)]
    icu_units: Option<Vec<String>>,
}

impl TryFrom<JsDashboardConfig> for DashboardConfig {
    type Error = DashboardError;

    fn try_from(cfg: JsDashboardConfig) -> Result<Self, Self::Error> {
        let mut base = DashboardConfig::default();
        if let Some(pattern) = cfg.date_key_format {
            base.date_key_format = DateKeyFormat::new(pattern)?;
        }
        if let Some(hours) = cfg.timestamp_offset_hours {
            base.timestamp_offset_hours = hours;
        }
        if let Some(days) = cfg.window_days {
            base.window_days = days;
        }
        if let Some(fields) = cfg.metric_fields {
            base.metric_fields = fields;
        }
        if let Some(units) = cfg.icu_units {
            base.icu_units = units;
        }
        base.validate()?;
        Ok(base)
    }
}

fn read_config(config: Option<JsValue>) -> Result<DashboardConfig, JsValue> {
    match config {
        Some(js_cfg) if !js_cfg.is_undefined() && !js_cfg.is_null() => {
            let cfg: JsDashboardConfig = from_js(js_cfg, "config")?;
            DashboardConfig::try_from(cfg).map_err(dashboard_error)
        }
        _ => Ok(DashboardConfig::default()),
    }
}

/// Route Rust panics to the browser console once the module is instantiated.
#[wasm_bindgen(start)]
pub fn start() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

fn from_js<T: DeserializeOwned>(value: JsValue, what: &str) -> Result<T, JsValue> {
    from_value(value).map_err(|err| JsValue::from_str(&format!("Could not read {what}: {err}")))
}

// Plain objects and `null` instead of JS `Map`/`undefined`, as the charts expect.
fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&Serializer::json_compatible())
        .map_err(|err| JsValue::from_str(&format!("Could not serialize result: {err}")))
}

fn dashboard_error(err: DashboardError) -> JsValue {
    JsValue::from_str(&format!("Dashboard error: {err}"))
}

/// Dense series of `field` over `grid` (an array of day keys).
#[wasm_bindgen]
pub fn align_series(records: JsValue, field: &str, grid: JsValue) -> Result<JsValue, JsValue> {
    let records: serde_json::Value = from_js(records, "records")?;
    let records = records_from_value(records).map_err(dashboard_error)?;
    let grid: DateGrid = from_js(grid, "date grid")?;
    let series: DenseSeries = align(&extract_dated(&records, field), &grid);
    to_js(&series)
}

/// Left-pad `values` with nulls up to `target` items.
#[wasm_bindgen]
pub fn pad_series(values: JsValue, target: usize) -> Result<JsValue, JsValue> {
    let values: Vec<Option<f64>> = from_js(values, "series")?;
    let padded = pad_front(&values, target).map_err(dashboard_error)?;
    to_js(&padded)
}

#[wasm_bindgen]
pub fn percent_delta(today: f64, yesterday: f64) -> Result<String, JsValue> {
    percent_change(today, yesterday).map_err(dashboard_error)
}

/// `[current, previous, "x.y%"]`, or `["null", "null", "null"]` when either side is missing.
#[wasm_bindgen]
pub fn compare_snapshots(
    current: JsValue,
    previous: JsValue,
    field: &str,
) -> Result<JsValue, JsValue> {
    let current: DatedRecord = from_js(current, "current snapshot")?;
    let previous: DatedRecord = from_js(previous, "previous snapshot")?;
    let comparison = compare(&current, &previous, field).map_err(dashboard_error)?;
    to_js(&comparison)
}

#[wasm_bindgen]
pub fn project_view(
    view: &str,
    records: JsValue,
    config: Option<JsValue>,
) -> Result<JsValue, JsValue> {
    let kind: ViewKind = view.parse().map_err(dashboard_error)?;
    let records: serde_json::Value = from_js(records, "records")?;
    let records = records_from_value(records).map_err(dashboard_error)?;
    let cfg = read_config(config)?;
    let rows = project(kind, &records, &cfg).map_err(dashboard_error)?;
    to_js(&rows)
}

#[wasm_bindgen]
pub fn normalize_timestamp(raw: &str, config: Option<JsValue>) -> Result<String, JsValue> {
    let cfg = read_config(config)?;
    let offset = cfg.timestamp_offset().map_err(dashboard_error)?;
    dashboard_core::normalize_timestamp(raw, offset).map_err(dashboard_error)
}

/// Entry `n` from the tail of the daily log, or a null placeholder for `today`.
#[wasm_bindgen]
pub fn latest_log_entry(
    log: JsValue,
    today: &str,
    n: usize,
    config: Option<JsValue>,
) -> Result<JsValue, JsValue> {
    let log: Vec<DatedRecord> = from_js(log, "daily log")?;
    let cfg = read_config(config)?;
    let entry = rolling_lookup(&log, &DateKey::from(today), n, &cfg.metric_fields[..]);
    to_js(&*entry)
}

/// Day keys of the configured window ending on `end` (given as a day key).
#[wasm_bindgen]
pub fn window_grid(end: &str, config: Option<JsValue>) -> Result<JsValue, JsValue> {
    let cfg = read_config(config)?;
    let end = cfg
        .date_key_format
        .parse(&DateKey::from(end))
        .map_err(dashboard_error)?;
    to_js(&cfg.window_ending_on(end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn js_config_overlays_defaults() {
        let raw = r#"{"timestamp_offset_hours": 0, "icu_units": ["ОРИТ"]}"#;
        let js: JsDashboardConfig = serde_json::from_str(raw).unwrap();
        let cfg = DashboardConfig::try_from(js).unwrap();
        assert_eq!(cfg.timestamp_offset_hours, 0);
        assert_eq!(cfg.icu_units, vec!["ОРИТ".to_string()]);
        assert_eq!(cfg.window_days, DashboardConfig::default().window_days);
        assert_eq!(cfg.date_key_format, DateKeyFormat::default());
    }

    #[test]
    fn empty_js_config_is_default() {
        let js: JsDashboardConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(DashboardConfig::try_from(js).unwrap(), DashboardConfig::default());
    }

    #[test]
    fn unusable_js_config_is_rejected() {
        for raw in [
            r#"{"date_key_format": "%d.%Q"}"#,
            r#"{"timestamp_offset_hours": 9000000000000000}"#,
        ] {
            let js: JsDashboardConfig = serde_json::from_str(raw).unwrap();
            assert!(
                matches!(DashboardConfig::try_from(js), Err(DashboardError::Parse(_))),
                "{raw} accepted"
            );
        }
    }
}
