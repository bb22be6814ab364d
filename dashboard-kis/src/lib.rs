//! Raw KIS (hospital information system) records to dashboard tables and series.

use dashboard_core::{DashboardError, DatedRecord};
use serde_json::{Map, Value};

pub mod extract;
pub mod projection;
pub mod tally;

pub use extract::{extract_dated, extract_field};
pub use projection::{project, ProjectedRow, ViewKind};

/// A record as delivered by the KIS export: column name to JSON value.
pub type RawRecord = Map<String, Value>;

/// Read a JSON array of objects.
pub fn parse_records(json: &str) -> Result<Vec<RawRecord>, DashboardError> {
    let value: Value =
        serde_json::from_str(json).map_err(|err| DashboardError::Parse(err.to_string()))?;
    records_from_value(value)
}

/// Same as [`parse_records`] for an already decoded value.
pub fn records_from_value(value: Value) -> Result<Vec<RawRecord>, DashboardError> {
    let Value::Array(items) = value else {
        return Err(DashboardError::MissingData);
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(record) => Ok(record),
            other => Err(DashboardError::Parse(format!(
                "record {index} is not an object: {other}"
            ))),
        })
        .collect()
}

/// Read the daily dashboard log (`[{"dates": ..., "arrived": ...}, ...]`).
pub fn parse_dated_records(json: &str) -> Result<Vec<DatedRecord>, DashboardError> {
    serde_json::from_str(json).map_err(|err| DashboardError::Parse(err.to_string()))
}
