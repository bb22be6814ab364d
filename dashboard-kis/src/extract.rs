//! Single-field views of raw record collections.

use dashboard_core::{DateKey, DatedValue};
use serde_json::Value;
use tracing::debug;

use crate::RawRecord;

/// Value of `field` for every record, in input order; missing fields read as null.
pub fn extract_field(records: &[RawRecord], field: &str) -> Vec<Value> {
    records
        .iter()
        .map(|record| record.get(field).cloned().unwrap_or(Value::Null))
        .collect()
}

/// Pair `field` with each record's `dates` key, ready for alignment.
///
/// Records without a string `dates` cannot be placed on a grid and are
/// skipped. Non-numeric values become `None`.
pub fn extract_dated(records: &[RawRecord], field: &str) -> Vec<DatedValue> {
    let mut skipped = 0usize;
    let paired: Vec<DatedValue> = records
        .iter()
        .filter_map(|record| {
            let Some(dates) = record.get("dates").and_then(Value::as_str) else {
                skipped += 1;
                return None;
            };
            Some(DatedValue {
                dates: DateKey::from(dates),
                value: record.get(field).and_then(Value::as_f64),
            })
        })
        .collect();

    if skipped > 0 {
        debug!(skipped, field, "records without a dates key skipped");
    }
    paired
}
