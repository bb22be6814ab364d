//! Day-over-day change figures shown next to the dashboard counters.

use serde::ser::SerializeTuple;
use serde::{Serialize, Serializer};

use crate::{DashboardError, DatedRecord};

/// Placeholder the chart code expects in every slot when data is missing.
pub const MISSING_SENTINEL: &str = "null";

/// Unsigned percent change from `yesterday` to `today`, e.g. `"12.5%"`.
///
/// The direction of the change is not encoded.
pub fn percent_change(today: f64, yesterday: f64) -> Result<String, DashboardError> {
    for value in [today, yesterday] {
        if !value.is_finite() {
            return Err(DashboardError::InvalidMetric(value));
        }
    }
    if yesterday == 0.0 {
        return Err(DashboardError::DivisionByZero);
    }

    let change = (today - yesterday) / yesterday * 100.0;
    Ok(format!("{:.1}%", change.abs()))
}

/// Current value, previous value and the percent change between them.
#[derive(Debug, Clone, PartialEq)]
pub enum Comparison {
    Missing,
    Present {
        current: f64,
        previous: f64,
        percent: String,
    },
}

impl Comparison {
    pub fn is_missing(&self) -> bool {
        matches!(self, Comparison::Missing)
    }

    pub fn percent(&self) -> Option<&str> {
        match self {
            Comparison::Missing => None,
            Comparison::Present { percent, .. } => Some(percent),
        }
    }
}

// Chart code consumes a 3-tuple and matches on the literal "null" triple.
impl Serialize for Comparison {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(3)?;
        match self {
            Comparison::Missing => {
                tuple.serialize_element(MISSING_SENTINEL)?;
                tuple.serialize_element(MISSING_SENTINEL)?;
                tuple.serialize_element(MISSING_SENTINEL)?;
            }
            Comparison::Present {
                current,
                previous,
                percent,
            } => {
                tuple.serialize_element(current)?;
                tuple.serialize_element(previous)?;
                tuple.serialize_element(percent)?;
            }
        }
        tuple.end()
    }
}

/// Compare one metric between two daily snapshots.
pub fn compare(
    current: &DatedRecord,
    previous: &DatedRecord,
    field: &str,
) -> Result<Comparison, DashboardError> {
    let (Some(current), Some(previous)) = (current.metric(field), previous.metric(field)) else {
        return Ok(Comparison::Missing);
    };

    Ok(Comparison::Present {
        current,
        previous,
        percent: percent_change(current, previous)?,
    })
}
