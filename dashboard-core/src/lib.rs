//! Core model for the hospital dashboard: date keys, dated records, dense
//! chart series and the transformations that align them.

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

use chrono::format::{Item, StrftimeItems};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

pub mod delta;
pub mod rolling;
pub mod series;
pub mod timestamp;

pub use delta::{compare, percent_change, Comparison, MISSING_SENTINEL};
pub use rolling::{entry_for_day, rolling_lookup};
pub use series::{align, align_field, pad_front};
pub use timestamp::normalize_timestamp;

/// Metrics written once per day into the dashboard log.
pub const DAILY_METRICS: [&str; 6] = [
    "arrived",
    "hosp",
    "refused",
    "signout",
    "deads",
    "reanimation",
];

/// Intensive care units tracked separately on the ICU boards.
pub const ICU_UNITS: [&str; 3] = ["ОРИТ №1", "ОРИТ №2", "ОРИТ №3"];

/// Longest chart window accepted from a config (ten years).
pub const MAX_WINDOW_DAYS: u32 = 3660;

/// Settings shared by every dashboard transformation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    /// Pattern producing canonical day keys.
    pub date_key_format: DateKeyFormat,
    /// Hours subtracted from raw timestamps before display.
    pub timestamp_offset_hours: i64,
    /// Number of days shown by the weekly charts.
    pub window_days: u32,
    /// Metric names used when a placeholder log entry is synthesized.
    pub metric_fields: Vec<String>,
    /// ICU unit names, in board order.
    pub icu_units: Vec<String>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            date_key_format: DateKeyFormat::default(),
            timestamp_offset_hours: 3,
            window_days: 7,
            metric_fields: DAILY_METRICS.iter().map(|name| name.to_string()).collect(),
            icu_units: ICU_UNITS.iter().map(|name| name.to_string()).collect(),
        }
    }
}

impl DashboardConfig {
    /// Fixed correction applied by the timestamp normalizer.
    pub fn timestamp_offset(&self) -> Result<Duration, DashboardError> {
        Duration::try_hours(self.timestamp_offset_hours).ok_or_else(|| {
            DashboardError::Parse(format!(
                "timestamp offset of {} hours is out of range",
                self.timestamp_offset_hours
            ))
        })
    }

    /// Reject settings that cannot be applied.
    ///
    /// The date key pattern is already checked when the config is
    /// deserialized; this covers the remaining numeric fields.
    pub fn validate(&self) -> Result<(), DashboardError> {
        self.timestamp_offset()?;
        if self.window_days > MAX_WINDOW_DAYS {
            return Err(DashboardError::Parse(format!(
                "window of {} days exceeds {MAX_WINDOW_DAYS}",
                self.window_days
            )));
        }
        Ok(())
    }

    /// Date grid of `window_days` days ending on `end`.
    pub fn window_ending_on(&self, end: NaiveDate) -> DateGrid {
        DateGrid::ending_on(end, self.window_days, &self.date_key_format)
    }
}

/// Canonical identifier of a calendar day, compared by exact string equality.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct DateKey(String);

impl DateKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DateKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DateKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Format/parse pair for [`DateKey`] values.
///
/// The pattern uses `chrono` strftime syntax; the dashboard default is
/// `%d.%m.%Y`. Patterns are checked on construction, so formatting a day
/// never fails.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "String", into = "String")]
pub struct DateKeyFormat(String);

impl Default for DateKeyFormat {
    fn default() -> Self {
        Self("%d.%m.%Y".to_string())
    }
}

impl DateKeyFormat {
    pub fn new(pattern: impl Into<String>) -> Result<Self, DashboardError> {
        let pattern = pattern.into();
        let invalid = |reason: &str| {
            DashboardError::Parse(format!("date key pattern `{pattern}` {reason}"))
        };

        if StrftimeItems::new(&pattern).any(|item| matches!(item, Item::Error)) {
            return Err(invalid("is not valid strftime"));
        }
        // Time and offset specifiers parse fine but cannot render a bare date.
        let mut rendered = String::new();
        write!(rendered, "{}", NaiveDate::default().format(&pattern))
            .map_err(|_| invalid("cannot format a calendar day"))?;

        Ok(Self(pattern))
    }

    pub fn pattern(&self) -> &str {
        &self.0
    }

    /// Render a calendar day as its canonical key.
    pub fn format(&self, date: NaiveDate) -> DateKey {
        DateKey(date.format(&self.0).to_string())
    }

    /// Read a key back into a calendar day.
    pub fn parse(&self, key: &DateKey) -> Result<NaiveDate, DashboardError> {
        NaiveDate::parse_from_str(key.as_str(), &self.0).map_err(|err| {
            DashboardError::Parse(format!("date key `{key}` does not match `{}`: {err}", self.0))
        })
    }
}

impl TryFrom<String> for DateKeyFormat {
    type Error = DashboardError;

    fn try_from(pattern: String) -> Result<Self, Self::Error> {
        Self::new(pattern)
    }
}

impl From<DateKeyFormat> for String {
    fn from(format: DateKeyFormat) -> Self {
        format.0
    }
}

/// Ordered list of day keys a chart is drawn against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct DateGrid(Vec<DateKey>);

impl DateGrid {
    pub fn new(keys: Vec<DateKey>) -> Self {
        Self(keys)
    }

    /// `days` consecutive keys, oldest first, the last one being `end`.
    pub fn ending_on(end: NaiveDate, days: u32, format: &DateKeyFormat) -> Self {
        let keys = (0..i64::from(days))
            .rev()
            .filter_map(|back| end.checked_sub_signed(Duration::days(back)))
            .map(|date| format.format(date))
            .collect();
        Self(keys)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DateKey> {
        self.0.iter()
    }

    pub fn keys(&self) -> &[DateKey] {
        &self.0
    }
}

impl FromIterator<DateKey> for DateGrid {
    fn from_iter<I: IntoIterator<Item = DateKey>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One day of dashboard statistics.
///
/// Serialized flat: `{"dates": "01.03.2024", "arrived": 41, "deads": null}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatedRecord {
    pub dates: DateKey,
    #[serde(flatten)]
    pub metrics: BTreeMap<String, Option<f64>>,
}

impl DatedRecord {
    pub fn new(dates: impl Into<DateKey>) -> Self {
        Self {
            dates: dates.into(),
            metrics: BTreeMap::new(),
        }
    }

    pub fn with_metric(mut self, name: impl Into<String>, value: Option<f64>) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }

    /// Entry for `dates` whose every metric is null.
    pub fn placeholder<S: AsRef<str>>(dates: DateKey, fields: &[S]) -> Self {
        Self {
            dates,
            metrics: fields
                .iter()
                .map(|field| (field.as_ref().to_string(), None))
                .collect(),
        }
    }

    /// Metric value; absent and null fields both read as `None`.
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied().flatten()
    }

    pub fn has_missing_metrics(&self) -> bool {
        self.metrics.values().any(Option::is_none)
    }
}

/// A single metric paired with the day it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatedValue {
    pub dates: DateKey,
    pub value: Option<f64>,
}

impl DatedValue {
    pub fn new(dates: impl Into<DateKey>, value: Option<f64>) -> Self {
        Self {
            dates: dates.into(),
            value,
        }
    }
}

/// Grid-aligned series; `None` marks a day without data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(transparent)]
pub struct DenseSeries(Vec<Option<f64>>);

impl DenseSeries {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Option<f64>] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<Option<f64>> {
        self.0
    }
}

impl From<Vec<Option<f64>>> for DenseSeries {
    fn from(values: Vec<Option<f64>>) -> Self {
        Self(values)
    }
}

/// Errors raised by dashboard transformations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DashboardError {
    #[error("percent change against a zero baseline")]
    DivisionByZero,
    #[error("metric value is not a finite number: {0}")]
    InvalidMetric(f64),
    #[error("could not parse input: {0}")]
    Parse(String),
    #[error("cannot pad a series of length {actual} to length {target}")]
    ShapeMismatch { target: usize, actual: usize },
    #[error("input is missing required data")]
    MissingData,
}
