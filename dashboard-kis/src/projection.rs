//! Patient tables shown under the dashboard charts.
//!
//! Every view keeps a fixed list of source columns and renames them to the
//! labels printed in the table header. Columns missing from a record are left
//! out of its row, and columns a view does not list are dropped.

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use dashboard_core::{normalize_timestamp, DashboardConfig, DashboardError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::RawRecord;

/// Table a record collection is projected into.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    Discharge,
    Death,
    IcuAdmission,
    IcuTransfer,
    CurrentOccupancy,
    DeathByDepartment,
}

impl ViewKind {
    pub const ALL: [ViewKind; 6] = [
        ViewKind::Discharge,
        ViewKind::Death,
        ViewKind::IcuAdmission,
        ViewKind::IcuTransfer,
        ViewKind::CurrentOccupancy,
        ViewKind::DeathByDepartment,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ViewKind::Discharge => "discharge",
            ViewKind::Death => "death",
            ViewKind::IcuAdmission => "icu_admission",
            ViewKind::IcuTransfer => "icu_transfer",
            ViewKind::CurrentOccupancy => "current_occupancy",
            ViewKind::DeathByDepartment => "death_by_department",
        }
    }

    /// Columns of the view, in display order.
    pub fn columns(self) -> &'static [Column] {
        match self {
            ViewKind::Discharge => &DISCHARGE_COLUMNS,
            ViewKind::Death => &DEATH_COLUMNS,
            ViewKind::IcuAdmission => &ICU_ADMISSION_COLUMNS,
            ViewKind::IcuTransfer => &ICU_TRANSFER_COLUMNS,
            ViewKind::CurrentOccupancy => &CURRENT_OCCUPANCY_COLUMNS,
            ViewKind::DeathByDepartment => &DEATH_BY_DEPARTMENT_COLUMNS,
        }
    }

    /// Header label a source column is shown under in this view.
    pub fn label_for(self, source: &str) -> Option<&'static str> {
        self.columns()
            .iter()
            .find(|column| column.source == source)
            .map(|column| column.label)
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewKind {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        ViewKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| DashboardError::Parse(format!("unknown view `{s}`")))
    }
}

/// How a column's value is carried into the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Plain,
    /// Passed through the timestamp normalizer.
    Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub source: &'static str,
    pub label: &'static str,
    pub kind: ColumnKind,
}

const fn plain(source: &'static str, label: &'static str) -> Column {
    Column {
        source,
        label,
        kind: ColumnKind::Plain,
    }
}

const fn timestamp(source: &'static str, label: &'static str) -> Column {
    Column {
        source,
        label,
        kind: ColumnKind::Timestamp,
    }
}

const PATIENT: Column = plain("pat_fio", "ФИО пациента");
const CASE_NUMBER: Column = plain("ib_num", "№ истории болезни");
const SEX: Column = plain("sex", "Пол");
const AGE: Column = plain("age", "Возраст");
const DEPARTMENT: Column = plain("dept", "Отделение");
const BED_DAYS: Column = plain("days", "Койко-дни");
const PHYSICIAN: Column = plain("doc_fio", "Лечащий врач");
const ADMISSION_DIAGNOSIS: Column = plain("diag_arr", "Диагноз при поступлении");
const ICU_DIAGNOSIS: Column = plain("diag_start", "Диагноз при поступлении");

const DISCHARGE_COLUMNS: [Column; 9] = [
    PATIENT,
    CASE_NUMBER,
    SEX,
    AGE,
    DEPARTMENT,
    BED_DAYS,
    ADMISSION_DIAGNOSIS,
    plain("diag_out", "Диагноз при выписке"),
    PHYSICIAN,
];

const DEATH_COLUMNS: [Column; 10] = [
    PATIENT,
    CASE_NUMBER,
    SEX,
    AGE,
    timestamp("arriving_dt", "Дата поступления"),
    plain("state", "Состояние при поступлении"),
    DEPARTMENT,
    BED_DAYS,
    ADMISSION_DIAGNOSIS,
    plain("diag_dead", "Диагноз смерти"),
];

const ICU_ADMISSION_COLUMNS: [Column; 6] = [
    PATIENT,
    CASE_NUMBER,
    AGE,
    DEPARTMENT,
    PHYSICIAN,
    ICU_DIAGNOSIS,
];

const ICU_TRANSFER_COLUMNS: [Column; 8] = [
    PATIENT,
    CASE_NUMBER,
    AGE,
    DEPARTMENT,
    PHYSICIAN,
    plain("move_date", "Дата перевода"),
    plain("from_dept", "Переведён из"),
    ICU_DIAGNOSIS,
];

const CURRENT_OCCUPANCY_COLUMNS: [Column; 7] = [
    PATIENT,
    CASE_NUMBER,
    AGE,
    DEPARTMENT,
    PHYSICIAN,
    BED_DAYS,
    ICU_DIAGNOSIS,
];

const DEATH_BY_DEPARTMENT_COLUMNS: [Column; 6] = [
    DEPARTMENT,
    PATIENT,
    CASE_NUMBER,
    AGE,
    BED_DAYS,
    plain("diag_dead", "Диагноз смерти"),
];

/// One table row: header label to cell value, in column order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(transparent)]
pub struct ProjectedRow(Map<String, Value>);

impl ProjectedRow {
    pub fn get(&self, label: &str) -> Option<&Value> {
        self.0.get(label)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

/// Project every record into the table layout of `kind`.
///
/// Fails when a timestamp column holds a value that cannot be parsed, or
/// when the configured offset is out of range.
pub fn project(
    kind: ViewKind,
    records: &[RawRecord],
    config: &DashboardConfig,
) -> Result<Vec<ProjectedRow>, DashboardError> {
    let offset = config.timestamp_offset()?;
    records
        .iter()
        .map(|record| project_row(kind.columns(), record, offset))
        .collect()
}

fn project_row(
    columns: &[Column],
    record: &RawRecord,
    offset: Duration,
) -> Result<ProjectedRow, DashboardError> {
    let mut row = Map::with_capacity(columns.len());
    for column in columns {
        let Some(value) = record.get(column.source) else {
            continue;
        };
        let cell = match column.kind {
            ColumnKind::Plain => value.clone(),
            ColumnKind::Timestamp => timestamp_cell(column, value, offset)?,
        };
        row.insert(column.label.to_string(), cell);
    }
    Ok(ProjectedRow(row))
}

fn timestamp_cell(
    column: &Column,
    value: &Value,
    offset: Duration,
) -> Result<Value, DashboardError> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::String(raw) => normalize_timestamp(raw, offset).map(Value::String),
        other => Err(DashboardError::Parse(format!(
            "column `{}` is not a timestamp: {other}",
            column.source
        ))),
    }
}

pub fn project_discharges(
    records: &[RawRecord],
    config: &DashboardConfig,
) -> Result<Vec<ProjectedRow>, DashboardError> {
    project(ViewKind::Discharge, records, config)
}

/// Death log; the admission time is normalized for display.
pub fn project_deaths(
    records: &[RawRecord],
    config: &DashboardConfig,
) -> Result<Vec<ProjectedRow>, DashboardError> {
    project(ViewKind::Death, records, config)
}

pub fn project_icu_admissions(
    records: &[RawRecord],
    config: &DashboardConfig,
) -> Result<Vec<ProjectedRow>, DashboardError> {
    project(ViewKind::IcuAdmission, records, config)
}

pub fn project_icu_transfers(
    records: &[RawRecord],
    config: &DashboardConfig,
) -> Result<Vec<ProjectedRow>, DashboardError> {
    project(ViewKind::IcuTransfer, records, config)
}

pub fn project_current_occupancy(
    records: &[RawRecord],
    config: &DashboardConfig,
) -> Result<Vec<ProjectedRow>, DashboardError> {
    project(ViewKind::CurrentOccupancy, records, config)
}

pub fn project_deaths_by_department(
    records: &[RawRecord],
    config: &DashboardConfig,
) -> Result<Vec<ProjectedRow>, DashboardError> {
    project(ViewKind::DeathByDepartment, records, config)
}
