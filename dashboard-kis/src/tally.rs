//! Daily counters written to the dashboard log.
//!
//! The nightly collection step reduces the day's admission, discharge and
//! ICU row sets to the six headline metrics plus per-unit ICU counts.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use dashboard_core::{DashboardConfig, DatedRecord};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use tracing::{info, warn};

use crate::RawRecord;

/// Flag column set to 1 for hospitalized arrivals and 0 for refusals.
pub const HOSPITALIZED_FIELD: &str = "hospitalized";
/// Referral channel of an arrival.
pub const CHANNEL_FIELD: &str = "channel";
/// Insurance category of an arrival.
pub const PATIENT_TYPE_FIELD: &str = "patient_type";
/// Outcome column of the discharge export.
pub const STATUS_FIELD: &str = "status";
pub const DEPT_FIELD: &str = "dept";
pub const STATUS_DEAD: &str = "Умер";
pub const STATUS_DISCHARGED: &str = "Выписан";

/// Referral channels and the keys they are reported under.
pub const ARRIVAL_CHANNELS: [(&str, &str); 4] = [
    ("103", "ch103"),
    ("Поликлиника", "clinic_only"),
    ("103 Поликлиника", "ch103_clinic"),
    ("самотек", "singly"),
];

pub const PATIENT_TYPES: [(&str, &str); 4] = [
    ("ЗЛ", "ZL"),
    ("Иногородний", "foreign"),
    ("ДМС", "moscow"),
    ("Не указано", "undefined"),
];

/// Sign-out statuses and their keys.
pub const SIGNOUT_STATUSES: [(&str, &str); 3] = [
    (STATUS_DEAD, "deads"),
    ("Переведен", "moved"),
    (STATUS_DISCHARGED, "signout"),
];

/// Departments on the discharges board.
pub const DEPARTMENT_KEYS: [(&str, &str); 6] = [
    ("ОРИТ №1", "oar1"),
    ("ОРИТ №2", "oar2"),
    ("ОРИТ №3", "oar3"),
    ("Кардиологическое отделение", "cardio_d"),
    ("Хирургическое отделение", "surgery_d"),
    ("Терапевтическое отделение", "therapy_d"),
];

fn str_field<'r>(row: &'r RawRecord, field: &str) -> Option<&'r str> {
    row.get(field).and_then(Value::as_str)
}

fn is_hospitalized(row: &RawRecord) -> bool {
    row.get(HOSPITALIZED_FIELD) == Some(&Value::from(1))
}

/// Rows whose `field` equals `expected`.
pub fn count_matching(rows: &[RawRecord], field: &str, expected: &Value) -> usize {
    rows.iter()
        .filter(|row| row.get(field) == Some(expected))
        .count()
}

/// One count per key, for rows whose string `field` equals that key.
pub fn count_by_values<S: AsRef<str>>(rows: &[RawRecord], field: &str, keys: &[S]) -> Vec<usize> {
    keys.iter()
        .map(|key| {
            rows.iter()
                .filter(|row| str_field(row, field) == Some(key.as_ref()))
                .count()
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ArrivalTotals {
    pub arrived: usize,
    pub hosp: usize,
    pub refused: usize,
}

/// Split the day's arrivals into hospitalized and refused.
pub fn arrival_totals(rows: &[RawRecord]) -> ArrivalTotals {
    let hosp = rows.iter().filter(|row| is_hospitalized(row)).count();
    ArrivalTotals {
        arrived: rows.len(),
        hosp,
        refused: rows.len() - hosp,
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SignoutTotals {
    pub signout: usize,
    pub deads: usize,
}

/// Total sign-outs and deaths.
///
/// Deaths are the rows with status `Умер`. The earlier collection job
/// derived them as the total minus rows whose cause was `Другая причина`;
/// that column is not part of the sign-out export read here.
pub fn signout_totals(rows: &[RawRecord]) -> SignoutTotals {
    SignoutTotals {
        signout: rows.len(),
        deads: count_matching(rows, STATUS_FIELD, &Value::from(STATUS_DEAD)),
    }
}

/// Counts keyed by board column, in the order the columns were added.
///
/// Serialized as a JSON object with that key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Breakdown(Vec<(String, usize)>);

impl Breakdown {
    /// Add `count` to `key`, appending the key on first use.
    pub fn add(&mut self, key: &str, count: usize) {
        match self.0.iter().position(|(existing, _)| existing == key) {
            Some(index) => self.0[index].1 += count,
            None => self.0.push((key.to_string(), count)),
        }
    }

    pub fn get(&self, key: &str) -> Option<usize> {
        self.0
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, count)| *count)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Breakdown {
    fn serialize<Ser: Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, count) in &self.0 {
            map.serialize_entry(key, count)?;
        }
        map.end()
    }
}

/// Hospitalized arrivals per referral channel, then per patient type.
///
/// Refused arrivals are left out. Every key of both tables is present, zero
/// when nothing matched.
pub fn arrival_breakdown(
    rows: &[RawRecord],
    channels: &[(&str, &str)],
    patient_types: &[(&str, &str)],
) -> Breakdown {
    let hospitalized: Vec<&RawRecord> = rows.iter().filter(|row| is_hospitalized(row)).collect();

    let mut breakdown = Breakdown::default();
    for (field, table) in [(CHANNEL_FIELD, channels), (PATIENT_TYPE_FIELD, patient_types)] {
        for (value, key) in table {
            let count = hospitalized
                .iter()
                .filter(|row| str_field(row, field) == Some(*value))
                .count();
            breakdown.add(key, count);
        }
    }
    breakdown
}

/// Sign-outs per status, then discharges per department key.
///
/// Every status key is present. Department keys appear in the order their
/// first discharge was seen; discharges from departments missing in
/// `departments` are skipped with a warning.
pub fn signout_breakdown(
    rows: &[RawRecord],
    statuses: &[(&str, &str)],
    departments: &[(&str, &str)],
) -> Breakdown {
    let mut breakdown = Breakdown::default();
    for (status, key) in statuses {
        let count = rows
            .iter()
            .filter(|row| str_field(row, STATUS_FIELD) == Some(*status))
            .count();
        breakdown.add(key, count);
    }

    let discharged = rows
        .iter()
        .filter(|row| str_field(row, STATUS_FIELD) == Some(STATUS_DISCHARGED));
    for row in discharged {
        let Some(dept) = str_field(row, DEPT_FIELD) else {
            continue;
        };
        match departments.iter().find(|(name, _)| *name == dept) {
            Some((_, key)) => breakdown.add(key, 1),
            None => warn!(dept, "discharge from an unmapped department"),
        }
    }
    breakdown
}

/// Patients per ICU unit, keyed `oar1`, `oar2`, ... in `units` order.
pub fn icu_unit_counts<S: AsRef<str>>(
    rows: &[RawRecord],
    unit_field: &str,
    units: &[S],
) -> BTreeMap<String, usize> {
    count_by_values(rows, unit_field, units)
        .into_iter()
        .enumerate()
        .map(|(index, count)| (format!("oar{}", index + 1), count))
        .collect()
}

/// Row sets collected for one day.
#[derive(Debug, Clone, Copy)]
pub struct DailySources<'a> {
    pub arrivals: &'a [RawRecord],
    pub signouts: &'a [RawRecord],
    pub icu_admissions: &'a [RawRecord],
}

/// Headline metrics for `date`.
///
/// Without sources every configured metric is null, which is logged as a
/// warning so the gap is visible in the collection log.
pub fn daily_record(
    date: NaiveDate,
    sources: Option<DailySources<'_>>,
    config: &DashboardConfig,
) -> DatedRecord {
    let dates = config.date_key_format.format(date);

    let record = match sources {
        None => DatedRecord::placeholder(dates, &config.metric_fields[..]),
        Some(sources) => {
            let arrivals = arrival_totals(sources.arrivals);
            let signouts = signout_totals(sources.signouts);
            [
                ("arrived", arrivals.arrived),
                ("hosp", arrivals.hosp),
                ("refused", arrivals.refused),
                ("signout", signouts.signout),
                ("deads", signouts.deads),
                ("reanimation", sources.icu_admissions.len()),
            ]
            .into_iter()
            .fold(DatedRecord::new(dates), |record, (name, count)| {
                record.with_metric(name, Some(count as f64))
            })
        }
    };

    if record.has_missing_metrics() {
        warn!(dates = %record.dates, "daily record contains nulls");
    } else {
        info!(dates = %record.dates, "daily record collected");
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(value: Value) -> Vec<RawRecord> {
        crate::records_from_value(value).unwrap()
    }

    fn arrivals() -> Vec<RawRecord> {
        rows(json!([
            {"hospitalized": 1, "dept": "Терапия", "channel": "103", "patient_type": "ЗЛ"},
            {"hospitalized": 1, "dept": "Хирургия", "channel": "самотек", "patient_type": "ДМС"},
            {"hospitalized": 0, "dept": "Приемное", "channel": "103", "patient_type": "ЗЛ"},
            {
                "hospitalized": 1,
                "dept": "Терапия",
                "channel": "Поликлиника",
                "patient_type": "Иногородний"
            }
        ]))
    }

    fn signouts() -> Vec<RawRecord> {
        rows(json!([
            {"dept": "Кардиологическое отделение", "status": "Выписан"},
            {"dept": "Кардиологическое отделение", "status": "Выписан"},
            {"dept": "ОРИТ №1", "status": "Умер"},
            {"dept": "Хирургическое отделение", "status": "Переведен"},
            {"dept": "Хирургическое отделение", "status": "Выписан"}
        ]))
    }

    #[test]
    fn arrivals_split_into_hosp_and_refused() {
        let totals = arrival_totals(&arrivals());
        assert_eq!(totals, ArrivalTotals { arrived: 4, hosp: 3, refused: 1 });
        assert_eq!(totals.arrived, totals.hosp + totals.refused);
    }

    #[test]
    fn arrival_breakdown_counts_hospitalized_only() {
        let breakdown = arrival_breakdown(&arrivals(), &ARRIVAL_CHANNELS, &PATIENT_TYPES);
        let keys: Vec<&str> = breakdown.keys().collect();
        assert_eq!(
            keys,
            [
                "ch103",
                "clinic_only",
                "ch103_clinic",
                "singly",
                "ZL",
                "foreign",
                "moscow",
                "undefined"
            ]
        );
        // The refused row also came by 103 and must not be counted.
        assert_eq!(breakdown.get("ch103"), Some(1));
        assert_eq!(breakdown.get("clinic_only"), Some(1));
        assert_eq!(breakdown.get("ch103_clinic"), Some(0));
        assert_eq!(breakdown.get("singly"), Some(1));
        assert_eq!(breakdown.get("ZL"), Some(1));
        assert_eq!(breakdown.get("foreign"), Some(1));
        assert_eq!(breakdown.get("moscow"), Some(1));
        assert_eq!(breakdown.get("undefined"), Some(0));
    }

    #[test]
    fn signouts_count_deaths() {
        assert_eq!(signout_totals(&signouts()), SignoutTotals { signout: 5, deads: 1 });
    }

    #[test]
    fn signout_breakdown_maps_departments() {
        let breakdown = signout_breakdown(&signouts(), &SIGNOUT_STATUSES, &DEPARTMENT_KEYS);
        let keys: Vec<&str> = breakdown.keys().collect();
        assert_eq!(keys, ["deads", "moved", "signout", "cardio_d", "surgery_d"]);
        assert_eq!(breakdown.get("deads"), Some(1));
        assert_eq!(breakdown.get("moved"), Some(1));
        assert_eq!(breakdown.get("signout"), Some(3));
        assert_eq!(breakdown.get("cardio_d"), Some(2));
        assert_eq!(breakdown.get("surgery_d"), Some(1));
        assert_eq!(breakdown.get("oar1"), None);
    }

    #[test]
    fn unmapped_department_is_skipped() {
        let rows = rows(json!([
            {"dept": "Приемное отделение", "status": "Выписан"},
            {"dept": "Терапевтическое отделение", "status": "Выписан"}
        ]));
        let breakdown = signout_breakdown(&rows, &SIGNOUT_STATUSES, &DEPARTMENT_KEYS);
        assert_eq!(breakdown.get("signout"), Some(2));
        assert_eq!(breakdown.get("therapy_d"), Some(1));
        assert_eq!(breakdown.len(), SIGNOUT_STATUSES.len() + 1);
    }

    #[test]
    fn breakdown_serializes_as_ordered_object() {
        let breakdown = signout_breakdown(&signouts(), &SIGNOUT_STATUSES, &DEPARTMENT_KEYS);
        assert_eq!(
            serde_json::to_string(&breakdown).unwrap(),
            r#"{"deads":1,"moved":1,"signout":3,"cardio_d":2,"surgery_d":1}"#
        );
    }

    #[test]
    fn icu_units_keyed_by_position() {
        let icu = rows(json!([
            {"dept": "ОРИТ №1"}, {"dept": "ОРИТ №3"}, {"dept": "ОРИТ №3"}, {"dept": "Терапия"}
        ]));
        let config = DashboardConfig::default();
        let counts = icu_unit_counts(&icu, "dept", &config.icu_units[..]);
        assert_eq!(
            counts,
            BTreeMap::from([
                ("oar1".to_string(), 1),
                ("oar2".to_string(), 0),
                ("oar3".to_string(), 2)
            ])
        );
    }

    #[test]
    fn daily_record_has_all_metrics() {
        let arrivals = arrivals();
        let signouts = signouts();
        let icu = rows(json!([{"dept": "ОРИТ №1"}, {"dept": "ОРИТ №2"}]));
        let sources = DailySources {
            arrivals: &arrivals,
            signouts: &signouts,
            icu_admissions: &icu,
        };
        let date = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let record = daily_record(date, Some(sources), &DashboardConfig::default());

        assert_eq!(record.dates.as_str(), "02.03.2024");
        assert_eq!(record.metric("arrived"), Some(4.0));
        assert_eq!(record.metric("refused"), Some(1.0));
        assert_eq!(record.metric("deads"), Some(1.0));
        assert_eq!(record.metric("reanimation"), Some(2.0));
        assert!(!record.has_missing_metrics());
    }

    #[test]
    fn unreachable_export_gives_null_record() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let record = daily_record(date, None, &DashboardConfig::default());
        assert_eq!(record.metrics.len(), 6);
        assert!(record.metrics.values().all(Option::is_none));
    }
}
