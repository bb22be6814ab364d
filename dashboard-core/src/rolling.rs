//! Lookup of today's entry in the append-only daily log.

use std::borrow::Cow;

use tracing::debug;

use crate::{DateKey, DatedRecord};

/// Entry `n` positions from the tail of `log` when it is dated `today`.
///
/// Falls back to a placeholder dated `today` with every field in
/// `metric_fields` set to null when the entry is stale, when `n` does not
/// address an entry, or when the log holds one entry or fewer. The last rule
/// applies even if that single entry is dated today.
pub fn rolling_lookup<'a, S: AsRef<str>>(
    log: &'a [DatedRecord],
    today: &DateKey,
    n: usize,
    metric_fields: &[S],
) -> Cow<'a, DatedRecord> {
    if log.len() <= 1 {
        debug!(len = log.len(), %today, "log too short, using placeholder");
        return Cow::Owned(DatedRecord::placeholder(today.clone(), metric_fields));
    }

    match log.len().checked_sub(n).and_then(|index| log.get(index)) {
        Some(entry) if entry.dates == *today => Cow::Borrowed(entry),
        Some(entry) => {
            debug!(found = %entry.dates, %today, "log not updated for today, using placeholder");
            Cow::Owned(DatedRecord::placeholder(today.clone(), metric_fields))
        }
        None => {
            debug!(n, len = log.len(), "offset outside log, using placeholder");
            Cow::Owned(DatedRecord::placeholder(today.clone(), metric_fields))
        }
    }
}

/// Most recent entry dated `day`, wherever it sits in `log`.
///
/// Unlike [`rolling_lookup`] the position of the entry does not matter, so
/// yesterday is found whether or not today's entry has been appended yet.
pub fn entry_for_day<'a, S: AsRef<str>>(
    log: &'a [DatedRecord],
    day: &DateKey,
    metric_fields: &[S],
) -> Cow<'a, DatedRecord> {
    match log.iter().rev().find(|entry| entry.dates == *day) {
        Some(entry) => Cow::Borrowed(entry),
        None => {
            debug!(%day, len = log.len(), "no log entry for day, using placeholder");
            Cow::Owned(DatedRecord::placeholder(day.clone(), metric_fields))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DAILY_METRICS;

    fn entry(dates: &str, arrived: f64) -> DatedRecord {
        DatedRecord::new(dates).with_metric("arrived", Some(arrived))
    }

    #[test]
    fn returns_tail_entry_dated_today() {
        let log = vec![entry("01.03.2024", 10.0), entry("02.03.2024", 12.0)];
        let today = DateKey::from("02.03.2024");
        let found = rolling_lookup(&log, &today, 1, &DAILY_METRICS);
        assert!(matches!(found, Cow::Borrowed(_)));
        assert_eq!(found.metric("arrived"), Some(12.0));
    }

    #[test]
    fn offset_counts_from_tail() {
        let log = vec![
            entry("01.03.2024", 10.0),
            entry("02.03.2024", 12.0),
            entry("03.03.2024", 8.0),
        ];
        let yesterday = DateKey::from("02.03.2024");
        let found = rolling_lookup(&log, &yesterday, 2, &DAILY_METRICS);
        assert_eq!(found.metric("arrived"), Some(12.0));
    }

    #[test]
    fn stale_log_gives_placeholder() {
        let log = vec![entry("01.03.2024", 10.0), entry("02.03.2024", 12.0)];
        let today = DateKey::from("03.03.2024");
        let found = rolling_lookup(&log, &today, 1, &DAILY_METRICS);
        assert_eq!(found.dates, today);
        assert_eq!(found.metrics.len(), DAILY_METRICS.len());
        assert!(found.metrics.values().all(Option::is_none));
    }

    #[test]
    fn single_entry_log_always_gives_placeholder() {
        let today = DateKey::from("02.03.2024");
        let log = vec![entry("02.03.2024", 12.0)];
        let found = rolling_lookup(&log, &today, 1, &DAILY_METRICS);
        assert!(matches!(found, Cow::Owned(_)));
        assert_eq!(found.metric("arrived"), None);
    }

    #[test]
    fn empty_log_gives_placeholder() {
        let today = DateKey::from("02.03.2024");
        let found = rolling_lookup(&[], &today, 1, &["arrived"]);
        assert_eq!(found.into_owned(), DatedRecord::new("02.03.2024").with_metric("arrived", None));
    }

    #[test]
    fn out_of_range_offset_gives_placeholder() {
        let log = vec![entry("01.03.2024", 10.0), entry("02.03.2024", 12.0)];
        let today = DateKey::from("02.03.2024");
        for n in [0, 3] {
            assert!(matches!(rolling_lookup(&log, &today, n, &DAILY_METRICS), Cow::Owned(_)));
        }
    }

    #[test]
    fn day_lookup_finds_yesterday_before_today_is_appended() {
        let log = vec![entry("01.03.2024", 10.0), entry("02.03.2024", 12.0)];
        let yesterday = DateKey::from("02.03.2024");

        // Positional lookup lands on the day before yesterday here.
        assert_eq!(rolling_lookup(&log, &yesterday, 2, &DAILY_METRICS).metric("arrived"), None);

        let found = entry_for_day(&log, &yesterday, &DAILY_METRICS);
        assert!(matches!(found, Cow::Borrowed(_)));
        assert_eq!(found.metric("arrived"), Some(12.0));
    }

    #[test]
    fn day_lookup_without_match_gives_placeholder() {
        let log = vec![entry("01.03.2024", 10.0)];
        let day = DateKey::from("05.03.2024");
        let found = entry_for_day(&log, &day, &DAILY_METRICS);
        assert_eq!(found.dates, day);
        assert!(found.metrics.values().all(Option::is_none));
    }
}
