//! Display formatting for admission and transfer timestamps.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};

use crate::DashboardError;

/// Output layout of [`normalize_timestamp`].
pub const DISPLAY_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

const NAIVE_LAYOUTS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Shift `raw` back by `offset` and render it as `DD.MM.YYYY HH:MM:SS`.
///
/// Offset-bearing inputs keep their own wall-clock time; the offset they
/// carry is not converted.
pub fn normalize_timestamp(raw: &str, offset: Duration) -> Result<String, DashboardError> {
    let wall_clock = parse_wall_clock(raw.trim())?;
    let shifted = wall_clock
        .checked_sub_signed(offset)
        .ok_or_else(|| DashboardError::Parse(format!("timestamp `{raw}` out of range")))?;
    Ok(shifted.format(DISPLAY_FORMAT).to_string())
}

fn parse_wall_clock(raw: &str) -> Result<NaiveDateTime, DashboardError> {
    if raw.is_empty() {
        return Err(DashboardError::Parse("empty timestamp".to_string()));
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.naive_local());
    }

    if let Some(parsed) = NAIVE_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(raw, layout).ok())
    {
        return Ok(parsed);
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| DashboardError::Parse(format!("unrecognized timestamp `{raw}`")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_hours() -> Duration {
        Duration::hours(3)
    }

    #[test]
    fn naive_timestamp_is_shifted() {
        assert_eq!(
            normalize_timestamp("2024-03-01T14:30:00", three_hours()).unwrap(),
            "01.03.2024 11:30:00"
        );
        assert_eq!(
            normalize_timestamp("2024-03-01 14:30:05.123", three_hours()).unwrap(),
            "01.03.2024 11:30:05"
        );
    }

    #[test]
    fn shift_can_cross_midnight() {
        assert_eq!(
            normalize_timestamp("2024-03-01T01:15:00+03:00", three_hours()).unwrap(),
            "29.02.2024 22:15:00"
        );
    }

    #[test]
    fn utc_suffix_keeps_wall_clock() {
        assert_eq!(
            normalize_timestamp("2024-03-01T10:00:00Z", three_hours()).unwrap(),
            "01.03.2024 07:00:00"
        );
    }

    #[test]
    fn bare_date_means_midnight() {
        assert_eq!(
            normalize_timestamp("2024-03-01", three_hours()).unwrap(),
            "29.02.2024 21:00:00"
        );
    }

    #[test]
    fn garbage_is_rejected() {
        for raw in ["", "   ", "yesterday", "2024-13-40T00:00:00"] {
            assert!(matches!(
                normalize_timestamp(raw, three_hours()),
                Err(DashboardError::Parse(_))
            ));
        }
    }
}
