use chrono::NaiveTime;

use crate::model::attendance::parse_time;

/// Shown when either side of the span is missing.
pub const NO_HOURS: &str = "-";

/// Elapsed time between a check-in and check-out as `H:MM`.
///
/// Same-day spans only: a check-out at or before the check-in yields `0:00`.
pub fn worked_hours(check_in: Option<NaiveTime>, check_out: Option<NaiveTime>) -> String {
    let (Some(start), Some(end)) = (check_in, check_out) else {
        return NO_HOURS.to_string();
    };

    let minutes = (end - start).num_minutes().max(0);
    format!("{}:{:02}", minutes / 60, minutes % 60)
}

/// String flavour of [`worked_hours`] for values read as `HH:MM[:SS]` text.
/// Text that is not a time is treated like a missing side.
pub fn calculate_hours(check_in: Option<&str>, check_out: Option<&str>) -> String {
    worked_hours(
        check_in.and_then(parse_time),
        check_out.and_then(parse_time),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_hours() {
        assert_eq!(calculate_hours(Some("09:00"), Some("17:30")), "8:30");
        assert_eq!(calculate_hours(Some("08:05"), Some("16:01")), "7:56");
        assert_eq!(calculate_hours(Some("07:00"), Some("19:05")), "12:05");
    }

    #[test]
    fn test_calculate_hours_clamps_negative_and_zero_spans() {
        assert_eq!(calculate_hours(Some("17:00"), Some("09:00")), "0:00");
        assert_eq!(calculate_hours(Some("09:00"), Some("09:00")), "0:00");
    }

    #[test]
    fn test_calculate_hours_placeholder_when_side_missing() {
        assert_eq!(calculate_hours(None, Some("17:00")), "-");
        assert_eq!(calculate_hours(Some("09:00"), None), "-");
        assert_eq!(calculate_hours(Some("late"), Some("17:00")), "-");
    }

    #[test]
    fn test_worked_hours_ignores_partial_minutes() {
        let start = NaiveTime::from_hms_opt(9, 0, 40).unwrap();
        let end = NaiveTime::from_hms_opt(9, 59, 30).unwrap();
        assert_eq!(worked_hours(Some(start), Some(end)), "0:58");
    }
}
