use chrono::{Duration, NaiveDate, NaiveTime};

use crate::model::attendance::AttendanceStatus;

/// Cutoff after which a check-in counts as late.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatePolicy {
    pub threshold: NaiveTime,
}

impl Default for LatePolicy {
    fn default() -> Self {
        Self {
            threshold: NaiveTime::from_hms_opt(9, 30, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

impl LatePolicy {
    pub fn new(threshold: NaiveTime) -> Self {
        Self { threshold }
    }

    /// Threshold from a shift definition: start time plus the grace-in minutes.
    /// Saturates at 23:59 instead of wrapping past midnight.
    pub fn from_shift(start: NaiveTime, grace_in_minutes: u32) -> Self {
        let last_minute = NaiveTime::from_hms_opt(23, 59, 0).unwrap_or(NaiveTime::MIN);
        let (threshold, wrapped) =
            start.overflowing_add_signed(Duration::minutes(i64::from(grace_in_minutes)));
        Self {
            threshold: if wrapped != 0 { last_minute } else { threshold },
        }
    }

    /// Status and minutes late for a day's first check-in.
    ///
    /// Both sides are anchored on `date` so the comparison is between two
    /// datetimes of the same day.
    pub fn classify(
        &self,
        date: NaiveDate,
        check_in: Option<NaiveTime>,
    ) -> (AttendanceStatus, Option<i64>) {
        let Some(check_in) = check_in else {
            return (AttendanceStatus::Absent, None);
        };

        let arrived = date.and_time(check_in);
        let cutoff = date.and_time(self.threshold);

        if arrived > cutoff {
            let late = (arrived - cutoff).num_minutes();
            (AttendanceStatus::Late, Some(late.max(1)))
        } else {
            (AttendanceStatus::Present, None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 29).unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_default_threshold_is_half_past_nine() {
        assert_eq!(LatePolicy::default().threshold, t(9, 30));
    }

    #[test]
    fn test_classify_boundary() {
        let policy = LatePolicy::default();
        assert_eq!(
            policy.classify(day(), Some(t(9, 30))),
            (AttendanceStatus::Present, None)
        );
        assert_eq!(
            policy.classify(day(), Some(t(9, 31))),
            (AttendanceStatus::Late, Some(1))
        );
        assert_eq!(
            policy.classify(day(), Some(t(10, 45))),
            (AttendanceStatus::Late, Some(75))
        );
    }

    #[test]
    fn test_classify_without_check_in_is_absent() {
        assert_eq!(
            LatePolicy::default().classify(day(), None),
            (AttendanceStatus::Absent, None)
        );
    }

    #[test]
    fn test_from_shift_adds_grace() {
        assert_eq!(LatePolicy::from_shift(t(8, 0), 15).threshold, t(8, 15));
        assert_eq!(LatePolicy::from_shift(t(23, 50), 30).threshold, t(23, 59));
    }
}
