use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
    /// Set by leave management, never derived from punches
    #[serde(rename = "On Leave")]
    OnLeave,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "Present",
            AttendanceStatus::Late => "Late",
            AttendanceStatus::Absent => "Absent",
            AttendanceStatus::OnLeave => "On Leave",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "Present" => Some(AttendanceStatus::Present),
            "Late" => Some(AttendanceStatus::Late),
            "Absent" => Some(AttendanceStatus::Absent),
            "On Leave" => Some(AttendanceStatus::OnLeave),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceSource {
    Device,
    Manual,
}

impl AttendanceSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceSource::Device => "device",
            AttendanceSource::Manual => "manual",
        }
    }
}

/// One classified attendance record for an employee on a day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[schema(example = json!({
    "employee_id": 1,
    "employee_name": "Ali",
    "employee_avatar": null,
    "date": "2024-07-29",
    "check_in": "08:05",
    "check_out": "16:01",
    "status": "Present",
    "hours_worked": "7:56",
    "late_minutes": null
}))]
pub struct DerivedAttendance {
    pub employee_id: i64,
    pub employee_name: String,
    pub employee_avatar: Option<String>,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    #[schema(value_type = Option<String>, example = "08:05")]
    pub check_in: Option<NaiveTime>,
    #[serde(with = "hhmm")]
    #[schema(value_type = Option<String>, example = "16:01")]
    pub check_out: Option<NaiveTime>,
    pub status: AttendanceStatus,
    #[schema(example = "7:56")]
    pub hours_worked: String,
    pub late_minutes: Option<i64>,
}

/// Row of the `attendance` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Attendance {
    pub employee_id: i64,
    pub date: NaiveDate,
    pub check_in: Option<NaiveTime>,
    pub check_out: Option<NaiveTime>,
    pub status: Option<String>,
    pub source: String,
    pub notes: Option<String>,
}

/// Attendance times travel as `HH:MM`, the same precision the deriver works at.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S>(value: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(t) => serializer.serialize_str(&t.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) => super::parse_time(&s)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid time `{s}`, expected HH:MM"))),
        }
    }
}

/// Accepts `HH:MM` and `HH:MM:SS`.
pub fn parse_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_db_round_trip_keeps_on_leave_spacing() {
        assert_eq!(AttendanceStatus::OnLeave.as_str(), "On Leave");
        assert_eq!(
            AttendanceStatus::from_db("On Leave"),
            Some(AttendanceStatus::OnLeave)
        );
        assert_eq!(AttendanceStatus::from_db("present"), None);
    }

    #[test]
    fn test_derived_attendance_serializes_times_as_hh_mm() {
        let record = DerivedAttendance {
            employee_id: 1,
            employee_name: "Ali".to_string(),
            employee_avatar: None,
            date: NaiveDate::from_ymd_opt(2024, 7, 29).unwrap(),
            check_in: NaiveTime::from_hms_opt(8, 5, 0),
            check_out: None,
            status: AttendanceStatus::Present,
            hours_worked: "-".to_string(),
            late_minutes: None,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["check_in"], "08:05");
        assert!(json["check_out"].is_null());
        assert_eq!(json["status"], "Present");
        assert_eq!(json["date"], "2024-07-29");
    }

    #[test]
    fn test_parse_time_accepts_seconds() {
        assert_eq!(parse_time("17:30"), NaiveTime::from_hms_opt(17, 30, 0));
        assert_eq!(parse_time("17:30:15"), NaiveTime::from_hms_opt(17, 30, 15));
        assert_eq!(parse_time("5pm"), None);
    }
}
