use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{SkipReason, SkippedPunch};

/// Direction of a punch. Devices send it as `attState`; 0 and 1 are the only
/// codes we understand, anything else is reported rather than guessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    CheckIn,
    CheckOut,
}

impl Direction {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Direction::CheckIn),
            1 => Some(Direction::CheckOut),
            _ => None,
        }
    }
}

/// A punch after parsing: who, when (device wall clock) and which way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PunchEvent {
    pub employee_device_id: i64,
    pub timestamp: NaiveDateTime,
    pub direction: Direction,
}

impl PunchEvent {
    pub fn new(employee_device_id: i64, timestamp: NaiveDateTime, direction: Direction) -> Self {
        Self {
            employee_device_id,
            timestamp,
            direction,
        }
    }
}

/// Devices are loose about whether ids and states are numbers or strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LooseValue {
    Int(i64),
    Text(String),
}

impl LooseValue {
    fn as_i64(&self) -> Option<i64> {
        match self {
            LooseValue::Int(v) => Some(*v),
            LooseValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl From<i64> for LooseValue {
    fn from(value: i64) -> Self {
        LooseValue::Int(value)
    }
}

impl From<&str> for LooseValue {
    fn from(value: &str) -> Self {
        LooseValue::Text(value.to_string())
    }
}

/// A punch as the device collaborator hands it over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "userId": "1",
    "recordTime": "2024-07-29T08:05:00",
    "attState": 0
}))]
pub struct DevicePunch {
    #[schema(value_type = String)]
    pub user_id: LooseValue,
    pub record_time: String,
    #[serde(default)]
    #[schema(value_type = Option<i64>)]
    pub att_state: Option<LooseValue>,
}

impl DevicePunch {
    pub fn new(user_id: impl Into<LooseValue>, record_time: &str, att_state: i64) -> Self {
        Self {
            user_id: user_id.into(),
            record_time: record_time.to_string(),
            att_state: Some(LooseValue::Int(att_state)),
        }
    }

    pub fn parse(&self) -> Result<PunchEvent, SkipReason> {
        let employee_device_id = self
            .user_id
            .as_i64()
            .filter(|id| *id > 0)
            .ok_or(SkipReason::InvalidUserId)?;

        let timestamp =
            parse_timestamp(&self.record_time).ok_or(SkipReason::InvalidTimestamp)?;

        let code = self.att_state.as_ref().and_then(LooseValue::as_i64);
        let direction = code
            .and_then(Direction::from_code)
            .ok_or(SkipReason::UnknownDirection)?;

        Ok(PunchEvent::new(employee_device_id, timestamp, direction))
    }
}

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parses a device timestamp into its wall-clock value.
///
/// Timestamps carrying an offset keep the wall clock of that offset rather
/// than being shifted into the server's zone: the device clock is the one
/// attendance is judged against.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

/// Parses every device punch. Parsed events keep their input position so
/// later diagnostics can point back at the raw entry.
pub fn parse_all(raw: &[DevicePunch]) -> (Vec<(usize, PunchEvent)>, Vec<SkippedPunch>) {
    let mut events = Vec::with_capacity(raw.len());
    let mut skipped = Vec::new();

    for (index, punch) in raw.iter().enumerate() {
        match punch.parse() {
            Ok(event) => events.push((index, event)),
            Err(reason) => skipped.push(SkippedPunch { index, reason }),
        }
    }

    (events, skipped)
}
