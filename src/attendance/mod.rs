//! Attendance derivation: raw device punches in, one classified record per
//! rostered employee out.
//!
//! Everything here is pure. Callers fetch the roster and the punches, pick the
//! target day once, and get back the records together with the punches that
//! had to be left out.

pub mod hours;
pub mod policy;
pub mod punch;

use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::attendance::DerivedAttendance;
use crate::model::employee::RosterEntry;
use hours::worked_hours;
use policy::LatePolicy;
use punch::{DevicePunch, Direction, PunchEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    InvalidUserId,
    InvalidTimestamp,
    UnknownDirection,
    UnmappedDeviceId,
}

/// A punch left out of aggregation, by its position in the caller's input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct SkippedPunch {
    pub index: usize,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Derivation {
    /// One record per rostered employee, ascending by employee id
    pub records: Vec<DerivedAttendance>,
    pub skipped: Vec<SkippedPunch>,
    /// Well-formed punches that belong to another day
    pub outside_date: usize,
}

#[derive(Debug, Default)]
struct DayPunches {
    first_in: Option<NaiveTime>,
    last_out: Option<NaiveTime>,
}

impl DayPunches {
    fn record(&mut self, direction: Direction, time: NaiveTime) {
        match direction {
            Direction::CheckIn => {
                if self.first_in.is_none_or(|current| time < current) {
                    self.first_in = Some(time);
                }
            }
            Direction::CheckOut => {
                if self.last_out.is_none_or(|current| time > current) {
                    self.last_out = Some(time);
                }
            }
        }
    }
}

/// Drops seconds; attendance is kept at minute precision.
pub fn to_minute(time: NaiveTime) -> NaiveTime {
    time.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(time)
}

/// Derives one attendance record per rostered employee for `target_date`.
pub fn derive_attendance(
    employees: &[RosterEntry],
    punches: &[PunchEvent],
    target_date: NaiveDate,
    policy: &LatePolicy,
) -> Derivation {
    derive_indexed(employees, punches.iter().enumerate(), target_date, policy)
}

/// Parses device punches and derives from the ones that parse. Diagnostics
/// from both steps refer to positions in `raw`.
pub fn derive_from_device(
    employees: &[RosterEntry],
    raw: &[DevicePunch],
    target_date: NaiveDate,
    policy: &LatePolicy,
) -> Derivation {
    let (parsed, mut skipped) = punch::parse_all(raw);

    let mut derivation = derive_indexed(
        employees,
        parsed.iter().map(|(index, event)| (*index, event)),
        target_date,
        policy,
    );

    skipped.append(&mut derivation.skipped);
    skipped.sort_by_key(|s| s.index);
    derivation.skipped = skipped;
    derivation
}

fn derive_indexed<'a>(
    employees: &[RosterEntry],
    punches: impl Iterator<Item = (usize, &'a PunchEvent)>,
    target_date: NaiveDate,
    policy: &LatePolicy,
) -> Derivation {
    let mut roster: BTreeMap<i64, (&RosterEntry, DayPunches)> = BTreeMap::new();
    let mut by_device: HashMap<i64, i64> = HashMap::new();

    for employee in employees.iter().filter(|e| e.id > 0) {
        if roster.contains_key(&employee.id) {
            continue;
        }
        roster.insert(employee.id, (employee, DayPunches::default()));
    }

    // Explicit enrolments claim their device ids before employees that
    // punch with their own id.
    let (explicit, implicit): (Vec<&RosterEntry>, Vec<&RosterEntry>) = roster
        .values()
        .map(|(employee, _)| *employee)
        .partition(|employee| employee.device_user_id.is_some());
    for employee in explicit.into_iter().chain(implicit) {
        by_device.entry(employee.device_id()).or_insert(employee.id);
    }

    let mut skipped = Vec::new();
    let mut outside_date = 0;

    for (index, punch) in punches {
        let Some(day) = by_device
            .get(&punch.employee_device_id)
            .and_then(|id| roster.get_mut(id))
            .map(|(_, day)| day)
        else {
            skipped.push(SkippedPunch {
                index,
                reason: SkipReason::UnmappedDeviceId,
            });
            continue;
        };

        if punch.timestamp.date() != target_date {
            outside_date += 1;
            continue;
        }

        day.record(punch.direction, to_minute(punch.timestamp.time()));
    }

    let records = roster
        .into_values()
        .map(|(employee, day)| {
            let (status, late_minutes) = policy.classify(target_date, day.first_in);
            DerivedAttendance {
                employee_id: employee.id,
                employee_name: employee.full_name.clone(),
                employee_avatar: employee.avatar.clone(),
                date: target_date,
                check_in: day.first_in,
                check_out: day.last_out,
                status,
                hours_worked: worked_hours(day.first_in, day.last_out),
                late_minutes,
            }
        })
        .collect();

    Derivation {
        records,
        skipped,
        outside_date,
    }
}
