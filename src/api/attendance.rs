use crate::{
    attendance::{hours::worked_hours, to_minute},
    config::Config,
    model::attendance::{Attendance, AttendanceSource, AttendanceStatus},
};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::{Local, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{debug, error, info};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, ToSchema)]
pub struct AttendanceRequest {
    #[schema(example = 1)]
    pub employee_id: i64,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DailyLogQuery {
    /// Defaults to today
    #[param(value_type = Option<String>, format = "date", example = "2024-07-29")]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    #[param(value_type = Option<String>, format = "date", example = "2024-07-01")]
    pub from: Option<NaiveDate>,
    #[param(value_type = Option<String>, format = "date", example = "2024-07-31")]
    pub to: Option<NaiveDate>,
}

#[derive(sqlx::FromRow)]
struct DailyLogRow {
    employee_id: i64,
    employee_name: String,
    employee_avatar: Option<String>,
    check_in: Option<NaiveTime>,
    check_out: Option<NaiveTime>,
    status: Option<String>,
    source: Option<String>,
}

/// One employee's attendance on one day, as stored.
#[derive(Debug, Serialize, ToSchema)]
pub struct AttendanceEntry {
    #[schema(example = 1)]
    pub employee_id: i64,
    #[schema(example = "Ali Hassan", nullable = true)]
    pub employee_name: Option<String>,
    #[schema(nullable = true)]
    pub employee_avatar: Option<String>,
    #[schema(example = "2024-07-29", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[serde(with = "crate::model::attendance::hhmm")]
    #[schema(example = "08:05", value_type = Option<String>)]
    pub check_in: Option<NaiveTime>,
    #[serde(with = "crate::model::attendance::hhmm")]
    #[schema(example = "16:01", value_type = Option<String>)]
    pub check_out: Option<NaiveTime>,
    pub status: AttendanceStatus,
    /// `device` or `manual`; absent when nothing was recorded
    #[schema(example = "device", nullable = true)]
    pub source: Option<String>,
    #[schema(nullable = true)]
    pub notes: Option<String>,
    #[schema(example = "7:56")]
    pub hours_worked: String,
}

fn stored_status(status: Option<&str>) -> AttendanceStatus {
    status
        .and_then(AttendanceStatus::from_db)
        .unwrap_or(AttendanceStatus::Absent)
}

impl From<Attendance> for AttendanceEntry {
    fn from(row: Attendance) -> Self {
        Self {
            employee_id: row.employee_id,
            employee_name: None,
            employee_avatar: None,
            date: row.date,
            check_in: row.check_in,
            check_out: row.check_out,
            status: stored_status(row.status.as_deref()),
            source: Some(row.source),
            notes: row.notes,
            hours_worked: worked_hours(row.check_in, row.check_out),
        }
    }
}

/// Directory status of an employee, `None` when there is no such employee.
async fn employee_status(pool: &SqlitePool, employee_id: i64) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar("SELECT status FROM employees WHERE id = ?")
        .bind(employee_id)
        .fetch_optional(pool)
        .await
}

fn employee_not_found() -> HttpResponse {
    HttpResponse::NotFound().json(json!({
        "message": "Employee not found"
    }))
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/check-in",
    request_body = AttendanceRequest,
    responses(
        (status = 200, description = "Checked in successfully", body = Object, example = json!({
            "message": "Checked in successfully",
            "check_in": "09:12",
            "status": "Present"
        })),
        (status = 400, description = "Already checked in today, or employee not active", body = Object, example = json!({
            "message": "Already checked in today"
        })),
        (status = 404, description = "Employee not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
    payload: web::Json<AttendanceRequest>,
) -> actix_web::Result<impl Responder> {
    let employee_id = payload.employee_id;

    let status = employee_status(pool.get_ref(), employee_id)
        .await
        .map_err(|e| {
            error!(error = %e, employee_id, "Check-in failed");
            ErrorInternalServerError("Internal Server Error")
        })?;
    match status.as_deref() {
        None => return Ok(employee_not_found()),
        Some("active") => {}
        Some(_) => {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": "Employee is not active"
            })));
        }
    }

    let now = Local::now().naive_local();
    let today = now.date();
    let time = to_minute(now.time());
    let (status, _) = config.late_policy.classify(today, Some(time));

    // A row without a check-in (e.g. Absent from a device sync) gets filled in
    let result = sqlx::query(
        r#"
        INSERT INTO attendance (employee_id, date, check_in, status, source)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(employee_id, date) DO UPDATE SET
            check_in = excluded.check_in,
            status = excluded.status,
            source = excluded.source
        WHERE attendance.check_in IS NULL
        "#,
    )
    .bind(employee_id)
    .bind(today)
    .bind(time)
    .bind(status.as_str())
    .bind(AttendanceSource::Manual.as_str())
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Check-in failed");
        ErrorInternalServerError("Internal Server Error")
    })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Already checked in today"
        })));
    }

    info!(employee_id, %today, status = status.as_str(), "Manual check-in");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Checked in successfully",
        "check_in": time.format("%H:%M").to_string(),
        "status": status
    })))
}

/// Check-out endpoint
#[utoipa::path(
    put,
    path = "/api/attendance/check-out",
    request_body = AttendanceRequest,
    responses(
        (status = 200, description = "Checked out successfully", body = Object, example = json!({
            "message": "Checked out successfully",
            "check_out": "17:40"
        })),
        (status = 400, description = "No active check-in found for today", body = Object, example = json!({
            "message": "No active check-in found for today"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn check_out(
    pool: web::Data<SqlitePool>,
    payload: web::Json<AttendanceRequest>,
) -> actix_web::Result<impl Responder> {
    let employee_id = payload.employee_id;

    let now = Local::now().naive_local();
    let time = to_minute(now.time());

    let result = sqlx::query(
        r#"
        UPDATE attendance
        SET check_out = ?, source = ?
        WHERE employee_id = ?
        AND date = ?
        AND check_in IS NOT NULL
        AND check_out IS NULL
        "#,
    )
    .bind(time)
    .bind(AttendanceSource::Manual.as_str())
    .bind(employee_id)
    .bind(now.date())
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Check-out failed");
        ErrorInternalServerError("Internal Server Error")
    })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "No active check-in found for today"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Checked out successfully",
        "check_out": time.format("%H:%M").to_string()
    })))
}

/// Daily attendance log
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(DailyLogQuery),
    responses(
        (status = 200, description = "Every active employee with their attendance for the day", body = [AttendanceEntry]),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn daily_log(
    pool: web::Data<SqlitePool>,
    query: web::Query<DailyLogQuery>,
) -> actix_web::Result<impl Responder> {
    let date = query.date.unwrap_or_else(|| Local::now().date_naive());
    debug!(%date, "Fetching daily attendance log");

    let rows = sqlx::query_as::<_, DailyLogRow>(
        r#"
        SELECT e.id AS employee_id,
               e.full_name AS employee_name,
               e.avatar AS employee_avatar,
               a.check_in, a.check_out, a.status, a.source
        FROM employees e
        LEFT JOIN attendance a ON a.employee_id = e.id AND a.date = ?
        WHERE e.status = 'active'
        ORDER BY e.id ASC
        "#,
    )
    .bind(date)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, %date, "Failed to fetch daily attendance");
        ErrorInternalServerError("Database error")
    })?;

    let entries: Vec<AttendanceEntry> = rows
        .into_iter()
        .map(|row| AttendanceEntry {
            employee_id: row.employee_id,
            employee_name: Some(row.employee_name),
            employee_avatar: row.employee_avatar,
            date,
            check_in: row.check_in,
            check_out: row.check_out,
            status: stored_status(row.status.as_deref()),
            source: row.source,
            notes: None,
            hours_worked: worked_hours(row.check_in, row.check_out),
        })
        .collect();

    Ok(HttpResponse::Ok().json(entries))
}

/// Attendance history of one employee, newest first
#[utoipa::path(
    get,
    path = "/api/attendance/history/{employee_id}",
    params(
        ("employee_id" = i64, Path, description = "Employee ID"),
        HistoryQuery
    ),
    responses(
        (status = 200, description = "Stored attendance rows", body = [AttendanceEntry]),
        (status = 404, description = "Employee not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn history(
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    query: web::Query<HistoryQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = path.into_inner();

    let status = employee_status(pool.get_ref(), employee_id)
        .await
        .map_err(|e| {
            error!(error = %e, employee_id, "Failed to fetch attendance history");
            ErrorInternalServerError("Database error")
        })?;
    if status.is_none() {
        return Ok(employee_not_found());
    }

    let rows = sqlx::query_as::<_, Attendance>(
        r#"
        SELECT employee_id, date, check_in, check_out, status, source, notes
        FROM attendance
        WHERE employee_id = ?
        AND (? IS NULL OR date >= ?)
        AND (? IS NULL OR date <= ?)
        ORDER BY date DESC
        "#,
    )
    .bind(employee_id)
    .bind(query.from)
    .bind(query.from)
    .bind(query.to)
    .bind(query.to)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Failed to fetch attendance history");
        ErrorInternalServerError("Database error")
    })?;

    let entries: Vec<AttendanceEntry> = rows.into_iter().map(AttendanceEntry::from).collect();

    Ok(HttpResponse::Ok().json(entries))
}
