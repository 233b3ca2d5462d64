use crate::{
    api::device::registered_devices,
    attendance::{SkippedPunch, derive_from_device, policy::LatePolicy},
    config::Config,
    device::{DeviceConfig, PunchSource, SimulatedSource},
    model::{
        attendance::{AttendanceSource, DerivedAttendance},
        employee::RosterEntry,
    },
};
use actix_web::{
    HttpResponse, Responder, error::ErrorInternalServerError, http::StatusCode, web,
};
use chrono::{Local, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{error, info, warn};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SyncRequest {
    #[serde(flatten)]
    pub device: DeviceConfig,
    /// Day to derive; today when omitted
    #[schema(example = "2024-07-29", format = "date", value_type = Option<String>)]
    pub date: Option<NaiveDate>,
    /// Overrides the configured lateness threshold for this run
    #[serde(default, with = "crate::model::attendance::hhmm")]
    #[schema(example = "09:30", value_type = Option<String>)]
    pub late_threshold: Option<NaiveTime>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SyncResponse {
    #[schema(example = "Attendance synced successfully")]
    pub message: String,
    /// True when the device could not be reached and demo punches were used
    pub simulated: bool,
    #[schema(example = "2024-07-29", format = "date", value_type = String)]
    pub date: NaiveDate,
    pub records: Vec<DerivedAttendance>,
    pub skipped: Vec<SkippedPunch>,
    #[schema(example = 0)]
    pub outside_date: usize,
}

/// Employees eligible for derivation, ascending by id.
pub async fn active_roster(pool: &SqlitePool) -> Result<Vec<RosterEntry>, sqlx::Error> {
    sqlx::query_as::<_, RosterEntry>(
        r#"
        SELECT id, full_name, avatar, device_user_id
        FROM employees
        WHERE status = 'active'
        ORDER BY id ASC
        "#,
    )
    .fetch_all(pool)
    .await
}

/// Upserts derived records in one transaction. Rows entered by hand or by
/// leave management are left as they are.
async fn store_records(pool: &SqlitePool, records: &[DerivedAttendance]) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    for record in records {
        sqlx::query(
            r#"
            INSERT INTO attendance (employee_id, date, check_in, check_out, status, source)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(employee_id, date) DO UPDATE SET
                check_in = excluded.check_in,
                check_out = excluded.check_out,
                status = excluded.status
            WHERE attendance.source = excluded.source
            "#,
        )
        .bind(record.employee_id)
        .bind(record.date)
        .bind(record.check_in)
        .bind(record.check_out)
        .bind(record.status.as_str())
        .bind(AttendanceSource::Device.as_str())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await
}

/// Sync attendance from a device
#[utoipa::path(
    post,
    path = "/api/attendance/sync",
    request_body = SyncRequest,
    responses(
        (status = 200, description = "Derived attendance for the day", body = SyncResponse),
        (status = 400, description = "Device IP is required", body = Object, example = json!({
            "message": "Device IP is required"
        })),
        (status = 429, description = "Too many sync requests"),
        (status = 502, description = "Device unreachable and simulation fallback disabled"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn sync_attendance(
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
    source: web::Data<dyn PunchSource>,
    payload: web::Json<SyncRequest>,
) -> actix_web::Result<impl Responder> {
    let request = payload.into_inner();

    if request.device.ip.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Device IP is required"
        })));
    }

    let date = request
        .date
        .unwrap_or_else(|| Local::now().date_naive());
    let policy = request
        .late_threshold
        .map(LatePolicy::new)
        .unwrap_or(config.late_policy);

    let roster = active_roster(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to load roster");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let (punches, simulated) = match source.fetch_punches(&request.device, date).await {
        Ok(punches) => (punches, false),
        Err(e) if config.device_simulation_fallback => {
            warn!(
                error = %e,
                source = source.name(),
                ip = %request.device.ip,
                "Device sync failed, using simulated punches"
            );
            (SimulatedSource::punches(date), true)
        }
        Err(e) => {
            error!(error = %e, source = source.name(), ip = %request.device.ip, "Device sync failed");
            return Ok(HttpResponse::BadGateway().json(json!({
                "message": format!("Failed to sync with device: {e}")
            })));
        }
    };

    let derivation = derive_from_device(&roster, &punches, date, &policy);

    if !derivation.skipped.is_empty() || derivation.outside_date > 0 {
        warn!(
            %date,
            skipped = derivation.skipped.len(),
            outside_date = derivation.outside_date,
            "Some punches were not used"
        );
    }

    if !simulated {
        store_records(pool.get_ref(), &derivation.records)
            .await
            .map_err(|e| {
                error!(error = %e, %date, "Failed to store synced attendance");
                ErrorInternalServerError("Internal Server Error")
            })?;
    }

    info!(
        %date,
        simulated,
        punches = punches.len(),
        records = derivation.records.len(),
        "Attendance sync finished"
    );

    Ok(HttpResponse::Ok().json(SyncResponse {
        message: if simulated {
            "Device unreachable, showing simulated attendance".to_string()
        } else {
            "Attendance synced successfully".to_string()
        },
        simulated,
        date,
        records: derivation.records,
        skipped: derivation.skipped,
        outside_date: derivation.outside_date,
    }))
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct SyncAllRequest {
    /// Day to derive; today when omitted
    #[schema(example = "2024-07-29", format = "date", value_type = Option<String>)]
    pub date: Option<NaiveDate>,
    #[serde(default, with = "crate::model::attendance::hhmm")]
    #[schema(example = "09:30", value_type = Option<String>)]
    pub late_threshold: Option<NaiveTime>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeviceFailure {
    pub device_id: i64,
    #[schema(example = "Main gate")]
    pub name: String,
    #[schema(example = "device answered with HTTP 503")]
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SyncAllResponse {
    #[schema(example = "Attendance synced from all devices")]
    pub message: String,
    #[schema(example = "2024-07-29", format = "date", value_type = String)]
    pub date: NaiveDate,
    /// Registered devices that were asked for punches
    #[schema(example = 2)]
    pub devices: usize,
    /// False when any device failed; nothing is written in that case
    pub persisted: bool,
    pub records: Vec<DerivedAttendance>,
    /// Indices refer to the punches of all devices concatenated in device id order
    pub skipped: Vec<SkippedPunch>,
    #[schema(example = 0)]
    pub outside_date: usize,
    pub errors: Vec<DeviceFailure>,
}

/// Sync attendance from every registered device
///
/// Punches of all devices are merged before derivation, so an employee who
/// checks in at one gate and out at another gets a single record.
#[utoipa::path(
    post,
    path = "/api/attendance/sync-all",
    request_body(content = SyncAllRequest, description = "Optional day and threshold override"),
    responses(
        (status = 200, description = "All devices synced", body = SyncAllResponse),
        (status = 207, description = "Some devices failed, nothing stored", body = SyncAllResponse),
        (status = 429, description = "Too many sync requests"),
        (status = 502, description = "No registered device could be reached", body = SyncAllResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn sync_all_devices(
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
    source: web::Data<dyn PunchSource>,
    payload: Option<web::Json<SyncAllRequest>>,
) -> actix_web::Result<impl Responder> {
    let request = payload.map(web::Json::into_inner).unwrap_or_default();
    let date = request
        .date
        .unwrap_or_else(|| Local::now().date_naive());
    let policy = request
        .late_threshold
        .map(LatePolicy::new)
        .unwrap_or(config.late_policy);

    let devices = registered_devices(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to load devices");
        ErrorInternalServerError("Internal Server Error")
    })?;

    if devices.is_empty() {
        return Ok(HttpResponse::Ok().json(SyncAllResponse {
            message: "No devices registered".to_string(),
            date,
            devices: 0,
            persisted: false,
            records: Vec::new(),
            skipped: Vec::new(),
            outside_date: 0,
            errors: Vec::new(),
        }));
    }

    let roster = active_roster(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to load roster");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let mut punches = Vec::new();
    let mut errors = Vec::new();
    for device in &devices {
        match source.fetch_punches(&device.config(), date).await {
            Ok(mut fetched) => {
                info!(device = %device.name, punches = fetched.len(), "Device punches fetched");
                punches.append(&mut fetched);
            }
            Err(e) => {
                error!(error = %e, device = %device.name, ip = %device.ip_address, "Device sync failed");
                errors.push(DeviceFailure {
                    device_id: device.id,
                    name: device.name.clone(),
                    message: e.to_string(),
                });
            }
        }
    }

    let derivation = derive_from_device(&roster, &punches, date, &policy);

    let (status, message, persisted) = if errors.is_empty() {
        store_records(pool.get_ref(), &derivation.records)
            .await
            .map_err(|e| {
                error!(error = %e, %date, "Failed to store synced attendance");
                ErrorInternalServerError("Internal Server Error")
            })?;
        (StatusCode::OK, "Attendance synced from all devices", true)
    } else if errors.len() == devices.len() {
        (StatusCode::BAD_GATEWAY, "No device could be reached", false)
    } else {
        (StatusCode::MULTI_STATUS, "Some devices failed, attendance not stored", false)
    };

    info!(
        %date,
        devices = devices.len(),
        failed = errors.len(),
        punches = punches.len(),
        records = derivation.records.len(),
        persisted,
        "Multi-device sync finished"
    );

    Ok(HttpResponse::build(status).json(SyncAllResponse {
        message: message.to_string(),
        date,
        devices: devices.len(),
        persisted,
        records: derivation.records,
        skipped: derivation.skipped,
        outside_date: derivation.outside_date,
        errors,
    }))
}

/// Check that a device answers
#[utoipa::path(
    post,
    path = "/api/attendance/test-connection",
    request_body = DeviceConfig,
    responses(
        (status = 200, description = "Outcome of the connection attempt", body = Object, example = json!({
            "success": true,
            "message": "Connected. Serial number: CKJE201260123"
        })),
        (status = 400, description = "Device IP is required", body = Object, example = json!({
            "success": false,
            "message": "Device IP is required"
        }))
    ),
    tag = "Attendance"
)]
pub async fn test_connection(
    source: web::Data<dyn PunchSource>,
    payload: web::Json<DeviceConfig>,
) -> impl Responder {
    let device = payload.into_inner();

    if device.ip.trim().is_empty() {
        return HttpResponse::BadRequest().json(json!({
            "success": false,
            "message": "Device IP is required"
        }));
    }

    match source.test_connection(&device).await {
        Ok(message) => {
            info!(source = source.name(), ip = %device.ip, "Device connection test passed");
            HttpResponse::Ok().json(json!({
                "success": true,
                "message": message
            }))
        }
        Err(e) => {
            warn!(error = %e, source = source.name(), ip = %device.ip, "Device connection test failed");
            HttpResponse::Ok().json(json!({
                "success": false,
                "message": format!("Connection failed: {e}")
            }))
        }
    }
}
