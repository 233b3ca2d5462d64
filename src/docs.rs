use crate::api::attendance::{AttendanceEntry, AttendanceRequest};
use crate::api::employee::{CreateEmployee, EmployeeListResponse};
use crate::api::device::CreateDevice;
use crate::api::sync::{
    DeviceFailure, SyncAllRequest, SyncAllResponse, SyncRequest, SyncResponse,
};
use crate::attendance::punch::DevicePunch;
use crate::attendance::{SkipReason, SkippedPunch};
use crate::device::DeviceConfig;
use crate::model::attendance::{AttendanceSource, AttendanceStatus, DerivedAttendance};
use crate::model::device::Device;
use crate::model::employee::Employee;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRMS Attendance API",
        version = "0.1.0",
        description = r#"
## Attendance for the HRM System

Turns raw punches from biometric attendance terminals into one attendance
record per employee per day.

### 🔹 Key Features
- **Device Sync**
  - Pull punches from a terminal, derive Present / Late / Absent, store the result
  - Falls back to demo punches when the terminal is unreachable (configurable)
  - Sync every registered terminal in one call, test a terminal connection
- **Attendance**
  - Daily log with worked hours, per-employee history
  - Manual check-in and check-out
- **Employee Management**
  - Create, update, list, and view employee profiles

### 📦 Response Format
- JSON-based RESTful responses
- Times as `HH:MM`, worked hours as `H:MM` (`-` when a side is missing)

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::sync::sync_attendance,
        crate::api::sync::sync_all_devices,
        crate::api::sync::test_connection,

        crate::api::attendance::daily_log,
        crate::api::attendance::history,
        crate::api::attendance::check_in,
        crate::api::attendance::check_out,

        crate::api::employee::create_employee,
        crate::api::employee::get_employee,
        crate::api::employee::list_employees,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,

        crate::api::device::create_device,
        crate::api::device::list_devices,
        crate::api::device::delete_device
    ),
    components(
        schemas(
            SyncRequest,
            SyncResponse,
            SyncAllRequest,
            SyncAllResponse,
            DeviceFailure,
            DeviceConfig,
            CreateDevice,
            Device,
            DevicePunch,
            DerivedAttendance,
            AttendanceStatus,
            AttendanceSource,
            SkippedPunch,
            SkipReason,
            AttendanceEntry,
            AttendanceRequest,
            CreateEmployee,
            Employee,
            EmployeeListResponse
        )
    ),
    tags(
        (name = "Attendance", description = "Device sync and attendance APIs"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "Device", description = "Registered attendance terminals"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_attendance_paths() {
        let doc = ApiDoc::openapi();

        for path in [
            "/api/attendance/sync",
            "/api/attendance",
            "/api/attendance/history/{employee_id}",
            "/api/attendance/check-in",
            "/api/attendance/check-out",
            "/api/employee/{employee_id}",
            "/api/attendance/sync-all",
            "/api/attendance/test-connection",
            "/api/device",
            "/api/device/{device_id}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
