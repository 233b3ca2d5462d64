use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "full_name": "Ali Hassan",
        "email": "ali@company.com",
        "avatar": null,
        "device_user_id": 101,
        "department_id": 2,
        "hire_date": "2024-01-01",
        "status": "active"
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: i64,

    #[schema(example = "Ali Hassan")]
    pub full_name: String,

    #[schema(example = "ali@company.com", nullable = true)]
    pub email: Option<String>,

    #[schema(nullable = true)]
    pub avatar: Option<String>,

    /// Enrolment number on the attendance device, when it differs from `id`
    #[schema(example = 101, nullable = true)]
    pub device_user_id: Option<i64>,

    #[schema(example = 2, nullable = true)]
    pub department_id: Option<i64>,

    #[schema(example = "2024-01-01", value_type = Option<String>, format = "date")]
    pub hire_date: Option<NaiveDate>,

    #[schema(example = "active")]
    pub status: String,
}

/// Roster entry handed to the deriver: the subset of the directory it needs.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct RosterEntry {
    pub id: i64,
    pub full_name: String,
    pub avatar: Option<String>,
    pub device_user_id: Option<i64>,
}

impl RosterEntry {
    #[cfg(test)]
    pub fn new(id: i64, full_name: impl Into<String>) -> Self {
        Self {
            id,
            full_name: full_name.into(),
            avatar: None,
            device_user_id: None,
        }
    }

    /// Id this employee punches with on the device.
    pub fn device_id(&self) -> i64 {
        self.device_user_id.unwrap_or(self.id)
    }
}
