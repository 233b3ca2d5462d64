use serde::Serialize;
use utoipa::ToSchema;

use crate::device::DeviceConfig;

/// A registered attendance terminal.
#[derive(Clone, Serialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "name": "Main gate",
        "ip_address": "192.168.1.201",
        "port": 80,
        "username": "admin",
        "location": "HQ"
    })
)]
pub struct Device {
    pub id: i64,
    pub name: String,
    pub ip_address: String,
    #[schema(nullable = true)]
    pub port: Option<i64>,
    #[schema(nullable = true)]
    pub username: Option<String>,
    /// Never leaves the server
    #[serde(skip)]
    pub password: Option<String>,
    #[schema(nullable = true)]
    pub location: Option<String>,
}

impl Device {
    /// Connection settings for the device layer. A stored port outside the
    /// u16 range falls back to the configured default port.
    pub fn config(&self) -> DeviceConfig {
        DeviceConfig {
            ip: self.ip_address.clone(),
            port: self.port.and_then(|p| u16::try_from(p).ok()),
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_password_is_not_serialized() {
        let device = Device {
            id: 1,
            name: "Main gate".to_string(),
            ip_address: "10.0.0.5".to_string(),
            port: Some(70_000),
            username: Some("admin".to_string()),
            password: Some("secret".to_string()),
            location: None,
        };

        let json = serde_json::to_string(&device).unwrap();
        assert!(!json.contains("secret"));

        let config = device.config();
        assert_eq!(config.port, None);
        assert_eq!(config.credentials(), Some(("admin", "secret")));
    }
}
