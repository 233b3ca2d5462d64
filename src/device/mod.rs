//! Attendance terminals. The sync endpoint only sees [`PunchSource`]; which
//! terminal sits behind it is a startup decision.

pub mod biotime;
pub mod simulated;

use std::fmt;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::attendance::punch::DevicePunch;

pub use biotime::BioTimeClient;
pub use simulated::SimulatedSource;

/// Where to reach a terminal and how to log in. Supplied per request.
#[derive(Clone, Deserialize, ToSchema)]
pub struct DeviceConfig {
    #[serde(default)]
    #[schema(example = "192.168.1.201")]
    pub ip: String,
    #[schema(example = 80, nullable = true)]
    pub port: Option<u16>,
    #[schema(example = "admin", nullable = true)]
    pub username: Option<String>,
    #[schema(nullable = true)]
    pub password: Option<String>,
}

impl DeviceConfig {
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() => Some((user, pass)),
            _ => None,
        }
    }
}

impl fmt::Debug for DeviceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceConfig")
            .field("ip", &self.ip)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("device address is missing")]
    MissingAddress,
    #[error("could not reach device: {0}")]
    Connect(#[source] reqwest::Error),
    #[error("device rejected the credentials")]
    Auth,
    #[error("device answered with HTTP {0}")]
    Status(u16),
    #[error("unexpected device response: {0}")]
    Decode(#[source] reqwest::Error),
}

#[async_trait]
pub trait PunchSource: Send + Sync {
    /// Human readable name used in logs
    fn name(&self) -> &'static str;

    /// Punches recorded on `date`. Sources may return neighbouring days too;
    /// the deriver counts and drops them.
    async fn fetch_punches(
        &self,
        device: &DeviceConfig,
        date: NaiveDate,
    ) -> Result<Vec<DevicePunch>, DeviceError>;

    /// Reaches the terminal without pulling punches; returns a human readable
    /// confirmation such as the terminal serial number.
    async fn test_connection(&self, device: &DeviceConfig) -> Result<String, DeviceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(username: Option<&str>, password: Option<&str>) -> DeviceConfig {
        DeviceConfig {
            ip: "10.0.0.5".to_string(),
            port: None,
            username: username.map(str::to_string),
            password: password.map(str::to_string),
        }
    }

    #[test]
    fn test_credentials_need_both_parts() {
        assert_eq!(
            config(Some("admin"), Some("secret")).credentials(),
            Some(("admin", "secret"))
        );
        assert_eq!(config(Some("admin"), None).credentials(), None);
        assert_eq!(config(Some(""), Some("secret")).credentials(), None);
        assert_eq!(config(None, None).credentials(), None);
    }

    #[test]
    fn test_debug_masks_password() {
        let printed = format!("{:?}", config(Some("admin"), Some("secret")));
        assert!(printed.contains("admin"));
        assert!(!printed.contains("secret"));
    }
}
