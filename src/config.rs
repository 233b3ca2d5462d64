use std::env;
use std::fmt::Display;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use dotenvy::dotenv;

use crate::attendance::policy::LatePolicy;
use crate::model::attendance::parse_time;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceMode {
    /// Pull punches from a BioTime-managed terminal
    BioTime,
    /// Never touch the network; serve the demo punches
    Simulated,
}

impl FromStr for DeviceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "biotime" => Ok(DeviceMode::BioTime),
            "simulated" => Ok(DeviceMode::Simulated),
            other => Err(format!("unknown device mode `{other}`")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_addr: String,
    pub database_url: String,
    pub database_max_connections: u32,
    pub api_prefix: String,

    // Rate limiting
    pub rate_protected_per_min: u32,
    pub rate_sync_per_min: u32,

    pub late_policy: LatePolicy,

    // Attendance device
    pub device_mode: DeviceMode,
    pub device_port: u16,
    pub device_timeout_ms: u64,
    pub device_simulation_fallback: bool,

    pub log_dir: String,
    pub log_level: tracing::Level,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            server_addr: var("SERVER_ADDR").context("SERVER_ADDR must be set")?,
            database_url: var("DATABASE_URL")
                .unwrap_or_else(|| "sqlite:hrms.db?mode=rwc".to_string()),
            database_max_connections: parse_or(&var, "DATABASE_MAX_CONNECTIONS", 5)?,
            api_prefix: var("API_PREFIX").unwrap_or_else(|| "/api".to_string()),

            rate_protected_per_min: parse_or(&var, "RATE_PROTECTED_PER_MIN", 1000)?,
            rate_sync_per_min: parse_or(&var, "RATE_SYNC_PER_MIN", 10)?,

            late_policy: late_policy(&var)?,

            device_mode: parse_or(&var, "DEVICE_MODE", DeviceMode::BioTime)?,
            device_port: parse_or(&var, "DEVICE_PORT", 80)?,
            device_timeout_ms: parse_or(&var, "DEVICE_TIMEOUT_MS", 5000)?, // 5 seconds
            device_simulation_fallback: parse_or(&var, "DEVICE_SIMULATION_FALLBACK", true)?,

            log_dir: var("LOG_DIR").unwrap_or_else(|| "logs".to_string()),
            log_level: parse_or(&var, "LOG_LEVEL", tracing::Level::DEBUG)?,
        })
    }
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("invalid {key} `{raw}`: {e}")),
        None => Ok(default),
    }
}

/// LATE_THRESHOLD wins; otherwise SHIFT_START plus SHIFT_GRACE_IN_MINUTES;
/// otherwise 09:30.
fn late_policy(var: &impl Fn(&str) -> Option<String>) -> Result<LatePolicy> {
    if let Some(raw) = var("LATE_THRESHOLD") {
        let threshold =
            parse_time(&raw).ok_or_else(|| anyhow!("invalid LATE_THRESHOLD `{raw}`, expected HH:MM"))?;
        return Ok(LatePolicy::new(threshold));
    }

    if let Some(raw) = var("SHIFT_START") {
        let start =
            parse_time(&raw).ok_or_else(|| anyhow!("invalid SHIFT_START `{raw}`, expected HH:MM"))?;
        let grace = parse_or(var, "SHIFT_GRACE_IN_MINUTES", 0u32)?;
        return Ok(LatePolicy::from_shift(start, grace));
    }

    Ok(LatePolicy::default())
}
