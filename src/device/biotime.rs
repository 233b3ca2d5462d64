use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{DeviceConfig, DeviceError, PunchSource};
use crate::attendance::punch::{DevicePunch, LooseValue};

const PAGE_SIZE: u32 = 500;
/// Hard stop for runaway pagination
const MAX_PAGES: usize = 200;

#[derive(Serialize)]
struct TokenAuthRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenAuthResponse {
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TransactionPage {
    next: Option<String>,
    /// Rows are kept raw so one malformed row cannot fail the whole page
    #[serde(default)]
    data: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct TerminalPage {
    #[serde(default)]
    data: Vec<Value>,
}

fn loose(value: Option<&Value>) -> Option<LooseValue> {
    match value? {
        Value::Number(n) => n.as_i64().map(LooseValue::Int),
        Value::String(s) => Some(LooseValue::Text(s.clone())),
        _ => None,
    }
}

/// Maps one row of `/iclock/api/transactions/`. Missing or mistyped fields
/// become values the punch parser rejects, so the row shows up as skipped.
fn transaction_punch(row: &Value) -> DevicePunch {
    DevicePunch {
        user_id: loose(row.get("emp_code")).unwrap_or_else(|| LooseValue::Text(String::new())),
        record_time: row
            .get("punch_time")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        att_state: loose(row.get("punch_state")),
    }
}

/// Client for terminals managed through the BioTime HTTP API.
#[derive(Debug, Clone)]
pub struct BioTimeClient {
    http: Client,
    default_port: u16,
}

impl BioTimeClient {
    pub fn new(timeout: Duration, default_port: u16) -> Result<Self, DeviceError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(DeviceError::Connect)?;

        Ok(Self { http, default_port })
    }

    fn base_url(&self, device: &DeviceConfig) -> Result<String, DeviceError> {
        let host = device.ip.trim();
        if host.is_empty() {
            return Err(DeviceError::MissingAddress);
        }
        let port = device.port.unwrap_or(self.default_port);
        Ok(format!("http://{host}:{port}"))
    }

    async fn token(&self, base: &str, device: &DeviceConfig) -> Result<Option<String>, DeviceError> {
        let Some((username, password)) = device.credentials() else {
            return Ok(None);
        };

        let response = self
            .http
            .post(format!("{base}/api-token-auth/"))
            .json(&TokenAuthRequest { username, password })
            .send()
            .await
            .map_err(DeviceError::Connect)?;

        let body: TokenAuthResponse = check_status(response)?
            .json()
            .await
            .map_err(DeviceError::Decode)?;

        body.token.map(Some).ok_or(DeviceError::Auth)
    }

    async fn get_json<T>(&self, url: &str, token: Option<&str>) -> Result<T, DeviceError>
    where
        T: DeserializeOwned,
    {
        let mut request = self.http.get(url);
        if let Some(token) = token {
            request = request.header(AUTHORIZATION, format!("Token {token}"));
        }

        let response = request.send().await.map_err(DeviceError::Connect)?;
        check_status(response)?
            .json()
            .await
            .map_err(DeviceError::Decode)
    }
}

/// First page of the transactions of one calendar day
fn transactions_url(base: &str, date: NaiveDate) -> String {
    format!(
        "{base}/iclock/api/transactions/?page_size={PAGE_SIZE}\
         &start_time={date}%2000:00:00&end_time={date}%2023:59:59"
    )
}

fn check_status(response: Response) -> Result<Response, DeviceError> {
    match response.status() {
        s if s.is_success() => Ok(response),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::BAD_REQUEST => {
            Err(DeviceError::Auth)
        }
        s => Err(DeviceError::Status(s.as_u16())),
    }
}

#[async_trait]
impl PunchSource for BioTimeClient {
    fn name(&self) -> &'static str {
        "biotime"
    }

    async fn fetch_punches(
        &self,
        device: &DeviceConfig,
        date: NaiveDate,
    ) -> Result<Vec<DevicePunch>, DeviceError> {
        let base = self.base_url(device)?;
        let token = self.token(&base, device).await?;

        let mut punches = Vec::new();
        let mut next = Some(transactions_url(&base, date));
        let mut pages = 0;

        while let Some(url) = next.take() {
            debug!(url = %url, "Fetching transaction page");

            let page: TransactionPage = self.get_json(&url, token.as_deref()).await?;

            punches.extend(page.data.iter().map(transaction_punch));
            pages += 1;

            if pages >= MAX_PAGES {
                warn!(pages, "Transaction pagination limit reached, stopping");
                break;
            }
            next = page.next;
        }

        info!(ip = %device.ip, count = punches.len(), pages, "Fetched device punches");
        Ok(punches)
    }

    async fn test_connection(&self, device: &DeviceConfig) -> Result<String, DeviceError> {
        let base = self.base_url(device)?;
        let token = self.token(&base, device).await?;

        let url = format!("{base}/iclock/api/terminals/?page_size=1");
        let page: TerminalPage = self.get_json(&url, token.as_deref()).await?;

        Ok(connection_message(&page))
    }
}

fn connection_message(page: &TerminalPage) -> String {
    match page
        .data
        .first()
        .and_then(|terminal| terminal.get("sn"))
        .and_then(Value::as_str)
    {
        Some(serial) => format!("Connected. Serial number: {serial}"),
        None => "Connected, no terminal registered yet".to_string(),
    }
}
