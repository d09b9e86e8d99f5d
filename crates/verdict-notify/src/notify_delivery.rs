//! Delivery executor for webhook-backed channels.
//!
//! Posts JSON with a bounded timeout and classifies the response. Failures are
//! returned as [`DeliveryError`] values carrying a stable reason code so the
//! dispatcher can fold them into per-channel receipts.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::{redirect::Policy, StatusCode};
use serde::Serialize;

use crate::notify_config::ChannelKind;

pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 5_000;
const DETAIL_LIMIT_CHARS: usize = 512;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `DeliveryStatus` values.
pub enum DeliveryStatus {
    Delivered,
    Skipped,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
/// Outcome of one channel delivery.
pub struct DeliveryReceipt {
    pub channel: String,
    pub status: DeliveryStatus,
    pub reason_code: Option<String>,
    pub detail: Option<String>,
    pub endpoint: Option<String>,
    pub http_status: Option<u16>,
}

impl DeliveryReceipt {
    pub fn delivered(kind: ChannelKind) -> Self {
        Self {
            channel: kind.as_str().to_string(),
            status: DeliveryStatus::Delivered,
            reason_code: None,
            detail: None,
            endpoint: None,
            http_status: None,
        }
    }

    pub fn skipped(kind: ChannelKind, reason_code: &str, detail: impl Into<String>) -> Self {
        Self {
            channel: kind.as_str().to_string(),
            status: DeliveryStatus::Skipped,
            reason_code: Some(reason_code.to_string()),
            detail: Some(detail.into()),
            endpoint: None,
            http_status: None,
        }
    }

    pub fn failed(kind: ChannelKind, error: DeliveryError) -> Self {
        Self {
            channel: kind.as_str().to_string(),
            status: DeliveryStatus::Failed,
            reason_code: Some(error.reason_code),
            detail: Some(error.detail),
            endpoint: error.endpoint,
            http_status: error.http_status,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_http_status(mut self, http_status: u16) -> Self {
        self.http_status = Some(http_status);
        self
    }

    /// Skipped counts as success: nothing was configured to deliver to.
    pub fn is_success(&self) -> bool {
        self.status != DeliveryStatus::Failed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("reason_code={reason_code} detail={detail}")]
pub struct DeliveryError {
    pub reason_code: String,
    pub detail: String,
    pub endpoint: Option<String>,
    pub http_status: Option<u16>,
}

impl DeliveryError {
    pub fn new(reason_code: &str, detail: impl Into<String>) -> Self {
        Self {
            reason_code: reason_code.to_string(),
            detail: detail.into(),
            endpoint: None,
            http_status: None,
        }
    }
}

#[derive(Debug, Clone)]
/// Shared HTTP client for every network channel in a dispatch.
pub struct WebhookTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl WebhookTransport {
    pub fn new(timeout_ms: u64) -> Result<Self> {
        if timeout_ms == 0 {
            return Err(anyhow!("webhook transport requires http timeout > 0"));
        }
        let timeout = Duration::from_millis(timeout_ms);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(Policy::none())
            .user_agent(concat!("verdict/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build webhook http client")?;
        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// POSTs `body` as JSON. `headers` are applied after `Content-Type`, so a
    /// caller-supplied value replaces the default. Returns the HTTP status on
    /// 2xx.
    pub async fn post_json<T>(
        &self,
        endpoint: &str,
        headers: &BTreeMap<String, String>,
        body: &T,
        timeout_override_ms: Option<u64>,
    ) -> Result<u16, DeliveryError>
    where
        T: Serialize + ?Sized,
    {
        let redacted_endpoint = redact_endpoint(endpoint);
        let payload = serde_json::to_vec(body).map_err(|error| DeliveryError {
            reason_code: "delivery_payload_encode_failed".to_string(),
            detail: error.to_string(),
            endpoint: Some(redacted_endpoint.clone()),
            http_status: None,
        })?;

        let mut merged_headers = BTreeMap::new();
        merged_headers.insert("Content-Type".to_string(), "application/json".to_string());
        for (name, value) in headers {
            merged_headers.retain(|existing: &String, _| !existing.eq_ignore_ascii_case(name));
            merged_headers.insert(name.clone(), value.clone());
        }

        let mut request = self.client.post(endpoint).body(payload);
        for (name, value) in &merged_headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(timeout_ms) = timeout_override_ms.filter(|value| *value > 0) {
            request = request.timeout(Duration::from_millis(timeout_ms));
        }

        let response = request.send().await.map_err(|error| {
            let reason_code = if error.is_timeout() {
                "delivery_timeout"
            } else {
                "delivery_transport_error"
            };
            DeliveryError {
                reason_code: reason_code.to_string(),
                detail: error.to_string(),
                endpoint: Some(redacted_endpoint.clone()),
                http_status: None,
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(status.as_u16());
        }
        let body_raw = response.text().await.unwrap_or_default();
        Err(DeliveryError {
            reason_code: classify_http_status(status).to_string(),
            detail: truncate_detail(&body_raw),
            endpoint: Some(redacted_endpoint),
            http_status: Some(status.as_u16()),
        })
    }
}

pub fn classify_http_status(status: StatusCode) -> &'static str {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return "delivery_rate_limited";
    }
    if status.is_server_error() {
        return "delivery_provider_unavailable";
    }
    if status.is_client_error() {
        return "delivery_request_rejected";
    }
    if status.is_redirection() {
        return "delivery_unexpected_redirect";
    }
    "delivery_unknown_http_failure"
}

/// Webhook URLs embed their secret in the path; only scheme and host are kept
/// for logs and receipts.
pub fn redact_endpoint(endpoint: &str) -> String {
    match reqwest::Url::parse(endpoint) {
        Ok(url) => {
            let host = url.host_str().unwrap_or("unknown-host");
            let port = url.port().map(|port| format!(":{port}")).unwrap_or_default();
            format!("{}://{host}{port}/<redacted>", url.scheme())
        }
        Err(_) => "<invalid-url>".to_string(),
    }
}

fn truncate_detail(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }
    if trimmed.chars().count() <= DETAIL_LIMIT_CHARS {
        return trimmed.to_string();
    }
    let mut output = trimmed.chars().take(DETAIL_LIMIT_CHARS).collect::<String>();
    output.push_str("...");
    output
}
