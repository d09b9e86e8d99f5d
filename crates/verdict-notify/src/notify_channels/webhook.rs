//! Generic JSON webhook carrying the complete run summary.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use verdict_core::to_rfc3339_ms;
use verdict_report::RunSummary;

use super::{deliver_webhook_body, ChannelDeliveryParts, DeliveryContext, NotificationChannel};
use crate::notify_config::{ChannelKind, NotificationConfig};
use crate::notify_delivery::DeliveryReceipt;
use crate::notify_environment::{webhook_bearer_token, ChannelEnvironment};

pub const WEBHOOK_EVENT_NAME: &str = "test_completed";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WebhookPayload {
    pub event: &'static str,
    pub timestamp: String,
    pub status: &'static str,
    pub summary: WebhookSummary,
    pub execution: WebhookExecution,
    pub failures: Vec<WebhookFailure>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WebhookSummary {
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub flaky: u64,
    pub duration: u64,
    pub success_rate: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WebhookExecution {
    pub start_time: String,
    pub end_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WebhookFailure {
    pub title: String,
    pub file: String,
    pub error: String,
    pub duration: u64,
}

/// Flat document with the full, untruncated failure list.
pub fn build_webhook_payload(summary: &RunSummary, timestamp: DateTime<Utc>) -> WebhookPayload {
    WebhookPayload {
        event: WEBHOOK_EVENT_NAME,
        timestamp: to_rfc3339_ms(timestamp),
        status: summary.status.as_str(),
        summary: WebhookSummary {
            total: summary.total,
            passed: summary.passed,
            failed: summary.failed,
            skipped: summary.skipped,
            flaky: summary.flaky,
            duration: summary.duration_ms,
            success_rate: summary.success_rate,
        },
        execution: WebhookExecution {
            start_time: to_rfc3339_ms(summary.start_time),
            end_time: to_rfc3339_ms(summary.end_time),
            project_name: summary.project_name.clone(),
            run_url: summary.run_url.clone(),
        },
        failures: summary
            .failures
            .iter()
            .map(|failure| WebhookFailure {
                title: failure.title.clone(),
                file: failure.file.clone(),
                error: failure.error.clone(),
                duration: failure.duration_ms,
            })
            .collect(),
    }
}

/// Bearer token from the environment, then `options.headers` on top.
/// `Content-Type` is added by the transport unless overridden here.
pub fn build_webhook_headers(
    config: &NotificationConfig,
    environment: &ChannelEnvironment,
) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    if let Some(token) = webhook_bearer_token(environment) {
        headers.insert("Authorization".to_string(), format!("Bearer {token}"));
    }
    for (name, value) in &config.options.headers {
        headers.retain(|existing: &String, _| !existing.eq_ignore_ascii_case(name));
        headers.insert(name.trim().to_string(), value.clone());
    }
    headers
}

#[derive(Debug, Clone)]
pub struct WebhookChannel {
    parts: ChannelDeliveryParts,
}

impl WebhookChannel {
    pub fn new(context: &DeliveryContext) -> Self {
        Self {
            parts: ChannelDeliveryParts::from_context(context),
        }
    }
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Webhook
    }

    async fn send(&self, summary: &RunSummary, config: &NotificationConfig) -> DeliveryReceipt {
        let payload = build_webhook_payload(summary, Utc::now());
        let headers = build_webhook_headers(config, &self.parts.environment);
        deliver_webhook_body(ChannelKind::Webhook, config, &self.parts, &payload, headers).await
    }
}
