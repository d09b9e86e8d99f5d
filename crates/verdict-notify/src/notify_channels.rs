//! Channel adapters and concurrent dispatch.
//!
//! Each configured channel maps to one [`NotificationChannel`] chosen by
//! [`build_notification_channel`] from its [`ChannelKind`]. Dispatch evaluates
//! every channel's notify-on policy against the finalized run, then fires the
//! selected channels concurrently. A channel's failure is captured in its own
//! receipt and never reaches the caller as an error.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use serde::Serialize;
use verdict_report::{should_notify, RunSummary};

use crate::notify_config::{ChannelKind, NotificationConfig};
use crate::notify_delivery::{DeliveryReceipt, WebhookTransport};
use crate::notify_environment::{resolve_webhook_target, ChannelEnvironment};

mod console;
mod discord;
mod json_file;
mod render_helpers;
mod slack;
mod teams;
mod webhook;

pub use console::{render_console_notification, ConsoleChannel};
pub use discord::{
    build_discord_message, DiscordChannel, DiscordEmbed, DiscordField, DiscordFooter, DiscordMessage,
};
pub use json_file::{
    load_run_summary_file, render_run_report, write_run_summary_file, JsonFileChannel,
    DEFAULT_SUMMARY_PATH,
};
pub use render_helpers::FAILURE_PREVIEW_LIMIT;
pub use slack::{build_slack_message, SlackChannel};
pub use teams::{
    build_teams_message, TeamsChannel, TeamsFact, TeamsMessageCard, TeamsOpenUriAction,
    TeamsSection, TeamsTarget,
};
pub use webhook::{
    build_webhook_headers, build_webhook_payload, WebhookChannel, WebhookExecution, WebhookFailure,
    WebhookPayload, WebhookSummary,
};

const REASON_MISSING_TARGET: &str = "delivery_missing_target";
const REASON_POLICY_SUPPRESSED: &str = "policy_suppressed";

/// Sink-specific formatter and deliverer.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn kind(&self) -> ChannelKind;

    /// Renders and delivers `summary`. Never fails; problems are reported
    /// through the receipt.
    async fn send(&self, summary: &RunSummary, config: &NotificationConfig) -> DeliveryReceipt;
}

#[derive(Debug, Clone)]
/// Shared resources handed to every channel built for a dispatch.
pub struct DeliveryContext {
    pub transport: WebhookTransport,
    pub environment: Arc<ChannelEnvironment>,
    pub summary_path: PathBuf,
}

impl DeliveryContext {
    pub fn new(transport: WebhookTransport, environment: ChannelEnvironment) -> Self {
        Self {
            transport,
            environment: Arc::new(environment),
            summary_path: PathBuf::from(DEFAULT_SUMMARY_PATH),
        }
    }

    pub fn with_summary_path(mut self, summary_path: impl Into<PathBuf>) -> Self {
        self.summary_path = summary_path.into();
        self
    }
}

pub fn build_notification_channel(
    kind: ChannelKind,
    context: &DeliveryContext,
) -> Box<dyn NotificationChannel> {
    match kind {
        ChannelKind::Console => Box::new(ConsoleChannel),
        ChannelKind::Slack => Box::new(SlackChannel::new(context)),
        ChannelKind::Discord => Box::new(DiscordChannel::new(context)),
        ChannelKind::Teams => Box::new(TeamsChannel::new(context)),
        ChannelKind::Webhook => Box::new(WebhookChannel::new(context)),
        ChannelKind::JsonFile => Box::new(JsonFileChannel::new(context.summary_path.clone())),
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SuppressedChannel {
    pub channel: String,
    pub reason_code: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DispatchReport {
    pub run_status: String,
    pub receipts: Vec<DeliveryReceipt>,
    pub suppressed: Vec<SuppressedChannel>,
}

impl DispatchReport {
    pub fn failed_count(&self) -> usize {
        self.receipts
            .iter()
            .filter(|receipt| !receipt.is_success())
            .count()
    }
}

/// Applies each channel's policy and delivers to the selected channels
/// concurrently. Receipts keep config order.
pub async fn dispatch_notifications(
    summary: &RunSummary,
    configs: &[NotificationConfig],
    context: &DeliveryContext,
) -> DispatchReport {
    let mut suppressed = Vec::new();
    let mut deliveries = Vec::new();
    for config in configs {
        let policy = config.notify_policy();
        if !should_notify(policy, summary.status) {
            tracing::debug!(
                channel = config.kind.as_str(),
                status = summary.status.as_str(),
                "notification suppressed by notify-on policy"
            );
            suppressed.push(SuppressedChannel {
                channel: config.kind.as_str().to_string(),
                reason_code: REASON_POLICY_SUPPRESSED.to_string(),
            });
            continue;
        }
        let channel = build_notification_channel(config.kind, context);
        deliveries.push(async move { channel.send(summary, config).await });
    }

    let receipts = join_all(deliveries).await;
    DispatchReport {
        run_status: summary.status.as_str().to_string(),
        receipts,
        suppressed,
    }
}

/// Resolves the target and posts a rendered chat/webhook body. Shared by the
/// network channels.
pub(crate) async fn deliver_webhook_body<T>(
    kind: ChannelKind,
    config: &NotificationConfig,
    context: &ChannelDeliveryParts,
    body: &T,
    headers: std::collections::BTreeMap<String, String>,
) -> DeliveryReceipt
where
    T: Serialize + Sync + ?Sized,
{
    let Some(target) = resolve_webhook_target(config, &context.environment) else {
        tracing::warn!(
            channel = kind.display_name(),
            "webhook url is not configured; skipping notification"
        );
        return DeliveryReceipt::skipped(
            kind,
            REASON_MISSING_TARGET,
            format!("{} webhook url is not configured", kind.display_name()),
        );
    };

    match context
        .transport
        .post_json(&target.url, &headers, body, config.options.timeout_ms)
        .await
    {
        Ok(http_status) => {
            tracing::info!(
                channel = kind.display_name(),
                source = target.source.as_str(),
                http_status,
                "notification sent"
            );
            DeliveryReceipt::delivered(kind)
                .with_endpoint(crate::notify_delivery::redact_endpoint(&target.url))
                .with_http_status(http_status)
        }
        Err(error) => {
            tracing::error!(
                channel = kind.display_name(),
                reason_code = error.reason_code.as_str(),
                detail = error.detail.as_str(),
                "failed to send notification"
            );
            DeliveryReceipt::failed(kind, error)
        }
    }
}

#[derive(Debug, Clone)]
/// Transport and environment cloned into each network channel.
pub(crate) struct ChannelDeliveryParts {
    pub(crate) transport: WebhookTransport,
    pub(crate) environment: Arc<ChannelEnvironment>,
}

impl ChannelDeliveryParts {
    pub(crate) fn from_context(context: &DeliveryContext) -> Self {
        Self {
            transport: context.transport.clone(),
            environment: Arc::clone(&context.environment),
        }
    }
}

#[cfg(test)]
mod tests;
