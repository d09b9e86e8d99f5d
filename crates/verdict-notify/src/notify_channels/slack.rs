//! Slack incoming-webhook rendering (Block Kit).

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{json, Value};
use verdict_report::RunSummary;

use super::render_helpers::{
    duration_text, failure_list, started_text, status_color_hex, status_emoji, status_label,
    status_title, truncate_chars,
};
use super::{deliver_webhook_body, ChannelDeliveryParts, DeliveryContext, NotificationChannel};
use crate::notify_config::{ChannelKind, NotificationConfig};
use crate::notify_delivery::DeliveryReceipt;

const SLACK_SECTION_MAX_CHARS: usize = 3_000;

#[derive(Debug, Clone)]
pub struct SlackChannel {
    parts: ChannelDeliveryParts,
}

impl SlackChannel {
    pub fn new(context: &DeliveryContext) -> Self {
        Self {
            parts: ChannelDeliveryParts::from_context(context),
        }
    }
}

#[async_trait]
impl NotificationChannel for SlackChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Slack
    }

    async fn send(&self, summary: &RunSummary, config: &NotificationConfig) -> DeliveryReceipt {
        let body = build_slack_message(summary, config);
        deliver_webhook_body(ChannelKind::Slack, config, &self.parts, &body, BTreeMap::new()).await
    }
}

fn slack_mention(id: &str) -> String {
    match id {
        "here" | "channel" | "everyone" => format!("<!{id}>"),
        _ => format!("<@{id}>"),
    }
}

fn mrkdwn_field(label: &str, value: String) -> Value {
    json!({ "type": "mrkdwn", "text": format!("*{label}:*\n{value}") })
}

pub fn build_slack_message(summary: &RunSummary, config: &NotificationConfig) -> Value {
    let title = status_title(summary.status);
    let mentions = config
        .failure_mentions(summary)
        .into_iter()
        .map(slack_mention)
        .collect::<Vec<_>>()
        .join(" ");

    let mut fields = vec![
        mrkdwn_field("Total", summary.total.to_string()),
        mrkdwn_field("Duration", duration_text(summary)),
        mrkdwn_field("Passed", format!("{} ✅", summary.passed)),
        mrkdwn_field("Failed", format!("{} ❌", summary.failed)),
    ];
    if summary.skipped > 0 {
        fields.push(mrkdwn_field("Skipped", format!("{} ⏭️", summary.skipped)));
    }
    if summary.flaky > 0 {
        fields.push(mrkdwn_field("Flaky", format!("{} ⚠️", summary.flaky)));
    }

    let mut blocks = vec![json!({
        "type": "header",
        "text": { "type": "plain_text", "text": title, "emoji": true }
    })];
    if !mentions.is_empty() {
        blocks.push(json!({
            "type": "section",
            "text": { "type": "mrkdwn", "text": mentions }
        }));
    }
    blocks.push(json!({ "type": "section", "fields": fields }));

    if let Some(failures) = failure_list(summary, "•") {
        blocks.push(json!({
            "type": "section",
            "text": {
                "type": "mrkdwn",
                "text": truncate_chars(&format!("*Failed tests:*\n{failures}"), SLACK_SECTION_MAX_CHARS)
            }
        }));
    }

    if let Some(run_url) = summary.run_url.as_deref() {
        blocks.push(json!({
            "type": "actions",
            "elements": [{
                "type": "button",
                "text": { "type": "plain_text", "text": "View run", "emoji": true },
                "url": run_url
            }]
        }));
    }

    blocks.push(json!({
        "type": "context",
        "elements": [{ "type": "mrkdwn", "text": format!("Started: {}", started_text(summary)) }]
    }));

    let fallback = format!(
        "{} Test run {} ({}/{})",
        status_emoji(summary.status),
        status_label(summary.status),
        summary.passed,
        summary.total
    );
    let text = if mentions.is_empty() {
        fallback
    } else {
        format!("{mentions}\n{fallback}")
    };

    json!({
        "text": text,
        "blocks": blocks,
        "attachments": [{ "color": format!("#{}", status_color_hex(summary.status)), "blocks": [] }]
    })
}
