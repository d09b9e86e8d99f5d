//! Discord webhook rendering (embeds).

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;
use verdict_core::to_rfc3339_ms;
use verdict_report::RunSummary;

use super::render_helpers::{
    duration_text, failure_list, status_color_decimal, status_title, truncate_chars,
};
use super::{deliver_webhook_body, ChannelDeliveryParts, DeliveryContext, NotificationChannel};
use crate::notify_config::{ChannelKind, NotificationConfig};
use crate::notify_delivery::DeliveryReceipt;

const DISCORD_FIELD_VALUE_MAX_CHARS: usize = 1_024;
const DISCORD_FOOTER_TEXT: &str = "verdict test results";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DiscordMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub embeds: Vec<DiscordEmbed>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DiscordEmbed {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub color: u32,
    pub fields: Vec<DiscordField>,
    pub timestamp: String,
    pub footer: DiscordFooter,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DiscordField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DiscordFooter {
    pub text: String,
}

fn inline_field(name: &str, value: String) -> DiscordField {
    DiscordField {
        name: name.to_string(),
        value,
        inline: true,
    }
}

#[derive(Debug, Clone)]
pub struct DiscordChannel {
    parts: ChannelDeliveryParts,
}

impl DiscordChannel {
    pub fn new(context: &DeliveryContext) -> Self {
        Self {
            parts: ChannelDeliveryParts::from_context(context),
        }
    }
}

#[async_trait]
impl NotificationChannel for DiscordChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Discord
    }

    async fn send(&self, summary: &RunSummary, config: &NotificationConfig) -> DeliveryReceipt {
        let body = build_discord_message(summary, config);
        deliver_webhook_body(ChannelKind::Discord, config, &self.parts, &body, BTreeMap::new())
            .await
    }
}

pub fn build_discord_message(
    summary: &RunSummary,
    config: &NotificationConfig,
) -> DiscordMessage {
    let mentions = config
        .failure_mentions(summary)
        .into_iter()
        .map(|id| format!("<@{id}>"))
        .collect::<Vec<_>>();

    let mut fields = vec![
        inline_field("📊 Total", summary.total.to_string()),
        inline_field("⏱️ Duration", duration_text(summary)),
        inline_field("✅ Passed", summary.passed.to_string()),
        inline_field("❌ Failed", summary.failed.to_string()),
    ];
    if summary.skipped > 0 {
        fields.push(inline_field("⏭️ Skipped", summary.skipped.to_string()));
    }
    if summary.flaky > 0 {
        fields.push(inline_field("⚠️ Flaky", summary.flaky.to_string()));
    }
    if let Some(failures) = failure_list(summary, "•") {
        fields.push(DiscordField {
            name: "❌ Failed tests".to_string(),
            value: truncate_chars(&failures, DISCORD_FIELD_VALUE_MAX_CHARS),
            inline: false,
        });
    }

    DiscordMessage {
        content: (!mentions.is_empty()).then(|| mentions.join(" ")),
        embeds: vec![DiscordEmbed {
            title: status_title(summary.status),
            description: format!("**{}/{}** tests passed", summary.passed, summary.total),
            url: summary.run_url.clone(),
            color: status_color_decimal(summary.status),
            fields,
            timestamp: to_rfc3339_ms(summary.start_time),
            footer: DiscordFooter {
                text: DISCORD_FOOTER_TEXT.to_string(),
            },
        }],
    }
}
