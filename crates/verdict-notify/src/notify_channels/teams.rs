//! Microsoft Teams incoming-webhook rendering (MessageCard).

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;
use verdict_report::RunSummary;

use super::render_helpers::{
    duration_text, failure_list, started_text, status_color_hex, status_title,
};
use super::{deliver_webhook_body, ChannelDeliveryParts, DeliveryContext, NotificationChannel};
use crate::notify_config::{ChannelKind, NotificationConfig};
use crate::notify_delivery::DeliveryReceipt;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TeamsMessageCard {
    #[serde(rename = "@type")]
    pub card_type: &'static str,
    #[serde(rename = "@context")]
    pub context: &'static str,
    #[serde(rename = "themeColor")]
    pub theme_color: &'static str,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub sections: Vec<TeamsSection>,
    #[serde(rename = "potentialAction", skip_serializing_if = "Vec::is_empty")]
    pub potential_action: Vec<TeamsOpenUriAction>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TeamsSection {
    #[serde(rename = "activityTitle")]
    pub activity_title: String,
    #[serde(rename = "activitySubtitle", skip_serializing_if = "Option::is_none")]
    pub activity_subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub facts: Vec<TeamsFact>,
    pub markdown: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TeamsFact {
    pub title: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TeamsOpenUriAction {
    #[serde(rename = "@type")]
    pub action_type: &'static str,
    pub name: String,
    pub targets: Vec<TeamsTarget>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TeamsTarget {
    pub os: &'static str,
    pub uri: String,
}

fn fact(title: &str, value: String) -> TeamsFact {
    TeamsFact {
        title: title.to_string(),
        value,
    }
}

#[derive(Debug, Clone)]
pub struct TeamsChannel {
    parts: ChannelDeliveryParts,
}

impl TeamsChannel {
    pub fn new(context: &DeliveryContext) -> Self {
        Self {
            parts: ChannelDeliveryParts::from_context(context),
        }
    }
}

#[async_trait]
impl NotificationChannel for TeamsChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Teams
    }

    async fn send(&self, summary: &RunSummary, config: &NotificationConfig) -> DeliveryReceipt {
        let body = build_teams_message(summary, config);
        deliver_webhook_body(ChannelKind::Teams, config, &self.parts, &body, BTreeMap::new()).await
    }
}

pub fn build_teams_message(
    summary: &RunSummary,
    config: &NotificationConfig,
) -> TeamsMessageCard {
    let title = status_title(summary.status);
    let mentions = config
        .failure_mentions(summary)
        .into_iter()
        .map(|id| format!("<at>{id}</at>"))
        .collect::<Vec<_>>();

    let mut facts = vec![
        fact("Total", summary.total.to_string()),
        fact("Passed", format!("{} ✅", summary.passed)),
        fact("Failed", format!("{} ❌", summary.failed)),
        fact("Duration", duration_text(summary)),
    ];
    if summary.skipped > 0 {
        facts.push(fact("Skipped", summary.skipped.to_string()));
    }
    if summary.flaky > 0 {
        facts.push(fact("Flaky", summary.flaky.to_string()));
    }

    let mut sections = vec![TeamsSection {
        activity_title: title.clone(),
        activity_subtitle: Some(started_text(summary)),
        text: None,
        facts,
        markdown: true,
    }];
    if let Some(failures) = failure_list(summary, "-") {
        sections.push(TeamsSection {
            activity_title: "❌ Failed tests".to_string(),
            activity_subtitle: None,
            text: Some(failures),
            facts: Vec::new(),
            markdown: true,
        });
    }

    let potential_action = summary
        .run_url
        .as_ref()
        .map(|run_url| TeamsOpenUriAction {
            action_type: "OpenUri",
            name: "View run".to_string(),
            targets: vec![TeamsTarget {
                os: "default",
                uri: run_url.clone(),
            }],
        })
        .into_iter()
        .collect();

    TeamsMessageCard {
        card_type: "MessageCard",
        context: "http://schema.org/extensions",
        theme_color: status_color_hex(summary.status),
        summary: title,
        text: (!mentions.is_empty()).then(|| mentions.join(" ")),
        sections,
        potential_action,
    }
}
