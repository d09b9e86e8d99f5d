//! Per-channel notification configuration and config-file loading.
//!
//! Config files hold a `channels` array in either JSON or TOML. Keys follow
//! the camelCase shape used by runner-side reporter configs (`webhookUrl`,
//! `notifyOn`, `mentions.onFailure`, `options.headers`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use verdict_report::{NotifyOn, RunSummary};

pub const NOTIFICATION_CONFIG_FILE_NAME: &str = "verdict.json";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `ChannelKind` values.
pub enum ChannelKind {
    Slack,
    Discord,
    Teams,
    Webhook,
    Console,
    #[serde(alias = "json-file", alias = "jsonFile")]
    JsonFile,
}

impl ChannelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Slack => "slack",
            Self::Discord => "discord",
            Self::Teams => "teams",
            Self::Webhook => "webhook",
            Self::Console => "console",
            Self::JsonFile => "json_file",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Slack => "Slack",
            Self::Discord => "Discord",
            Self::Teams => "Microsoft Teams",
            Self::Webhook => "Webhook",
            Self::Console => "Console",
            Self::JsonFile => "JSON summary",
        }
    }

    /// Channels that post to an HTTP endpoint.
    pub fn is_network(self) -> bool {
        matches!(
            self,
            Self::Slack | Self::Discord | Self::Teams | Self::Webhook
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct MentionConfig {
    #[serde(default, rename = "onFailure")]
    pub on_failure: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ChannelOptions {
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, rename = "timeoutMs", skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default, rename = "outputPath", skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Public struct `NotificationConfig` describing one configured channel.
pub struct NotificationConfig {
    #[serde(rename = "type")]
    pub kind: ChannelKind,
    #[serde(default, rename = "webhookUrl", skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    #[serde(default, rename = "notifyOn", skip_serializing_if = "Option::is_none")]
    pub notify_on: Option<NotifyOn>,
    #[serde(default)]
    pub mentions: MentionConfig,
    #[serde(default)]
    pub options: ChannelOptions,
}

impl NotificationConfig {
    pub fn new(kind: ChannelKind) -> Self {
        Self {
            kind,
            webhook_url: None,
            notify_on: None,
            mentions: MentionConfig::default(),
            options: ChannelOptions::default(),
        }
    }

    pub fn with_webhook_url(mut self, webhook_url: impl Into<String>) -> Self {
        self.webhook_url = Some(webhook_url.into());
        self
    }

    pub fn with_notify_on(mut self, notify_on: NotifyOn) -> Self {
        self.notify_on = Some(notify_on);
        self
    }

    pub fn with_failure_mentions(mut self, mentions: &[&str]) -> Self {
        self.mentions.on_failure = mentions.iter().map(|m| m.to_string()).collect();
        self
    }

    /// Effective notify-on policy; absent means failure-only.
    pub fn notify_policy(&self) -> NotifyOn {
        NotifyOn::resolve(self.notify_on)
    }

    /// Mentions to render for this run. Empty unless the run did not pass.
    pub fn failure_mentions(&self, summary: &RunSummary) -> Vec<&str> {
        if summary.is_success() {
            return Vec::new();
        }
        self.mentions
            .on_failure
            .iter()
            .map(|mention| mention.trim())
            .filter(|mention| !mention.is_empty())
            .collect()
    }

    pub fn explicit_webhook_url(&self) -> Option<&str> {
        self.webhook_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct NotificationConfigFile {
    #[serde(default)]
    pub channels: Vec<NotificationConfig>,
}

pub fn parse_notification_config_json(raw: &str) -> Result<NotificationConfigFile> {
    let file = serde_json::from_str::<NotificationConfigFile>(raw)
        .context("failed to parse notification config json")?;
    validate_notification_config_file(&file)?;
    Ok(file)
}

pub fn parse_notification_config_toml(raw: &str) -> Result<NotificationConfigFile> {
    let file = toml::from_str::<NotificationConfigFile>(raw)
        .context("failed to parse notification config toml")?;
    validate_notification_config_file(&file)?;
    Ok(file)
}

/// Loads a config file, choosing the format from the extension (`.toml`,
/// anything else is read as JSON).
pub fn load_notification_config_file(path: &Path) -> Result<NotificationConfigFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read notification config {}", path.display()))?;
    let is_toml = path
        .extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case("toml"));
    let parsed = if is_toml {
        parse_notification_config_toml(&raw)
    } else {
        parse_notification_config_json(&raw)
    };
    parsed.with_context(|| format!("invalid notification config {}", path.display()))
}

pub fn validate_notification_config_file(file: &NotificationConfigFile) -> Result<()> {
    for (index, channel) in file.channels.iter().enumerate() {
        if let Some(url) = channel.explicit_webhook_url() {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                bail!(
                    "channels[{index}] ({}): webhookUrl must be an http(s) url",
                    channel.kind.as_str()
                );
            }
            if !channel.kind.is_network() {
                bail!(
                    "channels[{index}] ({}): webhookUrl is only valid for network channels",
                    channel.kind.as_str()
                );
            }
        }
        if channel.options.timeout_ms == Some(0) {
            bail!(
                "channels[{index}] ({}): options.timeoutMs must be greater than 0",
                channel.kind.as_str()
            );
        }
        if channel
            .options
            .headers
            .keys()
            .any(|header| header.trim().is_empty())
        {
            bail!(
                "channels[{index}] ({}): options.headers contains an empty header name",
                channel.kind.as_str()
            );
        }
    }
    Ok(())
}
