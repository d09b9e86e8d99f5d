//! Environment fallbacks for channel targets and CI run links.
//!
//! The process environment is read once into a [`ChannelEnvironment`]
//! snapshot; adapters only consult the snapshot.

use std::collections::BTreeMap;

use crate::notify_config::{ChannelKind, NotificationConfig};

pub const SLACK_WEBHOOK_URL_ENV: &str = "SLACK_WEBHOOK_URL";
pub const DISCORD_WEBHOOK_URL_ENV: &str = "DISCORD_WEBHOOK_URL";
pub const TEAMS_WEBHOOK_URL_ENV: &str = "TEAMS_WEBHOOK_URL";
pub const WEBHOOK_URL_ENV: &str = "WEBHOOK_URL";
pub const WEBHOOK_TOKEN_ENV: &str = "WEBHOOK_TOKEN";
pub const CI_SERVER_URL_ENV: &str = "GITHUB_SERVER_URL";
pub const CI_REPOSITORY_ENV: &str = "GITHUB_REPOSITORY";
pub const CI_RUN_ID_ENV: &str = "GITHUB_RUN_ID";

const KNOWN_VARIABLES: [&str; 8] = [
    SLACK_WEBHOOK_URL_ENV,
    DISCORD_WEBHOOK_URL_ENV,
    TEAMS_WEBHOOK_URL_ENV,
    WEBHOOK_URL_ENV,
    WEBHOOK_TOKEN_ENV,
    CI_SERVER_URL_ENV,
    CI_REPOSITORY_ENV,
    CI_RUN_ID_ENV,
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelEnvironment {
    vars: BTreeMap<String, String>,
}

impl ChannelEnvironment {
    /// Captures the variables verdict understands from the current process.
    pub fn from_process() -> Self {
        Self::from_pairs(
            KNOWN_VARIABLES
                .iter()
                .filter_map(|name| std::env::var(name).ok().map(|value| (*name, value))),
        )
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }

    /// Non-empty trimmed value of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub url: String,
    pub source: String,
}

pub fn webhook_env_var(kind: ChannelKind) -> Option<&'static str> {
    match kind {
        ChannelKind::Slack => Some(SLACK_WEBHOOK_URL_ENV),
        ChannelKind::Discord => Some(DISCORD_WEBHOOK_URL_ENV),
        ChannelKind::Teams => Some(TEAMS_WEBHOOK_URL_ENV),
        ChannelKind::Webhook => Some(WEBHOOK_URL_ENV),
        ChannelKind::Console | ChannelKind::JsonFile => None,
    }
}

/// Explicit `webhookUrl` first, then the channel's environment variable.
pub fn resolve_webhook_target(
    config: &NotificationConfig,
    environment: &ChannelEnvironment,
) -> Option<ResolvedTarget> {
    if let Some(url) = config.explicit_webhook_url() {
        return Some(ResolvedTarget {
            url: url.to_string(),
            source: "config".to_string(),
        });
    }
    let variable = webhook_env_var(config.kind)?;
    environment.get(variable).map(|url| ResolvedTarget {
        url: url.to_string(),
        source: format!("env:{variable}"),
    })
}

/// `<server>/<repository>/actions/runs/<run id>` when all three are known.
pub fn resolve_ci_run_url(environment: &ChannelEnvironment) -> Option<String> {
    let server = environment.get(CI_SERVER_URL_ENV)?;
    let repository = environment.get(CI_REPOSITORY_ENV)?;
    let run_id = environment.get(CI_RUN_ID_ENV)?;
    Some(format!(
        "{}/{}/actions/runs/{}",
        server.trim_end_matches('/'),
        repository.trim_matches('/'),
        run_id
    ))
}

pub fn webhook_bearer_token(environment: &ChannelEnvironment) -> Option<&str> {
    environment.get(WEBHOOK_TOKEN_ENV)
}
