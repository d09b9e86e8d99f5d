//! Multi-channel notification for finalized test runs.
//!
//! Maps a [`verdict_report::RunSummary`] onto console output, Slack, Discord,
//! and Teams webhook messages, a generic JSON webhook, and a persisted JSON
//! summary file. Every channel reports its own [`DeliveryReceipt`]; a failing
//! channel never affects its siblings.
//!
//! ```rust
//! use verdict_notify::{ChannelKind, NotificationConfig};
//! use verdict_report::{should_notify, RunStatus};
//!
//! let config: NotificationConfig = serde_json::from_str(
//!     r#"{"type":"slack","notifyOn":{"failure":true},"mentions":{"onFailure":["U123"]}}"#,
//! )
//! .expect("config");
//! assert_eq!(config.kind, ChannelKind::Slack);
//! assert!(!should_notify(config.notify_policy(), RunStatus::Passed));
//! ```

pub mod notify_channels;
pub mod notify_config;
pub mod notify_delivery;
pub mod notify_environment;

pub use notify_channels::*;
pub use notify_config::*;
pub use notify_delivery::*;
pub use notify_environment::*;
