use async_trait::async_trait;
use verdict_report::RunSummary;

use super::render_helpers::{
    duration_text, started_text, status_emoji, status_label, FAILURE_PREVIEW_LIMIT,
};
use super::NotificationChannel;
use crate::notify_config::{ChannelKind, NotificationConfig};
use crate::notify_delivery::DeliveryReceipt;

const BANNER_WIDTH: usize = 25;

/// Prints the notification to stdout. Never touches the network.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleChannel;

#[async_trait]
impl NotificationChannel for ConsoleChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Console
    }

    async fn send(&self, summary: &RunSummary, _config: &NotificationConfig) -> DeliveryReceipt {
        println!("{}", render_console_notification(summary));
        DeliveryReceipt::delivered(ChannelKind::Console)
    }
}

pub fn render_console_notification(summary: &RunSummary) -> String {
    let banner = "🔔".repeat(BANNER_WIDTH);
    let mut lines = vec![
        String::new(),
        banner.clone(),
        "📢 Test notification".to_string(),
        banner.clone(),
        String::new(),
        format!(
            "{} Status: {}",
            status_emoji(summary.status),
            status_label(summary.status)
        ),
        format!("📊 Total: {}", summary.total),
        format!("✅ Passed: {}", summary.passed),
        format!("❌ Failed: {}", summary.failed),
        format!("⏭️  Skipped: {}", summary.skipped),
    ];
    if summary.flaky > 0 {
        lines.push(format!("⚠️  Flaky: {}", summary.flaky));
    }
    lines.push(format!("⏱️  Duration: {}", duration_text(summary)));
    lines.push(format!("📈 Success rate: {:.1}%", summary.success_rate));

    if !summary.failures.is_empty() {
        lines.push(String::new());
        lines.push("❌ Failed tests:".to_string());
        for failure in summary.failures_preview(FAILURE_PREVIEW_LIMIT) {
            lines.push(format!("   - {}", failure.title));
            lines.push(format!("     File: {}", failure.file));
        }
        let hidden = summary.failures.len().saturating_sub(FAILURE_PREVIEW_LIMIT);
        if hidden > 0 {
            lines.push(format!("   …and {hidden} more"));
        }
    }

    lines.push(String::new());
    lines.push(format!("📅 Started: {}", started_text(summary)));
    if let Some(run_url) = summary.run_url.as_deref() {
        lines.push(format!("🔗 Details: {run_url}"));
    }
    lines.push(String::new());
    lines.push(banner);
    lines.join("\n")
}
