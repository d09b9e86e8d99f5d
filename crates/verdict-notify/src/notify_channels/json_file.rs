//! Persisted JSON summary plus the console report printed after writing it.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use verdict_core::{format_duration_secs, write_json_pretty_atomic};
use verdict_report::RunSummary;

use super::NotificationChannel;
use crate::notify_config::{ChannelKind, NotificationConfig};
use crate::notify_delivery::{DeliveryError, DeliveryReceipt};

pub const DEFAULT_SUMMARY_PATH: &str = "test-results/test-summary.json";

const RULE_WIDTH: usize = 50;

/// Writes the complete summary and echoes a human report to stdout.
#[derive(Debug, Clone)]
pub struct JsonFileChannel {
    default_path: PathBuf,
}

impl JsonFileChannel {
    pub fn new(default_path: PathBuf) -> Self {
        Self { default_path }
    }

    /// `options.outputPath` when configured, otherwise the channel default.
    pub fn output_path<'a>(&'a self, config: &'a NotificationConfig) -> &'a Path {
        config
            .options
            .output_path
            .as_deref()
            .unwrap_or(self.default_path.as_path())
    }
}

#[async_trait]
impl NotificationChannel for JsonFileChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::JsonFile
    }

    async fn send(&self, summary: &RunSummary, config: &NotificationConfig) -> DeliveryReceipt {
        let path = self.output_path(config);
        match write_run_summary_file_blocking(path.to_path_buf(), summary.clone()).await {
            Ok(()) => {
                tracing::info!(path = %path.display(), "run summary written");
                println!("{}", render_run_report(summary));
                println!("\n📄 Summary written to: {}\n", path.display());
                DeliveryReceipt::delivered(ChannelKind::JsonFile)
                    .with_endpoint(path.display().to_string())
            }
            Err(error) => {
                let detail = format!("{error:#}");
                tracing::error!(
                    path = %path.display(),
                    detail = detail.as_str(),
                    "failed to write run summary"
                );
                let mut failure = DeliveryError::new("delivery_file_write_failed", detail);
                failure.endpoint = Some(path.display().to_string());
                DeliveryReceipt::failed(ChannelKind::JsonFile, failure)
            }
        }
    }
}

/// Runs the file write on the blocking pool so concurrent webhook deliveries
/// in the same dispatch keep making progress.
async fn write_run_summary_file_blocking(path: PathBuf, summary: RunSummary) -> Result<()> {
    tokio::task::spawn_blocking(move || write_run_summary_file(&path, &summary))
        .await
        .context("run summary write task failed")?
}

pub fn write_run_summary_file(path: &Path, summary: &RunSummary) -> Result<()> {
    write_json_pretty_atomic(path, summary)
        .with_context(|| format!("failed to write run summary {}", path.display()))
}

pub fn load_run_summary_file(path: &Path) -> Result<RunSummary> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read run summary {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse run summary {}", path.display()))
}

/// Full report: every failure, per-project lines, and slow tests.
pub fn render_run_report(summary: &RunSummary) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut lines = vec![
        String::new(),
        rule.clone(),
        "📊 Test run summary".to_string(),
        rule.clone(),
        String::new(),
        format!("⏱️  Duration: {}", format_duration_secs(summary.duration_ms, 2)),
        format!("📝 Total: {}", summary.total),
        format!("✅ Passed: {}", summary.passed),
        format!("❌ Failed: {}", summary.failed),
        format!("⏭️  Skipped: {}", summary.skipped),
    ];
    if summary.flaky > 0 {
        lines.push(format!("⚠️  Flaky: {}", summary.flaky));
    }

    if !summary.projects.is_empty() {
        lines.push(String::new());
        lines.push("📁 By project:".to_string());
        for (name, stats) in &summary.projects {
            let marker = if stats.has_failures() { "❌" } else { "✅" };
            lines.push(format!(
                "   {marker} {name}: {}/{} passed",
                stats.passed, stats.total
            ));
        }
    }

    if !summary.failures.is_empty() {
        lines.push(String::new());
        lines.push("❌ Failed tests:".to_string());
        for failure in &summary.failures {
            lines.push(format!("   - {}", failure.title));
            lines.push(format!("     {}", failure.error_headline()));
        }
    }

    if !summary.slow_tests.is_empty() {
        lines.push(String::new());
        lines.push(format!("🐢 Slow tests (top {}):", summary.slow_tests.len()));
        for slow in &summary.slow_tests {
            lines.push(format!(
                "   - {} ({})",
                slow.title,
                format_duration_secs(slow.duration_ms, 2)
            ));
        }
    }

    lines.push(String::new());
    lines.push(rule);
    lines.join("\n")
}
