use std::future::Future;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tokio::io::AsyncBufRead;
use verdict_core::format_duration_secs;
use verdict_notify::{
    dispatch_notifications, load_notification_config_file, resolve_ci_run_url,
    ChannelEnvironment, ChannelKind, DeliveryContext, DeliveryStatus, DispatchReport,
    JsonFileChannel, NotificationChannel, NotificationConfig, WebhookTransport,
    NOTIFICATION_CONFIG_FILE_NAME,
};
use verdict_report::{RunAggregator, RunSummary};

use crate::cli_args::Cli;
use crate::run_intake::{open_event_source, read_run_events};

#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub summary: RunSummary,
    pub completed: bool,
    pub report: DispatchReport,
    pub summary_path: Option<PathBuf>,
}

pub async fn run_cli(cli: Cli) -> Result<()> {
    let environment = ChannelEnvironment::from_process();
    let source = open_event_source(&cli.events).await?;
    let outcome = execute_run(&cli, environment, source, wait_for_ctrl_c()).await?;
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome.report)
                .context("failed to render dispatch report json")?
        );
    } else {
        println!("{}", render_dispatch_report(&outcome));
    }
    Ok(())
}

/// Full pipeline: intake, dispatch, then the JSON summary file. The file has a
/// single writer: a configured `json_file` channel targeting `--summary-path`
/// owns it (policy included), otherwise the CLI writes it unconditionally
/// through the same channel.
pub async fn execute_run<R, S>(
    cli: &Cli,
    environment: ChannelEnvironment,
    reader: R,
    shutdown: S,
) -> Result<RunOutcome>
where
    R: AsyncBufRead + Unpin,
    S: Future<Output = ()>,
{
    let configs = resolve_channel_configs(cli.config.as_deref(), Path::new("."))?;
    let transport = WebhookTransport::new(cli.http_timeout_ms)?;
    tracing::debug!(
        channels = configs.len(),
        http_timeout_ms = u64::try_from(transport.timeout().as_millis()).unwrap_or(u64::MAX),
        "notification channels resolved"
    );

    let mut aggregator = RunAggregator::new()
        .with_project_name(cli.project_name.clone())
        .with_run_url(resolve_ci_run_url(&environment));
    let intake = read_run_events(reader, &mut aggregator, shutdown).await?;
    tracing::info!(
        status = intake.summary.status.as_str(),
        total = intake.summary.total,
        completed = intake.completed,
        "test run finalized"
    );

    let context =
        DeliveryContext::new(transport, environment).with_summary_path(cli.summary_path.clone());
    let report = dispatch_notifications(&intake.summary, &configs, &context).await;

    let summary_channel = JsonFileChannel::new(cli.summary_path.clone());
    let summary_path = if summary_file_owned_by_channel(&configs, &summary_channel) {
        tracing::debug!(
            path = %cli.summary_path.display(),
            "summary file delegated to configured json_file channel"
        );
        delivered_summary_path(&report, &cli.summary_path)
    } else if cli.no_summary_file {
        None
    } else {
        let receipt = summary_channel
            .send(&intake.summary, &NotificationConfig::new(ChannelKind::JsonFile))
            .await;
        if receipt.status == DeliveryStatus::Failed {
            bail!(
                "failed to write run summary {}: {}",
                cli.summary_path.display(),
                receipt.detail.unwrap_or_default()
            );
        }
        Some(cli.summary_path.clone())
    };

    Ok(RunOutcome {
        summary: intake.summary,
        completed: intake.completed,
        report,
        summary_path,
    })
}

/// True when some `json_file` channel writes to the CLI's summary path.
pub fn summary_file_owned_by_channel(
    configs: &[NotificationConfig],
    summary_channel: &JsonFileChannel,
) -> bool {
    let default_config = NotificationConfig::new(ChannelKind::JsonFile);
    let summary_path = summary_channel.output_path(&default_config);
    configs.iter().any(|config| {
        config.kind == ChannelKind::JsonFile && summary_channel.output_path(config) == summary_path
    })
}

fn delivered_summary_path(report: &DispatchReport, summary_path: &Path) -> Option<PathBuf> {
    let endpoint = summary_path.display().to_string();
    report
        .receipts
        .iter()
        .any(|receipt| {
            receipt.channel == ChannelKind::JsonFile.as_str()
                && receipt.status == DeliveryStatus::Delivered
                && receipt.endpoint.as_deref() == Some(endpoint.as_str())
        })
        .then(|| summary_path.to_path_buf())
}

/// `--config` when given, then `verdict.json` in `working_dir`, then a single
/// console channel with the default policy.
pub fn resolve_channel_configs(
    config_path: Option<&Path>,
    working_dir: &Path,
) -> Result<Vec<NotificationConfig>> {
    if let Some(path) = config_path {
        return Ok(load_notification_config_file(path)?.channels);
    }
    let default_path = working_dir.join(NOTIFICATION_CONFIG_FILE_NAME);
    if default_path.is_file() {
        tracing::debug!(path = %default_path.display(), "using notification config");
        return Ok(load_notification_config_file(&default_path)?.channels);
    }
    Ok(vec![NotificationConfig::new(ChannelKind::Console)])
}

pub fn render_dispatch_report(outcome: &RunOutcome) -> String {
    let report = &outcome.report;
    let mut lines = vec![format!(
        "verdict: run={} completed={} duration={} notified={} suppressed={} failed={}",
        report.run_status,
        outcome.completed,
        format_duration_secs(outcome.summary.duration_ms, 1),
        report.receipts.len(),
        report.suppressed.len(),
        report.failed_count()
    )];
    for receipt in &report.receipts {
        let mut line = format!("  {}: {}", receipt.channel, receipt.status.as_str());
        if let Some(http_status) = receipt.http_status {
            line.push_str(&format!(" http_status={http_status}"));
        }
        if let Some(reason_code) = receipt.reason_code.as_deref() {
            line.push_str(&format!(" reason_code={reason_code}"));
        }
        if let Some(endpoint) = receipt.endpoint.as_deref() {
            line.push_str(&format!(" endpoint={endpoint}"));
        }
        lines.push(line);
    }
    for suppressed in &report.suppressed {
        lines.push(format!(
            "  {}: suppressed reason_code={}",
            suppressed.channel, suppressed.reason_code
        ));
    }
    lines.join("\n")
}

async fn wait_for_ctrl_c() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(%error, "failed to install ctrl-c handler");
        std::future::pending::<()>().await;
    }
}
