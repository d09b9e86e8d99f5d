use std::path::PathBuf;

use clap::Parser;
use verdict_notify::{DEFAULT_HTTP_TIMEOUT_MS, DEFAULT_SUMMARY_PATH};

use crate::run_intake::STDIN_EVENTS_SOURCE;

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Clone, Parser)]
#[command(
    name = "verdict",
    about = "Aggregates test-run lifecycle events and notifies chat and webhook channels",
    version
)]
pub struct Cli {
    #[arg(
        long,
        default_value = STDIN_EVENTS_SOURCE,
        help = "NDJSON lifecycle event stream. Use '-' to read stdin."
    )]
    pub events: String,

    #[arg(
        long,
        env = "VERDICT_CONFIG",
        help = "Channel config file (.json or .toml). Defaults to ./verdict.json when present, otherwise console only."
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long = "summary-path",
        env = "VERDICT_SUMMARY_PATH",
        default_value = DEFAULT_SUMMARY_PATH,
        help = "Where the JSON run summary is written."
    )]
    pub summary_path: PathBuf,

    #[arg(
        long = "no-summary-file",
        default_value_t = false,
        help = "Skip writing the JSON run summary."
    )]
    pub no_summary_file: bool,

    #[arg(
        long = "project-name",
        env = "VERDICT_PROJECT_NAME",
        help = "Project name carried in the summary and webhook payload."
    )]
    pub project_name: Option<String>,

    #[arg(
        long = "http-timeout-ms",
        default_value_t = DEFAULT_HTTP_TIMEOUT_MS,
        value_parser = parse_positive_u64,
        help = "Per-request timeout for webhook deliveries."
    )]
    pub http_timeout_ms: u64,

    #[arg(
        long,
        default_value_t = false,
        help = "Print the dispatch report as JSON."
    )]
    pub json: bool,
}
