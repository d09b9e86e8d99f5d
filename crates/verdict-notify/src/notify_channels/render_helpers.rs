//! Status wording, colors, and truncation shared by the chat renderers.

use verdict_core::{format_duration_secs, format_run_timestamp};
use verdict_report::{RunStatus, RunSummary};

/// Failures listed in chat and console messages. The JSON file and generic
/// webhook always carry the full list.
pub const FAILURE_PREVIEW_LIMIT: usize = 5;

pub(super) const PASSED_COLOR_HEX: &str = "36a64f";
pub(super) const FAILED_COLOR_HEX: &str = "dc3545";
pub(super) const INTERRUPTED_COLOR_HEX: &str = "f0ad4e";

pub(super) fn status_emoji(status: RunStatus) -> &'static str {
    if status.is_passed() {
        "✅"
    } else {
        "❌"
    }
}

pub(super) fn status_label(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Passed => "passed",
        RunStatus::Failed => "failed",
        RunStatus::Timedout => "timed out",
        RunStatus::Interrupted => "interrupted",
    }
}

/// e.g. `❌ Test run failed`.
pub(super) fn status_title(status: RunStatus) -> String {
    format!("{} Test run {}", status_emoji(status), status_label(status))
}

pub(super) fn status_color_hex(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Passed => PASSED_COLOR_HEX,
        RunStatus::Failed | RunStatus::Timedout => FAILED_COLOR_HEX,
        RunStatus::Interrupted => INTERRUPTED_COLOR_HEX,
    }
}

pub(super) fn status_color_decimal(status: RunStatus) -> u32 {
    u32::from_str_radix(status_color_hex(status), 16).unwrap_or(0)
}

pub(super) fn duration_text(summary: &RunSummary) -> String {
    format_duration_secs(summary.duration_ms, 1)
}

pub(super) fn started_text(summary: &RunSummary) -> String {
    format_run_timestamp(summary.start_time)
}

/// Bulleted failure titles, capped at [`FAILURE_PREVIEW_LIMIT`]. `None` when
/// the run captured no failures.
pub(super) fn failure_list(summary: &RunSummary, bullet: &str) -> Option<String> {
    if summary.failures.is_empty() {
        return None;
    }
    let mut lines = summary
        .failures_preview(FAILURE_PREVIEW_LIMIT)
        .iter()
        .map(|failure| format!("{bullet} {}", failure.title))
        .collect::<Vec<_>>();
    let hidden = summary.failures.len().saturating_sub(FAILURE_PREVIEW_LIMIT);
    if hidden > 0 {
        lines.push(format!("…and {hidden} more"));
    }
    Some(lines.join("\n"))
}

pub(super) fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut output = text
        .chars()
        .take(max_chars.saturating_sub(1))
        .collect::<String>();
    output.push('…');
    output
}
