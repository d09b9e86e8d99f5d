//! Finalized run record and the derived views computed at run end.
//!
//! A [`RunSummary`] is built exactly once per run and is the only input handed
//! to notification channels. Success rate and slow-test ranking live here so
//! every renderer agrees on them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::test_case::{TestCaseResult, TestCaseStatus};

pub const SLOW_TEST_LIMIT: usize = 5;
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
/// Final status of the whole run as reported by the runner.
pub enum RunStatus {
    Passed,
    Failed,
    #[serde(alias = "timedOut", alias = "timed_out")]
    Timedout,
    Interrupted,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Timedout => "timedout",
            Self::Interrupted => "interrupted",
        }
    }

    pub fn is_passed(self) -> bool {
        self == Self::Passed
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FailedTest {
    pub title: String,
    pub file: String,
    pub project: String,
    pub status: TestCaseStatus,
    pub error: String,
    #[serde(rename = "duration")]
    pub duration_ms: u64,
}

impl FailedTest {
    pub(crate) fn from_result(result: &TestCaseResult) -> Self {
        let error = result
            .error
            .as_deref()
            .map(str::trim)
            .filter(|message| !message.is_empty())
            .unwrap_or(UNKNOWN_ERROR_MESSAGE)
            .to_string();
        Self {
            title: result.title.clone(),
            file: result.file.clone(),
            project: result.project_name().to_string(),
            status: result.status,
            error,
            duration_ms: result.duration_ms,
        }
    }

    /// First line of the error, used by compact renderings.
    pub fn error_headline(&self) -> &str {
        self.error.lines().next().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
/// Per-project counters.
pub struct GroupStats {
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    #[serde(default)]
    pub skipped: u64,
}

impl GroupStats {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlowTest {
    pub title: String,
    pub file: String,
    #[serde(rename = "duration")]
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
/// Immutable record of one finished run.
pub struct RunSummary {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(rename = "duration")]
    pub duration_ms: u64,
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub flaky: u64,
    pub success_rate: f64,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_url: Option<String>,
    pub failures: Vec<FailedTest>,
    pub projects: BTreeMap<String, GroupStats>,
    pub slow_tests: Vec<SlowTest>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.status.is_passed()
    }

    /// At most `limit` failures, in capture order.
    pub fn failures_preview(&self, limit: usize) -> &[FailedTest] {
        &self.failures[..self.failures.len().min(limit)]
    }
}

/// `passed / total * 100`, defined as zero for an empty run.
pub fn compute_success_rate(passed: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    passed as f64 / total as f64 * 100.0
}

/// Longest passed tests first. `sort_by` is stable, so equal durations keep
/// the order in which they were seen.
pub fn rank_slow_tests(passed_results: &[SlowTest], limit: usize) -> Vec<SlowTest> {
    let mut ranked = passed_results.to_vec();
    ranked.sort_by(|left, right| right.duration_ms.cmp(&left.duration_ms));
    ranked.truncate(limit);
    ranked
}
