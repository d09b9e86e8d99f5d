//! Terminal outcome of a single test case as reported by the runner.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PROJECT_NAME: &str = "default";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `TestCaseStatus` values.
pub enum TestCaseStatus {
    Passed,
    Failed,
    #[serde(alias = "timedOut", alias = "timedout")]
    TimedOut,
    Skipped,
}

impl TestCaseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
            Self::Skipped => "skipped",
        }
    }

    /// Failed and timed-out tests both count as failures.
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Failed | Self::TimedOut)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// One test-end event. Created once and never modified.
pub struct TestCaseResult {
    pub title: String,
    pub file: String,
    #[serde(default)]
    pub project: String,
    pub status: TestCaseStatus,
    #[serde(default, rename = "duration")]
    pub duration_ms: u64,
    #[serde(default)]
    pub retry: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TestCaseResult {
    pub fn new(
        title: impl Into<String>,
        file: impl Into<String>,
        status: TestCaseStatus,
        duration_ms: u64,
    ) -> Self {
        Self {
            title: title.into(),
            file: file.into(),
            project: String::new(),
            status,
            duration_ms,
            retry: 0,
            error: None,
        }
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = project.into();
        self
    }

    pub fn with_retry(mut self, retry: u32) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Group key used for the per-project breakdown.
    pub fn project_name(&self) -> &str {
        let trimmed = self.project.trim();
        if trimmed.is_empty() {
            DEFAULT_PROJECT_NAME
        } else {
            trimmed
        }
    }

    /// Passed only after at least one retry.
    pub fn is_flaky(&self) -> bool {
        self.status == TestCaseStatus::Passed && self.retry > 0
    }
}
