//! Result aggregation across a single test run.
//!
//! [`RunAggregator`] is the explicit per-run context threaded from run-begin
//! to run-end. Callbacks must arrive in lifecycle order; anything else is a
//! contract breach by the host and is returned as a [`LifecycleError`].

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use thiserror::Error;
use verdict_core::elapsed_ms_between;

use crate::run_summary::{
    compute_success_rate, rank_slow_tests, FailedTest, GroupStats, RunStatus, RunSummary,
    SlowTest, SLOW_TEST_LIMIT,
};
use crate::test_case::{TestCaseResult, TestCaseStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Enumerates supported `RunPhase` values.
pub enum RunPhase {
    NotStarted,
    Running,
    Finalized,
}

impl RunPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Running => "running",
            Self::Finalized => "finalized",
        }
    }
}

/// Lifecycle callback received in an order the runner contract forbids.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("{operation} received before run-begin")]
    NotStarted { operation: &'static str },
    #[error("run-begin received twice")]
    AlreadyStarted,
    #[error("{operation} received after the run was finalized")]
    AlreadyFinalized { operation: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
/// Running counters. `total == passed + failed + skipped` after every record.
pub struct RunTally {
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub flaky: u64,
    pub failures: Vec<FailedTest>,
    pub projects: BTreeMap<String, GroupStats>,
}

impl RunTally {
    fn apply(&mut self, result: &TestCaseResult) {
        let group = self
            .projects
            .entry(result.project_name().to_string())
            .or_default();
        self.total += 1;
        group.total += 1;
        match result.status {
            TestCaseStatus::Passed => {
                self.passed += 1;
                group.passed += 1;
                if result.is_flaky() {
                    self.flaky += 1;
                }
            }
            TestCaseStatus::Failed | TestCaseStatus::TimedOut => {
                self.failed += 1;
                group.failed += 1;
                self.failures.push(FailedTest::from_result(result));
            }
            TestCaseStatus::Skipped => {
                self.skipped += 1;
                group.skipped += 1;
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunAggregator {
    phase: RunPhase,
    start_time: Option<DateTime<Utc>>,
    tally: RunTally,
    passed_results: Vec<SlowTest>,
    project_name: Option<String>,
    run_url: Option<String>,
}

impl Default for RunAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl RunAggregator {
    pub fn new() -> Self {
        Self {
            phase: RunPhase::NotStarted,
            start_time: None,
            tally: RunTally::default(),
            passed_results: Vec::new(),
            project_name: None,
            run_url: None,
        }
    }

    pub fn with_project_name(mut self, project_name: Option<String>) -> Self {
        self.project_name = project_name.filter(|name| !name.trim().is_empty());
        self
    }

    pub fn with_run_url(mut self, run_url: Option<String>) -> Self {
        self.run_url = run_url.filter(|url| !url.trim().is_empty());
        self
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    pub fn tally(&self) -> &RunTally {
        &self.tally
    }

    pub fn begin(&mut self) -> Result<(), LifecycleError> {
        self.begin_at(Utc::now())
    }

    pub fn begin_at(&mut self, start_time: DateTime<Utc>) -> Result<(), LifecycleError> {
        match self.phase {
            RunPhase::NotStarted => {
                self.start_time = Some(start_time);
                self.phase = RunPhase::Running;
                Ok(())
            }
            RunPhase::Running => Err(LifecycleError::AlreadyStarted),
            RunPhase::Finalized => Err(LifecycleError::AlreadyFinalized {
                operation: "run-begin",
            }),
        }
    }

    pub fn record(&mut self, result: TestCaseResult) -> Result<(), LifecycleError> {
        self.ensure_running("test-end")?;
        tracing::debug!(
            title = result.title.as_str(),
            status = result.status.as_str(),
            project = result.project_name(),
            "test result recorded"
        );
        self.tally.apply(&result);
        if result.status == TestCaseStatus::Passed {
            self.passed_results.push(SlowTest {
                title: result.title,
                file: result.file,
                duration_ms: result.duration_ms,
            });
        }
        Ok(())
    }

    pub fn finish(&mut self, status: RunStatus) -> Result<RunSummary, LifecycleError> {
        self.finish_at(status, Utc::now())
    }

    /// Freezes the run and builds the summary. Subsequent callbacks fail.
    pub fn finish_at(
        &mut self,
        status: RunStatus,
        end_time: DateTime<Utc>,
    ) -> Result<RunSummary, LifecycleError> {
        self.ensure_running("run-end")?;
        let start_time = self.start_time.unwrap_or(end_time);
        self.phase = RunPhase::Finalized;

        let tally = self.tally.clone();
        let summary = RunSummary {
            start_time,
            end_time,
            duration_ms: elapsed_ms_between(start_time, end_time),
            total: tally.total,
            passed: tally.passed,
            failed: tally.failed,
            skipped: tally.skipped,
            flaky: tally.flaky,
            success_rate: compute_success_rate(tally.passed, tally.total),
            status,
            project_name: self.project_name.clone(),
            run_url: self.run_url.clone(),
            failures: tally.failures,
            projects: tally.projects,
            slow_tests: rank_slow_tests(&self.passed_results, SLOW_TEST_LIMIT),
        };
        tracing::debug!(
            status = summary.status.as_str(),
            total = summary.total,
            failed = summary.failed,
            duration_ms = summary.duration_ms,
            "test run finalized"
        );
        Ok(summary)
    }

    fn ensure_running(&self, operation: &'static str) -> Result<(), LifecycleError> {
        match self.phase {
            RunPhase::Running => Ok(()),
            RunPhase::NotStarted => Err(LifecycleError::NotStarted { operation }),
            RunPhase::Finalized => Err(LifecycleError::AlreadyFinalized { operation }),
        }
    }
}

#[derive(Debug, Clone, Default)]
/// Aggregator handle for hosts that deliver callbacks from several threads.
pub struct SharedRunAggregator {
    inner: Arc<Mutex<RunAggregator>>,
}

impl SharedRunAggregator {
    pub fn new(aggregator: RunAggregator) -> Self {
        Self {
            inner: Arc::new(Mutex::new(aggregator)),
        }
    }

    pub fn begin(&self) -> Result<(), LifecycleError> {
        self.with_aggregator(RunAggregator::begin)
    }

    pub fn record(&self, result: TestCaseResult) -> Result<(), LifecycleError> {
        self.with_aggregator(|aggregator| aggregator.record(result))
    }

    pub fn finish(&self, status: RunStatus) -> Result<RunSummary, LifecycleError> {
        self.with_aggregator(|aggregator| aggregator.finish(status))
    }

    pub fn tally(&self) -> RunTally {
        self.with_aggregator(|aggregator| aggregator.tally().clone())
    }

    fn with_aggregator<T>(&self, operation: impl FnOnce(&mut RunAggregator) -> T) -> T {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        operation(&mut *guard)
    }
}
