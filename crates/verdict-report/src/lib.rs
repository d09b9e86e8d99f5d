//! Test-run result aggregation for verdict.
//!
//! Folds lifecycle events from an external test runner into a finalized
//! [`RunSummary`] and decides, per notify-on policy, whether a run should be
//! announced.
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use verdict_report::{RunAggregator, RunStatus, TestCaseResult, TestCaseStatus};
//!
//! let mut run = RunAggregator::new();
//! run.begin()?;
//! run.record(TestCaseResult::new("logs in", "tests/login.spec.ts", TestCaseStatus::Passed, 420))?;
//! run.record(
//!     TestCaseResult::new("adds todo", "tests/todo.spec.ts", TestCaseStatus::Failed, 900)
//!         .with_error("expected 2 items"),
//! )?;
//! let summary = run.finish(RunStatus::Failed)?;
//! assert_eq!(summary.total, 2);
//! assert_eq!(summary.success_rate, 50.0);
//! # Ok(())
//! # }
//! ```

pub mod dispatch_policy;
pub mod lifecycle_events;
pub mod run_aggregator;
pub mod run_summary;
pub mod test_case;

pub use dispatch_policy::*;
pub use lifecycle_events::*;
pub use run_aggregator::*;
pub use run_summary::*;
pub use test_case::*;
