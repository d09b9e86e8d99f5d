//! NDJSON lifecycle events emitted by the external test runner.
//!
//! Each line carries one of `begin`, `test_end`, or `end`, tagged by the
//! `event` field. Events are applied to a [`RunAggregator`] strictly in
//! arrival order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::run_aggregator::{LifecycleError, RunAggregator};
use crate::run_summary::{RunStatus, RunSummary};
use crate::test_case::TestCaseResult;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
/// Enumerates supported `LifecycleEvent` values.
pub enum LifecycleEvent {
    Begin {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<DateTime<Utc>>,
    },
    TestEnd(TestCaseResult),
    End {
        status: RunStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<DateTime<Utc>>,
    },
}

impl LifecycleEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Begin { .. } => "begin",
            Self::TestEnd(_) => "test_end",
            Self::End { .. } => "end",
        }
    }
}

#[derive(Debug, Error)]
/// Failure while reading or applying a lifecycle stream.
pub enum IntakeError {
    #[error("line {line}: malformed lifecycle event: {source}")]
    Malformed {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("line {line}: {source}")]
    Sequencing {
        line: usize,
        #[source]
        source: LifecycleError,
    },
}

/// Parses one NDJSON line. Blank lines yield `Ok(None)`.
pub fn parse_lifecycle_event_line(
    raw: &str,
    line: usize,
) -> Result<Option<LifecycleEvent>, IntakeError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(trimmed)
        .map(Some)
        .map_err(|source| IntakeError::Malformed { line, source })
}

/// Routes one event into the aggregator. Returns the summary on run-end.
pub fn apply_lifecycle_event(
    aggregator: &mut RunAggregator,
    event: LifecycleEvent,
) -> Result<Option<RunSummary>, LifecycleError> {
    match event {
        LifecycleEvent::Begin { timestamp } => {
            aggregator.begin_at(timestamp.unwrap_or_else(Utc::now))?;
            Ok(None)
        }
        LifecycleEvent::TestEnd(result) => {
            aggregator.record(result)?;
            Ok(None)
        }
        LifecycleEvent::End { status, timestamp } => aggregator
            .finish_at(status, timestamp.unwrap_or_else(Utc::now))
            .map(Some),
    }
}

/// Replays a complete NDJSON document. Used for recorded streams and tests;
/// the CLI reads incrementally instead.
pub fn replay_lifecycle_stream(
    aggregator: &mut RunAggregator,
    raw: &str,
) -> Result<Option<RunSummary>, IntakeError> {
    let mut summary = None;
    for (index, raw_line) in raw.lines().enumerate() {
        let line = index + 1;
        let Some(event) = parse_lifecycle_event_line(raw_line, line)? else {
            continue;
        };
        let finalized = apply_lifecycle_event(aggregator, event)
            .map_err(|source| IntakeError::Sequencing { line, source })?;
        if finalized.is_some() {
            summary = finalized;
        }
    }
    Ok(summary)
}
