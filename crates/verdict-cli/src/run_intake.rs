//! Incremental intake of the NDJSON lifecycle stream.
//!
//! Lines are applied as they arrive. If the stream ends, or the shutdown
//! future resolves, before an `end` event, the run is finalized as
//! `interrupted` so notifications still go out.

use std::future::Future;
use std::path::Path;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use verdict_report::{
    apply_lifecycle_event, parse_lifecycle_event_line, IntakeError, LifecycleError,
    RunAggregator, RunPhase, RunStatus, RunSummary,
};

pub const STDIN_EVENTS_SOURCE: &str = "-";

#[derive(Debug, Clone, PartialEq)]
pub struct IntakeOutcome {
    pub summary: RunSummary,
    /// False when the run was finalized without an `end` event.
    pub completed: bool,
    pub events: usize,
}

pub async fn open_event_source(source: &str) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    if source.trim() == STDIN_EVENTS_SOURCE {
        return Ok(Box::new(BufReader::new(tokio::io::stdin())));
    }
    let path = Path::new(source);
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("failed to open event stream {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

pub async fn read_run_events<R, S>(
    reader: R,
    aggregator: &mut RunAggregator,
    shutdown: S,
) -> Result<IntakeOutcome>
where
    R: AsyncBufRead + Unpin,
    S: Future<Output = ()>,
{
    let mut lines = reader.lines();
    tokio::pin!(shutdown);
    let mut line = 0_usize;
    let mut events = 0_usize;

    let interruption = loop {
        let next = tokio::select! {
            next = lines.next_line() => next.context("failed to read lifecycle event stream")?,
            _ = &mut shutdown => break "shutdown signal received",
        };
        let Some(raw) = next else {
            break "event stream ended before run end";
        };
        line += 1;
        let Some(event) = parse_lifecycle_event_line(&raw, line)? else {
            continue;
        };
        events += 1;
        tracing::debug!(line, kind = event.kind(), "lifecycle event received");
        let finalized = apply_lifecycle_event(aggregator, event)
            .map_err(|source| IntakeError::Sequencing { line, source })?;
        if let Some(summary) = finalized {
            return Ok(IntakeOutcome {
                summary,
                completed: true,
                events,
            });
        }
    };

    tracing::warn!(
        reason = interruption,
        phase = aggregator.phase().as_str(),
        events,
        "finalizing test run as interrupted"
    );
    let summary = finalize_interrupted(aggregator)?;
    Ok(IntakeOutcome {
        summary,
        completed: false,
        events,
    })
}

/// Closes a run that never saw `end`. A run that never began is opened first
/// so the summary still has a start time.
pub fn finalize_interrupted(aggregator: &mut RunAggregator) -> Result<RunSummary, LifecycleError> {
    if aggregator.phase() == RunPhase::NotStarted {
        aggregator.begin()?;
    }
    aggregator.finish(RunStatus::Interrupted)
}
