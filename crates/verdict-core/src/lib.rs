//! Foundational helpers shared across verdict crates.
//!
//! Provides atomic file persistence for run summaries and the timestamp and
//! duration formatting used by every human-facing report.

pub mod atomic_io;
pub mod time_utils;

pub use atomic_io::{write_json_pretty_atomic, write_text_atomic};
pub use time_utils::{elapsed_ms_between, format_duration_secs, format_run_timestamp, to_rfc3339_ms};
