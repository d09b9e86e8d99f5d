//! Command-line host for verdict.
//!
//! Reads NDJSON lifecycle events from a file or stdin, finalizes the run,
//! writes the JSON summary, and dispatches notifications to every configured
//! channel.

mod bootstrap_helpers;
mod cli_args;
mod run_command;
mod run_intake;

pub use bootstrap_helpers::init_tracing;
pub use cli_args::Cli;
pub use run_command::{
    execute_run, render_dispatch_report, resolve_channel_configs, run_cli,
    summary_file_owned_by_channel, RunOutcome,
};
pub use run_intake::{
    finalize_interrupted, open_event_source, read_run_events, IntakeOutcome, STDIN_EVENTS_SOURCE,
};
