use chrono::{DateTime, SecondsFormat, Utc};

/// Milliseconds from `start` to `end`, clamped at zero for skewed clocks.
pub fn elapsed_ms_between(start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    end.signed_duration_since(start)
        .num_milliseconds()
        .try_into()
        .unwrap_or(0)
}

/// Renders a millisecond duration as seconds, e.g. `12.3s`.
pub fn format_duration_secs(duration_ms: u64, precision: usize) -> String {
    format!("{:.*}s", precision, duration_ms as f64 / 1_000.0)
}

/// Human-readable run timestamp used by console and chat renderings.
pub fn format_run_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// RFC 3339 with millisecond precision and a `Z` suffix.
pub fn to_rfc3339_ms(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
