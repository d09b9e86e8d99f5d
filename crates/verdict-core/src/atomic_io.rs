use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{bail, Context, Result};
use serde::Serialize;

static TEMP_FILE_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Writes text through a sibling temp file and a rename so readers never see a
/// half-written report.
pub fn write_text_atomic(path: &Path, content: &str) -> Result<()> {
    if path.as_os_str().is_empty() {
        bail!("output path cannot be empty");
    }
    if path.is_dir() {
        bail!("output path '{}' is a directory", path.display());
    }

    let parent_dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent_dir)
        .with_context(|| format!("failed to create output directory {}", parent_dir.display()))?;

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("verdict-output");
    let temp_path = parent_dir.join(format!(
        ".{file_name}.tmp-{}-{}",
        std::process::id(),
        TEMP_FILE_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    std::fs::write(&temp_path, content)
        .with_context(|| format!("failed to write temporary file {}", temp_path.display()))?;
    std::fs::rename(&temp_path, path).with_context(|| {
        format!(
            "failed to move {} into place at {}",
            temp_path.display(),
            path.display()
        )
    })?;
    Ok(())
}

/// Serializes `value` as two-space indented JSON and writes it atomically.
pub fn write_json_pretty_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut rendered =
        serde_json::to_string_pretty(value).context("failed to serialize json output")?;
    rendered.push('\n');
    write_text_atomic(path, &rendered)
}
