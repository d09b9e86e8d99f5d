//! Notify-on policy evaluation.

use serde::{Deserialize, Serialize};

use crate::run_summary::RunStatus;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
/// Notify-on flags as written in channel config. Fields left out are `false`.
pub struct NotifyOn {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub failure: bool,
    #[serde(default)]
    pub always: bool,
}

impl NotifyOn {
    /// Policy applied when a channel supplies no `notifyOn` block at all.
    pub const FAILURE_ONLY: Self = Self {
        success: false,
        failure: true,
        always: false,
    };

    pub fn resolve(configured: Option<Self>) -> Self {
        configured.unwrap_or(Self::FAILURE_ONLY)
    }
}

/// Pure dispatch decision for a finalized run.
pub fn should_notify(notify_on: NotifyOn, status: RunStatus) -> bool {
    if notify_on.always {
        return true;
    }
    if notify_on.success && status.is_passed() {
        return true;
    }
    notify_on.failure && !status.is_passed()
}
