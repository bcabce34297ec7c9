use chrono::{DateTime, Utc};

use crate::domain::models::{CoordinationConfig, Task, TaskStatus};

/// Decision taken for a stalled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Task reset to pending for another attempt
    Retry { stall_count: u32 },
    /// Stall budget exhausted; task failed permanently
    Fail { stall_count: u32 },
    /// Task was not stalled; nothing changed
    NotStalled,
}

/// Bounded retry for stalled tasks.
///
/// The first `max_stalls` stalls send the task back to pending; the next one
/// fails it. Failed is terminal, so the stall/retry cycle always ends.
#[derive(Debug, Clone)]
pub struct StallRecoveryPolicy {
    max_stalls: u32,
}

impl StallRecoveryPolicy {
    pub fn new(max_stalls: u32) -> Self {
        Self { max_stalls }
    }

    pub fn from_config(config: &CoordinationConfig) -> Self {
        Self::new(config.max_stalls)
    }

    pub fn max_stalls(&self) -> u32 {
        self.max_stalls
    }

    /// React to a stall detection made at `now`.
    ///
    /// A retried task starts a fresh attempt: its progress clock restarts at
    /// `now` and its completion estimate is cleared.
    pub fn on_stall(&self, task: &mut Task, now: DateTime<Utc>) -> RecoveryAction {
        if task.status != TaskStatus::Stalled {
            return RecoveryAction::NotStalled;
        }

        let stall_count = task.metrics.stall_count;
        if stall_count <= self.max_stalls {
            task.status = TaskStatus::Pending;
            task.metrics.last_progress_time = now;
            task.metrics.estimated_completion = None;
            RecoveryAction::Retry { stall_count }
        } else {
            task.status = TaskStatus::Failed;
            RecoveryAction::Fail { stall_count }
        }
    }
}

impl Default for StallRecoveryPolicy {
    fn default() -> Self {
        Self::from_config(&CoordinationConfig::default())
    }
}
