use chrono::{DateTime, Utc};

use crate::domain::models::{CoordinationConfig, Task, TaskPriority};

/// Service for escalating task priority as the projected finish nears.
///
/// Slack is `estimated_completion - now`, compared against fractions of the
/// task's advisory timeout:
/// - `slack <= critical_slack_ratio * timeout` escalates to critical
/// - `slack <= high_slack_ratio * timeout` escalates to high
///
/// Escalation only ever raises priority; lowering it is a caller decision.
#[derive(Debug, Clone)]
pub struct PriorityAdjuster {
    high_slack_ratio: f64,
    critical_slack_ratio: f64,
}

impl Default for PriorityAdjuster {
    fn default() -> Self {
        Self::from_config(&CoordinationConfig::default())
    }
}

impl PriorityAdjuster {
    /// Create an adjuster with custom thresholds
    pub fn with_ratios(high_slack_ratio: f64, critical_slack_ratio: f64) -> Self {
        Self {
            high_slack_ratio,
            critical_slack_ratio,
        }
    }

    pub fn from_config(config: &CoordinationConfig) -> Self {
        Self::with_ratios(config.high_slack_ratio, config.critical_slack_ratio)
    }

    /// Priority the task should have at `now`, never below its current one.
    ///
    /// Terminal tasks and tasks without a completion estimate keep their
    /// current priority.
    pub fn evaluate(&self, task: &Task, now: DateTime<Utc>) -> TaskPriority {
        if task.is_terminal() {
            return task.priority;
        }
        let Some(estimated_completion) = task.metrics.estimated_completion else {
            return task.priority;
        };

        #[allow(clippy::cast_precision_loss)]
        let slack_secs = (estimated_completion - now).num_milliseconds() as f64 / 1000.0;
        #[allow(clippy::cast_precision_loss)]
        let timeout_secs = task.timeout_secs as f64;

        let target = if slack_secs <= self.critical_slack_ratio * timeout_secs {
            TaskPriority::Critical
        } else if slack_secs <= self.high_slack_ratio * timeout_secs {
            TaskPriority::High
        } else {
            task.priority
        };

        task.priority.max(target)
    }

    /// Evaluate and store the result on the task.
    pub fn adjust(&self, task: &mut Task, now: DateTime<Utc>) -> TaskPriority {
        let priority = self.evaluate(task, now);
        task.priority = priority;
        priority
    }
}
