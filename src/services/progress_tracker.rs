use chrono::{DateTime, Duration, Utc};

use crate::domain::errors::{CoordinationError, CoordinationResult};
use crate::domain::models::{CoordinationConfig, Task, TaskStatus};

/// Smallest fraction used as a divisor when projecting completion.
const MIN_FRACTION: f64 = 1e-6;

/// What a progress report did to the task.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressOutcome {
    /// Fraction recorded and completion estimate refreshed
    Recorded {
        estimated_completion: Option<DateTime<Utc>>,
    },
    /// The report arrived after the stall threshold; the task is now stalled
    Stalled { silent_for: Duration },
    /// Task is terminal; nothing changed
    Frozen,
}

/// Detects stalls on progress reports and projects completion times.
///
/// Detection is edge-triggered: it only runs when a report arrives or when
/// an external sweep asks via [`ProgressTracker::is_stale`].
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    stall_threshold: Duration,
}

impl ProgressTracker {
    pub fn new(stall_threshold: Duration) -> Self {
        Self { stall_threshold }
    }

    pub fn from_config(config: &CoordinationConfig) -> Self {
        Self::new(config.stall_threshold())
    }

    pub fn stall_threshold(&self) -> Duration {
        self.stall_threshold
    }

    /// Apply a progress report made at `now`.
    ///
    /// Non-finite fractions are rejected before any mutation; finite ones are
    /// clamped to `[0, 1]`.
    pub fn record(
        &self,
        task: &mut Task,
        fraction: f64,
        now: DateTime<Utc>,
    ) -> CoordinationResult<ProgressOutcome> {
        if !fraction.is_finite() {
            return Err(CoordinationError::InvalidProgress(fraction));
        }

        if task.is_terminal() {
            return Ok(ProgressOutcome::Frozen);
        }

        let silent_for = now - task.metrics.last_progress_time;
        if silent_for > self.stall_threshold {
            self.mark_stalled(task);
            return Ok(ProgressOutcome::Stalled { silent_for });
        }

        let fraction = fraction.clamp(0.0, 1.0);
        let metrics = &mut task.metrics;
        metrics.progress_fraction = fraction;
        metrics.last_progress_time = now;
        metrics.estimated_completion = estimate_completion(metrics.start_time, now, fraction);

        Ok(ProgressOutcome::Recorded {
            estimated_completion: metrics.estimated_completion,
        })
    }

    /// Whether the task has gone longer than the threshold without progress.
    pub fn is_stale(&self, task: &Task, now: DateTime<Utc>) -> bool {
        task.status.is_active() && now - task.metrics.last_progress_time > self.stall_threshold
    }

    /// Record a stall detection.
    pub fn mark_stalled(&self, task: &mut Task) {
        task.metrics.stall_count = task.metrics.stall_count.saturating_add(1);
        task.status = TaskStatus::Stalled;
    }
}

/// Project completion from the average rate so far.
///
/// `now + elapsed * (1 - fraction) / fraction`; a zero fraction, or a
/// projection past the representable range, yields `None`.
pub fn estimate_completion(
    start_time: DateTime<Utc>,
    now: DateTime<Utc>,
    fraction: f64,
) -> Option<DateTime<Utc>> {
    if fraction <= 0.0 {
        return None;
    }

    #[allow(clippy::cast_precision_loss)]
    let elapsed_secs = ((now - start_time).num_milliseconds().max(0) as f64) / 1000.0;
    let remaining_secs = elapsed_secs * (1.0 - fraction) / fraction.max(MIN_FRACTION);

    let remaining = std::time::Duration::try_from_secs_f64(remaining_secs).ok()?;
    let remaining = Duration::from_std(remaining).ok()?;
    now.checked_add_signed(remaining)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running_task(start: DateTime<Utc>) -> Task {
        let mut task = Task::new("t", "agent");
        task.status = TaskStatus::Running;
        task.metrics = crate::domain::models::TaskMetrics::started_at(start);
        task
    }

    #[test]
    fn test_record_updates_metrics() {
        let tracker = ProgressTracker::new(Duration::seconds(30));
        let start = Utc::now();
        let mut task = running_task(start);
        let now = start + Duration::seconds(10);

        let outcome = tracker.record(&mut task, 0.5, now).unwrap();

        assert_eq!(task.metrics.progress_fraction, 0.5);
        assert_eq!(task.metrics.last_progress_time, now);
        // 10s elapsed at half way -> 10s remaining
        let expected = now + Duration::seconds(10);
        assert_eq!(task.metrics.estimated_completion, Some(expected));
        assert_eq!(
            outcome,
            ProgressOutcome::Recorded {
                estimated_completion: Some(expected)
            }
        );
    }

    #[test]
    fn test_zero_fraction_leaves_estimate_unknown() {
        let tracker = ProgressTracker::new(Duration::seconds(30));
        let start = Utc::now();
        let mut task = running_task(start);

        tracker
            .record(&mut task, 0.0, start + Duration::seconds(5))
            .unwrap();

        assert!(task.metrics.estimated_completion.is_none());
    }

    #[test]
    fn test_fraction_is_clamped() {
        let tracker = ProgressTracker::new(Duration::seconds(30));
        let start = Utc::now();
        let mut task = running_task(start);
        let now = start + Duration::seconds(4);

        tracker.record(&mut task, 1.7, now).unwrap();
        assert_eq!(task.metrics.progress_fraction, 1.0);
        assert_eq!(task.metrics.estimated_completion, Some(now));

        tracker.record(&mut task, -0.3, now).unwrap();
        assert_eq!(task.metrics.progress_fraction, 0.0);
    }

    #[test]
    fn test_non_finite_fraction_rejected_without_mutation() {
        let tracker = ProgressTracker::new(Duration::seconds(30));
        let start = Utc::now();
        let mut task = running_task(start);
        let before = task.clone();

        assert!(tracker.record(&mut task, f64::NAN, start).is_err());
        assert!(tracker.record(&mut task, f64::INFINITY, start).is_err());
        assert_eq!(task, before);
    }

    #[test]
    fn test_late_report_is_a_stall() {
        let tracker = ProgressTracker::new(Duration::seconds(30));
        let start = Utc::now();
        let mut task = running_task(start);

        let outcome = tracker
            .record(&mut task, 0.9, start + Duration::seconds(31))
            .unwrap();

        assert_eq!(
            outcome,
            ProgressOutcome::Stalled {
                silent_for: Duration::seconds(31)
            }
        );
        assert_eq!(task.status, TaskStatus::Stalled);
        assert_eq!(task.metrics.stall_count, 1);
        assert_eq!(task.metrics.progress_fraction, 0.0);
        assert_eq!(task.metrics.last_progress_time, start);
    }

    #[test]
    fn test_report_exactly_at_threshold_is_not_a_stall() {
        let tracker = ProgressTracker::new(Duration::seconds(30));
        let start = Utc::now();
        let mut task = running_task(start);

        tracker
            .record(&mut task, 0.1, start + Duration::seconds(30))
            .unwrap();

        assert_eq!(task.status, TaskStatus::Running);
        assert_eq!(task.metrics.stall_count, 0);
    }

    #[test]
    fn test_terminal_task_is_frozen() {
        let tracker = ProgressTracker::new(Duration::seconds(30));
        let start = Utc::now();
        let mut task = running_task(start);
        task.status = TaskStatus::Failed;
        let before = task.clone();

        let outcome = tracker
            .record(&mut task, 0.5, start + Duration::minutes(5))
            .unwrap();

        assert_eq!(outcome, ProgressOutcome::Frozen);
        assert_eq!(task, before);
    }

    #[test]
    fn test_is_stale() {
        let tracker = ProgressTracker::new(Duration::seconds(30));
        let start = Utc::now();
        let mut task = running_task(start);

        assert!(!tracker.is_stale(&task, start + Duration::seconds(30)));
        assert!(tracker.is_stale(&task, start + Duration::seconds(31)));

        task.status = TaskStatus::Completed;
        assert!(!tracker.is_stale(&task, start + Duration::hours(1)));
    }

    #[test]
    fn test_tiny_fraction_projection_stays_representable() {
        let start = Utc::now();
        let now = start + Duration::days(365 * 100);
        // Either a far-future instant or unknown, but never a panic
        let _ = estimate_completion(start, now, f64::MIN_POSITIVE);
    }
}
