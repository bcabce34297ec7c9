//! Common test utilities for integration tests
//!
//! Provides shared fixtures used across multiple integration test files.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use swarmcore::{CoordinationConfig, Coordinator, Task};

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
/// Call this at the beginning of tests that need logging.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Fixed instant so time arithmetic in tests is exact
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 1, 12, 0, 0).unwrap()
}

pub fn at(secs: i64) -> DateTime<Utc> {
    t0() + Duration::seconds(secs)
}

/// Coordinator with the default thresholds (30s stall, 3 stalls, 10s heartbeat)
pub fn coordinator() -> Coordinator {
    Coordinator::new(CoordinationConfig::default())
}

/// Register `ids` as a chain where each task depends on the previous one
pub fn register_chain(coordinator: &Coordinator, ids: &[&str]) {
    let mut previous: Option<&str> = None;
    for id in ids {
        let mut task = Task::new(*id, "agent");
        if let Some(dep) = previous {
            task = task.with_dependency(dep);
        }
        assert!(coordinator.register_task_at(task, t0()), "failed to register {id}");
        previous = Some(*id);
    }
}
