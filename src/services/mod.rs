//! Coordination services.
//!
//! Each table-level service is a plain synchronous type with no locking of
//! its own; [`Coordinator`] owns them behind locks and is the shared entry
//! point.

pub mod coordinator;
pub mod dependency_graph;
pub mod heartbeat_monitor;
pub mod priority_adjuster;
pub mod progress_tracker;
pub mod resource_ledger;
pub mod stall_recovery;
pub mod task_registry;

pub use coordinator::{Coordinator, CoordinatorSnapshot};
pub use dependency_graph::DependencyGraph;
pub use heartbeat_monitor::HeartbeatMonitor;
pub use priority_adjuster::PriorityAdjuster;
pub use progress_tracker::{estimate_completion, ProgressOutcome, ProgressTracker};
pub use resource_ledger::ResourceLedger;
pub use stall_recovery::{RecoveryAction, StallRecoveryPolicy};
pub use task_registry::TaskRegistry;
