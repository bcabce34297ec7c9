//! Domain errors for the coordination core.

use thiserror::Error;

use super::models::task::{TaskId, TaskStatus};

/// Format a cycle path as a human-readable string: `A -> B -> C -> A`.
fn format_cycle_path(path: &[TaskId]) -> String {
    path.join(" -> ")
}

/// Reasons a coordination request is refused.
///
/// The public `Coordinator` calls fold these into `bool`/`Option` results;
/// the `try_*` variants hand them to callers that want the reason.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinationError {
    #[error("Task already registered: {0}")]
    DuplicateTask(TaskId),

    #[error("Task dependency cycle detected: {}", format_cycle_path(.0))]
    DependencyCycle(Vec<TaskId>),

    #[error("Task {task_id} depends on unregistered task {dependency}")]
    UnknownDependency { task_id: TaskId, dependency: TaskId },

    #[error("Task not found: {0}")]
    UnknownTask(TaskId),

    #[error("Resource {resource} is held by task {holder}")]
    ResourceContention { resource: String, holder: TaskId },

    #[error("Invalid progress fraction: {0}")]
    InvalidProgress(f64),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },

    #[error("Task {task_id} is in terminal state: {status}")]
    TaskInTerminalState { task_id: TaskId, status: TaskStatus },

    #[error("Task {task_id} still holds {count} resource(s)")]
    TaskHoldsResources { task_id: TaskId, count: usize },

    #[error("Invalid task: {0}")]
    InvalidTask(String),
}

impl CoordinationError {
    /// Contention is a routine "retry later" outcome, not a fault.
    pub fn is_contention(&self) -> bool {
        matches!(self, Self::ResourceContention { .. })
    }
}

pub type CoordinationResult<T> = Result<T, CoordinationError>;
