use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};

use crate::domain::errors::{CoordinationError, CoordinationResult};
use crate::domain::models::{Task, TaskId, TaskMetrics, TaskStatus};
use crate::services::dependency_graph::DependencyGraph;

/// Task table plus the dependency graph over it.
///
/// Both are mutated together so that the graph always describes exactly the
/// registered tasks. Every check runs before the first write; a rejected
/// registration leaves both untouched.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: HashMap<TaskId, Task>,
    graph: DependencyGraph,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task, starting its metrics clock at `now`.
    ///
    /// Forward references are rejected: every dependency must already be
    /// registered.
    pub fn register(&mut self, mut task: Task, now: DateTime<Utc>) -> CoordinationResult<()> {
        task.validate().map_err(CoordinationError::InvalidTask)?;

        if self.tasks.contains_key(&task.task_id) {
            return Err(CoordinationError::DuplicateTask(task.task_id));
        }

        if task.dependencies.contains(&task.task_id) {
            return Err(CoordinationError::DependencyCycle(vec![
                task.task_id.clone(),
                task.task_id,
            ]));
        }

        if let Some(missing) = task
            .dependencies
            .iter()
            .find(|dep| !self.tasks.contains_key(dep.as_str()))
        {
            return Err(CoordinationError::UnknownDependency {
                task_id: task.task_id.clone(),
                dependency: missing.clone(),
            });
        }

        if let Some(cycle) = self.graph.cycle_if_inserted(&task.task_id, &task.dependencies) {
            return Err(CoordinationError::DependencyCycle(cycle));
        }

        task.status = TaskStatus::Pending;
        task.metrics = TaskMetrics::started_at(now);

        self.graph
            .insert(task.task_id.clone(), task.dependencies.clone());
        self.tasks.insert(task.task_id.clone(), task);
        Ok(())
    }

    pub fn contains(&self, task_id: &str) -> bool {
        self.tasks.contains_key(task_id)
    }

    pub fn get(&self, task_id: &str) -> Option<&Task> {
        self.tasks.get(task_id)
    }

    pub fn get_mut(&mut self, task_id: &str) -> Option<&mut Task> {
        self.tasks.get_mut(task_id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn tasks_mut(&mut self) -> impl Iterator<Item = &mut Task> {
        self.tasks.values_mut()
    }

    /// Apply a status change requested from outside the coordinator.
    ///
    /// `pending -> running` starts a new attempt at `now`: time spent
    /// waiting in pending counts neither toward a stall nor toward the
    /// completion estimate. Returns the previous status.
    pub fn transition(
        &mut self,
        task_id: &str,
        status: TaskStatus,
        now: DateTime<Utc>,
    ) -> CoordinationResult<TaskStatus> {
        let task = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| CoordinationError::UnknownTask(task_id.to_string()))?;

        if task.status.is_terminal() {
            return Err(CoordinationError::TaskInTerminalState {
                task_id: task.task_id.clone(),
                status: task.status,
            });
        }

        if !task.status.is_external_transition(status) {
            return Err(CoordinationError::InvalidTransition {
                from: task.status,
                to: status,
            });
        }

        let previous = task.status;
        task.status = status;
        if previous == TaskStatus::Pending && status == TaskStatus::Running {
            task.metrics.begin_attempt(now);
        }
        Ok(previous)
    }

    /// Remove a task that has reached a terminal state.
    pub fn remove(&mut self, task_id: &str) -> CoordinationResult<Task> {
        let task = self
            .tasks
            .get(task_id)
            .ok_or_else(|| CoordinationError::UnknownTask(task_id.to_string()))?;

        if !task.is_terminal() {
            return Err(CoordinationError::InvalidTransition {
                from: task.status,
                to: TaskStatus::Completed,
            });
        }

        self.graph.remove(task_id);
        self.tasks
            .remove(task_id)
            .ok_or_else(|| CoordinationError::UnknownTask(task_id.to_string()))
    }

    pub fn topological_order(&self) -> CoordinationResult<Vec<TaskId>> {
        self.graph.topological_order()
    }

    pub fn dependency_depth(&self, task_id: &str) -> Option<u32> {
        self.graph.depth(task_id)
    }

    pub fn dependents_of(&self, task_id: &str) -> Vec<TaskId> {
        self.graph.dependents_of(task_id)
    }

    /// Number of tasks per status.
    pub fn status_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for task in self.tasks.values() {
            *counts.entry(task.status.as_str().to_string()).or_insert(0) += 1;
        }
        counts
    }
}
