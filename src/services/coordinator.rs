//! The coordination core's public surface.
//!
//! A [`Coordinator`] owns every table (tasks and their dependency graph,
//! resource ownership, agent heartbeats) behind its own locks. Construct one
//! per process and share it by `Arc`; every method takes `&self` and is safe
//! to call from any thread.
//!
//! Lock order is registry before ledger. The heartbeat table is independent
//! and never held together with the others.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::domain::errors::{CoordinationError, CoordinationResult};
use crate::domain::models::{
    AgentId, CoordinationConfig, Task, TaskId, TaskMetrics, TaskPriority, TaskStatus,
};
use crate::services::heartbeat_monitor::HeartbeatMonitor;
use crate::services::priority_adjuster::PriorityAdjuster;
use crate::services::progress_tracker::{ProgressOutcome, ProgressTracker};
use crate::services::resource_ledger::ResourceLedger;
use crate::services::stall_recovery::{RecoveryAction, StallRecoveryPolicy};
use crate::services::task_registry::TaskRegistry;

/// Point-in-time summary of the coordinator's tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoordinatorSnapshot {
    pub tasks_by_status: BTreeMap<String, usize>,
    pub owned_resources: BTreeMap<String, TaskId>,
    pub tracked_agents: usize,
}

/// Task and resource coordinator shared by agents and the orchestrator.
#[derive(Debug)]
pub struct Coordinator {
    config: CoordinationConfig,
    registry: RwLock<TaskRegistry>,
    ledger: Mutex<ResourceLedger>,
    heartbeats: RwLock<HeartbeatMonitor>,
    progress: ProgressTracker,
    recovery: StallRecoveryPolicy,
    priority: PriorityAdjuster,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new(CoordinationConfig::default())
    }
}

impl Coordinator {
    pub fn new(config: CoordinationConfig) -> Self {
        Self {
            registry: RwLock::new(TaskRegistry::new()),
            ledger: Mutex::new(ResourceLedger::new()),
            heartbeats: RwLock::new(HeartbeatMonitor::from_config(&config)),
            progress: ProgressTracker::from_config(&config),
            recovery: StallRecoveryPolicy::from_config(&config),
            priority: PriorityAdjuster::from_config(&config),
            config,
        }
    }

    pub fn config(&self) -> &CoordinationConfig {
        &self.config
    }

    // ---------------------------------------------------------------------
    // Task registry
    // ---------------------------------------------------------------------

    /// Register a task. Returns `false` on a duplicate id, an unregistered
    /// dependency, a dependency cycle or a malformed task; nothing changes
    /// in that case.
    pub fn register_task(&self, task: Task) -> bool {
        self.register_task_at(task, Utc::now())
    }

    pub fn register_task_at(&self, task: Task, now: DateTime<Utc>) -> bool {
        self.try_register_task_at(task, now).is_ok()
    }

    pub fn try_register_task(&self, task: Task) -> CoordinationResult<()> {
        self.try_register_task_at(task, Utc::now())
    }

    pub fn try_register_task_at(&self, task: Task, now: DateTime<Utc>) -> CoordinationResult<()> {
        let task_id = task.task_id.clone();
        let agent_id = task.agent_id.clone();
        let dependency_count = task.dependencies.len();

        let result = self.write_registry().register(task, now);
        match &result {
            Ok(()) => info!(
                task_id = %task_id,
                agent_id = %agent_id,
                dependencies = dependency_count,
                "Task registered"
            ),
            Err(e) => warn!(task_id = %task_id, error = %e, "Task registration rejected"),
        }
        result
    }

    /// Point-in-time copy of a task.
    pub fn get_task(&self, task_id: &str) -> Option<Task> {
        self.read_registry().get(task_id).cloned()
    }

    /// Copies of every registered task, ordered by id.
    pub fn list_tasks(&self) -> Vec<Task> {
        let mut tasks: Vec<Task> = self.read_registry().tasks().cloned().collect();
        tasks.sort_by(|a, b| a.task_id.cmp(&b.task_id));
        tasks
    }

    /// Apply an externally decided status change (`pending -> running`,
    /// `running -> completed | failed`).
    ///
    /// Starting a task restarts its stall clock and completion estimate.
    /// Resources are not released on terminal transitions; the caller must
    /// call [`Coordinator::release_resources`].
    pub fn update_task_status(&self, task_id: &str, status: TaskStatus) -> bool {
        self.update_task_status_at(task_id, status, Utc::now())
    }

    pub fn update_task_status_at(&self, task_id: &str, status: TaskStatus, now: DateTime<Utc>) -> bool {
        self.try_update_task_status_at(task_id, status, now).is_ok()
    }

    pub fn try_update_task_status(
        &self,
        task_id: &str,
        status: TaskStatus,
    ) -> CoordinationResult<TaskStatus> {
        self.try_update_task_status_at(task_id, status, Utc::now())
    }

    pub fn try_update_task_status_at(
        &self,
        task_id: &str,
        status: TaskStatus,
        now: DateTime<Utc>,
    ) -> CoordinationResult<TaskStatus> {
        let result = self.write_registry().transition(task_id, status, now);
        match &result {
            Ok(previous) => info!(
                task_id = %task_id,
                from = %previous,
                to = %status,
                "Task status updated"
            ),
            Err(e) => warn!(task_id = %task_id, to = %status, error = %e, "Status update rejected"),
        }
        result
    }

    /// Destroy a terminal task that holds no resources.
    pub fn remove_task(&self, task_id: &str) -> Option<Task> {
        self.try_remove_task(task_id).ok()
    }

    pub fn try_remove_task(&self, task_id: &str) -> CoordinationResult<Task> {
        let mut registry = self.write_registry();
        let ledger = self.lock_ledger();

        if ledger.holds_any(task_id) {
            let count = ledger.held_by(task_id).len();
            warn!(task_id = %task_id, held = count, "Refusing to remove task holding resources");
            return Err(CoordinationError::TaskHoldsResources {
                task_id: task_id.to_string(),
                count,
            });
        }

        let result = registry.remove(task_id);
        match &result {
            Ok(task) => info!(task_id = %task_id, status = %task.status, "Task removed"),
            Err(e) => debug!(task_id = %task_id, error = %e, "Task removal rejected"),
        }
        result
    }

    /// Registered ids with dependencies ahead of their dependents.
    pub fn topological_order(&self) -> CoordinationResult<Vec<TaskId>> {
        self.read_registry().topological_order()
    }

    pub fn dependency_depth(&self, task_id: &str) -> Option<u32> {
        self.read_registry().dependency_depth(task_id)
    }

    pub fn dependents_of(&self, task_id: &str) -> Vec<TaskId> {
        self.read_registry().dependents_of(task_id)
    }

    // ---------------------------------------------------------------------
    // Resource ledger
    // ---------------------------------------------------------------------

    /// Claim all of the task's resources at once, or none.
    ///
    /// Never waits: `false` on contention means "retry later".
    pub fn acquire_resources(&self, task_id: &str) -> bool {
        self.try_acquire_resources(task_id).is_ok()
    }

    pub fn try_acquire_resources(&self, task_id: &str) -> CoordinationResult<Vec<String>> {
        let registry = self.read_registry();
        let Some(task) = registry.get(task_id) else {
            debug!(task_id = %task_id, "Resource acquisition for unknown task");
            return Err(CoordinationError::UnknownTask(task_id.to_string()));
        };

        if task.is_terminal() {
            return Err(CoordinationError::TaskInTerminalState {
                task_id: task_id.to_string(),
                status: task.status,
            });
        }

        let result = self.lock_ledger().try_acquire(task_id, &task.resources);
        match &result {
            Ok(claimed) => debug!(
                task_id = %task_id,
                claimed = ?claimed,
                "Resources acquired"
            ),
            Err(e) => debug!(task_id = %task_id, reason = %e, "Resources unavailable"),
        }
        result
    }

    /// Release everything the task holds. Idempotent.
    pub fn release_resources(&self, task_id: &str) {
        let released = self.lock_ledger().release(task_id);
        if !released.is_empty() {
            debug!(task_id = %task_id, released = ?released, "Resources released");
        }
    }

    pub fn resource_owner(&self, resource: &str) -> Option<TaskId> {
        self.lock_ledger().owner_of(resource).cloned()
    }

    pub fn held_resources(&self, task_id: &str) -> BTreeSet<String> {
        self.lock_ledger().held_by(task_id)
    }

    // ---------------------------------------------------------------------
    // Progress tracking and stall recovery
    // ---------------------------------------------------------------------

    /// Report progress for a task. Returns `false` for an unknown task or a
    /// non-finite fraction.
    ///
    /// A report arriving after the stall threshold is a stall detection: the
    /// fraction is discarded and the recovery policy decides between another
    /// attempt and failure.
    pub fn update_task_progress(&self, task_id: &str, fraction: f64) -> bool {
        self.update_task_progress_at(task_id, fraction, Utc::now())
    }

    pub fn update_task_progress_at(&self, task_id: &str, fraction: f64, now: DateTime<Utc>) -> bool {
        let mut registry = self.write_registry();
        let Some(task) = registry.get_mut(task_id) else {
            debug!(task_id = %task_id, "Progress report for unknown task");
            return false;
        };

        match self.progress.record(task, fraction, now) {
            Ok(ProgressOutcome::Recorded {
                estimated_completion,
            }) => {
                debug!(
                    task_id = %task_id,
                    fraction = task.metrics.progress_fraction,
                    estimated_completion = ?estimated_completion,
                    "Progress recorded"
                );
                true
            }
            Ok(ProgressOutcome::Stalled { silent_for }) => {
                warn!(
                    task_id = %task_id,
                    silent_secs = silent_for.num_seconds(),
                    stall_count = task.metrics.stall_count,
                    "Task stalled"
                );
                self.recover(task, now);
                true
            }
            Ok(ProgressOutcome::Frozen) => {
                debug!(task_id = %task_id, status = %task.status, "Ignoring progress for terminal task");
                true
            }
            Err(e) => {
                warn!(task_id = %task_id, error = %e, "Progress report rejected");
                false
            }
        }
    }

    /// Copy of a task's progress metrics.
    pub fn get_task_metrics(&self, task_id: &str) -> Option<TaskMetrics> {
        self.read_registry()
            .get(task_id)
            .map(|task| task.metrics.clone())
    }

    /// Treat running tasks that have gone quiet past the stall threshold as
    /// stalled, without waiting for their next report.
    ///
    /// Meant to be driven by an external timer. Returns the affected ids.
    pub fn sweep_stalled_tasks(&self) -> Vec<TaskId> {
        self.sweep_stalled_tasks_at(Utc::now())
    }

    pub fn sweep_stalled_tasks_at(&self, now: DateTime<Utc>) -> Vec<TaskId> {
        let mut registry = self.write_registry();
        let mut stalled = Vec::new();

        for task in registry.tasks_mut() {
            if task.status != TaskStatus::Running || !self.progress.is_stale(task, now) {
                continue;
            }
            self.progress.mark_stalled(task);
            warn!(
                task_id = %task.task_id,
                stall_count = task.metrics.stall_count,
                "Task stalled without reporting progress"
            );
            self.recover(task, now);
            stalled.push(task.task_id.clone());
        }

        stalled.sort();
        stalled
    }

    fn recover(&self, task: &mut Task, now: DateTime<Utc>) {
        match self.recovery.on_stall(task, now) {
            RecoveryAction::Retry { stall_count } => info!(
                task_id = %task.task_id,
                stall_count,
                max_stalls = self.recovery.max_stalls(),
                "Stalled task reset to pending"
            ),
            RecoveryAction::Fail { stall_count } => error!(
                task_id = %task.task_id,
                stall_count,
                max_stalls = self.recovery.max_stalls(),
                "Stall budget exhausted, task failed"
            ),
            RecoveryAction::NotStalled => {}
        }
    }

    // ---------------------------------------------------------------------
    // Priority escalation
    // ---------------------------------------------------------------------

    /// Escalate a task's priority as its projected finish approaches its
    /// timeout. Returns `None` for an unknown task.
    pub fn adjust_task_priority(&self, task_id: &str) -> Option<TaskPriority> {
        self.adjust_task_priority_at(task_id, Utc::now())
    }

    pub fn adjust_task_priority_at(&self, task_id: &str, now: DateTime<Utc>) -> Option<TaskPriority> {
        let mut registry = self.write_registry();
        let task = registry.get_mut(task_id)?;

        let previous = task.priority;
        let priority = self.priority.adjust(task, now);
        if priority != previous {
            info!(
                task_id = %task_id,
                from = %previous,
                to = %priority,
                "Task priority escalated"
            );
        }
        Some(priority)
    }

    // ---------------------------------------------------------------------
    // Agent liveness
    // ---------------------------------------------------------------------

    /// Record that an agent is alive.
    ///
    /// Agents stay tracked until [`Coordinator::remove_agent`]; dropping
    /// departed agents is up to the caller.
    pub fn update_heartbeat(&self, agent_id: &str) {
        self.update_heartbeat_at(agent_id, Utc::now());
    }

    pub fn update_heartbeat_at(&self, agent_id: &str, now: DateTime<Utc>) {
        if self.write_heartbeats().record(agent_id, now).is_none() {
            debug!(agent_id = %agent_id, "First heartbeat from agent");
        }
    }

    /// Agents with no heartbeat for three heartbeat intervals.
    ///
    /// Observational only; remediation is up to the caller.
    pub fn check_agent_health(&self) -> BTreeSet<AgentId> {
        self.check_agent_health_at(Utc::now())
    }

    pub fn check_agent_health_at(&self, now: DateTime<Utc>) -> BTreeSet<AgentId> {
        let unhealthy = self.read_heartbeats().unhealthy_at(now);
        for agent_id in &unhealthy {
            warn!(agent_id = %agent_id, "Agent missed heartbeats");
        }
        unhealthy
    }

    pub fn last_seen(&self, agent_id: &str) -> Option<DateTime<Utc>> {
        self.read_heartbeats().last_seen(agent_id)
    }

    /// Stop tracking an agent.
    pub fn remove_agent(&self, agent_id: &str) -> bool {
        self.write_heartbeats().remove(agent_id)
    }

    // ---------------------------------------------------------------------
    // Introspection
    // ---------------------------------------------------------------------

    pub fn snapshot(&self) -> CoordinatorSnapshot {
        let (tasks_by_status, owned_resources) = {
            let registry = self.read_registry();
            let ledger = self.lock_ledger();
            (registry.status_counts(), ledger.ownership())
        };

        CoordinatorSnapshot {
            tasks_by_status,
            owned_resources,
            tracked_agents: self.read_heartbeats().len(),
        }
    }

    // Poisoning only means another caller panicked mid-operation; every
    // mutation validates before writing, so the tables are still consistent.

    fn read_registry(&self) -> RwLockReadGuard<'_, TaskRegistry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_registry(&self) -> RwLockWriteGuard<'_, TaskRegistry> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_ledger(&self) -> MutexGuard<'_, ResourceLedger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_heartbeats(&self) -> RwLockReadGuard<'_, HeartbeatMonitor> {
        self.heartbeats.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_heartbeats(&self) -> RwLockWriteGuard<'_, HeartbeatMonitor> {
        self.heartbeats.write().unwrap_or_else(PoisonError::into_inner)
    }
}
