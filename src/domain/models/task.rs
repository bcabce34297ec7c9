//! Task domain model.
//!
//! Tasks are units of agent work tracked by the coordinator.
//! They form a DAG with dependencies and may claim named resources.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a task. Opaque to the coordinator.
pub type TaskId = String;

/// Identifier of an agent. Opaque to the coordinator.
pub type AgentId = String;

/// Status of a task in the coordination lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Registered and awaiting (re)execution
    #[default]
    Pending,
    /// Picked up by an executor
    Running,
    /// Progress went stale; held only until the recovery policy decides
    Stalled,
    /// Terminal failure
    Failed,
    /// Terminal success
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Stalled => "stalled",
            Self::Failed => "failed",
            Self::Completed => "completed",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "stalled" => Some(Self::Stalled),
            "failed" => Some(Self::Failed),
            "completed" | "complete" => Some(Self::Completed),
            _ => None,
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed | Self::Completed)
    }

    /// Check if this is an active (non-terminal) state.
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Valid transitions from this status, including policy-driven ones.
    pub fn valid_transitions(&self) -> Vec<TaskStatus> {
        match self {
            Self::Pending => vec![Self::Running, Self::Stalled],
            Self::Running => vec![Self::Stalled, Self::Completed, Self::Failed],
            Self::Stalled => vec![Self::Pending, Self::Failed],
            Self::Failed | Self::Completed => vec![],
        }
    }

    pub fn can_transition_to(&self, new_status: Self) -> bool {
        self.valid_transitions().contains(&new_status)
    }

    /// Whether callers outside the coordinator may request this transition.
    ///
    /// `Stalled` is owned by progress tracking and stall recovery; it can
    /// neither be entered nor left through an external request.
    pub fn is_external_transition(&self, new_status: Self) -> bool {
        *self != Self::Stalled && new_status != Self::Stalled && self.can_transition_to(new_status)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scheduling priority of a task.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low = 1,
    #[default]
    Normal = 2,
    High = 3,
    Critical = 4,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "normal" => Some(Self::Normal),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress bookkeeping for a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskMetrics {
    /// Start of the current attempt: registration, then every
    /// `pending -> running` transition
    pub start_time: DateTime<Utc>,
    /// Last accepted progress report (or the start of the current attempt)
    pub last_progress_time: DateTime<Utc>,
    /// Reported completion in [0, 1]
    pub progress_fraction: f64,
    /// Projected completion time; `None` while unknown
    pub estimated_completion: Option<DateTime<Utc>>,
    /// Number of stall detections so far
    pub stall_count: u32,
}

impl TaskMetrics {
    /// Fresh metrics for a task starting at `now`.
    pub fn started_at(now: DateTime<Utc>) -> Self {
        Self {
            start_time: now,
            last_progress_time: now,
            progress_fraction: 0.0,
            estimated_completion: None,
            stall_count: 0,
        }
    }

    /// Restart the attempt clock at `now`, keeping the stall count.
    pub fn begin_attempt(&mut self, now: DateTime<Utc>) {
        self.start_time = now;
        self.last_progress_time = now;
        self.estimated_completion = None;
    }
}

impl Default for TaskMetrics {
    fn default() -> Self {
        Self::started_at(Utc::now())
    }
}

/// A unit of agent work tracked by the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub task_id: TaskId,
    /// Owning agent
    pub agent_id: AgentId,
    /// Scheduling priority
    #[serde(default)]
    pub priority: TaskPriority,
    /// Current status
    #[serde(default)]
    pub status: TaskStatus,
    /// Advisory timeout in seconds, used for priority escalation only
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Task IDs this depends on
    #[serde(default)]
    pub dependencies: BTreeSet<TaskId>,
    /// Named resources the task must hold exclusively
    #[serde(default)]
    pub resources: BTreeSet<String>,
    /// Opaque payload, stored but never inspected
    #[serde(default)]
    pub content: serde_json::Value,
    /// Progress bookkeeping
    #[serde(default)]
    pub metrics: TaskMetrics,
}

const DEFAULT_TIMEOUT_SECS: u64 = 300;

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Task {
    /// Create a new pending task owned by `agent_id`.
    pub fn new(task_id: impl Into<TaskId>, agent_id: impl Into<AgentId>) -> Self {
        Self {
            task_id: task_id.into(),
            agent_id: agent_id.into(),
            priority: TaskPriority::default(),
            status: TaskStatus::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            dependencies: BTreeSet::new(),
            resources: BTreeSet::new(),
            content: serde_json::Value::Null,
            metrics: TaskMetrics::default(),
        }
    }

    /// Create a new task with a generated identifier.
    pub fn with_generated_id(agent_id: impl Into<AgentId>) -> Self {
        Self::new(Uuid::new_v4().to_string(), agent_id)
    }

    /// Add a dependency.
    pub fn with_dependency(mut self, task_id: impl Into<TaskId>) -> Self {
        self.dependencies.insert(task_id.into());
        self
    }

    /// Add several dependencies.
    pub fn with_dependencies<I, S>(mut self, task_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskId>,
    {
        self.dependencies.extend(task_ids.into_iter().map(Into::into));
        self
    }

    /// Add a required resource.
    pub fn with_resource(mut self, name: impl Into<String>) -> Self {
        self.resources.insert(name.into());
        self
    }

    /// Add several required resources.
    pub fn with_resources<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resources.extend(names.into_iter().map(Into::into));
        self
    }

    /// Set priority.
    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the advisory timeout.
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Attach an opaque payload.
    pub fn with_content(mut self, content: serde_json::Value) -> Self {
        self.content = content;
        self
    }

    /// Check if can transition to given status.
    pub fn can_transition_to(&self, new_status: TaskStatus) -> bool {
        self.status.can_transition_to(new_status)
    }

    /// Check if task is terminal.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Validate task shape before registration.
    pub fn validate(&self) -> Result<(), String> {
        if self.task_id.trim().is_empty() {
            return Err("Task id cannot be empty".to_string());
        }
        if self.agent_id.trim().is_empty() {
            return Err("Agent id cannot be empty".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("Task timeout must be at least one second".to_string());
        }
        if self.resources.iter().any(|r| r.trim().is_empty()) {
            return Err("Resource names cannot be empty".to_string());
        }
        Ok(())
    }
}
