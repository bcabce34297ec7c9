//! Swarmcore - coordination core for agent swarms
//!
//! Tracks tasks as a dependency DAG, grants exclusive named resources
//! all-or-nothing, detects stalled tasks and silent agents, and escalates
//! priority as deadlines approach. Scheduling and execution stay with the
//! caller.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): Task model, configuration and errors
//! - **Service Layer** (`services`): The table-level services and the [`Coordinator`] that owns them
//! - **Application Layer** (`application`): Background liveness sweeper
//! - **Infrastructure Layer** (`infrastructure`): Config loading and logging setup
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```
//! use swarmcore::{Coordinator, Task};
//!
//! let coordinator = Coordinator::default();
//! assert!(coordinator.register_task(Task::new("fetch", "agent-1").with_resource("net")));
//! assert!(coordinator.register_task(Task::new("parse", "agent-2").with_dependency("fetch")));
//!
//! assert!(coordinator.acquire_resources("fetch"));
//! coordinator.release_resources("fetch");
//! ```

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::{LivenessSweeper, SweepEvent, SweepReport};
pub use domain::models::{
    AgentId, Config, CoordinationConfig, LoggingConfig, Task, TaskId, TaskMetrics, TaskPriority,
    TaskStatus,
};
pub use domain::{CoordinationError, CoordinationResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{Coordinator, CoordinatorSnapshot};
