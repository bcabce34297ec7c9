pub mod config;
pub mod task;

pub use config::{Config, CoordinationConfig, LogFormat, LoggingConfig, RotationPolicy};
pub use task::{AgentId, Task, TaskId, TaskMetrics, TaskPriority, TaskStatus};
