use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Main configuration structure for swarmcore
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Coordination thresholds
    #[serde(default)]
    pub coordination: CoordinationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Thresholds that drive stall detection, liveness and priority escalation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CoordinationConfig {
    /// Seconds without progress before a progress report counts as a stall
    #[serde(default = "default_stall_threshold_secs")]
    pub stall_threshold_secs: u64,

    /// Stalls absorbed by resetting to pending; the next one fails the task
    #[serde(default = "default_max_stalls")]
    pub max_stalls: u32,

    /// Expected agent heartbeat period; agents silent for 3x this are unhealthy
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,

    /// Escalate to high when slack <= this fraction of the task timeout
    #[serde(default = "default_high_slack_ratio")]
    pub high_slack_ratio: f64,

    /// Escalate to critical when slack <= this fraction of the task timeout
    #[serde(default = "default_critical_slack_ratio")]
    pub critical_slack_ratio: f64,

    /// Period of the background liveness sweep
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

const fn default_stall_threshold_secs() -> u64 {
    30
}

const fn default_max_stalls() -> u32 {
    3
}

const fn default_heartbeat_interval_secs() -> u64 {
    10
}

const fn default_high_slack_ratio() -> f64 {
    0.2
}

const fn default_critical_slack_ratio() -> f64 {
    0.1
}

const fn default_sweep_interval_secs() -> u64 {
    5
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            stall_threshold_secs: default_stall_threshold_secs(),
            max_stalls: default_max_stalls(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            high_slack_ratio: default_high_slack_ratio(),
            critical_slack_ratio: default_critical_slack_ratio(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl CoordinationConfig {
    pub fn stall_threshold(&self) -> chrono::Duration {
        secs_to_duration(self.stall_threshold_secs)
    }

    pub fn heartbeat_interval(&self) -> chrono::Duration {
        secs_to_duration(self.heartbeat_interval_secs)
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_secs)
    }
}

fn secs_to_duration(secs: u64) -> chrono::Duration {
    i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .unwrap_or(chrono::Duration::MAX)
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default)]
    pub format: LogFormat,

    /// Directory for log files (if None, logs only go to the console)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,

    /// Write logs to stderr
    #[serde(default = "default_true")]
    pub enable_console: bool,

    /// Log file rotation policy
    #[serde(default)]
    pub rotation: RotationPolicy,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    #[default]
    Daily,
    Hourly,
    Never,
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            log_dir: None,
            enable_console: true,
            rotation: RotationPolicy::default(),
        }
    }
}
