use std::path::Path;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Project-local configuration directory
pub const CONFIG_DIR: &str = ".swarmcore";

/// Prefix for environment overrides, e.g. `SWARMCORE_COORDINATION__MAX_STALLS`
pub const ENV_PREFIX: &str = "SWARMCORE_";

/// Configuration error types
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid stall_threshold_secs: {0}. Must be at least 1")]
    InvalidStallThreshold(u64),

    #[error("Invalid heartbeat_interval_secs: {0}. Must be at least 1")]
    InvalidHeartbeatInterval(u64),

    #[error("Invalid sweep_interval_secs: {0}. Must be at least 1")]
    InvalidSweepInterval(u64),

    #[error(
        "Invalid slack ratios: critical ({critical}) and high ({high}) must satisfy 0 < critical <= high <= 1"
    )]
    InvalidSlackRatios { high: f64, critical: f64 },

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration relative to the working directory.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .swarmcore/config.yaml
    /// 3. .swarmcore/local.yaml (optional local overrides)
    /// 4. Environment variables (SWARMCORE_* prefix, `__` separates sections)
    pub fn load() -> Result<Config> {
        Self::load_from_dir(".")
    }

    /// Same as [`ConfigLoader::load`] with `.swarmcore/` resolved under `root`.
    pub fn load_from_dir(root: impl AsRef<Path>) -> Result<Config> {
        let dir = root.as_ref().join(CONFIG_DIR);
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(dir.join("config.yaml")))
            .merge(Yaml::file(dir.join("local.yaml")))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let coordination = &config.coordination;

        if coordination.stall_threshold_secs == 0 {
            return Err(ConfigError::InvalidStallThreshold(0));
        }
        if coordination.heartbeat_interval_secs == 0 {
            return Err(ConfigError::InvalidHeartbeatInterval(0));
        }
        if coordination.sweep_interval_secs == 0 {
            return Err(ConfigError::InvalidSweepInterval(0));
        }

        let high = coordination.high_slack_ratio;
        let critical = coordination.critical_slack_ratio;
        let ordered = high.is_finite()
            && critical.is_finite()
            && critical > 0.0
            && critical <= high
            && high <= 1.0;
        if !ordered {
            return Err(ConfigError::InvalidSlackRatios { high, critical });
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::config::LogFormat;
    use std::fs;
    use tempfile::TempDir;

    fn project_with(config_yaml: &str, local_yaml: Option<&str>) -> TempDir {
        let root = TempDir::new().unwrap();
        let dir = root.path().join(CONFIG_DIR);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("config.yaml"), config_yaml).unwrap();
        if let Some(local) = local_yaml {
            fs::write(dir.join("local.yaml"), local).unwrap();
        }
        root
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.coordination.stall_threshold_secs, 30);
        assert_eq!(config.coordination.max_stalls, 3);
        assert_eq!(config.coordination.heartbeat_interval_secs, 10);
        assert_eq!(config.logging.level, "info");
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
coordination:
  stall_threshold_secs: 60
  max_stalls: 5
  high_slack_ratio: 0.3
logging:
  level: debug
  format: json
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.coordination.stall_threshold_secs, 60);
        assert_eq!(config.coordination.max_stalls, 5);
        assert!((config.coordination.high_slack_ratio - 0.3).abs() < f64::EPSILON);
        assert!((config.coordination.critical_slack_ratio - 0.1).abs() < f64::EPSILON);
        assert_eq!(config.coordination.heartbeat_interval_secs, 10);
        assert_eq!(config.logging.format, LogFormat::Json);

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_zero_durations() {
        let mut config = Config::default();
        config.coordination.stall_threshold_secs = 0;
        assert_eq!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidStallThreshold(0))
        );

        let mut config = Config::default();
        config.coordination.heartbeat_interval_secs = 0;
        assert_eq!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidHeartbeatInterval(0))
        );

        let mut config = Config::default();
        config.coordination.sweep_interval_secs = 0;
        assert_eq!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidSweepInterval(0))
        );
    }

    #[test]
    fn test_validate_slack_ratios() {
        let cases = [(0.1, 0.2), (0.2, 0.0), (1.5, 0.1), (f64::NAN, 0.1)];
        for (high, critical) in cases {
            let mut config = Config::default();
            config.coordination.high_slack_ratio = high;
            config.coordination.critical_slack_ratio = critical;
            assert!(
                matches!(
                    ConfigLoader::validate(&config),
                    Err(ConfigError::InvalidSlackRatios { .. })
                ),
                "high={high} critical={critical} should be rejected"
            );
        }

        let mut config = Config::default();
        config.coordination.high_slack_ratio = 0.1;
        config.coordination.critical_slack_ratio = 0.1;
        assert!(ConfigLoader::validate(&config).is_ok());
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "invalid".to_string();

        match ConfigLoader::validate(&config) {
            Err(ConfigError::InvalidLogLevel(level)) => assert_eq!(level, "invalid"),
            other => panic!("Expected InvalidLogLevel error, got {other:?}"),
        }
    }

    #[test]
    fn test_hierarchical_merging() {
        let root = project_with(
            "coordination:\n  max_stalls: 5\n  stall_threshold_secs: 45\nlogging:\n  format: json\n",
            Some("coordination:\n  max_stalls: 1\n"),
        );

        temp_env::with_vars_unset(["SWARMCORE_COORDINATION__MAX_STALLS"], || {
            let config = ConfigLoader::load_from_dir(root.path()).unwrap();
            assert_eq!(config.coordination.max_stalls, 1, "Local override should win");
            assert_eq!(config.coordination.stall_threshold_secs, 45);
            assert_eq!(config.logging.format, LogFormat::Json);
        });
    }

    #[test]
    fn test_env_override() {
        let root = project_with("coordination:\n  max_stalls: 5\n", None);

        temp_env::with_vars(
            [
                ("SWARMCORE_COORDINATION__MAX_STALLS", Some("7")),
                ("SWARMCORE_LOGGING__LEVEL", Some("debug")),
            ],
            || {
                let config = ConfigLoader::load_from_dir(root.path()).unwrap();
                assert_eq!(config.coordination.max_stalls, 7);
                assert_eq!(config.logging.level, "debug");
            },
        );
    }

    #[test]
    fn test_missing_files_fall_back_to_defaults() {
        let root = TempDir::new().unwrap();
        temp_env::with_vars_unset(
            ["SWARMCORE_COORDINATION__MAX_STALLS", "SWARMCORE_LOGGING__LEVEL"],
            || {
                let config = ConfigLoader::load_from_dir(root.path()).unwrap();
                assert_eq!(config.coordination.max_stalls, 3);
            },
        );
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let root = project_with("coordination:\n  heartbeat_interval_secs: 0\n", None);
        let path = root.path().join(CONFIG_DIR).join("config.yaml");
        assert!(ConfigLoader::load_from_file(path).is_err());
    }
}
