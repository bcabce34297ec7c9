//! Configuration management infrastructure
//!
//! Hierarchical configuration using figment:
//! - YAML file loading
//! - Environment variable overrides
//! - Threshold validation

pub mod loader;

pub use loader::{ConfigError, ConfigLoader};
