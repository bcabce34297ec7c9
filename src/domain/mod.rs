//! Domain layer for the swarmcore coordination core
//!
//! This module contains the task model, configuration model and the error
//! taxonomy shared by every coordination component.

pub mod errors;
pub mod models;

// Re-export error types for convenient access
pub use errors::{CoordinationError, CoordinationResult};
