//! Application layer: long-running drivers around the coordinator.

pub mod sweeper;

pub use sweeper::{LivenessSweeper, SweepEvent, SweepReport};
