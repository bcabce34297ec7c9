//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "swarmcore")]
#[command(about = "Swarmcore - coordination core for agent swarms", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Read configuration from this file instead of .swarmcore/
    #[arg(short, long, global = true, env = "SWARMCORE_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register a task manifest and report rejections, ordering and resource contention
    Check {
        /// YAML manifest with a top-level `tasks` list
        manifest: PathBuf,
    },

    /// Print the effective configuration
    Config,
}
