//! Command-line interface

pub mod commands;
pub mod output;
pub mod types;

pub use types::{Cli, Commands};

/// Print a command error and exit non-zero
pub fn handle_error(err: anyhow::Error, json: bool) -> ! {
    if json {
        let output = serde_json::json!({ "error": format!("{err:#}") });
        eprintln!("{output}");
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1)
}
