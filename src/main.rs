//! Swarmcore CLI entry point.

use clap::Parser;

use swarmcore::cli::{commands, handle_error, Cli, Commands};
use swarmcore::infrastructure::config::ConfigLoader;
use swarmcore::infrastructure::logging::LoggerImpl;

fn main() {
    let cli = Cli::parse();

    let config = match cli.config.as_deref() {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(err) => handle_error(err, cli.json),
    };

    let _logger = match LoggerImpl::init(&config.logging) {
        Ok(logger) => logger,
        Err(err) => handle_error(err, cli.json),
    };

    let result = match &cli.command {
        Commands::Check { manifest } => {
            commands::check::execute(manifest, &config.coordination, cli.json)
        }
        Commands::Config => commands::config::execute(&config, cli.json),
    };

    if let Err(err) = result {
        handle_error(err, cli.json);
    }
}
