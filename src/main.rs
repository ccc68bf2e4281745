// ABOUTME: Entry point for the sectionctl CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use sectionctl::config::Config;
use sectionctl::error::{Error, Result};
use sectionctl::output::{Output, OutputMode};
use std::env;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over the flags when set
    let default_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };
    let reporter = Output::new(mode);

    let result = tokio::select! {
        result = run(cli, Output::new(mode)) => result,
        _ = tokio::signal::ctrl_c() => Err(Error::Interrupted),
    };

    // Return rather than exit: runtime shutdown waits for blocking tasks,
    // whose guards remove temp archives and checkouts.
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            reporter.error(&e.to_string());
            if matches!(e, Error::Interrupted) {
                ExitCode::from(130)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

async fn run(cli: Cli, output: Output) -> Result<()> {
    match cli.command {
        Commands::Deploy(args) => {
            let config = load_config(cli.config.as_deref())?;
            commands::deploy(args, config, cli.token, output).await
        }
        Commands::Validate { directory } => commands::validate(&directory, &output),
    }
}

fn load_config(explicit: Option<&std::path::Path>) -> Result<Config> {
    match explicit {
        Some(path) => Config::load(path),
        None => {
            let cwd = env::current_dir().map_err(Error::Io)?;
            Config::discover(&cwd)
        }
    }
}
