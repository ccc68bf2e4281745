// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "sectionctl")]
#[command(about = "Deploy Node.js applications to the Section edge platform")]
#[command(version)]
pub struct Cli {
    /// Enable debug output
    #[arg(short, long, visible_alias = "debug", global = true, env = "DEBUG")]
    pub verbose: bool,

    /// Minimal output, for use in continuous integration
    #[arg(short, long, global = true, env = "SECTION_CI", conflicts_with = "json")]
    pub quiet: bool,

    /// Emit JSON lines instead of human-readable output
    #[arg(long, global = true)]
    pub json: bool,

    /// Secret token for API auth
    #[arg(long, global = true, env = "SECTION_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Config file (default: sectionctl.yml in the current directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Package the app, upload it and point the environment at it
    Deploy(DeployArgs),

    /// Check that a directory looks like a deployable Node.js app
    Validate {
        /// Directory which contains the application
        #[arg(short = 'C', long, default_value = ".")]
        directory: PathBuf,
    },
}

#[derive(Args)]
pub struct DeployArgs {
    /// Account ID to deploy the application to (default: package.json section.accountId)
    #[arg(short = 'a', long)]
    pub account_id: Option<u64>,

    /// App ID to deploy the application to (default: package.json section.appId)
    #[arg(short = 'i', long)]
    pub app_id: Option<u64>,

    /// Environment to deploy to, i.e. the branch of the config repository
    /// [default: Production]
    #[arg(short = 'e', long)]
    pub environment: Option<String>,

    /// Directory which contains the application to deploy
    #[arg(short = 'C', long, default_value = ".")]
    pub directory: PathBuf,

    /// Path of the Node.js application in the environment repository
    /// [default: nodejs]
    #[arg(long)]
    pub app_path: Option<String>,

    /// URL to upload the application to
    #[arg(long)]
    pub upload_url: Option<String>,

    /// Timeout of the upload request, e.g. "600s" or "10m"
    #[arg(long, value_parser = parse_timeout)]
    pub timeout: Option<Duration>,

    /// Keep the temporary tarball and print its path
    #[arg(long)]
    pub skip_delete: bool,

    /// Skip validation of the workload before pushing. Use with caution
    #[arg(long)]
    pub skip_validation: bool,

    /// Keep the cloned config repository and print its path
    #[arg(long)]
    pub keep_clone: bool,
}

/// Parse a human-readable duration, refusing zero like the config file does.
fn parse_timeout(value: &str) -> Result<Duration, String> {
    let timeout =
        humantime_serde::re::humantime::parse_duration(value).map_err(|e| e.to_string())?;
    if timeout.is_zero() {
        return Err("timeout must be non-zero".to_string());
    }
    Ok(timeout)
}
