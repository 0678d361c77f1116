//! Conflux CLI - Command-line interface for Conflux
//!
//! Provides commands for:
//! - Building and applying a resolution plan for a synchronized folder
//! - Viewing and validating configuration
//! - Generating shell completions

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use conflux_core::config::Config;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;
mod prompt;

use commands::{
    completions::CompletionsCommand, config::ConfigCommand, resolve::ResolveCommand,
};
use output::{get_formatter, OutputFormat};

#[derive(Debug, Parser)]
#[command(
    name = "conflux",
    version,
    about = "Find and resolve sync-conflict copies in a synchronized folder"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan a folder for conflict copies and resolve them
    Resolve(ResolveCommand),
    /// View and validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Generate shell completions
    Completions(CompletionsCommand),
}

/// Settings shared by every command
pub struct AppContext {
    pub format: OutputFormat,
    pub quiet: bool,
    pub config: Config,
    pub config_path: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let formatter = get_formatter(cli.json);

    let (config, config_path) = match load_config(cli.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            formatter.error(&format!("{e:#}"));
            return ExitCode::FAILURE;
        }
    };

    // Setup tracing; RUST_LOG wins over flags and config
    let level = match (cli.verbose, cli.quiet) {
        (0, true) => "error",
        (0, false) => config.logging.level.as_str(),
        (1, _) => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let ctx = AppContext {
        format: if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        },
        quiet: cli.quiet,
        config,
        config_path,
    };

    let result = match cli.command {
        Commands::Resolve(cmd) => cmd.execute(&ctx).await,
        Commands::Config(cmd) => cmd.execute(&ctx).await,
        Commands::Completions(cmd) => cmd.execute(&ctx).await,
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            formatter.error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

/// Loads the explicit config file, or the default one when present
///
/// An explicit `--config` that cannot be read is an error; a missing
/// default file silently yields the defaults.
fn load_config(explicit: Option<&std::path::Path>) -> Result<(Config, PathBuf)> {
    match explicit {
        Some(path) => {
            let config = Config::load(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            Ok((config, path.to_path_buf()))
        }
        None => {
            let path = Config::default_path();
            Ok((Config::load_or_default(&path), path))
        }
    }
}
