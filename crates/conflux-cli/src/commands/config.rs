//! Config command - View and validate Conflux configuration
//!
//! Provides the `conflux config` CLI command which:
//! 1. Shows the effective configuration (YAML or JSON)
//! 2. Validates the configuration file and reports errors

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Subcommand;
use conflux_core::config::Config;
use tracing::info;

use crate::output::{get_formatter, OutputFormat, OutputFormatter};
use crate::AppContext;

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Validate configuration file
    Validate,
}

impl ConfigCommand {
    /// Execute the config command
    pub async fn execute(&self, ctx: &AppContext) -> Result<ExitCode> {
        let formatter = get_formatter(ctx.format.is_json());
        match self {
            ConfigCommand::Show => {
                show(&ctx.config, &ctx.config_path, ctx.format, formatter.as_ref())?;
                Ok(ExitCode::SUCCESS)
            }
            ConfigCommand::Validate => {
                let valid = validate(&ctx.config_path, ctx.format, formatter.as_ref());
                Ok(if valid {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::FAILURE
                })
            }
        }
    }
}

fn show(
    config: &Config,
    path: &Path,
    format: OutputFormat,
    formatter: &dyn OutputFormatter,
) -> Result<()> {
    info!(config_path = %path.display(), "Showing configuration");

    if format.is_json() {
        let json =
            serde_json::to_value(config).context("Failed to serialize configuration to JSON")?;
        formatter.print_json(&json);
    } else {
        formatter.success(&format!("Configuration ({})", path.display()));
        formatter.info("");
        let yaml =
            serde_yaml::to_string(config).context("Failed to serialize configuration to YAML")?;
        for line in yaml.lines() {
            formatter.info(line);
        }
    }
    Ok(())
}

/// Reports on the file at `path`; returns whether it is usable
///
/// A missing file is valid: the defaults apply.
fn validate(path: &Path, format: OutputFormat, formatter: &dyn OutputFormatter) -> bool {
    let errors: Vec<String> = if !path.exists() {
        if !format.is_json() {
            formatter.info(&format!("Configuration file not found at {}", path.display()));
            formatter.info("Using default configuration.");
        }
        Vec::new()
    } else {
        match Config::load(path) {
            Ok(config) => config.validate().iter().map(ToString::to_string).collect(),
            Err(e) => vec![format!("Failed to parse configuration: {e:#}")],
        }
    };

    info!(config_path = %path.display(), errors = errors.len(), "Validated configuration");

    if format.is_json() {
        formatter.print_json(&serde_json::json!({
            "valid": errors.is_empty(),
            "config_path": path.display().to_string(),
            "errors": errors,
        }));
    } else if errors.is_empty() {
        formatter.success("Configuration is valid");
        formatter.info(&format!("File: {}", path.display()));
    } else {
        formatter.error(&format!(
            "Configuration has {} error{}:",
            errors.len(),
            if errors.len() == 1 { "" } else { "s" }
        ));
        formatter.info(&format!("File: {}", path.display()));
        for error in &errors {
            formatter.info(&format!("  {error}"));
        }
    }
    errors.is_empty()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::output::HumanFormatter;

    #[test]
    fn test_validate_missing_file_is_valid() {
        let dir = TempDir::new().unwrap();
        assert!(validate(
            &dir.path().join("config.yaml"),
            OutputFormat::Human,
            &HumanFormatter
        ));
    }

    #[test]
    fn test_validate_reports_bad_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "scan:\n  workers: 0\n").unwrap();
        assert!(!validate(&path, OutputFormat::Human, &HumanFormatter));
    }

    #[test]
    fn test_validate_reports_parse_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "scan: [not, a, map]\n").unwrap();
        assert!(!validate(&path, OutputFormat::Human, &HumanFormatter));
    }

    #[test]
    fn test_validate_accepts_good_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "scan:\n  exclude: ['.stversions', '*.tmp']\n  workers: 2\nexecution:\n  backup_dir: .conflux-backup\n",
        )
        .unwrap();
        assert!(validate(&path, OutputFormat::Human, &HumanFormatter));
    }
}
