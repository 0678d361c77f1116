//! Resolve command - scan a folder and settle its conflict copies
//!
//! Provides the `conflux resolve` CLI command which:
//! 1. Scans the folder and builds a plan with one recommended action per group
//! 2. Optionally asks the operator about groups left for manual review
//! 3. Prints the plan, and applies it only when `--commit` is given

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Result};
use conflux_conflict::{
    ApplyPlanUseCase, BuildPlanUseCase, ConflictError, ExecutorOptions, PlanExecutor,
    ResolveManualUseCase, ScanOptions, ScanStats,
};
use conflux_core::config::{Config, ConfigBuilder};
use conflux_core::domain::{ActionPlan, ExecutionReport};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::output::{get_formatter, print_plan, print_report};
use crate::prompt::TerminalDecider;
use crate::AppContext;

/// Arguments for the resolve subcommand
#[derive(Debug, clap::Args)]
pub struct ResolveCommand {
    /// Root of the synchronized folder
    pub path: PathBuf,

    /// Apply the plan; without this flag nothing is modified
    #[arg(long)]
    pub commit: bool,

    /// Ask about each group left for manual review
    #[arg(long)]
    pub interactive: bool,

    /// Leave groups awaiting manual review untouched and apply the rest
    #[arg(long)]
    pub skip_manual: bool,

    /// Move losing copies into this directory (relative to PATH) instead of deleting them
    #[arg(long, value_name = "DIR")]
    pub backup_dir: Option<String>,

    /// Files hashed concurrently when comparing content
    #[arg(long, value_name = "N")]
    pub workers: Option<u16>,
}

impl ResolveCommand {
    /// Execute the resolve command
    pub async fn execute(&self, ctx: &AppContext) -> Result<ExitCode> {
        let formatter = get_formatter(ctx.format.is_json());
        let config = self.effective_config(&ctx.config)?;

        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted; finishing the current entry");
                on_interrupt.cancel();
            }
        });

        info!(path = %self.path.display(), commit = self.commit, "Resolving conflicts");

        let output = BuildPlanUseCase::new(
            ScanOptions::from_config(&config),
            usize::from(config.scan.workers),
            cancel.clone(),
        )
        .execute(&self.path)
        .await?;
        let root = output.root;

        for warning in &output.stats.warnings {
            formatter.warn(&format!("{}: {}", warning.path.display(), warning.reason));
        }

        let mut plan = output.plan;
        if self.interactive && plan.has_unresolved() && !ctx.format.is_json() {
            let decider = Arc::new(TerminalDecider::new(config.prompt.diff_tool.clone()));
            plan = ResolveManualUseCase::new(decider, cancel.clone())
                .execute(&plan)
                .await?;
        }
        if self.skip_manual {
            plan = plan.without_manual();
        }

        if !ctx.format.is_json() {
            print_plan(formatter.as_ref(), &root, &plan, ctx.quiet);
        }

        // A dry run reports what it would do even with groups still in review
        let to_execute = if self.commit { plan.clone() } else { plan.without_manual() };

        let options = ExecutorOptions::new(&root)
            .with_backup_dir(config.execution.backup_dir.as_ref());
        let report = ApplyPlanUseCase::new(PlanExecutor::new(options, cancel))
            .execute(&to_execute, self.commit)
            .await;

        let report = match report {
            Ok(report) => report,
            Err(ConflictError::Execution(e)) => {
                if ctx.format.is_json() {
                    formatter.print_json(&render_json(&root, &plan, &output.stats, None));
                }
                bail!("{e}; resolve them with --interactive or leave them with --skip-manual");
            }
            Err(e) => return Err(e.into()),
        };

        if ctx.format.is_json() {
            formatter.print_json(&render_json(&root, &plan, &output.stats, Some(&report)));
        } else {
            print_report(formatter.as_ref(), &root, &report);
            if !self.commit && plan.has_unresolved() {
                formatter.info(&format!(
                    "{} group(s) await manual review; use --interactive or --skip-manual",
                    plan.unresolved().count()
                ));
            }
        }

        Ok(exit_code(&report))
    }

    /// Applies command-line overrides to the loaded configuration
    fn effective_config(&self, loaded: &Config) -> Result<Config> {
        let mut builder = ConfigBuilder::from_config(loaded.clone());
        if let Some(dir) = &self.backup_dir {
            builder = builder.execution_backup_dir(dir.clone());
        }
        if let Some(workers) = self.workers {
            builder = builder.scan_workers(workers);
        }
        builder.build_validated().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            anyhow::anyhow!("invalid configuration: {}", messages.join("; "))
        })
    }
}

/// Success unless an entry failed or was cancelled
fn exit_code(report: &ExecutionReport) -> ExitCode {
    if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// The `--json` document: plan, scan statistics and (when run) the execution report
fn render_json(
    root: &Path,
    plan: &ActionPlan,
    stats: &ScanStats,
    report: Option<&ExecutionReport>,
) -> serde_json::Value {
    serde_json::json!({
        "root": root.display().to_string(),
        "summary": plan.summary(),
        "plan": plan,
        "scan": stats,
        "execution": report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(backup_dir: Option<&str>, workers: Option<u16>) -> ResolveCommand {
        ResolveCommand {
            path: PathBuf::from("/sync"),
            commit: false,
            interactive: false,
            skip_manual: false,
            backup_dir: backup_dir.map(str::to_string),
            workers,
        }
    }

    #[test]
    fn test_flags_override_config() {
        let config = command(Some(".bak"), Some(8))
            .effective_config(&Config::default())
            .unwrap();
        assert_eq!(config.execution.backup_dir.as_deref(), Some(".bak"));
        assert_eq!(config.scan.workers, 8);
    }

    #[test]
    fn test_invalid_flags_are_rejected() {
        let err = command(Some("../outside"), None)
            .effective_config(&Config::default())
            .unwrap_err();
        assert!(err.to_string().contains("execution.backup_dir"));

        assert!(command(None, Some(0))
            .effective_config(&Config::default())
            .is_err());
    }

    #[test]
    fn test_json_document_shape() {
        let json = render_json(
            Path::new("/sync"),
            &ActionPlan::default(),
            &ScanStats::default(),
            None,
        );
        assert_eq!(json["root"], "/sync");
        assert_eq!(json["summary"]["groups"], 0);
        assert!(json["execution"].is_null());
        assert_eq!(json["scan"]["cancelled"], false);
    }
}
