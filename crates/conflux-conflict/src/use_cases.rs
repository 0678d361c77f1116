//! Conflict use cases - orchestrate scanning, deciding and executing
//!
//! These use cases wire the scanner, grouper, evidence pool, rule engine and
//! executor into the three workflows the CLI runs: build a plan, settle the
//! entries left for review, and apply the result.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use conflux_core::domain::{ActionPlan, ExecutionReport};
use conflux_core::ports::ManualDecider;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::error::ConflictError;
use crate::evidence;
use crate::executor::PlanExecutor;
use crate::grouper::ConflictGrouper;
use crate::resolver::ResolutionEngine;
use crate::scanner::{ScanOptions, ScanStats, TreeScanner};

/// A freshly built plan and what the scan saw while building it
#[derive(Debug, Clone)]
pub struct PlanOutput {
    /// Canonical scan root
    pub root: PathBuf,
    pub plan: ActionPlan,
    pub stats: ScanStats,
}

/// Scans a tree and recommends an action for every conflict group
pub struct BuildPlanUseCase {
    options: ScanOptions,
    workers: usize,
    engine: ResolutionEngine,
    cancel: CancellationToken,
}

impl BuildPlanUseCase {
    pub fn new(options: ScanOptions, workers: usize, cancel: CancellationToken) -> Self {
        Self {
            options,
            workers,
            engine: ResolutionEngine::new(),
            cancel,
        }
    }

    /// Builds the plan for `root`
    ///
    /// Read-only: the tree is walked and possibly hashed, never modified.
    #[instrument(skip_all, fields(root = %root.display()))]
    pub async fn execute(&self, root: &Path) -> Result<PlanOutput, ConflictError> {
        let scanner = TreeScanner::new(root, &self.options, self.cancel.clone())?;
        let root = scanner.root().to_path_buf();

        let (scanned, mut stats) = tokio::task::spawn_blocking(move || scanner.collect())
            .await
            .map_err(|e| ConflictError::Worker(e.to_string()))?;
        if stats.cancelled {
            return Err(ConflictError::Cancelled);
        }
        debug!(
            files = stats.files_visited,
            artifacts = stats.artifacts,
            excluded = stats.excluded,
            warnings = stats.warnings.len(),
            "Scan finished"
        );

        let groups = ConflictGrouper::group(scanned)?;
        let (evidence, unreadable) = evidence::gather(&groups, self.workers, &self.cancel).await?;
        stats.warnings.extend(unreadable);
        let plan = self.engine.plan(groups, &evidence)?;

        info!(
            groups = plan.len(),
            unresolved = plan.unresolved().count(),
            "Plan built"
        );
        Ok(PlanOutput { root, plan, stats })
    }
}

/// Asks a [`ManualDecider`] about every entry awaiting review
pub struct ResolveManualUseCase {
    decider: Arc<dyn ManualDecider>,
    cancel: CancellationToken,
}

impl ResolveManualUseCase {
    pub fn new(decider: Arc<dyn ManualDecider>, cancel: CancellationToken) -> Self {
        Self { decider, cancel }
    }

    /// Returns a new plan with the decider's choices applied
    ///
    /// Entries the decider skips stay in review. Stops asking once cancelled.
    pub async fn execute(&self, plan: &ActionPlan) -> Result<ActionPlan, ConflictError> {
        let mut overrides = BTreeMap::new();
        for entry in plan.unresolved() {
            if self.cancel.is_cancelled() {
                debug!("Manual review cancelled");
                break;
            }
            match self.decider.decide(entry.group()).await? {
                Some(action) if !action.is_manual() => {
                    info!(
                        original = %entry.original_path().display(),
                        action = %action,
                        "Manual override"
                    );
                    overrides.insert(entry.original_path().to_path_buf(), action);
                }
                _ => debug!(original = %entry.original_path().display(), "Left in review"),
            }
        }
        Ok(plan.apply_overrides(&overrides)?)
    }
}

/// Applies a resolved plan
pub struct ApplyPlanUseCase {
    executor: PlanExecutor,
}

impl ApplyPlanUseCase {
    pub fn new(executor: PlanExecutor) -> Self {
        Self { executor }
    }

    /// Executes `plan`, mutating the filesystem only when `authorized`
    pub async fn execute(
        &self,
        plan: &ActionPlan,
        authorized: bool,
    ) -> Result<ExecutionReport, ConflictError> {
        Ok(self.executor.execute(plan, authorized).await?)
    }
}
