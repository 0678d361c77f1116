//! Plan execution
//!
//! Applies a fully resolved plan to the filesystem, entry by entry. Nothing is
//! touched unless the caller passes `authorized = true`. Within an entry the
//! winning copy is confirmed in place before any losing copy is removed.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use conflux_core::config::normalize_backup_dir;
use conflux_core::domain::{
    Action, ActionPlan, ConflictArtifact, ExecutionReport, ExecutionResult, Outcome, PlanEntry,
};
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::ExecutionError;
use crate::namer::ConflictNamer;

/// Settings for plan execution
#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    /// Canonical scan root, used to mirror paths inside the backup directory
    pub root: PathBuf,
    /// Backup directory relative to `root`; losing copies are deleted when `None`
    pub backup_dir: Option<PathBuf>,
}

impl ExecutorOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            backup_dir: None,
        }
    }

    /// Sets the backup directory, normalized the same way the scanner sees it
    pub fn with_backup_dir(mut self, dir: Option<impl Into<PathBuf>>) -> Self {
        self.backup_dir = dir
            .map(Into::into)
            .map(|dir: PathBuf| normalize_backup_dir(&dir).unwrap_or(dir));
        self
    }

    /// Where `path` would be moved by a backup, ignoring collisions
    pub fn backup_path(&self, path: &Path) -> Option<PathBuf> {
        let dir = self.root.join(self.backup_dir.as_ref()?);
        let relative = path
            .strip_prefix(&self.root)
            .ok()
            .map(Path::to_path_buf)
            .or_else(|| path.file_name().map(PathBuf::from))?;
        Some(dir.join(relative))
    }
}

/// Applies action plans
pub struct PlanExecutor {
    options: ExecutorOptions,
    cancel: CancellationToken,
}

impl PlanExecutor {
    pub fn new(options: ExecutorOptions, cancel: CancellationToken) -> Self {
        Self { options, cancel }
    }

    /// Checks that no entry still awaits a manual decision
    pub fn validate(plan: &ActionPlan) -> Result<(), ExecutionError> {
        let unresolved: Vec<PathBuf> = plan
            .unresolved()
            .map(|e| e.original_path().to_path_buf())
            .collect();
        if unresolved.is_empty() {
            Ok(())
        } else {
            Err(ExecutionError::UnresolvedEntries(unresolved))
        }
    }

    /// Executes a plan
    ///
    /// Fails before touching anything when the plan still has unresolved
    /// entries. Otherwise every entry gets an outcome: per-entry failures do
    /// not stop the rest, and entries not yet started when cancellation is
    /// requested are reported as cancelled.
    pub async fn execute(
        &self,
        plan: &ActionPlan,
        authorized: bool,
    ) -> Result<ExecutionReport, ExecutionError> {
        self.execute_with(plan, authorized, |_| {}).await
    }

    /// Like [`execute`](Self::execute), calling `on_entry` after each outcome
    #[instrument(skip_all, fields(entries = plan.len(), authorized = authorized))]
    pub async fn execute_with<F>(
        &self,
        plan: &ActionPlan,
        authorized: bool,
        mut on_entry: F,
    ) -> Result<ExecutionReport, ExecutionError>
    where
        F: FnMut(&ExecutionResult),
    {
        Self::validate(plan)?;

        let mut report = ExecutionReport::new(authorized);
        for entry in plan {
            let outcome = if !authorized {
                Outcome::Skipped
            } else if self.cancel.is_cancelled() {
                Outcome::Cancelled
            } else {
                match self.apply(entry).await {
                    Ok(()) => {
                        info!(
                            original = %entry.original_path().display(),
                            action = %entry.action(),
                            "Applied"
                        );
                        Outcome::Applied
                    }
                    Err(reason) => {
                        warn!(
                            original = %entry.original_path().display(),
                            action = %entry.action(),
                            reason = %reason,
                            "Entry failed"
                        );
                        Outcome::Failed(reason)
                    }
                }
            };
            let result = ExecutionResult::new(
                entry.original_path().to_path_buf(),
                entry.action().clone(),
                outcome,
            );
            on_entry(&result);
            report.record(result);
        }

        info!(
            applied = report.applied,
            skipped = report.skipped,
            failed = report.failed,
            cancelled = report.cancelled,
            "Plan executed"
        );
        Ok(report)
    }

    async fn apply(&self, entry: &PlanEntry) -> Result<(), String> {
        match entry.action() {
            Action::KeepOriginal => self.keep_original(entry).await,
            Action::KeepConflict(winner) => self.keep_conflict(entry, winner).await,
            Action::KeepBoth => self.keep_both(entry).await,
            Action::ManualReview => Err("entry awaits manual review".to_string()),
        }
    }

    async fn keep_original(&self, entry: &PlanEntry) -> Result<(), String> {
        let original = entry.original_path();
        require_file(original).await?;

        let losers: Vec<&ConflictArtifact> = entry.group().artifacts().iter().collect();
        self.discard_all(&losers).await
    }

    async fn keep_conflict(&self, entry: &PlanEntry, winner: &Path) -> Result<(), String> {
        let original = entry.original_path();
        let winner_size = require_file(winner).await?;

        match fs::symlink_metadata(original).await {
            Ok(meta) if meta.is_file() => {
                if self.options.backup_dir.is_some() {
                    self.discard(original).await?;
                }
            }
            Ok(_) => return Err(format!("{} is not a regular file", original.display())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(format!("cannot stat {}: {e}", original.display())),
        }

        fs::rename(winner, original).await.map_err(|e| {
            format!(
                "cannot move {} over {}: {e}",
                winner.display(),
                original.display()
            )
        })?;

        let placed = require_file(original).await?;
        if placed != winner_size {
            return Err(format!(
                "{} has {placed} bytes after the move, expected {winner_size}",
                original.display()
            ));
        }
        debug!(original = %original.display(), "Winner in place");

        let losers: Vec<&ConflictArtifact> = entry
            .group()
            .artifacts()
            .iter()
            .filter(|a| a.conflict_path() != winner)
            .collect();
        self.discard_all(&losers).await
    }

    async fn keep_both(&self, entry: &PlanEntry) -> Result<(), String> {
        let original_name = entry
            .original_path()
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| format!("{} has no usable file name", entry.original_path().display()))?;

        let mut claimed = BTreeSet::new();
        let mut errors = Vec::new();
        for artifact in entry.group().artifacts() {
            let source = artifact.conflict_path();
            let Some(dir) = source.parent() else {
                errors.push(format!("{} has no parent directory", source.display()));
                continue;
            };

            let name = ConflictNamer::generate_unique(
                original_name,
                &artifact.timestamp(),
                artifact.device(),
                |candidate| {
                    claimed.contains(candidate)
                        || std::fs::symlink_metadata(dir.join(candidate)).is_ok()
                },
            );
            let Some(name) = name else {
                errors.push(format!("no free name for {}", source.display()));
                continue;
            };

            let target = dir.join(&name);
            match fs::rename(source, &target).await {
                Ok(()) => {
                    debug!(from = %source.display(), to = %target.display(), "Kept copy");
                    claimed.insert(name);
                }
                Err(e) => errors.push(format!("cannot rename {}: {e}", source.display())),
            }
        }
        join_errors(errors)
    }

    /// Removes or backs up every loser, attempting each independently
    async fn discard_all(&self, losers: &[&ConflictArtifact]) -> Result<(), String> {
        let mut errors = Vec::new();
        for loser in losers {
            if let Err(e) = self.discard(loser.conflict_path()).await {
                errors.push(e);
            }
        }
        join_errors(errors)
    }

    async fn discard(&self, path: &Path) -> Result<(), String> {
        match self.options.backup_path(path) {
            Some(target) => {
                let target = free_backup_path(target).await;
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent).await.map_err(|e| {
                        format!("cannot create backup directory {}: {e}", parent.display())
                    })?;
                }
                fs::rename(path, &target).await.map_err(|e| {
                    format!("cannot back up {}: {e}", path.display())
                })?;
                debug!(path = %path.display(), backup = %target.display(), "Backed up");
            }
            None => {
                fs::remove_file(path)
                    .await
                    .map_err(|e| format!("cannot remove {}: {e}", path.display()))?;
                debug!(path = %path.display(), "Removed");
            }
        }
        Ok(())
    }
}

/// Confirms `path` is a regular file and returns its size
async fn require_file(path: &Path) -> Result<u64, String> {
    match fs::symlink_metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(meta.len()),
        Ok(_) => Err(format!("{} is not a regular file", path.display())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(format!("{} no longer exists", path.display()))
        }
        Err(e) => Err(format!("cannot stat {}: {e}", path.display())),
    }
}

/// Appends `.1`, `.2`, ... until the backup target is unused
async fn free_backup_path(target: PathBuf) -> PathBuf {
    if !exists(&target).await {
        return target;
    }
    let base = target.as_os_str().to_os_string();
    let mut n = 1u32;
    loop {
        let mut candidate = base.clone();
        candidate.push(format!(".{n}"));
        let candidate = PathBuf::from(candidate);
        if !exists(&candidate).await {
            return candidate;
        }
        n += 1;
    }
}

async fn exists(path: &Path) -> bool {
    fs::symlink_metadata(path).await.is_ok()
}

fn join_errors(errors: Vec<String>) -> Result<(), String> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.join("; "))
    }
}
