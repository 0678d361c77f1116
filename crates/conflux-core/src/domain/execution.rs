//! Execution results
//!
//! What happened to each plan entry when the plan was executed.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::action::Action;

/// Outcome of executing a single plan entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum Outcome {
    /// All filesystem changes for the entry were made
    Applied,
    /// Nothing was done because execution was not authorized
    Skipped,
    /// A filesystem change failed; later entries were still attempted
    Failed(String),
    /// Execution was cancelled before this entry started
    Cancelled,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Applied => write!(f, "applied"),
            Outcome::Skipped => write!(f, "skipped"),
            Outcome::Failed(reason) => write!(f, "failed: {reason}"),
            Outcome::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Per-entry execution outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    original_path: PathBuf,
    action: Action,
    outcome: Outcome,
}

impl ExecutionResult {
    pub fn new(original_path: PathBuf, action: Action, outcome: Outcome) -> Self {
        Self {
            original_path,
            action,
            outcome,
        }
    }

    pub fn original_path(&self) -> &Path {
        &self.original_path
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }
}

/// Result of executing a whole plan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub authorized: bool,
    pub applied: u32,
    pub skipped: u32,
    pub failed: u32,
    pub cancelled: u32,
    pub results: Vec<ExecutionResult>,
}

impl ExecutionReport {
    /// Creates an empty report
    pub fn new(authorized: bool) -> Self {
        Self {
            authorized,
            ..Self::default()
        }
    }

    /// Records one entry's outcome
    pub fn record(&mut self, result: ExecutionResult) {
        match result.outcome() {
            Outcome::Applied => self.applied += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Failed(_) => self.failed += 1,
            Outcome::Cancelled => self.cancelled += 1,
        }
        self.results.push(result);
    }

    /// True when no entry failed or was cancelled
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.cancelled == 0
    }

    /// Entries that failed, with their reasons
    pub fn failures(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.results.iter().filter_map(|r| match r.outcome() {
            Outcome::Failed(reason) => Some((r.original_path(), reason.as_str())),
            _ => None,
        })
    }
}
