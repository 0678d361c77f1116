//! Error types for the conflict engine

use std::path::PathBuf;

use conflux_core::domain::DomainError;
use thiserror::Error;

/// Fatal errors raised before any plan is built
#[derive(Debug, Error)]
pub enum ScanError {
    /// The scan root does not exist
    #[error("scan root does not exist: {0}")]
    RootNotFound(PathBuf),

    /// The scan root exists but is not a directory
    #[error("scan root is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The scan root could not be read or resolved
    #[error("scan root is unreadable: {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The scan root lacks the synchronization tool's folder marker
    #[error("{root} is not a synchronized folder (missing {marker})")]
    MissingMarker { root: PathBuf, marker: String },

    /// An exclusion pattern failed to compile
    #[error("invalid glob pattern: {pattern}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// The backup directory does not name a folder below the scan root
    #[error("invalid backup directory {dir}: {reason}")]
    InvalidBackupDir { dir: String, reason: String },
}

/// Plan-level errors raised by the executor before it touches anything
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The plan still contains entries awaiting a manual decision
    #[error("{} plan {} awaiting manual review", .0.len(), if .0.len() == 1 { "entry is" } else { "entries are" })]
    UnresolvedEntries(Vec<PathBuf>),
}

/// Errors surfaced by the use cases
#[derive(Debug, Error)]
pub enum ConflictError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The pipeline was cancelled before a plan could be built
    #[error("operation cancelled")]
    Cancelled,

    /// A background task panicked or was aborted
    #[error("worker task failed: {0}")]
    Worker(String),

    /// Diff tool not found on the system
    #[error("diff tool not found: {0}")]
    DiffToolNotFound(String),

    /// The manual decider failed
    #[error("manual decision failed: {0}")]
    Decider(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_entries_message() {
        let err = ExecutionError::UnresolvedEntries(vec![PathBuf::from("/a")]);
        assert_eq!(err.to_string(), "1 plan entry is awaiting manual review");

        let err = ExecutionError::UnresolvedEntries(vec![PathBuf::from("/a"), PathBuf::from("/b")]);
        assert_eq!(err.to_string(), "2 plan entries are awaiting manual review");
    }

    #[test]
    fn test_scan_error_wraps_into_conflict_error() {
        let err: ConflictError = ScanError::RootNotFound(PathBuf::from("/nope")).into();
        assert_eq!(err.to_string(), "scan root does not exist: /nope");
    }
}
