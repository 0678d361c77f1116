//! Domain error types
//!
//! Errors raised when a domain value would violate one of its invariants.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Device identifier is empty or not alphanumeric
    #[error("Invalid device id: {0}")]
    InvalidDeviceId(String),

    /// Timestamp token does not describe a real date/time
    #[error("Invalid conflict timestamp: {0}")]
    InvalidTimestamp(String),

    /// A conflict artifact would point at itself as its original
    #[error("Conflict path equals original path: {0}")]
    SamePath(PathBuf),

    /// A group was built without any artifacts
    #[error("Conflict group for {0} has no artifacts")]
    EmptyGroup(PathBuf),

    /// An artifact was added to a group for a different original
    #[error("Artifact {artifact} does not belong to group {original}")]
    ForeignArtifact {
        /// The group's original path
        original: PathBuf,
        /// The offending artifact
        artifact: PathBuf,
    },

    /// An action references an artifact that is not part of its group
    #[error("Action references {artifact}, which is not a conflict of {original}")]
    UnknownArtifact {
        /// The group's original path
        original: PathBuf,
        /// The referenced conflict path
        artifact: PathBuf,
    },

    /// An override was supplied for a path that has no plan entry
    #[error("No plan entry for {0}")]
    NoSuchEntry(PathBuf),
}
