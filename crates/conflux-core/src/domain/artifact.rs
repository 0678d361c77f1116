//! Conflict artifacts
//!
//! A conflict artifact is a file the synchronization tool wrote next to an
//! original when two devices changed it concurrently. [`ConflictName`] is what
//! can be learned from the path alone; [`ConflictArtifact`] adds what was found
//! on disk.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::{ConflictTimestamp, DeviceId};

/// Snapshot of a regular file's metadata at scan time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStat {
    /// Size in bytes
    pub size: u64,
    /// Last modification time (None if the platform does not report it)
    pub modified: Option<DateTime<Utc>>,
}

impl FileStat {
    /// Creates a stat snapshot
    pub fn new(size: u64, modified: Option<DateTime<Utc>>) -> Self {
        Self { size, modified }
    }
}

/// Everything the naming convention encodes about a conflict file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictName {
    conflict_path: PathBuf,
    original_path: PathBuf,
    timestamp: ConflictTimestamp,
    device: DeviceId,
    /// Number of conflict markers in the name (1 for a plain conflict copy)
    nesting: u8,
}

impl ConflictName {
    /// Creates a conflict name descriptor
    ///
    /// Fails when the conflict path and original path are the same.
    pub fn new(
        conflict_path: PathBuf,
        original_path: PathBuf,
        timestamp: ConflictTimestamp,
        device: DeviceId,
        nesting: u8,
    ) -> Result<Self, DomainError> {
        if conflict_path == original_path {
            return Err(DomainError::SamePath(conflict_path));
        }
        Ok(Self {
            conflict_path,
            original_path,
            timestamp,
            device,
            nesting: nesting.max(1),
        })
    }

    /// Path of the conflict copy
    pub fn conflict_path(&self) -> &Path {
        &self.conflict_path
    }

    /// Path of the file this copy conflicts with
    pub fn original_path(&self) -> &Path {
        &self.original_path
    }

    /// Timestamp from the outermost conflict marker
    pub fn timestamp(&self) -> ConflictTimestamp {
        self.timestamp
    }

    /// Device from the outermost conflict marker
    pub fn device(&self) -> &DeviceId {
        &self.device
    }

    /// Number of conflict markers in the name
    pub fn nesting(&self) -> u8 {
        self.nesting
    }

    /// Whether this is a conflict of a conflict copy
    pub fn is_nested(&self) -> bool {
        self.nesting > 1
    }
}

/// A conflict file found on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictArtifact {
    #[serde(flatten)]
    name: ConflictName,
    stat: FileStat,
}

impl ConflictArtifact {
    /// Binds a parsed conflict name to the metadata found on disk
    pub fn new(name: ConflictName, stat: FileStat) -> Self {
        Self { name, stat }
    }

    /// The parsed conflict name
    pub fn name(&self) -> &ConflictName {
        &self.name
    }

    pub fn conflict_path(&self) -> &Path {
        self.name.conflict_path()
    }

    pub fn original_path(&self) -> &Path {
        self.name.original_path()
    }

    pub fn timestamp(&self) -> ConflictTimestamp {
        self.name.timestamp()
    }

    pub fn device(&self) -> &DeviceId {
        self.name.device()
    }

    pub fn nesting(&self) -> u8 {
        self.name.nesting()
    }

    /// Size in bytes at scan time
    pub fn size(&self) -> u64 {
        self.stat.size
    }

    /// Modification time at scan time
    pub fn modified(&self) -> Option<DateTime<Utc>> {
        self.stat.modified
    }

    pub fn stat(&self) -> &FileStat {
        &self.stat
    }

    /// File name of the conflict copy, for display
    pub fn file_name(&self) -> String {
        self.conflict_path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}
