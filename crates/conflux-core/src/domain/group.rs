//! Conflict groups
//!
//! All conflict copies of one original file, together with what the scan
//! learned about the original itself.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::artifact::{ConflictArtifact, FileStat};
use super::errors::DomainError;

/// All conflict artifacts sharing one original path
///
/// Artifacts are kept ordered by name timestamp ascending, then by device id,
/// then by conflict path, so every consumer sees the same order for the same
/// set of files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GroupRecord")]
pub struct ConflictGroup {
    original_path: PathBuf,
    /// Stat of the original, `None` when it no longer exists
    original: Option<FileStat>,
    artifacts: Vec<ConflictArtifact>,
}

/// Serialized form of a [`ConflictGroup`], re-validated on deserialization
#[derive(Deserialize)]
struct GroupRecord {
    original_path: PathBuf,
    original: Option<FileStat>,
    artifacts: Vec<ConflictArtifact>,
}

impl TryFrom<GroupRecord> for ConflictGroup {
    type Error = DomainError;

    fn try_from(record: GroupRecord) -> Result<Self, Self::Error> {
        Self::new(record.original_path, record.original, record.artifacts)
    }
}

impl ConflictGroup {
    /// Creates a group, ordering the artifacts deterministically
    ///
    /// Fails when `artifacts` is empty or an artifact belongs to another original.
    pub fn new(
        original_path: PathBuf,
        original: Option<FileStat>,
        mut artifacts: Vec<ConflictArtifact>,
    ) -> Result<Self, DomainError> {
        if artifacts.is_empty() {
            return Err(DomainError::EmptyGroup(original_path));
        }
        if let Some(foreign) = artifacts
            .iter()
            .find(|a| a.original_path() != original_path)
        {
            return Err(DomainError::ForeignArtifact {
                original: original_path,
                artifact: foreign.conflict_path().to_path_buf(),
            });
        }

        artifacts.sort_by(|a, b| {
            a.timestamp()
                .cmp(&b.timestamp())
                .then_with(|| a.device().cmp(b.device()))
                .then_with(|| a.conflict_path().cmp(b.conflict_path()))
        });

        Ok(Self {
            original_path,
            original,
            artifacts,
        })
    }

    /// Path of the original file
    pub fn original_path(&self) -> &Path {
        &self.original_path
    }

    /// Stat of the original file, if it exists
    pub fn original(&self) -> Option<&FileStat> {
        self.original.as_ref()
    }

    /// Whether the original file existed at scan time
    pub fn original_exists(&self) -> bool {
        self.original.is_some()
    }

    /// Artifacts in timestamp order
    pub fn artifacts(&self) -> &[ConflictArtifact] {
        &self.artifacts
    }

    /// Number of conflict copies
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    /// Always false; groups are never empty
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// The artifact with the most recent name timestamp
    pub fn latest(&self) -> &ConflictArtifact {
        // Non-empty by construction
        &self.artifacts[self.artifacts.len() - 1]
    }

    /// Looks up an artifact by its conflict path
    pub fn artifact(&self, conflict_path: &Path) -> Option<&ConflictArtifact> {
        self.artifacts
            .iter()
            .find(|a| a.conflict_path() == conflict_path)
    }

    /// Whether `conflict_path` names one of this group's artifacts
    pub fn contains(&self, conflict_path: &Path) -> bool {
        self.artifact(conflict_path).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConflictName, ConflictTimestamp, DeviceId};

    fn artifact(original: &str, stamp: &str, device: &str) -> ConflictArtifact {
        let ts: ConflictTimestamp = stamp.parse().unwrap();
        let original = PathBuf::from(original);
        let conflict = original.with_file_name(format!(
            "{}.sync-conflict-{}-{}",
            original.file_name().unwrap().to_string_lossy(),
            ts,
            device
        ));
        let name = ConflictName::new(
            conflict,
            original,
            ts,
            DeviceId::new(device).unwrap(),
            1,
        )
        .unwrap();
        ConflictArtifact::new(name, FileStat::new(1, None))
    }

    #[test]
    fn test_group_rejects_empty() {
        let result = ConflictGroup::new(PathBuf::from("/r/a.txt"), None, vec![]);
        assert_eq!(result, Err(DomainError::EmptyGroup(PathBuf::from("/r/a.txt"))));
    }

    #[test]
    fn test_group_rejects_foreign_artifact() {
        let result = ConflictGroup::new(
            PathBuf::from("/r/a.txt"),
            None,
            vec![artifact("/r/b.txt", "20240101-000000", "D1")],
        );
        assert!(matches!(result, Err(DomainError::ForeignArtifact { .. })));
    }

    #[test]
    fn test_deserialize_checks_invariants() {
        let group = ConflictGroup::new(
            PathBuf::from("/r/a.txt"),
            None,
            vec![artifact("/r/a.txt", "20240101-000000", "D1")],
        )
        .unwrap();
        let json = serde_json::to_value(&group).unwrap();
        let back: ConflictGroup = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(back, group);

        let mut empty = json;
        empty["artifacts"] = serde_json::json!([]);
        let err = serde_json::from_value::<ConflictGroup>(empty).unwrap_err();
        assert!(err.to_string().contains("has no artifacts"), "{err}");
    }

    #[test]
    fn test_group_orders_by_timestamp_then_device() {
        let group = ConflictGroup::new(
            PathBuf::from("/r/a.txt"),
            None,
            vec![
                artifact("/r/a.txt", "20240301-000000", "ZZZ"),
                artifact("/r/a.txt", "20240101-000000", "BBB"),
                artifact("/r/a.txt", "20240101-000000", "AAA"),
            ],
        )
        .unwrap();

        let devices: Vec<&str> = group
            .artifacts()
            .iter()
            .map(|a| a.device().as_str())
            .collect();
        assert_eq!(devices, vec!["AAA", "BBB", "ZZZ"]);
        assert_eq!(group.latest().device().as_str(), "ZZZ");
        assert_eq!(group.len(), 3);
        assert!(!group.original_exists());
    }

    #[test]
    fn test_group_lookup() {
        let a = artifact("/r/a.txt", "20240101-000000", "D1");
        let path = a.conflict_path().to_path_buf();
        let group =
            ConflictGroup::new(PathBuf::from("/r/a.txt"), Some(FileStat::new(1, None)), vec![a])
                .unwrap();

        assert!(group.contains(&path));
        assert!(!group.contains(Path::new("/r/other")));
        assert!(group.original_exists());
    }
}
