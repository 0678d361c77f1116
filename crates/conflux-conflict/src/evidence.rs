//! Content evidence for the resolution rules
//!
//! Comparing bodies is the only expensive part of a decision, so it happens
//! here, ahead of the pure rule engine. Only members whose size collides with
//! another member of the same group are hashed; a unique size already proves
//! the content differs.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use conflux_core::domain::ConflictGroup;
use sha2::{Digest, Sha256};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::error::ConflictError;
use crate::scanner::ClassifyWarning;

/// SHA-256 of a file body
pub type ContentDigest = [u8; 32];

const READ_BUFFER: usize = 64 * 1024;

/// Digests gathered for the members of one group
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupEvidence {
    digests: BTreeMap<PathBuf, ContentDigest>,
}

impl GroupEvidence {
    pub fn new(digests: BTreeMap<PathBuf, ContentDigest>) -> Self {
        Self { digests }
    }

    pub fn digest(&self, path: &Path) -> Option<&ContentDigest> {
        self.digests.get(path)
    }

    /// Whether two members were proven byte-identical
    ///
    /// Members that could not be read are never identical to anything.
    pub fn identical(&self, a: &Path, b: &Path) -> bool {
        match (self.digest(a), self.digest(b)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

/// Members of `group` worth hashing: original and artifacts sharing a size
pub fn hash_candidates(group: &ConflictGroup) -> Vec<PathBuf> {
    let mut members: Vec<(PathBuf, u64)> = group
        .artifacts()
        .iter()
        .map(|a| (a.conflict_path().to_path_buf(), a.size()))
        .collect();
    if let Some(original) = group.original() {
        members.push((group.original_path().to_path_buf(), original.size));
    }

    let mut sizes: HashMap<u64, usize> = HashMap::new();
    for (_, size) in &members {
        *sizes.entry(*size).or_default() += 1;
    }

    members
        .into_iter()
        .filter(|(_, size)| sizes.get(size).copied().unwrap_or(0) > 1)
        .map(|(path, _)| path)
        .collect()
}

/// Hashes a file body
pub fn digest_file(path: &Path) -> io::Result<ContentDigest> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; READ_BUFFER];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hasher.finalize());
    Ok(digest)
}

/// Gathers evidence for every group with at most `workers` files hashed at once
///
/// Cancellation is checked before each group is scheduled and before each
/// file is read. Files that cannot be read come back as warnings; their groups
/// are decided as if the bodies differ.
#[instrument(skip_all, fields(groups = groups.len(), workers = workers))]
pub async fn gather(
    groups: &BTreeMap<PathBuf, ConflictGroup>,
    workers: usize,
    cancel: &CancellationToken,
) -> Result<(BTreeMap<PathBuf, GroupEvidence>, Vec<ClassifyWarning>), ConflictError> {
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut tasks = JoinSet::new();

    for (original, group) in groups {
        if cancel.is_cancelled() {
            tasks.abort_all();
            return Err(ConflictError::Cancelled);
        }

        for path in hash_candidates(group) {
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            let original = original.clone();
            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| ConflictError::Worker("hash pool closed".to_string()))?;
                if cancel.is_cancelled() {
                    return Err(ConflictError::Cancelled);
                }
                let target = path.clone();
                let digest = tokio::task::spawn_blocking(move || digest_file(&target))
                    .await
                    .map_err(|e| ConflictError::Worker(e.to_string()))?;
                Ok((original, path, digest))
            });
        }
    }

    let mut evidence: BTreeMap<PathBuf, GroupEvidence> = groups
        .keys()
        .map(|original| (original.clone(), GroupEvidence::default()))
        .collect();
    let mut warnings = Vec::new();

    while let Some(joined) = tasks.join_next().await {
        let (original, path, digest) =
            joined.map_err(|e| ConflictError::Worker(e.to_string()))??;
        match digest {
            Ok(digest) => {
                debug!(path = %path.display(), "Hashed");
                if let Some(group) = evidence.get_mut(&original) {
                    group.digests.insert(path, digest);
                }
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot read file for comparison");
                warnings.push(ClassifyWarning {
                    reason: format!("cannot read for comparison: {e}"),
                    path,
                });
            }
        }
    }

    if cancel.is_cancelled() {
        return Err(ConflictError::Cancelled);
    }
    warnings.sort_by(|a, b| a.path.cmp(&b.path));
    Ok((evidence, warnings))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use conflux_core::domain::{
        ConflictArtifact, ConflictName, ConflictTimestamp, DeviceId, FileStat,
    };
    use tempfile::TempDir;

    use super::*;

    fn group(dir: &Path, original: Option<&str>, artifacts: &[(&str, &str)]) -> ConflictGroup {
        let original_path = dir.join("a.txt");
        let original_stat = original.map(|body| {
            fs::write(&original_path, body).unwrap();
            FileStat::new(body.len() as u64, None)
        });
        let artifacts = artifacts
            .iter()
            .map(|(device, body)| {
                let path = dir.join(format!("a.sync-conflict-20240101-{device}.txt"));
                fs::write(&path, body).unwrap();
                let name = ConflictName::new(
                    path,
                    original_path.clone(),
                    ConflictTimestamp::parse("20240101", None).unwrap(),
                    DeviceId::new(*device).unwrap(),
                    1,
                )
                .unwrap();
                ConflictArtifact::new(name, FileStat::new(body.len() as u64, None))
            })
            .collect();
        ConflictGroup::new(original_path, original_stat, artifacts).unwrap()
    }

    #[test]
    fn test_only_size_collisions_are_candidates() {
        let dir = TempDir::new().unwrap();
        let g = group(dir.path(), Some("abc"), &[("A", "xyz"), ("B", "longer")]);
        let candidates = hash_candidates(&g);
        assert_eq!(candidates.len(), 2);
        assert!(candidates.contains(&dir.path().join("a.txt")));
        assert!(!candidates.iter().any(|p| p.to_string_lossy().contains("-B.")));
    }

    #[test]
    fn test_digest_file_matches_known_value() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("f");
        fs::write(&path, "abc").unwrap();
        let digest = digest_file(&path).unwrap();
        assert_eq!(digest[..4], [0xba, 0x78, 0x16, 0xbf]);
    }

    #[tokio::test]
    async fn test_gather_detects_identical_and_divergent() {
        let dir = TempDir::new().unwrap();
        let g = group(dir.path(), Some("same"), &[("A", "same"), ("B", "diff")]);
        let original = g.original_path().to_path_buf();
        let groups = BTreeMap::from([(original.clone(), g)]);

        let (evidence, warnings) = gather(&groups, 2, &CancellationToken::new()).await.unwrap();
        assert!(warnings.is_empty());
        let e = &evidence[&original];
        let a = dir.path().join("a.sync-conflict-20240101-A.txt");
        let b = dir.path().join("a.sync-conflict-20240101-B.txt");
        assert!(e.identical(&original, &a));
        assert!(!e.identical(&original, &b));
    }

    #[tokio::test]
    async fn test_unreadable_member_is_a_warning_and_never_identical() {
        let dir = TempDir::new().unwrap();
        let g = group(dir.path(), Some("same"), &[("A", "same")]);
        let original = g.original_path().to_path_buf();
        fs::remove_file(dir.path().join("a.sync-conflict-20240101-A.txt")).unwrap();
        let groups = BTreeMap::from([(original.clone(), g)]);

        let (evidence, warnings) = gather(&groups, 1, &CancellationToken::new()).await.unwrap();
        let a = dir.path().join("a.sync-conflict-20240101-A.txt");
        assert!(!evidence[&original].identical(&original, &a));
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].path, a);
        assert!(warnings[0].reason.contains("cannot read"));
    }

    #[tokio::test]
    async fn test_gather_honors_cancellation() {
        let dir = TempDir::new().unwrap();
        let g = group(dir.path(), Some("same"), &[("A", "same")]);
        let groups = BTreeMap::from([(g.original_path().to_path_buf(), g)]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = gather(&groups, 1, &cancel).await.unwrap_err();
        assert!(matches!(err, ConflictError::Cancelled));
    }
}
