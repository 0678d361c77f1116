//! Grouping of conflict copies by original

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use conflux_core::domain::{ConflictArtifact, ConflictGroup, DomainError, FileStat};
use tracing::debug;

use crate::scanner::ScannedArtifact;

/// Aggregates scanned artifacts into one group per original path
pub struct ConflictGrouper;

impl ConflictGrouper {
    /// Groups artifacts, keyed and ordered by original path
    ///
    /// A conflict path seen twice is only kept once.
    pub fn group<I>(scanned: I) -> Result<BTreeMap<PathBuf, ConflictGroup>, DomainError>
    where
        I: IntoIterator<Item = ScannedArtifact>,
    {
        let mut seen = BTreeSet::new();
        let mut pending: BTreeMap<PathBuf, (Option<FileStat>, Vec<ConflictArtifact>)> =
            BTreeMap::new();

        for ScannedArtifact { artifact, original } in scanned {
            if !seen.insert(artifact.conflict_path().to_path_buf()) {
                debug!(path = %artifact.conflict_path().display(), "Dropping duplicate artifact");
                continue;
            }
            let slot = pending
                .entry(artifact.original_path().to_path_buf())
                .or_insert_with(|| (original, Vec::new()));
            slot.1.push(artifact);
        }

        pending
            .into_iter()
            .map(|(path, (original, artifacts))| {
                let group = ConflictGroup::new(path.clone(), original, artifacts)?;
                Ok((path, group))
            })
            .collect()
    }
}
