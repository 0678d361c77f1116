//! The action plan
//!
//! One [`PlanEntry`] per conflict group, ordered by original path. A plan is
//! never modified in place: applying manual overrides or dropping unresolved
//! entries yields a new plan.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::action::{Action, Rationale};
use super::errors::DomainError;
use super::group::ConflictGroup;

/// A conflict group bound to the action chosen for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "EntryRecord")]
pub struct PlanEntry {
    group: ConflictGroup,
    action: Action,
    rationale: Rationale,
    /// Every conflict copy is byte-identical to the original
    duplicates: bool,
}

/// Serialized form of a [`PlanEntry`], re-validated on deserialization
#[derive(Deserialize)]
struct EntryRecord {
    group: ConflictGroup,
    action: Action,
    rationale: Rationale,
    duplicates: bool,
}

impl TryFrom<EntryRecord> for PlanEntry {
    type Error = DomainError;

    fn try_from(record: EntryRecord) -> Result<Self, Self::Error> {
        Self::new(record.group, record.action, record.rationale, record.duplicates)
    }
}

impl PlanEntry {
    /// Binds an action to a group
    ///
    /// Fails when a `KeepConflict` action names a file outside the group.
    pub fn new(
        group: ConflictGroup,
        action: Action,
        rationale: Rationale,
        duplicates: bool,
    ) -> Result<Self, DomainError> {
        if let Action::KeepConflict(winner) = &action {
            if !group.contains(winner) {
                return Err(DomainError::UnknownArtifact {
                    original: group.original_path().to_path_buf(),
                    artifact: winner.clone(),
                });
            }
        }
        Ok(Self {
            group,
            action,
            rationale,
            duplicates,
        })
    }

    pub fn group(&self) -> &ConflictGroup {
        &self.group
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    pub fn rationale(&self) -> &Rationale {
        &self.rationale
    }

    /// Whether the conflict copies are pure duplicates of the original
    pub fn is_duplicate(&self) -> bool {
        self.duplicates
    }

    pub fn original_path(&self) -> &Path {
        self.group.original_path()
    }

    /// Number of conflict copies in the group
    pub fn conflict_count(&self) -> usize {
        self.group.len()
    }

    fn overridden(&self, action: Action) -> Result<Self, DomainError> {
        Self::new(
            self.group.clone(),
            action,
            Rationale::manual_override(),
            false,
        )
    }
}

/// Counts of plan entries per action
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub groups: usize,
    pub conflicts: usize,
    pub keep_original: usize,
    pub keep_conflict: usize,
    pub keep_both: usize,
    pub manual_review: usize,
}

/// Ordered, immutable list of plan entries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PlanRecord")]
pub struct ActionPlan {
    entries: Vec<PlanEntry>,
}

#[derive(Deserialize)]
struct PlanRecord {
    entries: Vec<PlanEntry>,
}

impl From<PlanRecord> for ActionPlan {
    fn from(record: PlanRecord) -> Self {
        Self::new(record.entries)
    }
}

impl ActionPlan {
    /// Creates a plan, ordering entries lexically by original path
    pub fn new(mut entries: Vec<PlanEntry>) -> Self {
        entries.sort_by(|a, b| a.original_path().cmp(b.original_path()));
        Self { entries }
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PlanEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up the entry for an original path
    pub fn entry(&self, original_path: &Path) -> Option<&PlanEntry> {
        self.entries
            .iter()
            .find(|e| e.original_path() == original_path)
    }

    /// Entries still waiting for a manual decision
    pub fn unresolved(&self) -> impl Iterator<Item = &PlanEntry> {
        self.entries.iter().filter(|e| e.action().is_manual())
    }

    /// Whether any entry still needs a manual decision
    pub fn has_unresolved(&self) -> bool {
        self.unresolved().next().is_some()
    }

    /// Returns a new plan with operator-chosen actions applied
    ///
    /// Each key is an original path; overridden entries carry the
    /// `manual override` rationale.
    pub fn apply_overrides(
        &self,
        overrides: &BTreeMap<PathBuf, Action>,
    ) -> Result<ActionPlan, DomainError> {
        if let Some(missing) = overrides.keys().find(|path| self.entry(path).is_none()) {
            return Err(DomainError::NoSuchEntry(missing.clone()));
        }

        let entries = self
            .entries
            .iter()
            .map(|entry| match overrides.get(entry.original_path()) {
                Some(action) => entry.overridden(action.clone()),
                None => Ok(entry.clone()),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ActionPlan { entries })
    }

    /// Returns a new plan without the entries that still need review
    pub fn without_manual(&self) -> ActionPlan {
        ActionPlan {
            entries: self
                .entries
                .iter()
                .filter(|e| !e.action().is_manual())
                .cloned()
                .collect(),
        }
    }

    /// Counts entries per action
    pub fn summary(&self) -> PlanSummary {
        let mut summary = PlanSummary {
            groups: self.entries.len(),
            ..PlanSummary::default()
        };
        for entry in &self.entries {
            summary.conflicts += entry.conflict_count();
            match entry.action() {
                Action::KeepOriginal => summary.keep_original += 1,
                Action::KeepConflict(_) => summary.keep_conflict += 1,
                Action::KeepBoth => summary.keep_both += 1,
                Action::ManualReview => summary.manual_review += 1,
            }
        }
        summary
    }
}

impl<'a> IntoIterator for &'a ActionPlan {
    type Item = &'a PlanEntry;
    type IntoIter = std::slice::Iter<'a, PlanEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
