//! Ordered resolution rules
//!
//! The first applicable rule decides:
//!
//! 1. the original is gone: keep the latest copy, unless copies disagree
//! 2. every copy is byte-identical to the original: keep the original
//! 3. exactly one copy is strictly newer than the original and every sibling
//! 4. anything else is left for manual review
//!
//! Deciding is pure. Content comparisons come from [`GroupEvidence`] gathered
//! beforehand, so the same tree always yields the same plan.

use std::collections::BTreeMap;
use std::path::PathBuf;

use conflux_core::domain::{
    Action, ActionPlan, ConflictArtifact, ConflictGroup, DomainError, PlanEntry, Rationale, Rule,
};
use tracing::debug;

use crate::evidence::GroupEvidence;

/// Stateless rule engine
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolutionEngine;

impl ResolutionEngine {
    pub fn new() -> Self {
        Self
    }

    /// Recommends an action for one group
    pub fn decide(
        &self,
        group: ConflictGroup,
        evidence: &GroupEvidence,
    ) -> Result<PlanEntry, DomainError> {
        let (action, rationale, duplicates) = Self::missing_original(&group, evidence)
            .or_else(|| Self::identical_content(&group, evidence))
            .or_else(|| Self::single_newer(&group))
            .unwrap_or_else(|| Self::default_safe(&group));

        debug!(
            original = %group.original_path().display(),
            action = %action,
            rationale = %rationale,
            "Decided"
        );
        PlanEntry::new(group, action, rationale, duplicates)
    }

    /// Decides every group and assembles the plan
    ///
    /// A group with no gathered evidence is decided without content comparisons.
    pub fn plan(
        &self,
        groups: BTreeMap<PathBuf, ConflictGroup>,
        evidence: &BTreeMap<PathBuf, GroupEvidence>,
    ) -> Result<ActionPlan, DomainError> {
        let empty = GroupEvidence::default();
        let entries = groups
            .into_iter()
            .map(|(original, group)| self.decide(group, evidence.get(&original).unwrap_or(&empty)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ActionPlan::new(entries))
    }

    fn missing_original(
        group: &ConflictGroup,
        evidence: &GroupEvidence,
    ) -> Option<(Action, Rationale, bool)> {
        if group.original_exists() {
            return None;
        }

        let latest = group.latest();
        let agree = group
            .artifacts()
            .iter()
            .filter(|a| a.conflict_path() != latest.conflict_path())
            .all(|a| evidence.identical(a.conflict_path(), latest.conflict_path()));

        if agree {
            let mut detail = format!(
                "original missing; keeping latest copy from device {} ({})",
                latest.device(),
                latest.timestamp().date_label()
            );
            detail.push_str(&nesting_note(latest));
            Some((
                Action::KeepConflict(latest.conflict_path().to_path_buf()),
                Rationale::new(Rule::MissingOriginal, detail),
                false,
            ))
        } else {
            Some((
                Action::ManualReview,
                Rationale::new(
                    Rule::MissingOriginal,
                    format!("original missing; {} candidates diverge", group.len()),
                ),
                false,
            ))
        }
    }

    fn identical_content(
        group: &ConflictGroup,
        evidence: &GroupEvidence,
    ) -> Option<(Action, Rationale, bool)> {
        let original = group.original_path();
        let all_identical = group
            .artifacts()
            .iter()
            .all(|a| evidence.identical(original, a.conflict_path()));
        if !all_identical {
            return None;
        }

        let detail = match group.len() {
            1 => "conflict copy is identical to the original".to_string(),
            n => format!("all {n} conflict copies are identical to the original"),
        };
        Some((
            Action::KeepOriginal,
            Rationale::new(Rule::IdenticalContent, detail),
            true,
        ))
    }

    fn single_newer(group: &ConflictGroup) -> Option<(Action, Rationale, bool)> {
        let original_mtime = group.original()?.modified?;

        let mut newest: Option<&ConflictArtifact> = None;
        for artifact in group.artifacts() {
            let mtime = artifact.modified()?;
            match newest.and_then(|n| n.modified()) {
                Some(best) if mtime <= best => {}
                _ => newest = Some(artifact),
            }
        }
        let winner = newest?;
        let winner_mtime = winner.modified()?;
        if winner_mtime <= original_mtime {
            return None;
        }

        // Closest competitor: the original or the newest sibling
        let mut runner_up = original_mtime;
        for sibling in group.artifacts() {
            if sibling.conflict_path() == winner.conflict_path() {
                continue;
            }
            let mtime = sibling.modified()?;
            if mtime >= winner_mtime {
                return None;
            }
            runner_up = runner_up.max(mtime);
        }

        let gap = (winner_mtime - runner_up).num_seconds();
        let mut detail = format!(
            "artifact from device {} is {gap}s newer than original and all siblings",
            winner.device()
        );
        detail.push_str(&nesting_note(winner));
        Some((
            Action::KeepConflict(winner.conflict_path().to_path_buf()),
            Rationale::new(Rule::SingleNewer, detail),
            false,
        ))
    }

    fn default_safe(group: &ConflictGroup) -> (Action, Rationale, bool) {
        let detail = match group.len() {
            1 => "conflict copy differs from the original and is not provably newer".to_string(),
            n => format!("{n} conflict copies differ with no single newest copy"),
        };
        (
            Action::ManualReview,
            Rationale::new(Rule::DefaultSafe, detail),
            false,
        )
    }
}

fn nesting_note(artifact: &ConflictArtifact) -> String {
    if artifact.nesting() > 1 {
        format!(" (conflict of a conflict, {} markers)", artifact.nesting())
    } else {
        String::new()
    }
}
