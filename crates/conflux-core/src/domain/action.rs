//! Actions and the reasons behind them
//!
//! An [`Action`] is what should happen to a conflict group; a [`Rationale`]
//! records which [`Rule`] chose it and the fact that decided it.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// What to do with a conflict group
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "artifact", rename_all = "snake_case")]
pub enum Action {
    /// Keep the original, delete every conflict copy
    KeepOriginal,
    /// Replace the original with the referenced conflict copy, delete the others
    KeepConflict(PathBuf),
    /// Keep everything: rename conflict copies to non-colliding names
    KeepBoth,
    /// No automatic decision; a person must choose before execution
    ManualReview,
}

impl Action {
    /// Whether this action still needs a human decision
    pub fn is_manual(&self) -> bool {
        matches!(self, Action::ManualReview)
    }

    /// The conflict copy that wins, for `KeepConflict`
    pub fn winner(&self) -> Option<&PathBuf> {
        match self {
            Action::KeepConflict(path) => Some(path),
            _ => None,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::KeepOriginal => write!(f, "keep_original"),
            Action::KeepConflict(path) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy())
                    .unwrap_or_else(|| path.to_string_lossy());
                write!(f, "keep_conflict({name})")
            }
            Action::KeepBoth => write!(f, "keep_both"),
            Action::ManualReview => write!(f, "manual_review"),
        }
    }
}

/// The heuristic (or person) that produced an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// Rule 1: the original no longer exists
    MissingOriginal,
    /// Rule 2: every conflict copy is identical to the original
    IdenticalContent,
    /// Rule 3: exactly one copy is newer than everything else
    SingleNewer,
    /// Rule 4: nothing else applied
    DefaultSafe,
    /// The operator chose the action
    ManualOverride,
}

impl Rule {
    /// Position in the rule list, `None` for manual overrides
    pub fn number(&self) -> Option<u8> {
        match self {
            Rule::MissingOriginal => Some(1),
            Rule::IdenticalContent => Some(2),
            Rule::SingleNewer => Some(3),
            Rule::DefaultSafe => Some(4),
            Rule::ManualOverride => None,
        }
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.number() {
            Some(n) => write!(f, "rule {n}"),
            None => write!(f, "manual override"),
        }
    }
}

/// Why an action was chosen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rationale {
    rule: Rule,
    detail: String,
}

impl Rationale {
    /// A rationale from one of the numbered rules
    pub fn new(rule: Rule, detail: impl Into<String>) -> Self {
        Self {
            rule,
            detail: detail.into(),
        }
    }

    /// The rationale carried by operator-chosen actions
    pub fn manual_override() -> Self {
        Self {
            rule: Rule::ManualOverride,
            detail: String::new(),
        }
    }

    pub fn rule(&self) -> Rule {
        self.rule
    }

    /// The deciding fact, without the rule prefix
    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl std::fmt::Display for Rationale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.detail.is_empty() {
            write!(f, "{}", self.rule)
        } else {
            write!(f, "{}: {}", self.rule, self.detail)
        }
    }
}
