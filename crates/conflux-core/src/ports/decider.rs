//! Manual decision port
//!
//! The resolution engine never guesses when conflict copies genuinely diverge.
//! Those groups are handed to a [`ManualDecider`], which is a terminal prompt
//! in the CLI and a scripted table in tests.

use crate::domain::{Action, ConflictGroup};

/// Chooses an action for a group the engine could not decide
#[async_trait::async_trait]
pub trait ManualDecider: Send + Sync {
    /// Returns the chosen action, or `None` to leave the group in review
    ///
    /// Returning `Action::ManualReview` is treated the same as `None`.
    async fn decide(&self, group: &ConflictGroup) -> anyhow::Result<Option<Action>>;
}
