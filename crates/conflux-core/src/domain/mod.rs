//! Domain entities
//!
//! This module contains the core domain types for Conflux:
//! - Newtypes for validated values parsed out of conflict file names
//! - Conflict artifacts and the groups they form around an original file
//! - Actions, rules and rationales produced by the resolution engine
//! - The immutable action plan and the results of executing it
//! - Domain-specific error types

pub mod action;
pub mod artifact;
pub mod errors;
pub mod execution;
pub mod group;
pub mod newtypes;
pub mod plan;

// Re-export commonly used types
pub use action::{Action, Rationale, Rule};
pub use artifact::{ConflictArtifact, ConflictName, FileStat};
pub use errors::DomainError;
pub use execution::{ExecutionReport, ExecutionResult, Outcome};
pub use group::ConflictGroup;
pub use newtypes::{ConflictTimestamp, DeviceId};
pub use plan::{ActionPlan, PlanEntry, PlanSummary};
