//! Conflux Conflict - Conflict detection and resolution
//!
//! Provides:
//! - Name-based recognition of sync-conflict copies
//! - A single-pass tree scanner with per-file failure tolerance
//! - Grouping of conflict copies by the original they diverged from
//! - An ordered rule engine that recommends an action per group
//! - A plan executor that only touches the filesystem when authorized

pub mod classifier;
pub mod diff;
pub mod error;
pub mod evidence;
pub mod executor;
pub mod grouper;
pub mod namer;
pub mod resolver;
pub mod scanner;
pub mod use_cases;

pub use classifier::PathClassifier;
pub use diff::DiffTool;
pub use error::{ConflictError, ExecutionError, ScanError};
pub use evidence::GroupEvidence;
pub use executor::{ExecutorOptions, PlanExecutor};
pub use grouper::ConflictGrouper;
pub use resolver::ResolutionEngine;
pub use scanner::{ClassifyWarning, ScanOptions, ScanStats, ScannedArtifact, TreeScanner};
pub use use_cases::{ApplyPlanUseCase, BuildPlanUseCase, PlanOutput, ResolveManualUseCase};
