//! Conflux Core - Domain types and configuration
//!
//! This crate contains the pieces of Conflux that perform no filesystem work:
//! - **Domain entities** - `ConflictArtifact`, `ConflictGroup`, `Action`, `ActionPlan`,
//!   `ExecutionReport`
//! - **Port definitions** - `ManualDecider`, the capability used to settle
//!   entries the resolution engine left for manual review
//! - **Configuration** - typed YAML configuration with validation and a builder
//!
//! The scanning, classification, resolution and execution logic lives in
//! `conflux-conflict`; the command-line glue lives in `conflux-cli`.

pub mod config;
pub mod domain;
pub mod ports;
