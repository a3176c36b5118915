//! Spot price alarm rule engine.
//!
//! This crate provides:
//! - YAML rule definitions with serde deserialization and validation
//! - Price analysis, per-rule change suppression and classification
//! - The evaluation pipeline shared by scheduled and ad-hoc queries
//! - A per-rule scheduler with one run loop per rule

pub mod analyzer;
pub mod channels;
pub mod classifier;
pub mod filter;
pub mod loader;
pub mod pipeline;
pub mod scheduler;
pub mod schema;
pub mod validation;

pub use analyzer::analyze;
pub use classifier::classify;
pub use filter::ChangeFilter;
pub use loader::{RuleError, RuleLoader};
pub use pipeline::{run_cycle, spawn_adhoc, AdHocRequest, CycleOutcome, CycleSpec, PipelineEnv};
pub use scheduler::{AlarmScheduler, RunNow};
pub use schema::AlarmRule;
