//! Error types and load result structures for the rule loader.

use std::path::PathBuf;

/// Errors that can occur during rule loading and registration.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// Filesystem I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse/deserialization error.
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Rule validation error (bad schedule, threshold, constraints, duplicate IDs).
    #[error("Validation error: {0}")]
    Validation(String),

    /// A notification target could not be constructed.
    #[error("Channel error: {0}")]
    Channel(#[from] spot_notify::NotifyError),
}

/// Result alias for rule operations.
pub type Result<T> = std::result::Result<T, RuleError>;

/// Outcome of loading one rule (or one skipped file).
#[derive(Debug)]
pub struct LoadResult {
    /// Path to the file that was read.
    pub path: PathBuf,
    /// Status of the load attempt.
    pub status: LoadStatus,
}

/// Status of a single load attempt.
#[derive(Debug)]
pub enum LoadStatus {
    /// Rule was parsed.
    Loaded { rule_id: String },
    /// File was skipped (dotfile, non-YAML).
    Skipped { reason: String },
    /// Parse error or duplicate ID.
    Failed { error: String },
}
