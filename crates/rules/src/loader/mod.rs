//! Filesystem rule loader.
//!
//! `RULES_PATH` points at either a single YAML file or a directory that is
//! scanned recursively for `*.yml` / `*.yaml`. Rules are loaded once at
//! startup; a broken file is reported and skipped without affecting others.

mod core;
mod error;


pub use self::core::RuleLoader;
pub use self::error::{LoadResult, LoadStatus, Result, RuleError};
