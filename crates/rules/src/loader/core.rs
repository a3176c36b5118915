//! Core [`RuleLoader`] struct: reads alarm rules from a file or directory.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::schema::AlarmRule;

use super::error::{LoadResult, LoadStatus, Result, RuleError};

/// Filesystem-backed rule loader.
///
/// Rules are kept in load order: files are visited in sorted path order and
/// list files keep their list order. Rule IDs must be unique across the
/// whole path; a later duplicate is rejected.
pub struct RuleLoader {
    /// Rule file or root directory.
    path: PathBuf,
    rules: Vec<AlarmRule>,
}

impl RuleLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            rules: Vec::new(),
        }
    }

    /// Load every rule under the configured path, replacing any previous set.
    ///
    /// A missing path yields no rules and a warning. Parse errors are
    /// reported per file but do not abort the scan.
    pub fn load_all(&mut self) -> Result<Vec<LoadResult>> {
        self.rules.clear();
        let mut results = Vec::new();

        if !self.path.exists() {
            warn!(path = %self.path.display(), "rules path does not exist");
            return Ok(results);
        }

        let files = if self.path.is_dir() {
            let mut files = Vec::new();
            collect_files(&self.path, &mut files, &mut results)?;
            files.sort();
            files
        } else {
            vec![self.path.clone()]
        };

        let mut seen = HashSet::new();
        for path in files {
            match load_file(&path) {
                Ok(rules) => {
                    for rule in rules {
                        if !seen.insert(rule.id.clone()) {
                            warn!(rule_id = %rule.id, path = %path.display(), "duplicate rule id; skipping");
                            results.push(LoadResult {
                                path: path.clone(),
                                status: LoadStatus::Failed {
                                    error: format!("duplicate rule id '{}'", rule.id),
                                },
                            });
                            continue;
                        }
                        info!(rule_id = %rule.id, path = %path.display(), "loaded rule");
                        results.push(LoadResult {
                            path: path.clone(),
                            status: LoadStatus::Loaded {
                                rule_id: rule.id.clone(),
                            },
                        });
                        self.rules.push(rule);
                    }
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load rule file");
                    results.push(LoadResult {
                        path,
                        status: LoadStatus::Failed {
                            error: e.to_string(),
                        },
                    });
                }
            }
        }

        Ok(results)
    }

    /// Get the configured rules path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rules from the last [`load_all`](Self::load_all).
    pub fn rules(&self) -> &[AlarmRule] {
        &self.rules
    }

    pub fn into_rules(self) -> Vec<AlarmRule> {
        self.rules
    }
}

/// Recursively collect YAML files, recording skipped entries.
fn collect_files(dir: &Path, files: &mut Vec<PathBuf>, results: &mut Vec<LoadResult>) -> Result<()> {
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "failed to read directory");
            return Ok(());
        }
    };

    for entry in entries {
        let entry = entry?;
        let path = entry.path();

        // Skip dotfiles/dotdirs
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if name.starts_with('.') {
                if path.is_file() {
                    results.push(LoadResult {
                        path,
                        status: LoadStatus::Skipped {
                            reason: "dotfile".to_string(),
                        },
                    });
                }
                continue;
            }
        }

        if path.is_dir() {
            collect_files(&path, files, results)?;
            continue;
        }

        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e == "yml" || e == "yaml")
            .unwrap_or(false);

        if is_yaml {
            files.push(path);
        } else {
            results.push(LoadResult {
                path,
                status: LoadStatus::Skipped {
                    reason: "not a YAML file".to_string(),
                },
            });
        }
    }

    Ok(())
}

/// Parse one YAML file holding a single rule or a list of rules.
pub(crate) fn load_file(path: &Path) -> Result<Vec<AlarmRule>> {
    let contents = fs::read_to_string(path)?;
    parse_rules(&contents)
}

/// Parse YAML text holding a single rule or a list of rules.
pub(crate) fn parse_rules(contents: &str) -> Result<Vec<AlarmRule>> {
    let value: serde_yaml::Value = serde_yaml::from_str(contents)?;
    let rules = match value {
        serde_yaml::Value::Sequence(items) => items
            .into_iter()
            .map(serde_yaml::from_value)
            .collect::<std::result::Result<Vec<AlarmRule>, _>>()?,
        serde_yaml::Value::Null => Vec::new(),
        other => vec![serde_yaml::from_value(other)?],
    };

    if let Some(rule) = rules.iter().find(|r| r.id.trim().is_empty()) {
        return Err(RuleError::Validation(format!(
            "rule '{}' has an empty id",
            rule.name
        )));
    }
    Ok(rules)
}
