//! Rule validation with structured errors and warnings.
//!
//! Errors block registration (the rule is skipped); warnings are advisory
//! and only logged. Checks cover the schedule, the threshold, the query
//! constraints, the notification targets and any templates.

mod query_checks;
mod schedule_checks;
mod target_checks;

use serde::{Deserialize, Serialize};

use spot_core::ResourceQuery;
use spot_notify::TemplateRenderer;

use crate::schema::AlarmRule;

// ── Result types ────────────────────────────────────────────────────

/// Overall validation outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

/// A blocking validation error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationError {
    /// Dotted location, e.g. `"query.max_cpu"`.
    pub path: String,
    pub message: String,
}

/// A non-blocking advisory warning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationResult {
    pub(crate) fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub(crate) fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(ValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    pub(crate) fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationWarning {
            path: path.into(),
            message: message.into(),
        });
    }

    /// All errors joined into one line, for logs and [`RuleError::Validation`](crate::loader::RuleError).
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| format!("{}: {}", e.path, e.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

// ── Public API ──────────────────────────────────────────────────────

/// Validate a parsed [`AlarmRule`].
pub fn validate_rule(rule: &AlarmRule) -> ValidationResult {
    let mut result = ValidationResult::new();
    if rule.id.trim().is_empty() {
        result.error("id", "Rule id must not be empty");
    }
    if rule.name.trim().is_empty() {
        result.warn("name", "Rule has no name; messages will show an empty title");
    }
    schedule_checks::validate_schedule(rule, &mut result);
    query_checks::validate_filter(rule, &mut result);
    query_checks::validate_query(&rule.query, "query", &mut result);
    target_checks::validate_targets(rule, &mut result);
    validate_render_template(rule, &mut result);
    result
}

/// Parse raw YAML and validate. Returns parse errors merged with validation errors.
pub fn validate_yaml(yaml: &str) -> ValidationResult {
    match serde_yaml::from_str::<AlarmRule>(yaml) {
        Ok(rule) => validate_rule(&rule),
        Err(e) => {
            let mut result = ValidationResult::new();
            result.error("", format!("YAML parse error: {e}"));
            result
        }
    }
}

/// Validate standalone query constraints, e.g. from ad-hoc request parameters.
pub fn validate_resource_query(query: &ResourceQuery) -> ValidationResult {
    let mut result = ValidationResult::new();
    query_checks::validate_query(query, "", &mut result);
    result
}

pub use query_checks::validate_query;

fn validate_render_template(rule: &AlarmRule, result: &mut ValidationResult) {
    if let Some(template) = &rule.render.template {
        if let Err(e) = TemplateRenderer::new().validate(template) {
            result.error("render.template", e.to_string());
        }
    }
}

#[cfg(test)]
mod tests;
