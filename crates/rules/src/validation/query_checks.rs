//! Threshold and resource-constraint validation.

use spot_core::ResourceQuery;

use crate::schema::AlarmRule;

use super::ValidationResult;

pub(super) fn validate_filter(rule: &AlarmRule, result: &mut ValidationResult) {
    if rule.threshold().is_none() {
        result.error(
            "filter.threshold",
            format!("Threshold {} is not a finite number", rule.filter.threshold),
        );
    }
}

/// Check constraint sanity for a scheduled rule or an ad-hoc query.
///
/// `prefix` is prepended to every reported path (`"query"` for rules, `""`
/// for request parameters).
pub fn validate_query(query: &ResourceQuery, prefix: &str, result: &mut ValidationResult) {
    let path = |field: &str| {
        if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        }
    };

    if query.region.trim().is_empty() {
        result.error(path("region"), "Region must not be empty");
    }
    if query.cpu > query.max_cpu {
        result.error(
            path("max_cpu"),
            format!("max_cpu {} is below cpu {}", query.max_cpu, query.cpu),
        );
    }
    if !(query.memory.is_finite() && query.max_memory.is_finite()) || query.memory < 0.0 {
        result.error(path("memory"), "Memory bounds must be non-negative numbers");
    } else if query.memory > query.max_memory {
        result.error(
            path("max_memory"),
            format!("max_memory {} is below memory {}", query.max_memory, query.memory),
        );
    }
    if query.limit == 0 {
        result.error(path("limit"), "Limit must be at least 1");
    }
    if query.resolution == 0 {
        result.error(path("resolution"), "Resolution must be at least 1 day");
    }
    if !query.cutoff.is_finite() {
        result.error(path("cutoff"), "Cutoff must be a number");
    }
    if query.family.trim().is_empty() {
        result.warn(path("family"), "Empty family filter matches every instance type");
    }
}
