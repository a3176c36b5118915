//! Schedule validation: cron expressions, descriptors and `@every` intervals.

use crate::scheduler::cron::RuleSchedule;
use crate::schema::AlarmRule;

use super::ValidationResult;

pub(super) fn validate_schedule(rule: &AlarmRule, result: &mut ValidationResult) {
    let expr = rule.schedule.cron.trim();
    if expr.is_empty() {
        result.error("schedule.cron", "Schedule must not be empty");
        return;
    }

    if let Err(e) = RuleSchedule::parse(expr) {
        result.error("schedule.cron", e);
    }
}
