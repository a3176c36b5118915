//! Integration tests that verify every example YAML rule in
//! `data/rules/examples/` deserializes and validates.

use spot_core::JudgedField;
use spot_notify::MessageFormat;
use spot_rules::loader::LoadStatus;
use spot_rules::schema::{AlarmRule, ChannelType};
use spot_rules::validation::validate_rule;
use spot_rules::RuleLoader;

/// Resolve the examples directory relative to the workspace root.
/// Integration tests run from the crate directory, so we go up two levels.
fn examples_dir() -> std::path::PathBuf {
    let manifest = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest.join("../../data/rules/examples")
}

fn load_dir() -> Vec<AlarmRule> {
    let mut loader = RuleLoader::new(examples_dir());
    let results = loader.load_all().unwrap();
    for r in &results {
        if let LoadStatus::Failed { error } = &r.status {
            panic!("Failed to load {}: {}", r.path.display(), error);
        }
    }
    loader.into_rules()
}

fn find<'a>(rules: &'a [AlarmRule], id: &str) -> &'a AlarmRule {
    rules
        .iter()
        .find(|r| r.id == id)
        .unwrap_or_else(|| panic!("rule {id} not found"))
}

#[test]
fn all_examples_load_and_validate() {
    let rules = load_dir();
    assert_eq!(rules.len(), 4);
    for rule in &rules {
        let result = validate_rule(rule);
        assert!(result.valid, "{}: {}", rule.id, result.error_summary());
    }
}

// ── hangzhou-compute.yml ────────────────────────────────────

#[test]
fn parse_hangzhou_compute_example() {
    let rules = load_dir();
    let rule = find(&rules, "hangzhou-compute");

    assert!(rule.enabled);
    assert_eq!(rule.query.region, "cn-hangzhou");
    assert_eq!(rule.query.families(), vec!["ecs.c5", "ecs.c6"]);
    assert_eq!(rule.query.limit, 20);
    assert_eq!(rule.filter.judged_by, JudgedField::PricePerCore);
    assert_eq!(rule.threshold(), Some(0.05));
    assert_eq!(rule.targets[0].channel, ChannelType::Dingtalk);
    assert_eq!(rule.targets[0].conversation.as_deref(), Some("spot-ops"));
}

// ── discount-watch.yml ──────────────────────────────────────

#[test]
fn parse_discount_watch_list() {
    let rules = load_dir();

    let discount = find(&rules, "shanghai-discount");
    assert_eq!(discount.filter.judged_by, JudgedField::Discount);
    assert_eq!(discount.threshold(), Some(3.0));
    assert_eq!(discount.targets[0].channel, ChannelType::Webhook);
    assert_eq!(discount.render.format, MessageFormat::Text);
    assert!(!discount.render.color);

    let volatility = find(&rules, "shanghai-volatility");
    assert!(!volatility.enabled);
    assert_eq!(volatility.schedule.cron, "@every 30m");
    assert_eq!(volatility.filter.judged_by, JudgedField::Volatility);
}

// ── custom-template.yml ─────────────────────────────────────

#[test]
fn parse_custom_template_example() {
    let rules = load_dir();
    let rule = find(&rules, "beijing-compact");
    assert_eq!(rule.schedule.cron, "0 0 9 * * MON-FRI");
    let template = rule.render.template.as_deref().unwrap();
    assert!(template.contains("short_type"));
}
