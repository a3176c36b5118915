//! Tests for rule validation.

use super::*;

const VALID_RULE_YAML: &str = r#"
id: test-rule
name: Test Rule
schedule:
  cron: "*/15 * * * *"
query:
  region: cn-hangzhou
  cpu: 4
  max_cpu: 16
filter:
  threshold: 0.05
targets:
  - channel: webhook
    url: "https://hooks.example.com/alerts"
"#;

fn valid_rule() -> AlarmRule {
    serde_yaml::from_str(VALID_RULE_YAML).unwrap()
}

fn has_error(result: &ValidationResult, path: &str) -> bool {
    result.errors.iter().any(|e| e.path == path)
}

#[test]
fn valid_rule_passes() {
    let result = validate_rule(&valid_rule());
    assert!(result.valid, "unexpected errors: {}", result.error_summary());
    assert!(result.warnings.is_empty());
}

#[test]
fn schedule_forms() {
    for cron in [
        "*/15 * * * *",
        "30 */15 * * * *",
        "0 0 12 * * * 2030",
        "@daily",
        "@annually",
        "@every 5m",
        "@every 1h30m",
    ] {
        let mut rule = valid_rule();
        rule.schedule.cron = cron.to_string();
        assert!(validate_rule(&rule).valid, "{cron} should be accepted");
    }
}

#[test]
fn invalid_schedules() {
    for cron in [
        "",
        "*/15 * * *",
        "61 * * * *",
        "@fortnightly",
        "@every",
        "@every 0s",
        "@every soon",
        "@every 120",
        "@every 300000000000000d",
    ] {
        let mut rule = valid_rule();
        rule.schedule.cron = cron.to_string();
        let result = validate_rule(&rule);
        assert!(!result.valid, "{cron:?} should be rejected");
        assert!(has_error(&result, "schedule.cron"));
    }
}

#[test]
fn numeric_weekdays_count_from_sunday_zero() {
    for cron in ["0 9 * * 0", "0 9 * * 7", "0 9 * * 1-5", "0 9 * * 5-7", "0 9 * * */2"] {
        let mut rule = valid_rule();
        rule.schedule.cron = cron.to_string();
        let result = validate_rule(&rule);
        assert!(result.valid, "{cron} should be accepted");
        assert!(result.warnings.is_empty());
    }
    for cron in ["0 9 * * 8", "0 9 * * 5-1", "0 9 * * Funday"] {
        let mut rule = valid_rule();
        rule.schedule.cron = cron.to_string();
        assert!(has_error(&validate_rule(&rule), "schedule.cron"), "{cron} should be rejected");
    }
}

#[test]
fn unparsable_threshold() {
    let mut rule = valid_rule();
    rule.filter.threshold = crate::schema::ThresholdValue::Text("cheap".to_string());
    let result = validate_rule(&rule);
    assert!(has_error(&result, "filter.threshold"));
    assert!(result.error_summary().contains("'cheap'"));
}

#[test]
fn inverted_bounds() {
    let mut rule = valid_rule();
    rule.query.cpu = 32;
    rule.query.memory = 128.0;
    rule.query.limit = 0;
    let result = validate_rule(&rule);
    assert!(has_error(&result, "query.max_cpu"));
    assert!(has_error(&result, "query.max_memory"));
    assert!(has_error(&result, "query.limit"));
}

#[test]
fn ad_hoc_query_paths_have_no_prefix() {
    let query = spot_core::ResourceQuery {
        resolution: 0,
        ..Default::default()
    };
    let result = validate_resource_query(&query);
    assert!(!result.valid);
    assert!(has_error(&result, "resolution"));
    assert!(validate_resource_query(&spot_core::ResourceQuery::default()).valid);
}

#[test]
fn target_checks() {
    let mut rule = valid_rule();
    rule.targets[0].url = Some("ftp://example.com".to_string());
    rule.targets[0].method = Some("PO ST".to_string());
    rule.targets[0].body_template = Some("{% for x in %}".to_string());
    let result = validate_rule(&rule);
    assert!(has_error(&result, "targets[0].url"));
    assert!(has_error(&result, "targets[0].method"));
    assert!(has_error(&result, "targets[0].body_template"));
}

#[test]
fn dingtalk_target_needs_conversation_or_token() {
    let yaml = VALID_RULE_YAML.replace(
        "  - channel: webhook\n    url: \"https://hooks.example.com/alerts\"",
        "  - channel: dingtalk",
    );
    let result = validate_yaml(&yaml);
    assert!(has_error(&result, "targets[0]"));
}

#[test]
fn raw_token_warns() {
    let yaml = VALID_RULE_YAML.replace(
        "  - channel: webhook\n    url: \"https://hooks.example.com/alerts\"",
        "  - channel: dingtalk\n    token: 4f1d0c7e9b2a6f3e8d5c1b0a",
    );
    let result = validate_yaml(&yaml);
    assert!(result.valid);
    assert!(result.warnings.iter().any(|w| w.path == "targets[0].token"));
}

#[test]
fn no_targets_is_a_warning() {
    let mut rule = valid_rule();
    rule.targets.clear();
    let result = validate_rule(&rule);
    assert!(result.valid);
    assert!(result.warnings.iter().any(|w| w.path == "targets"));
}

#[test]
fn bad_render_template() {
    let mut rule = valid_rule();
    rule.render.template = Some("{{ unclosed".to_string());
    assert!(has_error(&validate_rule(&rule), "render.template"));
}

#[test]
fn validate_yaml_parse_error() {
    let result = validate_yaml("not: valid: yaml: {{{{");
    assert!(!result.valid);
    assert!(result.errors[0].message.contains("YAML parse error"));
}
