//! Server startup: rule loading, pipeline wiring and scheduler registration.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{error, info, warn};

use spot_core::Config;
use spot_pricing::{AliyunPriceSource, PriceSource};
use spot_rules::loader::LoadStatus;
use spot_rules::validation::validate_rule;
use spot_rules::{AlarmRule, AlarmScheduler, PipelineEnv, RuleLoader};

use crate::state::AppState;

/// Load every rule under the configured rules path, logging per-file results.
pub fn load_rules(config: &Config) -> anyhow::Result<Vec<AlarmRule>> {
    let mut loader = RuleLoader::new(&config.alarm.rules_path);
    let results = loader
        .load_all()
        .with_context(|| format!("loading rules from {}", config.alarm.rules_path.display()))?;

    for result in &results {
        match &result.status {
            LoadStatus::Loaded { rule_id } => {
                info!(path = %result.path.display(), rule_id = %rule_id, "rule loaded")
            }
            LoadStatus::Skipped { reason } => {
                info!(path = %result.path.display(), reason = %reason, "rule file skipped")
            }
            LoadStatus::Failed { error } => {
                error!(path = %result.path.display(), error = %error, "rule file failed to load")
            }
        }
    }
    Ok(loader.into_rules())
}

/// Build the Aliyun-backed price source from config.
pub fn price_source(config: &Config) -> anyhow::Result<Arc<dyn PriceSource>> {
    let source = AliyunPriceSource::from_config(&config.aliyun)
        .context("Aliyun price source is not usable")?
        .with_concurrency(config.alarm.fetch_concurrency);
    Ok(Arc::new(source))
}

/// Wire the pipeline, register every rule, and return the shared state.
///
/// The scheduler is registered but not started.
pub fn build_app_state(
    config: Config,
    source: Arc<dyn PriceSource>,
    rules: Vec<AlarmRule>,
) -> Arc<AppState> {
    let env = PipelineEnv::new(source)
        .with_call_timeout(Duration::from_secs(config.alarm.cycle_timeout_secs))
        .with_filter_ttl(Duration::from_secs(config.alarm.filter_ttl_hours.saturating_mul(3600)));

    let mut scheduler = AlarmScheduler::new(Arc::new(env));
    scheduler.register_all(rules, &config.dingtalk);
    for skipped in scheduler.skipped() {
        warn!(rule_id = %skipped.id, reason = %skipped.reason, "rule not scheduled");
    }

    Arc::new(AppState::new(config, Arc::new(scheduler)))
}

/// Validate the rule set without serving. Fails if any enabled rule is invalid.
pub fn check_rules(config: &Config) -> anyhow::Result<()> {
    let rules = load_rules(config)?;
    let mut invalid = 0usize;

    for rule in &rules {
        let result = validate_rule(rule);
        for warning in &result.warnings {
            println!("  warn   {} {}: {}", rule.id, warning.path, warning.message);
        }
        if result.valid {
            let state = if rule.enabled { "ok" } else { "ok (disabled)" };
            println!("{:<8} {}", state, rule.id);
        } else {
            invalid += 1;
            println!("invalid  {}: {}", rule.id, result.error_summary());
        }
    }

    println!("{} rules, {} invalid", rules.len(), invalid);
    if invalid > 0 {
        anyhow::bail!("{invalid} invalid rule(s) under {}", config.alarm.rules_path.display());
    }
    Ok(())
}
