//! [`AlarmScheduler`]: registers rules and drives one run loop per rule.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use spot_core::config::DingTalkConfig;
use spot_notify::{Dispatcher, Notifier};

use crate::channels::build_channels;
use crate::loader::RuleError;
use crate::pipeline::PipelineEnv;
use crate::schema::AlarmRule;
use crate::validation::validate_rule;

use super::cron::RuleSchedule;
use super::job::{RuleJob, RuleStatus};

/// A rule that was not registered, and why.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedRule {
    pub id: String,
    pub reason: String,
}

/// Result of a manual trigger request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunNow {
    Started,
    /// A cycle for the rule is already in flight.
    Busy,
    NotFound,
}

/// Owns every registered rule job and its run loop.
///
/// Register rules first (`&mut self`), then [`start`](Self::start). After
/// that the scheduler can be shared behind an `Arc`.
pub struct AlarmScheduler {
    env: Arc<PipelineEnv>,
    jobs: BTreeMap<String, Arc<RuleJob>>,
    skipped: Vec<SkippedRule>,
    shutdown_tx: watch::Sender<bool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl AlarmScheduler {
    pub fn new(env: Arc<PipelineEnv>) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            env,
            jobs: BTreeMap::new(),
            skipped: Vec::new(),
            shutdown_tx,
            handles: Mutex::new(Vec::new()),
        }
    }

    pub fn env(&self) -> &Arc<PipelineEnv> {
        &self.env
    }

    /// Register one rule with pre-built notification channels.
    ///
    /// Invalid rules are recorded as skipped and returned as
    /// [`RuleError::Validation`]. Disabled rules are recorded as skipped
    /// but are not an error.
    pub fn register(&mut self, rule: AlarmRule, channels: Vec<Arc<dyn Notifier>>) -> Result<(), RuleError> {
        if !rule.enabled {
            info!(rule_id = %rule.id, "rule disabled; not scheduled");
            self.skip(&rule.id, "disabled");
            return Ok(());
        }
        if self.jobs.contains_key(&rule.id) {
            return Err(self.reject(&rule.id, format!("duplicate rule id '{}'", rule.id)));
        }

        let validation = validate_rule(&rule);
        for w in &validation.warnings {
            warn!(rule_id = %rule.id, path = %w.path, "{}", w.message);
        }
        if !validation.valid {
            return Err(self.reject(&rule.id, validation.error_summary()));
        }

        let schedule = match RuleSchedule::parse(&rule.schedule.cron) {
            Ok(s) => s,
            Err(e) => return Err(self.reject(&rule.id, e)),
        };
        let Some(threshold) = rule.threshold() else {
            return Err(self.reject(&rule.id, format!("unusable threshold {}", rule.filter.threshold)));
        };

        let dispatcher = Dispatcher::new(channels).with_timeout(self.env.call_timeout);
        let id = rule.id.clone();
        let job = RuleJob::new(rule, threshold, schedule, dispatcher, self.env.new_filter());
        info!(rule_id = %id, schedule = %job.rule().schedule.cron, threshold, "rule registered");
        self.jobs.insert(id, Arc::new(job));
        Ok(())
    }

    /// Validate, build channels for, and register every rule.
    ///
    /// Failures are logged and skipped; other rules are unaffected. Returns
    /// the number of rules registered.
    pub fn register_all(&mut self, rules: Vec<AlarmRule>, dingtalk: &DingTalkConfig) -> usize {
        for rule in rules {
            // Disabled and invalid rules never need channels; `register`
            // records why they were skipped.
            if !rule.enabled || !validate_rule(&rule).valid {
                let _ = self.register(rule, Vec::new());
                continue;
            }
            let channels = match build_channels(&rule.targets, dingtalk, &self.env.renderer) {
                Ok(c) => c,
                Err(e) => {
                    self.reject(&rule.id, RuleError::Channel(e).to_string());
                    continue;
                }
            };
            let _ = self.register(rule, channels);
        }

        if self.jobs.is_empty() {
            warn!("NO ALARM RULES REGISTERED: scheduler is idle, only ad-hoc queries will run");
        } else {
            info!(registered = self.jobs.len(), skipped = self.skipped.len(), "alarm rules registered");
        }
        self.jobs.len()
    }

    /// Spawn one run loop per registered rule.
    pub fn start(&self) {
        let mut handles = self.handles.lock().unwrap_or_else(|e| e.into_inner());
        for job in self.jobs.values() {
            let job = Arc::clone(job);
            let env = Arc::clone(&self.env);
            let shutdown = self.shutdown_tx.subscribe();
            handles.push(tokio::spawn(run_loop(job, env, shutdown)));
        }
        info!(rules = self.jobs.len(), "scheduler started");
    }

    /// Trigger a cycle for `rule_id` now, outside its schedule.
    pub fn run_now(&self, rule_id: &str) -> RunNow {
        let Some(job) = self.jobs.get(rule_id) else {
            return RunNow::NotFound;
        };
        if job.is_busy() {
            return RunNow::Busy;
        }
        let job = Arc::clone(job);
        let env = Arc::clone(&self.env);
        tokio::spawn(async move {
            info!(rule_id = %job.id(), "manual run requested");
            job.try_run(&env).await;
        });
        RunNow::Started
    }

    /// Stop every run loop and wait for them to exit.
    pub async fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
        let handles: Vec<_> = self
            .handles
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
            .collect();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "rule loop ended abnormally");
            }
        }
        info!("scheduler stopped");
    }

    pub fn status(&self) -> Vec<RuleStatus> {
        self.jobs.values().map(|j| j.status()).collect()
    }

    pub fn skipped(&self) -> &[SkippedRule] {
        &self.skipped
    }

    pub fn get(&self, rule_id: &str) -> Option<&Arc<RuleJob>> {
        self.jobs.get(rule_id)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    fn skip(&mut self, id: &str, reason: impl Into<String>) {
        self.skipped.push(SkippedRule {
            id: id.to_string(),
            reason: reason.into(),
        });
    }

    fn reject(&mut self, id: &str, reason: String) -> RuleError {
        warn!(rule_id = %id, reason = %reason, "rule rejected; skipping");
        self.skip(id, reason.clone());
        RuleError::Validation(reason)
    }
}

/// Fire `job` on its schedule until shutdown.
///
/// The next fire time is computed after each cycle completes, so ticks
/// missed while a cycle overran collapse into one.
async fn run_loop(job: Arc<RuleJob>, env: Arc<PipelineEnv>, mut shutdown: watch::Receiver<bool>) {
    let rule_id = job.id().to_string();
    loop {
        if *shutdown.borrow() {
            break;
        }
        let now = Utc::now();
        let Some(next) = job.schedule().next_after(&now) else {
            warn!(rule_id = %rule_id, "schedule has no future fire time; loop stopped");
            break;
        };
        job.set_next_fire(Some(next));
        let wait = (next - now).to_std().unwrap_or_default();

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = shutdown.changed() => break,
        }

        tokio::select! {
            _ = job.try_run(&env) => {}
            _ = shutdown.changed() => {
                info!(rule_id = %rule_id, "shutdown during cycle; cycle cancelled");
                break;
            }
        }
    }
    job.set_next_fire(None);
    debug!(rule_id = %rule_id, "rule loop exited");
}
