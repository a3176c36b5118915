//! A registered rule together with its change filter and run statistics.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use spot_core::{Classification, JudgedField};
use spot_notify::{DispatchResult, Dispatcher};

use crate::filter::ChangeFilter;
use crate::pipeline::{run_cycle, CycleOutcome, CycleSpec, PipelineEnv};
use crate::schema::AlarmRule;

use super::cron::RuleSchedule;

/// Counters and last-cycle details for one rule.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JobStats {
    pub runs: u64,
    /// Triggers dropped because a cycle was already in flight.
    pub skipped_busy: u64,
    pub last_run: Option<DateTime<Utc>>,
    pub last_outcome: Option<CycleOutcome>,
    /// Most recent classification that produced a notification.
    pub last_classification: Option<Classification>,
    pub next_fire: Option<DateTime<Utc>>,
}

/// Snapshot of a job for status listings.
#[derive(Debug, Clone, Serialize)]
pub struct RuleStatus {
    pub id: String,
    pub name: String,
    pub schedule: String,
    pub threshold: f64,
    pub judged_by: JudgedField,
    pub targets: usize,
    pub busy: bool,
    /// Entries in the change filter; `None` while a cycle holds it.
    pub tracked: Option<usize>,
    #[serde(flatten)]
    pub stats: JobStats,
}

/// One scheduled rule.
///
/// The change filter sits behind a tokio mutex that every trigger takes
/// with `try_lock`, so at most one cycle per rule is ever in flight.
pub struct RuleJob {
    rule: AlarmRule,
    threshold: f64,
    schedule: RuleSchedule,
    dispatcher: Dispatcher,
    pub(super) filter: tokio::sync::Mutex<ChangeFilter>,
    stats: Mutex<JobStats>,
}

impl RuleJob {
    pub fn new(
        rule: AlarmRule,
        threshold: f64,
        schedule: RuleSchedule,
        dispatcher: Dispatcher,
        filter: ChangeFilter,
    ) -> Self {
        Self {
            rule,
            threshold,
            schedule,
            dispatcher,
            filter: tokio::sync::Mutex::new(filter),
            stats: Mutex::new(JobStats::default()),
        }
    }

    pub fn id(&self) -> &str {
        &self.rule.id
    }

    pub fn rule(&self) -> &AlarmRule {
        &self.rule
    }

    pub fn schedule(&self) -> &RuleSchedule {
        &self.schedule
    }

    /// Whether a cycle currently holds the filter.
    pub fn is_busy(&self) -> bool {
        self.filter.try_lock().is_err()
    }

    /// Run one cycle unless another is in flight (`None` then).
    pub async fn try_run(&self, env: &PipelineEnv) -> Option<CycleOutcome> {
        let Ok(mut filter) = self.filter.try_lock() else {
            warn!(rule_id = %self.rule.id, "previous cycle still running; trigger skipped");
            self.with_stats(|s| s.skipped_busy += 1);
            return None;
        };

        let spec = CycleSpec {
            rule_id: &self.rule.id,
            rule_name: &self.rule.name,
            query: &self.rule.query,
            threshold: Some(self.threshold),
            judged_by: self.rule.filter.judged_by,
            render: &self.rule.render,
        };
        let started = Utc::now();
        let outcome = run_cycle(env, &spec, Some(&mut filter), &self.dispatcher).await;

        self.with_stats(|s| {
            s.runs += 1;
            s.last_run = Some(started);
            if let Some(class) = outcome.classification() {
                s.last_classification = Some(class);
            }
            s.last_outcome = Some(outcome.clone());
        });
        Some(outcome)
    }

    /// Send a connectivity probe through every target of the rule.
    pub async fn probe(&self) -> Vec<DispatchResult> {
        self.dispatcher.probe(&self.rule.id).await
    }

    pub(super) fn set_next_fire(&self, next: Option<DateTime<Utc>>) {
        self.with_stats(|s| s.next_fire = next);
    }

    pub fn stats(&self) -> JobStats {
        self.with_stats(|s| s.clone())
    }

    pub fn status(&self) -> RuleStatus {
        let tracked = self.filter.try_lock().ok().map(|f| f.len());
        RuleStatus {
            id: self.rule.id.clone(),
            name: self.rule.name.clone(),
            schedule: self.rule.schedule.cron.clone(),
            threshold: self.threshold,
            judged_by: self.rule.filter.judged_by,
            targets: self.dispatcher.len(),
            busy: tracked.is_none(),
            tracked,
            stats: self.stats(),
        }
    }

    fn with_stats<T>(&self, f: impl FnOnce(&mut JobStats) -> T) -> T {
        let mut guard = self.stats.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }
}
