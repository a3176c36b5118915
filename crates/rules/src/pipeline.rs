//! One evaluation cycle: fetch, analyze, limit, filter, classify, render,
//! dispatch.
//!
//! Scheduled rules call [`run_cycle`] with their own [`ChangeFilter`];
//! ad-hoc queries go through [`spawn_adhoc`], which runs the same cycle
//! against a fresh filter in a background task.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use spot_core::{Classification, JudgedField, ResourceQuery};
use spot_notify::{render_message, Dispatcher, RenderContext, RenderOptions, TemplateRenderer};
use spot_pricing::PriceSource;

use crate::analyzer::analyze;
use crate::classifier::classify;
use crate::filter::{ChangeFilter, DEFAULT_TTL};

/// Shared collaborators for every cycle.
pub struct PipelineEnv {
    pub source: Arc<dyn PriceSource>,
    pub renderer: Arc<TemplateRenderer>,
    /// Deadline for each price source call and each notifier send.
    pub call_timeout: Duration,
    /// TTL for change filters created by this environment.
    pub filter_ttl: Duration,
}

impl PipelineEnv {
    pub fn new(source: Arc<dyn PriceSource>) -> Self {
        Self {
            source,
            renderer: Arc::new(TemplateRenderer::new()),
            call_timeout: Duration::from_secs(60),
            filter_ttl: DEFAULT_TTL,
        }
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_filter_ttl(mut self, ttl: Duration) -> Self {
        self.filter_ttl = ttl;
        self
    }

    pub fn new_filter(&self) -> ChangeFilter {
        ChangeFilter::new(self.filter_ttl)
    }
}

/// What a cycle evaluates.
#[derive(Debug, Clone, Copy)]
pub struct CycleSpec<'a> {
    pub rule_id: &'a str,
    pub rule_name: &'a str,
    pub query: &'a ResourceQuery,
    /// `None` for a one-off query without alarm semantics.
    pub threshold: Option<f64>,
    pub judged_by: JudgedField,
    pub render: &'a RenderOptions,
}

/// How a cycle ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// Nothing was delivered and filter state is untouched.
    Abandoned { reason: String },
    /// Prices were evaluated but nothing changed.
    Quiet { snapshot: usize },
    Notified {
        classification: Classification,
        changed: usize,
        delivered: usize,
        failed: usize,
    },
}

impl CycleOutcome {
    pub fn classification(&self) -> Option<Classification> {
        match self {
            CycleOutcome::Notified { classification, .. } => Some(*classification),
            _ => None,
        }
    }

    fn abandoned(reason: impl Into<String>) -> Self {
        CycleOutcome::Abandoned {
            reason: reason.into(),
        }
    }
}

/// Run one cycle.
///
/// With a threshold the changed subset comes from `filter` (a throwaway
/// filter when `None`, so every entry is a first sighting). Without one the
/// whole limited snapshot is reported.
pub async fn run_cycle(
    env: &PipelineEnv,
    spec: &CycleSpec<'_>,
    filter: Option<&mut ChangeFilter>,
    dispatcher: &Dispatcher,
) -> CycleOutcome {
    let rule_id = spec.rule_id;

    let groups = match tokio::time::timeout(env.call_timeout, env.source.query(spec.query)).await {
        Ok(Ok(groups)) => groups,
        Ok(Err(e)) => {
            warn!(rule_id, source = env.source.name(), error = %e, "price source failed; cycle abandoned");
            return CycleOutcome::abandoned(format!("price source failed: {e}"));
        }
        Err(_) => {
            warn!(rule_id, timeout_secs = env.call_timeout.as_secs(), "price source timed out; cycle abandoned");
            return CycleOutcome::abandoned("price source timed out");
        }
    };
    if groups.is_empty() {
        warn!(rule_id, "price source returned no data; cycle abandoned");
        return CycleOutcome::abandoned("no price data");
    }

    let mut snapshot = analyze(&groups);
    snapshot.truncate(spec.query.limit);
    if snapshot.is_empty() {
        warn!(rule_id, groups = groups.len(), "no priceable instances; cycle abandoned");
        return CycleOutcome::abandoned("no priceable instances");
    }

    // Evaluate against a copy; the rule's filter only advances once the
    // cycle has produced a message or found nothing to report.
    let (changed, staged) = match (spec.threshold, filter.as_deref()) {
        (Some(threshold), Some(current)) => {
            let mut next = current.clone();
            let changed = next.evaluate(&snapshot, threshold, spec.judged_by);
            (changed, Some(next))
        }
        (Some(threshold), None) => (
            env.new_filter().evaluate(&snapshot, threshold, spec.judged_by),
            None,
        ),
        (None, _) => (snapshot.clone(), None),
    };
    if changed.is_empty() {
        commit(filter, staged);
        debug!(rule_id, snapshot = snapshot.len(), "no changes");
        return CycleOutcome::Quiet {
            snapshot: snapshot.len(),
        };
    }

    let changed_count = changed.len();
    let classified = classify(changed, spec.threshold, spec.judged_by);
    let ctx = RenderContext {
        rule_id,
        rule_name: spec.rule_name,
        query: spec.query,
        options: spec.render,
    };
    let notification = match render_message(&classified, &ctx, &env.renderer) {
        Ok(n) => n,
        Err(e) => {
            error!(rule_id, error = %e, "failed to render notification; filter state kept");
            return CycleOutcome::abandoned(format!("render failed: {e}"));
        }
    };
    commit(filter, staged);

    let results = dispatcher.dispatch(rule_id, &notification).await;
    let delivered = results.iter().filter(|r| r.success).count();
    let failed = results.len() - delivered;
    info!(
        rule_id,
        classification = %classified.classification,
        changed = changed_count,
        delivered,
        failed,
        "cycle complete"
    );

    CycleOutcome::Notified {
        classification: classified.classification,
        changed: changed_count,
        delivered,
        failed,
    }
}

fn commit(filter: Option<&mut ChangeFilter>, staged: Option<ChangeFilter>) {
    if let (Some(filter), Some(next)) = (filter, staged) {
        *filter = next;
    }
}

/// An ephemeral rule built from request parameters.
#[derive(Debug, Clone)]
pub struct AdHocRequest {
    pub id: String,
    pub name: String,
    pub query: ResourceQuery,
    pub threshold: Option<f64>,
    pub judged_by: JudgedField,
    pub render: RenderOptions,
}

/// Run an ad-hoc cycle against a fresh change filter.
pub async fn run_adhoc(env: &PipelineEnv, request: &AdHocRequest, dispatcher: &Dispatcher) -> CycleOutcome {
    let spec = CycleSpec {
        rule_id: &request.id,
        rule_name: &request.name,
        query: &request.query,
        threshold: request.threshold,
        judged_by: request.judged_by,
        render: &request.render,
    };
    let mut filter = env.new_filter();
    run_cycle(env, &spec, Some(&mut filter), dispatcher).await
}

/// Fire-and-forget [`run_adhoc`] on the runtime.
pub fn spawn_adhoc(
    env: Arc<PipelineEnv>,
    request: AdHocRequest,
    dispatcher: Dispatcher,
) -> JoinHandle<CycleOutcome> {
    tokio::spawn(async move {
        info!(rule_id = %request.id, conditions = %request.query.conditions(), "ad-hoc query started");
        run_adhoc(&env, &request, &dispatcher).await
    })
}
