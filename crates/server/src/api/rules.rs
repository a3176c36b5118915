//! Scheduled rule inspection and manual triggering.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use spot_notify::DispatchResult;
use spot_rules::scheduler::{RuleStatus, SkippedRule};
use spot_rules::RunNow;

use crate::state::AppState;

use super::error_response;

#[derive(Serialize)]
pub struct RulesResponse<'a> {
    pub rules: Vec<RuleStatus>,
    pub skipped: &'a [SkippedRule],
}

pub async fn rules_list(State(state): State<Arc<AppState>>) -> Response {
    Json(RulesResponse {
        rules: state.scheduler.status(),
        skipped: state.scheduler.skipped(),
    })
    .into_response()
}

pub async fn rule_get(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.scheduler.get(&id) {
        Some(job) => Json(job.status()).into_response(),
        None => error_response(StatusCode::NOT_FOUND, format!("Rule '{id}' not found")).into_response(),
    }
}

#[derive(Serialize)]
pub struct RunResponse {
    pub rule_id: String,
    pub status: &'static str,
}

/// Start a cycle now. 202 when started, 409 while one is in flight.
pub async fn rule_run(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.scheduler.run_now(&id) {
        RunNow::Started => (
            StatusCode::ACCEPTED,
            Json(RunResponse {
                rule_id: id,
                status: "started",
            }),
        )
            .into_response(),
        RunNow::Busy => error_response(
            StatusCode::CONFLICT,
            format!("Rule '{id}' already has a cycle in flight"),
        )
        .into_response(),
        RunNow::NotFound => {
            error_response(StatusCode::NOT_FOUND, format!("Rule '{id}' not found")).into_response()
        }
    }
}

#[derive(Serialize)]
pub struct ProbeResponse {
    pub rule_id: String,
    pub results: Vec<DispatchResult>,
}

/// Send a connectivity probe through the rule's targets and report each delivery.
pub async fn rule_test(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let Some(job) = state.scheduler.get(&id) else {
        return error_response(StatusCode::NOT_FOUND, format!("Rule '{id}' not found")).into_response();
    };
    let results = job.probe().await;
    Json(ProbeResponse { rule_id: id, results }).into_response()
}
