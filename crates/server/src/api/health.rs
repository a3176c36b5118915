//! Health and redacted config endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub profile: String,
    pub rules: usize,
    pub skipped_rules: usize,
    pub uptime_secs: i64,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        profile: state.config.profile_label().to_string(),
        rules: state.scheduler.len(),
        skipped_rules: state.scheduler.skipped().len(),
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
    })
}

/// Active configuration with credentials and robot tokens left out.
pub async fn config(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(state.config.redacted_summary())
}
