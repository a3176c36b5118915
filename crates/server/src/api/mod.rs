//! HTTP endpoint modules.
//!
//! Each sub-module owns a single responsibility area.
//! Shared response types live here in mod.rs.

mod health;
mod rules;
mod spot;

#[cfg(test)]
mod tests;

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

pub use health::{config, health};
pub use rules::{rule_get, rule_run, rule_test, rules_list};
pub use spot::spot;

// ── Shared types ─────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub(crate) fn error_response(status: StatusCode, error: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    (status, Json(ErrorResponse { error: error.into() }))
}
