//! Ad-hoc `/spot` query endpoint.
//!
//! Invoked by a DingTalk outgoing robot or by hand. The request is validated,
//! acknowledged immediately, and the query runs in the background; results
//! go to the robot of the calling conversation.

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use spot_core::{JudgedField, ResourceQuery};
use spot_notify::{DingTalkNotifier, Dispatcher, MessageFormat, Notifier, RenderOptions};
use spot_rules::validation::validate_resource_query;
use spot_rules::{spawn_adhoc, AdHocRequest};

use crate::state::AppState;

/// Raw query-string parameters. Everything except the conversation and
/// region falls back to [`ResourceQuery`] defaults.
#[derive(Debug, Default, Deserialize)]
pub struct SpotParams {
    #[serde(rename = "sys.ding.conversationTitle", alias = "conversation")]
    pub conversation: Option<String>,
    pub region: Option<String>,
    pub cpu: Option<String>,
    pub memory: Option<String>,
    pub max_cpu: Option<String>,
    pub max_memory: Option<String>,
    pub family: Option<String>,
    pub cutoff: Option<String>,
    pub limit: Option<String>,
    pub resolution: Option<String>,
    /// Optional threshold; absent or zero runs a one-off report.
    pub price_max: Option<String>,
    pub judged_by: Option<String>,
    pub format: Option<String>,
}

/// Acknowledgement in the shape DingTalk outgoing robots expect.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotAck {
    pub success: bool,
    pub error_code: String,
    pub error_msg: String,
    pub fields: AckFields,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AckFields {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl SpotAck {
    fn accepted(title: String, request_id: String) -> (StatusCode, Json<Self>) {
        (
            StatusCode::OK,
            Json(Self {
                success: true,
                error_code: "200".to_string(),
                error_msg: String::new(),
                fields: AckFields {
                    title,
                    request_id: Some(request_id),
                },
            }),
        )
    }

    fn rejected(message: String) -> (StatusCode, Json<Self>) {
        (
            StatusCode::BAD_REQUEST,
            Json(Self {
                success: false,
                error_code: "400".to_string(),
                error_msg: message,
                fields: AckFields {
                    title: "spot query rejected".to_string(),
                    request_id: None,
                },
            }),
        )
    }
}

fn required(name: &str, raw: Option<String>) -> Result<String, String> {
    match raw.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(format!("missing required parameter '{name}'")),
    }
}

fn parse_opt<T: FromStr>(name: &str, raw: &Option<String>) -> Result<Option<T>, String> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|_| format!("parameter '{name}' has an invalid value '{v}'")),
    }
}

fn parse_judged_by(raw: Option<&str>) -> Result<JudgedField, String> {
    match raw.map(str::trim) {
        None | Some("") => Ok(JudgedField::default()),
        Some("price_per_core") => Ok(JudgedField::PricePerCore),
        Some("discount") => Ok(JudgedField::Discount),
        Some("volatility") => Ok(JudgedField::Volatility),
        Some(other) => Err(format!("parameter 'judged_by' has an invalid value '{other}'")),
    }
}

fn parse_format(raw: Option<&str>) -> Result<MessageFormat, String> {
    match raw.map(str::trim) {
        None | Some("") | Some("markdown") => Ok(MessageFormat::Markdown),
        Some("text") => Ok(MessageFormat::Text),
        Some(other) => Err(format!("parameter 'format' has an invalid value '{other}'")),
    }
}

impl SpotParams {
    /// Validate the parameters into the target conversation and an ad-hoc request.
    pub fn into_request(self, id: String) -> Result<(String, AdHocRequest), String> {
        let conversation = required("sys.ding.conversationTitle", self.conversation)?;
        let region = required("region", self.region)?;

        let mut query = ResourceQuery {
            region,
            ..ResourceQuery::default()
        };
        if let Some(v) = parse_opt("cpu", &self.cpu)? {
            query.cpu = v;
        }
        if let Some(v) = parse_opt("memory", &self.memory)? {
            query.memory = v;
        }
        if let Some(v) = parse_opt("max_cpu", &self.max_cpu)? {
            query.max_cpu = v;
        }
        if let Some(v) = parse_opt("max_memory", &self.max_memory)? {
            query.max_memory = v;
        }
        if let Some(v) = parse_opt("cutoff", &self.cutoff)? {
            query.cutoff = v;
        }
        if let Some(v) = parse_opt("limit", &self.limit)? {
            query.limit = v;
        }
        if let Some(v) = parse_opt("resolution", &self.resolution)? {
            query.resolution = v;
        }
        if let Some(family) = self.family.map(|f| f.trim().to_string()).filter(|f| !f.is_empty()) {
            query.family = family;
        }

        let checked = validate_resource_query(&query);
        if !checked.valid {
            return Err(checked.error_summary());
        }

        let threshold = match parse_opt::<f64>("price_max", &self.price_max)? {
            Some(v) if !v.is_finite() || v < 0.0 => {
                return Err(format!("parameter 'price_max' must be a non-negative number, got {v}"))
            }
            Some(v) if v > 0.0 => Some(v),
            _ => None,
        };

        let render = RenderOptions {
            format: parse_format(self.format.as_deref())?,
            ..RenderOptions::default()
        };

        let request = AdHocRequest {
            id,
            name: format!("{conversation} spot query"),
            query,
            threshold,
            judged_by: parse_judged_by(self.judged_by.as_deref())?,
            render,
        };
        Ok((conversation, request))
    }
}

pub async fn spot(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SpotParams>,
) -> (StatusCode, Json<SpotAck>) {
    let request_id = uuid::Uuid::new_v4().to_string();
    let (conversation, request) = match params.into_request(request_id.clone()) {
        Ok(parsed) => parsed,
        Err(message) => {
            warn!(error = %message, "ad-hoc query rejected");
            return SpotAck::rejected(message);
        }
    };

    let notifier = match DingTalkNotifier::resolve(&state.config.dingtalk, Some(&conversation), None, None) {
        Ok(n) => n,
        Err(e) => {
            warn!(conversation = %conversation, error = %e, "ad-hoc query has no reply channel");
            return SpotAck::rejected(e.to_string());
        }
    };

    let env = Arc::clone(state.env());
    let channels: Vec<Arc<dyn Notifier>> = vec![Arc::new(notifier)];
    let dispatcher = Dispatcher::new(channels).with_timeout(env.call_timeout);

    let title = match request.threshold {
        Some(t) => format!("spot query accepted: {} ({} >= {t})", request.query.conditions(), request.judged_by),
        None => format!("spot query accepted: {}", request.query.conditions()),
    };
    info!(request_id = %request_id, conversation = %conversation, "ad-hoc query accepted");

    // Detached; the outcome is logged by the pipeline.
    drop(spawn_adhoc(env, request, dispatcher));

    SpotAck::accepted(title, request_id)
}
