//! Handler tests driven through the full router.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use spot_core::{Config, PriceGroup, ResourceQuery};
use spot_pricing::{PriceSource, SourceError};

use super::spot::SpotParams;
use crate::router::build_router;
use crate::startup::{build_app_state, load_rules};
use crate::state::AppState;

/// Returns no prices, so every cycle is abandoned before any delivery.
struct EmptySource {
    delay: Duration,
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl PriceSource for EmptySource {
    async fn query(&self, _query: &ResourceQuery) -> Result<Vec<PriceGroup>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "empty"
    }
}

const RULE_YAML: &str = r#"
id: hz
name: Hangzhou
schedule:
  cron: "0 0 3 * * *"
query:
  region: cn-hangzhou
filter:
  threshold: 0.05
targets:
  - channel: dingtalk
    conversation: ops
"#;

const BROKEN_RULE_YAML: &str = r#"
id: broken
name: Broken
schedule:
  cron: "not a cron"
query:
  region: cn-hangzhou
filter:
  threshold: 0.05
"#;

fn setup(delay: Duration) -> (Arc<AppState>, Arc<EmptySource>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("hz.yml"), RULE_YAML).unwrap();
    std::fs::write(dir.path().join("broken.yml"), BROKEN_RULE_YAML).unwrap();

    let mut config = Config::for_profile("");
    config.alarm.rules_path = dir.path().to_path_buf();
    config.dingtalk.tokens.insert("ops".to_string(), "tok-ops-secret".to_string());

    let source = Arc::new(EmptySource {
        delay,
        calls: AtomicUsize::new(0),
    });
    let rules = load_rules(&config).unwrap();
    let state = build_app_state(config, source.clone(), rules);
    (state, source, dir)
}

async fn send(app: Router, method: &str, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn health_counts_registered_and_skipped_rules() {
    let (state, _, _dir) = setup(Duration::ZERO);
    let (status, body) = send(build_router(state), "GET", "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["rules"], 1);
    assert_eq!(body["skipped_rules"], 1);
}

#[tokio::test]
async fn config_endpoint_hides_tokens() {
    let (state, _, _dir) = setup(Duration::ZERO);
    let (status, body) = send(build_router(state), "GET", "/config").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dingtalk"]["conversations"][0], "ops");
    assert!(!body.to_string().contains("tok-ops-secret"));
}

#[tokio::test]
async fn rules_list_and_lookup() {
    let (state, _, _dir) = setup(Duration::ZERO);
    let app = build_router(state);

    let (status, body) = send(app.clone(), "GET", "/rules").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rules"][0]["id"], "hz");
    assert_eq!(body["skipped"][0]["id"], "broken");

    let (status, body) = send(app.clone(), "GET", "/rules/hz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["busy"], false);

    let (status, body) = send(app.clone(), "GET", "/rules/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("nope"));

    let (status, _) = send(app, "POST", "/rules/nope/test").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn manual_run_started_then_busy() {
    let (state, source, _dir) = setup(Duration::from_millis(500));
    let app = build_router(state);

    let (status, body) = send(app.clone(), "POST", "/rules/hz/run").await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "started");

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);

    let (status, _) = send(app.clone(), "POST", "/rules/hz/run").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(app, "POST", "/rules/missing/run").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn spot_requires_conversation_and_region() {
    let (state, _, _dir) = setup(Duration::ZERO);
    let app = build_router(state);

    let (status, body) = send(app.clone(), "GET", "/spot?region=cn-hangzhou").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["errorCode"], "400");
    assert!(body["errorMsg"].as_str().unwrap().contains("sys.ding.conversationTitle"));

    let (status, body) = send(app, "GET", "/spot?sys.ding.conversationTitle=ops").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errorMsg"].as_str().unwrap().contains("region"));
}

#[tokio::test]
async fn spot_accepts_and_runs_in_background() {
    let (state, source, _dir) = setup(Duration::ZERO);
    let app = build_router(state);

    let (status, body) = send(
        app,
        "GET",
        "/spot?sys.ding.conversationTitle=ops&region=cn-shanghai&cpu=8&max_cpu=16&price_max=0.04",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["errorCode"], "200");
    assert!(body["fields"]["title"].as_str().unwrap().contains("region=cn-shanghai"));
    assert!(body["fields"]["requestId"].is_string());

    for _ in 0..50 {
        if source.calls.load(Ordering::SeqCst) > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn spot_post_uses_query_string_and_alias() {
    let (state, _, _dir) = setup(Duration::ZERO);
    let (status, body) = send(
        build_router(state),
        "POST",
        "/spot?conversation=ops&region=cn-hangzhou",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn spot_rejects_bad_parameters() {
    let (state, source, _dir) = setup(Duration::ZERO);
    let app = build_router(state);

    let (status, body) = send(
        app.clone(),
        "GET",
        "/spot?conversation=ops&region=cn-hangzhou&price_max=cheap",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errorMsg"].as_str().unwrap().contains("price_max"));

    let (status, body) = send(
        app.clone(),
        "GET",
        "/spot?conversation=ops&region=cn-hangzhou&cpu=16&max_cpu=8",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errorMsg"].as_str().unwrap().contains("max_cpu"));

    let (status, body) = send(app, "GET", "/spot?conversation=strangers&region=cn-hangzhou").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errorMsg"].as_str().unwrap().contains("strangers"));

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(source.calls.load(Ordering::SeqCst), 0);
}

fn params(conversation: &str, region: &str) -> SpotParams {
    SpotParams {
        conversation: Some(conversation.to_string()),
        region: Some(region.to_string()),
        ..SpotParams::default()
    }
}

#[test]
fn zero_or_missing_price_max_is_a_one_off_report() {
    let (_, request) = params("ops", "cn-hangzhou").into_request("r1".to_string()).unwrap();
    assert_eq!(request.threshold, None);
    assert_eq!(request.query, ResourceQuery {
        region: "cn-hangzhou".to_string(),
        ..ResourceQuery::default()
    });

    let mut zero = params("ops", "cn-hangzhou");
    zero.price_max = Some("0".to_string());
    assert_eq!(zero.into_request("r2".to_string()).unwrap().1.threshold, None);

    let mut set = params("ops", "cn-hangzhou");
    set.price_max = Some(" 0.05 ".to_string());
    set.judged_by = Some("discount".to_string());
    let (conversation, request) = set.into_request("r3".to_string()).unwrap();
    assert_eq!(conversation, "ops");
    assert_eq!(request.threshold, Some(0.05));
    assert_eq!(request.judged_by, spot_core::JudgedField::Discount);
    assert_eq!(request.id, "r3");
}

#[test]
fn negative_price_max_and_unknown_options_are_rejected() {
    let mut negative = params("ops", "cn-hangzhou");
    negative.price_max = Some("-1".to_string());
    assert!(negative.into_request("r".to_string()).is_err());

    let mut judged = params("ops", "cn-hangzhou");
    judged.judged_by = Some("color".to_string());
    assert!(judged.into_request("r".to_string()).is_err());

    let mut format = params("ops", "cn-hangzhou");
    format.format = Some("html".to_string());
    assert!(format.into_request("r".to_string()).is_err());
}
