// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - POST /analyze  (JSON contract, stage header, missing text)
// - GET /debug/flags (only on the debug router)

use serde_json::json;
use serde_json::Value as Json;
use shuttle_axum::axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt as _; // for `oneshot`

use scam_verdict::api::{self, AppState, STAGE_HEADER};
use scam_verdict::Analyzer;

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

/// Rules-only router, independent of local config files and env.
fn test_router() -> Router {
    api::router(AppState::new(Analyzer::offline()))
}

async fn post_analyze(app: Router, payload: serde_json::Value) -> (StatusCode, String, Json) {
    let req = Request::builder()
        .method("POST")
        .uri("/analyze")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST /analyze");

    let resp = app.oneshot(req).await.expect("oneshot /analyze");
    let status = resp.status();
    let stage = resp
        .headers()
        .get(STAGE_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read json")
        .to_vec();
    let v: Json = serde_json::from_slice(&bytes).expect("parse analyze json");
    (status, stage, v)
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let app = test_router();

    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");

    let resp = app.oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK, "health should be 200");

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    let body = String::from_utf8(bytes).expect("utf8");
    assert_eq!(body.trim(), "OK", "health body should be 'OK'");
}

#[tokio::test]
async fn api_analyze_returns_expected_json_fields() {
    let (status, stage, v) = post_analyze(
        test_router(),
        json!({ "text": "URGENT: your SIM card will be blocked today, re-verify at sim-help.in" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(stage, "rules");

    // Contract checks for the extension UI
    assert_eq!(v["verdict"], "SCAM");
    assert_eq!(v["confidence"], 97);
    assert_eq!(v["riskLevel"], "high");
    assert!(v["summary"].as_str().is_some_and(|s| !s.is_empty()));
    assert!(v["reasoning"]
        .as_array()
        .expect("reasoning array")
        .iter()
        .any(|r| r == "SIM blocking threat used to create panic"));
    let sources = v["sources"].as_array().expect("sources array");
    assert!(sources.iter().all(|s| s.get("label").is_some() && s.get("url").is_some()));
}

#[tokio::test]
async fn api_analyze_short_and_missing_text_is_unknown() {
    for payload in [json!({ "text": "hey" }), json!({}), json!({ "text": null })] {
        let (status, stage, v) = post_analyze(test_router(), payload.clone()).await;
        assert_eq!(status, StatusCode::OK, "{payload}");
        assert_eq!(stage, "guard");
        assert_eq!(v["verdict"], "UNKNOWN");
        assert_eq!(v["confidence"], 0);
        assert_eq!(v["summary"], "Text too short to analyze.");
        assert_eq!(v["reasoning"], json!([]));
        assert_eq!(v["sources"], json!([]));
    }
}

#[tokio::test]
async fn api_analyze_default_safe_without_ai() {
    let (_, stage, v) =
        post_analyze(test_router(), json!({ "text": "Hi, how are you doing today?" })).await;
    assert_eq!(stage, "default");
    assert_eq!(v["verdict"], "SAFE");
    assert_eq!(v["confidence"], 55);
    assert_eq!(v["riskLevel"], "low");
    assert_eq!(v["reasoning"], json!(["No high-risk patterns detected"]));
}

#[tokio::test]
async fn debug_flags_only_on_debug_router() {
    let uri = "/debug/flags?text=verify%20your%20bank%20account%20at%20secure-check.net";

    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let resp = test_router().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let app = api::router_with_debug(AppState::new(Analyzer::offline()));
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    let v: Json = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(v["flags"]["bank"], true);
    assert_eq!(v["flags"]["fakeDomain"], true);
    assert_eq!(v["flags"]["gift"], false);
    assert_eq!(v["mismatch"], false);
    assert_eq!(v["rules"]["verdict"], "SCAM");
    assert_eq!(v["id"].as_str().map(str::len), Some(12));
}
