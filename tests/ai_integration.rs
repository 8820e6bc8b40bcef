// tests/ai_integration.rs
//
// The Gemini provider against a local stub server (no real network):
// fenced replies, schema violations, HTTP errors, hangs, unreachable hosts.

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::Path,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};

use scam_verdict::ai_adapter::{build_classifier, Classifier, GeminiProvider, API_KEY_HEADER};
use scam_verdict::config::ai::{AiConfig, AiProvider};
use scam_verdict::{Analyzer, RiskLevel, Stage, Verdict};

const KEY: &str = "test-key";
const SAFE_TEXT: &str = "Hi, how are you doing today?";

const GOOD_REPLY: &str = r#"{"verdict":"SCAM","confidence":88,"summary":"Classic advance-fee lure.","riskLevel":"high","reasoning":["Asks for an upfront fee"],"sources":[{"label":"CERT-In","url":"https://www.cert-in.org.in"}]}"#;

fn envelope(text: &str) -> Value {
    json!({ "candidates": [ { "content": { "parts": [ { "text": text } ] } } ] })
}

/// `/{mode}` picks the stub behaviour.
async fn stub(
    Path(mode): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let key = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok());
    if key != Some(KEY) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let prompt = body["contents"][0]["parts"][0]["text"]
        .as_str()
        .unwrap_or_default();
    if !prompt.contains("Respond ONLY in JSON") {
        return StatusCode::BAD_REQUEST.into_response();
    }

    match mode.as_str() {
        "plain" => Json(envelope(GOOD_REPLY)).into_response(),
        "fenced" => Json(envelope(&format!("```json\n{GOOD_REPLY}\n```"))).into_response(),
        "prose" => Json(envelope("I think this is probably a scam.")).into_response(),
        "bad-verdict" => Json(envelope(
            r#"{"verdict":"MAYBE","confidence":40,"summary":"unsure","riskLevel":"low"}"#,
        ))
        .into_response(),
        "empty" => Json(json!({ "candidates": [] })).into_response(),
        "not-json" => "<html>oops</html>".into_response(),
        "error" => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        "slow" => {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Json(envelope(GOOD_REPLY)).into_response()
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn spawn_stub() -> String {
    let app = Router::new().route("/{mode}", post(stub));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub");
    let addr = listener.local_addr().expect("stub addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub server");
    });
    format!("http://{addr}")
}

fn config(endpoint: String, key: Option<&str>) -> AiConfig {
    AiConfig {
        enabled: true,
        provider: AiProvider::Gemini,
        endpoint,
        api_key: key.map(str::to_string),
        timeout_ms: 500,
        connect_timeout_ms: 200,
    }
}

async fn classify(base: &str, mode: &str) -> Option<scam_verdict::AnalysisResult> {
    let cfg = config(format!("{base}/{mode}"), Some(KEY));
    let provider = GeminiProvider::new(&cfg).expect("provider");
    provider.classify(SAFE_TEXT).await
}

#[tokio::test]
async fn plain_and_fenced_replies_are_accepted() {
    let base = spawn_stub().await;
    for mode in ["plain", "fenced"] {
        let r = classify(&base, mode).await.expect(mode);
        assert_eq!(r.verdict, Verdict::Scam);
        assert_eq!(r.confidence, 88);
        assert_eq!(r.risk_level, RiskLevel::High);
        assert_eq!(r.reasoning, vec!["Asks for an upfront fee"]);
    }
}

#[tokio::test]
async fn failures_yield_no_result() {
    let base = spawn_stub().await;
    for mode in ["prose", "bad-verdict", "empty", "not-json", "error", "slow", "missing"] {
        assert!(classify(&base, mode).await.is_none(), "{mode} should be no result");
    }
}

#[tokio::test]
async fn wrong_key_yields_no_result() {
    let base = spawn_stub().await;
    let cfg = config(format!("{base}/plain"), Some("other-key"));
    let provider = GeminiProvider::new(&cfg).expect("provider");
    assert!(provider.classify(SAFE_TEXT).await.is_none());
}

#[tokio::test]
async fn unreachable_endpoint_yields_no_result() {
    let cfg = config("http://127.0.0.1:9/plain".into(), Some(KEY));
    let provider = GeminiProvider::new(&cfg).expect("provider");
    assert!(provider.classify(SAFE_TEXT).await.is_none());
}

#[tokio::test]
async fn missing_key_disables_the_stage() {
    let cfg = config("http://127.0.0.1:9/plain".into(), None);
    assert!(GeminiProvider::new(&cfg).is_err());
    assert_eq!(build_classifier(&cfg).provider_name(), "disabled");
}

#[tokio::test]
async fn analyzer_uses_ai_when_rules_are_silent() {
    let base = spawn_stub().await;
    let analyzer = Analyzer::from_ai_config(&config(format!("{base}/fenced"), Some(KEY)));
    let out = analyzer.analyze_staged(SAFE_TEXT).await;
    assert_eq!(out.stage, Stage::Ai);
    assert_eq!(out.result.verdict, Verdict::Scam);
    assert_eq!(out.result.summary, "Classic advance-fee lure.");
}

#[tokio::test]
async fn analyzer_falls_back_when_ai_breaks() {
    let base = spawn_stub().await;
    for mode in ["error", "slow", "prose"] {
        let analyzer = Analyzer::from_ai_config(&config(format!("{base}/{mode}"), Some(KEY)));
        let out = analyzer.analyze_staged(SAFE_TEXT).await;
        assert_eq!(out.stage, Stage::Default, "{mode}");
        assert_eq!(out.result.confidence, 55);
    }
}

/// Collects everything the fmt layer writes.
#[derive(Clone, Default)]
struct LogBuf(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LogBuf {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

#[tokio::test]
async fn transport_failures_never_log_the_key() {
    const SECRET: &str = "SUPERSECRETKEY";
    let logs = LogBuf::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let base = spawn_stub().await;
    for endpoint in ["http://127.0.0.1:9/gen".to_string(), format!("{base}/slow")] {
        let provider = GeminiProvider::new(&config(endpoint, Some(SECRET))).expect("provider");
        assert!(provider.classify(SAFE_TEXT).await.is_none());
    }

    let out = logs.contents();
    assert!(out.contains("AI stage gave no result"), "failure should be logged: {out}");
    assert!(!out.contains(SECRET), "key leaked into logs: {out}");
}
