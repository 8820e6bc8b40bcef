use std::sync::Arc;

use shuttle_axum::axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::analyze::{self, Analyzer};

pub const STAGE_HEADER: &str = "x-verdict-stage";

#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<Analyzer>,
}

impl AppState {
    pub fn new(analyzer: Analyzer) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
        }
    }
}

/// Public routes: `/health` and `/analyze`, CORS open for the extension.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/analyze", post(analyze))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// `router` plus `/debug/flags`.
pub fn router_with_debug(state: AppState) -> Router {
    let debug = analyze::debug::router(state.analyzer.clone());
    router(state).merge(debug)
}

#[derive(serde::Deserialize)]
struct AnalyzeReq {
    #[serde(default)]
    text: Option<String>,
}

async fn analyze(State(state): State<AppState>, Json(body): Json<AnalyzeReq>) -> impl IntoResponse {
    let text = body.text.unwrap_or_default();
    let outcome = state.analyzer.analyze_staged(&text).await;
    ([(STAGE_HEADER, outcome.stage.as_str())], Json(outcome.result))
}
