//! Debug endpoint: inspect flags, brand mismatch and the rule outcome for a text.
//! Mount in dev only (see `api::router_with_debug`).

use std::collections::HashMap;
use std::sync::Arc;

use shuttle_axum::axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use super::{Analyzer, Inspection};

pub const ENV_DEBUG_ROUTES: &str = "VERDICT_DEBUG_ROUTES";

pub fn enabled_from_env() -> bool {
    std::env::var(ENV_DEBUG_ROUTES).ok().as_deref() == Some("1")
}

pub fn router(analyzer: Arc<Analyzer>) -> Router {
    Router::new()
        .route("/debug/flags", get(get_flags))
        .with_state(analyzer)
}

/// GET /debug/flags?text=...
async fn get_flags(
    State(analyzer): State<Arc<Analyzer>>,
    Query(q): Query<HashMap<String, String>>,
) -> Json<Inspection> {
    let text = q.get("text").cloned().unwrap_or_default();
    Json(analyzer.inspect(&text))
}
