//! Scam verdict service — binary entrypoint.
//! Boots the Axum HTTP server: configuration, tracing, metrics, routes.

use scam_verdict::analyze::debug as debug_routes;
use scam_verdict::api::{self, AppState};
use scam_verdict::metrics::Metrics;
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - VERDICT_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("VERDICT_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("verdict=debug,info"));

    // The runtime may already have installed a subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let metrics = Metrics::init()?;

    // All configuration is read here, once; the pipeline never touches env.
    let state = AppState::new(scam_verdict::analyzer_from_env());
    tracing::info!(
        classifier = state.analyzer.classifier_name(),
        "analyzer ready"
    );

    let router = if debug_routes::enabled_from_env() {
        api::router_with_debug(state)
    } else {
        api::router(state)
    };

    Ok(router.merge(metrics.router()).into())
}
