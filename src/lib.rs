// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod analyze;
pub mod api;
pub mod config;
pub mod metrics;
pub mod verdict;

// ---- Re-exports for stable public API ----
pub use analyze::ai_adapter;
pub use analyze::{normalize, Analyzer, Outcome, Stage};
pub use crate::api::router;
pub use verdict::{AnalysisResult, RiskLevel, SourceLink, Verdict};

use tracing::info;

use crate::analyze::brands::{DEFAULT_BRANDS_PATH, ENV_BRANDS_PATH, ENV_MISMATCH_POLICY};
use crate::analyze::{BrandDomainTable, MismatchPolicy};
use crate::config::ai::AiConfig;

/// Build the production analyzer from files + environment, once, at startup.
///
/// Never fails: a missing or broken brand table falls back to the built-in one,
/// and a missing AI credential disables the AI stage.
pub fn analyzer_from_env() -> Analyzer {
    let ai = AiConfig::load();
    // Safe diagnostics: only provider + enabled + key length
    info!(
        "AI cfg loaded: provider={:?}, active={}, key_len={}",
        ai.provider,
        ai.is_active(),
        ai.api_key.as_deref().map(str::len).unwrap_or(0)
    );

    let brands_path =
        std::env::var(ENV_BRANDS_PATH).unwrap_or_else(|_| DEFAULT_BRANDS_PATH.into());
    let brands = BrandDomainTable::load_or_default(&brands_path);

    let policy = std::env::var(ENV_MISMATCH_POLICY)
        .map(|v| MismatchPolicy::parse(&v))
        .unwrap_or_default();

    Analyzer::from_ai_config(&ai)
        .with_brands(brands)
        .with_policy(policy)
}
