// src/analyze/mod.rs
//! Verdict pipeline entry: Guard → rules → AI fallback → safe default.
//!
//! Every stage either returns a terminal `AnalysisResult` or falls through to
//! the next one. The chain runs forward once per call; the only shared state
//! is read-only configuration handed to `Analyzer` at construction.

pub mod ai_adapter;
pub mod brands;
pub mod debug;
pub mod flags;
pub mod rules;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ai::AiConfig;
use crate::verdict::AnalysisResult;

// Re-export convenient types.
pub use crate::analyze::ai_adapter::{build_classifier, Classifier, DisabledClient, DynClassifier};
pub use crate::analyze::brands::{BrandDomainTable, MismatchPolicy};
pub use crate::analyze::flags::{FlagExtractor, FlagSet};
pub use crate::analyze::rules::RuleEngine;

/// Inputs shorter than this (in chars, after trimming) are not analyzed.
pub const MIN_TEXT_CHARS: usize = 10;

/// Lowercase and trim.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Which stage produced the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Guard,
    Rules,
    Ai,
    Default,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Guard => "guard",
            Stage::Rules => "rules",
            Stage::Ai => "ai",
            Stage::Default => "default",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub result: AnalysisResult,
    pub stage: Stage,
}

/// Intermediate view of the rule stage, for debugging.
#[derive(Debug, Clone, Serialize)]
pub struct Inspection {
    pub id: String,
    pub flags: FlagSet,
    pub mismatch: bool,
    pub rules: Option<AnalysisResult>,
}

pub struct Analyzer {
    flags: FlagExtractor,
    brands: BrandDomainTable,
    policy: MismatchPolicy,
    rules: RuleEngine,
    classifier: DynClassifier,
    ai_timeout: Duration,
}

impl Analyzer {
    /// Built-in tables with the given classifier.
    pub fn new(classifier: DynClassifier, ai_timeout: Duration) -> Self {
        Self {
            flags: FlagExtractor::default(),
            brands: BrandDomainTable::default(),
            policy: MismatchPolicy::default(),
            rules: RuleEngine::default(),
            classifier,
            ai_timeout,
        }
    }

    /// Built-in tables, classifier built from `config`.
    pub fn from_ai_config(config: &AiConfig) -> Self {
        Self::new(
            build_classifier(config),
            Duration::from_millis(config.timeout_ms),
        )
    }

    /// Rules only; the AI stage always yields no result.
    pub fn offline() -> Self {
        Self::new(Arc::new(DisabledClient), Duration::from_secs(1))
    }

    pub fn with_brands(mut self, brands: BrandDomainTable) -> Self {
        self.brands = brands;
        self
    }

    pub fn with_policy(mut self, policy: MismatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_flags(mut self, flags: FlagExtractor) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_rules(mut self, rules: RuleEngine) -> Self {
        self.rules = rules;
        self
    }

    pub fn classifier_name(&self) -> &'static str {
        self.classifier.provider_name()
    }

    pub async fn analyze(&self, text: &str) -> AnalysisResult {
        self.analyze_staged(text).await.result
    }

    pub async fn analyze_staged(&self, text: &str) -> Outcome {
        let normalized = normalize(text);
        let id = anon_hash(&normalized);

        let outcome = self.run_stages(text, &normalized, &id).await;

        info!(
            target: "verdict",
            %id,
            stage = outcome.stage.as_str(),
            verdict = outcome.result.verdict.as_str(),
            confidence = outcome.result.confidence,
            "text analyzed"
        );
        metrics::counter!(
            "verdict_total",
            "stage" => outcome.stage.as_str(),
            "verdict" => outcome.result.verdict.as_str()
        )
        .increment(1);

        outcome
    }

    async fn run_stages(&self, raw: &str, normalized: &str, id: &str) -> Outcome {
        if normalized.chars().count() < MIN_TEXT_CHARS {
            return Outcome {
                result: AnalysisResult::too_short(),
                stage: Stage::Guard,
            };
        }

        if let Some(result) = self.rule_stage(normalized) {
            return Outcome {
                result,
                stage: Stage::Rules,
            };
        }

        match tokio::time::timeout(self.ai_timeout, self.classifier.classify(raw.trim())).await {
            Ok(Some(result)) => {
                return Outcome {
                    result,
                    stage: Stage::Ai,
                }
            }
            Ok(None) => {}
            Err(_) => warn!(
                target: "verdict",
                %id,
                provider = self.classifier.provider_name(),
                timeout_ms = self.ai_timeout.as_millis() as u64,
                "AI stage timed out"
            ),
        }

        Outcome {
            result: AnalysisResult::default_safe(),
            stage: Stage::Default,
        }
    }

    /// Flags + mismatch + tier table over already-normalized text.
    pub fn rule_stage(&self, normalized: &str) -> Option<AnalysisResult> {
        let flags = self.flags.extract(normalized);
        let mismatch = self.brands.mismatch(normalized, self.policy);
        debug!(
            target: "verdict",
            flags = ?flags.triggered(),
            mismatch,
            "signals extracted"
        );
        self.rules.classify(&flags, mismatch)
    }

    /// Same work as the rule stage, but returns the intermediate signals.
    pub fn inspect(&self, text: &str) -> Inspection {
        let normalized = normalize(text);
        let flags = self.flags.extract(&normalized);
        let mismatch = self.brands.mismatch(&normalized, self.policy);
        let rules = self.rules.classify(&flags, mismatch);
        Inspection {
            id: anon_hash(&normalized),
            flags,
            mismatch,
            rules,
        }
    }
}

/// First 6 bytes of SHA-256, hex. Lets logs correlate a text without storing it.
pub fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
