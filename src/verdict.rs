//! verdict.rs — the single output shape of the pipeline.
//!
//! Serialized field names match what the browser extension renders
//! (`riskLevel` in camelCase, verdicts in UPPERCASE, risk tiers in lowercase).

use serde::{Deserialize, Serialize};

pub const TOO_SHORT_SUMMARY: &str = "Text too short to analyze.";
pub const DEFAULT_SAFE_SUMMARY: &str = "No strong scam or phishing indicators detected.";
pub const DEFAULT_SAFE_REASON: &str = "No high-risk patterns detected";
pub const DEFAULT_SAFE_CONFIDENCE: u8 = 55;

/// Closed set of classification outcomes.
///
/// `Error` exists only so the transport/UI layer can express total failure;
/// the pipeline itself never produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Scam,
    Suspicious,
    Safe,
    Unknown,
    Error,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Scam => "SCAM",
            Verdict::Suspicious => "SUSPICIOUS",
            Verdict::Safe => "SAFE",
            Verdict::Unknown => "UNKNOWN",
            Verdict::Error => "ERROR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Reference link shown under a verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLink {
    pub label: String,
    pub url: String,
}

impl SourceLink {
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub verdict: Verdict,
    /// Heuristic score in 0..=100, not a calibrated probability.
    pub confidence: u8,
    pub summary: String,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub reasoning: Vec<String>,
    #[serde(default)]
    pub sources: Vec<SourceLink>,
}

impl AnalysisResult {
    pub fn new(
        verdict: Verdict,
        confidence: u8,
        risk_level: RiskLevel,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            verdict,
            confidence: confidence.min(100),
            summary: summary.into(),
            risk_level,
            reasoning: Vec::new(),
            sources: Vec::new(),
        }
    }

    /// Guard outcome for input below the minimum analyzable length.
    pub fn too_short() -> Self {
        Self::new(Verdict::Unknown, 0, RiskLevel::Low, TOO_SHORT_SUMMARY)
    }

    /// Terminal outcome when neither the rules nor the AI stage decided.
    pub fn default_safe() -> Self {
        Self::new(
            Verdict::Safe,
            DEFAULT_SAFE_CONFIDENCE,
            RiskLevel::Low,
            DEFAULT_SAFE_SUMMARY,
        )
        .with_reason(DEFAULT_SAFE_REASON)
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reasoning.push(reason.into());
        self
    }

    pub fn with_source(mut self, source: SourceLink) -> Self {
        self.sources.push(source);
        self
    }
}
