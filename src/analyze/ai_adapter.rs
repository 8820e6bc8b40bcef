//! AI fallback: a pluggable, fallible classifier consulted only when the rule
//! engine has no verdict.
//!
//! Every failure (transport, HTTP status, missing payload, unparsable or
//! out-of-schema JSON) collapses to `None` at the `Classifier` boundary.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ai::{AiConfig, AiProvider};
use crate::verdict::{AnalysisResult, RiskLevel, SourceLink, Verdict};

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

pub type ClassifyFuture<'a> = Pin<Box<dyn Future<Output = Option<AnalysisResult>> + Send + 'a>>;

/// Optional external oracle. `None` means "no result", never an error.
pub trait Classifier: Send + Sync {
    fn classify<'a>(&'a self, text: &'a str) -> ClassifyFuture<'a>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynClassifier = Arc<dyn Classifier>;

/// Build the classifier described by `config`. Disabled or key-less configs
/// yield `DisabledClient`.
pub fn build_classifier(config: &AiConfig) -> DynClassifier {
    if !config.is_active() {
        return Arc::new(DisabledClient);
    }
    match config.provider {
        AiProvider::Gemini => match GeminiProvider::new(config) {
            Ok(p) => Arc::new(p),
            Err(e) => {
                warn!(error = %e, "AI classifier unavailable, falling back to disabled");
                Arc::new(DisabledClient)
            }
        },
        AiProvider::Mock => Arc::new(MockClassifier::new(Some(AnalysisResult::new(
            Verdict::Safe,
            60,
            RiskLevel::Low,
            "No scam indicators found (mock classifier).",
        )))),
    }
}

// ------------------------------------------------------------
// Gemini provider
// ------------------------------------------------------------

const PROMPT_HEADER: &str = "You are a cybersecurity expert specializing in scam and phishing detection.
Respond ONLY in JSON, with no prose and no markdown.

{
  \"verdict\": \"SAFE | SCAM | SUSPICIOUS\",
  \"confidence\": number (0-100),
  \"summary\": string,
  \"riskLevel\": \"low | medium | high\",
  \"reasoning\": string[],
  \"sources\": [{ \"label\": string, \"url\": string }]
}

Text:
";

pub const API_KEY_HEADER: &str = "x-goog-api-key";

pub fn build_prompt(text: &str) -> String {
    format!("{PROMPT_HEADER}{text}\n")
}

/// Calls a Gemini-style `generateContent` endpoint. The key travels in the
/// `x-goog-api-key` header, never in the URL, so transport errors cannot leak it.
pub struct GeminiProvider {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl GeminiProvider {
    pub fn new(config: &AiConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("scam-verdict/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .context("building reqwest client")?;
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| anyhow!("missing API key"))?;
        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            api_key,
        })
    }

    async fn request(&self, text: &str) -> anyhow::Result<AnalysisResult> {
        #[derive(Serialize)]
        struct Part<'a> {
            text: &'a str,
        }
        #[derive(Serialize)]
        struct Content<'a> {
            parts: Vec<Part<'a>>,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            contents: Vec<Content<'a>>,
        }
        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            candidates: Vec<RespCandidate>,
        }
        #[derive(Deserialize)]
        struct RespCandidate {
            content: Option<CandidateContent>,
        }
        #[derive(Deserialize)]
        struct CandidateContent {
            #[serde(default)]
            parts: Vec<RespPart>,
        }
        #[derive(Deserialize)]
        struct RespPart {
            text: Option<String>,
        }

        let prompt = build_prompt(text);
        let req = Req {
            contents: vec![Content {
                parts: vec![Part { text: &prompt }],
            }],
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(&req)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("sending classifier request")?;

        let status = resp.status();
        if !status.is_success() {
            bail!("classifier returned HTTP {status}");
        }

        let body: Resp = resp
            .json()
            .await
            .map_err(reqwest::Error::without_url)
            .context("decoding classifier envelope")?;
        let raw = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| anyhow!("classifier reply had no text payload"))?;

        parse_reply(&raw)
    }
}

impl Classifier for GeminiProvider {
    fn classify<'a>(&'a self, text: &'a str) -> ClassifyFuture<'a> {
        Box::pin(async move {
            match self.request(text).await {
                Ok(result) => Some(result),
                Err(e) => {
                    warn!(provider = "gemini", error = %format!("{e:#}"), "AI stage gave no result");
                    None
                }
            }
        })
    }
    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}

// ------------------------------------------------------------
// Disabled + mock classifiers
// ------------------------------------------------------------

/// Returns `None` always; used when no credential is configured.
pub struct DisabledClient;

impl Classifier for DisabledClient {
    fn classify<'a>(&'a self, _text: &'a str) -> ClassifyFuture<'a> {
        Box::pin(async { None })
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Deterministic stand-in for local runs and tests. Counts its invocations.
pub struct MockClassifier {
    fixed: Option<AnalysisResult>,
    calls: AtomicUsize,
}

impl MockClassifier {
    /// `None` makes the mock answer "no result".
    pub fn new(fixed: Option<AnalysisResult>) -> Self {
        Self {
            fixed,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Classifier for MockClassifier {
    fn classify<'a>(&'a self, _text: &'a str) -> ClassifyFuture<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let out = self.fixed.clone();
        Box::pin(async move { out })
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

// ------------------------------------------------------------
// Reply parsing + validation
// ------------------------------------------------------------

static FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)```(?:json)?").expect("fence regex"));

/// Remove markdown code-fence markers and surrounding whitespace.
pub fn strip_code_fences(raw: &str) -> String {
    FENCE.replace_all(raw, "").trim().to_string()
}

/// Shape the model is asked for; every field optional until validated.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    verdict: Option<String>,
    confidence: Option<f64>,
    summary: Option<String>,
    risk_level: Option<String>,
    reasoning: Option<Vec<String>>,
    sources: Option<Vec<SourceLink>>,
}

/// Strip fences, parse, and validate a model reply.
pub fn parse_reply(raw: &str) -> anyhow::Result<AnalysisResult> {
    let cleaned = strip_code_fences(raw);
    let candidate: Candidate =
        serde_json::from_str(&cleaned).context("classifier reply is not the expected JSON")?;
    let result = validate(candidate)?;
    debug!(verdict = result.verdict.as_str(), confidence = result.confidence, "AI reply accepted");
    Ok(result)
}

fn validate(c: Candidate) -> anyhow::Result<AnalysisResult> {
    let verdict = match c
        .verdict
        .as_deref()
        .map(|v| v.trim().to_ascii_uppercase())
        .as_deref()
    {
        Some("SCAM") => Verdict::Scam,
        Some("SUSPICIOUS") => Verdict::Suspicious,
        Some("SAFE") => Verdict::Safe,
        Some(other) => bail!("verdict {other:?} outside SCAM/SUSPICIOUS/SAFE"),
        None => bail!("verdict missing"),
    };

    let risk_level = match c
        .risk_level
        .as_deref()
        .map(|v| v.trim().to_ascii_lowercase())
        .as_deref()
    {
        Some("low") => RiskLevel::Low,
        Some("medium") => RiskLevel::Medium,
        Some("high") => RiskLevel::High,
        Some(other) => bail!("riskLevel {other:?} outside low/medium/high"),
        None => bail!("riskLevel missing"),
    };

    let confidence = match c.confidence {
        Some(n) if n.is_finite() && (0.0..=100.0).contains(&n) => n.round() as u8,
        Some(n) => bail!("confidence {n} outside 0..=100"),
        None => bail!("confidence missing"),
    };

    let summary = c
        .summary
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow!("summary missing"))?;

    Ok(AnalysisResult {
        verdict,
        confidence,
        summary,
        risk_level,
        reasoning: c.reasoning.unwrap_or_default(),
        sources: c.sources.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD: &str = r#"{"verdict":"SUSPICIOUS","confidence":64,"summary":"Looks like a lure.","riskLevel":"medium","reasoning":["Unsolicited offer"],"sources":[{"label":"CERT-In","url":"https://www.cert-in.org.in"}]}"#;

    #[test]
    fn plain_json_is_accepted() {
        let r = parse_reply(GOOD).unwrap();
        assert_eq!(r.verdict, Verdict::Suspicious);
        assert_eq!(r.confidence, 64);
        assert_eq!(r.risk_level, RiskLevel::Medium);
        assert_eq!(r.reasoning, vec!["Unsolicited offer"]);
        assert_eq!(r.sources[0].label, "CERT-In");
    }

    #[test]
    fn fenced_json_is_accepted() {
        let fenced = format!("```json\n{GOOD}\n```");
        assert_eq!(parse_reply(&fenced).unwrap().confidence, 64);
        let upper = format!("```JSON\n{GOOD}\n```\n");
        assert!(parse_reply(&upper).is_ok());
    }

    #[test]
    fn lowercase_enums_are_normalized() {
        let raw = r#"{"verdict":"scam","confidence":90.4,"summary":"x","riskLevel":"HIGH"}"#;
        let r = parse_reply(raw).unwrap();
        assert_eq!(r.verdict, Verdict::Scam);
        assert_eq!(r.risk_level, RiskLevel::High);
        assert_eq!(r.confidence, 90);
        assert!(r.reasoning.is_empty() && r.sources.is_empty());
    }

    #[test]
    fn schema_violations_are_rejected() {
        for raw in [
            "not json at all",
            r#"{"verdict":"TRUE","confidence":50,"summary":"x","riskLevel":"low"}"#,
            r#"{"verdict":"ERROR","confidence":50,"summary":"x","riskLevel":"low"}"#,
            r#"{"verdict":"SAFE","confidence":150,"summary":"x","riskLevel":"low"}"#,
            r#"{"verdict":"SAFE","confidence":-1,"summary":"x","riskLevel":"low"}"#,
            r#"{"verdict":"SAFE","confidence":50,"summary":"  ","riskLevel":"low"}"#,
            r#"{"verdict":"SAFE","confidence":50,"summary":"x","riskLevel":"severe"}"#,
            r#"{"verdict":"SAFE","summary":"x","riskLevel":"low"}"#,
        ] {
            assert!(parse_reply(raw).is_err(), "should reject: {raw}");
        }
    }

    #[test]
    fn prompt_embeds_text_after_schema() {
        let p = build_prompt("win a free phone");
        assert!(p.contains("\"riskLevel\""));
        assert!(p.trim_end().ends_with("win a free phone"));
    }

    #[tokio::test]
    async fn mock_counts_calls() {
        let mock = MockClassifier::new(None);
        assert!(mock.classify("anything").await.is_none());
        assert!(mock.classify("anything").await.is_none());
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test]
    async fn disabled_config_builds_disabled_client() {
        let c = build_classifier(&AiConfig::default());
        assert_eq!(c.provider_name(), "disabled");
        assert!(c.classify("some text here").await.is_none());
    }
}
