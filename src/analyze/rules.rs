//! Tiered decision table over flags + brand mismatch.
//!
//! Tiers are evaluated top to bottom; the first tier with a satisfied
//! trigger produces the result and nothing below it runs.
//!
//! Each tier lists conditions of two kinds:
//! - `Trigger`:    satisfied → the tier fires, and its reason is recorded
//! - `Annotation`: never fires the tier alone, but adds its reason when true
//!
//! Reasons keep the declared order of the conditions.

use crate::analyze::flags::{
    FlagSet, BANK, COURIER, CREDENTIALS, CRYPTO, FAKE_DOMAIN, GIFT, JOB, LINK, PAYMENT, SECURITY,
    SIM, URGENCY,
};
use crate::verdict::{AnalysisResult, RiskLevel, SourceLink, Verdict};

/// Everything a rule predicate may look at.
#[derive(Debug, Clone, Copy)]
pub struct Signals<'a> {
    pub flags: &'a FlagSet,
    pub mismatch: bool,
}

impl Signals<'_> {
    #[inline]
    pub fn has(&self, name: &str) -> bool {
        self.flags.get(name)
    }
}

pub type Predicate = fn(&Signals<'_>) -> bool;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionKind {
    Trigger,
    Annotation,
}

#[derive(Debug, Clone)]
pub struct Condition {
    pub kind: ConditionKind,
    pub reason: &'static str,
    pub when: Predicate,
}

impl Condition {
    pub fn trigger(reason: &'static str, when: Predicate) -> Self {
        Self {
            kind: ConditionKind::Trigger,
            reason,
            when,
        }
    }

    pub fn annotation(reason: &'static str, when: Predicate) -> Self {
        Self {
            kind: ConditionKind::Annotation,
            reason,
            when,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Tier {
    pub name: &'static str,
    pub verdict: Verdict,
    pub confidence: u8,
    pub risk: RiskLevel,
    pub summary: &'static str,
    pub conditions: Vec<Condition>,
    pub sources: Vec<SourceLink>,
}

impl Tier {
    /// `Some(result)` if any trigger is satisfied.
    pub fn evaluate(&self, s: &Signals<'_>) -> Option<AnalysisResult> {
        let mut fired = false;
        let mut reasoning = Vec::new();
        for c in &self.conditions {
            if (c.when)(s) {
                fired |= c.kind == ConditionKind::Trigger;
                reasoning.push(c.reason.to_string());
            }
        }
        if !fired {
            return None;
        }
        Some(AnalysisResult {
            verdict: self.verdict,
            confidence: self.confidence,
            summary: self.summary.to_string(),
            risk_level: self.risk,
            reasoning,
            sources: self.sources.clone(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct RuleEngine {
    tiers: Vec<Tier>,
}

impl RuleEngine {
    pub fn new(tiers: Vec<Tier>) -> Self {
        Self { tiers }
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// `None` is the "no match" outcome: the caller moves on to the next stage.
    pub fn classify(&self, flags: &FlagSet, mismatch: bool) -> Option<AnalysisResult> {
        let signals = Signals { flags, mismatch };
        self.tiers.iter().find_map(|t| t.evaluate(&signals))
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new(vec![scam_tier(), suspicious_tier()])
    }
}

pub fn scam_tier() -> Tier {
    Tier {
        name: "scam",
        verdict: Verdict::Scam,
        confidence: 97,
        risk: RiskLevel::High,
        summary: "This message strongly matches known scam or phishing patterns involving impersonation, urgency, or fake links.",
        conditions: vec![
            Condition::trigger("Impersonated or suspicious domain detected", |s| {
                s.has(FAKE_DOMAIN)
            }),
            Condition::trigger("Bank-related verification via unofficial link", |s| {
                s.has(BANK) && s.has(LINK) && (s.has(CREDENTIALS) || s.mismatch)
            }),
            Condition::trigger("Job or interview lure asking for action or money", |s| {
                s.has(JOB) && (s.has(PAYMENT) || s.has(LINK))
            }),
            Condition::trigger("SIM blocking threat used to create panic", |s| {
                s.has(SIM) && s.has(URGENCY) && s.has(LINK)
            }),
            Condition::trigger("Fake delivery problem scam", |s| {
                s.has(COURIER) && s.has(LINK)
            }),
            Condition::trigger("Unrealistic reward or giveaway", |s| {
                s.has(GIFT) && s.has(URGENCY)
            }),
            Condition::trigger("Fake security alert with malicious link", |s| {
                s.has(SECURITY) && s.has(LINK)
            }),
            Condition::trigger("High-risk investment scam", |s| {
                s.has(CRYPTO) && s.has(URGENCY)
            }),
            Condition::annotation("Brand name does not match linked domain", |s| s.mismatch),
        ],
        sources: vec![
            SourceLink::new("Indian Cyber Crime Portal", "https://cybercrime.gov.in"),
            SourceLink::new("CERT-In Scam Alerts", "https://www.cert-in.org.in"),
            SourceLink::new(
                "RBI – Digital Payment Frauds",
                "https://www.rbi.org.in/Scripts/FAQView.aspx?Id=164",
            ),
        ],
    }
}

pub fn suspicious_tier() -> Tier {
    Tier {
        name: "suspicious",
        verdict: Verdict::Suspicious,
        confidence: 72,
        risk: RiskLevel::Medium,
        summary: "This message contains elements commonly used in phishing attempts. Verify carefully before taking action.",
        conditions: vec![
            Condition::trigger("Contains external link", |s| s.has(LINK)),
            Condition::trigger("Uses urgency or threats", |s| s.has(URGENCY)),
            Condition::trigger("Requests sensitive account action", |s| s.has(CREDENTIALS)),
            Condition::trigger("Mentions security issues", |s| s.has(SECURITY)),
        ],
        sources: vec![
            SourceLink::new("Google Safe Browsing", "https://safebrowsing.google.com"),
            SourceLink::new("Cyber Crime India", "https://cybercrime.gov.in"),
        ],
    }
}
