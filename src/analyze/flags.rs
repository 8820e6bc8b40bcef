//! Named boolean signals over normalized text.
//!
//! The pattern table is data: each entry is `(name, regex)`. Adding a signal
//! means adding a row here; the rule tiers look flags up by name.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;

pub const BANK: &str = "bank";
pub const GOVT: &str = "govt";
pub const JOB: &str = "job";
pub const PAYMENT: &str = "payment";
pub const URGENCY: &str = "urgency";
pub const CREDENTIALS: &str = "credentials";
pub const SIM: &str = "sim";
pub const COURIER: &str = "courier";
pub const GIFT: &str = "gift";
pub const SECURITY: &str = "security";
pub const CRYPTO: &str = "crypto";
pub const LINK: &str = "link";
pub const FAKE_DOMAIN: &str = "fakeDomain";

/// Built-in signal table, in evaluation order.
pub const BUILTIN_PATTERNS: &[(&str, &str)] = &[
    (BANK, r"(bank|upi|account|refund|overpayment|transaction)"),
    (GOVT, r"(rbi|income tax|govt|government|irctc|uidai|aadhaar)"),
    (
        JOB,
        r"(job|internship|work from home|resume|interview|hiring|selected)",
    ),
    (PAYMENT, r"(pay|₹|rs|registration|fee|cashback|reward|earn)"),
    (
        URGENCY,
        r"(urgent|action required|final warning|limited time|24 hours|6 hours|act fast|immediately)",
    ),
    (CREDENTIALS, r"(verify|login|password|otp|2fa|kyc|secure)"),
    (SIM, r"(sim card|blocked|verification|service suspension)"),
    (COURIER, r"(package|courier|delivery|tracking|parcel on hold)"),
    (GIFT, r"(gift card|free gift|won|congratulations|reward)"),
    (
        SECURITY,
        r"(suspicious activity|unusual login|new device|security alert)",
    ),
    (
        CRYPTO,
        r"(crypto|bitcoin|investment|double your money|guaranteed profit)",
    ),
    // ASCII word boundaries: an accented or Devanagari neighbour still ends the domain.
    (LINK, r"(?-u:\b)[a-z0-9-]+\.(com|in|co|net|org)(?-u:\b)"),
    (
        FAKE_DOMAIN,
        r"(amaz0n|inbonk|gpt12|clivk|upi-cashback|secure-check|fast-courier|sim-verification|inbank)",
    ),
];

static BUILTIN: Lazy<FlagExtractor> = Lazy::new(|| {
    FlagExtractor::from_table(BUILTIN_PATTERNS).expect("built-in flag patterns compile")
});

/// Result of one extraction pass: every table entry maps to true/false.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlagSet(BTreeMap<String, bool>);

impl FlagSet {
    /// Unknown names read as `false`.
    pub fn get(&self, name: &str) -> bool {
        self.0.get(name).copied().unwrap_or(false)
    }

    pub fn set(&mut self, name: impl Into<String>, value: bool) {
        self.0.insert(name.into(), value);
    }

    /// Names of flags that are set, sorted.
    pub fn triggered(&self) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(_, on)| **on)
            .map(|(k, _)| k.as_str())
            .collect()
    }

    pub fn any(&self) -> bool {
        self.0.values().any(|v| *v)
    }
}

impl<S: Into<String>> FromIterator<(S, bool)> for FlagSet {
    fn from_iter<I: IntoIterator<Item = (S, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

#[derive(Debug, Clone)]
struct Pattern {
    name: String,
    re: Regex,
}

#[derive(Debug, Clone)]
pub struct FlagExtractor {
    patterns: Vec<Pattern>,
}

impl FlagExtractor {
    /// Compile a custom `(name, regex)` table.
    pub fn from_table(table: &[(&str, &str)]) -> Result<Self, regex::Error> {
        let patterns = table
            .iter()
            .map(|(name, src)| {
                Ok(Pattern {
                    name: (*name).to_string(),
                    re: Regex::new(src)?,
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { patterns })
    }

    /// Shared, compiled built-in table.
    pub fn builtin() -> &'static FlagExtractor {
        &BUILTIN
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|p| p.name.as_str())
    }

    /// Expects text already passed through `normalize`.
    pub fn extract(&self, normalized: &str) -> FlagSet {
        self.patterns
            .iter()
            .map(|p| (p.name.clone(), p.re.is_match(normalized)))
            .collect()
    }
}

impl Default for FlagExtractor {
    fn default() -> Self {
        BUILTIN.clone()
    }
}
