//! Brand ↔ domain mismatch: a brand name mentioned without any of its
//! legitimate domains is treated as an impersonation signal.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tracing::warn;

pub const DEFAULT_BRANDS_PATH: &str = "config/brands.json";
pub const ENV_BRANDS_PATH: &str = "BRANDS_CONFIG_PATH";
pub const ENV_MISMATCH_POLICY: &str = "BRAND_MISMATCH_POLICY";

/// How many brand mentions the detector inspects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchPolicy {
    /// Decide on the first brand (in table order) found in the text.
    #[default]
    FirstMention,
    /// Report a mismatch if any mentioned brand lacks its domains.
    AllMentions,
}

impl MismatchPolicy {
    /// Unrecognized values fall back to `FirstMention`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "all_mentions" | "all" => MismatchPolicy::AllMentions,
            _ => MismatchPolicy::FirstMention,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandEntry {
    pub brand: String,
    pub domains: Vec<String>,
}

/// Ordered brand table; loaded once at startup and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BrandDomainTable {
    entries: Vec<BrandEntry>,
}

impl Default for BrandDomainTable {
    fn default() -> Self {
        Self::from_pairs(&[
            ("bank of india", &["bankofindia.co.in"]),
            ("india bank", &["bankofindia.co.in"]),
            ("amazon", &["amazon.in", "amazon.com"]),
            ("google", &["google.com"]),
            ("gpt", &["openai.com"]),
            ("whatsapp", &["whatsapp.com"]),
        ])
    }
}

impl BrandDomainTable {
    pub fn from_pairs(pairs: &[(&str, &[&str])]) -> Self {
        let entries = pairs
            .iter()
            .map(|(brand, domains)| BrandEntry {
                brand: brand.to_lowercase(),
                domains: domains.iter().map(|d| d.to_lowercase()).collect(),
            })
            .collect();
        Self { entries }
    }

    /// JSON array of `{ "brand": ..., "domains": [...] }`; order is preserved.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading brand table {}", path.display()))?;
        let mut table: BrandDomainTable = serde_json::from_str(&data)
            .with_context(|| format!("parsing brand table {}", path.display()))?;
        for e in &mut table.entries {
            e.brand = e.brand.trim().to_lowercase();
            e.domains = e.domains.iter().map(|d| d.trim().to_lowercase()).collect();
        }
        table.entries.retain(|e| !e.brand.is_empty());
        Ok(table)
    }

    /// Startup loader: a missing file means the built-in table, a broken one
    /// is logged and replaced by it.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        Self::load_from_file(path).unwrap_or_else(|e| {
            warn!(error = %format!("{e:#}"), "brand table unusable, using built-in");
            Self::default()
        })
    }

    pub fn entries(&self) -> &[BrandEntry] {
        &self.entries
    }

    /// Expects normalized (lowercased) text.
    pub fn mismatch(&self, normalized: &str, policy: MismatchPolicy) -> bool {
        let mut mentioned = self
            .entries
            .iter()
            .filter(|e| normalized.contains(e.brand.as_str()));
        let lacks_domain = |e: &BrandEntry| !e.domains.iter().any(|d| normalized.contains(d.as_str()));

        match policy {
            MismatchPolicy::FirstMention => mentioned.next().is_some_and(lacks_domain),
            MismatchPolicy::AllMentions => mentioned.any(lacks_domain),
        }
    }
}
