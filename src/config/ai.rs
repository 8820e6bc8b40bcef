// src/config/ai.rs
use anyhow::Context;
use serde::{de, Deserialize, Deserializer, Serialize};
use std::{env, fs, path::Path};
use tracing::warn;

pub const DEFAULT_AI_CONFIG_PATH: &str = "config/ai.json";
pub const ENV_AI_CONFIG_PATH: &str = "AI_CONFIG_PATH";
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_GEMINI_ENDPOINT: &str = "GEMINI_ENDPOINT";
pub const ENV_AI_TIMEOUT_MS: &str = "AI_TIMEOUT_MS";

pub const DEFAULT_GEMINI_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1/models/gemini-1.5-flash:generateContent";

fn default_timeout_ms() -> u64 {
    8_000
}
fn default_connect_timeout_ms() -> u64 {
    3_000
}
fn default_endpoint() -> String {
    DEFAULT_GEMINI_ENDPOINT.to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    #[default]
    Gemini,
    Mock,
}

// Case-insensitive: "Gemini", "gemini" and "GEMINI" are all accepted.
impl<'de> Deserialize<'de> for AiProvider {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        match raw.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(AiProvider::Gemini),
            "mock" => Ok(AiProvider::Mock),
            _ => Err(de::Error::unknown_variant(&raw, &["gemini", "mock"])),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiConfig {
    pub enabled: bool,
    #[serde(default)]
    pub provider: AiProvider,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Literal key, or "ENV" to read `GEMINI_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Request timeout; the orchestrator caps the whole AI stage at the same value.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: AiProvider::Gemini,
            endpoint: default_endpoint(),
            api_key: None,
            timeout_ms: default_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl AiConfig {
    /// True when the AI stage should actually be attempted.
    pub fn is_active(&self) -> bool {
        if !self.enabled {
            return false;
        }
        match self.provider {
            AiProvider::Mock => true,
            AiProvider::Gemini => self
                .api_key
                .as_deref()
                .is_some_and(|k| !k.trim().is_empty()),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading AI config {}", path.display()))?;
        let mut cfg: AiConfig = serde_json::from_str(&data)
            .with_context(|| format!("parsing AI config {}", path.display()))?;

        // Resolve api key if "ENV"
        let wants_env = cfg
            .api_key
            .as_deref()
            .is_some_and(|k| k.trim().eq_ignore_ascii_case("env"));
        if wants_env {
            cfg.api_key = env_nonempty(ENV_GEMINI_API_KEY);
        }

        if cfg.enabled && !cfg.is_active() {
            warn!(
                "AI enabled in {} but no API key resolved; AI stage disabled",
                path.display()
            );
        }

        cfg.sanitize();
        Ok(cfg)
    }

    /// Env-only config: enabled iff `GEMINI_API_KEY` is set and non-empty.
    pub fn from_env() -> Self {
        let api_key = env_nonempty(ENV_GEMINI_API_KEY);
        let mut cfg = Self {
            enabled: api_key.is_some(),
            endpoint: env_nonempty(ENV_GEMINI_ENDPOINT).unwrap_or_else(default_endpoint),
            api_key,
            timeout_ms: env_nonempty(ENV_AI_TIMEOUT_MS)
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_timeout_ms),
            ..Self::default()
        };
        cfg.sanitize();
        cfg
    }

    /// Startup entry: config file (`AI_CONFIG_PATH` or `config/ai.json`) if
    /// present, otherwise environment only. A broken file is logged and
    /// replaced by the environment config rather than failing startup.
    pub fn load() -> Self {
        let path = env::var(ENV_AI_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_AI_CONFIG_PATH.into());
        if !Path::new(&path).exists() {
            return Self::from_env();
        }
        match Self::load_from_file(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "AI config unusable, using environment");
                Self::from_env()
            }
        }
    }

    fn sanitize(&mut self) {
        if self.timeout_ms == 0 {
            self.timeout_ms = default_timeout_ms();
        }
        if self.connect_timeout_ms == 0 || self.connect_timeout_ms > self.timeout_ms {
            self.connect_timeout_ms = default_connect_timeout_ms().min(self.timeout_ms);
        }
        if self.endpoint.trim().is_empty() {
            self.endpoint = default_endpoint();
        }
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
