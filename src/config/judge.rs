// src/config/judge.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use std::{env, fs, path::Path};
use tracing::{info, warn};

use crate::judge::{DisabledJudge, DynJudge, MockJudge, OpenAiJudge};

pub const DEFAULT_JUDGE_CONFIG_PATH: &str = "config/judge.json";
pub const ENV_JUDGE_CONFIG_PATH: &str = "SLIDE_JUDGE_CONFIG_PATH";
pub const ENV_JUDGE_TEST_MODE: &str = "JUDGE_TEST_MODE";
/// Placeholder shipped in sample configs; treated like a missing key.
pub const PLACEHOLDER_KEY: &str = "sk-dummy-key";

fn default_provider() -> String {
    "openai".to_string()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_tokens() -> u32 {
    1000
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Only "openai" (any OpenAI-compatible endpoint) is supported.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// "ENV" means: read from OPENAI_API_KEY.
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_provider(),
            api_key: String::new(),
            model: None,
            api_base: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl JudgeConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        let mut cfg: JudgeConfig = serde_json::from_str(s).context("parsing judge config")?;

        cfg.provider = cfg.provider.trim().to_lowercase();

        // Resolve api key if "ENV"; a missing variable leaves the judge unconfigured.
        if cfg.api_key.trim().eq_ignore_ascii_case("env") {
            cfg.api_key = env::var("OPENAI_API_KEY").unwrap_or_default();
        }

        if !(0.0..=2.0).contains(&cfg.temperature) {
            cfg.temperature = default_temperature();
        }
        if cfg.max_tokens == 0 {
            cfg.max_tokens = default_max_tokens();
        }
        if cfg.timeout_secs == 0 {
            cfg.timeout_secs = default_timeout_secs();
        }
        Ok(cfg)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading judge config from {}", path.display()))?;
        Self::from_json_str(&data).with_context(|| format!("in {}", path.display()))
    }

    /// `$SLIDE_JUDGE_CONFIG_PATH` or `config/judge.json`; no file means disabled.
    pub fn load() -> Result<Self> {
        let path = env::var(ENV_JUDGE_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_JUDGE_CONFIG_PATH.to_string());
        if !Path::new(&path).exists() {
            info!(%path, "no judge config found; judge disabled");
            return Ok(Self::default());
        }
        Self::load_from_file(&path)
    }

    /// Usable key: non-empty and not the sample placeholder.
    pub fn has_key(&self) -> bool {
        let k = self.api_key.trim();
        !k.is_empty() && k != PLACEHOLDER_KEY
    }
}

/// Build the judge for this config.
///
/// * `JUDGE_TEST_MODE=mock` returns a neutral mock judge.
/// * Disabled config, missing key or unknown provider return [`DisabledJudge`].
/// * Otherwise an [`OpenAiJudge`].
pub fn build_judge(cfg: &JudgeConfig) -> DynJudge {
    if env::var(ENV_JUDGE_TEST_MODE).map(|v| v == "mock").unwrap_or(false) {
        info!("judge test mode: using mock judge");
        return Arc::new(MockJudge::constant(0.5));
    }

    if !cfg.enabled {
        return Arc::new(DisabledJudge);
    }

    // Safe diagnostics: provider + key length only.
    info!(provider = %cfg.provider, key_len = cfg.api_key.len(), "judge config loaded");

    match cfg.provider.as_str() {
        "openai" => {
            if !cfg.has_key() {
                warn!("judge enabled but no usable API key; judge disabled");
                return Arc::new(DisabledJudge);
            }
            match OpenAiJudge::new(
                cfg.api_key.clone(),
                cfg.api_base.as_deref(),
                cfg.model.as_deref(),
                Duration::from_secs(cfg.timeout_secs),
            ) {
                Ok(j) => Arc::new(j.sampling(cfg.temperature, cfg.max_tokens)),
                Err(e) => {
                    warn!(error = %e, "could not build HTTP judge; judge disabled");
                    Arc::new(DisabledJudge)
                }
            }
        }
        other => {
            warn!(provider = %other, "unsupported judge provider; judge disabled");
            Arc::new(DisabledJudge)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[serial]
    #[test]
    fn env_key_resolution_and_placeholder() {
        env::remove_var(ENV_JUDGE_TEST_MODE);
        env::set_var("OPENAI_API_KEY", "sk-live-123");
        let cfg = JudgeConfig::from_json_str(r#"{"enabled": true, "provider": "OpenAI", "api_key": "ENV"}"#).unwrap();
        assert_eq!(cfg.provider, "openai");
        assert_eq!(cfg.api_key, "sk-live-123");
        assert!(cfg.has_key());
        assert_eq!(build_judge(&cfg).provider_name(), "openai");

        env::remove_var("OPENAI_API_KEY");
        let cfg = JudgeConfig::from_json_str(r#"{"enabled": true, "api_key": "ENV"}"#).unwrap();
        assert!(!cfg.has_key());
        assert_eq!(build_judge(&cfg).provider_name(), "disabled");

        let cfg = JudgeConfig::from_json_str(r#"{"enabled": true, "api_key": "sk-dummy-key"}"#).unwrap();
        assert_eq!(build_judge(&cfg).provider_name(), "disabled");
    }

    #[serial]
    #[test]
    fn disabled_unknown_and_mock() {
        env::remove_var(ENV_JUDGE_TEST_MODE);
        let cfg = JudgeConfig::from_json_str(r#"{"enabled": false, "api_key": "sk-real"}"#).unwrap();
        assert_eq!(build_judge(&cfg).provider_name(), "disabled");

        let cfg = JudgeConfig::from_json_str(r#"{"enabled": true, "provider": "claude", "api_key": "k"}"#).unwrap();
        assert_eq!(build_judge(&cfg).provider_name(), "disabled");

        env::set_var(ENV_JUDGE_TEST_MODE, "mock");
        assert_eq!(build_judge(&JudgeConfig::default()).provider_name(), "mock");
        env::remove_var(ENV_JUDGE_TEST_MODE);
    }

    #[test]
    fn sampling_values_are_sanitized() {
        let cfg = JudgeConfig::from_json_str(r#"{"temperature": 9.0, "max_tokens": 0, "timeout_secs": 0}"#).unwrap();
        assert_eq!(cfg.temperature, 0.3);
        assert_eq!(cfg.max_tokens, 1000);
        assert_eq!(cfg.timeout_secs, 30);
        assert!(!cfg.enabled);
    }
}
