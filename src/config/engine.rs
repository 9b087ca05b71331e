// src/config/engine.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::guard::SourceGuard;
use crate::judge::{DEFAULT_BATCH_SIZE, DEFAULT_JUDGE_SCORE};
use crate::scoring::{FusionWeights, TierThresholds};
use crate::selection::{SelectionPolicy, SlotLimits};
use crate::similarity::{VectorizerParams, DEFAULT_MAX_FEATURES};

pub const DEFAULT_ENGINE_CONFIG_PATH: &str = "config/engine.toml";
pub const ENV_ENGINE_CONFIG_PATH: &str = "SLIDE_ENGINE_CONFIG_PATH";
pub const ENV_SELECTION_POLICY: &str = "SLIDE_SELECTION_POLICY";

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct SelectionSection {
    #[serde(default)]
    pub policy: SelectionPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct JudgeTuning {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_judge_score")]
    pub default_score: f32,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}
fn default_judge_score() -> f32 {
    DEFAULT_JUDGE_SCORE
}

impl Default for JudgeTuning {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            default_score: default_judge_score(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SimilaritySection {
    #[serde(default = "default_max_features")]
    pub max_features: usize,
}

fn default_max_features() -> usize {
    DEFAULT_MAX_FEATURES
}

impl Default for SimilaritySection {
    fn default() -> Self {
        Self {
            max_features: default_max_features(),
        }
    }
}

impl SimilaritySection {
    pub fn params(&self) -> VectorizerParams {
        VectorizerParams {
            max_features: self.max_features,
            ..VectorizerParams::default()
        }
    }
}

/// Everything tunable about one engine instance. Every field has a default,
/// so an empty file (or no file) gives the stock behaviour.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub selection: SelectionSection,
    #[serde(default)]
    pub fusion: FusionWeights,
    #[serde(default)]
    pub tiers: TierThresholds,
    #[serde(default)]
    pub slots: SlotLimits,
    #[serde(default)]
    pub judge: JudgeTuning,
    #[serde(default)]
    pub similarity: SimilaritySection,
    #[serde(default)]
    pub guard: SourceGuard,
}

impl EngineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: EngineConfig = toml::from_str(s).context("parsing engine config")?;
        Ok(cfg.sanitized())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading engine config from {}", path.display()))?;
        Self::from_toml_str(&data).with_context(|| format!("in {}", path.display()))
    }

    /// `$SLIDE_ENGINE_CONFIG_PATH` (must exist) or `config/engine.toml` (optional),
    /// then the `$SLIDE_SELECTION_POLICY` override.
    pub fn load() -> Result<Self> {
        let mut cfg = match std::env::var(ENV_ENGINE_CONFIG_PATH) {
            Ok(p) => {
                let pb = PathBuf::from(p);
                if !pb.exists() {
                    return Err(anyhow!("{ENV_ENGINE_CONFIG_PATH} points to non-existent path"));
                }
                Self::load_from_file(&pb)?
            }
            Err(_) => {
                let pb = PathBuf::from(DEFAULT_ENGINE_CONFIG_PATH);
                if pb.exists() {
                    Self::load_from_file(&pb)?
                } else {
                    info!("no engine config found; using defaults");
                    Self::default()
                }
            }
        };

        if let Ok(raw) = std::env::var(ENV_SELECTION_POLICY) {
            match raw.parse::<SelectionPolicy>() {
                Ok(p) => cfg.selection.policy = p,
                Err(e) => warn!(error = %e, "ignoring {ENV_SELECTION_POLICY}"),
            }
        }
        Ok(cfg)
    }

    /// Clamp or reset out-of-range values instead of failing.
    pub fn sanitized(mut self) -> Self {
        let w = &mut self.fusion;
        let weights_ok = w.judge_weight.is_finite()
            && w.similarity_weight.is_finite()
            && w.judge_weight >= 0.0
            && w.similarity_weight >= 0.0
            && w.judge_weight + w.similarity_weight > 0.0;
        if !weights_ok {
            warn!(judge = w.judge_weight, similarity = w.similarity_weight, "invalid fusion weights; using defaults");
            self.fusion = FusionWeights::default();
        }

        let t = &mut self.tiers;
        if !(0.0..=1.0).contains(&t.high) {
            t.high = TierThresholds::default().high;
        }
        if !(0.0..=1.0).contains(&t.medium) {
            t.medium = TierThresholds::default().medium;
        }
        if t.medium > t.high {
            std::mem::swap(&mut t.medium, &mut t.high);
        }

        self.slots = self.slots.sanitized();

        self.judge.batch_size = self.judge.batch_size.max(1);
        if !(0.0..=1.0).contains(&self.judge.default_score) {
            self.judge.default_score = DEFAULT_JUDGE_SCORE;
        }

        self.similarity.max_features = self.similarity.max_features.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.selection.policy, SelectionPolicy::CostOptimized);
        assert_eq!(cfg.fusion, FusionWeights::default());
        assert_eq!(cfg.slots, SlotLimits::default());
        assert_eq!(cfg.judge.batch_size, 5);
        assert_eq!(cfg.similarity.max_features, 1000);
        assert!(cfg.guard.enabled);
    }

    #[test]
    fn out_of_range_values_are_sanitized() {
        let cfg = EngineConfig::from_toml_str(
            r#"
            [selection]
            policy = "diversity"
            [fusion]
            judge_weight = -1.0
            [tiers]
            high = 0.5
            medium = 0.7
            [slots]
            max = 40
            [judge]
            batch_size = 0
            default_score = 3.0
            [guard]
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(cfg.selection.policy, SelectionPolicy::Diversity);
        assert_eq!(cfg.fusion, FusionWeights::default());
        assert_eq!((cfg.tiers.medium, cfg.tiers.high), (0.5, 0.7));
        assert_eq!(cfg.slots.max, 15);
        assert_eq!(cfg.judge.batch_size, 1);
        assert_eq!(cfg.judge.default_score, 0.5);
        assert!(!cfg.guard.enabled);
    }

    #[test]
    fn unknown_policy_is_a_parse_error() {
        assert!(EngineConfig::from_toml_str("[selection]\npolicy = \"cheapest\"").is_err());
    }

    #[serial]
    #[test]
    fn env_path_and_policy_override() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("engine.toml");
        fs::write(&p, "[slots]\nhigh = 3\n").unwrap();

        env::set_var(ENV_ENGINE_CONFIG_PATH, p.display().to_string());
        env::set_var(ENV_SELECTION_POLICY, "diversity");
        let cfg = EngineConfig::load().unwrap();
        assert_eq!(cfg.slots.high, 3);
        assert_eq!(cfg.selection.policy, SelectionPolicy::Diversity);

        env::set_var(ENV_ENGINE_CONFIG_PATH, tmp.path().join("missing.toml").display().to_string());
        assert!(EngineConfig::load().is_err());

        env::remove_var(ENV_ENGINE_CONFIG_PATH);
        env::remove_var(ENV_SELECTION_POLICY);
    }
}
