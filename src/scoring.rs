//! Score fusion and confidence tiers.
//!
//! `combined = w_judge * judge + w_similarity * similarity`, inputs clamped to [0,1]
//! and weights normalised by their sum (defaults 0.7 / 0.3 are exact).
//!
//! Tiers: combined >= high -> High, >= medium -> Medium, else Low.

use serde::Deserialize;
use std::cmp::Ordering;

use crate::candidate::{Candidate, ConfidenceTier, SlideScore};

/// Fusion weights for the two judges.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct FusionWeights {
    #[serde(default = "default_judge_weight")]
    pub judge_weight: f32,
    #[serde(default = "default_similarity_weight")]
    pub similarity_weight: f32,
}

fn default_judge_weight() -> f32 {
    0.7
}
fn default_similarity_weight() -> f32 {
    0.3
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            judge_weight: default_judge_weight(),
            similarity_weight: default_similarity_weight(),
        }
    }
}

/// Tier boundaries (inclusive lower bounds).
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct TierThresholds {
    #[serde(default = "default_high")]
    pub high: f32,
    #[serde(default = "default_medium")]
    pub medium: f32,
}

fn default_high() -> f32 {
    0.8
}
fn default_medium() -> f32 {
    0.6
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            high: default_high(),
            medium: default_medium(),
        }
    }
}

fn c01(x: f32) -> f32 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

/// Weighted fusion. Always within [0,1] for finite weights.
pub fn combined_score(judge: f32, similarity: f32, w: &FusionWeights) -> f32 {
    let wj = w.judge_weight.max(0.0);
    let ws = w.similarity_weight.max(0.0);
    let denom = wj + ws;
    if denom <= 1e-6 {
        return 0.0;
    }
    ((c01(judge) * wj + c01(similarity) * ws) / denom).clamp(0.0, 1.0)
}

pub fn classify(combined: f32, t: &TierThresholds) -> ConfidenceTier {
    if combined >= t.high {
        ConfidenceTier::High
    } else if combined >= t.medium {
        ConfidenceTier::Medium
    } else {
        ConfidenceTier::Low
    }
}

/// A candidate with its run scores and original input position (tie-breaker).
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub score: SlideScore,
    pub position: usize,
}

impl ScoredCandidate {
    pub fn combined(&self) -> f32 {
        self.score.combined_score
    }
}

/// Descending combined score, then input position.
pub fn by_score_desc(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.combined()
        .partial_cmp(&a.combined())
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.position.cmp(&b.position))
}

/// Candidates bucketed by tier, each bucket ordered by [`by_score_desc`].
#[derive(Debug, Default, Clone)]
pub struct TieredCandidates {
    pub high: Vec<ScoredCandidate>,
    pub medium: Vec<ScoredCandidate>,
    pub low: Vec<ScoredCandidate>,
}

impl TieredCandidates {
    pub fn from_scored(scored: Vec<ScoredCandidate>) -> Self {
        let mut out = Self::default();
        for sc in scored {
            match sc.score.confidence {
                ConfidenceTier::High => out.high.push(sc),
                ConfidenceTier::Medium => out.medium.push(sc),
                ConfidenceTier::Low => out.low.push(sc),
            }
        }
        out.high.sort_by(by_score_desc);
        out.medium.sort_by(by_score_desc);
        out.low.sort_by(by_score_desc);
        out
    }

    pub fn len(&self) -> usize {
        self.high.len() + self.medium.len() + self.low.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All candidates across tiers in descending score order.
    pub fn into_ranked(self) -> Vec<ScoredCandidate> {
        let mut all: Vec<ScoredCandidate> = self.high.into_iter().chain(self.medium).chain(self.low).collect();
        all.sort_by(by_score_desc);
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_are_seventy_thirty() {
        let w = FusionWeights::default();
        assert!((combined_score(1.0, 0.0, &w) - 0.7).abs() < 1e-6);
        assert!((combined_score(0.0, 1.0, &w) - 0.3).abs() < 1e-6);
        assert!((combined_score(0.5, 0.5, &w) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn inputs_are_clamped() {
        let w = FusionWeights::default();
        assert_eq!(combined_score(3.0, 2.0, &w), 1.0);
        assert_eq!(combined_score(-1.0, f32::NAN, &w), 0.0);
    }

    #[test]
    fn combined_stays_in_unit_interval_on_grid() {
        let w = FusionWeights::default();
        for j in 0..=10 {
            for s in 0..=10 {
                let c = combined_score(j as f32 / 10.0, s as f32 / 10.0, &w);
                assert!((0.0..=1.0).contains(&c), "j={j} s={s} c={c}");
            }
        }
    }

    #[test]
    fn tier_boundaries_are_inclusive_below() {
        let t = TierThresholds::default();
        assert_eq!(classify(0.8, &t), ConfidenceTier::High);
        assert_eq!(classify(0.79, &t), ConfidenceTier::Medium);
        assert_eq!(classify(0.6, &t), ConfidenceTier::Medium);
        assert_eq!(classify(0.599, &t), ConfidenceTier::Low);
    }
}
