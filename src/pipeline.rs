// src/pipeline.rs
//! Slide matching pipeline.
//!
//! pool -> dedupe -> source guard -> similarity + judge -> fusion/tiers -> allocation
//!
//! Similarity and judge failures degrade inside their own modules. Anything that
//! goes wrong after that (a missing verdict, a non-finite score, an output that
//! breaks the deck invariants) is a [`StageError`]; the run then returns the
//! first guarded candidates unscored instead of failing the caller.

use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::candidate::{Candidate, CandidateId, ProcessingAction, QueryContext, SelectedSlide, SlideScore};
use crate::config::EngineConfig;
use crate::judge::{DynJudge, JudgeAdapter, JudgeVerdict};
use crate::metrics::{ensure_metrics_described, MATCH_DURATION_MS, PIPELINE_FALLBACK, SELECTED};
use crate::scoring::{classify, combined_score, ScoredCandidate, TieredCandidates};
use crate::selection::{allocate, SelectionPolicy};
use crate::similarity::similarity_scores;

/// How many guarded candidates the unscored fallback returns.
pub const FALLBACK_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Fusion,
    Allocation,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Fusion => "fusion",
            Stage::Allocation => "allocation",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StageError {
    #[error("no judge verdict for candidate {0}")]
    MissingScore(CandidateId),
    #[error("non-finite combined score for candidate {0}")]
    NonFinite(CandidateId),
    #[error("selection returned {got} slides, cap is {cap}")]
    OverCap { got: usize, cap: usize },
    #[error("candidate {0} selected twice")]
    Duplicate(CandidateId),
    #[error("selection is empty for a non-empty pool")]
    EmptySelection,
}

impl StageError {
    pub fn stage(&self) -> Stage {
        match self {
            StageError::MissingScore(_) | StageError::NonFinite(_) => Stage::Fusion,
            StageError::OverCap { .. } | StageError::Duplicate(_) | StageError::EmptySelection => {
                Stage::Allocation
            }
        }
    }
}

/// Why a run returned unscored output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Degradation {
    pub stage: Stage,
    pub error: String,
}

/// Per-action counts plus a rough token estimate for the downstream renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostSummary {
    pub copy_exact: usize,
    pub minor_enhancement: usize,
    pub full_generation: usize,
    pub estimated_tokens: u32,
}

impl CostSummary {
    pub fn from_slides(slides: &[SelectedSlide]) -> Self {
        let mut out = Self::default();
        for s in slides {
            match s.action {
                ProcessingAction::CopyExact => out.copy_exact += 1,
                ProcessingAction::MinorEnhancement => out.minor_enhancement += 1,
                ProcessingAction::FullGeneration => out.full_generation += 1,
            }
            out.estimated_tokens += s.action.estimated_tokens();
        }
        out
    }
}

/// Engine output for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    pub slides: Vec<SelectedSlide>,
    pub policy: SelectionPolicy,
    pub cost: CostSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degradation: Option<Degradation>,
    pub generated_at: DateTime<Utc>,
}

impl MatchReport {
    pub fn is_degraded(&self) -> bool {
        self.degradation.is_some()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.slides.iter().map(|s| s.candidate.id.as_str()).collect()
    }
}

/// Stateless between calls; share it behind an `Arc` or clone it.
#[derive(Clone)]
pub struct SlideMatcher {
    judge: JudgeAdapter,
    config: EngineConfig,
}

impl SlideMatcher {
    pub fn new(judge: DynJudge, config: EngineConfig) -> Self {
        let adapter = JudgeAdapter::new(judge)
            .batch_size(config.judge.batch_size)
            .default_score(config.judge.default_score);
        Self {
            judge: adapter,
            config,
        }
    }

    pub fn with_policy(mut self, policy: SelectionPolicy) -> Self {
        self.config.selection.policy = policy;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.config.selection.policy
    }

    /// Score and select slides for `ctx`. Never fails.
    pub async fn match_slides(&self, pool: Vec<Candidate>, ctx: &QueryContext) -> MatchReport {
        ensure_metrics_described();
        let started = Instant::now();
        let policy = self.policy();

        let pool = dedupe(pool);
        let pool = self.config.guard.filter(pool);
        info!(
            candidates = pool.len(),
            policy = %policy,
            provider = self.judge.provider_name(),
            "matching slides"
        );

        let (slides, degradation) = if pool.is_empty() {
            (Vec::new(), None)
        } else {
            match self.score_and_select(&pool, ctx).await {
                Ok(slides) => (slides, None),
                Err(e) => {
                    let stage = e.stage();
                    counter!(PIPELINE_FALLBACK, "stage" => stage.as_str()).increment(1);
                    error!(stage = stage.as_str(), error = %e, "pipeline stage failed; returning unscored slides");
                    (
                        fallback(&pool),
                        Some(Degradation {
                            stage,
                            error: e.to_string(),
                        }),
                    )
                }
            }
        };

        for s in &slides {
            counter!(SELECTED, "action" => s.action.as_str()).increment(1);
        }
        let cost = CostSummary::from_slides(&slides);
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        histogram!(MATCH_DURATION_MS).record(elapsed_ms);
        info!(
            selected = slides.len(),
            copy_exact = cost.copy_exact,
            minor_enhancement = cost.minor_enhancement,
            full_generation = cost.full_generation,
            estimated_tokens = cost.estimated_tokens,
            degraded = degradation.is_some(),
            elapsed_ms,
            "slide matching finished"
        );

        MatchReport {
            slides,
            policy,
            cost,
            degradation,
            generated_at: Utc::now(),
        }
    }

    async fn score_and_select(
        &self,
        pool: &[Candidate],
        ctx: &QueryContext,
    ) -> Result<Vec<SelectedSlide>, StageError> {
        let texts: Vec<String> = pool.iter().map(Candidate::similarity_text).collect();
        let similarity = similarity_scores(&ctx.similarity_query(), &texts, self.config.similarity.params());
        let verdicts = self.judge.score_all(ctx, pool).await;

        let scored = self.fuse(pool, &similarity, &verdicts)?;
        let tiers = TieredCandidates::from_scored(scored);
        debug!(
            stage = "classification",
            high = tiers.high.len(),
            medium = tiers.medium.len(),
            low = tiers.low.len(),
            "candidates tiered"
        );

        let picked = allocate(self.policy(), tiers, ctx, &self.config.slots);
        check_selection(&picked, pool.len(), self.config.slots.max)?;

        Ok(picked
            .into_iter()
            .map(|sc| SelectedSlide::scored(sc.candidate, sc.score))
            .collect())
    }

    /// Join both judges on candidate id and classify.
    fn fuse(
        &self,
        pool: &[Candidate],
        similarity: &[f32],
        verdicts: &HashMap<CandidateId, JudgeVerdict>,
    ) -> Result<Vec<ScoredCandidate>, StageError> {
        pool.iter()
            .enumerate()
            .map(|(position, c)| {
                let verdict = verdicts
                    .get(&c.id)
                    .ok_or_else(|| StageError::MissingScore(c.id.clone()))?;
                let sim = similarity.get(position).copied().unwrap_or(0.0);
                let combined = combined_score(verdict.score, sim, &self.config.fusion);
                if !combined.is_finite() {
                    return Err(StageError::NonFinite(c.id.clone()));
                }
                Ok(ScoredCandidate {
                    candidate: c.clone(),
                    score: SlideScore {
                        judge_score: verdict.score,
                        judge_reason: verdict.reason.clone(),
                        similarity_score: sim,
                        combined_score: combined,
                        confidence: classify(combined, &self.config.tiers),
                    },
                    position,
                })
            })
            .collect()
    }
}

/// Keep the first occurrence of every id.
fn dedupe(pool: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen = HashSet::with_capacity(pool.len());
    pool.into_iter()
        .filter(|c| {
            let fresh = seen.insert(c.id.clone());
            if !fresh {
                warn!(id = %c.id, "duplicate candidate id; keeping first occurrence");
            }
            fresh
        })
        .collect()
}

fn check_selection(picked: &[ScoredCandidate], pool_len: usize, cap: usize) -> Result<(), StageError> {
    if picked.len() > cap {
        return Err(StageError::OverCap {
            got: picked.len(),
            cap,
        });
    }
    if picked.is_empty() && pool_len > 0 {
        return Err(StageError::EmptySelection);
    }
    let mut seen = HashSet::with_capacity(picked.len());
    for sc in picked {
        if !seen.insert(&sc.candidate.id) {
            return Err(StageError::Duplicate(sc.candidate.id.clone()));
        }
    }
    Ok(())
}

fn fallback(pool: &[Candidate]) -> Vec<SelectedSlide> {
    pool.iter()
        .take(FALLBACK_LEN)
        .cloned()
        .map(SelectedSlide::unscored)
        .collect()
}
