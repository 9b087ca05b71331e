//! Relevance judge: provider abstraction + batching adapter with neutral fallback.
//!
//! Providers only turn a rendered batch into raw text. The [`JudgeAdapter`] owns
//! batching, parsing and the 0.5 fallback, and resolves every record to a
//! candidate identifier before anything leaves this module.

pub mod openai;
pub mod parse;
pub mod prompt;

use async_trait::async_trait;
use metrics::counter;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::candidate::{Candidate, CandidateId, QueryContext};
use crate::metrics::{JUDGE_BATCHES, JUDGE_PARSE_FAILURES};
use crate::telemetry::anon_hash;
use parse::{parse_judge_response, JudgeRecord};
use prompt::{render_batch, JudgeBatch};

pub use openai::OpenAiJudge;

pub const DEFAULT_BATCH_SIZE: usize = 5;
pub const DEFAULT_JUDGE_SCORE: f32 = 0.5;

pub const REASON_UNAVAILABLE: &str = "AI analysis unavailable";
pub const REASON_FAILED: &str = "AI analysis failed";
pub const REASON_UNPARSED: &str = "Default score";
pub const REASON_MISSING: &str = "No specific analysis";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum JudgeError {
    #[error("no relevance judge configured")]
    Unconfigured,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("judge returned HTTP {0}")]
    Status(u16),
    #[error("judge returned an empty response")]
    EmptyResponse,
    #[error("{0}")]
    Other(String),
}

/// External generative-model judge. Returns the raw response text for one batch.
#[async_trait]
pub trait RelevanceJudge: Send + Sync {
    async fn judge(&self, batch: &JudgeBatch) -> Result<String, JudgeError>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynJudge = Arc<dyn RelevanceJudge>;

/// Always unconfigured; every batch falls back to the neutral score.
pub struct DisabledJudge;

#[async_trait]
impl RelevanceJudge for DisabledJudge {
    async fn judge(&self, _batch: &JudgeBatch) -> Result<String, JudgeError> {
        Err(JudgeError::Unconfigured)
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

type Responder = dyn Fn(&JudgeBatch) -> Result<String, JudgeError> + Send + Sync;

/// Closure-driven judge for tests and offline runs.
pub struct MockJudge {
    respond: Box<Responder>,
}

impl MockJudge {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&JudgeBatch) -> Result<String, JudgeError> + Send + Sync + 'static,
    {
        Self { respond: Box::new(f) }
    }

    /// Rates every slide of every batch with the same score.
    pub fn constant(score: f32) -> Self {
        Self::new(move |b| {
            let recs: Vec<serde_json::Value> = (0..b.ids.len())
                .map(|i| serde_json::json!({"index": i, "score": score, "reason": "Neutral score (mock)"}))
                .collect();
            Ok(serde_json::Value::Array(recs).to_string())
        })
    }

    /// Scores looked up by candidate id; unknown ids are left out of the response.
    pub fn by_id(scores: HashMap<String, f32>) -> Self {
        Self::new(move |b| {
            let recs: Vec<serde_json::Value> = b
                .ids
                .iter()
                .enumerate()
                .filter_map(|(i, id)| {
                    scores
                        .get(id.as_str())
                        .map(|s| serde_json::json!({"index": i, "score": s, "reason": "scripted"}))
                })
                .collect();
            Ok(serde_json::Value::Array(recs).to_string())
        })
    }
}

#[async_trait]
impl RelevanceJudge for MockJudge {
    async fn judge(&self, batch: &JudgeBatch) -> Result<String, JudgeError> {
        (self.respond)(batch)
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Judge result for one candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct JudgeVerdict {
    pub score: f32,
    pub reason: String,
}

impl JudgeVerdict {
    fn fallback(score: f32, reason: &str) -> Self {
        Self {
            score,
            reason: reason.to_string(),
        }
    }
}

/// Batches candidates to the judge and maps results back by identifier.
#[derive(Clone)]
pub struct JudgeAdapter {
    judge: DynJudge,
    batch_size: usize,
    default_score: f32,
}

impl JudgeAdapter {
    pub fn new(judge: DynJudge) -> Self {
        Self {
            judge,
            batch_size: DEFAULT_BATCH_SIZE,
            default_score: DEFAULT_JUDGE_SCORE,
        }
    }

    pub fn batch_size(mut self, n: usize) -> Self {
        self.batch_size = n.max(1);
        self
    }

    pub fn default_score(mut self, s: f32) -> Self {
        self.default_score = s.clamp(0.0, 1.0);
        self
    }

    pub fn provider_name(&self) -> &'static str {
        self.judge.provider_name()
    }

    /// Score every candidate. Never fails: unusable batches get the default score.
    pub async fn score_all(
        &self,
        ctx: &QueryContext,
        candidates: &[Candidate],
    ) -> HashMap<CandidateId, JudgeVerdict> {
        let mut out = HashMap::with_capacity(candidates.len());
        for (i, chunk) in candidates.chunks(self.batch_size).enumerate() {
            let batch = render_batch(i + 1, ctx, chunk);
            out.extend(self.score_batch(&batch).await);
        }
        out
    }

    async fn score_batch(&self, batch: &JudgeBatch) -> Vec<(CandidateId, JudgeVerdict)> {
        let provider = self.judge.provider_name();
        let text = match self.judge.judge(batch).await {
            Ok(text) => text,
            Err(JudgeError::Unconfigured) => {
                counter!(JUDGE_BATCHES, "outcome" => "unconfigured").increment(1);
                info!(batch = batch.number, provider, "judge not configured; using neutral scores");
                return self.all_default(batch, REASON_UNAVAILABLE);
            }
            Err(e) => {
                counter!(JUDGE_BATCHES, "outcome" => "failed").increment(1);
                warn!(batch = batch.number, provider, error = %e, "judge call failed; using neutral scores");
                return self.all_default(batch, REASON_FAILED);
            }
        };

        let Some(records) = parse_judge_response(&text) else {
            counter!(JUDGE_BATCHES, "outcome" => "unparsable").increment(1);
            counter!(JUDGE_PARSE_FAILURES).increment(1);
            warn!(batch = batch.number, provider, response = %anon_hash(&text), "no score list in judge response");
            return self.all_default(batch, REASON_UNPARSED);
        };
        counter!(JUDGE_BATCHES, "outcome" => "ok").increment(1);

        let mut found: HashMap<usize, JudgeVerdict> = HashMap::new();
        for rec in records {
            match rec {
                JudgeRecord::ParsedScore { index, id, score, reason } => {
                    let slot = id
                        .as_deref()
                        .and_then(|id| batch.ids.iter().position(|b| b.as_str() == id))
                        .or(index.filter(|i| *i < batch.ids.len()));
                    match slot {
                        Some(slot) => {
                            found.entry(slot).or_insert(JudgeVerdict { score, reason });
                        }
                        None => debug!(batch = batch.number, ?index, ?id, "judge record names no batch member"),
                    }
                }
                JudgeRecord::ParseFailure(why) => {
                    counter!(JUDGE_PARSE_FAILURES).increment(1);
                    debug!(batch = batch.number, %why, "skipping judge record");
                }
            }
        }

        batch
            .ids
            .iter()
            .enumerate()
            .map(|(slot, id)| {
                let v = found
                    .remove(&slot)
                    .unwrap_or_else(|| JudgeVerdict::fallback(self.default_score, REASON_MISSING));
                (id.clone(), v)
            })
            .collect()
    }

    fn all_default(&self, batch: &JudgeBatch, reason: &str) -> Vec<(CandidateId, JudgeVerdict)> {
        batch
            .ids
            .iter()
            .map(|id| (id.clone(), JudgeVerdict::fallback(self.default_score, reason)))
            .collect()
    }
}
