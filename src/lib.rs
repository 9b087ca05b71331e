// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod candidate;
pub mod config;
pub mod guard;
pub mod judge;
pub mod metrics;
pub mod pipeline;
pub mod scoring;
pub mod selection;
pub mod similarity;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::candidate::{
    Candidate, CandidateId, ConfidenceTier, CostTier, ProcessingAction, QueryContext, SelectedSlide,
    SlideScore, SlideType,
};
pub use crate::config::{build_judge, EngineConfig, JudgeConfig};
pub use crate::judge::{DisabledJudge, DynJudge, JudgeError, MockJudge, OpenAiJudge, RelevanceJudge};
pub use crate::pipeline::{CostSummary, Degradation, MatchReport, SlideMatcher, Stage, StageError};
pub use crate::selection::SelectionPolicy;
