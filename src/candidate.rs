//! Input records (candidates, query context) and the annotated output shape.
//!
//! Candidates are read-only for one engine run. Everything the engine computes
//! (scores, tier, action, cost) lives in [`SlideScore`] / [`SelectedSlide`] and is
//! never written back into the candidate itself.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier assigned by the candidate pool provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(pub String);

impl CandidateId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CandidateId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Layout category of an extracted slide. Unknown labels are kept verbatim in
/// `Other` so they round-trip to the renderer unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SlideType {
    Title,
    #[default]
    Content,
    Chart,
    Image,
    Quote,
    Conclusion,
    Other(String),
}

impl SlideType {
    pub fn as_str(&self) -> &str {
        match self {
            SlideType::Title => "title",
            SlideType::Content => "content",
            SlideType::Chart => "chart",
            SlideType::Image => "image",
            SlideType::Quote => "quote",
            SlideType::Conclusion => "conclusion",
            SlideType::Other(label) => label,
        }
    }
}

impl From<String> for SlideType {
    fn from(label: String) -> Self {
        match label.as_str() {
            "title" => SlideType::Title,
            "content" => SlideType::Content,
            "chart" => SlideType::Chart,
            "image" => SlideType::Image,
            "quote" => SlideType::Quote,
            "conclusion" => SlideType::Conclusion,
            _ => SlideType::Other(label),
        }
    }
}

impl From<&str> for SlideType {
    fn from(label: &str) -> Self {
        SlideType::from(label.to_string())
    }
}

impl From<SlideType> for String {
    fn from(t: SlideType) -> Self {
        match t {
            SlideType::Other(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for SlideType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A previously extracted slide eligible for the generated deck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, alias = "slideType")]
    pub slide_type: SlideType,
    /// Where the slide came from (uploaded deck name, knowledge-base reference, ...).
    #[serde(default, alias = "source_title")]
    pub source: String,
}

impl Candidate {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        slide_type: SlideType,
    ) -> Self {
        Self {
            id: CandidateId::new(id),
            title: title.into(),
            content: content.into(),
            slide_type,
            source: String::new(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Text fed to the similarity scorer: title and body joined by a space.
    pub fn similarity_text(&self) -> String {
        format!("{} {}", self.title, self.content)
    }
}

/// What the deck is for. Built by request handling, consumed read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryContext {
    #[serde(alias = "useCase")]
    pub use_case: String,
    pub customer: String,
    pub industry: String,
    #[serde(default, alias = "targetAudience")]
    pub target_audience: Option<String>,
    #[serde(default = "default_style")]
    pub style: String,
}

fn default_style() -> String {
    "professional".to_string()
}

impl QueryContext {
    pub fn new(
        use_case: impl Into<String>,
        customer: impl Into<String>,
        industry: impl Into<String>,
    ) -> Self {
        Self {
            use_case: use_case.into(),
            customer: customer.into(),
            industry: industry.into(),
            target_audience: None,
            style: default_style(),
        }
    }

    pub fn audience(mut self, audience: impl Into<String>) -> Self {
        self.target_audience = Some(audience.into());
        self
    }

    pub fn style(mut self, style: impl Into<String>) -> Self {
        self.style = style.into();
        self
    }

    /// Query string for the similarity scorer.
    pub fn similarity_query(&self) -> String {
        format!("{} {} {}", self.use_case, self.customer, self.industry)
    }
}

/// Confidence bucket derived from the combined score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

impl ConfidenceTier {
    /// Default downstream treatment for this tier.
    pub fn action(self) -> ProcessingAction {
        match self {
            ConfidenceTier::High => ProcessingAction::CopyExact,
            ConfidenceTier::Medium => ProcessingAction::MinorEnhancement,
            ConfidenceTier::Low => ProcessingAction::FullGeneration,
        }
    }
}

/// How the downstream renderer treats a selected slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingAction {
    CopyExact,
    MinorEnhancement,
    FullGeneration,
}

impl ProcessingAction {
    pub fn cost(self) -> CostTier {
        match self {
            ProcessingAction::CopyExact => CostTier::Zero,
            ProcessingAction::MinorEnhancement => CostTier::Low,
            ProcessingAction::FullGeneration => CostTier::High,
        }
    }

    /// Rough generation tokens the renderer spends on one slide with this action.
    pub fn estimated_tokens(self) -> u32 {
        match self {
            ProcessingAction::CopyExact => 0,
            ProcessingAction::MinorEnhancement => 50,
            ProcessingAction::FullGeneration => 200,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingAction::CopyExact => "copy_exact",
            ProcessingAction::MinorEnhancement => "minor_enhancement",
            ProcessingAction::FullGeneration => "full_generation",
        }
    }
}

/// Qualitative downstream expense. Ordering is cheapest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostTier {
    Zero,
    Low,
    High,
}

/// Per-run scores for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideScore {
    pub judge_score: f32,
    pub judge_reason: String,
    pub similarity_score: f32,
    /// Fused score in `<0.0, 1.0>`.
    pub combined_score: f32,
    pub confidence: ConfidenceTier,
}

/// One entry of the final, annotated slide list handed to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedSlide {
    #[serde(flatten)]
    pub candidate: Candidate,
    /// `None` when the engine fell back to unscored output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<SlideScore>,
    pub action: ProcessingAction,
    pub cost: CostTier,
}

impl SelectedSlide {
    pub fn scored(candidate: Candidate, score: SlideScore) -> Self {
        let action = score.confidence.action();
        Self {
            candidate,
            score: Some(score),
            action,
            cost: action.cost(),
        }
    }

    /// Unscored passthrough; the renderer treats unannotated slides as verbatim copies.
    pub fn unscored(candidate: Candidate) -> Self {
        Self {
            candidate,
            score: None,
            action: ProcessingAction::CopyExact,
            cost: CostTier::Zero,
        }
    }

    pub fn combined_score(&self) -> Option<f32> {
        self.score.as_ref().map(|s| s.combined_score)
    }
}
