//! Prompt rendering for the relevance judge.

use crate::candidate::{Candidate, CandidateId, QueryContext};

/// Guardrail prepended to every judge call: slides come only from the uploaded knowledge base.
pub const SYSTEM_PROMPT: &str = "You are analyzing slides from a CONTROLLED KNOWLEDGE BASE only. \
These slides come from approved, uploaded presentations. Do NOT reference or suggest external \
content, websites or resources. Rate relevance strictly from the slide text you are given.";

/// One batch as sent to the judge: ids in batch order plus the rendered prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct JudgeBatch {
    /// 1-based batch number, for logs.
    pub number: usize,
    pub ids: Vec<CandidateId>,
    pub system: String,
    pub user: String,
}

pub fn render_context(ctx: &QueryContext) -> String {
    format!(
        "Use Case: {}\nCustomer: {}\nIndustry: {}\nTarget Audience: {}\nStyle: {}",
        ctx.use_case,
        ctx.customer,
        ctx.industry,
        ctx.target_audience.as_deref().unwrap_or("General"),
        ctx.style
    )
}

pub fn render_candidate(index: usize, c: &Candidate) -> String {
    format!(
        "Slide index {index} (id: {}):\nTitle: {}\nContent: {}\nType: {}",
        c.id,
        c.title,
        c.content,
        c.slide_type.as_str()
    )
}

pub fn render_batch(number: usize, ctx: &QueryContext, batch: &[Candidate]) -> JudgeBatch {
    let slides = batch
        .iter()
        .enumerate()
        .map(|(i, c)| render_candidate(i, c))
        .collect::<Vec<_>>()
        .join("\n\n");
    let user = format!(
        "Analyze the following slides for relevance to the given context.\n\
Rate each slide from 0.0 to 1.0 based on how well it matches the requirements.\n\
Consider content relevance, visual appeal, and appropriateness for the target audience.\n\n\
Context:\n{}\n\nSlides to analyze:\n{}\n\n\
Return a JSON array with one entry per slide, using the slide index shown above:\n\
[{{\"index\": 0, \"score\": 0.8, \"reason\": \"Highly relevant to use case\"}}, ...]",
        render_context(ctx),
        slides
    );
    JudgeBatch {
        number,
        ids: batch.iter().map(|c| c.id.clone()).collect(),
        system: SYSTEM_PROMPT.to_string(),
        user,
    }
}
