// tests/scenarios.rs
// End-to-end matching runs with scripted judges.

use slide_curator::judge::{JudgeError, REASON_FAILED, REASON_UNAVAILABLE};
use slide_curator::scoring::FusionWeights;
use slide_curator::selection::{target_deck_length, type_cap};
use slide_curator::{
    Candidate, ConfidenceTier, CostTier, DisabledJudge, EngineConfig, MockJudge, ProcessingAction,
    QueryContext, SelectionPolicy, SlideMatcher, SlideType,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Judge-only fusion so scripted judge scores land in exact tiers.
fn judge_only() -> EngineConfig {
    EngineConfig {
        fusion: FusionWeights {
            judge_weight: 1.0,
            similarity_weight: 0.0,
        },
        ..EngineConfig::default()
    }
}

fn scripted(scores: &[(&str, f32)]) -> Arc<MockJudge> {
    let map: HashMap<String, f32> = scores.iter().map(|(id, s)| (id.to_string(), *s)).collect();
    Arc::new(MockJudge::by_id(map))
}

fn ctx(use_case: &str) -> QueryContext {
    QueryContext::new(use_case, "Acme", "retail")
}

#[tokio::test]
async fn scenario_a_twelve_high_yields_exactly_eight_high() {
    let mut pool = Vec::new();
    let mut scores = Vec::new();
    let ids: Vec<String> = (0..20).map(|i| format!("s{i:02}")).collect();
    for (i, id) in ids.iter().enumerate() {
        pool.push(Candidate::new(id.as_str(), format!("Slide {i}"), "text", SlideType::Content));
        scores.push((id.as_str(), if i < 12 { 0.95 } else { 0.3 }));
    }

    let matcher = SlideMatcher::new(scripted(&scores), judge_only());
    let report = matcher.match_slides(pool, &ctx("kickoff")).await;

    let high = report
        .slides
        .iter()
        .filter(|s| s.score.as_ref().map(|x| x.confidence) == Some(ConfidenceTier::High))
        .count();
    assert_eq!(high, 8);
    // 8 < 10, so low backfills up to the cap.
    assert_eq!(report.slides.len(), 15);
    assert_eq!(report.cost.copy_exact, 8);
    assert_eq!(report.cost.full_generation, 7);
    assert_eq!(report.cost.estimated_tokens, 7 * 200);
    assert!(!report.is_degraded());
}

fn similarity_pool() -> Vec<Candidate> {
    vec![
        Candidate::new("far", "Lattice physics", "quantum chromodynamics lattice gauge", SlideType::Content),
        Candidate::new("near", "Acme retail pitch", "Acme retail sales pitch for retail stores", SlideType::Title),
        Candidate::new("mid", "Retail trends", "retail market overview", SlideType::Chart),
    ]
}

#[tokio::test]
async fn scenario_b_failing_judge_ranks_by_similarity() {
    let failing = Arc::new(MockJudge::new(|_| Err(JudgeError::Transport("connection refused".into()))));
    let matcher = SlideMatcher::new(failing, EngineConfig::default());
    let report = matcher.match_slides(similarity_pool(), &ctx("sales pitch")).await;

    assert_eq!(report.ids(), vec!["near", "mid", "far"]);
    for s in &report.slides {
        let sc = s.score.as_ref().unwrap();
        assert_eq!(sc.judge_score, 0.5);
        assert_eq!(sc.judge_reason, REASON_FAILED);
    }
    let sims: Vec<f32> = report.slides.iter().map(|s| s.score.as_ref().unwrap().similarity_score).collect();
    assert!(sims.windows(2).all(|w| w[0] >= w[1]));
    assert_eq!(sims[2], 0.0);
    assert!(!report.is_degraded());
}

#[tokio::test]
async fn unconfigured_judge_still_returns_ranked_output() {
    let matcher = SlideMatcher::new(Arc::new(DisabledJudge), EngineConfig::default());
    let report = matcher.match_slides(similarity_pool(), &ctx("sales pitch")).await;
    assert_eq!(report.slides.len(), 3);
    assert_eq!(report.ids()[0], "near");
    assert!(report
        .slides
        .iter()
        .all(|s| s.score.as_ref().unwrap().judge_reason == REASON_UNAVAILABLE));
}

#[tokio::test]
async fn scenario_c_empty_pool_is_empty_report() {
    let matcher = SlideMatcher::new(Arc::new(MockJudge::constant(0.9)), EngineConfig::default());
    let report = matcher.match_slides(Vec::new(), &ctx("demo")).await;
    assert!(report.slides.is_empty());
    assert!(!report.is_degraded());
    assert_eq!(report.cost.estimated_tokens, 0);
}

#[tokio::test]
async fn scenario_d_training_deck_caps_content_at_six() {
    assert_eq!(target_deck_length("Sales training", 15), 15);
    assert_eq!(type_cap(&SlideType::Content, 15), 6);

    let layout: [(SlideType, usize, f32); 6] = [
        (SlideType::Content, 10, 0.9),
        (SlideType::Chart, 3, 0.8),
        (SlideType::Image, 2, 0.7),
        (SlideType::Quote, 1, 0.6),
        (SlideType::Conclusion, 2, 0.5),
        (SlideType::Title, 2, 0.4),
    ];
    let mut pool = Vec::new();
    let mut ids = Vec::new();
    for (t, n, score) in layout {
        for i in 0..n {
            let id = format!("{}-{i}", t.as_str());
            pool.push(Candidate::new(id.as_str(), id.as_str(), "text", t.clone()));
            ids.push((id, score));
        }
    }
    let scores: Vec<(&str, f32)> = ids.iter().map(|(id, s)| (id.as_str(), *s)).collect();

    let matcher = SlideMatcher::new(scripted(&scores), judge_only()).with_policy(SelectionPolicy::Diversity);
    let report = matcher.match_slides(pool, &ctx("Sales training")).await;

    assert_eq!(report.policy, SelectionPolicy::Diversity);
    assert_eq!(report.slides.len(), 15);
    let content = report
        .slides
        .iter()
        .filter(|s| s.candidate.slide_type == SlideType::Content)
        .count();
    assert_eq!(content, 6);
    assert_eq!(report.slides.iter().filter(|s| s.candidate.slide_type == SlideType::Title).count(), 1);
}

#[tokio::test]
async fn scenario_e_single_strong_candidate_is_copied() {
    let pool = vec![Candidate::new("only", "Acme overview", "Acme retail", SlideType::Title)];
    let matcher = SlideMatcher::new(scripted(&[("only", 0.95)]), judge_only());
    let report = matcher.match_slides(pool, &ctx("demo")).await;

    assert_eq!(report.slides.len(), 1);
    let s = &report.slides[0];
    assert_eq!(s.action, ProcessingAction::CopyExact);
    assert_eq!(s.cost, CostTier::Zero);
    assert!((s.combined_score().unwrap() - 0.95).abs() < 1e-6);
}

#[tokio::test]
async fn report_serializes_for_the_renderer() {
    let matcher = SlideMatcher::new(scripted(&[("only", 0.7)]), judge_only());
    let pool = vec![Candidate::new("only", "Agenda", "Today", SlideType::Content)];
    let report = matcher.match_slides(pool, &ctx("demo")).await;

    let v = serde_json::to_value(&report).unwrap();
    assert_eq!(v["policy"], "cost_optimized");
    assert_eq!(v["slides"][0]["id"], "only");
    assert_eq!(v["slides"][0]["action"], "minor_enhancement");
    assert_eq!(v["cost"]["estimated_tokens"], 50);
    assert!(v.get("degradation").is_none());
    assert!(v["generated_at"].is_string());
}
