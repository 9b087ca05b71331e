// src/selection/cost.rs
//! Cost-optimized allocation.
//!
//! High tier first (copy as-is, free), then medium (light touch-up), then low
//! (full regeneration) only as a backfill when the deck is under `min_viable`.

use std::cmp::Ordering;

use super::SlotLimits;
use crate::scoring::{ScoredCandidate, TieredCandidates};

/// Final deck order: combined desc, then cheaper processing, then input position.
pub fn deck_order(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.combined()
        .partial_cmp(&a.combined())
        .unwrap_or(Ordering::Equal)
        .then_with(|| {
            let ca = a.score.confidence.action().cost();
            let cb = b.score.confidence.action().cost();
            ca.cmp(&cb)
        })
        .then_with(|| a.position.cmp(&b.position))
}

pub fn select_cost_optimized(tiers: TieredCandidates, limits: &SlotLimits) -> Vec<ScoredCandidate> {
    let TieredCandidates { high, medium, low } = tiers;

    let mut picked: Vec<ScoredCandidate> = high.into_iter().take(limits.high).collect();
    picked.extend(medium.into_iter().take(limits.medium));

    if picked.len() < limits.min_viable {
        let room = limits.max.saturating_sub(picked.len());
        picked.extend(low.into_iter().take(room));
    }

    picked.sort_by(deck_order);
    picked.truncate(limits.max);
    picked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::{Candidate, ConfidenceTier, SlideScore, SlideType};
    use crate::scoring::{classify, TierThresholds};

    fn sc(pos: usize, combined: f32) -> ScoredCandidate {
        ScoredCandidate {
            candidate: Candidate::new(format!("s{pos}"), "t", "c", SlideType::Content),
            score: SlideScore {
                judge_score: combined,
                judge_reason: String::new(),
                similarity_score: combined,
                combined_score: combined,
                confidence: classify(combined, &TierThresholds::default()),
            },
            position: pos,
        }
    }

    fn tiers(scores: &[f32]) -> TieredCandidates {
        TieredCandidates::from_scored(scores.iter().enumerate().map(|(i, s)| sc(i, *s)).collect())
    }

    #[test]
    fn takes_at_most_eight_high_and_five_medium() {
        let mut scores = vec![0.9; 12];
        scores.extend(vec![0.7; 7]);
        let out = select_cost_optimized(tiers(&scores), &SlotLimits::default());
        let high = out.iter().filter(|s| s.score.confidence == ConfidenceTier::High).count();
        let med = out.iter().filter(|s| s.score.confidence == ConfidenceTier::Medium).count();
        assert_eq!((high, med), (8, 5));
        assert_eq!(out.len(), 13);
    }

    #[test]
    fn low_backfills_only_thin_decks() {
        // 8 high + 3 medium = 11 >= 10, so no low slides.
        let mut scores = vec![0.85; 8];
        scores.extend(vec![0.65; 3]);
        scores.extend(vec![0.3; 6]);
        let out = select_cost_optimized(tiers(&scores), &SlotLimits::default());
        assert_eq!(out.len(), 11);
        assert!(out.iter().all(|s| s.score.confidence != ConfidenceTier::Low));

        // 2 high + 1 medium = 3 < 10: low fills up to the cap.
        let mut scores = vec![0.85; 2];
        scores.push(0.65);
        scores.extend(vec![0.1; 20]);
        let out = select_cost_optimized(tiers(&scores), &SlotLimits::default());
        assert_eq!(out.len(), 15);
    }

    #[test]
    fn backfill_boundary_sits_at_min_viable() {
        // 9 picked is one short of 10: low slides backfill to the cap.
        let mut scores = vec![0.85; 8];
        scores.push(0.65);
        scores.extend(vec![0.1; 10]);
        let out = select_cost_optimized(tiers(&scores), &SlotLimits::default());
        assert_eq!(out.len(), 15);
        assert_eq!(out.iter().filter(|s| s.score.confidence == ConfidenceTier::Low).count(), 6);

        // Exactly 10 picked is viable: no low slides.
        let mut scores = vec![0.85; 8];
        scores.extend(vec![0.65; 2]);
        scores.extend(vec![0.1; 10]);
        let out = select_cost_optimized(tiers(&scores), &SlotLimits::default());
        assert_eq!(out.len(), 10);
        assert!(out.iter().all(|s| s.score.confidence != ConfidenceTier::Low));
    }

    #[test]
    fn ties_break_by_input_position() {
        let out = select_cost_optimized(tiers(&[0.5, 0.5, 0.5]), &SlotLimits::default());
        let ids: Vec<_> = out.iter().map(|s| s.position).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }
}
