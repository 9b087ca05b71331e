// src/selection/diversity.rs
//! Diversity allocation: deck length follows the use case, slide types are capped
//! relative to that length so one layout cannot take over the deck.

use std::collections::HashMap;

use crate::candidate::SlideType;
use crate::scoring::{by_score_desc, ScoredCandidate};

/// Target deck length for a use case (case-insensitive keyword match), capped at `max`.
pub fn target_deck_length(use_case: &str, max: usize) -> usize {
    let uc = use_case.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| uc.contains(w));
    let t = if has(&["pitch", "demo"]) {
        8
    } else if has(&["training", "education"]) {
        15
    } else if has(&["report", "analysis"]) {
        12
    } else {
        10
    };
    t.min(max)
}

/// Max slides of one type in a deck of `target` slides. Each unknown label gets
/// its own 10% cap.
pub fn type_cap(slide_type: &SlideType, target: usize) -> usize {
    match slide_type {
        SlideType::Title | SlideType::Conclusion => 2,
        SlideType::Content => target * 40 / 100,
        SlideType::Chart => target * 20 / 100,
        SlideType::Image => target * 15 / 100,
        SlideType::Quote | SlideType::Other(_) => target * 10 / 100,
    }
}

/// `ranked` must already be in score order. Output keeps score order.
pub fn select_diverse(ranked: Vec<ScoredCandidate>, target: usize) -> Vec<ScoredCandidate> {
    // Keyed by label, so distinct unknown types are counted apart.
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut picked = Vec::with_capacity(target);
    let mut skipped = Vec::new();

    for sc in ranked {
        if picked.len() >= target {
            skipped.push(sc);
            continue;
        }
        let cap = type_cap(&sc.candidate.slide_type, target);
        let n = counts.entry(sc.candidate.slide_type.to_string()).or_insert(0);
        if *n < cap {
            *n += 1;
            picked.push(sc);
        } else {
            skipped.push(sc);
        }
    }

    // Caps are soft: a short deck is worse than a lopsided one.
    let room = target.saturating_sub(picked.len());
    picked.extend(skipped.into_iter().take(room));
    picked.sort_by(by_score_desc);
    picked
}
