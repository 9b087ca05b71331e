//! Slot allocation: picks the bounded final slide set from tiered candidates.
//!
//! Two policies, chosen by configuration:
//! - [`SelectionPolicy::CostOptimized`]: fill from the cheap tiers first, backfill
//!   with low-confidence slides only when the deck would be too thin.
//! - [`SelectionPolicy::Diversity`]: target length from the use case, per-type caps.

pub mod cost;
pub mod diversity;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::candidate::QueryContext;
use crate::scoring::{ScoredCandidate, TieredCandidates};

pub use cost::select_cost_optimized;
pub use diversity::{select_diverse, target_deck_length, type_cap};

/// Hard upper bound on the number of selected slides.
pub const HARD_CAP: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    #[default]
    CostOptimized,
    Diversity,
}

impl SelectionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionPolicy::CostOptimized => "cost_optimized",
            SelectionPolicy::Diversity => "diversity",
        }
    }
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SelectionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "cost_optimized" | "cost" => Ok(SelectionPolicy::CostOptimized),
            "diversity" | "requirements" => Ok(SelectionPolicy::Diversity),
            other => Err(format!("unknown selection policy: {other}")),
        }
    }
}

/// Slot counts for the cost-optimized policy; `max` also caps the diversity target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SlotLimits {
    /// Max slides taken from the high tier.
    #[serde(default = "default_high_slots")]
    pub high: usize,
    /// Max slides taken from the medium tier.
    #[serde(default = "default_medium_slots")]
    pub medium: usize,
    /// Low-tier backfill only happens while the deck is shorter than this.
    #[serde(default = "default_min_viable")]
    pub min_viable: usize,
    #[serde(default = "default_max_slots")]
    pub max: usize,
}

fn default_high_slots() -> usize {
    8
}
fn default_medium_slots() -> usize {
    5
}
fn default_min_viable() -> usize {
    10
}
fn default_max_slots() -> usize {
    HARD_CAP
}

impl Default for SlotLimits {
    fn default() -> Self {
        Self {
            high: default_high_slots(),
            medium: default_medium_slots(),
            min_viable: default_min_viable(),
            max: default_max_slots(),
        }
    }
}

impl SlotLimits {
    /// Keep every limit within `1..=HARD_CAP` and below `max`.
    pub fn sanitized(mut self) -> Self {
        self.max = self.max.clamp(1, HARD_CAP);
        self.high = self.high.min(self.max);
        self.medium = self.medium.min(self.max);
        self.min_viable = self.min_viable.min(self.max);
        self
    }
}

/// Run the configured policy. Output is in final deck order.
pub fn allocate(
    policy: SelectionPolicy,
    tiers: TieredCandidates,
    ctx: &QueryContext,
    limits: &SlotLimits,
) -> Vec<ScoredCandidate> {
    match policy {
        SelectionPolicy::CostOptimized => select_cost_optimized(tiers, limits),
        SelectionPolicy::Diversity => {
            let target = target_deck_length(&ctx.use_case, limits.max);
            select_diverse(tiers.into_ranked(), target)
        }
    }
}
