// src/guard.rs
//! Knowledge-base guard: candidates attributed to external content never reach scoring.

use metrics::counter;
use serde::Deserialize;
use tracing::{info, warn};

use crate::candidate::Candidate;
use crate::metrics::GUARD_REJECTED;
use crate::telemetry::anon_hash;

/// Substrings (lowercase) that mark a source attribution as external.
pub const EXTERNAL_MARKERS: [&str; 8] = [
    "http://", "https://", "www.", "google", "external", "web", "online", "scrape",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SourceGuard {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Default for SourceGuard {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl SourceGuard {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// True when the attribution names something outside the uploaded corpus.
    pub fn is_external(source: &str) -> bool {
        let s = source.to_lowercase();
        EXTERNAL_MARKERS.iter().any(|m| s.contains(m))
    }

    /// Drop external candidates, keeping input order.
    pub fn filter(&self, pool: Vec<Candidate>) -> Vec<Candidate> {
        if !self.enabled {
            return pool;
        }
        let before = pool.len();
        let kept: Vec<Candidate> = pool
            .into_iter()
            .filter(|c| {
                let external = Self::is_external(&c.source);
                if external {
                    warn!(stage = "guard", id = %c.id, source = %anon_hash(&c.source), "dropping externally sourced slide");
                }
                !external
            })
            .collect();
        let rejected = before - kept.len();
        if rejected > 0 {
            counter!(GUARD_REJECTED).increment(rejected as u64);
            info!(stage = "guard", rejected, kept = kept.len(), "source guard applied");
        }
        kept
    }
}
