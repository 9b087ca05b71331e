//! Metric names, one-time descriptions and the Prometheus recorder.

use metrics::{describe_counter, describe_histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub const JUDGE_BATCHES: &str = "slide_judge_batches_total";
pub const JUDGE_PARSE_FAILURES: &str = "slide_judge_parse_failures_total";
pub const SIMILARITY_FAILURES: &str = "slide_similarity_failures_total";
pub const GUARD_REJECTED: &str = "slide_guard_rejected_total";
pub const PIPELINE_FALLBACK: &str = "slide_pipeline_fallback_total";
pub const SELECTED: &str = "slide_selected_total";
pub const MATCH_DURATION_MS: &str = "slide_match_duration_ms";

static DESCRIBED: OnceCell<()> = OnceCell::new();

/// Register help text for every metric with the current recorder.
pub fn describe_metrics() {
    describe_counter!(JUDGE_BATCHES, "Judge batches by outcome (ok, failed, unparsable, unconfigured).");
    describe_counter!(JUDGE_PARSE_FAILURES, "Judge responses or records that could not be parsed.");
    describe_counter!(SIMILARITY_FAILURES, "Similarity runs that degraded to all-zero scores.");
    describe_counter!(GUARD_REJECTED, "Candidates dropped for external source attribution.");
    describe_counter!(PIPELINE_FALLBACK, "Runs that fell back to unscored output, by stage.");
    describe_counter!(SELECTED, "Selected slides by processing action.");
    describe_histogram!(MATCH_DURATION_MS, Unit::Milliseconds, "Wall time of one matching run.");
}

/// `describe_metrics` at most once per process, for callers on the hot path.
pub fn ensure_metrics_described() {
    DESCRIBED.get_or_init(describe_metrics);
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| anyhow::anyhow!("prometheus: install recorder: {e}"))?;
        // Always describe against the recorder just installed, even if a run already did.
        describe_metrics();
        Ok(Self { handle })
    }

    /// Prometheus text exposition of everything recorded so far.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}
