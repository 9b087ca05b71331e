//! slide-curator command-line entrypoint.
//! Reads a candidate pool and a query context (JSON), runs one matching pass and
//! prints the report.
//!
//! Usage: slide-curator <candidates.json> <context.json> [--policy cost_optimized|diversity] [--metrics]

use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use tracing::info;

use slide_curator::metrics::Metrics;
use slide_curator::telemetry::init_tracing;
use slide_curator::{build_judge, Candidate, EngineConfig, JudgeConfig, QueryContext, SelectionPolicy, SlideMatcher};

#[derive(Parser, Debug)]
#[command(name = "slide-curator", version, about = "Score and select slides for a generated deck")]
struct Args {
    /// JSON array of candidate slides
    candidates: PathBuf,
    /// JSON query context (use case, customer, industry, ...)
    context: PathBuf,
    /// Selection policy override: cost_optimized | diversity
    #[arg(long)]
    policy: Option<SelectionPolicy>,
    /// Print the Prometheus exposition to stderr after the run
    #[arg(long)]
    metrics: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let args = Args::parse();
    let metrics = if args.metrics { Some(Metrics::init()?) } else { None };

    let pool: Vec<Candidate> = serde_json::from_str(
        &fs::read_to_string(&args.candidates)
            .with_context(|| format!("reading {}", args.candidates.display()))?,
    )
    .with_context(|| format!("parsing candidates from {}", args.candidates.display()))?;
    let ctx: QueryContext = serde_json::from_str(
        &fs::read_to_string(&args.context).with_context(|| format!("reading {}", args.context.display()))?,
    )
    .with_context(|| format!("parsing query context from {}", args.context.display()))?;

    let engine_cfg = EngineConfig::load()?;
    let judge_cfg = JudgeConfig::load()?;
    let mut matcher = SlideMatcher::new(build_judge(&judge_cfg), engine_cfg);
    if let Some(p) = args.policy {
        matcher = matcher.with_policy(p);
    }

    info!(candidates = pool.len(), use_case = %ctx.use_case, "starting run");
    let report = matcher.match_slides(pool, &ctx).await;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(m) = metrics {
        eprintln!("{}", m.render());
    }
    Ok(())
}
