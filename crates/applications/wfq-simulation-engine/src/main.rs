//! WFQ Simulation Engine CLI
//!
//! Command-line interface for running Weighted Fair Queuing load balancer scenarios

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Parser;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wfq_core::{CompletionRecord, SiteShare, ValidationError};
use wfq_simulation_engine::{
    LoadBalancer,
    report::{self, RunSummary},
    scenarios::{self, ScenarioConfig, ScenarioGenerator, ScenarioKind},
};

#[derive(Parser, Debug)]
#[command(name = "wfq-sim")]
#[command(about = "Simulate Weighted Fair Queuing across weighted sites", long_about = None)]
struct Args {
    /// Scenario to run
    #[arg(short, long, value_enum, default_value_t = ScenarioKind::Equal)]
    scenario: ScenarioKind,

    /// Number of sites to generate
    #[arg(long, default_value_t = 3)]
    sites: u64,

    /// Number of requests to generate
    #[arg(short, long, default_value_t = 10)]
    requests: u64,

    /// Random seed for generated scenarios
    #[arg(long, default_value_t = 43)]
    seed: u64,

    /// JSON batch file (sites and requests), required for the manual scenario
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output JSON file path (optional)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Serialize)]
struct RunOutput<'a> {
    scenario: ScenarioKind,
    shares: &'a [SiteShare],
    completions: &'a [CompletionRecord],
    rejected: &'a [ValidationError],
    summary: &'a RunSummary,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wfq_simulation_engine=info,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("WFQ Simulation Engine v{}", env!("CARGO_PKG_VERSION"));

    let batch = match (args.scenario, &args.input) {
        (ScenarioKind::Manual, Some(path)) => scenarios::load_batch(path)
            .with_context(|| format!("Failed to load batch from {}", path.display()))?,
        (ScenarioKind::Manual, None) => bail!("--input is required for the manual scenario"),
        (kind, input) => {
            if input.is_some() {
                info!("Ignoring --input for generated {:?} scenario", kind);
            }
            let config = ScenarioConfig {
                num_sites: args.sites,
                num_requests: args.requests,
                seed: args.seed,
            };
            ScenarioGenerator::new(config).generate(kind)?
        }
    };

    println!("Configuration:");
    println!("  Scenario: {:?}", args.scenario);
    println!("  Sites: {}", batch.sites.len());
    println!("  Requests: {}\n", batch.requests.len());

    let run = LoadBalancer::process(&batch).context("Scheduling run failed")?;
    let summary = RunSummary::from_report(&run);

    if !run.rejected.is_empty() {
        println!("{}", report::render_rejections(&run.rejected));
    }
    println!("{}", report::render_weights(&run.shares));
    println!("{}", report::render_completions(&run.completions));
    println!("{}", report::render_summary(&summary));

    if let Some(output_path) = args.output {
        let output = RunOutput {
            scenario: args.scenario,
            shares: &run.shares,
            completions: &run.completions,
            rejected: &run.rejected,
            summary: &summary,
        };
        let json = serde_json::to_string_pretty(&output)?;
        fs::write(&output_path, json)
            .with_context(|| format!("Failed to write {}", output_path.display()))?;
        info!("Results saved to {}", output_path.display());
    }

    Ok(())
}
