use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use uuid::Uuid;

mod overrides;
mod run_result;
mod runner;
mod scenario;
mod summary;

#[derive(Parser)]
#[command(
    name = "race_bench",
    about = "Runs a race scenario across many seeds and aggregates the outcomes"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario file across multiple seeds.
    Run {
        /// Path to the scenario JSON file.
        #[arg(long)]
        scenario: String,
        /// Output directory (default: runs/).
        #[arg(long, default_value = "runs")]
        output_dir: String,
    },
}

fn run(scenario_path: &str, output_dir: &str) -> Result<()> {
    let scenario = scenario::load_scenario(Path::new(scenario_path))?;
    let seeds = scenario.seeds.expand();

    let mut content = race_content::load_content(&scenario.content_dir)?;
    overrides::apply_overrides(&mut content, &scenario.overrides)?;
    let roster = race_content::load_roster(Path::new(&scenario.roster))?;

    info!(
        scenario = %scenario.name,
        seeds = seeds.len(),
        field = roster.len(),
        "loaded scenario"
    );

    let scenario_params = serde_json::json!({
        "content_dir": scenario.content_dir,
        "roster": scenario.roster,
        "race": scenario.race,
        "overrides": scenario.overrides,
    });

    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let run_dir = PathBuf::from(output_dir).join(format!("{}_{}", scenario.name, timestamp));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("creating output directory: {}", run_dir.display()))?;
    std::fs::copy(scenario_path, run_dir.join("scenario.json")).context("copying scenario file")?;

    println!("Output: {}", run_dir.display());
    println!("Running {} seeds in parallel...", seeds.len());

    let batch = runner::Batch {
        content: &content,
        roster: &roster,
        race: &scenario.race,
        scenario_name: &scenario.name,
        scenario_params: &scenario_params,
    };
    let results: Vec<Result<runner::SeedResult>> = seeds
        .par_iter()
        .map(|&seed| runner::run_seed(&batch, seed, &run_dir.join(format!("seed_{seed}"))))
        .collect();

    let mut seed_results = Vec::new();
    for result in results {
        match result {
            Ok(seed_result) => seed_results.push(seed_result),
            Err(err) => warn!("seed failed: {err:#}"),
        }
    }
    if seed_results.is_empty() {
        anyhow::bail!("all seeds failed");
    }
    seed_results.sort_by_key(|r| r.seed);

    let metric_refs: Vec<&race_core::RaceMetrics> =
        seed_results.iter().map(|r| &r.metrics).collect();
    let stats = summary::compute_summary(&metric_refs);
    summary::print_summary(&scenario.name, &stats);

    let summary_path = run_dir.join("summary.json");
    let summary_json = serde_json::to_string_pretty(&stats).context("serializing summary")?;
    std::fs::write(&summary_path, summary_json)
        .with_context(|| format!("writing {}", summary_path.display()))?;

    let run_ids: Vec<&str> = seed_results.iter().map(|r| r.run_id.as_str()).collect();
    let batch_summary = serde_json::json!({
        "batch_schema_version": 1,
        "batch_id": Uuid::new_v4().to_string(),
        "scenario_name": scenario.name,
        "scenario_params": scenario_params,
        "seed_count": seed_results.len(),
        "failed_count": seeds.len() - seed_results.len(),
        "run_ids": run_ids,
        "capped_count": stats.capped_count,
        "win_counts": stats.win_counts,
        "aggregated_metrics": summary::build_aggregated_metrics(&stats),
    });
    let batch_path = run_dir.join("batch_summary.json");
    run_result::write_atomic(&batch_summary, &batch_path)
        .with_context(|| format!("writing {}", batch_path.display()))?;

    println!("Summary written to {}", summary_path.display());
    println!("Batch summary written to {}", batch_path.display());
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "race_core=warn,race_bench=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            scenario,
            output_dir,
        } => run(&scenario, &output_dir)?,
    }
    Ok(())
}
