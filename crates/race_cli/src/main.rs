use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use race_content::{load_content, load_roster, RaceParams};
use race_core::{simulate, RaceResult, StandardPurseTable};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "race_cli", about = "Horse race simulator CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one race and print the call and the result.
    Run {
        /// Roster JSON: an array of entrants.
        #[arg(long)]
        roster: PathBuf,
        #[arg(long, default_value = "./content")]
        content_dir: String,
        /// Random when omitted; always printed so the race can be replayed.
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, default_value = "race_0001")]
        race_id: String,
        #[arg(long, default_value_t = 8.0)]
        distance: f64,
        #[arg(long, default_value = "dirt", value_parser = ["dirt", "turf", "synthetic"])]
        surface: String,
        #[arg(
            long,
            default_value = "fast",
            value_parser = ["fast", "good", "muddy", "soft", "frozen"]
        )]
        condition: String,
        /// Defaults to the field size.
        #[arg(long)]
        lanes: Option<u32>,
        #[arg(
            long,
            default_value = "allowance",
            value_parser = ["maiden", "claiming", "allowance", "stakes"]
        )]
        class: String,
        #[arg(long, default_value_t = 50_000.0)]
        purse: f64,
        #[arg(long, default_value_t = 0.0)]
        entry_fee: f64,
        /// Also write the full result as JSON.
        #[arg(long)]
        json: Option<PathBuf>,
        /// Skip the race call; print only the result table.
        #[arg(long)]
        quiet: bool,
    },
}

/// Parses a snake_case keyword into one of the core enums through its serde name.
fn keyword<T: DeserializeOwned>(value: &str) -> Result<T> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .with_context(|| format!("unrecognised value '{value}'"))
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

fn run(
    roster_path: &Path,
    content_dir: &str,
    seed: u64,
    params: &RaceParams,
) -> Result<RaceResult> {
    let content = load_content(content_dir)?;
    let roster = load_roster(roster_path)?;
    let config = params.configuration(seed, roster.len());

    println!(
        "Starting race: race_id={} seed={seed} field={} distance={}f surface={:?} condition={:?} content_version={}",
        config.race_id,
        roster.len(),
        config.distance_furlongs,
        config.surface,
        config.condition,
        content.content_version,
    );
    println!("{}", "-".repeat(80));

    simulate(&config, &roster, &content, &StandardPurseTable)
        .with_context(|| format!("simulating {}", config.race_id))
}

fn print_call(result: &RaceResult) {
    for line in &result.commentary {
        println!("[tick={:04}]  {}", line.tick, line.text);
    }
    println!("{}", "-".repeat(80));
}

fn print_result(result: &RaceResult) {
    println!(
        "{:>5}  {:<24} {:<13} {:>4} {:>10} {:>10}",
        "Place", "Horse", "Style", "Post", "Time", "Payout"
    );
    for entry in &result.results {
        let time = if entry.completed {
            format!("{:.2}", entry.finish_time)
        } else {
            "DNF".to_string()
        };
        println!(
            "{:>5}  {:<24} {:<13} {:>4} {:>10} {:>10.2}",
            entry.place,
            entry.name,
            entry.leg_type.label(),
            entry.post_position,
            time,
            entry.payout,
        );
    }
    let stats = &result.stats;
    println!(
        "\nticks={} expected={} cap={}{}  lead_changes={} overtakes={} lane_changes={} traffic={}",
        stats.ticks_run,
        stats.expected_ticks,
        stats.tick_cap,
        if stats.capped { " (capped)" } else { "" },
        stats.lead_changes,
        stats.overtakes,
        stats.lane_changes,
        stats.traffic_incidents,
    );
}

fn write_json(path: &Path, result: &RaceResult) -> Result<()> {
    let file =
        std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(file, result)
        .with_context(|| format!("writing {}", path.display()))?;
    println!("Result written to {}", path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "race_core=warn,race_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            roster,
            content_dir,
            seed,
            race_id,
            distance,
            surface,
            condition,
            lanes,
            class,
            purse,
            entry_fee,
            json,
            quiet,
        } => {
            let params = RaceParams {
                race_id,
                surface: keyword(&surface)?,
                condition: keyword(&condition)?,
                distance_furlongs: distance,
                lane_count: lanes,
                race_class: keyword(&class)?,
                base_purse: purse,
                entry_fee,
            };
            let seed = seed.unwrap_or_else(rand::random);
            let result = run(&roster, &content_dir, seed, &params)?;
            tracing::info!(seed, ticks = result.stats.ticks_run, "race finished");
            if !quiet {
                print_call(&result);
            }
            print_result(&result);
            if let Some(path) = json {
                write_json(&path, &result)?;
            }
        }
    }
    Ok(())
}
