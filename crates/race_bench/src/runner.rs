use crate::run_result::{self, RunResult, RUN_SCHEMA_VERSION};
use anyhow::{Context, Result};
use race_content::RaceParams;
use race_core::{EntrantSpec, RaceContent, RaceMetrics, StandardPurseTable};
use std::path::Path;
use std::time::Instant;
use tracing::debug;
use uuid::Uuid;

pub struct SeedResult {
    pub seed: u64,
    pub metrics: RaceMetrics,
    pub run_id: String,
}

/// Everything a seed run shares with the rest of the batch.
pub struct Batch<'a> {
    pub content: &'a RaceContent,
    pub roster: &'a [EntrantSpec],
    pub race: &'a RaceParams,
    pub scenario_name: &'a str,
    pub scenario_params: &'a serde_json::Value,
}

pub fn run_seed(batch: &Batch<'_>, seed: u64, seed_dir: &Path) -> Result<SeedResult> {
    let run_id = Uuid::new_v4().to_string();
    let start = Instant::now();
    let config = batch.race.configuration(seed, batch.roster.len());

    std::fs::create_dir_all(seed_dir)
        .with_context(|| format!("creating seed directory: {}", seed_dir.display()))?;

    race_content::write_run_info(
        seed_dir,
        &run_id,
        &config,
        &batch.content.content_version,
        "race_bench",
        serde_json::json!({ "scenario": batch.scenario_name }),
    )?;

    let result = race_core::simulate(&config, batch.roster, batch.content, &StandardPurseTable)
        .with_context(|| format!("simulating seed {seed}"))?;

    let mut results_writer = csv::Writer::from_path(seed_dir.join("results.csv"))
        .with_context(|| format!("opening results CSV in {}", seed_dir.display()))?;
    for entry in &result.results {
        results_writer.serialize(entry).context("writing results row")?;
    }
    results_writer.flush().context("flushing results")?;

    let mut commentary_writer = csv::Writer::from_path(seed_dir.join("commentary.csv"))
        .with_context(|| format!("opening commentary CSV in {}", seed_dir.display()))?;
    for line in &result.commentary {
        commentary_writer
            .serialize(line)
            .context("writing commentary row")?;
    }
    commentary_writer.flush().context("flushing commentary")?;

    #[allow(clippy::cast_possible_truncation)]
    let wall_time_ms = start.elapsed().as_millis() as u64;
    let metrics = race_core::compute_metrics(&result);

    let run_result = RunResult {
        run_schema_version: RUN_SCHEMA_VERSION,
        run_status: RunResult::status(result.stats.capped).to_string(),
        run_id: run_id.clone(),
        git_sha: run_result::git_sha(),
        git_dirty: run_result::git_dirty(),
        seed,
        scenario_name: batch.scenario_name.to_string(),
        scenario_params: batch.scenario_params.clone(),
        race_id: config.race_id.0.clone(),
        content_version: batch.content.content_version.clone(),
        ticks_run: result.stats.ticks_run,
        expected_ticks: result.stats.expected_ticks,
        tick_cap: result.stats.tick_cap,
        wall_time_ms,
        summary_metrics: metrics.clone(),
        results_path: "results.csv".to_string(),
        commentary_path: "commentary.csv".to_string(),
    };

    run_result::write_atomic(&run_result, &seed_dir.join("run_result.json"))
        .context("writing run_result.json")?;

    debug!(seed, winner = %metrics.winner, wall_time_ms, "seed finished");

    Ok(SeedResult {
        seed,
        metrics,
        run_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use race_core::test_fixtures::{base_content, closer_b, entrant, front_runner_a};
    use race_core::LegType;
    use tempfile::TempDir;

    fn roster() -> Vec<EntrantSpec> {
        vec![
            front_runner_a(),
            closer_b(),
            entrant("c", LegType::Stalker, [60.0, 60.0, 60.0, 60.0]),
        ]
    }

    fn run_in(dir: &Path, seed: u64) -> SeedResult {
        let content = base_content();
        let roster = roster();
        let race = RaceParams::default();
        let params = serde_json::json!({"distance_furlongs": 8.0});
        let batch = Batch {
            content: &content,
            roster: &roster,
            race: &race,
            scenario_name: "test_scenario",
            scenario_params: &params,
        };
        run_seed(&batch, seed, dir).unwrap()
    }

    #[test]
    fn test_run_seed_produces_output() {
        let temp_dir = TempDir::new().unwrap();
        let seed_dir = temp_dir.path().join("seed_42");
        let result = run_in(&seed_dir, 42);

        assert_eq!(result.seed, 42);
        assert_eq!(result.metrics.seed, 42);
        assert_eq!(result.metrics.field_size, 3);
        assert!(!result.run_id.is_empty());
        assert!(seed_dir.join("run_info.json").exists());
        assert!(seed_dir.join("results.csv").exists());
        assert!(seed_dir.join("commentary.csv").exists());
        assert!(seed_dir.join("run_result.json").exists());
    }

    #[test]
    fn test_results_csv_has_one_row_per_entrant() {
        let temp_dir = TempDir::new().unwrap();
        let seed_dir = temp_dir.path().join("seed_7");
        run_in(&seed_dir, 7);

        let mut reader = csv::Reader::from_path(seed_dir.join("results.csv")).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert!(headers.iter().any(|h| h == "horse_id"));
        assert!(headers.iter().any(|h| h == "finish_time"));
        let places: Vec<String> = reader
            .records()
            .map(|r| r.unwrap()[headers.iter().position(|h| h == "place").unwrap()].to_string())
            .collect();
        assert_eq!(places, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_run_result_json_matches_metrics() {
        let temp_dir = TempDir::new().unwrap();
        let seed_dir = temp_dir.path().join("seed_9");
        let result = run_in(&seed_dir, 9);

        let json = std::fs::read_to_string(seed_dir.join("run_result.json")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["seed"], 9);
        assert_eq!(parsed["run_id"], result.run_id.as_str());
        assert_eq!(parsed["summary_metrics"]["winner"], result.metrics.winner.as_str());
        assert_eq!(parsed["scenario_name"], "test_scenario");
    }

    #[test]
    fn test_same_seed_same_metrics() {
        let temp_dir = TempDir::new().unwrap();
        let a = run_in(&temp_dir.path().join("a"), 11);
        let b = run_in(&temp_dir.path().join("b"), 11);
        assert_eq!(a.metrics, b.metrics);
        assert_ne!(a.run_id, b.run_id);
    }
}
