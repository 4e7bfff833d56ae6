use race_core::RaceMetrics;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// Bump when fields are added/removed/renamed.
pub const RUN_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize)]
pub struct RunResult {
    pub run_schema_version: u32,
    /// `completed`, or `capped` when the tick cap classified the stragglers.
    pub run_status: String,
    pub run_id: String,
    pub git_sha: String,
    pub git_dirty: bool,
    pub seed: u64,
    pub scenario_name: String,
    pub scenario_params: serde_json::Value,
    pub race_id: String,
    pub content_version: String,
    pub ticks_run: u64,
    pub expected_ticks: u64,
    pub tick_cap: u64,
    pub wall_time_ms: u64,
    pub summary_metrics: RaceMetrics,
    pub results_path: String,
    pub commentary_path: String,
}

impl RunResult {
    pub fn status(capped: bool) -> &'static str {
        if capped {
            "capped"
        } else {
            "completed"
        }
    }
}

/// Write JSON atomically: write to `.tmp` then rename.
pub fn write_atomic<T: Serialize>(value: &T, path: &Path) -> anyhow::Result<()> {
    let tmp_path = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(value)?;
    let mut file = std::fs::File::create(&tmp_path)?;
    file.write_all(json.as_bytes())?;
    file.sync_all()?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

pub fn git_sha() -> String {
    env!("RACE_BENCH_GIT_SHA").to_string()
}

pub fn git_dirty() -> bool {
    env!("RACE_BENCH_GIT_DIRTY") == "true"
}
