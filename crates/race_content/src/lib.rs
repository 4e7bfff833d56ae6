//! Content, roster and race-parameter loading shared between race_cli and race_bench.

use anyhow::{bail, Context, Result};
use race_core::{
    Constants, EntrantSpec, LegTypeTable, RaceClass, RaceConfiguration, RaceContent, RaceId,
    Surface, TrackCondition,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Deserialize)]
struct LegTypesFile {
    content_version: String,
    leg_types: LegTypeTable,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let name = path.display();
    let json = std::fs::read_to_string(path).with_context(|| format!("reading {name}"))?;
    serde_json::from_str(&json).with_context(|| format!("parsing {name}"))
}

/// Loads `constants.json` and `leg_types.json` from `content_dir` and rejects
/// tuning the engine would refuse.
pub fn load_content(content_dir: &str) -> Result<RaceContent> {
    let dir = Path::new(content_dir);
    let constants: Constants = read_json(&dir.join("constants.json"))?;
    let leg_types_file: LegTypesFile = read_json(&dir.join("leg_types.json"))?;
    let content = RaceContent {
        content_version: leg_types_file.content_version,
        constants,
        leg_types: leg_types_file.leg_types,
    };
    validate_content(&content)?;
    Ok(content)
}

pub fn validate_content(content: &RaceContent) -> Result<()> {
    if content.content_version.is_empty() {
        bail!("leg_types.json: content_version must not be empty");
    }
    content
        .constants
        .validate()
        .context("validating constants.json")?;
    content
        .leg_types
        .validate()
        .context("validating leg_types.json")?;
    Ok(())
}

/// Loads a roster: a JSON array of entrants with unique, non-empty ids.
pub fn load_roster(path: &Path) -> Result<Vec<EntrantSpec>> {
    let roster: Vec<EntrantSpec> = read_json(path)?;
    if roster.is_empty() {
        bail!("roster {} has no entrants", path.display());
    }
    let mut seen = HashSet::new();
    for entrant in &roster {
        if entrant.horse_id.0.is_empty() {
            bail!("roster {} has an entrant with an empty horse_id", path.display());
        }
        if !seen.insert(&entrant.horse_id) {
            bail!(
                "roster {} lists horse '{}' more than once",
                path.display(),
                entrant.horse_id
            );
        }
    }
    Ok(roster)
}

/// Race parameters as written in scenario files and assembled by the CLI.
/// Everything but the seed; lane count defaults to the field size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RaceParams {
    #[serde(default = "default_race_id")]
    pub race_id: String,
    #[serde(default = "default_surface")]
    pub surface: Surface,
    #[serde(default = "default_condition")]
    pub condition: TrackCondition,
    #[serde(default = "default_distance")]
    pub distance_furlongs: f64,
    #[serde(default)]
    pub lane_count: Option<u32>,
    #[serde(default = "default_class")]
    pub race_class: RaceClass,
    #[serde(default = "default_base_purse")]
    pub base_purse: f64,
    #[serde(default)]
    pub entry_fee: f64,
}

fn default_race_id() -> String {
    "race_0001".to_string()
}

fn default_surface() -> Surface {
    Surface::Dirt
}

fn default_condition() -> TrackCondition {
    TrackCondition::Fast
}

fn default_distance() -> f64 {
    8.0
}

fn default_class() -> RaceClass {
    RaceClass::Allowance
}

fn default_base_purse() -> f64 {
    50_000.0
}

impl Default for RaceParams {
    fn default() -> Self {
        Self {
            race_id: default_race_id(),
            surface: default_surface(),
            condition: default_condition(),
            distance_furlongs: default_distance(),
            lane_count: None,
            race_class: default_class(),
            base_purse: default_base_purse(),
            entry_fee: 0.0,
        }
    }
}

impl RaceParams {
    pub fn configuration(&self, seed: u64, field_size: usize) -> RaceConfiguration {
        let lane_count = self
            .lane_count
            .unwrap_or_else(|| u32::try_from(field_size).unwrap_or(u32::MAX));
        RaceConfiguration {
            race_id: RaceId(self.race_id.clone()),
            surface: self.surface,
            condition: self.condition,
            distance_furlongs: self.distance_furlongs,
            lane_count,
            seed,
            race_class: self.race_class,
            base_purse: self.base_purse,
            entry_fee: self.entry_fee,
        }
    }
}

/// Writes `run_info.json` describing one run into `dir`.
pub fn write_run_info(
    dir: &Path,
    run_id: &str,
    config: &RaceConfiguration,
    content_version: &str,
    runner: &str,
    args: serde_json::Value,
) -> Result<()> {
    let info = serde_json::json!({
        "run_id": run_id,
        "race_id": config.race_id,
        "seed": config.seed,
        "start_time": chrono::Utc::now().to_rfc3339(),
        "content_version": content_version,
        "runner": runner,
        "race": config,
        "args": args,
    });
    let path = dir.join("run_info.json");
    let file =
        std::fs::File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(file, &info)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
