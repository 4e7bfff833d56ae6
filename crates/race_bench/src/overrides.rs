use anyhow::{bail, Context, Result};
use race_core::{LegTypeProfile, RaceContent};
use std::collections::BTreeMap;

/// Constant keys a scenario may override. Leg-type keys take the form
/// `leg_types.<leg>.<field>` and are listed in `LEG_TYPE_FIELDS`.
const VALID_KEYS: &[&str] = &[
    "tick_cap_multiplier",
    "speed.base_speed",
    "speed.min_speed",
    "speed.stat_coefficient",
    "speed.surface_preferred_multiplier",
    "speed.surface_mismatch_multiplier",
    "speed.stamina_threshold",
    "speed.stamina_floor",
    "speed.variance_band",
    "stamina.base_rate_per_tick",
    "stamina.distance_exponent",
    "stamina.stamina_coefficient",
    "stamina.durability_coefficient",
    "stamina.min_efficiency",
    "traffic.block_distance",
    "traffic.clear_band",
    "traffic.lane_change_speed_factor",
    "events.lead_change_window",
    "events.overtake_window",
    "events.lane_change_window",
    "events.traffic_window",
    "commentary.max_phrases_per_tick",
];

const LEG_TYPE_FIELDS: &[&str] = &["lane_change_aggressiveness", "inside_drift_chance"];

/// Applies dotted-key overrides in key order, then re-validates the result.
pub fn apply_overrides(
    content: &mut RaceContent,
    overrides: &BTreeMap<String, serde_json::Value>,
) -> Result<()> {
    for (key, value) in overrides {
        if let Some(rest) = key.strip_prefix("leg_types.") {
            apply_leg_type(content, key, rest, value)?;
            continue;
        }
        let c = &mut content.constants;
        match key.as_str() {
            "tick_cap_multiplier" => c.tick_cap_multiplier = as_f64(key, value)?,
            "speed.base_speed" => c.speed.base_speed = as_f64(key, value)?,
            "speed.min_speed" => c.speed.min_speed = as_f64(key, value)?,
            "speed.stat_coefficient" => c.speed.stat_coefficient = as_f64(key, value)?,
            "speed.surface_preferred_multiplier" => {
                c.speed.surface_preferred_multiplier = as_f64(key, value)?;
            }
            "speed.surface_mismatch_multiplier" => {
                c.speed.surface_mismatch_multiplier = as_f64(key, value)?;
            }
            "speed.stamina_threshold" => c.speed.stamina_threshold = as_f64(key, value)?,
            "speed.stamina_floor" => c.speed.stamina_floor = as_f64(key, value)?,
            "speed.variance_band" => c.speed.variance_band = as_f64(key, value)?,
            "stamina.base_rate_per_tick" => c.stamina.base_rate_per_tick = as_f64(key, value)?,
            "stamina.distance_exponent" => c.stamina.distance_exponent = as_f64(key, value)?,
            "stamina.stamina_coefficient" => {
                c.stamina.stamina_coefficient = as_f64(key, value)?;
            }
            "stamina.durability_coefficient" => {
                c.stamina.durability_coefficient = as_f64(key, value)?;
            }
            "stamina.min_efficiency" => c.stamina.min_efficiency = as_f64(key, value)?,
            "traffic.block_distance" => c.traffic.block_distance = as_f64(key, value)?,
            "traffic.clear_band" => c.traffic.clear_band = as_f64(key, value)?,
            "traffic.lane_change_speed_factor" => {
                c.traffic.lane_change_speed_factor = as_f64(key, value)?;
            }
            "events.lead_change_window" => c.events.lead_change_window = as_u64(key, value)?,
            "events.overtake_window" => c.events.overtake_window = as_u64(key, value)?,
            "events.lane_change_window" => c.events.lane_change_window = as_u64(key, value)?,
            "events.traffic_window" => c.events.traffic_window = as_u64(key, value)?,
            "commentary.max_phrases_per_tick" => {
                c.commentary.max_phrases_per_tick = usize::try_from(as_u64(key, value)?)
                    .with_context(|| format!("override '{key}' is too large"))?;
            }
            _ => bail!(
                "unknown override key '{key}'. Valid keys: {}, leg_types.<leg>.{{{}}}",
                VALID_KEYS.join(", "),
                LEG_TYPE_FIELDS.join(",")
            ),
        }
    }
    race_content::validate_content(content).context("overrides produced invalid tuning")
}

fn apply_leg_type(
    content: &mut RaceContent,
    key: &str,
    rest: &str,
    value: &serde_json::Value,
) -> Result<()> {
    let Some((leg, field)) = rest.split_once('.') else {
        bail!("override '{key}' must be leg_types.<leg>.<field>");
    };
    let table = &mut content.leg_types;
    let profile: &mut LegTypeProfile = match leg {
        "front_runner" => &mut table.front_runner,
        "stalker" => &mut table.stalker,
        "closer" => &mut table.closer,
        "rail_runner" => &mut table.rail_runner,
        _ => bail!("override '{key}': unknown leg type '{leg}'"),
    };
    match field {
        "lane_change_aggressiveness" => profile.lane_change_aggressiveness = as_f64(key, value)?,
        "inside_drift_chance" => profile.inside_drift_chance = as_f64(key, value)?,
        _ => bail!(
            "override '{key}': unknown field '{field}'. Valid fields: {}",
            LEG_TYPE_FIELDS.join(", ")
        ),
    }
    Ok(())
}

fn as_f64(key: &str, value: &serde_json::Value) -> Result<f64> {
    value
        .as_f64()
        .with_context(|| format!("override '{key}': expected a number, got {value}"))
}

fn as_u64(key: &str, value: &serde_json::Value) -> Result<u64> {
    value
        .as_u64()
        .with_context(|| format!("override '{key}': expected a non-negative integer, got {value}"))
}
