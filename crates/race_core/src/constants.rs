//! Tuning constants. Every game-balance number the engine uses lives here and
//! is loaded from content, never hard-coded in the calculators.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{check_min, check_range};
use crate::{ConfigError, TrackCondition};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constants {
    /// Safety cap as a multiple of the expected tick count.
    pub tick_cap_multiplier: f64,
    pub speed: SpeedConstants,
    pub stamina: StaminaConstants,
    pub traffic: TrafficConstants,
    pub events: EventConstants,
    pub commentary: CommentaryConstants,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedConstants {
    /// Metres per tick shared by every entrant before modifiers.
    pub base_speed: f64,
    /// Lower clamp on the composed speed. Must be non-negative.
    pub min_speed: f64,
    /// Slope of the linear stat modifier around the neutral value 50.
    pub stat_coefficient: f64,
    /// Stats above this are treated as the ceiling.
    pub stat_ceiling: f64,
    pub surface_preferred_multiplier: f64,
    pub surface_mismatch_multiplier: f64,
    pub condition_multipliers: BTreeMap<TrackCondition, f64>,
    /// Stamina fraction below which the fatigue curve applies.
    pub stamina_threshold: f64,
    /// Stamina modifier reached at an empty pool.
    pub stamina_floor: f64,
    /// Half-width of the symmetric random band, e.g. 0.01 for ±1%.
    pub variance_band: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaminaConstants {
    pub pool_max: f64,
    /// Depletion per tick at the reference distance for a neutral horse.
    pub base_rate_per_tick: f64,
    pub reference_distance_furlongs: f64,
    /// Exponent on `distance / reference`; positive so longer races cost more per tick.
    pub distance_exponent: f64,
    pub stamina_coefficient: f64,
    pub durability_coefficient: f64,
    pub min_efficiency: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficConstants {
    /// Clearance (metres) needed in front after this tick's movement.
    pub block_distance: f64,
    /// Half-width (metres) of the band that must be empty to take a lane.
    pub clear_band: f64,
    /// Speed multiplier on the tick an entrant swings out of traffic.
    pub lane_change_speed_factor: f64,
}

/// Debounce windows, in ticks, per event kind. Finishes are never debounced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventConstants {
    pub lead_change_window: u64,
    pub overtake_window: u64,
    pub lane_change_window: u64,
    pub traffic_window: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentaryConstants {
    /// Cap on non-finish phrases combined into one tick's line.
    pub max_phrases_per_tick: usize,
}

impl Constants {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_min("tick_cap_multiplier", self.tick_cap_multiplier, 1.0)?;
        self.speed.validate()?;
        self.stamina.validate()?;
        self.traffic.validate()?;
        if self.commentary.max_phrases_per_tick == 0 {
            return Err(ConfigError::InvalidTuning {
                field: "commentary.max_phrases_per_tick".to_string(),
                reason: "must allow at least one phrase".to_string(),
            });
        }
        Ok(())
    }
}

impl SpeedConstants {
    pub fn condition_multiplier(&self, condition: TrackCondition) -> f64 {
        self.condition_multipliers
            .get(&condition)
            .copied()
            .unwrap_or(1.0)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        check_min("speed.base_speed", self.base_speed, f64::MIN_POSITIVE)?;
        check_range("speed.min_speed", self.min_speed, 0.0, self.base_speed)?;
        // Keeps every single-stat modifier positive across [0, ceiling].
        check_range("speed.stat_coefficient", self.stat_coefficient, 0.0, 0.019)?;
        check_range("speed.stat_ceiling", self.stat_ceiling, 50.0, 100.0)?;
        check_min(
            "speed.surface_preferred_multiplier",
            self.surface_preferred_multiplier,
            0.0,
        )?;
        check_min(
            "speed.surface_mismatch_multiplier",
            self.surface_mismatch_multiplier,
            0.0,
        )?;
        for condition in TrackCondition::ALL {
            let Some(multiplier) = self.condition_multipliers.get(&condition) else {
                return Err(ConfigError::InvalidTuning {
                    field: "speed.condition_multipliers".to_string(),
                    reason: format!("missing entry for {condition:?}"),
                });
            };
            check_min("speed.condition_multipliers", *multiplier, 0.0)?;
        }
        check_range("speed.stamina_threshold", self.stamina_threshold, 0.0, 1.0)?;
        check_range("speed.stamina_floor", self.stamina_floor, 0.0, 1.0)?;
        check_range("speed.variance_band", self.variance_band, 0.0, 0.5)
    }
}

impl StaminaConstants {
    fn validate(&self) -> Result<(), ConfigError> {
        check_min("stamina.pool_max", self.pool_max, f64::MIN_POSITIVE)?;
        check_min("stamina.base_rate_per_tick", self.base_rate_per_tick, 0.0)?;
        check_min(
            "stamina.reference_distance_furlongs",
            self.reference_distance_furlongs,
            f64::MIN_POSITIVE,
        )?;
        check_min(
            "stamina.distance_exponent",
            self.distance_exponent,
            f64::MIN_POSITIVE,
        )?;
        check_min("stamina.stamina_coefficient", self.stamina_coefficient, 0.0)?;
        check_min(
            "stamina.durability_coefficient",
            self.durability_coefficient,
            0.0,
        )?;
        check_range("stamina.min_efficiency", self.min_efficiency, 0.0, 1.0)
    }
}

impl TrafficConstants {
    fn validate(&self) -> Result<(), ConfigError> {
        check_min("traffic.block_distance", self.block_distance, 0.0)?;
        check_min("traffic.clear_band", self.clear_band, 0.0)?;
        check_range(
            "traffic.lane_change_speed_factor",
            self.lane_change_speed_factor,
            0.0,
            1.0,
        )
    }
}
