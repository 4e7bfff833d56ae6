//! Shared test fixtures for race_core and downstream crates.
//!
//! `base_content()` mirrors the shipped `content/` tuning so tests exercise
//! realistic numbers. The entrant helpers build rosters without boilerplate.

use crate::leg_type::{
    LanePreference, LegTypeProfile, LegTypeTable, PhaseBehavior, PhaseWindow, TrafficResponse,
    TrainingFocus,
};
use crate::{
    CommentaryConstants, Constants, EntrantSpec, EventConstants, HorseId, HorseStats, LegType,
    RaceClass, RaceConfiguration, RaceContent, RaceId, SpeedConstants, StaminaConstants, Surface,
    TrackCondition, TrafficConstants,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use smallvec::smallvec;
use std::collections::BTreeMap;

pub fn base_content() -> RaceContent {
    RaceContent {
        content_version: "test".to_string(),
        constants: base_constants(),
        leg_types: base_leg_types(),
    }
}

fn base_constants() -> Constants {
    Constants {
        tick_cap_multiplier: 3.0,
        speed: SpeedConstants {
            base_speed: 16.0,
            min_speed: 0.5,
            stat_coefficient: 0.002,
            stat_ceiling: 100.0,
            surface_preferred_multiplier: 1.02,
            surface_mismatch_multiplier: 0.97,
            condition_multipliers: BTreeMap::from([
                (TrackCondition::Fast, 1.0),
                (TrackCondition::Good, 0.99),
                (TrackCondition::Muddy, 0.95),
                (TrackCondition::Soft, 0.96),
                (TrackCondition::Frozen, 0.93),
            ]),
            stamina_threshold: 0.3,
            stamina_floor: 0.6,
            variance_band: 0.01,
        },
        stamina: StaminaConstants {
            pool_max: 100.0,
            base_rate_per_tick: 0.55,
            reference_distance_furlongs: 8.0,
            distance_exponent: 0.5,
            stamina_coefficient: 0.004,
            durability_coefficient: 0.003,
            min_efficiency: 0.25,
        },
        traffic: TrafficConstants {
            block_distance: 3.0,
            clear_band: 2.5,
            lane_change_speed_factor: 0.98,
        },
        events: EventConstants {
            lead_change_window: 3,
            overtake_window: 4,
            lane_change_window: 6,
            traffic_window: 8,
        },
        commentary: CommentaryConstants {
            max_phrases_per_tick: 3,
        },
    }
}

fn base_leg_types() -> LegTypeTable {
    LegTypeTable {
        front_runner: LegTypeProfile {
            phase: PhaseBehavior::Windows {
                windows: smallvec![PhaseWindow {
                    start: 0.0,
                    end: 0.3,
                    bonus: 1.05,
                }],
            },
            stamina_burn: [1.3, 1.0, 0.9],
            lane_change_aggressiveness: 0.5,
            inside_drift_chance: 0.25,
            traffic: TrafficResponse::HeldUp { penalty: 0.9 },
            lane_preference: LanePreference::Outside,
            surface_affinity: Some(Surface::Dirt),
            preferred_training: TrainingFocus::Sprint,
        },
        stalker: LegTypeProfile {
            phase: PhaseBehavior::Windows {
                windows: smallvec![
                    PhaseWindow {
                        start: 0.3,
                        end: 0.6,
                        bonus: 1.02,
                    },
                    PhaseWindow {
                        start: 0.75,
                        end: 1.0,
                        bonus: 1.03,
                    },
                ],
            },
            stamina_burn: [1.0, 1.05, 1.0],
            lane_change_aggressiveness: 0.6,
            inside_drift_chance: 0.15,
            traffic: TrafficResponse::HeldUp { penalty: 0.92 },
            lane_preference: LanePreference::Outside,
            surface_affinity: None,
            preferred_training: TrainingFocus::Agility,
        },
        closer: LegTypeProfile {
            phase: PhaseBehavior::Windows {
                windows: smallvec![PhaseWindow {
                    start: 0.7,
                    end: 1.0,
                    bonus: 1.06,
                }],
            },
            stamina_burn: [0.8, 1.0, 1.2],
            lane_change_aggressiveness: 0.7,
            inside_drift_chance: 0.05,
            traffic: TrafficResponse::HeldUp { penalty: 0.94 },
            lane_preference: LanePreference::Outside,
            surface_affinity: Some(Surface::Turf),
            preferred_training: TrainingFocus::Endurance,
        },
        rail_runner: LegTypeProfile {
            phase: PhaseBehavior::TrafficDriven,
            stamina_burn: [1.0, 1.0, 1.0],
            lane_change_aggressiveness: 0.15,
            inside_drift_chance: 0.4,
            traffic: TrafficResponse::InsideRun { bonus_rate: 0.04 },
            lane_preference: LanePreference::Inside,
            surface_affinity: None,
            preferred_training: TrainingFocus::Gate,
        },
    }
}

pub fn entrant(id: &str, leg_type: LegType, stats: [f64; 4]) -> EntrantSpec {
    let [speed, stamina, agility, durability] = stats;
    EntrantSpec {
        horse_id: HorseId(id.to_string()),
        name: format!("Horse {id}"),
        leg_type,
        stats: HorseStats {
            speed,
            stamina,
            agility,
            durability,
        },
        preferred_surface: None,
    }
}

/// Entrant A from the reference scenario: fast front runner.
pub fn front_runner_a() -> EntrantSpec {
    entrant("a", LegType::FrontRunner, [90.0, 70.0, 80.0, 60.0])
}

/// Entrant B from the reference scenario: neutral closer.
pub fn closer_b() -> EntrantSpec {
    entrant("b", LegType::Closer, [50.0, 50.0, 50.0, 50.0])
}

pub fn race_config(distance_furlongs: f64, lane_count: u32, seed: u64) -> RaceConfiguration {
    RaceConfiguration {
        race_id: RaceId("race_test".to_string()),
        surface: Surface::Dirt,
        condition: TrackCondition::Fast,
        distance_furlongs,
        lane_count,
        seed,
        race_class: RaceClass::Allowance,
        base_purse: 50_000.0,
        entry_fee: 500.0,
    }
}

pub fn make_rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(42)
}
