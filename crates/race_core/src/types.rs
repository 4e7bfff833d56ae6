//! Type definitions for `race_core`.
//!
//! Race inputs, per-entrant runtime state and the finalized result.

use serde::{Deserialize, Serialize};

use crate::leg_type::{LegType, LegTypeTable};
use crate::Constants;

/// Track length of one furlong in metres. Distances are simulated in metres.
pub const METRES_PER_FURLONG: f64 = 201.168;

// ---------------------------------------------------------------------------
// ID newtypes
// ---------------------------------------------------------------------------

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(HorseId);
string_id!(RaceId);

// ---------------------------------------------------------------------------
// Core enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    Dirt,
    Turf,
    Synthetic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackCondition {
    Fast,
    Good,
    Muddy,
    Soft,
    Frozen,
}

impl TrackCondition {
    pub const ALL: [TrackCondition; 5] = [
        TrackCondition::Fast,
        TrackCondition::Good,
        TrackCondition::Muddy,
        TrackCondition::Soft,
        TrackCondition::Frozen,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaceClass {
    Maiden,
    Claiming,
    Allowance,
    Stakes,
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HorseStats {
    pub speed: f64,
    pub stamina: f64,
    pub agility: f64,
    pub durability: f64,
}

impl HorseStats {
    /// Named view used for validation and error reporting.
    pub fn named(&self) -> [(&'static str, f64); 4] {
        [
            ("speed", self.speed),
            ("stamina", self.stamina),
            ("agility", self.agility),
            ("durability", self.durability),
        ]
    }
}

/// One horse as entered into a race, with its resolved stats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntrantSpec {
    pub horse_id: HorseId,
    pub name: String,
    pub leg_type: LegType,
    pub stats: HorseStats,
    /// Overrides the leg type's surface affinity when set.
    #[serde(default)]
    pub preferred_surface: Option<Surface>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceConfiguration {
    pub race_id: RaceId,
    pub surface: Surface,
    pub condition: TrackCondition,
    pub distance_furlongs: f64,
    pub lane_count: u32,
    pub seed: u64,
    pub race_class: RaceClass,
    #[serde(default)]
    pub base_purse: f64,
    /// Added to the purse once per entrant.
    #[serde(default)]
    pub entry_fee: f64,
}

impl RaceConfiguration {
    pub fn distance_m(&self) -> f64 {
        self.distance_furlongs * METRES_PER_FURLONG
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn total_purse(&self, field_size: usize) -> f64 {
        self.base_purse + self.entry_fee * field_size as f64
    }
}

/// Tuning content for a run: numeric constants and the leg-type table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceContent {
    pub content_version: String,
    pub constants: Constants,
    pub leg_types: LegTypeTable,
}

// ---------------------------------------------------------------------------
// Runtime state
// ---------------------------------------------------------------------------

/// Tick budget derived from distance and the nominal base speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceClock {
    /// Ticks a horse at exactly the base speed needs to finish.
    pub expected_ticks: u64,
    /// Safety cap. The run always ends at or before this tick.
    pub tick_cap: u64,
}

impl RaceClock {
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn new(distance_m: f64, base_speed: f64, cap_multiplier: f64) -> Self {
        let expected_ticks = ((distance_m / base_speed).ceil() as u64).max(1);
        let tick_cap = ((expected_ticks as f64 * cap_multiplier).ceil() as u64).max(expected_ticks);
        Self {
            expected_ticks,
            tick_cap,
        }
    }

    /// Race progress in `[0, 1]` as a fraction of the expected tick count.
    #[allow(clippy::cast_precision_loss)]
    pub fn progress(&self, tick: u64) -> f64 {
        (tick as f64 / self.expected_ticks as f64).min(1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FinishRecord {
    pub tick: u64,
    /// Fractional crossing time in ticks.
    pub time: f64,
    /// Provisional crossing order.
    pub order: u32,
    /// False when the entrant was finalized at the tick cap.
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntrantState {
    pub spec: EntrantSpec,
    /// 1-based starting gate, also the initial lane.
    pub post_position: u32,
    pub lane: u32,
    pub distance_covered: f64,
    pub stamina_remaining: f64,
    pub current_speed: f64,
    /// Held up in traffic on the most recent tick.
    pub held_up: bool,
    pub finish: Option<FinishRecord>,
}

impl EntrantState {
    pub fn new(spec: EntrantSpec, post_position: u32, stamina_pool_max: f64) -> Self {
        Self {
            spec,
            post_position,
            lane: post_position,
            distance_covered: 0.0,
            stamina_remaining: stamina_pool_max,
            current_speed: 0.0,
            held_up: false,
            finish: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finish.is_some()
    }
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntrantResult {
    pub horse_id: HorseId,
    pub name: String,
    pub leg_type: LegType,
    pub post_position: u32,
    pub place: u32,
    pub finish_tick: u64,
    pub finish_time: f64,
    pub distance_covered: f64,
    pub completed: bool,
    pub payout: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentaryLine {
    pub tick: u64,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RaceStats {
    pub ticks_run: u64,
    pub expected_ticks: u64,
    pub tick_cap: u64,
    /// True when the safety cap ended the race with horses still running.
    pub capped: bool,
    pub lead_changes: u32,
    pub overtakes: u32,
    pub lane_changes: u32,
    pub traffic_incidents: u32,
    pub total_purse: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceResult {
    pub config: RaceConfiguration,
    /// Ordered by place.
    pub results: Vec<EntrantResult>,
    /// Ordered by tick; never contains blank lines.
    pub commentary: Vec<CommentaryLine>,
    pub stats: RaceStats,
}

impl RaceResult {
    pub fn winner(&self) -> Option<&EntrantResult> {
        self.results.first()
    }

    pub fn result_for(&self, horse_id: &HorseId) -> Option<&EntrantResult> {
        self.results.iter().find(|r| &r.horse_id == horse_id)
    }
}
