//! Per-tick stamina depletion.

use crate::leg_type::LegTypeProfile;
use crate::{HorseStats, StaminaConstants};

const STAT_NEUTRAL: f64 = 50.0;

/// Inputs to one depletion step.
#[derive(Debug, Clone, Copy)]
pub struct DepletionInput<'a> {
    pub stats: &'a HorseStats,
    pub profile: &'a LegTypeProfile,
    pub distance_furlongs: f64,
    /// Speed actually run this tick.
    pub current_speed: f64,
    /// Nominal speed the pace multiplier is measured against.
    pub base_speed: f64,
    pub progress: f64,
}

/// `base(distance) × efficiency × pace × leg type`, never negative.
pub fn depletion(input: &DepletionInput<'_>, constants: &StaminaConstants) -> f64 {
    let amount = base_rate(input.distance_furlongs, constants)
        * efficiency_multiplier(input.stats, constants)
        * pace_multiplier(input.current_speed, input.base_speed)
        * input.profile.burn_multiplier(input.progress);
    amount.max(0.0)
}

/// Longer races cost more per tick, not just more ticks.
pub fn base_rate(distance_furlongs: f64, constants: &StaminaConstants) -> f64 {
    let ratio = (distance_furlongs / constants.reference_distance_furlongs).max(0.0);
    constants.base_rate_per_tick * ratio.powf(constants.distance_exponent)
}

/// Stamina is the size of the tank, durability the fuel economy. Both lower
/// the multiplier above the neutral 50.
pub fn efficiency_multiplier(stats: &HorseStats, constants: &StaminaConstants) -> f64 {
    let tank = (1.0 - (stats.stamina - STAT_NEUTRAL) * constants.stamina_coefficient)
        .max(constants.min_efficiency);
    let economy = (1.0 - (stats.durability - STAT_NEUTRAL) * constants.durability_coefficient)
        .max(constants.min_efficiency);
    tank * economy
}

pub fn pace_multiplier(current_speed: f64, base_speed: f64) -> f64 {
    if base_speed <= 0.0 {
        return 1.0;
    }
    (current_speed / base_speed).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::base_content;
    use crate::LegType;

    fn neutral_stats() -> HorseStats {
        HorseStats {
            speed: 50.0,
            stamina: 50.0,
            agility: 50.0,
            durability: 50.0,
        }
    }

    #[test]
    fn longer_races_deplete_faster_per_tick() {
        let content = base_content();
        let stats = neutral_stats();
        let profile = content.leg_types.profile(LegType::Stalker);
        let at = |furlongs: f64| {
            depletion(
                &DepletionInput {
                    stats: &stats,
                    profile,
                    distance_furlongs: furlongs,
                    current_speed: 16.0,
                    base_speed: 16.0,
                    progress: 0.5,
                },
                &content.constants.stamina,
            )
        };
        assert!(at(6.0) < at(8.0));
        assert!(at(8.0) < at(12.0));
    }

    #[test]
    fn reference_distance_gives_base_rate() {
        let constants = base_content().constants.stamina;
        assert!((base_rate(8.0, &constants) - constants.base_rate_per_tick).abs() < 1e-12);
    }

    #[test]
    fn stamina_and_durability_both_improve_efficiency() {
        let constants = base_content().constants.stamina;
        let neutral = efficiency_multiplier(&neutral_stats(), &constants);
        let big_tank = efficiency_multiplier(
            &HorseStats {
                stamina: 90.0,
                ..neutral_stats()
            },
            &constants,
        );
        let economical = efficiency_multiplier(
            &HorseStats {
                durability: 90.0,
                ..neutral_stats()
            },
            &constants,
        );
        assert!((neutral - 1.0).abs() < 1e-12);
        assert!(big_tank < neutral);
        assert!(economical < neutral);
        let both = efficiency_multiplier(
            &HorseStats {
                stamina: 90.0,
                durability: 90.0,
                ..neutral_stats()
            },
            &constants,
        );
        assert!((both - big_tank * economical).abs() < 1e-12);
    }

    #[test]
    fn efficiency_is_floored() {
        let constants = base_content().constants.stamina;
        let freak = HorseStats {
            stamina: 1000.0,
            durability: 1000.0,
            ..neutral_stats()
        };
        let floor = constants.min_efficiency * constants.min_efficiency;
        assert!((efficiency_multiplier(&freak, &constants) - floor).abs() < 1e-12);
    }

    #[test]
    fn pace_is_linear_in_speed_ratio() {
        assert!((pace_multiplier(20.0, 16.0) - 1.25).abs() < 1e-12);
        assert!((pace_multiplier(8.0, 16.0) - 0.5).abs() < 1e-12);
        assert!(pace_multiplier(0.0, 16.0).abs() < 1e-12);
    }

    #[test]
    fn front_runner_burns_hardest_early() {
        let content = base_content();
        let stats = neutral_stats();
        let profile = content.leg_types.profile(LegType::FrontRunner);
        let at = |progress: f64| {
            depletion(
                &DepletionInput {
                    stats: &stats,
                    profile,
                    distance_furlongs: 8.0,
                    current_speed: 16.0,
                    base_speed: 16.0,
                    progress,
                },
                &content.constants.stamina,
            )
        };
        assert!(at(0.1) > at(0.5));
        assert!(at(0.5) > at(0.9));
    }
}
