//! Speed modifier pipeline.
//!
//! `speed = base × stat × environment × phase × stamina × variance`, clamped
//! below at `min_speed`. Each factor is a pure function of the context and the
//! tuning constants; only the variance draws from the RNG.

use rand::Rng;

use crate::leg_type::LegTypeProfile;
use crate::{EntrantState, RaceClock, RaceConfiguration, SpeedConstants};

const STAT_NEUTRAL: f64 = 50.0;

/// Read-only view of one entrant on one tick.
#[derive(Debug, Clone, Copy)]
pub struct ModifierContext<'a> {
    pub entrant: &'a EntrantState,
    pub profile: &'a LegTypeProfile,
    pub config: &'a RaceConfiguration,
    pub clock: RaceClock,
    pub tick: u64,
    pub stamina_pool_max: f64,
}

impl ModifierContext<'_> {
    pub fn progress(&self) -> f64 {
        self.clock.progress(self.tick)
    }
}

/// Every factor of one speed computation, kept for inspection and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedBreakdown {
    pub base: f64,
    pub stat: f64,
    pub environment: f64,
    pub phase: f64,
    pub stamina: f64,
    pub variance: f64,
    pub total: f64,
}

pub fn compute_speed(
    ctx: &ModifierContext<'_>,
    constants: &SpeedConstants,
    rng: &mut impl Rng,
) -> SpeedBreakdown {
    let spec = &ctx.entrant.spec;
    let stat = stat_modifier(spec.stats.speed, spec.stats.agility, constants);
    let environment = environment_modifier(ctx, constants);
    let phase = ctx.profile.phase_bonus(ctx.progress());
    let stamina = stamina_modifier(
        ctx.entrant.stamina_remaining,
        ctx.stamina_pool_max,
        constants,
    );
    let variance = random_variance(constants.variance_band, rng);

    let raw = constants.base_speed * stat * environment * phase * stamina * variance;
    SpeedBreakdown {
        base: constants.base_speed,
        stat,
        environment,
        phase,
        stamina,
        variance,
        total: raw.max(constants.min_speed),
    }
}

/// `1 + (stat - 50) × k` for speed and agility independently, multiplied.
pub fn stat_modifier(speed: f64, agility: f64, constants: &SpeedConstants) -> f64 {
    single_stat(speed, constants) * single_stat(agility, constants)
}

fn single_stat(value: f64, constants: &SpeedConstants) -> f64 {
    let capped = value.clamp(0.0, constants.stat_ceiling);
    1.0 + (capped - STAT_NEUTRAL) * constants.stat_coefficient
}

pub fn environment_modifier(ctx: &ModifierContext<'_>, constants: &SpeedConstants) -> f64 {
    let preference = ctx
        .entrant
        .spec
        .preferred_surface
        .or(ctx.profile.surface_affinity);
    let surface = match preference {
        Some(preferred) if preferred == ctx.config.surface => {
            constants.surface_preferred_multiplier
        }
        Some(_) => constants.surface_mismatch_multiplier,
        None => 1.0,
    };
    surface * constants.condition_multiplier(ctx.config.condition)
}

/// 1.0 above the threshold; below it, falls along `1 - (1 - floor)(1 - x/t)²`
/// to `floor` at an empty pool, so the penalty steepens as the horse tires.
pub fn stamina_modifier(remaining: f64, pool_max: f64, constants: &SpeedConstants) -> f64 {
    let fraction = (remaining / pool_max).clamp(0.0, 1.0);
    let threshold = constants.stamina_threshold;
    if threshold <= 0.0 || fraction >= threshold {
        return 1.0;
    }
    let depth = 1.0 - fraction / threshold;
    1.0 - (1.0 - constants.stamina_floor) * depth * depth
}

pub fn random_variance(band: f64, rng: &mut impl Rng) -> f64 {
    if band <= 0.0 {
        return 1.0;
    }
    1.0 + rng.gen_range(-band..=band)
}
