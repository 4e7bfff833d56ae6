//! Lane contention and traffic.
//!
//! [`resolve_traffic`] is pure apart from the RNG: it reads the field as it
//! stands at the moment the entrant is processed and returns the lane and
//! speed to apply. The engine processes entrants leader-first and writes each
//! outcome back into the field before the next call, so trailing entrants see
//! the lanes and positions the leaders have already taken this tick.

use rand::Rng;

use crate::leg_type::{LanePreference, LegTypeProfile, TrafficResponse};
use crate::TrafficConstants;

/// Where one entrant stands, as seen by the others.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldPosition {
    pub post: u32,
    pub lane: u32,
    pub distance: f64,
    pub finished: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct TrafficRequest<'a> {
    pub post: u32,
    pub lane: u32,
    pub distance: f64,
    /// Speed run on the previous tick.
    pub current_speed: f64,
    /// Speed the modifier pipeline produced for this tick.
    pub proposed_speed: f64,
    pub lane_count: u32,
    pub profile: &'a LegTypeProfile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrafficEffect {
    Clear,
    /// Moved one lane toward the rail with room to spare.
    TuckIn { from: u32, to: u32 },
    /// Swung out of (or in from) traffic into an adjacent lane.
    LaneChange { from: u32, to: u32 },
    /// Boxed in and checked.
    HeldUp,
    /// Boxed in but slipping through along the inside.
    InsideRun,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrafficOutcome {
    pub lane: u32,
    pub speed: f64,
    /// `speed / proposed`; exactly 1.0 when the entrant met no traffic.
    pub multiplier: f64,
    pub effect: TrafficEffect,
}

impl TrafficOutcome {
    fn unchanged(lane: u32, speed: f64, effect: TrafficEffect) -> Self {
        Self {
            lane,
            speed,
            multiplier: 1.0,
            effect,
        }
    }

    /// Blocked this tick, whether or not it found a way out.
    pub fn congested(&self) -> bool {
        matches!(
            self.effect,
            TrafficEffect::LaneChange { .. } | TrafficEffect::HeldUp | TrafficEffect::InsideRun
        )
    }

    /// Blocked with nowhere to go.
    pub fn boxed_in(&self) -> bool {
        matches!(self.effect, TrafficEffect::HeldUp | TrafficEffect::InsideRun)
    }
}

pub fn resolve_traffic(
    request: &TrafficRequest<'_>,
    field: &[FieldPosition],
    constants: &TrafficConstants,
    rng: &mut impl Rng,
) -> TrafficOutcome {
    if !is_blocked(request, field, constants) {
        return drift_inside(request, field, constants, rng);
    }

    if rng.gen::<f64>() < request.profile.lane_change_aggressiveness {
        if let Some(to) = open_adjacent_lane(request, field, constants) {
            return TrafficOutcome {
                lane: to,
                speed: request.proposed_speed * constants.lane_change_speed_factor,
                multiplier: constants.lane_change_speed_factor,
                effect: TrafficEffect::LaneChange {
                    from: request.lane,
                    to,
                },
            };
        }
    }

    traffic_effect(request)
}

/// Someone ahead in the same lane leaves less than this tick's run plus the
/// clearance distance.
pub fn is_blocked(
    request: &TrafficRequest<'_>,
    field: &[FieldPosition],
    constants: &TrafficConstants,
) -> bool {
    let reach = request.proposed_speed + constants.block_distance;
    others(request, field).any(|other| {
        other.lane == request.lane
            && other.distance > request.distance
            && other.distance - request.distance < reach
    })
}

/// No rival in `lane` anywhere between just behind this entrant and where it
/// will be after this tick's run.
pub fn lane_is_clear(
    request: &TrafficRequest<'_>,
    lane: u32,
    field: &[FieldPosition],
    constants: &TrafficConstants,
) -> bool {
    let low = request.distance - constants.clear_band;
    let high = request.distance + request.proposed_speed + constants.clear_band;
    !others(request, field)
        .any(|other| other.lane == lane && other.distance >= low && other.distance <= high)
}

fn others<'f>(
    request: &TrafficRequest<'_>,
    field: &'f [FieldPosition],
) -> impl Iterator<Item = &'f FieldPosition> {
    let post = request.post;
    field
        .iter()
        .filter(move |other| other.post != post && !other.finished)
}

fn open_adjacent_lane(
    request: &TrafficRequest<'_>,
    field: &[FieldPosition],
    constants: &TrafficConstants,
) -> Option<u32> {
    let inside = request.lane.checked_sub(1).filter(|lane| *lane >= 1);
    let outside = Some(request.lane + 1).filter(|lane| *lane <= request.lane_count);
    let candidates = match request.profile.lane_preference {
        LanePreference::Inside => [inside, outside],
        LanePreference::Outside => [outside, inside],
    };
    candidates
        .into_iter()
        .flatten()
        .find(|lane| lane_is_clear(request, *lane, field, constants))
}

fn drift_inside(
    request: &TrafficRequest<'_>,
    field: &[FieldPosition],
    constants: &TrafficConstants,
    rng: &mut impl Rng,
) -> TrafficOutcome {
    if request.lane > 1
        && rng.gen::<f64>() < request.profile.inside_drift_chance
        && lane_is_clear(request, request.lane - 1, field, constants)
    {
        let to = request.lane - 1;
        return TrafficOutcome::unchanged(
            to,
            request.proposed_speed,
            TrafficEffect::TuckIn {
                from: request.lane,
                to,
            },
        );
    }
    TrafficOutcome::unchanged(request.lane, request.proposed_speed, TrafficEffect::Clear)
}

/// Boxed in: a penalty for most archetypes, a bonus proportional to the
/// entrant's current speed for the inside specialist.
fn traffic_effect(request: &TrafficRequest<'_>) -> TrafficOutcome {
    let proposed = request.proposed_speed;
    let (speed, effect) = match request.profile.traffic {
        TrafficResponse::HeldUp { penalty } => (proposed * penalty, TrafficEffect::HeldUp),
        TrafficResponse::InsideRun { bonus_rate } => (
            proposed + request.current_speed.max(0.0) * bonus_rate,
            TrafficEffect::InsideRun,
        ),
    };
    let multiplier = if proposed > 0.0 { speed / proposed } else { 1.0 };
    TrafficOutcome {
        lane: request.lane,
        speed,
        multiplier,
        effect,
    }
}
