//! Event narration.
//!
//! Phrases are drawn from a per-kind template bank using the commentary RNG
//! stream, so changing the wording never perturbs the physics.

use std::collections::BTreeMap;

use rand::Rng;

use crate::events::{RaceEvent, TickEvents};
use crate::{CommentaryConstants, HorseId};

pub(crate) const FINISH_WIN: &[&str] = &[
    "{horse} hits the wire first!",
    "{horse} gets there first and wins it!",
    "And it's {horse} who takes the race!",
];

const FINISH_PLACED: &[&str] = &[
    "{horse} crosses the line in {place}.",
    "{horse} comes home {place}.",
];

const FINISH_INCOMPLETE: &[&str] = &[
    "{horse} never reaches the wire and is classified {place}.",
    "{horse} is still out there as the race is called, {place}.",
];

const LEAD_CHANGE: &[&str] = &[
    "{horse} takes the lead from {other}!",
    "{horse} goes past {other} to head the field.",
    "A new leader: {horse} displaces {other}.",
];

const LEAD_CHANGE_STRETCH: &[&str] = &[
    "{horse} collars {other} in the stretch!",
    "Down the lane, {horse} wrests the lead from {other}!",
];

const OVERTAKE: &[&str] = &[
    "{horse} moves past {other}.",
    "{horse} picks off {other}.",
    "{horse} gets by {other}.",
];

const TRAFFIC: &[&str] = &[
    "{horse} is boxed in and has nowhere to go.",
    "Trouble for {horse}, stuck in traffic.",
    "{horse} has to check, no room in front.",
];

const LANE_CHANGE_OUT: &[&str] = &[
    "{horse} swings out to lane {to}.",
    "{horse} angles wide into lane {to}.",
];

const LANE_CHANGE_IN: &[&str] = &[
    "{horse} ducks inside to lane {to}.",
    "{horse} slides over toward the rail, now in lane {to}.",
];

/// Progress past which lead changes use stretch phrasing.
const STRETCH_PROGRESS: f64 = 0.8;

/// Read-only inputs the templates need beyond the events themselves.
#[derive(Debug, Clone, Copy)]
pub struct CommentaryContext<'a> {
    pub names: &'a BTreeMap<HorseId, String>,
    pub progress: f64,
}

impl CommentaryContext<'_> {
    fn name<'n>(&'n self, horse: &'n HorseId) -> &'n str {
        self.names.get(horse).map_or(horse.0.as_str(), String::as_str)
    }
}

/// One line for the tick, or an empty string when nothing happened.
pub fn generate(
    events: &TickEvents,
    ctx: &CommentaryContext<'_>,
    constants: &CommentaryConstants,
    rng: &mut impl Rng,
) -> String {
    phrases(events, ctx, constants, rng).join(" ")
}

/// Phrases in precedence order. Every finish is narrated; other kinds fill
/// whatever remains of `max_phrases_per_tick`.
pub fn phrases(
    events: &TickEvents,
    ctx: &CommentaryContext<'_>,
    constants: &CommentaryConstants,
    rng: &mut impl Rng,
) -> Vec<String> {
    let mut ordered: Vec<&RaceEvent> = events.events.iter().collect();
    ordered.sort_by_key(|event| event.kind());

    let finishes = ordered
        .iter()
        .filter(|event| matches!(event, RaceEvent::Finish { .. }))
        .count();
    let budget = finishes.max(constants.max_phrases_per_tick);

    ordered
        .into_iter()
        .take(budget)
        .map(|event| phrase(event, ctx, rng))
        .collect()
}

fn phrase(event: &RaceEvent, ctx: &CommentaryContext<'_>, rng: &mut impl Rng) -> String {
    let horse = ctx.name(event.horse());
    match event {
        RaceEvent::Finish {
            order, completed, ..
        } => {
            let bank = match (*completed, *order) {
                (false, _) => FINISH_INCOMPLETE,
                (true, 1) => FINISH_WIN,
                (true, _) => FINISH_PLACED,
            };
            pick(bank, rng)
                .replace("{horse}", horse)
                .replace("{place}", &ordinal(*order))
        }
        RaceEvent::LeadChange { previous, .. } => {
            let bank = if ctx.progress >= STRETCH_PROGRESS {
                LEAD_CHANGE_STRETCH
            } else {
                LEAD_CHANGE
            };
            pick(bank, rng)
                .replace("{horse}", horse)
                .replace("{other}", ctx.name(previous))
        }
        RaceEvent::Overtake { passed, .. } => pick(OVERTAKE, rng)
            .replace("{horse}", horse)
            .replace("{other}", ctx.name(passed)),
        RaceEvent::Traffic { .. } => pick(TRAFFIC, rng).replace("{horse}", horse),
        RaceEvent::LaneChange { from, to, .. } => {
            let bank = if to > from {
                LANE_CHANGE_OUT
            } else {
                LANE_CHANGE_IN
            };
            pick(bank, rng)
                .replace("{horse}", horse)
                .replace("{to}", &to.to_string())
        }
    }
}

fn pick<'t>(bank: &[&'t str], rng: &mut impl Rng) -> &'t str {
    bank[rng.gen_range(0..bank.len())]
}

pub fn ordinal(n: u32) -> String {
    let teens = (11..=13).contains(&(n % 100));
    let suffix = match n % 10 {
        1 if !teens => "st",
        2 if !teens => "nd",
        3 if !teens => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}
