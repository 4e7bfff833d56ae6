use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace, warn};

use crate::commentary::{self, CommentaryContext};
use crate::events::{standings, DetectorState, EventKind, TickEvents, TickSnapshot};
use crate::overtaking::{
    resolve_traffic, FieldPosition, TrafficEffect, TrafficOutcome, TrafficRequest,
};
use crate::speed::{compute_speed, ModifierContext};
use crate::stamina::{depletion, DepletionInput};
use crate::{
    error, CancelToken, CommentaryLine, ConfigError, EntrantResult, EntrantSpec, EntrantState,
    FinishRecord, HorseId, PurseTable, RaceClock, RaceConfiguration, RaceContent, RaceError,
    RaceResult, RaceStats,
};

/// Commentary draws from its own ChaCha stream so wording never shifts the
/// physics sequence.
const COMMENTARY_STREAM: u64 = 1;

/// Run a race to completion.
///
/// Order of operations per tick:
/// 1. Process unfinished entrants leader-first (see [`processing_order`]):
///    speed, traffic, distance, stamina, finish check.
/// 2. Number this tick's finishers by crossing time.
/// 3. On the cap tick, finalize everyone still running.
/// 4. Detect events against the previous snapshot, narrate, then replace the
///    snapshot.
///
/// After the last tick entrants are ranked and the purse table is consulted
/// exactly once.
pub fn simulate(
    config: &RaceConfiguration,
    entrants: &[EntrantSpec],
    content: &RaceContent,
    purse: &impl PurseTable,
) -> Result<RaceResult, RaceError> {
    simulate_with_cancel(config, entrants, content, purse, &CancelToken::new())
}

/// [`simulate`], checking `cancel` before every tick.
pub fn simulate_with_cancel(
    config: &RaceConfiguration,
    entrants: &[EntrantSpec],
    content: &RaceContent,
    purse: &impl PurseTable,
    cancel: &CancelToken,
) -> Result<RaceResult, RaceError> {
    validate(config, entrants, content)?;

    let mut run = RaceRun::new(config, entrants, content);
    debug!(
        race = %config.race_id,
        seed = config.seed,
        field = entrants.len(),
        expected_ticks = run.clock.expected_ticks,
        tick_cap = run.clock.tick_cap,
        "race start"
    );

    while !run.is_over() {
        if cancel.is_cancelled() {
            debug!(race = %config.race_id, tick = run.tick, "race cancelled");
            return Err(RaceError::Cancelled { tick: run.tick });
        }
        run.step()?;
    }
    Ok(run.into_result(purse))
}

/// Indices into `states`, furthest along first; ties go to the lower post.
pub fn processing_order(states: &[EntrantState]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..states.len()).collect();
    order.sort_by(|&a, &b| {
        states[b]
            .distance_covered
            .total_cmp(&states[a].distance_covered)
            .then(states[a].post_position.cmp(&states[b].post_position))
    });
    order
}

fn validate(
    config: &RaceConfiguration,
    entrants: &[EntrantSpec],
    content: &RaceContent,
) -> Result<(), ConfigError> {
    if entrants.is_empty() {
        return Err(ConfigError::EmptyField);
    }
    if !config.distance_furlongs.is_finite() || config.distance_furlongs <= 0.0 {
        return Err(ConfigError::NonPositiveDistance(config.distance_furlongs));
    }
    if (config.lane_count as usize) < entrants.len() {
        return Err(ConfigError::NotEnoughLanes {
            lanes: config.lane_count,
            field: entrants.len(),
        });
    }
    error::check_min("base_purse", config.base_purse, 0.0)?;
    error::check_min("entry_fee", config.entry_fee, 0.0)?;

    let mut seen = BTreeSet::new();
    for spec in entrants {
        for (stat, value) in spec.stats.named() {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::NonPositiveStat {
                    horse: spec.horse_id.clone(),
                    stat,
                    value,
                });
            }
        }
        if !seen.insert(&spec.horse_id) {
            return Err(ConfigError::DuplicateEntrant(spec.horse_id.clone()));
        }
    }

    content.constants.validate()?;
    content.leg_types.validate()
}

fn field_position(state: &EntrantState) -> FieldPosition {
    FieldPosition {
        post: state.post_position,
        lane: state.lane,
        distance: state.distance_covered,
        finished: state.is_finished(),
    }
}

fn invariant(horse: &HorseId, tick: u64, detail: String) -> RaceError {
    RaceError::InvariantViolation {
        horse: horse.clone(),
        tick,
        detail,
    }
}

/// Final ranking: crossing tick and time, then distance at the finish, post
/// position and horse id.
fn final_order(a: &EntrantState, b: &EntrantState) -> Ordering {
    let key = |s: &EntrantState| s.finish.map_or((u64::MAX, f64::INFINITY), |f| (f.tick, f.time));
    let (a_tick, a_time) = key(a);
    let (b_tick, b_time) = key(b);
    a_tick
        .cmp(&b_tick)
        .then(a_time.total_cmp(&b_time))
        .then(b.distance_covered.total_cmp(&a.distance_covered))
        .then(a.post_position.cmp(&b.post_position))
        .then_with(|| a.spec.horse_id.cmp(&b.spec.horse_id))
}

/// Mutable state of one run. Never escapes `simulate`.
pub(crate) struct RaceRun<'a> {
    config: &'a RaceConfiguration,
    content: &'a RaceContent,
    pub(crate) clock: RaceClock,
    /// Last completed tick.
    pub(crate) tick: u64,
    pub(crate) states: Vec<EntrantState>,
    /// Traffic outcome per entrant on the last tick; `None` for entrants that
    /// had already finished.
    pub(crate) traffic: Vec<Option<TrafficOutcome>>,
    names: BTreeMap<HorseId, String>,
    detector: DetectorState,
    physics_rng: ChaCha8Rng,
    commentary_rng: ChaCha8Rng,
    commentary: Vec<CommentaryLine>,
    stats: RaceStats,
    finished_count: u32,
}

impl<'a> RaceRun<'a> {
    /// Assumes inputs already passed validation.
    pub(crate) fn new(
        config: &'a RaceConfiguration,
        entrants: &[EntrantSpec],
        content: &'a RaceContent,
    ) -> Self {
        let constants = &content.constants;
        let pool = constants.stamina.pool_max;
        let states: Vec<EntrantState> = entrants
            .iter()
            .cloned()
            .zip(1u32..)
            .map(|(spec, post)| EntrantState::new(spec, post, pool))
            .collect();
        let traffic = vec![None; states.len()];
        let names = entrants
            .iter()
            .map(|spec| (spec.horse_id.clone(), spec.name.clone()))
            .collect();
        let mut commentary_rng = ChaCha8Rng::seed_from_u64(config.seed);
        commentary_rng.set_stream(COMMENTARY_STREAM);

        Self {
            config,
            content,
            clock: RaceClock::new(
                config.distance_m(),
                constants.speed.base_speed,
                constants.tick_cap_multiplier,
            ),
            tick: 0,
            states,
            traffic,
            names,
            detector: DetectorState::new(),
            physics_rng: ChaCha8Rng::seed_from_u64(config.seed),
            commentary_rng,
            commentary: Vec::new(),
            stats: RaceStats::default(),
            finished_count: 0,
        }
    }

    pub(crate) fn is_over(&self) -> bool {
        self.tick >= self.clock.tick_cap || self.states.iter().all(EntrantState::is_finished)
    }

    pub(crate) fn step(&mut self) -> Result<(), RaceError> {
        self.tick += 1;
        self.traffic.fill(None);
        let mut field: Vec<FieldPosition> = self.states.iter().map(field_position).collect();
        for idx in processing_order(&self.states) {
            if !self.states[idx].is_finished() {
                self.advance_entrant(idx, &mut field)?;
            }
        }
        self.order_tick_finishers();
        if self.tick >= self.clock.tick_cap {
            self.finalize_at_cap();
        }
        self.narrate();
        Ok(())
    }

    fn advance_entrant(
        &mut self,
        idx: usize,
        field: &mut [FieldPosition],
    ) -> Result<(), RaceError> {
        let tick = self.tick;
        let content = self.content;
        let constants = &content.constants;
        let pool = constants.stamina.pool_max;
        let finish_line = self.config.distance_m();
        let progress = self.clock.progress(tick);

        let state = &self.states[idx];
        let horse = &state.spec.horse_id;
        let profile = content.leg_types.profile(state.spec.leg_type);
        let ctx = ModifierContext {
            entrant: state,
            profile,
            config: self.config,
            clock: self.clock,
            tick,
            stamina_pool_max: pool,
        };
        let proposed = compute_speed(&ctx, &constants.speed, &mut self.physics_rng);
        let request = TrafficRequest {
            post: state.post_position,
            lane: state.lane,
            distance: state.distance_covered,
            current_speed: state.current_speed,
            proposed_speed: proposed.total,
            lane_count: self.config.lane_count,
            profile,
        };
        let outcome = resolve_traffic(&request, field, &constants.traffic, &mut self.physics_rng);
        self.traffic[idx] = Some(outcome);

        let speed = outcome.speed;
        if !speed.is_finite() || speed < 0.0 {
            return Err(invariant(horse, tick, format!("speed {speed}")));
        }
        if outcome.lane == 0 || outcome.lane > self.config.lane_count {
            return Err(invariant(horse, tick, format!("lane {}", outcome.lane)));
        }
        let burn = depletion(
            &DepletionInput {
                stats: &state.spec.stats,
                profile,
                distance_furlongs: self.config.distance_furlongs,
                current_speed: speed,
                base_speed: constants.speed.base_speed,
                progress,
            },
            &constants.stamina,
        );
        let stamina = (state.stamina_remaining - burn).max(0.0);
        if !(0.0..=state.stamina_remaining).contains(&stamina) {
            return Err(invariant(horse, tick, format!("stamina {stamina}")));
        }

        let remaining = finish_line - state.distance_covered;
        let state = &mut self.states[idx];
        state.lane = outcome.lane;
        state.current_speed = speed;
        state.held_up = outcome.effect == TrafficEffect::HeldUp;
        state.distance_covered += speed;
        state.stamina_remaining = stamina;

        if state.distance_covered >= finish_line {
            self.finished_count += 1;
            let time = (tick - 1) as f64 + remaining / speed;
            state.finish = Some(FinishRecord {
                tick,
                time,
                order: self.finished_count,
                completed: true,
            });
            trace!(horse = %state.spec.horse_id, tick, time, "finished");
        }
        field[idx] = field_position(state);
        Ok(())
    }

    /// Entrants are processed leader-first, but a trailer can cross earlier
    /// within the tick. Renumber this tick's finishers by crossing time so
    /// `order` always agrees with the final place.
    fn order_tick_finishers(&mut self) {
        let tick = self.tick;
        let states = &self.states;
        let mut crossed: Vec<usize> = (0..states.len())
            .filter(|&idx| states[idx].finish.is_some_and(|f| f.tick == tick))
            .collect();
        if crossed.len() < 2 {
            return;
        }
        crossed.sort_by(|&a, &b| final_order(&states[a], &states[b]));
        #[allow(clippy::cast_possible_truncation)]
        let first = self.finished_count + 1 - crossed.len() as u32;
        for (idx, order) in crossed.into_iter().zip(first..) {
            if let Some(finish) = self.states[idx].finish.as_mut() {
                finish.order = order;
            }
        }
    }

    /// Everyone still running is placed behind the finishers, furthest first.
    fn finalize_at_cap(&mut self) {
        let cap = self.clock.tick_cap;
        let runners: Vec<usize> = standings(&self.states)
            .into_iter()
            .filter(|&idx| !self.states[idx].is_finished())
            .collect();
        if runners.is_empty() {
            return;
        }
        warn!(
            race = %self.config.race_id,
            unfinished = runners.len(),
            tick_cap = cap,
            "tick cap reached, finalizing unfinished entrants"
        );
        self.stats.capped = true;
        for idx in runners {
            self.finished_count += 1;
            self.states[idx].finish = Some(FinishRecord {
                tick: cap,
                time: cap as f64,
                order: self.finished_count,
                completed: false,
            });
        }
    }

    fn narrate(&mut self) {
        let tick = self.tick;
        let snapshot = TickSnapshot::capture(tick, &self.states);
        let events = self.detector.detect(&snapshot, &self.content.constants.events);
        self.record_stats(&events);

        let ctx = CommentaryContext {
            names: &self.names,
            progress: self.clock.progress(tick),
        };
        let text = commentary::generate(
            &events,
            &ctx,
            &self.content.constants.commentary,
            &mut self.commentary_rng,
        );
        let congested = self
            .traffic
            .iter()
            .flatten()
            .filter(|outcome| outcome.congested())
            .count();
        trace!(tick, events = events.events.len(), congested, leader = ?snapshot.leader, "tick");
        if !text.trim().is_empty() {
            self.commentary.push(CommentaryLine { tick, text });
        }
        self.detector.update_previous_state(snapshot, &events);
    }

    fn record_stats(&mut self, events: &TickEvents) {
        self.stats.lead_changes += events.count(EventKind::LeadChange);
        self.stats.overtakes += events.count(EventKind::Overtake);
        self.stats.lane_changes += events.count(EventKind::LaneChange);
        self.stats.traffic_incidents += events.count(EventKind::Traffic);
    }

    pub(crate) fn into_result(self, purse: &impl PurseTable) -> RaceResult {
        let mut ranked = self.states;
        ranked.sort_by(final_order);

        let total_purse = self.config.total_purse(ranked.len());
        let payouts = purse.payouts(self.config.race_class, total_purse);

        let results: Vec<EntrantResult> = ranked
            .into_iter()
            .zip(1u32..)
            .map(|(state, place)| {
                let finish = state.finish.unwrap_or(FinishRecord {
                    tick: self.tick,
                    time: self.tick as f64,
                    order: place,
                    completed: false,
                });
                EntrantResult {
                    horse_id: state.spec.horse_id,
                    name: state.spec.name,
                    leg_type: state.spec.leg_type,
                    post_position: state.post_position,
                    place,
                    finish_tick: finish.tick,
                    finish_time: finish.time,
                    distance_covered: state.distance_covered,
                    completed: finish.completed,
                    payout: payouts.get(&place).copied().unwrap_or(0.0),
                }
            })
            .collect();

        let stats = RaceStats {
            ticks_run: self.tick,
            expected_ticks: self.clock.expected_ticks,
            tick_cap: self.clock.tick_cap,
            total_purse,
            ..self.stats
        };
        debug!(
            race = %self.config.race_id,
            winner = results.first().map_or("", |r| r.horse_id.0.as_str()),
            ticks = stats.ticks_run,
            capped = stats.capped,
            "race complete"
        );

        RaceResult {
            config: self.config.clone(),
            results,
            commentary: self.commentary,
            stats,
        }
    }
}
