//! Tick-over-tick event detection.
//!
//! Each tick the engine captures an immutable [`TickSnapshot`], diffs it
//! against the previous one, narrates the result, and only then calls
//! [`DetectorState::update_previous_state`] to replace the snapshot and record
//! which events fired. Nothing older than one tick is kept except the recency
//! counters used for debouncing.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use ahash::AHashMap;

use crate::{EntrantState, EventConstants, FinishRecord, HorseId};

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotEntry {
    pub lane: u32,
    pub distance: f64,
    /// 1-based position in the running order.
    pub rank: u32,
    pub held_up: bool,
    pub finish: Option<FinishRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickSnapshot {
    pub tick: u64,
    pub entries: BTreeMap<HorseId, SnapshotEntry>,
    pub leader: Option<HorseId>,
}

impl TickSnapshot {
    pub fn capture(tick: u64, states: &[EntrantState]) -> Self {
        let order = standings(states);
        let leader = order.first().map(|&i| states[i].spec.horse_id.clone());
        let entries = order
            .iter()
            .zip(1u32..)
            .map(|(&i, rank)| {
                let state = &states[i];
                let entry = SnapshotEntry {
                    lane: state.lane,
                    distance: state.distance_covered,
                    rank,
                    held_up: state.held_up,
                    finish: state.finish,
                };
                (state.spec.horse_id.clone(), entry)
            })
            .collect();
        Self {
            tick,
            entries,
            leader,
        }
    }

    /// Horse ids in running order.
    pub fn running_order(&self) -> Vec<&HorseId> {
        let mut ids: Vec<(&HorseId, u32)> =
            self.entries.iter().map(|(id, e)| (id, e.rank)).collect();
        ids.sort_by_key(|&(_, rank)| rank);
        ids.into_iter().map(|(id, _)| id).collect()
    }
}

/// Indices of `states` in running order: finishers by crossing order, then
/// everyone else by distance, ties by post position.
pub fn standings(states: &[EntrantState]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..states.len()).collect();
    order.sort_by(|&a, &b| standing_cmp(&states[a], &states[b]));
    order
}

fn standing_cmp(a: &EntrantState, b: &EntrantState) -> Ordering {
    match (a.finish, b.finish) {
        (Some(fa), Some(fb)) => fa.order.cmp(&fb.order),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b
            .distance_covered
            .total_cmp(&a.distance_covered)
            .then(a.post_position.cmp(&b.post_position)),
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Declaration order is commentary precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    Finish,
    LeadChange,
    Overtake,
    Traffic,
    LaneChange,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RaceEvent {
    Finish {
        horse: HorseId,
        order: u32,
        completed: bool,
    },
    LeadChange {
        horse: HorseId,
        previous: HorseId,
    },
    Overtake {
        horse: HorseId,
        passed: HorseId,
    },
    Traffic {
        horse: HorseId,
    },
    LaneChange {
        horse: HorseId,
        from: u32,
        to: u32,
    },
}

impl RaceEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            RaceEvent::Finish { .. } => EventKind::Finish,
            RaceEvent::LeadChange { .. } => EventKind::LeadChange,
            RaceEvent::Overtake { .. } => EventKind::Overtake,
            RaceEvent::Traffic { .. } => EventKind::Traffic,
            RaceEvent::LaneChange { .. } => EventKind::LaneChange,
        }
    }

    /// The entrant the event is about; debounce is keyed on it.
    pub fn horse(&self) -> &HorseId {
        match self {
            RaceEvent::Finish { horse, .. }
            | RaceEvent::LeadChange { horse, .. }
            | RaceEvent::Overtake { horse, .. }
            | RaceEvent::Traffic { horse }
            | RaceEvent::LaneChange { horse, .. } => horse,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickEvents {
    pub tick: u64,
    pub events: Vec<RaceEvent>,
}

impl TickEvents {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn count(&self, kind: EventKind) -> u32 {
        self.events.iter().filter(|e| e.kind() == kind).count() as u32
    }
}

// ---------------------------------------------------------------------------
// Debounce
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct RecencyCounters {
    last_fired: AHashMap<(EventKind, HorseId), u64>,
}

impl RecencyCounters {
    pub fn last_fired(&self, kind: EventKind, horse: &HorseId) -> Option<u64> {
        self.last_fired.get(&(kind, horse.clone())).copied()
    }

    fn is_recent(&self, event: &RaceEvent, tick: u64, constants: &EventConstants) -> bool {
        let window = match event.kind() {
            EventKind::Finish => return false,
            EventKind::LeadChange => constants.lead_change_window,
            EventKind::Overtake => constants.overtake_window,
            EventKind::Traffic => constants.traffic_window,
            EventKind::LaneChange => constants.lane_change_window,
        };
        self.last_fired(event.kind(), event.horse())
            .is_some_and(|last| tick.saturating_sub(last) < window)
    }

    pub fn record(&mut self, events: &TickEvents) {
        for event in &events.events {
            self.last_fired
                .insert((event.kind(), event.horse().clone()), events.tick);
        }
    }
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

pub fn detect(
    current: &TickSnapshot,
    previous: Option<&TickSnapshot>,
    recency: &RecencyCounters,
    constants: &EventConstants,
) -> TickEvents {
    let mut events = finishes(current);
    if let Some(previous) = previous {
        events.extend(lead_change(current, previous));
        events.extend(overtakes(current, previous));
        events.extend(traffic(current, previous));
        events.extend(lane_changes(current, previous));
    }
    events.retain(|event| !recency.is_recent(event, current.tick, constants));
    TickEvents {
        tick: current.tick,
        events,
    }
}

fn finishes(current: &TickSnapshot) -> Vec<RaceEvent> {
    let mut crossed: Vec<(u32, &HorseId, bool)> = current
        .entries
        .iter()
        .filter_map(|(id, entry)| {
            entry
                .finish
                .filter(|f| f.tick == current.tick)
                .map(|f| (f.order, id, f.completed))
        })
        .collect();
    crossed.sort_by_key(|&(order, _, _)| order);
    crossed
        .into_iter()
        .map(|(order, horse, completed)| RaceEvent::Finish {
            horse: horse.clone(),
            order,
            completed,
        })
        .collect()
}

fn lead_change(current: &TickSnapshot, previous: &TickSnapshot) -> Option<RaceEvent> {
    match (&current.leader, &previous.leader) {
        (Some(now), Some(before)) if now != before => Some(RaceEvent::LeadChange {
            horse: now.clone(),
            previous: before.clone(),
        }),
        _ => None,
    }
}

/// An entrant that was behind its new immediate follower last tick passed it.
fn overtakes(current: &TickSnapshot, previous: &TickSnapshot) -> Vec<RaceEvent> {
    let order = current.running_order();
    let mut events = Vec::new();
    for pair in order.windows(2) {
        let (ahead, behind) = (pair[0], pair[1]);
        let (Some(was_ahead), Some(was_behind)) =
            (previous.entries.get(ahead), previous.entries.get(behind))
        else {
            continue;
        };
        if was_ahead.finish.is_some() || was_ahead.rank < was_behind.rank {
            continue;
        }
        let is_lead_change = current.leader.as_ref() == Some(ahead)
            && previous.leader.as_ref() == Some(behind);
        if !is_lead_change {
            events.push(RaceEvent::Overtake {
                horse: ahead.clone(),
                passed: behind.clone(),
            });
        }
    }
    events
}

fn traffic(current: &TickSnapshot, previous: &TickSnapshot) -> Vec<RaceEvent> {
    current
        .entries
        .iter()
        .filter(|(id, entry)| {
            entry.held_up && previous.entries.get(*id).is_some_and(|before| !before.held_up)
        })
        .map(|(id, _)| RaceEvent::Traffic { horse: id.clone() })
        .collect()
}

fn lane_changes(current: &TickSnapshot, previous: &TickSnapshot) -> Vec<RaceEvent> {
    current
        .entries
        .iter()
        .filter_map(|(id, entry)| {
            let before = previous.entries.get(id)?;
            (before.lane != entry.lane).then(|| RaceEvent::LaneChange {
                horse: id.clone(),
                from: before.lane,
                to: entry.lane,
            })
        })
        .collect()
}

/// Snapshot and recency carried from one tick to the next.
#[derive(Debug, Clone, Default)]
pub struct DetectorState {
    previous: Option<TickSnapshot>,
    recency: RecencyCounters,
}

impl DetectorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn previous(&self) -> Option<&TickSnapshot> {
        self.previous.as_ref()
    }

    pub fn detect(&self, current: &TickSnapshot, constants: &EventConstants) -> TickEvents {
        detect(current, self.previous.as_ref(), &self.recency, constants)
    }

    /// Call after commentary for the tick has been generated.
    pub fn update_previous_state(&mut self, current: TickSnapshot, events: &TickEvents) {
        self.recency.record(events);
        self.previous = Some(current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{base_content, entrant};
    use crate::LegType;

    fn field(distances: &[(u32, f64)]) -> Vec<EntrantState> {
        distances
            .iter()
            .zip(1u32..)
            .map(|(&(lane, distance), post)| {
                let spec = entrant(&format!("h{post}"), LegType::Stalker, [50.0; 4]);
                let mut state = EntrantState::new(spec, post, 100.0);
                state.lane = lane;
                state.distance_covered = distance;
                state
            })
            .collect()
    }

    fn id(s: &str) -> HorseId {
        HorseId(s.to_string())
    }

    fn constants() -> EventConstants {
        base_content().constants.events
    }

    #[test]
    fn snapshot_ranks_by_distance_then_post() {
        let states = field(&[(1, 10.0), (2, 30.0), (3, 30.0)]);
        let snap = TickSnapshot::capture(1, &states);
        assert_eq!(snap.leader, Some(id("h2")));
        assert_eq!(snap.entries[&id("h3")].rank, 2);
        assert_eq!(snap.entries[&id("h1")].rank, 3);
    }

    #[test]
    fn finishers_rank_ahead_of_runners() {
        let mut states = field(&[(1, 200.0), (2, 190.0)]);
        states[1].finish = Some(FinishRecord {
            tick: 5,
            time: 4.5,
            order: 1,
            completed: true,
        });
        let snap = TickSnapshot::capture(5, &states);
        assert_eq!(snap.leader, Some(id("h2")));
    }

    #[test]
    fn first_tick_has_no_diff_events() {
        let states = field(&[(1, 10.0), (2, 30.0)]);
        let snap = TickSnapshot::capture(1, &states);
        let events = detect(&snap, None, &RecencyCounters::default(), &constants());
        assert!(events.is_empty());
    }

    #[test]
    fn lead_change_is_detected_without_duplicate_overtake() {
        let before = TickSnapshot::capture(1, &field(&[(1, 20.0), (2, 10.0)]));
        let after = TickSnapshot::capture(2, &field(&[(1, 30.0), (2, 35.0)]));
        let events = detect(&after, Some(&before), &RecencyCounters::default(), &constants());
        assert_eq!(
            events.events,
            vec![RaceEvent::LeadChange {
                horse: id("h2"),
                previous: id("h1"),
            }]
        );
    }

    #[test]
    fn overtake_in_midfield() {
        let before = TickSnapshot::capture(1, &field(&[(1, 50.0), (2, 20.0), (3, 10.0)]));
        let after = TickSnapshot::capture(2, &field(&[(1, 60.0), (2, 30.0), (3, 35.0)]));
        let events = detect(&after, Some(&before), &RecencyCounters::default(), &constants());
        assert_eq!(
            events.events,
            vec![RaceEvent::Overtake {
                horse: id("h3"),
                passed: id("h2"),
            }]
        );
    }

    #[test]
    fn lane_change_and_traffic_are_detected() {
        let before = TickSnapshot::capture(1, &field(&[(1, 50.0), (2, 20.0)]));
        let mut states = field(&[(1, 60.0), (3, 30.0)]);
        states[0].held_up = true;
        let after = TickSnapshot::capture(2, &states);
        let events = detect(&after, Some(&before), &RecencyCounters::default(), &constants());
        assert_eq!(events.count(EventKind::Traffic), 1);
        assert!(events.events.contains(&RaceEvent::LaneChange {
            horse: id("h2"),
            from: 2,
            to: 3,
        }));
    }

    #[test]
    fn repeated_event_is_suppressed_inside_window() {
        let mut detector = DetectorState::new();
        let constants = constants();

        let t1 = TickSnapshot::capture(1, &field(&[(1, 10.0), (2, 10.0)]));
        let events = detector.detect(&t1, &constants);
        detector.update_previous_state(t1, &events);

        let t2 = TickSnapshot::capture(2, &field(&[(2, 20.0), (2, 20.0)]));
        let events = detector.detect(&t2, &constants);
        assert_eq!(events.count(EventKind::LaneChange), 1);
        detector.update_previous_state(t2, &events);

        // Back out again one tick later: inside the lane-change window.
        let t3 = TickSnapshot::capture(3, &field(&[(1, 30.0), (2, 30.0)]));
        let events = detector.detect(&t3, &constants);
        assert_eq!(events.count(EventKind::LaneChange), 0);
        detector.update_previous_state(t3, &events);

        let later = 2 + constants.lane_change_window;
        let t_later = TickSnapshot::capture(later, &field(&[(2, 40.0), (2, 40.0)]));
        let events = detector.detect(&t_later, &constants);
        assert_eq!(events.count(EventKind::LaneChange), 1);
    }

    #[test]
    fn finishes_are_never_debounced() {
        let mut states = field(&[(1, 200.0), (2, 100.0)]);
        states[0].finish = Some(FinishRecord {
            tick: 7,
            time: 6.3,
            order: 1,
            completed: true,
        });
        let snap = TickSnapshot::capture(7, &states);
        let mut recency = RecencyCounters::default();
        recency.record(&TickEvents {
            tick: 6,
            events: vec![RaceEvent::Finish {
                horse: id("h1"),
                order: 1,
                completed: true,
            }],
        });
        let events = detect(&snap, None, &recency, &constants());
        assert_eq!(events.count(EventKind::Finish), 1);
    }

    #[test]
    fn update_replaces_snapshot_wholesale() {
        let mut detector = DetectorState::new();
        let t1 = TickSnapshot::capture(1, &field(&[(1, 10.0)]));
        detector.update_previous_state(t1, &TickEvents::default());
        let t2 = TickSnapshot::capture(2, &field(&[(1, 20.0)]));
        detector.update_previous_state(t2.clone(), &TickEvents::default());
        assert_eq!(detector.previous(), Some(&t2));
    }
}
