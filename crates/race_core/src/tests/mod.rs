use super::*;
use crate::test_fixtures::{base_content, closer_b, entrant, front_runner_a, race_config};

mod invariants;

// --- Shared test helpers ------------------------------------------------

fn run(config: &RaceConfiguration, entrants: &[EntrantSpec]) -> RaceResult {
    simulate(config, entrants, &base_content(), &StandardPurseTable).unwrap()
}

/// Six runners, one of each archetype plus two extra stalkers.
fn full_field() -> Vec<EntrantSpec> {
    vec![
        front_runner_a(),
        closer_b(),
        entrant("c", LegType::Stalker, [70.0, 65.0, 60.0, 55.0]),
        entrant("d", LegType::RailRunner, [65.0, 70.0, 75.0, 60.0]),
        entrant("e", LegType::Stalker, [60.0, 60.0, 60.0, 60.0]),
        entrant("f", LegType::FrontRunner, [75.0, 55.0, 65.0, 50.0]),
    ]
}
