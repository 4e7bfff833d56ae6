use super::*;
use crate::engine::RaceRun;

fn check_every_tick(config: &RaceConfiguration, entrants: &[EntrantSpec]) {
    let content = base_content();
    let pool = content.constants.stamina.pool_max;
    let mut run = RaceRun::new(config, entrants, &content);
    let mut previous: Vec<(f64, f64)> = run
        .states
        .iter()
        .map(|s| (s.distance_covered, s.stamina_remaining))
        .collect();

    while !run.is_over() {
        run.step().unwrap();
        for (state, (distance, stamina)) in run.states.iter().zip(&previous) {
            assert!(state.stamina_remaining >= 0.0 && state.stamina_remaining <= pool);
            assert!(state.stamina_remaining <= *stamina);
            assert!(state.distance_covered >= *distance);
            assert!(state.current_speed >= 0.0);
            assert!(state.lane >= 1 && state.lane <= config.lane_count);
        }
        previous = run
            .states
            .iter()
            .map(|s| (s.distance_covered, s.stamina_remaining))
            .collect();
    }
    assert!(run.states.iter().all(EntrantState::is_finished));
}

#[test]
fn test_stamina_and_distance_bounds_hold_every_tick() {
    for seed in [1, 2, 3, 4, 5] {
        check_every_tick(&race_config(8.0, 6, seed), &full_field());
    }
}

#[test]
fn test_bounds_hold_in_a_tight_field() {
    // As many lanes as runners: the most contention the rules allow.
    let mut config = race_config(12.0, 6, 99);
    config.condition = TrackCondition::Muddy;
    check_every_tick(&config, &full_field());
}

#[test]
fn test_finished_entrants_are_frozen() {
    let content = base_content();
    let config = race_config(6.0, 2, 8);
    let entrants = [front_runner_a(), closer_b()];
    let mut run = RaceRun::new(&config, &entrants, &content);
    let mut frozen: Option<EntrantState> = None;
    while !run.is_over() {
        run.step().unwrap();
        if let Some(before) = &frozen {
            assert_eq!(&run.states[0], before);
        } else if run.states[0].is_finished() {
            frozen = Some(run.states[0].clone());
        }
    }
    assert!(frozen.is_some());
}
