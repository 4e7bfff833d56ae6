//! Per-race summary metrics computed from a `RaceResult`.
//!
//! `compute_metrics(&RaceResult) -> RaceMetrics` flattens a result into one row
//! for batch analysis. No IO.

use serde::{Deserialize, Serialize};

use crate::RaceResult;

/// Bump when fields are added/removed/reordered.
const METRICS_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceMetrics {
    pub seed: u64,
    pub metrics_version: u32,
    pub field_size: u32,

    // Outcome
    /// Empty when the field was empty.
    pub winner: String,
    pub winning_time: f64,
    /// Ticks between first and second; 0 for a one-horse race.
    pub winning_margin: f64,
    /// Time of the last classified entrant.
    pub last_time: f64,
    pub completed_count: u32,

    // Race shape
    pub lead_changes: u32,
    pub overtakes: u32,
    pub lane_changes: u32,
    pub traffic_incidents: u32,

    // Clock
    pub ticks_run: u64,
    pub expected_ticks: u64,
    pub capped: bool,

    pub total_purse: f64,
}

#[allow(clippy::cast_possible_truncation)]
pub fn compute_metrics(result: &RaceResult) -> RaceMetrics {
    let winner = result.results.first();
    let runner_up = result.results.get(1);
    let winning_time = winner.map_or(0.0, |w| w.finish_time);

    RaceMetrics {
        seed: result.config.seed,
        metrics_version: METRICS_VERSION,
        field_size: result.results.len() as u32,
        winner: winner.map(|w| w.horse_id.0.clone()).unwrap_or_default(),
        winning_time,
        winning_margin: runner_up.map_or(0.0, |r| r.finish_time - winning_time),
        last_time: result.results.last().map_or(0.0, |r| r.finish_time),
        completed_count: result.results.iter().filter(|r| r.completed).count() as u32,
        lead_changes: result.stats.lead_changes,
        overtakes: result.stats.overtakes,
        lane_changes: result.stats.lane_changes,
        traffic_incidents: result.stats.traffic_incidents,
        ticks_run: result.stats.ticks_run,
        expected_ticks: result.stats.expected_ticks,
        capped: result.stats.capped,
        total_purse: result.stats.total_purse,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::race_config;
    use crate::{EntrantResult, HorseId, LegType, RaceStats};

    fn placed(id: &str, place: u32, time: f64, completed: bool) -> EntrantResult {
        EntrantResult {
            horse_id: HorseId(id.to_string()),
            name: id.to_uppercase(),
            leg_type: LegType::Stalker,
            post_position: place,
            place,
            finish_tick: time.ceil() as u64,
            finish_time: time,
            distance_covered: 1609.0,
            completed,
            payout: 0.0,
        }
    }

    fn result(results: Vec<EntrantResult>) -> RaceResult {
        RaceResult {
            config: race_config(8.0, 4, 9),
            results,
            commentary: Vec::new(),
            stats: RaceStats {
                ticks_run: 120,
                expected_ticks: 101,
                tick_cap: 303,
                lead_changes: 2,
                overtakes: 5,
                total_purse: 51_000.0,
                ..RaceStats::default()
            },
        }
    }

    #[test]
    fn test_margin_and_winner() {
        let metrics = compute_metrics(&result(vec![
            placed("a", 1, 86.4, true),
            placed("b", 2, 88.1, true),
            placed("c", 3, 119.5, true),
        ]));
        assert_eq!(metrics.winner, "a");
        assert_eq!(metrics.seed, 9);
        assert_eq!(metrics.field_size, 3);
        assert!((metrics.winning_margin - 1.7).abs() < 1e-9);
        assert!((metrics.last_time - 119.5).abs() < 1e-9);
        assert_eq!(metrics.completed_count, 3);
        assert_eq!(metrics.lead_changes, 2);
        assert_eq!(metrics.overtakes, 5);
    }

    #[test]
    fn test_single_runner_has_zero_margin() {
        let metrics = compute_metrics(&result(vec![placed("a", 1, 90.0, true)]));
        assert!(metrics.winning_margin.abs() < f64::EPSILON);
    }

    #[test]
    fn test_counts_incomplete_entrants() {
        let metrics = compute_metrics(&result(vec![
            placed("a", 1, 95.0, true),
            placed("b", 2, 303.0, false),
        ]));
        assert_eq!(metrics.completed_count, 1);
    }
}
