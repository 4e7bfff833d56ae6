use race_core::RaceMetrics;
use serde::Serialize;
use std::collections::BTreeMap;

type Extractor = (&'static str, fn(&RaceMetrics) -> f64);

const EXTRACTORS: &[Extractor] = &[
    ("winning_time", |m| m.winning_time),
    ("winning_margin", |m| m.winning_margin),
    ("last_time", |m| m.last_time),
    ("completed_count", |m| f64::from(m.completed_count)),
    ("lead_changes", |m| f64::from(m.lead_changes)),
    ("overtakes", |m| f64::from(m.overtakes)),
    ("lane_changes", |m| f64::from(m.lane_changes)),
    ("traffic_incidents", |m| f64::from(m.traffic_incidents)),
    ("ticks_run", |m| m.ticks_run as f64),
    ("ticks_over_expected", |m| {
        m.ticks_run as f64 - m.expected_ticks as f64
    }),
];

#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub seed_count: usize,
    pub capped_count: usize,
    /// Wins per horse id across seeds.
    pub win_counts: BTreeMap<String, usize>,
    pub metrics: Vec<MetricSummary>,
}

#[derive(Debug, Serialize)]
pub struct MetricSummary {
    pub name: String,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub stddev: f64,
}

/// Expects at least one race.
pub fn compute_summary(races: &[&RaceMetrics]) -> SummaryStats {
    let capped_count = races.iter().filter(|m| m.capped).count();

    let mut win_counts = BTreeMap::new();
    for metrics in races.iter().filter(|m| !m.winner.is_empty()) {
        *win_counts.entry(metrics.winner.clone()).or_insert(0) += 1;
    }

    let metrics = EXTRACTORS
        .iter()
        .map(|(name, extract)| {
            let values: Vec<f64> = races.iter().map(|m| extract(m)).collect();
            compute_metric_summary(name, &values)
        })
        .collect();

    SummaryStats {
        seed_count: races.len(),
        capped_count,
        win_counts,
        metrics,
    }
}

fn compute_metric_summary(name: &str, values: &[f64]) -> MetricSummary {
    let count = values.len() as f64;
    let mean = values.iter().sum::<f64>() / count;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;

    MetricSummary {
        name: name.to_string(),
        mean,
        min,
        max,
        stddev: variance.sqrt(),
    }
}

/// `{ "metric": { "mean": ..., "min": ..., "max": ..., "stddev": ... }, ... }`
pub fn build_aggregated_metrics(stats: &SummaryStats) -> serde_json::Value {
    let map = stats
        .metrics
        .iter()
        .map(|summary| {
            (
                summary.name.clone(),
                serde_json::json!({
                    "mean": summary.mean,
                    "min": summary.min,
                    "max": summary.max,
                    "stddev": summary.stddev,
                }),
            )
        })
        .collect();
    serde_json::Value::Object(map)
}

pub fn print_summary(scenario_name: &str, stats: &SummaryStats) {
    println!(
        "\n=== {} ({} seeds) ===\n",
        scenario_name, stats.seed_count
    );
    println!(
        "{:<30} {:>8} {:>8} {:>8} {:>8}",
        "Metric", "Mean", "Min", "Max", "StdDev"
    );
    println!("{}", "-".repeat(70));
    for metric in &stats.metrics {
        println!(
            "{:<30} {:>8.2} {:>8.2} {:>8.2} {:>8.2}",
            metric.name, metric.mean, metric.min, metric.max, metric.stddev
        );
    }
    println!("{:<30} {}/{}", "capped_rate", stats.capped_count, stats.seed_count);

    let mut winners: Vec<(&String, &usize)> = stats.win_counts.iter().collect();
    winners.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    println!("\nWins:");
    for (horse, wins) in winners {
        println!("  {horse:<28} {wins}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(seed: u64, winner: &str, winning_time: f64, capped: bool) -> RaceMetrics {
        RaceMetrics {
            seed,
            metrics_version: 1,
            field_size: 6,
            winner: winner.to_string(),
            winning_time,
            winning_margin: 1.0,
            last_time: winning_time + 8.0,
            completed_count: 6,
            lead_changes: 2,
            overtakes: 10,
            lane_changes: 4,
            traffic_incidents: 1,
            ticks_run: 110,
            expected_ticks: 101,
            capped,
            total_purse: 50_000.0,
        }
    }

    #[test]
    fn test_summary_basic_stats() {
        let a = metrics(1, "alpha", 90.0, false);
        let b = metrics(2, "bravo", 94.0, false);
        let stats = compute_summary(&[&a, &b]);

        assert_eq!(stats.seed_count, 2);
        assert_eq!(stats.capped_count, 0);

        let time = &stats.metrics[0];
        assert_eq!(time.name, "winning_time");
        assert!((time.mean - 92.0).abs() < 1e-9);
        assert!((time.min - 90.0).abs() < 1e-9);
        assert!((time.max - 94.0).abs() < 1e-9);
        assert!((time.stddev - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_win_counts_and_capped() {
        let a = metrics(1, "alpha", 90.0, false);
        let b = metrics(2, "alpha", 91.0, true);
        let c = metrics(3, "bravo", 92.0, false);
        let stats = compute_summary(&[&a, &b, &c]);

        assert_eq!(stats.capped_count, 1);
        assert_eq!(stats.win_counts["alpha"], 2);
        assert_eq!(stats.win_counts["bravo"], 1);
    }

    #[test]
    fn test_stddev_zero_for_identical() {
        let a = metrics(1, "alpha", 90.0, false);
        let b = metrics(2, "alpha", 90.0, false);
        let stats = compute_summary(&[&a, &b]);
        for metric in &stats.metrics {
            assert!(
                metric.stddev.abs() < 1e-10,
                "stddev for {} should be 0, got {}",
                metric.name,
                metric.stddev
            );
        }
    }

    #[test]
    fn test_aggregated_metrics_has_every_extractor() {
        let a = metrics(1, "alpha", 90.0, false);
        let stats = compute_summary(&[&a]);
        let agg = build_aggregated_metrics(&stats);
        let obj = agg.as_object().unwrap();

        assert_eq!(obj.len(), EXTRACTORS.len());
        for (name, _) in EXTRACTORS {
            let entry = &obj[*name];
            for field in ["mean", "min", "max", "stddev"] {
                assert!(entry[field].is_number(), "{name}.{field} missing");
            }
        }
        assert!((obj["ticks_over_expected"]["mean"].as_f64().unwrap() - 9.0).abs() < 1e-9);
    }
}
