//! Checks the shipped `content/` and `content/rosters/` files.

use race_content::{load_content, load_roster, RaceParams};
use race_core::{simulate, LegType, RaceContent, StandardPurseTable, TrackCondition};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Integration tests run from the crate directory, so go up two levels.
fn workspace_root() -> PathBuf {
    let manifest = std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set");
    PathBuf::from(manifest).join("../..")
}

fn load_test_content() -> &'static RaceContent {
    static CONTENT: OnceLock<RaceContent> = OnceLock::new();
    CONTENT.get_or_init(|| {
        let dir = workspace_root().join("content");
        load_content(dir.to_str().unwrap()).expect("shipped content should load")
    })
}

#[test]
fn content_loads_successfully() {
    let content = load_test_content();
    assert!(!content.content_version.is_empty());
}

#[test]
fn every_condition_has_a_multiplier() {
    let content = load_test_content();
    for condition in TrackCondition::ALL {
        assert!(content
            .constants
            .speed
            .condition_multipliers
            .contains_key(&condition));
    }
}

#[test]
fn only_the_rail_runner_prefers_the_inside() {
    let content = load_test_content();
    for leg_type in LegType::ALL {
        let profile = content.leg_types.profile(leg_type);
        let inside = profile.lane_preference == race_core::leg_type::LanePreference::Inside;
        assert_eq!(inside, leg_type == LegType::RailRunner, "{leg_type:?}");
    }
}

#[test]
fn sample_roster_runs_end_to_end() {
    let content = load_test_content();
    let roster = load_roster(&workspace_root().join("content/rosters/sample.json"))
        .expect("sample roster should load");
    let config = RaceParams::default().configuration(7, roster.len());
    let result = simulate(&config, &roster, content, &StandardPurseTable).unwrap();
    assert_eq!(result.results.len(), roster.len());
    assert!(!result.stats.capped, "sample field should finish inside the cap");
}
