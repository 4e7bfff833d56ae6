//! Running-style archetypes and their behavior table.
//!
//! Calculators never branch on [`LegType`] directly; they look up the
//! archetype's [`LegTypeProfile`] and read its data.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::{check_min, check_range};
use crate::{ConfigError, Surface};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegType {
    /// Early pace; goes to the lead and tries to hold it.
    FrontRunner,
    /// Sits just off the pace and presses late.
    Stalker,
    /// Saves ground early and makes one late run.
    Closer,
    /// Lane specialist; thrives in congestion along the inside.
    RailRunner,
}

impl LegType {
    pub const ALL: [LegType; 4] = [
        LegType::FrontRunner,
        LegType::Stalker,
        LegType::Closer,
        LegType::RailRunner,
    ];

    pub fn label(self) -> &'static str {
        match self {
            LegType::FrontRunner => "front runner",
            LegType::Stalker => "stalker",
            LegType::Closer => "closer",
            LegType::RailRunner => "rail runner",
        }
    }
}

/// A span of race progress during which a speed bonus applies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseWindow {
    pub start: f64,
    pub end: f64,
    pub bonus: f64,
}

impl PhaseWindow {
    /// Half-open `[start, end)`, except a window ending at 1.0 also holds at 1.0.
    pub fn contains(&self, progress: f64) -> bool {
        progress >= self.start && (progress < self.end || (self.end >= 1.0 && progress <= 1.0))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PhaseBehavior {
    /// Bonus keyed to race progress.
    Windows { windows: SmallVec<[PhaseWindow; 2]> },
    /// No progress bonus; the archetype's edge comes from congestion instead.
    TrafficDriven,
}

/// How an entrant responds when boxed in with no lane to move into.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrafficResponse {
    /// Checked: speed is multiplied by `penalty`.
    HeldUp { penalty: f64 },
    /// Slips through along the rail: gains `bonus_rate` of its current speed.
    InsideRun { bonus_rate: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LanePreference {
    Inside,
    Outside,
}

/// Training regimen the archetype responds to best. Consumed by the training
/// systems; carried here so the whole archetype record lives in one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingFocus {
    Sprint,
    Gate,
    Endurance,
    Agility,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegTypeProfile {
    pub phase: PhaseBehavior,
    /// Stamina burn multiplier for each third of the race.
    pub stamina_burn: [f64; 3],
    /// Chance to swing into an adjacent lane when blocked.
    pub lane_change_aggressiveness: f64,
    /// Chance per tick to tuck one lane toward the rail when it is clear.
    pub inside_drift_chance: f64,
    pub traffic: TrafficResponse,
    /// Which adjacent lane is tried first when escaping traffic.
    pub lane_preference: LanePreference,
    #[serde(default)]
    pub surface_affinity: Option<Surface>,
    pub preferred_training: TrainingFocus,
}

impl LegTypeProfile {
    pub fn phase_bonus(&self, progress: f64) -> f64 {
        match &self.phase {
            PhaseBehavior::Windows { windows } => windows
                .iter()
                .filter(|w| w.contains(progress))
                .map(|w| w.bonus)
                .fold(1.0, f64::max),
            PhaseBehavior::TrafficDriven => 1.0,
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn burn_multiplier(&self, progress: f64) -> f64 {
        let third = ((progress.clamp(0.0, 1.0) * 3.0) as usize).min(2);
        self.stamina_burn[third]
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        match &self.phase {
            PhaseBehavior::Windows { windows } => validate_windows(name, windows)?,
            PhaseBehavior::TrafficDriven => {
                if !matches!(self.traffic, TrafficResponse::InsideRun { .. }) {
                    return Err(ConfigError::InvalidTuning {
                        field: format!("leg_types.{name}.traffic"),
                        reason: "traffic-driven phase needs an inside_run response".to_string(),
                    });
                }
            }
        }
        for burn in self.stamina_burn {
            check_min(&format!("leg_types.{name}.stamina_burn"), burn, 0.0)?;
        }
        check_range(
            &format!("leg_types.{name}.lane_change_aggressiveness"),
            self.lane_change_aggressiveness,
            0.0,
            1.0,
        )?;
        check_range(
            &format!("leg_types.{name}.inside_drift_chance"),
            self.inside_drift_chance,
            0.0,
            1.0,
        )?;
        match self.traffic {
            TrafficResponse::HeldUp { penalty } => check_range(
                &format!("leg_types.{name}.traffic.penalty"),
                penalty,
                0.0,
                1.0,
            ),
            TrafficResponse::InsideRun { bonus_rate } => check_range(
                &format!("leg_types.{name}.traffic.bonus_rate"),
                bonus_rate,
                0.0,
                1.0,
            ),
        }
    }
}

fn validate_windows(name: &str, windows: &[PhaseWindow]) -> Result<(), ConfigError> {
    let field = format!("leg_types.{name}.phase");
    if windows.is_empty() || windows.len() > 2 {
        return Err(ConfigError::InvalidTuning {
            field,
            reason: format!("expected 1 or 2 boost windows, got {}", windows.len()),
        });
    }
    for window in windows {
        check_range(&field, window.start, 0.0, 1.0)?;
        check_range(&field, window.end, window.start, 1.0)?;
        check_min(&field, window.bonus, 1.0)?;
    }
    Ok(())
}

/// One profile per archetype. A struct rather than a map so no archetype can
/// be missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegTypeTable {
    pub front_runner: LegTypeProfile,
    pub stalker: LegTypeProfile,
    pub closer: LegTypeProfile,
    pub rail_runner: LegTypeProfile,
}

impl LegTypeTable {
    pub fn profile(&self, leg_type: LegType) -> &LegTypeProfile {
        match leg_type {
            LegType::FrontRunner => &self.front_runner,
            LegType::Stalker => &self.stalker,
            LegType::Closer => &self.closer,
            LegType::RailRunner => &self.rail_runner,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.front_runner.validate("front_runner")?;
        self.stalker.validate("stalker")?;
        self.closer.validate("closer")?;
        self.rail_runner.validate("rail_runner")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::base_content;
    use smallvec::smallvec;

    #[test]
    fn fixture_table_is_valid() {
        assert!(base_content().leg_types.validate().is_ok());
    }

    #[test]
    fn window_bonus_applies_only_inside_window() {
        let table = base_content().leg_types;
        let closer = table.profile(LegType::Closer);
        assert!((closer.phase_bonus(0.1) - 1.0).abs() < 1e-12);
        assert!(closer.phase_bonus(0.9) > 1.0);
        assert!(closer.phase_bonus(1.0) > 1.0, "window ending at 1.0 includes the wire");
    }

    #[test]
    fn overlapping_windows_take_the_larger_bonus() {
        let profile = LegTypeProfile {
            phase: PhaseBehavior::Windows {
                windows: smallvec![
                    PhaseWindow { start: 0.0, end: 0.6, bonus: 1.02 },
                    PhaseWindow { start: 0.5, end: 1.0, bonus: 1.05 },
                ],
            },
            ..base_content().leg_types.stalker
        };
        assert!((profile.phase_bonus(0.55) - 1.05).abs() < 1e-12);
        assert!((profile.phase_bonus(0.2) - 1.02).abs() < 1e-12);
    }

    #[test]
    fn traffic_driven_profile_has_no_phase_bonus() {
        let table = base_content().leg_types;
        let rail = table.profile(LegType::RailRunner);
        for progress in [0.0, 0.25, 0.5, 0.75, 1.0] {
            assert!((rail.phase_bonus(progress) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn burn_multiplier_follows_race_thirds() {
        let table = base_content().leg_types;
        let front = table.profile(LegType::FrontRunner);
        assert!((front.burn_multiplier(0.0) - front.stamina_burn[0]).abs() < 1e-12);
        assert!((front.burn_multiplier(0.5) - front.stamina_burn[1]).abs() < 1e-12);
        assert!((front.burn_multiplier(1.0) - front.stamina_burn[2]).abs() < 1e-12);
        assert!(front.burn_multiplier(0.1) > front.burn_multiplier(0.9));
    }

    #[test]
    fn three_windows_are_rejected() {
        let mut table = base_content().leg_types;
        table.stalker.phase = PhaseBehavior::Windows {
            windows: smallvec![
                PhaseWindow { start: 0.0, end: 0.2, bonus: 1.01 },
                PhaseWindow { start: 0.3, end: 0.5, bonus: 1.01 },
                PhaseWindow { start: 0.6, end: 0.8, bonus: 1.01 },
            ],
        };
        assert!(table.validate().is_err());
    }

    #[test]
    fn traffic_driven_phase_requires_inside_run() {
        let mut table = base_content().leg_types;
        table.rail_runner.traffic = TrafficResponse::HeldUp { penalty: 0.9 };
        let err = table.validate().unwrap_err();
        assert!(err.to_string().contains("rail_runner"));
    }

    #[test]
    fn archetype_records_carry_training_focus() {
        let table = base_content().leg_types;
        assert_eq!(
            table.profile(LegType::Closer).preferred_training,
            TrainingFocus::Endurance
        );
    }
}
