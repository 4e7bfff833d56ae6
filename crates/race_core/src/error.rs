use thiserror::Error;

use crate::HorseId;

/// Rejections raised before any tick runs.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("race has no entrants")]
    EmptyField,
    #[error("race distance must be positive (got {0:.2} furlongs)")]
    NonPositiveDistance(f64),
    #[error("lane count {lanes} is smaller than field size {field}")]
    NotEnoughLanes { lanes: u32, field: usize },
    #[error("horse {horse} has non-positive {stat} ({value:.2})")]
    NonPositiveStat {
        horse: HorseId,
        stat: &'static str,
        value: f64,
    },
    #[error("horse {0} is entered more than once")]
    DuplicateEntrant(HorseId),
    #[error("{field} must be at least {min:.3} (got {value:.3})")]
    MinViolation { field: String, min: f64, value: f64 },
    #[error("{field} must be between {min:.3} and {max:.3} (got {value:.3})")]
    RangeViolation {
        field: String,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("{field}: {reason}")]
    InvalidTuning { field: String, reason: String },
}

#[derive(Debug, Error, PartialEq)]
pub enum RaceError {
    #[error("invalid race configuration: {0}")]
    InvalidRaceConfiguration(#[from] ConfigError),
    /// A defect in the simulation, never a race outcome.
    #[error("invariant violated for {horse} at tick {tick}: {detail}")]
    InvariantViolation {
        horse: HorseId,
        tick: u64,
        detail: String,
    },
    #[error("simulation cancelled before tick {tick}")]
    Cancelled { tick: u64 },
}

pub(crate) fn check_min(field: &str, value: f64, min: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= min {
        Ok(())
    } else {
        Err(ConfigError::MinViolation {
            field: field.to_string(),
            min,
            value,
        })
    }
}

pub(crate) fn check_range(field: &str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::RangeViolation {
            field: field.to_string(),
            min,
            max,
            value,
        })
    }
}
