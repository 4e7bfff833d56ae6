//! `race_core` — deterministic horse-race simulation.
//!
//! No IO, no network. All randomness comes from a `ChaCha8Rng` seeded from the
//! race configuration and scoped to a single run.

mod cancel;
pub mod commentary;
mod constants;
mod engine;
mod error;
pub mod events;
pub mod leg_type;
pub mod metrics;
pub mod overtaking;
mod purse;
pub mod speed;
pub mod stamina;
mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod test_fixtures;

pub use cancel::CancelToken;
pub use constants::{
    CommentaryConstants, Constants, EventConstants, SpeedConstants, StaminaConstants,
    TrafficConstants,
};
pub use engine::{processing_order, simulate, simulate_with_cancel};
pub use error::{ConfigError, RaceError};
pub use leg_type::{LegType, LegTypeProfile, LegTypeTable};
pub use metrics::{compute_metrics, RaceMetrics};
pub use purse::{PurseTable, StandardPurseTable};
pub use types::*;

#[cfg(test)]
mod tests;
