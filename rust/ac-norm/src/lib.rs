//! ac-norm: Normalization statistics + the raw <-> model-space transform.

pub mod normalizer;
pub mod stats;

pub use normalizer::{NormalizeError, Normalizer, DEFAULT_EPSILON};
pub use stats::{
    MalformedStatisticsError, NormStats, StatisticsModel, StatsLoadError, StatsRecord, ACTIONS,
    STATE,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
