//! Per-signal normalization statistics.
//!
//! ### Source layout
//! A statistics source is a JSON object keyed by signal name ("actions", "state", ...),
//! optionally wrapped in a top-level `norm_stats` object (the layout policy checkpoints
//! ship under `assets/`). Each signal has four equal-length arrays:
//!
//! - **mean**: per-dimension mean
//! - **std**: per-dimension standard deviation (>= 0)
//! - **q01** / **q99**: 1st and 99th percentile (q01 <= q99)

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Key wrapping the per-signal map in checkpoint assets.
pub const NORM_STATS_KEY: &str = "norm_stats";

/// Signal name of the action statistics.
pub const ACTIONS: &str = "actions";

/// Signal name of the proprioceptive state statistics.
pub const STATE: &str = "state";

/// Structural problems with a statistics record. Never recovered from silently.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedStatisticsError {
    #[error("missing field '{0}'")]
    MissingField(&'static str),
    #[error("invalid length for {field}: got {actual}, expected {expected}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("statistics have zero dimensions")]
    Empty,
    #[error("negative std at dimension {index}: {value}")]
    NegativeStd { index: usize, value: f64 },
    #[error("non-finite {field} at dimension {index}: {value}")]
    NonFinite {
        field: &'static str,
        index: usize,
        value: f64,
    },
    #[error("q01 > q99 at dimension {index}: {q01} > {q99}")]
    InvertedQuantiles { index: usize, q01: f64, q99: f64 },
}

/// A persisted statistics record as it appears on disk. Fields may be absent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct StatsRecord {
    #[serde(default)]
    pub mean: Option<Vec<f64>>,
    #[serde(default)]
    pub std: Option<Vec<f64>>,
    #[serde(default)]
    pub q01: Option<Vec<f64>>,
    #[serde(default)]
    pub q99: Option<Vec<f64>>,
}

/// Validated, immutable statistics for one named signal.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsModel {
    name: String,
    mean: Vec<f64>,
    std: Vec<f64>,
    q01: Vec<f64>,
    q99: Vec<f64>,
}

impl StatisticsModel {
    /// Validate and build. A std entry below `-std_tolerance` is rejected, not clamped.
    pub fn new(
        name: impl Into<String>,
        mean: Vec<f64>,
        std: Vec<f64>,
        q01: Vec<f64>,
        q99: Vec<f64>,
        std_tolerance: f64,
    ) -> Result<Self, MalformedStatisticsError> {
        let d = mean.len();
        if d == 0 {
            return Err(MalformedStatisticsError::Empty);
        }
        for (field, v) in [("std", &std), ("q01", &q01), ("q99", &q99)] {
            if v.len() != d {
                return Err(MalformedStatisticsError::LengthMismatch {
                    field,
                    expected: d,
                    actual: v.len(),
                });
            }
        }
        for (field, v) in [("mean", &mean), ("std", &std), ("q01", &q01), ("q99", &q99)] {
            if let Some((index, &value)) = v.iter().enumerate().find(|(_, x)| !x.is_finite()) {
                return Err(MalformedStatisticsError::NonFinite {
                    field,
                    index,
                    value,
                });
            }
        }
        let tol = std_tolerance.abs();
        if let Some((index, &value)) = std.iter().enumerate().find(|&(_, &s)| s < -tol) {
            return Err(MalformedStatisticsError::NegativeStd { index, value });
        }
        for i in 0..d {
            if q01[i] > q99[i] {
                return Err(MalformedStatisticsError::InvertedQuantiles {
                    index: i,
                    q01: q01[i],
                    q99: q99[i],
                });
            }
        }
        Ok(Self {
            name: name.into(),
            mean,
            std,
            q01,
            q99,
        })
    }

    /// Build from a possibly incomplete on-disk record.
    pub fn from_record(
        name: impl Into<String>,
        record: StatsRecord,
        std_tolerance: f64,
    ) -> Result<Self, MalformedStatisticsError> {
        let mean = record
            .mean
            .ok_or(MalformedStatisticsError::MissingField("mean"))?;
        let std = record
            .std
            .ok_or(MalformedStatisticsError::MissingField("std"))?;
        let q01 = record
            .q01
            .ok_or(MalformedStatisticsError::MissingField("q01"))?;
        let q99 = record
            .q99
            .ok_or(MalformedStatisticsError::MissingField("q99"))?;
        Self::new(name, mean, std, q01, q99, std_tolerance)
    }

    pub fn to_record(&self) -> StatsRecord {
        StatsRecord {
            mean: Some(self.mean.clone()),
            std: Some(self.std.clone()),
            q01: Some(self.q01.clone()),
            q99: Some(self.q99.clone()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dimension_count(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn std(&self) -> &[f64] {
        &self.std
    }

    pub fn q01(&self) -> &[f64] {
        &self.q01
    }

    pub fn q99(&self) -> &[f64] {
        &self.q99
    }
}

#[derive(Debug, Error)]
pub enum StatsLoadError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("statistics source must be a JSON object keyed by signal name")]
    NotAnObject,
    #[error("statistics for signal '{signal}' are malformed: {source}")]
    Malformed {
        signal: String,
        #[source]
        source: MalformedStatisticsError,
    },
    #[error("statistics record for signal '{signal}' is not well-typed: {source}")]
    Record {
        signal: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("statistics source has no signal '{0}'")]
    MissingSignal(String),
}

/// All signals of one statistics source (one policy checkpoint).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormStats {
    signals: BTreeMap<String, StatisticsModel>,
}

impl NormStats {
    /// Load a statistics source from a JSON file.
    pub fn load(path: impl AsRef<Path>, std_tolerance: f64) -> Result<Self, StatsLoadError> {
        let bytes = std::fs::read(path)?;
        let value: serde_json::Value = serde_json::from_slice(&bytes)?;
        Self::from_value(value, std_tolerance)
    }

    pub fn from_json(json: &str, std_tolerance: f64) -> Result<Self, StatsLoadError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value, std_tolerance)
    }

    fn from_value(value: serde_json::Value, std_tolerance: f64) -> Result<Self, StatsLoadError> {
        let serde_json::Value::Object(mut root) = value else {
            return Err(StatsLoadError::NotAnObject);
        };
        let map = match root.remove(NORM_STATS_KEY) {
            Some(serde_json::Value::Object(inner)) => inner,
            Some(_) => return Err(StatsLoadError::NotAnObject),
            None => root,
        };
        let mut signals = BTreeMap::new();
        for (signal, v) in map {
            let record: StatsRecord =
                serde_json::from_value(v).map_err(|source| StatsLoadError::Record {
                    signal: signal.clone(),
                    source,
                })?;
            let model = StatisticsModel::from_record(signal.clone(), record, std_tolerance)
                .map_err(|source| StatsLoadError::Malformed {
                    signal: signal.clone(),
                    source,
                })?;
            signals.insert(signal, model);
        }
        Ok(Self { signals })
    }

    pub fn insert(&mut self, model: StatisticsModel) {
        self.signals.insert(model.name().to_string(), model);
    }

    pub fn get(&self, signal: &str) -> Option<&StatisticsModel> {
        self.signals.get(signal)
    }

    /// Like [`NormStats::get`], but a missing signal is an error.
    pub fn signal(&self, signal: &str) -> Result<&StatisticsModel, StatsLoadError> {
        self.get(signal)
            .ok_or_else(|| StatsLoadError::MissingSignal(signal.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.signals.keys().map(String::as_str)
    }

    /// Serialize back to the wrapped `{"norm_stats": {...}}` layout.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        let inner: BTreeMap<&str, StatsRecord> = self
            .signals
            .iter()
            .map(|(k, m)| (k.as_str(), m.to_record()))
            .collect();
        serde_json::to_string_pretty(&serde_json::json!({ NORM_STATS_KEY: inner }))
    }
}
