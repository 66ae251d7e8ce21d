//! Actuation interface boundary.
//!
//! The simulator or robot driver lives outside this workspace; it is reached only through
//! [`ActuationInterface`]. Implementations are single mutable resources with no internal
//! locking contract, so they are driven from one thread at a time.

use std::collections::BTreeMap;

use ac_core::RawAction;
use serde::{Deserialize, Serialize};

/// Named numeric observation fields (e.g. `robot0_eef_pos -> [x, y, z]`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Observation(BTreeMap<String, Vec<f64>>);

impl Observation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, values: Vec<f64>) -> Self {
        self.insert(key, values);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, values: Vec<f64>) {
        self.0.insert(key.into(), values);
    }

    pub fn get(&self, key: &str) -> Option<&[f64]> {
        self.0.get(key).map(Vec::as_slice)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Vec<f64>> {
        self.0.get_mut(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// Result of one `step`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub observation: Observation,
    pub reward: f64,
    pub done: bool,
    #[serde(default)]
    pub info: BTreeMap<String, serde_json::Value>,
}

/// Where the interface starts before the probe step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialState {
    /// Whatever `reset()` produces.
    #[default]
    Reset,
    /// `reset()` followed by `set_state(state)` (e.g. a recorded task init state).
    State(Vec<f64>),
}

/// Capability set of a real or simulated actuation interface.
pub trait ActuationInterface {
    type Error: std::error::Error + Send + Sync + 'static;

    fn reset(&mut self) -> Result<Observation, Self::Error>;

    fn set_state(&mut self, state: &[f64]) -> Result<Observation, Self::Error>;

    /// Execute one action. Not idempotent: callers must never repeat a failed step.
    fn step(&mut self, action: &RawAction) -> Result<StepOutcome, Self::Error>;

    fn close(&mut self) -> Result<(), Self::Error>;
}

/// Lets a caller lend an interface to the probe and keep the handle afterwards.
impl<I: ActuationInterface + ?Sized> ActuationInterface for &mut I {
    type Error = I::Error;

    fn reset(&mut self) -> Result<Observation, Self::Error> {
        (**self).reset()
    }

    fn set_state(&mut self, state: &[f64]) -> Result<Observation, Self::Error> {
        (**self).set_state(state)
    }

    fn step(&mut self, action: &RawAction) -> Result<StepOutcome, Self::Error> {
        (**self).step(action)
    }

    fn close(&mut self) -> Result<(), Self::Error> {
        (**self).close()
    }
}
