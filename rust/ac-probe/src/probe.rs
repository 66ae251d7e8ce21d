//! One-shot actuation probe.
//!
//! Contract:
//! - the interface is acquired once per probe and closed exactly once, on every exit path
//! - `step` is called at most once (exactly once when reset/set_state succeed)
//! - failures are wrapped and returned; nothing is retried
//! - the action is never interpreted here

use std::collections::BTreeMap;

use ac_core::{ObservationKeys, RawAction};
use serde::Serialize;
use thiserror::Error;

use crate::interface::{ActuationInterface, InitialState};
use crate::observation::{ObservationError, ObservationSnapshot, SnapshotDelta};

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Interface call a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbePhase {
    Reset,
    SetState,
    Step,
    Close,
}

impl std::fmt::Display for ProbePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Reset => "reset",
            Self::SetState => "set_state",
            Self::Step => "step",
            Self::Close => "close",
        })
    }
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("actuation interface failed during {phase}: {source}")]
    Execution {
        phase: ProbePhase,
        #[source]
        source: BoxError,
    },
    #[error("probe step completed but closing the interface failed: {source}")]
    Release {
        /// The completed record; the step is not repeated.
        record: Box<ProbeRecord>,
        #[source]
        source: BoxError,
    },
    #[error("invalid action length: got {actual}, expected {expected}")]
    ActionDimension { expected: usize, actual: usize },
    #[error("observation after {phase} is unusable: {source}")]
    Observation {
        phase: ProbePhase,
        #[source]
        source: ObservationError,
    },
}

impl ProbeError {
    pub fn phase(&self) -> Option<ProbePhase> {
        match self {
            Self::Execution { phase, .. } | Self::Observation { phase, .. } => Some(*phase),
            Self::Release { .. } => Some(ProbePhase::Close),
            Self::ActionDimension { .. } => None,
        }
    }
}

/// Everything one probe observed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeRecord {
    pub action: RawAction,
    pub pre: ObservationSnapshot,
    pub post: ObservationSnapshot,
    pub reward: f64,
    pub done: bool,
    pub info: BTreeMap<String, serde_json::Value>,
}

impl ProbeRecord {
    pub fn delta(&self) -> Result<SnapshotDelta, ObservationError> {
        self.pre.delta(&self.post)
    }
}

/// Owns the interface for one probe and closes it exactly once.
struct Scoped<I: ActuationInterface> {
    inner: I,
    closed: bool,
}

impl<I: ActuationInterface> Scoped<I> {
    fn new(inner: I) -> Self {
        Self {
            inner,
            closed: false,
        }
    }

    fn get(&mut self) -> &mut I {
        &mut self.inner
    }

    fn release(mut self) -> Result<(), I::Error> {
        self.closed = true;
        self.inner.close()
    }
}

impl<I: ActuationInterface> Drop for Scoped<I> {
    fn drop(&mut self) {
        // Unwinding or early return: close anyway, nothing left to report to.
        if !self.closed {
            self.closed = true;
            let _ = self.inner.close();
        }
    }
}

fn exec<T, E>(phase: ProbePhase, r: Result<T, E>) -> Result<T, ProbeError>
where
    E: std::error::Error + Send + Sync + 'static,
{
    r.map_err(|e| ProbeError::Execution {
        phase,
        source: Box::new(e),
    })
}

/// Drives one controlled action through an actuation interface.
#[derive(Debug, Clone, Default)]
pub struct ActuationProbe {
    keys: ObservationKeys,
    action_dim: Option<usize>,
}

impl ActuationProbe {
    pub fn new(keys: ObservationKeys) -> Self {
        Self {
            keys,
            action_dim: None,
        }
    }

    /// Reject actions of any other length before touching the interface.
    pub fn with_action_dim(mut self, action_dim: usize) -> Self {
        self.action_dim = Some(action_dim);
        self
    }

    pub fn keys(&self) -> &ObservationKeys {
        &self.keys
    }

    /// Reset to `initial`, snapshot, step once with `action`, snapshot, close.
    pub fn probe<I: ActuationInterface>(
        &self,
        interface: I,
        action: &RawAction,
        initial: &InitialState,
    ) -> Result<ProbeRecord, ProbeError> {
        let mut scoped = Scoped::new(interface);
        if let Some(expected) = self.action_dim {
            if action.len() != expected {
                return Err(ProbeError::ActionDimension {
                    expected,
                    actual: action.len(),
                });
            }
        }

        let outcome = self.run(scoped.get(), action, initial);
        let released = scoped.release();
        match (outcome, released) {
            (Ok(record), Ok(())) => Ok(record),
            (Ok(record), Err(e)) => Err(ProbeError::Release {
                record: Box::new(record),
                source: Box::new(e),
            }),
            // The first failure is the diagnosis; the interface was still closed.
            (Err(e), _) => Err(e),
        }
    }

    fn run<I: ActuationInterface>(
        &self,
        iface: &mut I,
        action: &RawAction,
        initial: &InitialState,
    ) -> Result<ProbeRecord, ProbeError> {
        let mut obs = exec(ProbePhase::Reset, iface.reset())?;
        let mut phase = ProbePhase::Reset;
        if let InitialState::State(state) = initial {
            obs = exec(ProbePhase::SetState, iface.set_state(state))?;
            phase = ProbePhase::SetState;
        }
        let pre = ObservationSnapshot::capture(&obs, &self.keys)
            .map_err(|source| ProbeError::Observation { phase, source })?;

        let out = exec(ProbePhase::Step, iface.step(action))?;
        let post = ObservationSnapshot::capture(&out.observation, &self.keys).map_err(|source| {
            ProbeError::Observation {
                phase: ProbePhase::Step,
                source,
            }
        })?;

        Ok(ProbeRecord {
            action: action.clone(),
            pre,
            post,
            reward: out.reward,
            done: out.done,
            info: out.info,
        })
    }
}
