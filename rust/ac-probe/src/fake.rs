//! In-memory actuation interface for tests and dry runs.
//!
//! Responds to `step` with a configurable kinematic rule and counts every call, so the
//! probe's exactly-once guarantees can be checked without a simulator.

use ac_core::{ObservationKeys, RawAction};
use thiserror::Error;

use crate::interface::{ActuationInterface, Observation, StepOutcome};
use crate::probe::ProbePhase;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("fake interface: injected failure in {0}")]
pub struct FakeError(pub ProbePhase);

/// How the fake moves in response to an action.
#[derive(Debug, Clone, PartialEq)]
pub enum FakeResponse {
    /// eef position += gain * action[0:3]; joints += gain * action[0:joints] for joint-length actions.
    Increment { gain: f64 },
    /// eef position moves `fraction` of the way toward action[0:3] (a target-tracking controller).
    TrackTarget { fraction: f64 },
    /// Return this observation regardless of the action.
    Fixed(Observation),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub reset: u32,
    pub set_state: u32,
    pub step: u32,
    pub close: u32,
}

#[derive(Debug, Clone)]
pub struct FakeInterface {
    keys: ObservationKeys,
    start: Observation,
    current: Observation,
    response: FakeResponse,
    fail_on: Option<ProbePhase>,
    calls: CallCounts,
    last_state: Option<Vec<f64>>,
}

impl FakeInterface {
    /// Start observation with the given eef position and a 7-joint arm at zero.
    pub fn new(keys: ObservationKeys, eef_pos: [f64; 3]) -> Self {
        let start = Observation::new()
            .with(keys.eef_pos.clone(), eef_pos.to_vec())
            .with(keys.eef_quat.clone(), vec![1.0, 0.0, 0.0, 0.0])
            .with(keys.joint_pos.clone(), vec![0.0; 7])
            .with(keys.gripper_qpos.clone(), vec![0.04, -0.04]);
        Self {
            keys,
            current: start.clone(),
            start,
            response: FakeResponse::Increment { gain: 1.0 },
            fail_on: None,
            calls: CallCounts::default(),
            last_state: None,
        }
    }

    pub fn with_response(mut self, response: FakeResponse) -> Self {
        self.response = response;
        self
    }

    /// Make the given call fail every time.
    pub fn failing_on(mut self, phase: ProbePhase) -> Self {
        self.fail_on = Some(phase);
        self
    }

    pub fn calls(&self) -> CallCounts {
        self.calls
    }

    pub fn last_state(&self) -> Option<&[f64]> {
        self.last_state.as_deref()
    }

    fn check(&self, phase: ProbePhase) -> Result<(), FakeError> {
        match self.fail_on {
            Some(p) if p == phase => Err(FakeError(phase)),
            _ => Ok(()),
        }
    }

    fn respond(&self, action: &RawAction) -> Observation {
        let a = action.as_slice();
        let mut next = self.current.clone();
        match &self.response {
            FakeResponse::Increment { gain } => {
                if let Some(pos) = next.get_mut(&self.keys.eef_pos) {
                    for (p, d) in pos.iter_mut().zip(a) {
                        *p += gain * d;
                    }
                }
                if a.len() == 8 {
                    if let Some(joints) = next.get_mut(&self.keys.joint_pos) {
                        for (q, d) in joints.iter_mut().zip(a) {
                            *q += gain * d;
                        }
                    }
                }
            }
            FakeResponse::TrackTarget { fraction } => {
                if let Some(pos) = next.get_mut(&self.keys.eef_pos) {
                    for (p, t) in pos.iter_mut().zip(a) {
                        *p += fraction * (t - *p);
                    }
                }
            }
            FakeResponse::Fixed(obs) => next = obs.clone(),
        }
        next
    }
}

impl ActuationInterface for FakeInterface {
    type Error = FakeError;

    fn reset(&mut self) -> Result<Observation, FakeError> {
        self.calls.reset += 1;
        self.check(ProbePhase::Reset)?;
        self.current = self.start.clone();
        Ok(self.current.clone())
    }

    fn set_state(&mut self, state: &[f64]) -> Result<Observation, FakeError> {
        self.calls.set_state += 1;
        self.check(ProbePhase::SetState)?;
        self.last_state = Some(state.to_vec());
        Ok(self.current.clone())
    }

    fn step(&mut self, action: &RawAction) -> Result<StepOutcome, FakeError> {
        self.calls.step += 1;
        self.check(ProbePhase::Step)?;
        self.current = self.respond(action);
        Ok(StepOutcome {
            observation: self.current.clone(),
            reward: 0.0,
            done: false,
            info: Default::default(),
        })
    }

    fn close(&mut self) -> Result<(), FakeError> {
        self.calls.close += 1;
        self.check(ProbePhase::Close)
    }
}
