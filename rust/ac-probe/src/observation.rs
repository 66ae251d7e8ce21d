//! Immutable robot-state snapshots taken around the probe step.

use ac_core::ObservationKeys;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::interface::Observation;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObservationError {
    #[error("observation has no field '{0}'")]
    MissingField(String),
    #[error("invalid length for observation field '{field}': got {actual}, expected {expected}")]
    FieldLength {
        field: String,
        expected: usize,
        actual: usize,
    },
    #[error("snapshots disagree on {field} length: {before} before, {after} after")]
    SnapshotMismatch {
        field: &'static str,
        before: usize,
        after: usize,
    },
}

fn default_quat() -> [f64; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

/// End-effector pose, joint positions and gripper state at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationSnapshot {
    eef_pos: [f64; 3],
    #[serde(default = "default_quat")]
    eef_quat: [f64; 4],
    #[serde(default)]
    joint_pos: Vec<f64>,
    #[serde(default)]
    gripper_qpos: Vec<f64>,
}

fn fixed<const N: usize>(obs: &Observation, key: &str) -> Result<[f64; N], ObservationError> {
    let v = obs
        .get(key)
        .ok_or_else(|| ObservationError::MissingField(key.to_string()))?;
    v.try_into().map_err(|_| ObservationError::FieldLength {
        field: key.to_string(),
        expected: N,
        actual: v.len(),
    })
}

fn variable(obs: &Observation, key: &str) -> Result<Vec<f64>, ObservationError> {
    obs.get(key)
        .map(<[f64]>::to_vec)
        .ok_or_else(|| ObservationError::MissingField(key.to_string()))
}

fn sub(field: &'static str, before: &[f64], after: &[f64]) -> Result<Vec<f64>, ObservationError> {
    if before.len() != after.len() {
        return Err(ObservationError::SnapshotMismatch {
            field,
            before: before.len(),
            after: after.len(),
        });
    }
    Ok(after.iter().zip(before).map(|(a, b)| a - b).collect())
}

impl ObservationSnapshot {
    pub fn new(
        eef_pos: [f64; 3],
        eef_quat: [f64; 4],
        joint_pos: Vec<f64>,
        gripper_qpos: Vec<f64>,
    ) -> Self {
        Self {
            eef_pos,
            eef_quat,
            joint_pos,
            gripper_qpos,
        }
    }

    /// Snapshot with only an end-effector position (identity orientation, no joints).
    pub fn from_eef_pos(eef_pos: [f64; 3]) -> Self {
        Self::new(eef_pos, default_quat(), Vec::new(), Vec::new())
    }

    /// Copy the relevant fields out of an observation.
    pub fn capture(obs: &Observation, keys: &ObservationKeys) -> Result<Self, ObservationError> {
        Ok(Self {
            eef_pos: fixed::<3>(obs, &keys.eef_pos)?,
            eef_quat: fixed::<4>(obs, &keys.eef_quat)?,
            joint_pos: variable(obs, &keys.joint_pos)?,
            gripper_qpos: variable(obs, &keys.gripper_qpos)?,
        })
    }

    pub fn eef_pos(&self) -> &[f64; 3] {
        &self.eef_pos
    }

    pub fn eef_quat(&self) -> &[f64; 4] {
        &self.eef_quat
    }

    pub fn joint_pos(&self) -> &[f64] {
        &self.joint_pos
    }

    pub fn gripper_qpos(&self) -> &[f64] {
        &self.gripper_qpos
    }

    /// Elementwise `later - self` on every field.
    pub fn delta(&self, later: &ObservationSnapshot) -> Result<SnapshotDelta, ObservationError> {
        let mut eef_pos = [0.0; 3];
        for (i, d) in eef_pos.iter_mut().enumerate() {
            *d = later.eef_pos[i] - self.eef_pos[i];
        }
        let mut eef_quat = [0.0; 4];
        for (i, d) in eef_quat.iter_mut().enumerate() {
            *d = later.eef_quat[i] - self.eef_quat[i];
        }
        Ok(SnapshotDelta {
            eef_pos,
            eef_quat,
            joint_pos: sub("joint_pos", &self.joint_pos, &later.joint_pos)?,
            gripper_qpos: sub("gripper_qpos", &self.gripper_qpos, &later.gripper_qpos)?,
        })
    }
}

/// Componentwise difference of two snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDelta {
    pub eef_pos: [f64; 3],
    pub eef_quat: [f64; 4],
    pub joint_pos: Vec<f64>,
    pub gripper_qpos: Vec<f64>,
}
