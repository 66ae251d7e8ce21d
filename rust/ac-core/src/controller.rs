//! Declared controller metadata.
//!
//! The metadata is what the actuation side *claims* to consume. It is only ever used as
//! evidence for classification; nothing in this workspace clamps an action to these bounds.

use serde::{Deserialize, Serialize};

use crate::action::ActionLayout;

/// Controller families with known defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControllerMode {
    /// Operational-space control of position + orientation (3 + 3 + gripper).
    OscPose,
    /// Operational-space control of position only (3 + gripper).
    OscPosition,
    /// Joint-space position control (7 joints + gripper).
    JointPosition,
}

impl ControllerMode {
    pub const ALL: [ControllerMode; 3] = [Self::OscPose, Self::OscPosition, Self::JointPosition];

    pub fn name(self) -> &'static str {
        match self {
            Self::OscPose => "OSC_POSE",
            Self::OscPosition => "OSC_POSITION",
            Self::JointPosition => "JOINT_POSITION",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(s.trim()))
    }

    pub fn layout(self) -> ActionLayout {
        match self {
            Self::OscPose => ActionLayout::Pose,
            Self::OscPosition => ActionLayout::Position,
            Self::JointPosition => ActionLayout::Joint,
        }
    }

    pub fn action_dim(self) -> usize {
        self.layout().action_dim()
    }

    /// Default output scaling limits for the arm dims (gripper excluded).
    fn default_output_max(self) -> Vec<f64> {
        match self {
            Self::OscPose => vec![0.05, 0.05, 0.05, 0.5, 0.5, 0.5],
            Self::OscPosition => vec![0.05; 3],
            Self::JointPosition => vec![0.05; 7],
        }
    }
}

impl std::fmt::Display for ControllerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Axis-aligned bounds of reachable end-effector positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceBounds {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl WorkspaceBounds {
    /// True if every component of `position` lies inside the bounds (inclusive).
    ///
    /// Positions that are not exactly 3 long are never inside.
    pub fn contains(&self, position: &[f64]) -> bool {
        position.len() == 3
            && position
                .iter()
                .enumerate()
                .all(|(i, &p)| p >= self.min[i] && p <= self.max[i])
    }

    pub fn is_well_formed(&self) -> bool {
        (0..3).all(|i| self.min[i].is_finite() && self.max[i].is_finite() && self.min[i] <= self.max[i])
    }
}

impl Default for WorkspaceBounds {
    fn default() -> Self {
        Self {
            min: [-1.0; 3],
            max: [1.0; 3],
        }
    }
}

/// What the controller declares about its action interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerMetadata {
    /// Declared controller family, if known.
    pub mode: Option<ControllerMode>,
    /// Declared action dimensionality (including the gripper).
    pub action_dim: usize,
    /// True if the controller interprets arm commands as increments.
    pub control_delta: bool,
    /// Declared per-dimension input range (arm dims only).
    pub input_min: Option<Vec<f64>>,
    pub input_max: Option<Vec<f64>>,
    /// Declared per-dimension output range after input scaling (arm dims only).
    pub output_min: Option<Vec<f64>>,
    pub output_max: Option<Vec<f64>>,
    /// Declared reachable workspace.
    pub workspace: Option<WorkspaceBounds>,
}

impl ControllerMetadata {
    /// Default metadata for a controller family (delta control, input range ±1).
    pub fn preset(mode: ControllerMode) -> Self {
        let output_max = mode.default_output_max();
        let control_dim = output_max.len();
        Self {
            mode: Some(mode),
            action_dim: mode.action_dim(),
            control_delta: true,
            input_min: Some(vec![-1.0; control_dim]),
            input_max: Some(vec![1.0; control_dim]),
            output_min: Some(output_max.iter().map(|v| -v).collect()),
            output_max: Some(output_max),
            workspace: None,
        }
    }

    /// Metadata that only states a dimensionality.
    pub fn undeclared(action_dim: usize) -> Self {
        Self {
            mode: None,
            action_dim,
            control_delta: true,
            input_min: None,
            input_max: None,
            output_min: None,
            output_max: None,
            workspace: None,
        }
    }

    pub fn layout(&self) -> Option<ActionLayout> {
        ActionLayout::for_dim(self.action_dim)
    }

    /// Number of arm dims (the trailing gripper command excluded).
    pub fn control_dim(&self) -> usize {
        self.action_dim.saturating_sub(1)
    }

    /// Whether absolute targets are accepted. `None` when no mode was declared.
    pub fn accepts_absolute(&self) -> Option<bool> {
        self.mode.map(|_| !self.control_delta)
    }

    /// Whether increments are accepted. `None` when no mode was declared.
    pub fn accepts_delta(&self) -> Option<bool> {
        self.mode.map(|_| self.control_delta)
    }
}
