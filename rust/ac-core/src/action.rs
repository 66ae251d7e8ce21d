//! Action vectors and their layout.
//!
//! A policy emits a [`NormalizedAction`] (model space, typically within [-3, 3]);
//! the actuation interface consumes a [`RawAction`] (physical units). The two
//! are separate types so a function's signature states which one it expects.
//!
//! Layouts (index ranges into the vector):
//! - `Pose` (d=7): position `[0:3]`, rotation `[3:6]` (axis-angle), gripper `[6]`
//! - `Position` (d=4): position `[0:3]`, gripper `[3]`
//! - `Joint` (d=8): joints `[0:7]`, gripper `[7]`

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Named sub-ranges of an action vector for a given controller family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionLayout {
    Pose,
    Position,
    Joint,
}

impl ActionLayout {
    /// Layout implied by an action dimensionality, if it is one we know.
    pub fn for_dim(action_dim: usize) -> Option<Self> {
        match action_dim {
            7 => Some(Self::Pose),
            4 => Some(Self::Position),
            8 => Some(Self::Joint),
            _ => None,
        }
    }

    pub fn action_dim(self) -> usize {
        match self {
            Self::Pose => 7,
            Self::Position => 4,
            Self::Joint => 8,
        }
    }

    pub fn position(self) -> Option<Range<usize>> {
        match self {
            Self::Pose | Self::Position => Some(0..3),
            Self::Joint => None,
        }
    }

    pub fn rotation(self) -> Option<Range<usize>> {
        match self {
            Self::Pose => Some(3..6),
            Self::Position | Self::Joint => None,
        }
    }

    pub fn joints(self) -> Option<Range<usize>> {
        match self {
            Self::Joint => Some(0..7),
            Self::Pose | Self::Position => None,
        }
    }

    /// Index of the gripper command (always the last component).
    pub fn gripper(self) -> usize {
        self.action_dim() - 1
    }
}

/// Borrowed view of an action split along its layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionParts<'a> {
    pub position: Option<&'a [f64]>,
    pub rotation: Option<&'a [f64]>,
    pub joints: Option<&'a [f64]>,
    pub gripper: f64,
}

fn split_values(values: &[f64], layout: ActionLayout) -> Option<ActionParts<'_>> {
    if values.len() != layout.action_dim() {
        return None;
    }
    Some(ActionParts {
        position: layout.position().map(|r| &values[r]),
        rotation: layout.rotation().map(|r| &values[r]),
        joints: layout.joints().map(|r| &values[r]),
        gripper: values[layout.gripper()],
    })
}

/// Actuation-ready action in physical units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawAction(Vec<f64>);

impl RawAction {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }

    /// Split into position/rotation/joints/gripper. `None` if the length does not match `layout`.
    pub fn split(&self, layout: ActionLayout) -> Option<ActionParts<'_>> {
        split_values(&self.0, layout)
    }

    /// Position block (`[0:3]`) for layouts that carry one.
    pub fn position(&self, layout: ActionLayout) -> Option<&[f64]> {
        self.split(layout).and_then(|p| p.position)
    }

    /// Joint block (`[0:7]`) for the joint layout.
    pub fn joints(&self, layout: ActionLayout) -> Option<&[f64]> {
        self.split(layout).and_then(|p| p.joints)
    }
}

impl From<Vec<f64>> for RawAction {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

/// Policy output in model space (before denormalization).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedAction(Vec<f64>);

impl NormalizedAction {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

impl From<Vec<f64>> for NormalizedAction {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

/// Euclidean norm of a slice.
pub fn l2_norm(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum::<f64>().sqrt()
}
