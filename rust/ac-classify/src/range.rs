//! Where do the action statistics live?
//!
//! A policy trained on increments has a q01..q99 span of a few centimetres on its position
//! dims; one trained on targets has spans comparable to the workspace. Comparing the spans
//! with the controller's declared ranges gives a hint before anything is executed.

use std::fmt;

use ac_core::{ActionLayout, ControllerMetadata, WorkspaceBounds};
use ac_norm::StatisticsModel;
use serde::Serialize;

use crate::classifier::ClassifyError;

/// Narrowest declared range a span fits in. Ordered from narrowest to widest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeHint {
    /// Inside the controller's output range: already physical increments.
    PhysicalDelta,
    /// Inside the controller's input range: increments in controller units.
    ControllerInput,
    /// Inside the workspace: looks like target positions.
    WorkspaceTarget,
    OutOfRange,
}

impl RangeHint {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PhysicalDelta => "physical_delta",
            Self::ControllerInput => "controller_input",
            Self::WorkspaceTarget => "workspace_target",
            Self::OutOfRange => "out_of_range",
        }
    }
}

impl fmt::Display for RangeHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimRange {
    pub index: usize,
    pub q01: f64,
    pub q99: f64,
    pub hint: RangeHint,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeReport {
    pub signal: String,
    pub layout: ActionLayout,
    /// One entry per position dim (pose layouts) or joint dim (joint layout).
    pub dims: Vec<DimRange>,
    /// Widest hint over `dims`.
    pub position_hint: RangeHint,
}

fn within(lo: f64, hi: f64, bounds: Option<(f64, f64)>) -> bool {
    matches!(bounds, Some((min, max)) if lo >= min && hi <= max)
}

fn declared(min: &Option<Vec<f64>>, max: &Option<Vec<f64>>, i: usize) -> Option<(f64, f64)> {
    let min = min.as_ref()?.get(i)?;
    let max = max.as_ref()?.get(i)?;
    Some((*min, *max))
}

/// Hint for a single dim spanning `[lo, hi]`.
fn span_hint(
    lo: f64,
    hi: f64,
    i: usize,
    layout: ActionLayout,
    meta: &ControllerMetadata,
    workspace: &WorkspaceBounds,
) -> RangeHint {
    if within(lo, hi, declared(&meta.output_min, &meta.output_max, i)) {
        RangeHint::PhysicalDelta
    } else if within(lo, hi, declared(&meta.input_min, &meta.input_max, i)) {
        RangeHint::ControllerInput
    } else if layout != ActionLayout::Joint && i < 3 && within(lo, hi, Some((workspace.min[i], workspace.max[i]))) {
        RangeHint::WorkspaceTarget
    } else {
        RangeHint::OutOfRange
    }
}

fn control_indices(layout: ActionLayout) -> std::ops::Range<usize> {
    layout
        .position()
        .or_else(|| layout.joints())
        .unwrap_or(0..0)
}

/// Compare the q01..q99 span of each position (or joint) dim with the declared ranges.
///
/// `fallback_workspace` is used when the metadata declares none.
pub fn analyze_action_ranges(
    stats: &StatisticsModel,
    meta: &ControllerMetadata,
    fallback_workspace: &WorkspaceBounds,
) -> Result<RangeReport, ClassifyError> {
    if stats.dimension_count() != meta.action_dim {
        return Err(ClassifyError::ActionDimension {
            expected: meta.action_dim,
            actual: stats.dimension_count(),
        });
    }
    let layout = meta.layout().ok_or(ClassifyError::UnsupportedDimension {
        action_dim: meta.action_dim,
    })?;
    let workspace = meta.workspace.as_ref().unwrap_or(fallback_workspace);

    let dims: Vec<DimRange> = control_indices(layout)
        .map(|i| {
            let (q01, q99) = (stats.q01()[i], stats.q99()[i]);
            DimRange {
                index: i,
                q01,
                q99,
                hint: span_hint(q01, q99, i, layout, meta, workspace),
            }
        })
        .collect();
    let position_hint = dims
        .iter()
        .map(|d| d.hint)
        .max()
        .unwrap_or(RangeHint::OutOfRange);

    Ok(RangeReport {
        signal: stats.name().to_string(),
        layout,
        dims,
        position_hint,
    })
}

/// Widest hint over the position (or joint) values of a single raw action.
///
/// Returns `None` when the action does not fit the metadata's layout.
pub fn hint_for_values(
    values: &[f64],
    meta: &ControllerMetadata,
    fallback_workspace: &WorkspaceBounds,
) -> Option<RangeHint> {
    let layout = meta.layout()?;
    if values.len() != layout.action_dim() {
        return None;
    }
    let workspace = meta.workspace.as_ref().unwrap_or(fallback_workspace);
    control_indices(layout)
        .map(|i| span_hint(values[i], values[i], i, layout, meta, workspace))
        .max()
}
