//! Action-space semantics heuristic.
//!
//! Compares the magnitude and structure of what was commanded with what the probe
//! observed. This is a best-effort diagnostic with configurable thresholds, not a proof:
//!
//! - pose layouts (d=7, d=4): commanded position norm `r` vs. observed eef displacement `o`
//!   - `r/o` within one order of magnitude and both below `delta_limit` -> delta pose
//!   - `r/o >= absolute_min_ratio` with the command inside the workspace -> absolute pose;
//!     with `o` below `min_motion` this needs `r >= absolute_min_ratio * min_motion`
//! - joint layout (d=8): joint commands vs. joint motion must agree in sign and be within
//!   one order of magnitude -> delta joint
//! - anything else -> unknown, with the reason
//!
//! A detection the declared controller does not accept is reported as inconsistent.

use ac_core::{l2_norm, ActionLayout, ClassifierConfig, ControllerMetadata, RawAction};
use ac_probe::{ObservationError, ObservationSnapshot, ProbeRecord, SnapshotDelta};
use thiserror::Error;

use crate::verdict::{Evidence, Inconclusive, Semantics, SemanticsVerdict, Verdict};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    #[error("invalid action length: got {actual}, expected {expected}")]
    ActionDimension { expected: usize, actual: usize },
    #[error("no action layout for dimensionality {action_dim}")]
    UnsupportedDimension { action_dim: usize },
    #[error("invalid joint count in observation: got {actual}, expected at least {expected}")]
    JointCount { expected: usize, actual: usize },
    #[error("snapshot error: {0}")]
    Observation(#[from] ObservationError),
}

/// Pure classifier; holds only thresholds.
#[derive(Debug, Clone, Default)]
pub struct SemanticsClassifier {
    cfg: ClassifierConfig,
}

impl SemanticsClassifier {
    pub fn new(cfg: ClassifierConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.cfg
    }

    pub fn classify_record(
        &self,
        meta: &ControllerMetadata,
        record: &ProbeRecord,
    ) -> Result<SemanticsVerdict, ClassifyError> {
        self.classify(meta, &record.action, &record.pre, &record.post)
    }

    /// Classify one `(action, pre, post)` triple against the declared controller.
    pub fn classify(
        &self,
        meta: &ControllerMetadata,
        action: &RawAction,
        pre: &ObservationSnapshot,
        post: &ObservationSnapshot,
    ) -> Result<SemanticsVerdict, ClassifyError> {
        if action.len() != meta.action_dim {
            return Err(ClassifyError::ActionDimension {
                expected: meta.action_dim,
                actual: action.len(),
            });
        }
        let delta = pre.delta(post)?;
        match meta.layout() {
            Some(layout @ (ActionLayout::Pose | ActionLayout::Position)) => {
                Ok(self.classify_pose(meta, layout, action, &delta))
            }
            Some(ActionLayout::Joint) => self.classify_joint(meta, action, &delta),
            None => {
                let evidence = self.evidence(meta, 0.0, 0.0);
                Ok(unknown(
                    evidence,
                    Inconclusive::UnsupportedDimension {
                        action_dim: meta.action_dim,
                    },
                ))
            }
        }
    }

    fn evidence(&self, meta: &ControllerMetadata, commanded: f64, observed: f64) -> Evidence {
        Evidence {
            action_dim: meta.action_dim,
            mode: meta.mode,
            control_delta: meta.control_delta,
            commanded_magnitude: commanded,
            observed_magnitude: observed,
            ratio: (observed > self.cfg.min_motion).then(|| commanded / observed),
            within_workspace: None,
            sign_agreement: None,
        }
    }

    fn comparable(&self, ratio: f64) -> bool {
        let k = self.cfg.order_of_magnitude;
        ratio >= 1.0 / k && ratio <= k
    }

    fn classify_pose(
        &self,
        meta: &ControllerMetadata,
        layout: ActionLayout,
        action: &RawAction,
        delta: &SnapshotDelta,
    ) -> SemanticsVerdict {
        let position = action.position(layout).unwrap_or(&[]);
        let r = l2_norm(position);
        let o = l2_norm(&delta.eef_pos);
        let workspace = meta.workspace.unwrap_or(self.cfg.workspace);
        let inside = workspace.contains(position);

        let mut evidence = self.evidence(meta, r, o);
        evidence.within_workspace = Some(inside);

        let eps = self.cfg.min_motion;
        if r <= eps && o <= eps {
            return unknown(evidence, Inconclusive::NoExcitation);
        }
        if r <= eps {
            return unknown(evidence, Inconclusive::MotionWithoutCommand { observed: o });
        }

        let target = |evidence: Evidence| {
            if inside {
                resolve(meta, Semantics::AbsolutePose, evidence)
            } else {
                unknown(evidence, Inconclusive::OutsideWorkspace)
            }
        };
        match evidence.ratio {
            Some(ratio) if self.comparable(ratio) => {
                if r < self.cfg.delta_limit && o < self.cfg.delta_limit {
                    resolve(meta, Semantics::DeltaPose, evidence)
                } else {
                    unknown(
                        evidence,
                        Inconclusive::LargeDisplacement {
                            commanded: r,
                            observed: o,
                        },
                    )
                }
            }
            Some(ratio) if ratio >= self.cfg.absolute_min_ratio => target(evidence),
            Some(ratio) => unknown(evidence, Inconclusive::AmbiguousMagnitude { ratio }),
            // Motion below min_motion bounds the ratio from below by r / min_motion.
            None if r >= self.cfg.absolute_min_ratio * eps => target(evidence),
            None => {
                let ratio = r / eps;
                unknown(evidence, Inconclusive::AmbiguousMagnitude { ratio })
            }
        }
    }

    fn classify_joint(
        &self,
        meta: &ControllerMetadata,
        action: &RawAction,
        delta: &SnapshotDelta,
    ) -> Result<SemanticsVerdict, ClassifyError> {
        let joints = action.joints(ActionLayout::Joint).unwrap_or(&[]);
        if delta.joint_pos.len() < joints.len() {
            return Err(ClassifyError::JointCount {
                expected: joints.len(),
                actual: delta.joint_pos.len(),
            });
        }
        let dq = &delta.joint_pos[..joints.len()];
        let r = l2_norm(joints);
        let o = l2_norm(dq);
        let mut evidence = self.evidence(meta, r, o);

        let eps = self.cfg.min_motion;
        let excited: Vec<usize> = (0..joints.len()).filter(|&i| joints[i].abs() > eps).collect();
        if excited.is_empty() && o > eps {
            return Ok(unknown(evidence, Inconclusive::MotionWithoutCommand { observed: o }));
        }
        if excited.is_empty() || o <= eps {
            return Ok(unknown(evidence, Inconclusive::NoExcitation));
        }
        let agreeing = excited
            .iter()
            .filter(|&&i| dq[i].abs() > eps && dq[i].signum() == joints[i].signum())
            .count();
        let agreement = agreeing as f64 / excited.len() as f64;
        evidence.sign_agreement = Some(agreement);

        if agreement < self.cfg.sign_agreement {
            return Ok(unknown(evidence, Inconclusive::SignDisagreement { agreement }));
        }
        match evidence.ratio {
            Some(ratio) if self.comparable(ratio) => {
                Ok(resolve(meta, Semantics::DeltaJoint, evidence))
            }
            Some(ratio) => Ok(unknown(evidence, Inconclusive::AmbiguousMagnitude { ratio })),
            None => Ok(unknown(evidence, Inconclusive::NoExcitation)),
        }
    }
}

fn unknown(evidence: Evidence, reason: Inconclusive) -> SemanticsVerdict {
    SemanticsVerdict {
        verdict: Verdict::Unknown,
        detected: None,
        inconclusive: Some(reason),
        evidence,
    }
}

/// Check a detection against what the controller declares it accepts.
fn resolve(meta: &ControllerMetadata, detected: Semantics, evidence: Evidence) -> SemanticsVerdict {
    let accepted = if detected.is_incremental() {
        meta.accepts_delta()
    } else {
        meta.accepts_absolute()
    };
    let verdict = match accepted {
        Some(false) => Verdict::Inconsistent,
        _ => detected.verdict(),
    };
    SemanticsVerdict {
        verdict,
        detected: Some(detected),
        inconclusive: None,
        evidence,
    }
}
