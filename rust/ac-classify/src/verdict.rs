//! Classification outcome + the evidence behind it.

use std::fmt;

use ac_core::ControllerMode;
use serde::{Deserialize, Serialize};

/// Reported outcome of one classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    DeltaPose,
    AbsolutePose,
    DeltaJoint,
    /// The evidence points at semantics the declared controller does not accept.
    Inconsistent,
    Unknown,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DeltaPose => "DELTA_POSE",
            Self::AbsolutePose => "ABSOLUTE_POSE",
            Self::DeltaJoint => "DELTA_JOINT",
            Self::Inconsistent => "INCONSISTENT",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the observed response looks like, independent of what the controller declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Semantics {
    DeltaPose,
    AbsolutePose,
    DeltaJoint,
}

impl Semantics {
    pub fn verdict(self) -> Verdict {
        match self {
            Self::DeltaPose => Verdict::DeltaPose,
            Self::AbsolutePose => Verdict::AbsolutePose,
            Self::DeltaJoint => Verdict::DeltaJoint,
        }
    }

    pub fn is_incremental(self) -> bool {
        matches!(self, Self::DeltaPose | Self::DeltaJoint)
    }
}

/// Why the evidence did not support any label. A reportable outcome, not a failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Inconclusive {
    /// Neither the command nor the response moved measurably.
    NoExcitation,
    /// No heuristic for this action dimensionality.
    UnsupportedDimension { action_dim: usize },
    /// Commanded and observed magnitudes are neither comparable nor orders apart.
    /// When the response is below `min_motion`, `ratio` is the lower bound `r / min_motion`.
    AmbiguousMagnitude { ratio: f64 },
    /// The state moved although the command was below `min_motion`.
    MotionWithoutCommand { observed: f64 },
    /// Comparable magnitudes, but too large for an increment.
    LargeDisplacement { commanded: f64, observed: f64 },
    /// Looks like a target, but the target is outside the workspace.
    OutsideWorkspace,
    /// Joint commands and joint motion disagree in sign.
    SignDisagreement { agreement: f64 },
}

impl fmt::Display for Inconclusive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoExcitation => write!(f, "no measurable command or response"),
            Self::UnsupportedDimension { action_dim } => {
                write!(f, "no heuristic for action dimensionality {action_dim}")
            }
            Self::AmbiguousMagnitude { ratio } => {
                write!(f, "commanded/observed ratio {ratio:.3} is in the ambiguous band")
            }
            Self::MotionWithoutCommand { observed } => {
                write!(f, "observed motion {observed:.4} without a measurable command")
            }
            Self::LargeDisplacement { commanded, observed } => write!(
                f,
                "magnitudes comparable but large (commanded {commanded:.4}, observed {observed:.4})"
            ),
            Self::OutsideWorkspace => write!(f, "commanded position lies outside the workspace"),
            Self::SignDisagreement { agreement } => {
                write!(f, "only {:.0}% of excited joints moved in the commanded direction", agreement * 100.0)
            }
        }
    }
}

/// Numbers the verdict was derived from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evidence {
    pub action_dim: usize,
    pub mode: Option<ControllerMode>,
    pub control_delta: bool,
    /// Norm of the commanded position (pose layouts) or joint block (joint layout).
    pub commanded_magnitude: f64,
    /// Norm of the observed eef-position or joint-position change.
    pub observed_magnitude: f64,
    /// `commanded / observed`; absent when nothing moved.
    pub ratio: Option<f64>,
    pub within_workspace: Option<bool>,
    pub sign_agreement: Option<f64>,
}

/// Advisory result of one classification. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SemanticsVerdict {
    pub verdict: Verdict,
    /// What the response looked like; kept for `INCONSISTENT` too.
    pub detected: Option<Semantics>,
    pub inconclusive: Option<Inconclusive>,
    pub evidence: Evidence,
}

impl SemanticsVerdict {
    pub fn is_consistent(&self) -> bool {
        self.verdict != Verdict::Inconsistent
    }

    /// One-line human summary.
    pub fn summary(&self) -> String {
        let e = &self.evidence;
        let ratio = e
            .ratio
            .map(|r| format!("{r:.3}"))
            .unwrap_or_else(|| "n/a".to_string());
        let mut s = format!(
            "{} (commanded={:.4}, observed={:.4}, ratio={ratio}, d={})",
            self.verdict, e.commanded_magnitude, e.observed_magnitude, e.action_dim
        );
        if let (Verdict::Inconsistent, Some(d)) = (self.verdict, self.detected) {
            let declared = e.mode.map(|m| m.name()).unwrap_or("undeclared");
            let kind = if e.control_delta { "delta" } else { "absolute" };
            s.push_str(&format!(": observed {} but {declared} is configured for {kind} commands", d.verdict()));
        }
        if let Some(reason) = &self.inconclusive {
            s.push_str(&format!(": {reason}"));
        }
        s
    }
}
