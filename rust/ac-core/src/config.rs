//! Configuration schema for the action-contract checker.
//!
//! One YAML file configures every stage: normalization, the declared controller,
//! classifier thresholds and the observation field names the probe reads. All
//! sections have defaults, so an empty document is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::controller::{ControllerMetadata, ControllerMode, WorkspaceBounds};

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Statistics validation + transform settings.
    #[serde(default)]
    pub normalization: NormalizationConfig,
    /// Declared controller the policy is driving.
    #[serde(default)]
    pub controller: ControllerConfig,
    /// Semantics classifier thresholds.
    #[serde(default)]
    pub classifier: ClassifierConfig,
    /// Observation field names read by the probe.
    #[serde(default)]
    pub observation: ObservationKeys,
}

/// Per-dimension affine transform used between raw and model space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationMode {
    /// `(x - mean) / (std + eps)`.
    #[default]
    ZScore,
    /// `(x - q01) / (q99 - q01 + eps) * 2 - 1`.
    Quantile,
}

/// Normalization settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NormalizationConfig {
    /// Stabilizer added to the spread on both directions of the transform.
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
    /// A std entry below `-std_tolerance` rejects the statistics record.
    #[serde(default)]
    pub std_tolerance: f64,
    #[serde(default)]
    pub mode: NormalizationMode,
}

fn default_epsilon() -> f64 {
    1e-6
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            epsilon: default_epsilon(),
            std_tolerance: 0.0,
            mode: NormalizationMode::default(),
        }
    }
}

/// Declared controller settings.
///
/// `mode` picks a preset; the remaining fields override it. With `mode: null`, only
/// `action_dim` is declared and no consistency claims are made.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControllerConfig {
    #[serde(default = "default_controller_mode")]
    pub mode: Option<ControllerMode>,
    /// Overrides the preset's dimensionality. Required when `mode` is null.
    #[serde(default)]
    pub action_dim: Option<usize>,
    /// If false, the controller expects absolute targets.
    #[serde(default = "default_control_delta")]
    pub control_delta: bool,
    #[serde(default)]
    pub input_min: Option<Vec<f64>>,
    #[serde(default)]
    pub input_max: Option<Vec<f64>>,
    #[serde(default)]
    pub output_min: Option<Vec<f64>>,
    #[serde(default)]
    pub output_max: Option<Vec<f64>>,
    #[serde(default)]
    pub workspace: Option<WorkspaceBounds>,
}

fn default_controller_mode() -> Option<ControllerMode> {
    Some(ControllerMode::OscPose)
}

fn default_control_delta() -> bool {
    true
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            mode: default_controller_mode(),
            action_dim: None,
            control_delta: default_control_delta(),
            input_min: None,
            input_max: None,
            output_min: None,
            output_max: None,
            workspace: None,
        }
    }
}

impl ControllerConfig {
    /// Resolve the preset plus overrides into controller metadata.
    pub fn metadata(&self) -> Result<ControllerMetadata, ConfigError> {
        let mut meta = match (self.mode, self.action_dim) {
            (Some(mode), _) => ControllerMetadata::preset(mode),
            (None, Some(d)) => ControllerMetadata::undeclared(d),
            (None, None) => {
                return Err(ConfigError::Invalid(
                    "controller.action_dim is required when controller.mode is null".to_string(),
                ))
            }
        };
        if let Some(d) = self.action_dim {
            meta.action_dim = d;
        }
        meta.control_delta = self.control_delta;
        if self.input_min.is_some() {
            meta.input_min = self.input_min.clone();
        }
        if self.input_max.is_some() {
            meta.input_max = self.input_max.clone();
        }
        if self.output_min.is_some() {
            meta.output_min = self.output_min.clone();
        }
        if self.output_max.is_some() {
            meta.output_max = self.output_max.clone();
        }
        if self.workspace.is_some() {
            meta.workspace = self.workspace;
        }
        Ok(meta)
    }
}

/// Thresholds for the semantics heuristic. Best-effort diagnostics, not ground truth.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClassifierConfig {
    /// Two magnitudes are "comparable" when their ratio is within this factor either way.
    #[serde(default = "default_order_of_magnitude")]
    pub order_of_magnitude: f64,
    /// Both commanded and observed displacement must stay below this to look incremental.
    #[serde(default = "default_delta_limit")]
    pub delta_limit: f64,
    /// Commanded/observed ratio at or above which the command looks like a target.
    #[serde(default = "default_absolute_min_ratio")]
    pub absolute_min_ratio: f64,
    /// Magnitudes at or below this count as no motion.
    #[serde(default = "default_min_motion")]
    pub min_motion: f64,
    /// Fraction of excited joints that must agree in sign with the observed joint delta.
    #[serde(default = "default_sign_agreement")]
    pub sign_agreement: f64,
    /// Workspace used when the controller declares none.
    #[serde(default)]
    pub workspace: WorkspaceBounds,
}

fn default_order_of_magnitude() -> f64 {
    10.0
}

fn default_delta_limit() -> f64 {
    0.2
}

fn default_absolute_min_ratio() -> f64 {
    50.0
}

fn default_min_motion() -> f64 {
    1e-6
}

fn default_sign_agreement() -> f64 {
    0.8
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            order_of_magnitude: default_order_of_magnitude(),
            delta_limit: default_delta_limit(),
            absolute_min_ratio: default_absolute_min_ratio(),
            min_motion: default_min_motion(),
            sign_agreement: default_sign_agreement(),
            workspace: WorkspaceBounds::default(),
        }
    }
}

/// Names of the observation fields the probe snapshots.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservationKeys {
    #[serde(default = "default_eef_pos_key")]
    pub eef_pos: String,
    #[serde(default = "default_eef_quat_key")]
    pub eef_quat: String,
    #[serde(default = "default_joint_pos_key")]
    pub joint_pos: String,
    #[serde(default = "default_gripper_qpos_key")]
    pub gripper_qpos: String,
}

fn default_eef_pos_key() -> String {
    "robot0_eef_pos".to_string()
}

fn default_eef_quat_key() -> String {
    "robot0_eef_quat".to_string()
}

fn default_joint_pos_key() -> String {
    "robot0_joint_pos".to_string()
}

fn default_gripper_qpos_key() -> String {
    "robot0_gripper_qpos".to_string()
}

impl Default for ObservationKeys {
    fn default() -> Self {
        Self {
            eef_pos: default_eef_pos_key(),
            eef_quat: default_eef_quat_key(),
            joint_pos: default_joint_pos_key(),
            gripper_qpos: default_gripper_qpos_key(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Range checks that serde can't express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        // normalization
        let n = &self.normalization;
        if !(n.epsilon.is_finite() && n.epsilon > 0.0) {
            return invalid("normalization.epsilon must be finite and > 0");
        }
        if !(n.std_tolerance.is_finite() && n.std_tolerance >= 0.0) {
            return invalid("normalization.std_tolerance must be finite and >= 0");
        }
        // A tolerated negative std must not cancel epsilon in `std + epsilon`.
        if n.std_tolerance >= n.epsilon {
            return invalid("normalization.std_tolerance must be < normalization.epsilon");
        }

        // classifier
        let c = &self.classifier;
        if !(c.order_of_magnitude.is_finite() && c.order_of_magnitude > 1.0) {
            return invalid("classifier.order_of_magnitude must be finite and > 1");
        }
        if !(c.delta_limit.is_finite() && c.delta_limit > 0.0) {
            return invalid("classifier.delta_limit must be finite and > 0");
        }
        if !(c.absolute_min_ratio.is_finite() && c.absolute_min_ratio >= c.order_of_magnitude) {
            return invalid("classifier.absolute_min_ratio must be finite and >= order_of_magnitude");
        }
        if !(c.min_motion.is_finite() && c.min_motion >= 0.0) {
            return invalid("classifier.min_motion must be finite and >= 0");
        }
        if !(c.sign_agreement > 0.0 && c.sign_agreement <= 1.0) {
            return invalid("classifier.sign_agreement must be in (0,1]");
        }
        if !c.workspace.is_well_formed() {
            return invalid("classifier.workspace must have finite min <= max on every axis");
        }

        // controller
        let meta = self.controller.metadata()?;
        if meta.action_dim < 1 {
            return invalid("controller.action_dim must be >= 1");
        }
        if let (Some(mode), Some(d)) = (self.controller.mode, self.controller.action_dim) {
            if mode.action_dim() != d {
                return Err(ConfigError::Invalid(format!(
                    "controller.action_dim={d} does not match {mode} (expects {})",
                    mode.action_dim()
                )));
            }
        }
        for (name, bound) in [
            ("input_min", &meta.input_min),
            ("input_max", &meta.input_max),
            ("output_min", &meta.output_min),
            ("output_max", &meta.output_max),
        ] {
            if let Some(v) = bound {
                if v.len() != meta.control_dim() {
                    return Err(ConfigError::Invalid(format!(
                        "controller.{name} must have {} values (got {})",
                        meta.control_dim(),
                        v.len()
                    )));
                }
            }
        }
        if let Some(w) = meta.workspace {
            if !w.is_well_formed() {
                return invalid("controller.workspace must have finite min <= max on every axis");
            }
        }

        // observation
        let o = &self.observation;
        for (name, key) in [
            ("eef_pos", &o.eef_pos),
            ("eef_quat", &o.eef_quat),
            ("joint_pos", &o.joint_pos),
            ("gripper_qpos", &o.gripper_qpos),
        ] {
            if key.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "observation.{name} must be non-empty"
                )));
            }
        }
        Ok(())
    }
}
