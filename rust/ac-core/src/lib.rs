//! ac-core: Action vectors, controller metadata, and configuration.

pub mod action;
pub mod config;
pub mod controller;

pub use action::{l2_norm, ActionLayout, ActionParts, NormalizedAction, RawAction};
pub use config::{
    ClassifierConfig, Config, ConfigError, ControllerConfig, NormalizationConfig,
    NormalizationMode, ObservationKeys,
};
pub use controller::{ControllerMetadata, ControllerMode, WorkspaceBounds};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
