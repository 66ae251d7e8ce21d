//! ac-probe: Empirical single-step characterization of an actuation interface.
//!
//! The probe is the only stateful component of the checker. It is deliberately
//! semantics-agnostic: it executes exactly one raw action and reports what changed.
//! Interpreting the change is `ac-classify`'s job.

pub mod fake;
pub mod interface;
pub mod observation;
pub mod probe;

pub use fake::{CallCounts, FakeError, FakeInterface, FakeResponse};
pub use interface::{ActuationInterface, InitialState, Observation, StepOutcome};
pub use observation::{ObservationError, ObservationSnapshot, SnapshotDelta};
pub use probe::{ActuationProbe, BoxError, ProbeError, ProbePhase, ProbeRecord};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");


#[cfg(test)]
mod probe_tests;
