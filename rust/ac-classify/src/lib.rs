//! ac-classify: Decide whether an actuation interface treats commands as increments or targets.
//!
//! Pure functions over a probe record plus the controller's declared metadata. The verdict is
//! advisory: it reports what the evidence looks like and flags disagreement with the declared
//! controller, it never asserts which interpretation is correct.

pub mod classifier;
pub mod pipeline;
pub mod range;
pub mod verdict;

pub use classifier::{ClassifyError, SemanticsClassifier};
pub use pipeline::{check_contract, ContractChecker, ContractError, ContractReport};
pub use range::{analyze_action_ranges, hint_for_values, DimRange, RangeHint, RangeReport};
pub use verdict::{Evidence, Inconclusive, Semantics, SemanticsVerdict, Verdict};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");


#[cfg(test)]
mod pipeline_tests;
