//! End-to-end contract check: normalized policy output -> raw action -> one probe step -> verdict.

use ac_core::{Config, ConfigError, ControllerMetadata, NormalizedAction, RawAction};
use ac_norm::{NormalizeError, Normalizer, StatisticsModel};
use ac_probe::{ActuationInterface, ActuationProbe, InitialState, ProbeError, ProbeRecord};
use serde::Serialize;
use thiserror::Error;

use crate::classifier::{ClassifyError, SemanticsClassifier};
use crate::verdict::SemanticsVerdict;

#[derive(Debug, Error)]
pub enum ContractError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("statistics for '{signal}' have {actual} dims, controller expects {expected}")]
    StatsDimension {
        signal: String,
        expected: usize,
        actual: usize,
    },
    #[error("normalize: {0}")]
    Normalize(#[from] NormalizeError),
    #[error("probe: {0}")]
    Probe(#[from] ProbeError),
    #[error("classify: {0}")]
    Classify(#[from] ClassifyError),
}

/// Everything one contract check produced.
#[derive(Debug, Clone, Serialize)]
pub struct ContractReport {
    pub normalized: NormalizedAction,
    pub raw: RawAction,
    pub record: ProbeRecord,
    pub verdict: SemanticsVerdict,
}

/// Wires the normalizer, the probe and the classifier for one controller.
#[derive(Debug, Clone)]
pub struct ContractChecker {
    normalizer: Normalizer,
    metadata: ControllerMetadata,
    probe: ActuationProbe,
    classifier: SemanticsClassifier,
}

impl ContractChecker {
    pub fn new(
        normalizer: Normalizer,
        metadata: ControllerMetadata,
        probe: ActuationProbe,
        classifier: SemanticsClassifier,
    ) -> Result<Self, ContractError> {
        let stats = normalizer.stats();
        if stats.dimension_count() != metadata.action_dim {
            return Err(ContractError::StatsDimension {
                signal: stats.name().to_string(),
                expected: metadata.action_dim,
                actual: stats.dimension_count(),
            });
        }
        let probe = probe.with_action_dim(metadata.action_dim);
        Ok(Self {
            normalizer,
            metadata,
            probe,
            classifier,
        })
    }

    pub fn from_config(cfg: &Config, stats: StatisticsModel) -> Result<Self, ContractError> {
        cfg.validate()?;
        let metadata = cfg.controller.metadata()?;
        Self::new(
            Normalizer::from_config(stats, &cfg.normalization)?,
            metadata,
            ActuationProbe::new(cfg.observation.clone()),
            SemanticsClassifier::new(cfg.classifier.clone()),
        )
    }

    pub fn metadata(&self) -> &ControllerMetadata {
        &self.metadata
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Denormalize, execute one step on `interface`, classify.
    ///
    /// The interface is consumed and closed before classification starts.
    pub fn check<I: ActuationInterface>(
        &self,
        interface: I,
        action: &NormalizedAction,
        initial: &InitialState,
    ) -> Result<ContractReport, ContractError> {
        let raw = self.normalizer.denormalize(action)?;
        let record = self.probe.probe(interface, &raw, initial)?;
        let verdict = self.classifier.classify_record(&self.metadata, &record)?;
        Ok(ContractReport {
            normalized: action.clone(),
            raw,
            record,
            verdict,
        })
    }
}

/// One-shot [`ContractChecker::from_config`] + [`ContractChecker::check`].
pub fn check_contract<I: ActuationInterface>(
    cfg: &Config,
    stats: StatisticsModel,
    interface: I,
    action: &NormalizedAction,
    initial: &InitialState,
) -> Result<ContractReport, ContractError> {
    ContractChecker::from_config(cfg, stats)?.check(interface, action, initial)
}
