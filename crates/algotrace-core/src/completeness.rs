//! Narrative-completeness harness.
//!
//! Runs every example input of every registered algorithm, validates the
//! resulting envelope, and narrates it. Failures are collected rather than
//! short-circuited so one report covers the whole catalogue.

use std::fmt;

use crate::envelope::EnvelopeError;
use crate::error::RunError;
use crate::narrative::{NarrativeError, NarrativeOracle};
use crate::recorder::TracerConfig;
use crate::registry::AlgorithmRegistry;

/// Why one example failed the check.
#[derive(Debug, Clone, PartialEq)]
pub enum FailureKind {
    /// The example could not be run at all.
    Run(RunError),
    /// The envelope broke a structural invariant.
    Envelope(EnvelopeError),
    /// The narrative oracle found an instrumentation gap.
    Narrative(NarrativeError),
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Run(e) => write!(f, "run failed: {e}"),
            FailureKind::Envelope(e) => write!(f, "invalid envelope: {e}"),
            FailureKind::Narrative(e) => write!(f, "narrative incomplete: {e}"),
        }
    }
}

/// One failing example.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletenessFailure {
    pub algorithm: String,
    pub example_index: usize,
    pub kind: FailureKind,
}

/// Outcome of [`check_completeness`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletenessReport {
    /// Examples that were run.
    pub checked: usize,
    pub failures: Vec<CompletenessFailure>,
}

impl CompletenessReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Checks every example input of every registered algorithm.
pub fn check_completeness(
    registry: &AlgorithmRegistry,
    oracle: &NarrativeOracle,
    config: &TracerConfig,
) -> CompletenessReport {
    let mut report = CompletenessReport::default();

    for listing in registry.list_all() {
        for (example_index, input) in listing.example_inputs.iter().enumerate() {
            report.checked += 1;
            let outcome = registry
                .run(&listing.name, input, config)
                .map_err(FailureKind::Run)
                .and_then(|env| {
                    env.validate().map_err(FailureKind::Envelope)?;
                    oracle.narrate(&env).map_err(FailureKind::Narrative)
                });

            if let Err(kind) = outcome {
                tracing::warn!(
                    algorithm = %listing.name,
                    example_index,
                    failure = %kind,
                    "completeness check failed"
                );
                report.failures.push(CompletenessFailure {
                    algorithm: listing.name.clone(),
                    example_index,
                    kind,
                });
            }
        }
    }

    tracing::debug!(
        checked = report.checked,
        failures = report.failures.len(),
        "completeness check finished"
    );
    report
}
