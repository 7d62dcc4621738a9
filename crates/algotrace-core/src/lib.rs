//! Execution-trace framework for instrumented teaching algorithms.
//!
//! Every algorithm run produces a replayable, JSON-serializable
//! [`ResultEnvelope`]: the recorded [`Step`]s, timing, metadata, and
//! auto-generated [`PredictionPoint`] quiz items. The [`AlgorithmRegistry`]
//! maps names to algorithm factories, and the [`NarrativeOracle`] renders an
//! envelope to prose while failing loudly on incomplete step payloads.
//!
//! Everything here is synchronous and single-run: one fresh
//! [`StepRecorder`] per run, no shared mutable state between runs, and a
//! registry that is read-only once populated.

pub mod completeness;
pub mod envelope;
pub mod error;
pub mod narrative;
pub mod prediction;
pub mod recorder;
pub mod registry;
pub mod sanitize;
pub mod step;

// Re-export commonly used types
pub use completeness::{check_completeness, CompletenessReport};
pub use envelope::{EnvelopeError, Metadata, ResultEnvelope, Trace, RESERVED_METADATA_KEYS};
pub use error::{RegistryError, RunError, TraceError};
pub use narrative::{narrate, NarrativeError, NarrativeOracle, StepNarrator, StepView, SummaryView};
pub use prediction::{Choice, PredictionError, PredictionExtractor, PredictionPoint};
pub use recorder::{AlgorithmInfo, StepRecorder, TracedAlgorithm, TracerConfig, DEFAULT_MAX_STEPS};
pub use registry::{AlgorithmRegistry, RegistryEntry, RegistryListing, TracerFactory};
pub use sanitize::sanitize;
pub use step::{Step, StepKind};
