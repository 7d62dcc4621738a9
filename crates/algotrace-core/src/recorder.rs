//! The step recorder: one instance per algorithm run.
//!
//! [`StepRecorder`] accumulates [`Step`]s in an append-only vector, enforces
//! the step budget from [`TracerConfig`], and assembles the
//! [`ResultEnvelope`] when the run finishes. The state transitions are
//! `new -> record* -> finish`; `finish` consumes the recorder, so a run can
//! only be finished once and a recorder is never reused across runs.
//!
//! Domain logic implements [`TracedAlgorithm`] and drives a fresh recorder
//! from inside `run`. Each `record` call receives an explicit snapshot of the
//! state to render, so later mutation of the algorithm's working state cannot
//! alter a step that was already recorded.

use std::time::Instant;

use serde_json::{Map, Value};

use crate::envelope::{Metadata, ResultEnvelope, Trace, RESERVED_METADATA_KEYS};
use crate::error::TraceError;
use crate::prediction::PredictionExtractor;
use crate::step::{Step, StepKind};

/// Default step ceiling for a single run.
pub const DEFAULT_MAX_STEPS: usize = 10_000;

/// Configuration for a recorder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracerConfig {
    /// Hard ceiling on recorded steps. Exceeding it aborts the run with
    /// [`TraceError::ResourceExceeded`]. Default: 10,000.
    pub max_steps: usize,
}

impl Default for TracerConfig {
    fn default() -> Self {
        TracerConfig {
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

/// Static descriptor of an algorithm, copied into every envelope's metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlgorithmInfo {
    /// Stable identifier, also the registry key.
    pub name: &'static str,
    pub display_name: &'static str,
    /// Which front-end renderer draws the visualization snapshots.
    pub visualization_type: &'static str,
}

/// The capability every instrumented algorithm provides.
///
/// `run` validates the input, drives a fresh [`StepRecorder`], and returns
/// the finished envelope. Prediction extraction comes from the
/// [`PredictionExtractor`] supertrait and is invoked by
/// [`StepRecorder::finish`].
pub trait TracedAlgorithm: PredictionExtractor + Send + Sync {
    fn info(&self) -> AlgorithmInfo;

    fn run(&self, input: &Value) -> Result<ResultEnvelope, TraceError>;
}

/// Accumulates the steps of one run.
#[derive(Debug)]
pub struct StepRecorder {
    info: AlgorithmInfo,
    config: TracerConfig,
    steps: Vec<Step>,
    start: Instant,
    input_size: usize,
    metadata: Map<String, Value>,
}

impl StepRecorder {
    /// Starts a run: empty step sequence, fresh start time, no metadata.
    pub fn new(info: AlgorithmInfo, config: TracerConfig) -> Self {
        StepRecorder {
            info,
            config,
            steps: Vec::new(),
            start: Instant::now(),
            input_size: 0,
            metadata: Map::new(),
        }
    }

    /// Appends one step and returns its ordinal.
    ///
    /// `data` should be a JSON object, conventionally with a `visualization`
    /// snapshot inside. Values without a JSON representation must already
    /// have gone through [`sanitize`](crate::sanitize::sanitize).
    ///
    /// Fails with [`TraceError::ResourceExceeded`] once the configured number
    /// of steps has been recorded; nothing is appended in that case.
    pub fn record<K: StepKind>(
        &mut self,
        kind: K,
        data: Value,
        description: impl Into<String>,
    ) -> Result<usize, TraceError> {
        if self.steps.len() >= self.config.max_steps {
            tracing::warn!(
                algorithm = self.info.name,
                limit = self.config.max_steps,
                "step budget exhausted, aborting run"
            );
            return Err(TraceError::ResourceExceeded {
                limit: self.config.max_steps,
            });
        }
        debug_assert!(data.is_object(), "step payloads must be JSON objects");

        let ordinal = self.steps.len();
        let timestamp = self.start.elapsed().as_secs_f64();
        self.steps
            .push(Step::new(ordinal, kind.tag(), timestamp, data, description.into()));
        Ok(ordinal)
    }

    /// Records the size of the input, reported as `metadata.input_size`.
    pub fn set_input_size(&mut self, input_size: usize) {
        self.input_size = input_size;
    }

    /// Adds a domain-specific metadata field, replacing any previous value.
    ///
    /// Keys in [`RESERVED_METADATA_KEYS`] belong to the fixed metadata fields
    /// and are ignored with a warning; flattened into the envelope they would
    /// produce duplicate JSON keys.
    pub fn annotate(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if RESERVED_METADATA_KEYS.contains(&key.as_str()) {
            tracing::warn!(
                algorithm = self.info.name,
                key = %key,
                "ignoring metadata annotation that shadows a reserved field"
            );
            return;
        }
        self.metadata.insert(key, value);
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Ends the run and builds the envelope.
    ///
    /// Measures the duration, asks `extractor` for prediction points over the
    /// finished trace, and stores them under `metadata.prediction_points`.
    pub fn finish<E: PredictionExtractor + ?Sized>(
        self,
        result: Value,
        extractor: &E,
    ) -> ResultEnvelope {
        let duration = self.start.elapsed().as_secs_f64();
        let prediction_points = extractor.predictions(&self.steps);
        tracing::debug!(
            algorithm = self.info.name,
            steps = self.steps.len(),
            predictions = prediction_points.len(),
            duration,
            "run finished"
        );

        ResultEnvelope {
            result,
            trace: Trace {
                total_steps: self.steps.len(),
                steps: self.steps,
                duration,
            },
            metadata: Metadata {
                algorithm: self.info.name.to_string(),
                display_name: self.info.display_name.to_string(),
                visualization_type: self.info.visualization_type.to_string(),
                input_size: self.input_size,
                prediction_points,
                extra: self.metadata,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prediction::PredictionPoint;
    use proptest::prelude::*;
    use serde_json::json;

    const INFO: AlgorithmInfo = AlgorithmInfo {
        name: "counter",
        display_name: "Counter",
        visualization_type: "array",
    };

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Tick {
        Tick,
        Done,
    }

    impl StepKind for Tick {
        const ALL: &'static [Self] = &[Tick::Tick, Tick::Done];

        fn tag(self) -> &'static str {
            match self {
                Tick::Tick => "TICK",
                Tick::Done => "DONE",
            }
        }
    }

    /// Emits `input.count` TICK steps followed by one DONE step, and asks one
    /// question at the first step.
    struct Counter {
        config: TracerConfig,
    }

    impl PredictionExtractor for Counter {
        fn predictions(&self, steps: &[Step]) -> Vec<PredictionPoint> {
            steps
                .first()
                .and_then(|first| {
                    let more = steps.len() > 1 && steps[1].is(Tick::Tick);
                    PredictionPoint::builder(first.ordinal(), "Does counting continue?")
                        .choice("yes", "Yes")
                        .choice("no", "No")
                        .answer(if more { "yes" } else { "no" })
                        .build()
                        .ok()
                })
                .into_iter()
                .collect()
        }
    }

    impl TracedAlgorithm for Counter {
        fn info(&self) -> AlgorithmInfo {
            INFO
        }

        fn run(&self, input: &Value) -> Result<ResultEnvelope, TraceError> {
            let count = input["count"]
                .as_u64()
                .ok_or_else(|| TraceError::invalid_input("count must be a non-negative integer"))?;
            let mut recorder = StepRecorder::new(self.info(), self.config.clone());
            recorder.set_input_size(count as usize);
            for i in 0..count {
                recorder.record(
                    Tick::Tick,
                    json!({"visualization": {"i": i}}),
                    format!("tick {i}"),
                )?;
            }
            recorder.record(Tick::Done, json!({"visualization": {}}), "done")?;
            recorder.annotate("ticks", json!(count));
            Ok(recorder.finish(json!({"count": count}), self))
        }
    }

    fn counter() -> Counter {
        Counter {
            config: TracerConfig::default(),
        }
    }

    // -----------------------------------------------------------------------
    // Recording
    // -----------------------------------------------------------------------

    #[test]
    fn default_config() {
        assert_eq!(TracerConfig::default().max_steps, 10_000);
    }

    #[test]
    fn new_recorder_is_empty() {
        let recorder = StepRecorder::new(INFO, TracerConfig::default());
        assert!(recorder.steps().is_empty());
    }

    #[test]
    fn record_assigns_sequential_ordinals() {
        let mut recorder = StepRecorder::new(INFO, TracerConfig::default());
        assert_eq!(recorder.record(Tick::Tick, json!({}), "a").unwrap(), 0);
        assert_eq!(recorder.record(Tick::Tick, json!({}), "b").unwrap(), 1);
        assert_eq!(recorder.record(Tick::Done, json!({}), "c").unwrap(), 2);
        let tags: Vec<&str> = recorder.steps().iter().map(Step::step_type).collect();
        assert_eq!(tags, ["TICK", "TICK", "DONE"]);
    }

    #[test]
    fn budget_is_a_hard_ceiling() {
        let mut recorder = StepRecorder::new(INFO, TracerConfig { max_steps: 2 });
        recorder.record(Tick::Tick, json!({}), "a").unwrap();
        recorder.record(Tick::Tick, json!({}), "b").unwrap();
        let err = recorder.record(Tick::Tick, json!({}), "c").unwrap_err();
        assert_eq!(err, TraceError::ResourceExceeded { limit: 2 });
        assert_eq!(recorder.steps().len(), 2);
    }

    // -----------------------------------------------------------------------
    // Finishing
    // -----------------------------------------------------------------------

    #[test]
    fn finish_builds_a_valid_envelope() {
        let env = counter().run(&json!({"count": 3})).unwrap();
        assert_eq!(env.trace.total_steps, 4);
        assert_eq!(env.result, json!({"count": 3}));
        assert_eq!(env.metadata.algorithm, "counter");
        assert_eq!(env.metadata.display_name, "Counter");
        assert_eq!(env.metadata.visualization_type, "array");
        assert_eq!(env.metadata.input_size, 3);
        assert_eq!(env.metadata.extra.get("ticks"), Some(&json!(3)));
        assert_eq!(env.prediction_points().len(), 1);
        assert!(env.prediction_points()[0].is_correct("yes"));
        env.validate().unwrap();
    }

    #[test]
    fn annotations_cannot_shadow_fixed_metadata() {
        let mut recorder = StepRecorder::new(INFO, TracerConfig::default());
        recorder.record(Tick::Done, json!({}), "done").unwrap();
        recorder.annotate("algorithm", json!("impostor"));
        recorder.annotate("prediction_points", json!([]));
        recorder.annotate("ticks", json!(0));
        let env = recorder.finish(json!(null), &counter());

        assert_eq!(env.metadata.algorithm, "counter");
        assert!(!env.metadata.extra.contains_key("algorithm"));
        assert!(!env.metadata.extra.contains_key("prediction_points"));
        assert_eq!(env.metadata.extra.get("ticks"), Some(&json!(0)));

        let text = serde_json::to_string(&env.metadata).unwrap();
        assert_eq!(text.matches("\"algorithm\"").count(), 1);
        assert_eq!(text.matches("\"prediction_points\"").count(), 1);
    }

    #[test]
    fn ten_thousand_and_one_steps_abort_the_run() {
        // 10,000 TICKs fit exactly; the DONE step is the 10,001st.
        let err = counter().run(&json!({"count": 10_000})).unwrap_err();
        assert_eq!(err, TraceError::ResourceExceeded { limit: 10_000 });
    }

    #[test]
    fn exactly_the_budget_succeeds() {
        let env = counter().run(&json!({"count": 9_999})).unwrap();
        assert_eq!(env.trace.total_steps, 10_000);
    }

    #[test]
    fn domain_validation_errors_pass_through_unchanged() {
        let err = counter().run(&json!({"count": "lots"})).unwrap_err();
        assert_eq!(
            err,
            TraceError::invalid_input("count must be a non-negative integer")
        );
    }

    proptest! {
        #[test]
        fn ordinals_and_timestamps_hold(count in 0u64..300) {
            let env = counter().run(&json!({"count": count})).unwrap();
            let steps = env.steps();
            prop_assert_eq!(env.trace.total_steps, steps.len());
            for (i, step) in steps.iter().enumerate() {
                prop_assert_eq!(step.ordinal(), i);
            }
            for pair in steps.windows(2) {
                prop_assert!(pair[0].timestamp() <= pair[1].timestamp());
            }
            if let Some(last) = steps.last() {
                prop_assert!(env.trace.duration >= last.timestamp());
            }
        }
    }
}
