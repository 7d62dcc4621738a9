//! The narrative oracle: renders a finished envelope to Markdown prose, and
//! fails loudly when a step's payload lacks data the prose needs.
//!
//! This is a completeness check rather than a user-facing feature. If a
//! field cannot be narrated it cannot be drawn either, so every renderer reads
//! its inputs through a [`FieldReader`], which never defaults: a missing field
//! is [`NarrativeError::MissingField`] naming the step index, step type, and
//! dotted field path; a field of the wrong JSON type is
//! [`NarrativeError::InvalidField`]. A present `null` is only accepted by the
//! explicit `nullable_*` accessors.
//!
//! Step types a narrator does not recognize get a minimal fallback line built
//! from the step's description. The summary section reads only the envelope's
//! `result` and aggregate metadata, and reports its own
//! [`NarrativeError::MissingSummaryField`] so a summary gap is never confused
//! with a per-step gap.
//!
//! The oracle is meant for tests and offline documentation builds, not for
//! live request handling.

use std::fmt::Write as _;
use std::ops::Deref;

use indexmap::IndexMap;
use serde_json::Value;
use thiserror::Error;

use crate::envelope::{Metadata, ResultEnvelope};
use crate::step::{Step, StepKind};

/// Instrumentation gaps found while narrating.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NarrativeError {
    /// A recognized step lacks a field its renderer needs.
    #[error("step {step_index} ({step_type}): missing field '{field}'")]
    MissingField {
        step_index: usize,
        step_type: String,
        field: String,
    },

    /// A recognized step has the field, but not with the expected JSON type.
    #[error("step {step_index} ({step_type}): field '{field}' is not {expected}")]
    InvalidField {
        step_index: usize,
        step_type: String,
        field: String,
        expected: &'static str,
    },

    /// The summary needs a result or metadata field that is absent.
    #[error("summary: missing field '{field}'")]
    MissingSummaryField { field: String },

    /// The summary field exists with the wrong JSON type.
    #[error("summary: field '{field}' is not {expected}")]
    InvalidSummaryField { field: String, expected: &'static str },

    /// No narrator is registered for the envelope's algorithm.
    #[error("no narrator registered for algorithm '{algorithm}'")]
    NoNarrator { algorithm: String },
}

#[derive(Debug, Clone, Copy)]
enum Scope<'a> {
    Step { index: usize, step_type: &'a str },
    Summary,
}

/// Strict accessor over a JSON payload.
///
/// Paths are dot-separated object keys, e.g. `"visualization.mid"`.
#[derive(Debug, Clone, Copy)]
pub struct FieldReader<'a> {
    root: &'a Value,
    scope: Scope<'a>,
}

impl<'a> FieldReader<'a> {
    fn missing(&self, field: &str) -> NarrativeError {
        match self.scope {
            Scope::Step { index, step_type } => NarrativeError::MissingField {
                step_index: index,
                step_type: step_type.to_string(),
                field: field.to_string(),
            },
            Scope::Summary => NarrativeError::MissingSummaryField {
                field: field.to_string(),
            },
        }
    }

    fn invalid(&self, field: &str, expected: &'static str) -> NarrativeError {
        match self.scope {
            Scope::Step { index, step_type } => NarrativeError::InvalidField {
                step_index: index,
                step_type: step_type.to_string(),
                field: field.to_string(),
                expected,
            },
            Scope::Summary => NarrativeError::InvalidSummaryField {
                field: field.to_string(),
                expected,
            },
        }
    }

    /// The raw value at `path`; absent keys are an error, `null` is not.
    pub fn value(&self, path: &str) -> Result<&'a Value, NarrativeError> {
        path.split('.')
            .try_fold(self.root, |node, key| node.as_object().and_then(|obj| obj.get(key)))
            .ok_or_else(|| self.missing(path))
    }

    pub fn u64(&self, path: &str) -> Result<u64, NarrativeError> {
        self.value(path)?
            .as_u64()
            .ok_or_else(|| self.invalid(path, "an unsigned integer"))
    }

    pub fn usize(&self, path: &str) -> Result<usize, NarrativeError> {
        self.u64(path).map(|v| v as usize)
    }

    pub fn i64(&self, path: &str) -> Result<i64, NarrativeError> {
        self.value(path)?
            .as_i64()
            .ok_or_else(|| self.invalid(path, "an integer"))
    }

    pub fn f64(&self, path: &str) -> Result<f64, NarrativeError> {
        self.value(path)?
            .as_f64()
            .ok_or_else(|| self.invalid(path, "a number"))
    }

    pub fn bool(&self, path: &str) -> Result<bool, NarrativeError> {
        self.value(path)?
            .as_bool()
            .ok_or_else(|| self.invalid(path, "a boolean"))
    }

    pub fn str(&self, path: &str) -> Result<&'a str, NarrativeError> {
        self.value(path)?
            .as_str()
            .ok_or_else(|| self.invalid(path, "a string"))
    }

    pub fn array(&self, path: &str) -> Result<&'a [Value], NarrativeError> {
        self.value(path)?
            .as_array()
            .map(Vec::as_slice)
            .ok_or_else(|| self.invalid(path, "an array"))
    }

    /// An array whose elements are all integers.
    pub fn i64s(&self, path: &str) -> Result<Vec<i64>, NarrativeError> {
        self.array(path)?
            .iter()
            .map(|v| v.as_i64().ok_or_else(|| self.invalid(path, "an array of integers")))
            .collect()
    }

    /// Element `index` of the integer array at `path`.
    pub fn i64_at(&self, path: &str, index: usize) -> Result<i64, NarrativeError> {
        self.array(path)?
            .get(index)
            .and_then(Value::as_i64)
            .ok_or_else(|| self.invalid(path, "an integer array covering the referenced index"))
    }

    /// Element `index` of the array at `path`, read as a position into
    /// another array; negative or fractional values are invalid.
    pub fn usize_at(&self, path: &str, index: usize) -> Result<usize, NarrativeError> {
        self.array(path)?
            .get(index)
            .and_then(Value::as_u64)
            .map(|v| v as usize)
            .ok_or_else(|| {
                self.invalid(path, "an unsigned integer array covering the referenced index")
            })
    }

    /// Element `index` of the array at `path`, itself a two-integer array
    /// such as an interval or an edge.
    pub fn i64_pair_at(&self, path: &str, index: usize) -> Result<(i64, i64), NarrativeError> {
        let pair = self
            .array(path)?
            .get(index)
            .and_then(Value::as_array)
            .filter(|pair| pair.len() == 2)
            .and_then(|pair| Some((pair[0].as_i64()?, pair[1].as_i64()?)));
        pair.ok_or_else(|| {
            self.invalid(path, "an array of integer pairs covering the referenced index")
        })
    }

    /// A field that must be present but may be `null`.
    pub fn nullable_i64(&self, path: &str) -> Result<Option<i64>, NarrativeError> {
        match self.value(path)? {
            Value::Null => Ok(None),
            v => v
                .as_i64()
                .map(Some)
                .ok_or_else(|| self.invalid(path, "an integer or null")),
        }
    }

    /// A field that must be present but may be `null`.
    pub fn nullable_f64(&self, path: &str) -> Result<Option<f64>, NarrativeError> {
        match self.value(path)? {
            Value::Null => Ok(None),
            v => v
                .as_f64()
                .map(Some)
                .ok_or_else(|| self.invalid(path, "a number or null")),
        }
    }
}

/// One step as seen by a narrator: identity plus a strict reader over `data`.
#[derive(Debug, Clone, Copy)]
pub struct StepView<'a> {
    step: &'a Step,
    data: FieldReader<'a>,
}

impl<'a> StepView<'a> {
    pub fn new(step: &'a Step) -> Self {
        StepView {
            step,
            data: FieldReader {
                root: step.data(),
                scope: Scope::Step {
                    index: step.ordinal(),
                    step_type: step.step_type(),
                },
            },
        }
    }

    pub fn index(&self) -> usize {
        self.step.ordinal()
    }

    pub fn step_type(&self) -> &'a str {
        self.step.step_type()
    }

    pub fn description(&self) -> &'a str {
        self.step.description()
    }

    pub fn kind<K: StepKind>(&self) -> Option<K> {
        self.step.kind()
    }
}

impl<'a> Deref for StepView<'a> {
    type Target = FieldReader<'a>;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

/// What a summary renderer may read: the result and aggregate metadata.
#[derive(Debug, Clone, Copy)]
pub struct SummaryView<'a> {
    /// Reader over `envelope.result`.
    pub result: FieldReader<'a>,
    /// Reader over the domain-specific metadata fields.
    pub extra: FieldReader<'a>,
    pub metadata: &'a Metadata,
    pub total_steps: usize,
}

/// Per-algorithm prose renderer.
pub trait StepNarrator: Send + Sync {
    /// The algorithm name this narrator handles.
    fn algorithm(&self) -> &'static str;

    /// Renders one step. Returns `Ok(None)` for step types outside this
    /// algorithm's vocabulary; the oracle then emits a fallback line.
    fn narrate_step(&self, step: &StepView<'_>) -> Result<Option<String>, NarrativeError>;

    /// Renders the closing summary.
    fn summarize(&self, summary: &SummaryView<'_>) -> Result<String, NarrativeError>;
}

/// Renders `envelope` with `narrator`.
///
/// Every step is rendered before the summary; the first gap aborts with its
/// error.
pub fn narrate(
    envelope: &ResultEnvelope,
    narrator: &dyn StepNarrator,
) -> Result<String, NarrativeError> {
    let metadata = &envelope.metadata;
    let mut out = String::new();
    let _ = writeln!(out, "# {}\n", metadata.display_name);
    let _ = writeln!(
        out,
        "Algorithm `{}` on an input of size {}: {} steps recorded.\n",
        metadata.algorithm, metadata.input_size, envelope.trace.total_steps
    );
    let _ = writeln!(out, "## Steps\n");

    for step in envelope.steps() {
        let view = StepView::new(step);
        let prose = match narrator.narrate_step(&view)? {
            Some(prose) => prose,
            None => format!(
                "{} _(no narrative renderer for `{}`)_",
                step.description(),
                step.step_type()
            ),
        };
        let _ = writeln!(out, "### Step {}: {}\n", step.ordinal(), step.step_type());
        let _ = writeln!(out, "{prose}\n");
    }

    let extra = Value::Object(metadata.extra.clone());
    let summary = SummaryView {
        result: FieldReader {
            root: &envelope.result,
            scope: Scope::Summary,
        },
        extra: FieldReader {
            root: &extra,
            scope: Scope::Summary,
        },
        metadata,
        total_steps: envelope.trace.total_steps,
    };
    let summary = narrator.summarize(&summary)?;
    let _ = writeln!(out, "## Summary\n");
    let _ = writeln!(out, "{summary}");
    Ok(out)
}

/// Narrators keyed by algorithm name.
#[derive(Default)]
pub struct NarrativeOracle {
    narrators: IndexMap<&'static str, Box<dyn StepNarrator>>,
}

impl NarrativeOracle {
    pub fn new() -> Self {
        NarrativeOracle::default()
    }

    /// Adds a narrator, replacing any previous one for the same algorithm.
    pub fn register(&mut self, narrator: Box<dyn StepNarrator>) {
        self.narrators.insert(narrator.algorithm(), narrator);
    }

    pub fn with(mut self, narrator: Box<dyn StepNarrator>) -> Self {
        self.register(narrator);
        self
    }

    pub fn supports(&self, algorithm: &str) -> bool {
        self.narrators.contains_key(algorithm)
    }

    /// Renders `envelope` with the narrator for `metadata.algorithm`.
    pub fn narrate(&self, envelope: &ResultEnvelope) -> Result<String, NarrativeError> {
        let algorithm = envelope.metadata.algorithm.as_str();
        let narrator = self
            .narrators
            .get(algorithm)
            .ok_or_else(|| NarrativeError::NoNarrator {
                algorithm: algorithm.to_string(),
            })?;
        narrate(envelope, narrator.as_ref()).inspect_err(|err| {
            tracing::warn!(algorithm, error = %err, "narrative completeness check failed");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::Trace;
    use serde_json::{json, Map};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Toy {
        Sample,
    }

    impl StepKind for Toy {
        const ALL: &'static [Self] = &[Toy::Sample];

        fn tag(self) -> &'static str {
            "SAMPLE"
        }
    }

    struct ToyNarrator;

    impl StepNarrator for ToyNarrator {
        fn algorithm(&self) -> &'static str {
            "toy"
        }

        fn narrate_step(&self, step: &StepView<'_>) -> Result<Option<String>, NarrativeError> {
            let Some(kind) = step.kind::<Toy>() else {
                return Ok(None);
            };
            match kind {
                Toy::Sample => {
                    let bound = step.nullable_f64("visualization.bound")?;
                    let value = step.i64("visualization.value")?;
                    Ok(Some(match bound {
                        Some(bound) => format!("Sample {value} against bound {bound}."),
                        None => format!("Sample {value}; no bound yet."),
                    }))
                }
            }
        }

        fn summarize(&self, summary: &SummaryView<'_>) -> Result<String, NarrativeError> {
            let answer = summary.result.i64("answer")?;
            let samples = summary.extra.u64("samples")?;
            Ok(format!("Answer {answer} after {samples} samples."))
        }
    }

    fn envelope(steps: Vec<Step>, result: Value) -> ResultEnvelope {
        let mut extra = Map::new();
        extra.insert("samples".into(), json!(steps.len()));
        ResultEnvelope {
            result,
            trace: Trace {
                total_steps: steps.len(),
                steps,
                duration: 1.0,
            },
            metadata: Metadata {
                algorithm: "toy".into(),
                display_name: "Toy".into(),
                visualization_type: "array".into(),
                input_size: 2,
                prediction_points: Vec::new(),
                extra,
            },
        }
    }

    fn sample(ordinal: usize, visualization: Value) -> Step {
        Step::new(
            ordinal,
            "SAMPLE",
            0.0,
            json!({ "visualization": visualization }),
            "sample".into(),
        )
    }

    // -----------------------------------------------------------------------
    // Field access
    // -----------------------------------------------------------------------

    #[test]
    fn reader_distinguishes_missing_null_and_wrong_type() {
        let step = sample(4, json!({"bound": null, "value": "seven"}));
        let view = StepView::new(&step);

        assert_eq!(view.nullable_f64("visualization.bound").unwrap(), None);
        assert_eq!(
            view.i64("visualization.value"),
            Err(NarrativeError::InvalidField {
                step_index: 4,
                step_type: "SAMPLE".into(),
                field: "visualization.value".into(),
                expected: "an integer",
            })
        );
        assert_eq!(
            view.i64("visualization.absent"),
            Err(NarrativeError::MissingField {
                step_index: 4,
                step_type: "SAMPLE".into(),
                field: "visualization.absent".into(),
            })
        );
        // A null where a value is required is not silently accepted either.
        assert!(matches!(
            view.f64("visualization.bound"),
            Err(NarrativeError::InvalidField { .. })
        ));
    }

    #[test]
    fn reader_indexes_arrays_strictly() {
        let step = sample(0, json!({"array": [3, 1, 2]}));
        let view = StepView::new(&step);
        assert_eq!(view.i64s("visualization.array").unwrap(), vec![3, 1, 2]);
        assert_eq!(view.i64_at("visualization.array", 1).unwrap(), 1);
        assert!(view.i64_at("visualization.array", 3).is_err());
    }

    #[test]
    fn reader_rejects_negative_positions() {
        let step = sample(2, json!({"comparing": [-1, 0]}));
        let view = StepView::new(&step);
        assert_eq!(view.usize_at("visualization.comparing", 1).unwrap(), 0);
        assert_eq!(
            view.usize_at("visualization.comparing", 0),
            Err(NarrativeError::InvalidField {
                step_index: 2,
                step_type: "SAMPLE".into(),
                field: "visualization.comparing".into(),
                expected: "an unsigned integer array covering the referenced index",
            })
        );
    }

    #[test]
    fn reader_reads_integer_pairs() {
        let step = sample(0, json!({"intervals": [[1, 4], [2, "x"], [5]]}));
        let view = StepView::new(&step);
        assert_eq!(view.i64_pair_at("visualization.intervals", 0).unwrap(), (1, 4));
        assert!(view.i64_pair_at("visualization.intervals", 1).is_err());
        assert!(view.i64_pair_at("visualization.intervals", 2).is_err());
        assert!(view.i64_pair_at("visualization.intervals", 3).is_err());
    }

    // -----------------------------------------------------------------------
    // Narration
    // -----------------------------------------------------------------------

    #[test]
    fn narrates_steps_then_summary() {
        let env = envelope(
            vec![
                sample(0, json!({"bound": null, "value": 3})),
                sample(1, json!({"bound": 3.0, "value": 5})),
            ],
            json!({"answer": 5}),
        );
        let text = narrate(&env, &ToyNarrator).unwrap();
        assert!(text.starts_with("# Toy\n"));
        assert!(text.contains("### Step 0: SAMPLE\n\nSample 3; no bound yet."));
        assert!(text.contains("### Step 1: SAMPLE\n\nSample 5 against bound 3."));
        assert!(text.ends_with("## Summary\n\nAnswer 5 after 2 samples.\n"));
    }

    #[test]
    fn missing_step_field_names_field_and_index() {
        let env = envelope(
            vec![
                sample(0, json!({"bound": null, "value": 3})),
                sample(1, json!({"value": 5})),
            ],
            json!({"answer": 5}),
        );
        assert_eq!(
            narrate(&env, &ToyNarrator),
            Err(NarrativeError::MissingField {
                step_index: 1,
                step_type: "SAMPLE".into(),
                field: "visualization.bound".into(),
            })
        );
    }

    #[test]
    fn unknown_step_type_falls_back() {
        let unknown = Step::new(0, "MYSTERY", 0.0, json!({}), "Something happened".into());
        let env = envelope(vec![unknown], json!({"answer": 1}));
        let text = narrate(&env, &ToyNarrator).unwrap();
        assert!(text.contains("Something happened _(no narrative renderer for `MYSTERY`)_"));
    }

    #[test]
    fn summary_gap_is_distinguishable() {
        let env = envelope(vec![sample(0, json!({"bound": 1.5, "value": 2}))], json!({}));
        assert_eq!(
            narrate(&env, &ToyNarrator),
            Err(NarrativeError::MissingSummaryField {
                field: "answer".into()
            })
        );
    }

    #[test]
    fn oracle_dispatches_on_algorithm() {
        let oracle = NarrativeOracle::new().with(Box::new(ToyNarrator));
        assert!(oracle.supports("toy"));

        let env = envelope(
            vec![sample(0, json!({"bound": null, "value": 1}))],
            json!({"answer": 1}),
        );
        assert!(oracle.narrate(&env).is_ok());

        let mut other = env.clone();
        other.metadata.algorithm = "unknown".into();
        assert_eq!(
            oracle.narrate(&other),
            Err(NarrativeError::NoNarrator {
                algorithm: "unknown".into()
            })
        );
    }
}
