//! The standardized result envelope returned by every run.
//!
//! ```text
//! { result, trace: { steps, total_steps, duration },
//!   metadata: { algorithm, display_name, visualization_type, input_size,
//!               prediction_points, ...domain fields } }
//! ```
//!
//! Envelopes are built once per run by
//! [`StepRecorder::finish`](crate::recorder::StepRecorder::finish).
//! [`ResultEnvelope::validate`] re-checks every structural invariant and is
//! used by the completeness harness and the tests.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::prediction::{PredictionError, PredictionPoint};
use crate::step::Step;

/// The complete output of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    /// Algorithm-specific output value.
    pub result: Value,
    pub trace: Trace,
    pub metadata: Metadata,
}

/// The recorded step sequence plus aggregate timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub steps: Vec<Step>,
    pub total_steps: usize,
    /// Seconds from recorder construction to `finish`.
    pub duration: f64,
}

/// Keys of the fixed [`Metadata`] fields; `extra` never holds them.
pub const RESERVED_METADATA_KEYS: &[&str] = &[
    "algorithm",
    "display_name",
    "visualization_type",
    "input_size",
    "prediction_points",
];

/// Run metadata: fixed descriptor fields plus domain-specific extras.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub algorithm: String,
    pub display_name: String,
    pub visualization_type: String,
    pub input_size: usize,
    pub prediction_points: Vec<PredictionPoint>,
    /// Domain fields (comparison counts and the like), flattened into the
    /// metadata object on the wire.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A violated envelope invariant.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnvelopeError {
    #[error("total_steps is {total_steps} but the trace holds {actual} steps")]
    StepCountMismatch { total_steps: usize, actual: usize },

    #[error("step at position {position} carries ordinal {ordinal}")]
    OrdinalMismatch { position: usize, ordinal: usize },

    #[error("step {ordinal} timestamp {timestamp} precedes the previous step's {previous}")]
    TimestampRegression {
        ordinal: usize,
        timestamp: f64,
        previous: f64,
    },

    #[error("duration {duration} is shorter than the last step timestamp {last_timestamp}")]
    DurationTooShort { duration: f64, last_timestamp: f64 },

    #[error(transparent)]
    Prediction(#[from] PredictionError),
}

impl ResultEnvelope {
    /// The recorded steps.
    pub fn steps(&self) -> &[Step] {
        &self.trace.steps
    }

    pub fn prediction_points(&self) -> &[PredictionPoint] {
        &self.metadata.prediction_points
    }

    /// Checks every structural invariant, returning the first violation.
    pub fn validate(&self) -> Result<(), EnvelopeError> {
        let steps = &self.trace.steps;
        if self.trace.total_steps != steps.len() {
            return Err(EnvelopeError::StepCountMismatch {
                total_steps: self.trace.total_steps,
                actual: steps.len(),
            });
        }

        let mut previous = 0.0_f64;
        for (position, step) in steps.iter().enumerate() {
            if step.ordinal() != position {
                return Err(EnvelopeError::OrdinalMismatch {
                    position,
                    ordinal: step.ordinal(),
                });
            }
            if step.timestamp() < previous {
                return Err(EnvelopeError::TimestampRegression {
                    ordinal: step.ordinal(),
                    timestamp: step.timestamp(),
                    previous,
                });
            }
            previous = step.timestamp();
        }

        if let Some(last) = steps.last() {
            if self.trace.duration < last.timestamp() {
                return Err(EnvelopeError::DurationTooShort {
                    duration: self.trace.duration,
                    last_timestamp: last.timestamp(),
                });
            }
        }

        for point in &self.metadata.prediction_points {
            point.validate(steps.len())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(ordinals: &[usize], timestamps: &[f64], duration: f64) -> ResultEnvelope {
        let steps = ordinals
            .iter()
            .zip(timestamps)
            .map(|(&o, &t)| Step::new(o, "TICK", t, json!({}), "tick".into()))
            .collect::<Vec<_>>();
        ResultEnvelope {
            result: json!(null),
            trace: Trace {
                total_steps: steps.len(),
                steps,
                duration,
            },
            metadata: Metadata {
                algorithm: "toy".into(),
                display_name: "Toy".into(),
                visualization_type: "array".into(),
                input_size: 0,
                prediction_points: Vec::new(),
                extra: Map::new(),
            },
        }
    }

    #[test]
    fn well_formed_envelope_validates() {
        let env = envelope(&[0, 1, 2], &[0.0, 0.1, 0.1], 0.2);
        assert!(env.validate().is_ok());
    }

    #[test]
    fn empty_trace_validates() {
        let env = envelope(&[], &[], 0.0);
        assert!(env.validate().is_ok());
    }

    #[test]
    fn detects_count_mismatch() {
        let mut env = envelope(&[0, 1], &[0.0, 0.1], 0.2);
        env.trace.total_steps = 3;
        assert_eq!(
            env.validate(),
            Err(EnvelopeError::StepCountMismatch {
                total_steps: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn detects_ordinal_gap() {
        let env = envelope(&[0, 2], &[0.0, 0.1], 0.2);
        assert_eq!(
            env.validate(),
            Err(EnvelopeError::OrdinalMismatch {
                position: 1,
                ordinal: 2
            })
        );
    }

    #[test]
    fn detects_timestamp_regression_and_short_duration() {
        let env = envelope(&[0, 1], &[0.2, 0.1], 0.3);
        assert!(matches!(
            env.validate(),
            Err(EnvelopeError::TimestampRegression { ordinal: 1, .. })
        ));

        let env = envelope(&[0, 1], &[0.1, 0.2], 0.15);
        assert!(matches!(
            env.validate(),
            Err(EnvelopeError::DurationTooShort { .. })
        ));
    }

    #[test]
    fn detects_prediction_out_of_range() {
        let mut env = envelope(&[0], &[0.0], 0.1);
        env.metadata.prediction_points.push(
            PredictionPoint::builder(4, "?")
                .choice("a", "A")
                .choice("b", "B")
                .answer("a")
                .build()
                .unwrap(),
        );
        assert!(matches!(
            env.validate(),
            Err(EnvelopeError::Prediction(PredictionError::StepOutOfRange { .. }))
        ));
    }

    #[test]
    fn metadata_extras_are_flattened() {
        let mut env = envelope(&[0], &[0.0], 0.1);
        env.metadata.extra.insert("comparisons".into(), json!(4));
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["metadata"]["comparisons"], 4);
        assert_eq!(json["metadata"]["algorithm"], "toy");
        assert_eq!(json["trace"]["total_steps"], 1);

        let back: ResultEnvelope = serde_json::from_value(json).unwrap();
        assert_eq!(back.metadata.extra.get("comparisons"), Some(&json!(4)));
    }
}
