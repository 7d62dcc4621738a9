//! The atomic unit of an execution trace.
//!
//! A [`Step`] is created exactly once by
//! [`StepRecorder::record`](crate::recorder::StepRecorder::record) and never
//! mutated afterwards: its fields are private and only exposed through
//! accessors. The ordinal and timestamp are assigned by the recorder, never by
//! the caller.
//!
//! Each algorithm describes its event vocabulary as a closed enum implementing
//! [`StepKind`]. The recorded step stores the kind's tag string so the trace
//! stays JSON-serializable, and consumers turn it back into the enum with
//! [`Step::kind`] to match exhaustively.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A closed, enumerable set of step types for one algorithm.
///
/// Implementors are plain fieldless enums; `ALL` lists every variant so tags
/// can be parsed back without a hand-written match.
pub trait StepKind: Copy + Sized + 'static {
    /// Every variant of the vocabulary.
    const ALL: &'static [Self];

    /// The wire tag recorded under `"type"`, e.g. `"COMPARE"`.
    fn tag(self) -> &'static str;

    /// Parses a wire tag back into the vocabulary.
    fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.tag() == tag)
    }
}

/// One recorded, timestamped event in an algorithm run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// 0-based position in the trace.
    #[serde(rename = "step")]
    ordinal: usize,
    /// Vocabulary tag, opaque to the framework.
    #[serde(rename = "type")]
    step_type: String,
    /// Seconds elapsed since the run started.
    timestamp: f64,
    /// Payload chosen by the domain logic. By convention an object with a
    /// nested `visualization` snapshot.
    data: Value,
    /// Short human-readable sentence.
    description: String,
}

impl Step {
    pub(crate) fn new(
        ordinal: usize,
        step_type: &str,
        timestamp: f64,
        data: Value,
        description: String,
    ) -> Self {
        Step {
            ordinal,
            step_type: step_type.to_string(),
            timestamp,
            data,
            description,
        }
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn step_type(&self) -> &str {
        &self.step_type
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// The `visualization` sub-mapping of the payload, if present.
    pub fn visualization(&self) -> Option<&Value> {
        self.data.get("visualization")
    }

    /// Parses this step's tag into the given vocabulary.
    ///
    /// Returns `None` when the tag belongs to a different vocabulary.
    pub fn kind<K: StepKind>(&self) -> Option<K> {
        K::from_tag(&self.step_type)
    }

    /// Whether this step's tag matches `kind`.
    pub fn is<K: StepKind>(&self, kind: K) -> bool {
        self.step_type == kind.tag()
    }
}
