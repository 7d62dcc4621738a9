//! Binary search over a sorted integer array.
//!
//! Each midpoint records a `CALCULATE_MID` step followed by exactly one outcome
//! (`TARGET_FOUND`, `SEARCH_LEFT` or `SEARCH_RIGHT`). An exhausted search
//! space ends the trace with `TARGET_NOT_FOUND`.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use algotrace_core::prediction::outcome_within;
use algotrace_core::{
    AlgorithmInfo, AlgorithmRegistry, NarrativeError, PredictionExtractor, PredictionPoint,
    RegistryError, ResultEnvelope, Step, StepKind, StepNarrator, StepRecorder, StepView,
    SummaryView, TraceError, TracedAlgorithm, TracerConfig,
};

use crate::support::{keep, parse_input};

pub const INFO: AlgorithmInfo = AlgorithmInfo {
    name: "binary-search",
    display_name: "Binary Search",
    visualization_type: "array",
};

/// Step vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStep {
    InitialState,
    CalculateMid,
    TargetFound,
    SearchLeft,
    SearchRight,
    TargetNotFound,
}

impl StepKind for SearchStep {
    const ALL: &'static [Self] = &[
        SearchStep::InitialState,
        SearchStep::CalculateMid,
        SearchStep::TargetFound,
        SearchStep::SearchLeft,
        SearchStep::SearchRight,
        SearchStep::TargetNotFound,
    ];

    fn tag(self) -> &'static str {
        match self {
            SearchStep::InitialState => "INITIAL_STATE",
            SearchStep::CalculateMid => "CALCULATE_MID",
            SearchStep::TargetFound => "TARGET_FOUND",
            SearchStep::SearchLeft => "SEARCH_LEFT",
            SearchStep::SearchRight => "SEARCH_RIGHT",
            SearchStep::TargetNotFound => "TARGET_NOT_FOUND",
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchInput {
    array: Vec<i64>,
    target: i64,
}

/// Renderable state at one step. `left > right` once the space is empty.
#[derive(Debug, Serialize)]
struct SearchSnapshot<'a> {
    array: &'a [i64],
    target: i64,
    left: i64,
    right: i64,
    mid: Option<usize>,
    mid_value: Option<i64>,
}

fn payload(array: &[i64], target: i64, left: i64, right: i64, mid: Option<usize>) -> Value {
    json!({
        "visualization": SearchSnapshot {
            array,
            target,
            left,
            right,
            mid,
            mid_value: mid.map(|m| array[m]),
        }
    })
}

/// Instrumented binary search.
#[derive(Debug, Clone, Default)]
pub struct BinarySearch {
    config: TracerConfig,
}

impl BinarySearch {
    pub fn new() -> Self {
        BinarySearch::default()
    }

    pub fn with_config(config: TracerConfig) -> Self {
        BinarySearch { config }
    }
}

impl TracedAlgorithm for BinarySearch {
    fn info(&self) -> AlgorithmInfo {
        INFO
    }

    fn run(&self, input: &Value) -> Result<ResultEnvelope, TraceError> {
        let SearchInput { array, target } = parse_input(input)?;
        if let Some(i) = array.windows(2).position(|w| w[0] > w[1]) {
            return Err(TraceError::invalid_input(format!(
                "array must be sorted in ascending order: arr[{}] = {} > arr[{}] = {}",
                i,
                array[i],
                i + 1,
                array[i + 1]
            )));
        }

        let mut recorder = StepRecorder::new(self.info(), self.config.clone());
        recorder.set_input_size(array.len());

        let mut left: i64 = 0;
        let mut right: i64 = array.len() as i64 - 1;
        recorder.record(
            SearchStep::InitialState,
            payload(&array, target, left, right, None),
            format!("Search for {target} in a sorted array of {} elements", array.len()),
        )?;

        let mut comparisons: u64 = 0;
        let mut found = None;
        while left <= right {
            let mid = (left + (right - left) / 2) as usize;
            let value = array[mid];
            recorder.record(
                SearchStep::CalculateMid,
                payload(&array, target, left, right, Some(mid)),
                format!("Middle of [{left}, {right}] is index {mid} (value {value})"),
            )?;

            comparisons += 1;
            match value.cmp(&target) {
                Ordering::Equal => {
                    recorder.record(
                        SearchStep::TargetFound,
                        payload(&array, target, left, right, Some(mid)),
                        format!("Found {target} at index {mid}"),
                    )?;
                    found = Some(mid);
                    break;
                }
                Ordering::Less => {
                    left = mid as i64 + 1;
                    recorder.record(
                        SearchStep::SearchRight,
                        payload(&array, target, left, right, Some(mid)),
                        format!("{value} < {target}: continue in [{left}, {right}]"),
                    )?;
                }
                Ordering::Greater => {
                    right = mid as i64 - 1;
                    recorder.record(
                        SearchStep::SearchLeft,
                        payload(&array, target, left, right, Some(mid)),
                        format!("{value} > {target}: continue in [{left}, {right}]"),
                    )?;
                }
            }
        }

        if found.is_none() {
            recorder.record(
                SearchStep::TargetNotFound,
                payload(&array, target, left, right, None),
                format!("Search space exhausted; {target} is not present"),
            )?;
        }

        recorder.annotate("target", json!(target));
        recorder.annotate("comparisons", json!(comparisons));
        Ok(recorder.finish(json!({ "found": found.is_some(), "index": found }), self))
    }
}

impl PredictionExtractor for BinarySearch {
    /// One question per `CALCULATE_MID`: where does the search go next?
    fn predictions(&self, steps: &[Step]) -> Vec<PredictionPoint> {
        let outcomes = [
            SearchStep::TargetFound,
            SearchStep::SearchLeft,
            SearchStep::SearchRight,
        ];
        steps
            .iter()
            .filter(|step| step.is(SearchStep::CalculateMid))
            .filter_map(|step| {
                let (_, outcome) = outcome_within(steps, step.ordinal(), 1, &outcomes)?;
                let viz = step.visualization()?;
                let mid = viz.get("mid")?.as_u64()?;
                let value = viz.get("mid_value")?.as_i64()?;
                let target = viz.get("target")?.as_i64()?;

                let (answer, explanation) = match outcome {
                    SearchStep::TargetFound => (
                        "found",
                        format!("{value} equals {target}, so the search stops."),
                    ),
                    SearchStep::SearchLeft => (
                        "left",
                        format!("{value} > {target}, so indices right of {mid} are dropped."),
                    ),
                    _ => (
                        "right",
                        format!("{value} < {target}, so indices left of {mid} are dropped."),
                    ),
                };

                keep(
                    PredictionPoint::builder(
                        step.ordinal(),
                        format!(
                            "The middle element arr[{mid}] is {value}. \
                             Searching for {target}, what happens next?"
                        ),
                    )
                    .choice("found", "The target is found")
                    .choice("left", "Continue in the left half")
                    .choice("right", "Continue in the right half")
                    .answer(answer)
                    .hint(format!("Compare {value} with {target}."))
                    .explanation(explanation)
                    .build(),
                )
            })
            .collect()
    }
}

/// Prose renderer for binary search traces.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinarySearchNarrator;

impl StepNarrator for BinarySearchNarrator {
    fn algorithm(&self) -> &'static str {
        INFO.name
    }

    fn narrate_step(&self, step: &StepView<'_>) -> Result<Option<String>, NarrativeError> {
        let Some(kind) = step.kind::<SearchStep>() else {
            return Ok(None);
        };
        let target = step.i64("visualization.target")?;
        let left = step.i64("visualization.left")?;
        let right = step.i64("visualization.right")?;

        let prose = match kind {
            SearchStep::InitialState => {
                let array = step.i64s("visualization.array")?;
                format!(
                    "We search for **{target}** in the sorted array {array:?}. \
                     The search space starts as the whole array, indices {left} to {right}."
                )
            }
            SearchStep::CalculateMid => {
                let mid = step.usize("visualization.mid")?;
                let value = step.i64_at("visualization.array", mid)?;
                format!(
                    "The search space is indices {left} to {right}. \
                     Its middle is index {mid}, holding {value}."
                )
            }
            SearchStep::TargetFound => {
                let mid = step.usize("visualization.mid")?;
                let value = step.i64("visualization.mid_value")?;
                format!("{value} equals the target {target}, so the search stops at index {mid}.")
            }
            SearchStep::SearchLeft => {
                let value = step.i64("visualization.mid_value")?;
                format!(
                    "{value} is greater than {target}, so the target can only lie to the left. \
                     The search space shrinks to indices {left} to {right}."
                )
            }
            SearchStep::SearchRight => {
                let value = step.i64("visualization.mid_value")?;
                format!(
                    "{value} is less than {target}, so the target can only lie to the right. \
                     The search space shrinks to indices {left} to {right}."
                )
            }
            SearchStep::TargetNotFound => format!(
                "The search space is empty (left = {left} > right = {right}), \
                 so {target} is not in the array."
            ),
        };
        Ok(Some(prose))
    }

    fn summarize(&self, summary: &SummaryView<'_>) -> Result<String, NarrativeError> {
        let found = summary.result.bool("found")?;
        let index = summary.result.nullable_i64("index")?;
        let comparisons = summary.extra.u64("comparisons")?;
        Ok(match (found, index) {
            (true, Some(index)) => format!(
                "Found the target at index {index} after {comparisons} comparison(s) \
                 over {} steps.",
                summary.total_steps
            ),
            _ => format!(
                "The target is not in the array; \
                 {comparisons} comparison(s) ruled out every position."
            ),
        })
    }
}

fn factory(config: &TracerConfig) -> Box<dyn TracedAlgorithm> {
    Box::new(BinarySearch::with_config(config.clone()))
}

/// Registers binary search with its examples and input schema.
pub fn register(registry: &mut AlgorithmRegistry) -> Result<(), RegistryError> {
    registry.register(
        INFO.name,
        factory,
        INFO.display_name,
        "Repeatedly halve a sorted array's search space around its middle element.",
        vec![
            json!({"array": [1, 3, 5, 7, 9], "target": 5}),
            json!({"array": [1, 3, 5, 7, 9], "target": 6}),
            json!({"array": [2, 4, 6, 8, 10, 12, 14, 16], "target": 14}),
            json!({"array": [42], "target": 42}),
        ],
        Some(json!({
            "type": "object",
            "required": ["array", "target"],
            "properties": {
                "array": {
                    "type": "array",
                    "items": {"type": "integer"},
                    "description": "Sorted ascending"
                },
                "target": {"type": "integer"}
            }
        })),
    )
}
