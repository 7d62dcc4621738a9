//! Bubble sort with early exit.
//!
//! Every adjacent comparison records `COMPARE`; a comparison that swaps is
//! immediately followed by `SWAP`. A pass without swaps records `EARLY_EXIT`
//! and stops the sort.

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
    name: "bubble-sort",
    display_name: "Bubble Sort",
    visualization_type: "array",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortStep {
    InitialState,
    Compare,
    Swap,
    PassComplete,
    EarlyExit,
    Sorted,
}

impl StepKind for SortStep {
    const ALL: &'static [Self] = &[
        SortStep::InitialState,
        SortStep::Compare,
        SortStep::Swap,
        SortStep::PassComplete,
        SortStep::EarlyExit,
        SortStep::Sorted,
    ];

    fn tag(self) -> &'static str {
        match self {
            SortStep::InitialState => "INITIAL_STATE",
            SortStep::Compare => "COMPARE",
            SortStep::Swap => "SWAP",
            SortStep::PassComplete => "PASS_COMPLETE",
            SortStep::EarlyExit => "EARLY_EXIT",
            SortStep::Sorted => "SORTED",
        }
    }
}

#[derive(Debug, Deserialize)]
struct SortInput {
    array: Vec<i64>,
}

/// Array state; positions `sorted_from..` already hold their final values.
#[derive(Debug, Serialize)]
struct SortSnapshot<'a> {
    array: &'a [i64],
    comparing: Option<[usize; 2]>,
    sorted_from: usize,
    pass: usize,
    pass_swaps: usize,
}

impl SortSnapshot<'_> {
    fn payload(&self) -> Value {
        json!({ "visualization": self })
    }
}

#[derive(Debug, Clone, Default)]
pub struct BubbleSort {
    config: TracerConfig,
}

impl BubbleSort {
    pub fn new() -> Self {
        BubbleSort::default()
    }

    pub fn with_config(config: TracerConfig) -> Self {
        BubbleSort { config }
    }
}

impl TracedAlgorithm for BubbleSort {
    fn info(&self) -> AlgorithmInfo {
        INFO
    }

    fn run(&self, input: &Value) -> Result<ResultEnvelope, TraceError> {
        let SortInput { mut array } = parse_input(input)?;
        let n = array.len();

        let mut recorder = StepRecorder::new(self.info(), self.config.clone());
        recorder.set_input_size(n);
        recorder.record(
            SortStep::InitialState,
            SortSnapshot {
                array: &array,
                comparing: None,
                sorted_from: n,
                pass: 0,
                pass_swaps: 0,
            }
            .payload(),
            format!("Sort {n} elements with bubble sort"),
        )?;

        let mut comparisons: u64 = 0;
        let mut swaps: u64 = 0;
        let mut passes = 0;
        let mut early_exit = false;
        let mut sorted_from = n;

        for pass in 0..n.saturating_sub(1) {
            passes = pass + 1;
            let mut pass_swaps = 0;
            for j in 0..n - 1 - pass {
                recorder.record(
                    SortStep::Compare,
                    SortSnapshot {
                        array: &array,
                        comparing: Some([j, j + 1]),
                        sorted_from,
                        pass: passes,
                        pass_swaps,
                    }
                    .payload(),
                    format!(
                        "Compare arr[{j}] = {} with arr[{}] = {}",
                        array[j],
                        j + 1,
                        array[j + 1]
                    ),
                )?;
                comparisons += 1;

                if array[j] > array[j + 1] {
                    array.swap(j, j + 1);
                    swaps += 1;
                    pass_swaps += 1;
                    recorder.record(
                        SortStep::Swap,
                        SortSnapshot {
                            array: &array,
                            comparing: Some([j, j + 1]),
                            sorted_from,
                            pass: passes,
                            pass_swaps,
                        }
                        .payload(),
                        format!("Swap: {} moves right past {}", array[j + 1], array[j]),
                    )?;
                }
            }

            sorted_from = n - 1 - pass;
            recorder.record(
                SortStep::PassComplete,
                SortSnapshot {
                    array: &array,
                    comparing: None,
                    sorted_from,
                    pass: passes,
                    pass_swaps,
                }
                .payload(),
                format!("Pass {passes} complete with {pass_swaps} swap(s)"),
            )?;

            if pass_swaps == 0 {
                early_exit = true;
                recorder.record(
                    SortStep::EarlyExit,
                    SortSnapshot {
                        array: &array,
                        comparing: None,
                        sorted_from,
                        pass: passes,
                        pass_swaps,
                    }
                    .payload(),
                    "No swaps in this pass: the array is sorted",
                )?;
                break;
            }
        }

        recorder.record(
            SortStep::Sorted,
            SortSnapshot {
                array: &array,
                comparing: None,
                sorted_from: 0,
                pass: passes,
                pass_swaps: 0,
            }
            .payload(),
            "Array sorted",
        )?;

        recorder.annotate("comparisons", json!(comparisons));
        recorder.annotate("swaps", json!(swaps));
        recorder.annotate("passes", json!(passes));
        recorder.annotate("early_exit", json!(early_exit));
        Ok(recorder.finish(
            json!({ "sorted_array": array, "comparisons": comparisons, "swaps": swaps }),
            self,
        ))
    }
}

impl PredictionExtractor for BubbleSort {
    fn predictions(&self, steps: &[Step]) -> Vec<PredictionPoint> {
        steps
            .iter()
            .filter(|step| step.is(SortStep::Compare))
            .filter_map(|step| {
                let viz = step.visualization()?;
                let pair = viz.get("comparing")?.as_array()?;
                let (j, k) = (pair.first()?.as_u64()? as usize, pair.get(1)?.as_u64()? as usize);
                let array = viz.get("array")?.as_array()?;
                let (a, b) = (array.get(j)?.as_i64()?, array.get(k)?.as_i64()?);

                let swapped = outcome_within(steps, step.ordinal(), 1, &[SortStep::Swap]).is_some();
                let (answer, explanation) = if swapped {
                    ("swap", format!("{a} > {b}, so the larger value bubbles right."))
                } else {
                    ("keep", format!("{a} <= {b}, so the pair is already in order."))
                };

                keep(
                    PredictionPoint::builder(
                        step.ordinal(),
                        format!(
                            "Comparing arr[{j}] = {a} with arr[{k}] = {b}. Will they be swapped?"
                        ),
                    )
                    .choice("swap", "Yes, swap them")
                    .choice("keep", "No, leave them")
                    .answer(answer)
                    .hint("Bubble sort swaps a pair only when the left value is larger.")
                    .explanation(explanation)
                    .build(),
                )
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BubbleSortNarrator;

impl StepNarrator for BubbleSortNarrator {
    fn algorithm(&self) -> &'static str {
        INFO.name
    }

    fn narrate_step(&self, step: &StepView<'_>) -> Result<Option<String>, NarrativeError> {
        let Some(kind) = step.kind::<SortStep>() else {
            return Ok(None);
        };
        let prose = match kind {
            SortStep::InitialState => {
                let array = step.i64s("visualization.array")?;
                format!(
                    "Bubble sort starts from {array:?}. Each pass compares neighbours \
                     left to right and swaps any pair that is out of order."
                )
            }
            SortStep::Compare => {
                let j = step.usize_at("visualization.comparing", 0)?;
                let k = step.usize_at("visualization.comparing", 1)?;
                let a = step.i64_at("visualization.array", j)?;
                let b = step.i64_at("visualization.array", k)?;
                format!("Compare positions {j} and {k}: {a} against {b}.")
            }
            SortStep::Swap => {
                let j = step.usize_at("visualization.comparing", 0)?;
                let k = step.usize_at("visualization.comparing", 1)?;
                let smaller = step.i64_at("visualization.array", j)?;
                let larger = step.i64_at("visualization.array", k)?;
                let array = step.i64s("visualization.array")?;
                format!("{larger} is larger than {smaller}, so they trade places: {array:?}.")
            }
            SortStep::PassComplete => {
                let pass = step.u64("visualization.pass")?;
                let pass_swaps = step.u64("visualization.pass_swaps")?;
                let sorted_from = step.u64("visualization.sorted_from")?;
                format!(
                    "Pass {pass} made {pass_swaps} swap(s). \
                     Positions {sorted_from} onward now hold their final values."
                )
            }
            SortStep::EarlyExit => {
                let pass = step.u64("visualization.pass")?;
                format!(
                    "Pass {pass} made no swaps, so the array is already in order \
                     and the sort stops early."
                )
            }
            SortStep::Sorted => {
                let array = step.i64s("visualization.array")?;
                format!("The array is sorted: {array:?}.")
            }
        };
        Ok(Some(prose))
    }

    fn summarize(&self, summary: &SummaryView<'_>) -> Result<String, NarrativeError> {
        let sorted = summary.result.i64s("sorted_array")?;
        let comparisons = summary.result.u64("comparisons")?;
        let swaps = summary.result.u64("swaps")?;
        let passes = summary.extra.u64("passes")?;
        Ok(format!(
            "Sorted {} element(s) into {sorted:?} using {comparisons} comparison(s) \
             and {swaps} swap(s) over {passes} pass(es).",
            sorted.len()
        ))
    }
}

fn factory(config: &TracerConfig) -> Box<dyn TracedAlgorithm> {
    Box::new(BubbleSort::with_config(config.clone()))
}

pub fn register(registry: &mut AlgorithmRegistry) -> Result<(), RegistryError> {
    registry.register(
        INFO.name,
        factory,
        INFO.display_name,
        "Repeatedly swap adjacent out-of-order pairs, stopping after a pass with no swaps.",
        vec![
            json!({"array": [5, 1, 4, 2, 8]}),
            json!({"array": [1, 2, 3, 4, 5]}),
            json!({"array": [3, 3, 1]}),
            json!({"array": []}),
        ],
        Some(json!({
            "type": "object",
            "required": ["array"],
            "properties": {
                "array": {"type": "array", "items": {"type": "integer"}}
            }
        })),
    )
}
