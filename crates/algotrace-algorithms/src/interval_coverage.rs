//! Removal of covered intervals.
//!
//! Intervals are sorted by start ascending and, for equal starts, by end
//! descending. A single sweep then tracks the largest end seen so far: an
//! interval whose end does not exceed it is covered by an earlier one.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use algotrace_core::prediction::outcome_within;
use algotrace_core::{
    AlgorithmInfo, AlgorithmRegistry, NarrativeError, PredictionExtractor, PredictionPoint,
    RegistryError, ResultEnvelope, Step, StepKind, StepNarrator, StepRecorder, StepView,
    SummaryView, TraceError, TracedAlgorithm, TracerConfig,
};

use crate::support::{bound_label, keep, parse_input};

pub const INFO: AlgorithmInfo = AlgorithmInfo {
    name: "interval-coverage",
    display_name: "Remove Covered Intervals",
    visualization_type: "timeline",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageStep {
    InitialState,
    SortIntervals,
    ExamineInterval,
    IntervalCovered,
    IntervalKept,
    Complete,
}

impl StepKind for CoverageStep {
    const ALL: &'static [Self] = &[
        CoverageStep::InitialState,
        CoverageStep::SortIntervals,
        CoverageStep::ExamineInterval,
        CoverageStep::IntervalCovered,
        CoverageStep::IntervalKept,
        CoverageStep::Complete,
    ];

    fn tag(self) -> &'static str {
        match self {
            CoverageStep::InitialState => "INITIAL_STATE",
            CoverageStep::SortIntervals => "SORT_INTERVALS",
            CoverageStep::ExamineInterval => "EXAMINE_INTERVAL",
            CoverageStep::IntervalCovered => "INTERVAL_COVERED",
            CoverageStep::IntervalKept => "INTERVAL_KEPT",
            CoverageStep::Complete => "COMPLETE",
        }
    }
}

#[derive(Debug, Deserialize)]
struct CoverageInput {
    intervals: Vec<[i64; 2]>,
}

/// `max_end` is `null` until the first interval is kept; `kept` indexes
/// into `intervals` as currently ordered.
#[derive(Debug, Serialize)]
struct CoverageSnapshot<'a> {
    intervals: &'a [[i64; 2]],
    current: Option<usize>,
    max_end: Option<i64>,
    kept: &'a [usize],
}

fn payload(
    intervals: &[[i64; 2]],
    current: Option<usize>,
    max_end: Option<i64>,
    kept: &[usize],
) -> Value {
    json!({
        "visualization": CoverageSnapshot {
            intervals,
            current,
            max_end,
            kept,
        }
    })
}

#[derive(Debug, Clone, Default)]
pub struct IntervalCoverage {
    config: TracerConfig,
}

impl IntervalCoverage {
    pub fn new() -> Self {
        IntervalCoverage::default()
    }

    pub fn with_config(config: TracerConfig) -> Self {
        IntervalCoverage { config }
    }
}

impl TracedAlgorithm for IntervalCoverage {
    fn info(&self) -> AlgorithmInfo {
        INFO
    }

    fn run(&self, input: &Value) -> Result<ResultEnvelope, TraceError> {
        let CoverageInput { mut intervals } = parse_input(input)?;
        if let Some([start, end]) = intervals.iter().find(|[start, end]| start > end) {
            return Err(TraceError::invalid_input(format!(
                "interval [{start}, {end}] starts after it ends"
            )));
        }

        let mut recorder = StepRecorder::new(self.info(), self.config.clone());
        recorder.set_input_size(intervals.len());

        let mut max_end: Option<i64> = None;
        let mut kept: Vec<usize> = Vec::new();

        recorder.record(
            CoverageStep::InitialState,
            payload(&intervals, None, max_end, &kept),
            format!(
                "Remove intervals covered by another among {} intervals",
                intervals.len()
            ),
        )?;

        intervals.sort_by(|a, b| a[0].cmp(&b[0]).then(b[1].cmp(&a[1])));
        recorder.record(
            CoverageStep::SortIntervals,
            payload(&intervals, None, max_end, &kept),
            "Sort by start ascending, longer intervals first on ties",
        )?;

        for (i, &[start, end]) in intervals.iter().enumerate() {
            recorder.record(
                CoverageStep::ExamineInterval,
                payload(&intervals, Some(i), max_end, &kept),
                format!("Examine [{start}, {end}] against max end {}", bound_label(max_end)),
            )?;

            if let Some(bound) = max_end.filter(|&bound| end <= bound) {
                recorder.record(
                    CoverageStep::IntervalCovered,
                    payload(&intervals, Some(i), max_end, &kept),
                    format!("[{start}, {end}] is covered: its end {end} <= {bound}"),
                )?;
            } else {
                kept.push(i);
                max_end = Some(end);
                recorder.record(
                    CoverageStep::IntervalKept,
                    payload(&intervals, Some(i), max_end, &kept),
                    format!("[{start}, {end}] is kept: max end becomes {end}"),
                )?;
            }
        }

        let removed = intervals.len() - kept.len();
        recorder.record(
            CoverageStep::Complete,
            payload(&intervals, None, max_end, &kept),
            format!("{} kept, {removed} removed", kept.len()),
        )?;

        let kept_intervals: Vec<[i64; 2]> = kept.iter().map(|&i| intervals[i]).collect();
        Ok(recorder.finish(
            json!({ "kept_intervals": kept_intervals, "removed_count": removed }),
            self,
        ))
    }
}

impl PredictionExtractor for IntervalCoverage {
    /// One question per examined interval: covered or kept?
    fn predictions(&self, steps: &[Step]) -> Vec<PredictionPoint> {
        let outcomes = [CoverageStep::IntervalCovered, CoverageStep::IntervalKept];
        steps
            .iter()
            .filter(|step| step.is(CoverageStep::ExamineInterval))
            .filter_map(|step| {
                let (_, outcome) = outcome_within(steps, step.ordinal(), 1, &outcomes)?;
                let viz = step.visualization()?;
                let current = viz.get("current")?.as_u64()? as usize;
                let interval = viz.get("intervals")?.as_array()?.get(current)?.as_array()?;
                let (start, end) = (interval.first()?.as_i64()?, interval.get(1)?.as_i64()?);
                let max_end = bound_label(viz.get("max_end")?.as_i64());

                let (answer, explanation) = match outcome {
                    CoverageStep::IntervalCovered => (
                        "covered",
                        format!("Its end {end} does not exceed the max end {max_end}."),
                    ),
                    _ => (
                        "kept",
                        format!("Its end {end} extends past the max end {max_end}."),
                    ),
                };

                keep(
                    PredictionPoint::builder(
                        step.ordinal(),
                        format!(
                            "The max end so far is {max_end}. \
                             Is [{start}, {end}] covered by an earlier interval?"
                        ),
                    )
                    .choice("covered", "Covered: remove it")
                    .choice("kept", "Not covered: keep it")
                    .answer(answer)
                    .hint("Earlier intervals start no later, so only the end matters.")
                    .explanation(explanation)
                    .build(),
                )
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IntervalCoverageNarrator;

impl StepNarrator for IntervalCoverageNarrator {
    fn algorithm(&self) -> &'static str {
        INFO.name
    }

    fn narrate_step(&self, step: &StepView<'_>) -> Result<Option<String>, NarrativeError> {
        let Some(kind) = step.kind::<CoverageStep>() else {
            return Ok(None);
        };

        let prose = match kind {
            CoverageStep::InitialState => {
                let count = step.array("visualization.intervals")?.len();
                format!(
                    "We start with {count} interval(s) and want to drop every interval \
                     contained in another. No interval has been kept yet, so there is no max end."
                )
            }
            CoverageStep::SortIntervals => {
                let count = step.array("visualization.intervals")?.len();
                let first = if count > 0 {
                    let (start, end) = step.i64_pair_at("visualization.intervals", 0)?;
                    format!(" The sweep begins with [{start}, {end}].")
                } else {
                    String::new()
                };
                format!(
                    "Sort by start ascending and, for equal starts, by end descending, \
                     so any interval that could cover another comes before it.{first}"
                )
            }
            CoverageStep::ExamineInterval => {
                let current = step.usize("visualization.current")?;
                let (start, end) = step.i64_pair_at("visualization.intervals", current)?;
                let max_end = step.nullable_i64("visualization.max_end")?;
                format!(
                    "Examine [{start}, {end}]. The largest end among kept intervals is {}.",
                    bound_label(max_end)
                )
            }
            CoverageStep::IntervalCovered => {
                let current = step.usize("visualization.current")?;
                let (start, end) = step.i64_pair_at("visualization.intervals", current)?;
                let max_end = step.nullable_i64("visualization.max_end")?;
                format!(
                    "[{start}, {end}] ends at or before {}, so an earlier interval covers it \
                     and it is removed.",
                    bound_label(max_end)
                )
            }
            CoverageStep::IntervalKept => {
                let current = step.usize("visualization.current")?;
                let (start, end) = step.i64_pair_at("visualization.intervals", current)?;
                let kept = step.array("visualization.kept")?.len();
                format!(
                    "[{start}, {end}] reaches further than any kept interval, so it is kept. \
                     The max end becomes {end}; {kept} interval(s) kept so far."
                )
            }
            CoverageStep::Complete => {
                let kept = step.array("visualization.kept")?.len();
                let total = step.array("visualization.intervals")?.len();
                format!("The sweep is done: {kept} of {total} interval(s) survive.")
            }
        };
        Ok(Some(prose))
    }

    fn summarize(&self, summary: &SummaryView<'_>) -> Result<String, NarrativeError> {
        let kept = summary.result.array("kept_intervals")?.len();
        let removed = summary.result.u64("removed_count")?;
        Ok(format!(
            "{kept} interval(s) remain after removing {removed} covered interval(s) in {} steps.",
            summary.total_steps
        ))
    }
}

fn factory(config: &TracerConfig) -> Box<dyn TracedAlgorithm> {
    Box::new(IntervalCoverage::with_config(config.clone()))
}

pub fn register(registry: &mut AlgorithmRegistry) -> Result<(), RegistryError> {
    registry.register(
        INFO.name,
        factory,
        INFO.display_name,
        "Drop every interval lying inside another, using one sort and a max-end sweep.",
        vec![
            json!({"intervals": [[1, 4], [3, 6], [2, 8]]}),
            json!({"intervals": [[1, 2], [1, 4], [3, 4]]}),
            json!({"intervals": [[0, 10]]}),
            json!({"intervals": [[1, 3], [4, 6]]}),
        ],
        Some(json!({
            "type": "object",
            "required": ["intervals"],
            "properties": {
                "intervals": {
                    "type": "array",
                    "items": {
                        "type": "array",
                        "items": {"type": "integer"},
                        "minItems": 2,
                        "maxItems": 2
                    }
                }
            }
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(intervals: Value) -> ResultEnvelope {
        IntervalCoverage::new()
            .run(&json!({ "intervals": intervals }))
            .unwrap()
    }

    #[test]
    fn removes_covered_interval() {
        let env = run(json!([[1, 4], [3, 6], [2, 8]]));
        assert_eq!(
            env.result,
            json!({"kept_intervals": [[1, 4], [2, 8]], "removed_count": 1})
        );
        env.validate().unwrap();
    }

    #[test]
    fn equal_starts_sort_longer_first() {
        let env = run(json!([[1, 2], [1, 4], [3, 4]]));
        assert_eq!(
            env.result,
            json!({"kept_intervals": [[1, 4]], "removed_count": 2})
        );
        let sorted = &env.steps()[1];
        assert_eq!(sorted.step_type(), "SORT_INTERVALS");
        assert_eq!(
            sorted.visualization().unwrap()["intervals"],
            json!([[1, 4], [1, 2], [3, 4]])
        );
    }

    #[test]
    fn unset_max_end_is_serialized_as_null() {
        let env = run(json!([[1, 3]]));
        let first = env.steps()[0].visualization().unwrap();
        assert_eq!(first["max_end"], Value::Null);
        let kept = env
            .steps()
            .iter()
            .find(|s| s.is(CoverageStep::IntervalKept))
            .unwrap();
        assert_eq!(kept.visualization().unwrap()["max_end"], json!(3));
    }

    #[test]
    fn ends_beyond_f64_precision_compare_exactly() {
        let env = run(json!([[0, 9_007_199_254_740_992_i64], [1, 9_007_199_254_740_993_i64]]));
        assert_eq!(
            env.result,
            json!({
                "kept_intervals": [[0, 9_007_199_254_740_992_i64], [1, 9_007_199_254_740_993_i64]],
                "removed_count": 0
            })
        );

        let last_kept = env
            .steps()
            .iter()
            .rev()
            .find(|s| s.is(CoverageStep::IntervalKept))
            .unwrap();
        assert_eq!(
            last_kept.visualization().unwrap()["max_end"],
            json!(9_007_199_254_740_993_i64)
        );

        let answers: Vec<&str> = env
            .prediction_points()
            .iter()
            .map(|p| p.correct_answer.as_str())
            .collect();
        assert_eq!(answers, ["kept", "kept"]);
        assert!(env.prediction_points()[1]
            .explanation
            .contains("9007199254740993 extends past the max end 9007199254740992"));

        let text = algotrace_core::narrate(&env, &IntervalCoverageNarrator).unwrap();
        assert!(text.contains("2 interval(s) remain after removing 0 covered interval(s)"));
    }

    #[test]
    fn rejects_reversed_interval() {
        let err = IntervalCoverage::new()
            .run(&json!({"intervals": [[5, 1]]}))
            .unwrap_err();
        assert!(
            matches!(err, TraceError::InvalidInput { ref message } if message.contains("[5, 1]"))
        );
    }

    #[test]
    fn predictions_follow_the_sweep() {
        let env = run(json!([[1, 4], [3, 6], [2, 8]]));
        let answers: Vec<&str> = env
            .prediction_points()
            .iter()
            .map(|p| p.correct_answer.as_str())
            .collect();
        assert_eq!(answers, ["kept", "kept", "covered"]);
        assert!(env.prediction_points()[0].question.contains("none yet"));
    }

    #[test]
    fn narration_handles_missing_max_end() {
        let env = run(json!([[1, 3], [4, 6]]));
        let text = algotrace_core::narrate(&env, &IntervalCoverageNarrator).unwrap();
        assert!(
            text.contains("Examine [1, 3]. The largest end among kept intervals is none yet.")
        );
        assert!(text.contains("2 interval(s) remain after removing 0 covered interval(s)"));
    }
}
