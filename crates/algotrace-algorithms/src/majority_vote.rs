//! Boyer-Moore majority vote.
//!
//! The voting pass keeps one candidate and a vote count. Every element is
//! announced with `EXAMINE_ELEMENT` and resolved by exactly one of
//! `NEW_CANDIDATE`, `VOTE_FOR` or `VOTE_AGAINST`. A second pass counts the
//! surviving candidate's occurrences to confirm it is a true majority.

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
    name: "majority-vote",
    display_name: "Boyer-Moore Majority Vote",
    visualization_type: "array",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteStep {
    InitialState,
    ExamineElement,
    NewCandidate,
    VoteFor,
    VoteAgainst,
    VerifyCandidate,
    MajorityFound,
    NoMajority,
}

impl StepKind for VoteStep {
    const ALL: &'static [Self] = &[
        VoteStep::InitialState,
        VoteStep::ExamineElement,
        VoteStep::NewCandidate,
        VoteStep::VoteFor,
        VoteStep::VoteAgainst,
        VoteStep::VerifyCandidate,
        VoteStep::MajorityFound,
        VoteStep::NoMajority,
    ];

    fn tag(self) -> &'static str {
        match self {
            VoteStep::InitialState => "INITIAL_STATE",
            VoteStep::ExamineElement => "EXAMINE_ELEMENT",
            VoteStep::NewCandidate => "NEW_CANDIDATE",
            VoteStep::VoteFor => "VOTE_FOR",
            VoteStep::VoteAgainst => "VOTE_AGAINST",
            VoteStep::VerifyCandidate => "VERIFY_CANDIDATE",
            VoteStep::MajorityFound => "MAJORITY_FOUND",
            VoteStep::NoMajority => "NO_MAJORITY",
        }
    }
}

#[derive(Debug, Deserialize)]
struct VoteInput {
    array: Vec<i64>,
}

/// A majority element must appear more than `threshold` times.
#[derive(Debug, Serialize)]
struct VoteSnapshot<'a> {
    array: &'a [i64],
    index: Option<usize>,
    candidate: Option<i64>,
    count: usize,
    phase: &'static str,
    occurrences: Option<usize>,
    threshold: usize,
}

impl VoteSnapshot<'_> {
    fn payload(&self) -> Value {
        json!({ "visualization": self })
    }
}

#[derive(Debug, Clone, Default)]
pub struct MajorityVote {
    config: TracerConfig,
}

impl MajorityVote {
    pub fn new() -> Self {
        MajorityVote::default()
    }

    pub fn with_config(config: TracerConfig) -> Self {
        MajorityVote { config }
    }
}

impl TracedAlgorithm for MajorityVote {
    fn info(&self) -> AlgorithmInfo {
        INFO
    }

    fn run(&self, input: &Value) -> Result<ResultEnvelope, TraceError> {
        let VoteInput { array } = parse_input(input)?;
        let threshold = array.len() / 2;

        let mut recorder = StepRecorder::new(self.info(), self.config.clone());
        recorder.set_input_size(array.len());

        let snapshot = |index, candidate, count, phase, occurrences| VoteSnapshot {
            array: &array,
            index,
            candidate,
            count,
            phase,
            occurrences,
            threshold,
        };

        recorder.record(
            VoteStep::InitialState,
            snapshot(None, None, 0, "vote", None).payload(),
            format!("Look for an element appearing more than {threshold} times"),
        )?;

        let mut candidate: Option<i64> = None;
        let mut count = 0usize;
        let mut candidate_changes = 0u64;

        for (i, &x) in array.iter().enumerate() {
            recorder.record(
                VoteStep::ExamineElement,
                snapshot(Some(i), candidate, count, "vote", None).payload(),
                format!("Examine arr[{i}] = {x}"),
            )?;

            match candidate {
                _ if count == 0 => {
                    candidate = Some(x);
                    count = 1;
                    candidate_changes += 1;
                    recorder.record(
                        VoteStep::NewCandidate,
                        snapshot(Some(i), candidate, count, "vote", None).payload(),
                        format!("Count is zero: {x} becomes the candidate"),
                    )?;
                }
                Some(c) if c == x => {
                    count += 1;
                    recorder.record(
                        VoteStep::VoteFor,
                        snapshot(Some(i), candidate, count, "vote", None).payload(),
                        format!("{x} matches the candidate: count rises to {count}"),
                    )?;
                }
                _ => {
                    count -= 1;
                    recorder.record(
                        VoteStep::VoteAgainst,
                        snapshot(Some(i), candidate, count, "vote", None).payload(),
                        format!("{x} differs from the candidate: count drops to {count}"),
                    )?;
                }
            }
        }

        let mut majority = None;
        let mut occurrences = 0;
        match candidate {
            Some(c) => {
                occurrences = array.iter().filter(|&&x| x == c).count();
                recorder.record(
                    VoteStep::VerifyCandidate,
                    snapshot(None, candidate, count, "verify", Some(occurrences)).payload(),
                    format!("Candidate {c} appears {occurrences} time(s)"),
                )?;
                if occurrences > threshold {
                    majority = Some(c);
                    recorder.record(
                        VoteStep::MajorityFound,
                        snapshot(None, candidate, count, "verify", Some(occurrences)).payload(),
                        format!("{c} is the majority element"),
                    )?;
                } else {
                    recorder.record(
                        VoteStep::NoMajority,
                        snapshot(None, candidate, count, "verify", Some(occurrences)).payload(),
                        format!("{c} falls short of a majority"),
                    )?;
                }
            }
            None => {
                recorder.record(
                    VoteStep::NoMajority,
                    snapshot(None, None, 0, "verify", None).payload(),
                    "Empty array: there is no majority",
                )?;
            }
        }

        recorder.annotate("candidate_changes", json!(candidate_changes));
        Ok(recorder.finish(json!({ "majority": majority, "count": occurrences }), self))
    }
}

impl PredictionExtractor for MajorityVote {
    /// One question per examined element: which of the three vote outcomes follows?
    fn predictions(&self, steps: &[Step]) -> Vec<PredictionPoint> {
        let outcomes = [VoteStep::NewCandidate, VoteStep::VoteFor, VoteStep::VoteAgainst];
        steps
            .iter()
            .filter(|step| step.is(VoteStep::ExamineElement))
            .filter_map(|step| {
                let (_, outcome) = outcome_within(steps, step.ordinal(), 1, &outcomes)?;
                let viz = step.visualization()?;
                let index = viz.get("index")?.as_u64()? as usize;
                let element = viz.get("array")?.as_array()?.get(index)?.as_i64()?;
                let count = viz.get("count")?.as_u64()?;
                let candidate = viz.get("candidate")?.as_i64();

                let state = match candidate {
                    Some(c) => format!("The candidate is {c} with {count} vote(s)."),
                    None => "There is no candidate yet.".to_string(),
                };
                let (answer, explanation) = match outcome {
                    VoteStep::NewCandidate => (
                        "new",
                        format!("The count was 0, so {element} takes over as candidate."),
                    ),
                    VoteStep::VoteFor => (
                        "for",
                        format!("{element} matches the candidate, adding a vote."),
                    ),
                    _ => (
                        "against",
                        format!("{element} differs from the candidate, cancelling one vote."),
                    ),
                };

                keep(
                    PredictionPoint::builder(
                        step.ordinal(),
                        format!("{state} What happens when {element} is examined?"),
                    )
                    .choice("new", format!("{element} becomes the new candidate"))
                    .choice("for", "The candidate gains a vote")
                    .choice("against", "The candidate loses a vote")
                    .answer(answer)
                    .hint("Check the vote count first, then compare with the candidate.")
                    .explanation(explanation)
                    .build(),
                )
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MajorityVoteNarrator;

impl StepNarrator for MajorityVoteNarrator {
    fn algorithm(&self) -> &'static str {
        INFO.name
    }

    fn narrate_step(&self, step: &StepView<'_>) -> Result<Option<String>, NarrativeError> {
        let Some(kind) = step.kind::<VoteStep>() else {
            return Ok(None);
        };
        let threshold = step.u64("visualization.threshold")?;

        let prose = match kind {
            VoteStep::InitialState => {
                let array = step.i64s("visualization.array")?;
                format!(
                    "We look for a majority element in {array:?}: \
                     one that appears more than {threshold} times. \
                     The vote starts with no candidate."
                )
            }
            VoteStep::ExamineElement => {
                let index = step.usize("visualization.index")?;
                let element = step.i64_at("visualization.array", index)?;
                let count = step.u64("visualization.count")?;
                match step.nullable_i64("visualization.candidate")? {
                    Some(candidate) => format!(
                        "Examine arr[{index}] = {element}. \
                         The candidate is {candidate} with {count} vote(s)."
                    ),
                    None => format!("Examine arr[{index}] = {element}. There is no candidate yet."),
                }
            }
            VoteStep::NewCandidate => {
                let candidate = step.i64("visualization.candidate")?;
                format!("The count was zero, so {candidate} becomes the new candidate with 1 vote.")
            }
            VoteStep::VoteFor => {
                let candidate = step.i64("visualization.candidate")?;
                let count = step.u64("visualization.count")?;
                format!(
                    "The element matches candidate {candidate}, so its vote count rises to {count}."
                )
            }
            VoteStep::VoteAgainst => {
                let index = step.usize("visualization.index")?;
                let element = step.i64_at("visualization.array", index)?;
                let candidate = step.i64("visualization.candidate")?;
                let count = step.u64("visualization.count")?;
                format!(
                    "{element} differs from candidate {candidate}: \
                     one vote cancels out and the count drops to {count}."
                )
            }
            VoteStep::VerifyCandidate => {
                let candidate = step.i64("visualization.candidate")?;
                let occurrences = step.u64("visualization.occurrences")?;
                format!(
                    "Second pass: candidate {candidate} appears {occurrences} time(s); \
                     a majority needs more than {threshold}."
                )
            }
            VoteStep::MajorityFound => {
                let candidate = step.i64("visualization.candidate")?;
                let occurrences = step.u64("visualization.occurrences")?;
                format!("{occurrences} > {threshold}, so {candidate} is the majority element.")
            }
            VoteStep::NoMajority => match step.nullable_i64("visualization.candidate")? {
                Some(candidate) => {
                    let occurrences = step.u64("visualization.occurrences")?;
                    format!(
                        "{occurrences} is not more than {threshold}, \
                         so {candidate} is not a majority and none exists."
                    )
                }
                None => "The array is empty, so there is no majority element.".to_string(),
            },
        };
        Ok(Some(prose))
    }

    fn summarize(&self, summary: &SummaryView<'_>) -> Result<String, NarrativeError> {
        let count = summary.result.u64("count")?;
        let changes = summary.extra.u64("candidate_changes")?;
        Ok(match summary.result.nullable_i64("majority")? {
            Some(majority) => format!(
                "The majority element is {majority}, appearing {count} time(s); \
                 the candidate changed {changes} time(s)."
            ),
            None => format!("No majority element exists; the candidate changed {changes} time(s)."),
        })
    }
}

fn factory(config: &TracerConfig) -> Box<dyn TracedAlgorithm> {
    Box::new(MajorityVote::with_config(config.clone()))
}

pub fn register(registry: &mut AlgorithmRegistry) -> Result<(), RegistryError> {
    registry.register(
        INFO.name,
        factory,
        INFO.display_name,
        "Find the element filling over half the positions, using one candidate and a vote count.",
        vec![
            json!({"array": [2, 2, 1, 1, 1, 2, 2]}),
            json!({"array": [1, 2, 3]}),
            json!({"array": [7]}),
            json!({"array": [3, 3, 4]}),
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
