//! Prediction points: "predict the next step" quiz items derived from a trace.
//!
//! Each algorithm supplies its own [`PredictionExtractor`], but every
//! extractor shares one output contract:
//!
//! - `step_index` references an existing step,
//! - there are between [`MIN_CHOICES`] and [`MAX_CHOICES`] choices with unique ids,
//! - `correct_answer` is one of the choice ids.
//!
//! The answer is always derived from the recorded trace itself, typically by
//! looking a short, bounded distance past a decision step (see
//! [`outcome_within`]) to see which outcome was actually recorded.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::step::{Step, StepKind};

/// Fewest answer choices a prediction point may offer.
pub const MIN_CHOICES: usize = 2;
/// Most answer choices a prediction point may offer.
pub const MAX_CHOICES: usize = 3;

/// One answer choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub id: String,
    pub label: String,
}

impl Choice {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Choice {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// A quiz item anchored at one step of a trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionPoint {
    /// Ordinal of the decision step the question is asked at.
    pub step_index: usize,
    pub question: String,
    pub choices: Vec<Choice>,
    /// Id of the choice that matches the recorded outcome.
    pub correct_answer: String,
    pub hint: String,
    pub explanation: String,
}

/// Violations of the prediction-point contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredictionError {
    #[error("prediction at step {step_index} has {count} choices, expected 2 to 3")]
    ChoiceCount { step_index: usize, count: usize },

    #[error("prediction at step {step_index} repeats choice id '{id}'")]
    DuplicateChoice { step_index: usize, id: String },

    #[error("prediction at step {step_index} has no correct answer")]
    MissingAnswer { step_index: usize },

    #[error("prediction at step {step_index}: correct answer '{answer}' is not a choice id")]
    UnknownAnswer { step_index: usize, answer: String },

    #[error("prediction references step {step_index} but the trace has {total_steps} steps")]
    StepOutOfRange {
        step_index: usize,
        total_steps: usize,
    },
}

/// Scans a completed step sequence and emits quiz items.
///
/// Implementations must treat `steps` as read-only and return points that
/// satisfy [`PredictionPoint::validate`].
pub trait PredictionExtractor {
    fn predictions(&self, steps: &[Step]) -> Vec<PredictionPoint>;
}

impl PredictionPoint {
    /// Starts building a prediction point anchored at `step_index`.
    pub fn builder(step_index: usize, question: impl Into<String>) -> PredictionBuilder {
        PredictionBuilder {
            step_index,
            question: question.into(),
            choices: Vec::new(),
            correct_answer: None,
            hint: String::new(),
            explanation: String::new(),
        }
    }

    /// Checks the contract against a trace of `total_steps` steps.
    pub fn validate(&self, total_steps: usize) -> Result<(), PredictionError> {
        if self.step_index >= total_steps {
            return Err(PredictionError::StepOutOfRange {
                step_index: self.step_index,
                total_steps,
            });
        }
        check_choices(self.step_index, &self.choices, &self.correct_answer)
    }

    /// Whether `id` is the correct answer.
    pub fn is_correct(&self, id: &str) -> bool {
        self.correct_answer == id
    }
}

fn check_choices(
    step_index: usize,
    choices: &[Choice],
    answer: &str,
) -> Result<(), PredictionError> {
    if !(MIN_CHOICES..=MAX_CHOICES).contains(&choices.len()) {
        return Err(PredictionError::ChoiceCount {
            step_index,
            count: choices.len(),
        });
    }
    for (i, choice) in choices.iter().enumerate() {
        if choices[..i].iter().any(|c| c.id == choice.id) {
            return Err(PredictionError::DuplicateChoice {
                step_index,
                id: choice.id.clone(),
            });
        }
    }
    if !choices.iter().any(|c| c.id == answer) {
        return Err(PredictionError::UnknownAnswer {
            step_index,
            answer: answer.to_string(),
        });
    }
    Ok(())
}

/// Builder for [`PredictionPoint`]; `build` enforces the contract.
#[derive(Debug, Clone)]
pub struct PredictionBuilder {
    step_index: usize,
    question: String,
    choices: Vec<Choice>,
    correct_answer: Option<String>,
    hint: String,
    explanation: String,
}

impl PredictionBuilder {
    pub fn choice(mut self, id: impl Into<String>, label: impl Into<String>) -> Self {
        self.choices.push(Choice::new(id, label));
        self
    }

    /// Replaces the choice list wholesale, e.g. with the output of [`bucket_choices`].
    pub fn choices(mut self, choices: Vec<Choice>) -> Self {
        self.choices = choices;
        self
    }

    pub fn answer(mut self, id: impl Into<String>) -> Self {
        self.correct_answer = Some(id.into());
        self
    }

    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = hint.into();
        self
    }

    pub fn explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = explanation.into();
        self
    }

    pub fn build(self) -> Result<PredictionPoint, PredictionError> {
        let correct_answer = self.correct_answer.ok_or(PredictionError::MissingAnswer {
            step_index: self.step_index,
        })?;
        check_choices(self.step_index, &self.choices, &correct_answer)?;
        Ok(PredictionPoint {
            step_index: self.step_index,
            question: self.question,
            choices: self.choices,
            correct_answer,
            hint: self.hint,
            explanation: self.explanation,
        })
    }
}

/// Caps a list of branch choices at [`MAX_CHOICES`].
///
/// When there are too many branches, the first `MAX_CHOICES - 1` are kept and
/// the rest are folded into `other`. If the correct branch was folded away the
/// returned answer becomes `other.id`.
pub fn bucket_choices(choices: Vec<Choice>, correct: &str, other: Choice) -> (Vec<Choice>, String) {
    if choices.len() <= MAX_CHOICES {
        return (choices, correct.to_string());
    }
    let mut kept: Vec<Choice> = choices.into_iter().take(MAX_CHOICES - 1).collect();
    let answer = if kept.iter().any(|c| c.id == correct) {
        correct.to_string()
    } else {
        other.id.clone()
    };
    kept.push(other);
    (kept, answer)
}

/// Finds the first step within `window` steps after `index` whose kind is
/// one of `outcomes`.
///
/// This is the lookahead used by extractors: the step at `index` is a
/// decision-pending step and the returned step is the outcome that was
/// actually recorded. Steps of other kinds inside the window are skipped.
pub fn outcome_within<'a, K: StepKind + PartialEq>(
    steps: &'a [Step],
    index: usize,
    window: usize,
    outcomes: &[K],
) -> Option<(&'a Step, K)> {
    steps
        .iter()
        .skip(index + 1)
        .take(window)
        .find_map(|step| {
            step.kind::<K>()
                .filter(|kind| outcomes.contains(kind))
                .map(|kind| (step, kind))
        })
}
