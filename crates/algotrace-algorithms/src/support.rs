//! Helpers shared by the algorithm modules.

use serde::de::DeserializeOwned;
use serde_json::Value;

use algotrace_core::{PredictionError, PredictionPoint, TraceError};

/// Deserializes a JSON input, turning shape errors into validation errors.
pub(crate) fn parse_input<T: DeserializeOwned>(input: &Value) -> Result<T, TraceError> {
    T::deserialize(input).map_err(|e| TraceError::invalid_input(e.to_string()))
}

/// Keeps a well-formed prediction point, logging and dropping a malformed one.
pub(crate) fn keep(point: Result<PredictionPoint, PredictionError>) -> Option<PredictionPoint> {
    point
        .inspect_err(|err| tracing::warn!(error = %err, "dropping malformed prediction point"))
        .ok()
}

/// Formats an optional bound for prose and questions.
pub(crate) fn bound_label(bound: Option<i64>) -> String {
    match bound {
        Some(bound) => bound.to_string(),
        None => "none yet".to_string(),
    }
}
