//! Error types for the execution-trace framework.
//!
//! Uses `thiserror` for structured, matchable variants. Each concern gets its
//! own enum so callers can tell a caller mistake (bad input, exhausted step
//! budget) apart from a wiring mistake (registry) or an instrumentation gap
//! (narrative, see [`crate::narrative::NarrativeError`]).

use thiserror::Error;

/// Errors that abort a single algorithm run.
///
/// `InvalidInput` is produced by domain logic before or during recording and
/// is passed through the recorder untouched. `ResourceExceeded` is the only
/// failure the recorder itself raises.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TraceError {
    /// The algorithm input was malformed or violated a precondition.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// The run tried to record more steps than the configured ceiling.
    #[error("step budget exhausted: a run may record at most {limit} steps")]
    ResourceExceeded { limit: usize },
}

impl TraceError {
    /// Convenience constructor for domain-logic validation failures.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        TraceError::InvalidInput {
            message: message.into(),
        }
    }

    /// Whether this error is the caller's fault (a 4xx at an HTTP boundary).
    ///
    /// Both variants are: bad input is rejected as-is, and a step budget
    /// exhausted by a pathological input is not a server fault either.
    pub fn is_caller_error(&self) -> bool {
        match self {
            TraceError::InvalidInput { .. } | TraceError::ResourceExceeded { .. } => true,
        }
    }
}

/// Errors produced by the [`AlgorithmRegistry`](crate::registry::AlgorithmRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// An algorithm with this name was already registered.
    #[error("duplicate registration: algorithm '{name}' is already registered")]
    DuplicateRegistration { name: String },

    /// No algorithm is registered under this name.
    #[error("algorithm '{name}' not found; registered algorithms: [{}]", available.join(", "))]
    NotFound {
        name: String,
        available: Vec<String>,
    },

    /// The registration itself is malformed (empty name, no example inputs).
    #[error("invalid registration for '{name}': {reason}")]
    InvalidEntry { name: String, reason: String },

    /// An example input index past the end of the entry's example list.
    #[error("algorithm '{name}' has {count} example input(s), index {index} is out of range")]
    ExampleOutOfRange {
        name: String,
        index: usize,
        count: usize,
    },
}

/// Errors from dispatching a run through the registry.
///
/// Wraps the two layers without rewording either message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Trace(#[from] TraceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_lists_available_names() {
        let err = RegistryError::NotFound {
            name: "quick-sort".into(),
            available: vec!["binary-search".into(), "bubble-sort".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("quick-sort"));
        assert!(msg.contains("binary-search, bubble-sort"), "got: {msg}");
    }

    #[test]
    fn resource_exceeded_names_the_limit() {
        let err = TraceError::ResourceExceeded { limit: 10_000 };
        assert!(err.to_string().contains("10000"));
        assert!(err.is_caller_error());
    }

    #[test]
    fn run_error_is_transparent() {
        let inner = TraceError::invalid_input("array must be sorted");
        let err: RunError = inner.clone().into();
        assert_eq!(err.to_string(), inner.to_string());
    }
}
