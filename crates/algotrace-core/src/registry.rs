//! Algorithm discovery and dispatch.
//!
//! The [`AlgorithmRegistry`] maps a stable algorithm name to a
//! [`TracerFactory`] plus UI metadata. Construct one registry at start-up,
//! register every algorithm, then share it read-only (`&AlgorithmRegistry` or
//! `Arc<AlgorithmRegistry>`) with whatever consumes it. Registration needs
//! `&mut self`, so the borrow checker keeps reads and registration apart.
//!
//! Entries keep registration order, so listings are deterministic.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::envelope::ResultEnvelope;
use crate::error::{RegistryError, RunError};
use crate::recorder::{TracedAlgorithm, TracerConfig};

/// Builds a fresh algorithm instance for one run.
///
/// The factory signature is the capability check: only types implementing
/// [`TracedAlgorithm`] can be returned.
pub type TracerFactory = fn(&TracerConfig) -> Box<dyn TracedAlgorithm>;

/// A registered algorithm.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub name: String,
    pub factory: TracerFactory,
    pub display_name: String,
    pub description: String,
    /// Never empty.
    pub example_inputs: Vec<Value>,
    /// Optional JSON Schema describing accepted inputs.
    pub input_schema: Option<Value>,
}

/// The serializable view of a [`RegistryEntry`]; the factory is never exposed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryListing {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub example_inputs: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub input_schema: Option<Value>,
}

impl From<&RegistryEntry> for RegistryListing {
    fn from(entry: &RegistryEntry) -> Self {
        RegistryListing {
            name: entry.name.clone(),
            display_name: entry.display_name.clone(),
            description: entry.description.clone(),
            example_inputs: entry.example_inputs.clone(),
            input_schema: entry.input_schema.clone(),
        }
    }
}

/// Registry of instrumented algorithms.
#[derive(Debug, Clone, Default)]
pub struct AlgorithmRegistry {
    entries: IndexMap<String, RegistryEntry>,
}

impl AlgorithmRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        AlgorithmRegistry::default()
    }

    /// Registers an algorithm under `name`.
    ///
    /// Returns [`RegistryError::DuplicateRegistration`] if the name is taken
    /// and [`RegistryError::InvalidEntry`] for an empty name or an empty
    /// example list.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: TracerFactory,
        display_name: impl Into<String>,
        description: impl Into<String>,
        example_inputs: Vec<Value>,
        input_schema: Option<Value>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return Err(RegistryError::DuplicateRegistration { name });
        }
        if name.trim().is_empty() {
            return Err(RegistryError::InvalidEntry {
                name,
                reason: "name must not be empty".into(),
            });
        }
        if example_inputs.is_empty() {
            return Err(RegistryError::InvalidEntry {
                name,
                reason: "at least one example input is required".into(),
            });
        }

        tracing::debug!(algorithm = %name, examples = example_inputs.len(), "registered algorithm");
        self.entries.insert(
            name.clone(),
            RegistryEntry {
                name,
                factory,
                display_name: display_name.into(),
                description: description.into(),
                example_inputs,
                input_schema,
            },
        );
        Ok(())
    }

    /// Returns the factory registered under `name`.
    pub fn get(&self, name: &str) -> Result<TracerFactory, RegistryError> {
        self.entry(name).map(|entry| entry.factory)
    }

    /// Returns the serializable metadata registered under `name`.
    pub fn get_metadata(&self, name: &str) -> Result<RegistryListing, RegistryError> {
        self.entry(name).map(RegistryListing::from)
    }

    /// Every registered algorithm, in registration order.
    pub fn list_all(&self) -> Vec<RegistryListing> {
        self.entries.values().map(RegistryListing::from).collect()
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns example input `index` of `name`.
    pub fn example_input(&self, name: &str, index: usize) -> Result<&Value, RegistryError> {
        let entry = self.entry(name)?;
        entry
            .example_inputs
            .get(index)
            .ok_or_else(|| RegistryError::ExampleOutOfRange {
                name: name.to_string(),
                index,
                count: entry.example_inputs.len(),
            })
    }

    /// Looks up `name`, builds a fresh instance with `config`, and runs it.
    pub fn run(
        &self,
        name: &str,
        input: &Value,
        config: &TracerConfig,
    ) -> Result<ResultEnvelope, RunError> {
        let factory = self.get(name)?;
        let algorithm = factory(config);
        Ok(algorithm.run(input)?)
    }

    fn entry(&self, name: &str) -> Result<&RegistryEntry, RegistryError> {
        self.entries.get(name).ok_or_else(|| RegistryError::NotFound {
            name: name.to_string(),
            available: self.names(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TraceError;
    use crate::prediction::{PredictionExtractor, PredictionPoint};
    use crate::recorder::{AlgorithmInfo, StepRecorder};
    use crate::step::{Step, StepKind};
    use serde_json::json;

    const INFO: AlgorithmInfo = AlgorithmInfo {
        name: "echo",
        display_name: "Echo",
        visualization_type: "array",
    };

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum EchoStep {
        Echo,
    }

    impl StepKind for EchoStep {
        const ALL: &'static [Self] = &[EchoStep::Echo];

        fn tag(self) -> &'static str {
            "ECHO"
        }
    }

    struct Echo {
        config: TracerConfig,
    }

    impl PredictionExtractor for Echo {
        fn predictions(&self, _steps: &[Step]) -> Vec<PredictionPoint> {
            Vec::new()
        }
    }

    impl TracedAlgorithm for Echo {
        fn info(&self) -> AlgorithmInfo {
            INFO
        }

        fn run(&self, input: &Value) -> Result<ResultEnvelope, TraceError> {
            let mut recorder = StepRecorder::new(self.info(), self.config.clone());
            recorder.record(EchoStep::Echo, json!({"visualization": input}), "echo")?;
            Ok(recorder.finish(input.clone(), self))
        }
    }

    fn echo_factory(config: &TracerConfig) -> Box<dyn TracedAlgorithm> {
        Box::new(Echo {
            config: config.clone(),
        })
    }

    fn registry_with(names: &[&str]) -> AlgorithmRegistry {
        let mut registry = AlgorithmRegistry::new();
        for name in names {
            registry
                .register(
                    *name,
                    echo_factory,
                    "Echo",
                    "Echoes its input",
                    vec![json!({"x": 1})],
                    None,
                )
                .unwrap();
        }
        registry
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = registry_with(&["binary-search"]);
        let err = registry
            .register("binary-search", echo_factory, "Again", "", vec![json!({})], None)
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateRegistration {
                name: "binary-search".into()
            }
        );
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get_metadata("binary-search").unwrap().display_name, "Echo");
    }

    #[test]
    fn invalid_entries_are_rejected() {
        let mut registry = AlgorithmRegistry::new();
        let err = registry
            .register("", echo_factory, "Echo", "", vec![json!({})], None)
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidEntry { .. }));

        let err = registry
            .register("echo", echo_factory, "Echo", "", Vec::new(), None)
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidEntry { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn get_unknown_lists_registered_names() {
        let registry = registry_with(&["a", "b"]);
        let err = registry.get("c").unwrap_err();
        assert_eq!(
            err,
            RegistryError::NotFound {
                name: "c".into(),
                available: vec!["a".into(), "b".into()]
            }
        );
        assert!(registry.get_metadata("c").is_err());
    }

    #[test]
    fn listing_preserves_order_and_omits_factory() {
        let registry = registry_with(&["zeta", "alpha"]);
        let names: Vec<String> = registry.list_all().into_iter().map(|l| l.name).collect();
        assert_eq!(names, ["zeta", "alpha"]);

        let json = serde_json::to_value(registry.list_all()).unwrap();
        let first = json[0].as_object().unwrap();
        assert!(!first.contains_key("factory"));
        assert!(!first.contains_key("input_schema"));
        assert_eq!(first["example_inputs"], json!([{"x": 1}]));
    }

    #[test]
    fn containment_and_count() {
        let registry = registry_with(&["a"]);
        assert!(registry.contains("a"));
        assert!(!registry.contains("b"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn example_input_bounds() {
        let registry = registry_with(&["a"]);
        assert_eq!(registry.example_input("a", 0).unwrap(), &json!({"x": 1}));
        assert!(matches!(
            registry.example_input("a", 1),
            Err(RegistryError::ExampleOutOfRange { index: 1, count: 1, .. })
        ));
    }

    #[test]
    fn run_dispatches_through_factory() {
        let registry = registry_with(&["echo"]);
        let env = registry
            .run("echo", &json!({"x": 2}), &TracerConfig::default())
            .unwrap();
        assert_eq!(env.result, json!({"x": 2}));
        assert_eq!(env.trace.total_steps, 1);

        let err = registry
            .run("missing", &json!({}), &TracerConfig::default())
            .unwrap_err();
        assert!(matches!(err, RunError::Registry(RegistryError::NotFound { .. })));
    }
}
