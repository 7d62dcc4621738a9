//! Instrumented teaching algorithms.
//!
//! Each module provides a [`TracedAlgorithm`](algotrace_core::TracedAlgorithm)
//! with its step vocabulary, prediction extractor, narrator, and a
//! `register` function adding it to an [`AlgorithmRegistry`].

pub mod binary_search;
pub mod bubble_sort;
pub mod interval_coverage;
pub mod majority_vote;
mod support;

use algotrace_core::{AlgorithmRegistry, NarrativeOracle, RegistryError};

pub use binary_search::{BinarySearch, BinarySearchNarrator};
pub use bubble_sort::{BubbleSort, BubbleSortNarrator};
pub use interval_coverage::{IntervalCoverage, IntervalCoverageNarrator};
pub use majority_vote::{MajorityVote, MajorityVoteNarrator};

/// A registry holding every algorithm in this crate, in a fixed order.
pub fn default_registry() -> Result<AlgorithmRegistry, RegistryError> {
    let mut registry = AlgorithmRegistry::new();
    binary_search::register(&mut registry)?;
    bubble_sort::register(&mut registry)?;
    majority_vote::register(&mut registry)?;
    interval_coverage::register(&mut registry)?;
    Ok(registry)
}

/// A narrative oracle with a narrator for every algorithm in [`default_registry`].
pub fn narrative_oracle() -> NarrativeOracle {
    NarrativeOracle::new()
        .with(Box::new(BinarySearchNarrator))
        .with(Box::new(BubbleSortNarrator))
        .with(Box::new(MajorityVoteNarrator))
        .with(Box::new(IntervalCoverageNarrator))
}
