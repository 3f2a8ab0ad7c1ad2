//! # Evolution
//!
//! The search loop and its configuration: run [`Parameters`] with their
//! builder, the [`Evaluator`] contract, and the [`EvolutionEngine`] that
//! drives a [`Population`] through the configured generation method.

pub mod engine;
pub mod evaluator;
pub mod options;

pub use engine::{EvolutionEngine, Population};
pub use evaluator::Evaluator;
pub use options::{GenerationMethod, ModelType, Parameters, ParametersBuilder};
