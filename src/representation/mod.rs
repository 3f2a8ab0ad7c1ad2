//! # Genotype Representations
//!
//! The three genotype encodings supported by the engine, each with its own
//! grammar-driven mapping algorithm and genetic operators:
//!
//! - [`codon_list`] - linear wrapped codon lists (Grammatical Evolution);
//! - [`tree`] - explicit derivation trees (Context-Free-Grammar GP);
//! - [`structured`] - fixed-structure per-non-terminal gene arrays
//!   (Structured GE).
//!
//! An individual owns exactly one [`Genome`] variant; all
//! representation-specific dispatch happens once, at the individual
//! boundary, never at the call sites above it.

pub mod codon_list;
pub mod structured;
pub mod tree;

pub use codon_list::CodonList;
pub use structured::{GeneSizes, SgeMutation, StructuredGenome};
pub use tree::NodeSelection;

use crate::derivation::DerivationNode;

/// The closed set of genotype variants. The active variant matches the
/// configured model type for the lifetime of the individual.
#[derive(Debug, Clone, PartialEq)]
pub enum Genome {
    /// A linear wrapped codon list (GE).
    CodonList(CodonList),
    /// A derivation tree, absent until initialised (CFG-GP).
    Tree(Option<DerivationNode>),
    /// A flat per-non-terminal gene array (SGE).
    Structured(StructuredGenome),
}
