//! # Error Types
//!
//! This module defines the error types used throughout the library.
//!
//! Note that a *mapping failure* (a codon list exhausting its wrap budget
//! before the derivation completes) is deliberately **not** an error: it is a
//! recoverable, per-individual condition recorded on the individual's
//! `mapped` flag and surfaced through its worst-possible fitness. The error
//! types here cover the conditions that genuinely stop a run, such as a
//! malformed grammar or a recursive grammar handed to the structured (SGE)
//! representation.
//!
//! ## Examples
//!
//! ```rust
//! use gramevo::error::{EvolveError, Result};
//!
//! fn check_population_size(n: usize) -> Result<()> {
//!     if n == 0 {
//!         return Err(EvolveError::Configuration(
//!             "population size cannot be zero".to_string(),
//!         ));
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Represents errors that can occur while configuring or running a
/// grammar-guided evolutionary search.
#[derive(Error, Debug)]
pub enum EvolveError {
    /// Error that occurs when an invalid configuration is provided.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Error that occurs when BNF text cannot be parsed into a grammar, or
    /// when a production references an undefined non-terminal.
    #[error("Grammar error: {0}")]
    Grammar(String),

    /// Error that occurs when a recursive grammar is supplied to the
    /// structured (SGE) representation. SGE's gene sizing relies on a finite
    /// upper bound on non-terminal occurrences, which only exists for
    /// non-recursive grammars.
    #[error(
        "Recursive grammar: {0}. The structured (SGE) representation requires a \
         non-recursive grammar; convert the grammar into a non-recursive \
         alternative before use"
    )]
    RecursiveGrammar(String),

    /// Error that occurs when an empty population is encountered.
    #[error("Empty population error: cannot operate on an empty population")]
    EmptyPopulation,
}

/// A specialized Result type for grammar-guided evolution operations.
///
/// This type is a convenience wrapper around `std::result::Result` with the
/// error type fixed to `EvolveError`.
pub type Result<T> = std::result::Result<T, EvolveError>;
