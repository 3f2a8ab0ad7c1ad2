//! # Evaluator
//!
//! The contract between the search loop and problem-specific code. The
//! engine hands each candidate over as a mutable individual so the
//! evaluator can record a problem-space objective value alongside the
//! fitness it returns; the engine then stores the returned fitness and
//! marks the individual evaluated.
//!
//! Any `FnMut(&mut Individual) -> f64` closure is an evaluator:
//!
//! ```rust
//! use gramevo::evolution::Evaluator;
//! use gramevo::individual::{Individual, WORST_FITNESS};
//!
//! let mut count_a = |ind: &mut Individual| match ind.phenotype() {
//!     Some(text) => text.matches('a').count() as f64,
//!     None => WORST_FITNESS,
//! };
//! let _: &mut dyn Evaluator = &mut count_a;
//! ```

use crate::individual::Individual;

/// Scores one individual. Higher fitness is better; implementations must
/// handle unmapped individuals (no phenotype) and should score them
/// [`WORST_FITNESS`](crate::individual::WORST_FITNESS).
pub trait Evaluator {
    /// Returns the fitness, optionally recording `individual.objective`
    /// for reporting.
    fn evaluate(&mut self, individual: &mut Individual) -> f64;
}

impl<F> Evaluator for F
where
    F: FnMut(&mut Individual) -> f64,
{
    fn evaluate(&mut self, individual: &mut Individual) -> f64 {
        self(individual)
    }
}
