//! # gramevo
//!
//! A grammar-constrained evolutionary search engine. Candidate solutions
//! are genotypes that map, through a user-supplied BNF grammar, to strings
//! of the grammar's language; a user-supplied evaluator scores those
//! strings and the engine evolves the population towards higher fitness.
//!
//! Three genotype representations are supported, selected by
//! [`ModelType`](evolution::ModelType):
//!
//! - **Grammatical evolution**: a list of integer codons consumed (with
//!   wrapping) to pick one production at each derivation step.
//! - **Context-free grammar GP**: the derivation tree itself is the
//!   genotype, bred with subtree crossover constrained to matching
//!   non-terminals.
//! - **Structured grammatical evolution**: a flat genome partitioned into
//!   one gene per non-terminal, sized from the grammar so every derivation
//!   step has its own slot. Requires a non-recursive grammar.
//!
//! ## Example
//!
//! Evolve strings of the language `a* b`, rewarding long runs of `a`:
//!
//! ```rust
//! use gramevo::evolution::{EvolutionEngine, Parameters};
//! use gramevo::grammar::Grammar;
//! use gramevo::individual::{Individual, WORST_FITNESS};
//! use gramevo::rng::RandomNumberGenerator;
//!
//! let grammar = Grammar::parse("<S> ::= a <S> | b")?;
//! let params = Parameters::builder()
//!     .population_size(50)
//!     .generation_count(20)
//!     .build();
//!
//! let evaluator = |ind: &mut Individual| match ind.phenotype() {
//!     Some(text) => {
//!         let count = text.matches('a').count() as f64;
//!         ind.objective = count;
//!         count
//!     }
//!     None => WORST_FITNESS,
//! };
//!
//! let mut rng = RandomNumberGenerator::from_seed(42);
//! let mut engine = EvolutionEngine::new(params, &grammar, evaluator);
//! let population = engine.run(&mut rng)?;
//!
//! let best = population.best().unwrap();
//! println!("best: {:?} (fitness {})", best.phenotype(), best.fitness);
//! # Ok::<(), gramevo::error::EvolveError>(())
//! ```

pub mod derivation;
pub mod error;
pub mod evolution;
pub mod grammar;
pub mod individual;
pub mod mapping;
pub mod representation;
pub mod rng;

pub use error::{EvolveError, Result};
pub use evolution::{EvolutionEngine, GenerationMethod, ModelType, Parameters, Population};
pub use grammar::Grammar;
pub use individual::{Individual, WORST_FITNESS};
