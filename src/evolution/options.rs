//! # Parameters
//!
//! The `Parameters` struct is the shared configuration record read by every
//! component of the engine: the genotype model, the population and
//! generation-loop settings, and the representation-specific operator
//! tuning.
//!
//! ## Example
//!
//! ```rust
//! use gramevo::evolution::{GenerationMethod, ModelType, Parameters};
//!
//! let params = Parameters::builder()
//!     .model(ModelType::GrammaticalEvolution)
//!     .population_size(200)
//!     .generation_count(50)
//!     .generation_method(GenerationMethod::Generational)
//!     .elitism(2.0)
//!     .build();
//! assert_eq!(params.resolved_elitism(), 2);
//! ```
//!
//! ## Elitism
//!
//! The `elitism` setting carries a dual interpretation: a value of at least
//! 1 is an absolute count of individuals carried forward unchanged, while a
//! value below 1 is a fraction of the population size.

use crate::representation::{NodeSelection, SgeMutation};

/// Which genotype representation the engine evolves.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelType {
    /// Linear wrapped codon lists (Grammatical Evolution).
    #[default]
    GrammaticalEvolution,
    /// Explicit derivation trees (Context-Free-Grammar GP).
    ContextFreeGp,
    /// Fixed-structure per-non-terminal gene arrays (Structured GE).
    StructuredGe,
}

/// How each generation of the population is produced.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationMethod {
    /// Build an entirely new population each generation: elites carried
    /// forward unchanged, the remainder bred from tournament-selected
    /// parents.
    #[default]
    Generational,
    /// Breed one pair per iteration and insert the better offspring over
    /// the worst member, `population_size` times per generation.
    SteadyState,
    /// Replace the whole population with fresh random individuals each
    /// generation; no selection, breeding or elitism.
    RandomSearch,
    /// Delegate the entire generation step to a caller-supplied iteration
    /// hook.
    Custom,
}

/// The configuration record read by every component of the engine.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct Parameters {
    /// The genotype representation to evolve.
    pub model: ModelType,

    /// The number of individuals in each generation.
    pub population_size: usize,
    /// The number of generations to run.
    pub generation_count: usize,

    /// How each generation is produced.
    pub generation_method: GenerationMethod,
    /// Elites carried forward unchanged: an absolute count if >= 1, else a
    /// fraction of `population_size`.
    pub elitism: f64,

    /// Skip re-evaluating individuals whose phenotype is unchanged since
    /// their last evaluation.
    pub cache_fitness: bool,

    /// The number of individuals drawn per selection tournament.
    pub tournament_size: usize,

    /// CFG-GP node selection policy for crossover and mutation points.
    pub node_selection: NodeSelection,
    /// Probability that breeding performs crossover rather than
    /// reproduction.
    pub crossover_rate: f64,
    /// Per-codon (GE), per-individual (CFG-GP) or per-gene/per-slot (SGE)
    /// mutation probability.
    pub mutation_rate: f64,

    /// Use depth-budgeted sensible initialisation where the representation
    /// supports it.
    pub sensible_initialisation: bool,
    /// Minimum derivation depth for sensible initialisation.
    pub init_min_depth: usize,
    /// Maximum derivation depth for initialisation.
    pub init_max_depth: usize,
    /// Random-tail length appended by GE sensible initialisation, as a
    /// fraction of the derived codon count.
    pub sensible_init_tail_length: f64,

    /// Lower bound of the random GE codon count range; `None` fixes the
    /// count at `init_codon_count`.
    pub init_codon_count_min: Option<usize>,
    /// GE codon count (the exclusive upper bound when a range is
    /// configured).
    pub init_codon_count: usize,

    /// How many times the GE read cursor may wrap during mapping.
    pub mapping_wrap_count: usize,

    /// Use the same crossover cut index in both GE parents.
    pub fixed_point_crossover: bool,

    /// Depth bound on the subtree regrown by CFG-GP mutation.
    pub maximum_mutation_depth: usize,
    /// Depth bound on any CFG-GP tree produced by the operators.
    pub maximum_tree_depth: usize,

    /// Which SGE mutation operator to apply.
    pub sge_mutation: SgeMutation,
}

impl Parameters {
    /// Returns a builder for constructing a `Parameters` instance with a
    /// fluent interface.
    pub fn builder() -> ParametersBuilder {
        ParametersBuilder::default()
    }

    /// Resolves the dual-interpretation elitism setting against the
    /// configured population size: an absolute count if >= 1, else a
    /// fraction of the population, capped at the population size.
    pub fn resolved_elitism(&self) -> usize {
        let count = if self.elitism >= 1.0 {
            self.elitism as usize
        } else {
            (self.elitism * self.population_size as f64) as usize
        };
        count.min(self.population_size)
    }
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            model: ModelType::GrammaticalEvolution,
            population_size: 100,
            generation_count: 50,
            generation_method: GenerationMethod::Generational,
            elitism: 1.0,
            cache_fitness: true,
            tournament_size: 3,
            node_selection: NodeSelection::UniformRandom,
            crossover_rate: 0.9,
            mutation_rate: 0.01,
            sensible_initialisation: false,
            init_min_depth: 2,
            init_max_depth: 6,
            sensible_init_tail_length: 0.5,
            init_codon_count_min: None,
            init_codon_count: 100,
            mapping_wrap_count: 3,
            fixed_point_crossover: false,
            maximum_mutation_depth: 4,
            maximum_tree_depth: 10,
            sge_mutation: SgeMutation::OnePerGene,
        }
    }
}

/// Builder for [`Parameters`].
#[derive(Debug, Clone, Default)]
pub struct ParametersBuilder {
    params: Parameters,
}

impl ParametersBuilder {
    /// Sets the genotype representation to evolve.
    pub fn model(mut self, value: ModelType) -> Self {
        self.params.model = value;
        self
    }

    /// Sets the number of individuals in each generation.
    pub fn population_size(mut self, value: usize) -> Self {
        self.params.population_size = value;
        self
    }

    /// Sets the number of generations to run.
    pub fn generation_count(mut self, value: usize) -> Self {
        self.params.generation_count = value;
        self
    }

    /// Sets how each generation is produced.
    pub fn generation_method(mut self, value: GenerationMethod) -> Self {
        self.params.generation_method = value;
        self
    }

    /// Sets the elitism count (>= 1) or fraction (< 1).
    pub fn elitism(mut self, value: f64) -> Self {
        self.params.elitism = value;
        self
    }

    /// Enables or disables fitness caching.
    pub fn cache_fitness(mut self, value: bool) -> Self {
        self.params.cache_fitness = value;
        self
    }

    /// Sets the tournament size.
    pub fn tournament_size(mut self, value: usize) -> Self {
        self.params.tournament_size = value;
        self
    }

    /// Sets the CFG-GP node selection policy.
    pub fn node_selection(mut self, value: NodeSelection) -> Self {
        self.params.node_selection = value;
        self
    }

    /// Sets the crossover rate.
    pub fn crossover_rate(mut self, value: f64) -> Self {
        self.params.crossover_rate = value;
        self
    }

    /// Sets the mutation rate.
    pub fn mutation_rate(mut self, value: f64) -> Self {
        self.params.mutation_rate = value;
        self
    }

    /// Enables or disables sensible initialisation.
    pub fn sensible_initialisation(mut self, value: bool) -> Self {
        self.params.sensible_initialisation = value;
        self
    }

    /// Sets the sensible initialisation depth range.
    pub fn init_depths(mut self, min: usize, max: usize) -> Self {
        self.params.init_min_depth = min;
        self.params.init_max_depth = max;
        self
    }

    /// Sets the GE sensible initialisation tail-length fraction.
    pub fn sensible_init_tail_length(mut self, value: f64) -> Self {
        self.params.sensible_init_tail_length = value;
        self
    }

    /// Sets a fixed GE codon count.
    pub fn init_codon_count(mut self, value: usize) -> Self {
        self.params.init_codon_count = value;
        self.params.init_codon_count_min = None;
        self
    }

    /// Sets a GE codon count range; initial lengths are drawn from
    /// `[min, max)`, so `max` itself is never used.
    pub fn init_codon_count_range(mut self, min: usize, max: usize) -> Self {
        self.params.init_codon_count_min = Some(min);
        self.params.init_codon_count = max;
        self
    }

    /// Sets the GE mapping wrap limit.
    pub fn mapping_wrap_count(mut self, value: usize) -> Self {
        self.params.mapping_wrap_count = value;
        self
    }

    /// Enables or disables fixed-point GE crossover.
    pub fn fixed_point_crossover(mut self, value: bool) -> Self {
        self.params.fixed_point_crossover = value;
        self
    }

    /// Sets the CFG-GP mutation regrowth depth bound.
    pub fn maximum_mutation_depth(mut self, value: usize) -> Self {
        self.params.maximum_mutation_depth = value;
        self
    }

    /// Sets the CFG-GP tree depth bound.
    pub fn maximum_tree_depth(mut self, value: usize) -> Self {
        self.params.maximum_tree_depth = value;
        self
    }

    /// Sets the SGE mutation operator.
    pub fn sge_mutation(mut self, value: SgeMutation) -> Self {
        self.params.sge_mutation = value;
        self
    }

    /// Builds the `Parameters` instance.
    pub fn build(self) -> Parameters {
        self.params
    }
}
