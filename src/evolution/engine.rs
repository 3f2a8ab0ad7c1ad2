//! # Engine
//!
//! The generation loop. An [`EvolutionEngine`] owns the run parameters and
//! the evaluator, borrows the grammar, and drives a [`Population`] through
//! initialise → evaluate → breed cycles until the configured number of
//! generations has elapsed (or a custom iteration hook stops the run).
//!
//! ```rust
//! use gramevo::evolution::{EvolutionEngine, Parameters};
//! use gramevo::grammar::Grammar;
//! use gramevo::individual::{Individual, WORST_FITNESS};
//! use gramevo::rng::RandomNumberGenerator;
//!
//! let grammar = Grammar::parse("<S> ::= a <S> | b").unwrap();
//! let params = Parameters::builder()
//!     .population_size(20)
//!     .generation_count(5)
//!     .build();
//! let longest_a_run = |ind: &mut Individual| match ind.phenotype() {
//!     Some(text) => text.matches('a').count() as f64,
//!     None => WORST_FITNESS,
//! };
//! let mut rng = RandomNumberGenerator::from_seed(42);
//! let mut engine = EvolutionEngine::new(params, &grammar, longest_a_run);
//! let final_population = engine.run(&mut rng).unwrap();
//! assert!(final_population.best().is_some());
//! ```

use std::cmp::Ordering;

use tracing::debug;

use crate::error::{EvolveError, Result};
use crate::evolution::evaluator::Evaluator;
use crate::evolution::options::{GenerationMethod, ModelType, Parameters};
use crate::grammar::Grammar;
use crate::individual::{Individual, WORST_FITNESS};
use crate::representation::GeneSizes;
use crate::rng::RandomSource;

/// An ordered collection of individuals. After [`sort`](Population::sort)
/// the best-ranked individual sits at index 0.
#[derive(Debug, Clone, Default)]
pub struct Population {
    members: Vec<Individual>,
}

impl Population {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            members: Vec::with_capacity(capacity),
        }
    }

    pub fn members(&self) -> &[Individual] {
        &self.members
    }

    pub fn members_mut(&mut self) -> &mut [Individual] {
        &mut self.members
    }

    pub fn push(&mut self, individual: Individual) {
        self.members.push(individual);
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Sorts best-first. The sort is stable, so equally-fit individuals
    /// keep their relative order across generations.
    pub fn sort(&mut self) {
        self.members.sort_by(Individual::compare_rank);
    }

    /// The best-ranked individual, regardless of sort order.
    pub fn best(&self) -> Option<&Individual> {
        self.members.iter().min_by(|a, b| Individual::compare_rank(a, b))
    }

    /// The index of the worst-ranked individual, regardless of sort order.
    pub fn worst_index(&self) -> usize {
        let mut worst = 0;
        for i in 1..self.members.len() {
            if Individual::compare_rank(&self.members[i], &self.members[worst])
                == Ordering::Greater
            {
                worst = i;
            }
        }
        worst
    }

    /// Tournament selection: draws `size` members uniformly with
    /// replacement and returns the index of the best-ranked draw. With
    /// `size` 1 this is uniform random selection.
    pub fn tournament<R: RandomSource>(&self, size: usize, rng: &mut R) -> usize {
        let mut best = rng.below(self.members.len());
        for _ in 1..size {
            let challenger = rng.below(self.members.len());
            if Individual::compare_rank(&self.members[challenger], &self.members[best])
                == Ordering::Less
            {
                best = challenger;
            }
        }
        best
    }
}

type GenerationHook<'a> = Box<dyn FnMut(usize, &[Individual]) + 'a>;
type IterationHook<'a> = Box<
    dyn FnMut(&Parameters, &Grammar, &mut dyn Evaluator, &mut Population, &mut Population) -> bool
        + 'a,
>;

/// Drives the evolutionary search.
pub struct EvolutionEngine<'a, E> {
    params: Parameters,
    grammar: &'a Grammar,
    evaluator: E,
    before_generation: Option<GenerationHook<'a>>,
    after_generation: Option<GenerationHook<'a>>,
    iteration: Option<IterationHook<'a>>,
}

impl<'a, E: Evaluator> EvolutionEngine<'a, E> {
    pub fn new(params: Parameters, grammar: &'a Grammar, evaluator: E) -> Self {
        Self {
            params,
            grammar,
            evaluator,
            before_generation: None,
            after_generation: None,
            iteration: None,
        }
    }

    /// Registers a callback invoked before each generation's breeding step,
    /// with the generation index and the current (sorted) population.
    pub fn before_generation(mut self, hook: impl FnMut(usize, &[Individual]) + 'a) -> Self {
        self.before_generation = Some(Box::new(hook));
        self
    }

    /// Registers a callback invoked after each generation, with the
    /// generation index and the new (sorted) population.
    pub fn after_generation(mut self, hook: impl FnMut(usize, &[Individual]) + 'a) -> Self {
        self.after_generation = Some(Box::new(hook));
        self
    }

    /// Registers the per-generation hook used by
    /// [`GenerationMethod::Custom`]. The hook receives the current
    /// population and an empty successor population; if it leaves the
    /// successor non-empty the engine adopts it as the next generation,
    /// otherwise the current population carries over. Returning `false`
    /// ends the run after the current generation.
    pub fn iteration(
        mut self,
        hook: impl FnMut(&Parameters, &Grammar, &mut dyn Evaluator, &mut Population, &mut Population) -> bool
            + 'a,
    ) -> Self {
        self.iteration = Some(Box::new(hook));
        self
    }

    /// Runs the configured number of generations and returns the final
    /// population, sorted best-first.
    ///
    /// Fails fast, before any individual is created, on an invalid
    /// configuration or (for the structured model) a recursive grammar.
    pub fn run<R: RandomSource>(&mut self, rng: &mut R) -> Result<Population> {
        validate(&self.params, self.iteration.is_some())?;

        let params = &self.params;
        let grammar = self.grammar;
        let evaluator = &mut self.evaluator;

        let gene_sizes = match params.model {
            ModelType::StructuredGe => Some(GeneSizes::compute(grammar)?),
            _ => None,
        };

        let mut pop = Population::with_capacity(params.population_size);
        for _ in 0..params.population_size {
            let mut ind = Individual::new(params);
            ind.init(params, grammar, gene_sizes.as_ref(), rng)?;
            evaluate(params, evaluator, &mut ind);
            pop.push(ind);
        }
        pop.sort();

        for generation in 0..params.generation_count {
            if let Some(hook) = self.before_generation.as_mut() {
                hook(generation, pop.members());
            }

            let mut stop = false;
            match params.generation_method {
                GenerationMethod::Generational => {
                    pop = generational_step(params, grammar, evaluator, &pop, rng);
                }
                GenerationMethod::SteadyState => {
                    steady_state_step(params, grammar, evaluator, &mut pop, rng);
                }
                GenerationMethod::RandomSearch => {
                    pop = random_search_step(params, grammar, evaluator, gene_sizes.as_ref(), rng)?;
                }
                GenerationMethod::Custom => {
                    let Some(hook) = self.iteration.as_mut() else {
                        return Err(EvolveError::Configuration(
                            "custom generation method requires an iteration hook".into(),
                        ));
                    };
                    let mut next = Population::with_capacity(params.population_size);
                    let keep_going =
                        hook(params, grammar, &mut *evaluator, &mut pop, &mut next);
                    if !next.is_empty() {
                        pop = next;
                    }
                    stop = !keep_going;
                }
            }
            pop.sort();

            let best_fitness = pop.best().map(|b| b.fitness).unwrap_or(WORST_FITNESS);
            let invalid = pop.members().iter().filter(|i| !i.mapped).count();
            debug!(generation, best_fitness, invalid, "generation complete");

            if let Some(hook) = self.after_generation.as_mut() {
                hook(generation, pop.members());
            }
            if stop {
                break;
            }
        }

        Ok(pop)
    }
}

fn validate(params: &Parameters, has_iteration: bool) -> Result<()> {
    if params.population_size == 0 {
        return Err(EvolveError::EmptyPopulation);
    }
    if params.tournament_size == 0 {
        return Err(EvolveError::Configuration(
            "tournament_size must be at least 1".into(),
        ));
    }
    if !(0.0..=1.0).contains(&params.crossover_rate) {
        return Err(EvolveError::Configuration(format!(
            "crossover_rate must lie in [0, 1], got {}",
            params.crossover_rate
        )));
    }
    if !(0.0..=1.0).contains(&params.mutation_rate) {
        return Err(EvolveError::Configuration(format!(
            "mutation_rate must lie in [0, 1], got {}",
            params.mutation_rate
        )));
    }
    if params.init_max_depth < params.init_min_depth {
        return Err(EvolveError::Configuration(format!(
            "init_max_depth ({}) must not be below init_min_depth ({})",
            params.init_max_depth, params.init_min_depth
        )));
    }
    if let Some(min) = params.init_codon_count_min {
        if min > params.init_codon_count {
            return Err(EvolveError::Configuration(format!(
                "init_codon_count_min ({min}) exceeds init_codon_count ({})",
                params.init_codon_count
            )));
        }
    }
    if matches!(params.generation_method, GenerationMethod::Custom) && !has_iteration {
        return Err(EvolveError::Configuration(
            "custom generation method requires an iteration hook".into(),
        ));
    }
    Ok(())
}

fn evaluate<E: Evaluator>(params: &Parameters, evaluator: &mut E, ind: &mut Individual) {
    if !params.cache_fitness || !ind.evaluated {
        ind.fitness = evaluator.evaluate(ind);
        ind.evaluated = true;
    }
}

/// Maps a freshly bred child if its genotype changed, then scores it.
fn finish<E: Evaluator>(
    params: &Parameters,
    grammar: &Grammar,
    evaluator: &mut E,
    child: &mut Individual,
) {
    if !child.evaluated {
        child.map(params, grammar);
    }
    evaluate(params, evaluator, child);
}

/// One generational step: elites are copied over unchanged, then the rest
/// of the next generation is bred from tournament-selected parents.
fn generational_step<E: Evaluator, R: RandomSource>(
    params: &Parameters,
    grammar: &Grammar,
    evaluator: &mut E,
    pop: &Population,
    rng: &mut R,
) -> Population {
    let size = params.population_size;
    let mut next = Population::with_capacity(size);

    let elites = params.resolved_elitism().min(pop.len());
    for member in &pop.members()[..elites] {
        next.push(member.clone());
    }

    while next.len() < size {
        let mother = &pop.members()[pop.tournament(params.tournament_size, rng)];
        let father = &pop.members()[pop.tournament(params.tournament_size, rng)];
        let mut daughter = Individual::new(params);
        let mut son = Individual::new(params);
        Individual::breed(params, grammar, mother, father, &mut daughter, &mut son, rng);
        for mut child in [daughter, son] {
            if next.len() < size {
                finish(params, grammar, evaluator, &mut child);
                next.push(child);
            }
        }
    }
    next
}

/// One steady-state step: `population_size` times, breeds two children from
/// tournament-selected parents and writes the better one over the current
/// worst member.
fn steady_state_step<E: Evaluator, R: RandomSource>(
    params: &Parameters,
    grammar: &Grammar,
    evaluator: &mut E,
    pop: &mut Population,
    rng: &mut R,
) {
    for _ in 0..params.population_size {
        let mother = pop.tournament(params.tournament_size, rng);
        let father = pop.tournament(params.tournament_size, rng);
        let mut daughter = Individual::new(params);
        let mut son = Individual::new(params);
        Individual::breed(
            params,
            grammar,
            &pop.members()[mother],
            &pop.members()[father],
            &mut daughter,
            &mut son,
            rng,
        );
        finish(params, grammar, evaluator, &mut daughter);
        finish(params, grammar, evaluator, &mut son);

        let winner = if Individual::compare_rank(&daughter, &son) != Ordering::Greater {
            daughter
        } else {
            son
        };
        let worst = pop.worst_index();
        pop.members_mut()[worst] = winner;
    }
}

/// One random-search step: replaces the whole population with freshly
/// initialised individuals. No member survives a generation, elite or not.
fn random_search_step<E: Evaluator, R: RandomSource>(
    params: &Parameters,
    grammar: &Grammar,
    evaluator: &mut E,
    gene_sizes: Option<&GeneSizes>,
    rng: &mut R,
) -> Result<Population> {
    let size = params.population_size;
    let mut next = Population::with_capacity(size);
    while next.len() < size {
        let mut ind = Individual::new(params);
        ind.init(params, grammar, gene_sizes, rng)?;
        evaluate(params, evaluator, &mut ind);
        next.push(ind);
    }
    Ok(next)
}
