//! # Individual
//!
//! An individual owns exactly one genotype variant, one mapping buffer and
//! its cached evaluation state. Its lifecycle is: created empty →
//! initialised (genotype populated, then mapped) → evaluated (fitness and
//! objective set by the caller's evaluator) → possibly cloned into offspring
//! → dropped. All representation-specific dispatch happens here, once per
//! operation.

use std::cmp::Ordering;

use crate::derivation::DerivationNode;
use crate::error::Result;
use crate::evolution::{ModelType, Parameters};
use crate::grammar::Grammar;
use crate::mapping::Mapping;
use crate::representation::{tree, CodonList, GeneSizes, Genome, StructuredGenome};
use crate::rng::RandomSource;

/// The fitness assigned to individuals that have not been evaluated or
/// could not be mapped. Higher fitness is always preferred.
pub const WORST_FITNESS: f64 = f64::NEG_INFINITY;

/// One candidate solution: a genotype, its mapped phenotype and the cached
/// evaluation state.
#[derive(Debug, Clone)]
pub struct Individual {
    /// The owned genotype variant, matching the configured model.
    pub genome: Genome,
    /// The phenotype buffer written by the most recent mapping.
    pub mapping: Mapping,
    /// True if the most recent mapping completed.
    pub mapped: bool,
    /// True if `fitness` and `objective` reflect the current phenotype.
    pub evaluated: bool,
    /// The evaluator-assigned fitness; higher is better.
    pub fitness: f64,
    /// The evaluator-assigned objective value, in problem-specific units,
    /// used for reporting.
    pub objective: f64,
}

impl Individual {
    /// Creates an empty individual whose genotype variant matches the
    /// configured model.
    pub fn new(params: &Parameters) -> Self {
        let genome = match params.model {
            ModelType::GrammaticalEvolution => Genome::CodonList(CodonList::new()),
            ModelType::ContextFreeGp => Genome::Tree(None),
            ModelType::StructuredGe => Genome::Structured(StructuredGenome::new()),
        };
        Self {
            genome,
            mapping: Mapping::new(),
            mapped: false,
            evaluated: false,
            fitness: WORST_FITNESS,
            objective: 0.0,
        }
    }

    /// Populates the genotype via the representation's random (or sensible,
    /// where supported) initialiser, maps it, and resets the cached
    /// evaluation state to unevaluated, worst-possible fitness.
    ///
    /// For the structured representation, the per-grammar gene-size table is
    /// taken from `gene_sizes` or computed on the spot; computing it fails
    /// on a recursive grammar. The depth-bounded initialisers fail on a
    /// start symbol with no finite derivation.
    pub fn init<R: RandomSource>(
        &mut self,
        params: &Parameters,
        grammar: &Grammar,
        gene_sizes: Option<&GeneSizes>,
        rng: &mut R,
    ) -> Result<()> {
        match &mut self.genome {
            Genome::CodonList(list) => {
                if params.sensible_initialisation {
                    list.sensible_init(
                        grammar,
                        params.init_min_depth,
                        params.init_max_depth,
                        params.sensible_init_tail_length,
                        rng,
                    )?;
                } else {
                    let length = match params.init_codon_count_min {
                        None => params.init_codon_count,
                        Some(min) => {
                            let span = params.init_codon_count.saturating_sub(min);
                            min + rng.below(span)
                        }
                    };
                    list.random_init(length, rng);
                }
            }
            Genome::Tree(slot) => {
                let tree = if params.sensible_initialisation {
                    tree::sensible_init(grammar, params.init_min_depth, params.init_max_depth, rng)?
                } else {
                    tree::random_init(grammar, params.init_max_depth, rng)?
                };
                *slot = Some(tree);
            }
            Genome::Structured(genome) => match gene_sizes {
                Some(sizes) => genome.random_init(grammar, sizes, rng),
                None => {
                    let sizes = GeneSizes::compute(grammar)?;
                    genome.random_init(grammar, &sizes, rng);
                }
            },
        }

        self.map(params, grammar);
        self.evaluated = false;
        self.fitness = WORST_FITNESS;
        Ok(())
    }

    /// Maps the genotype to its phenotype, rewriting the mapping buffer and
    /// the `mapped` flag. Idempotent: re-mapping identical genome content
    /// yields byte-identical buffer content.
    pub fn map(&mut self, params: &Parameters, grammar: &Grammar) -> bool {
        self.mapped = match &mut self.genome {
            Genome::CodonList(list) => {
                list.map(grammar, &mut self.mapping, params.mapping_wrap_count)
            }
            Genome::Tree(slot) => match slot {
                Some(tree) => tree::map(tree, &mut self.mapping),
                None => {
                    self.mapping.reset();
                    false
                }
            },
            Genome::Structured(genome) => genome.map(grammar, &mut self.mapping),
        };
        self.mapped
    }

    /// Builds the derivation tree of the current genotype, or `None` when
    /// the genotype does not derive completely (a GE wrap failure or an
    /// uninitialised tree).
    pub fn derive(&self, params: &Parameters, grammar: &Grammar) -> Option<DerivationNode> {
        match &self.genome {
            Genome::CodonList(list) => list.derive(grammar, params.mapping_wrap_count),
            Genome::Tree(slot) => slot.clone(),
            Genome::Structured(genome) => Some(genome.derive(grammar)),
        }
    }

    /// The mapped phenotype text, or `None` for an unmapped individual.
    pub fn phenotype(&self) -> Option<&str> {
        if self.mapped {
            Some(self.mapping.as_str())
        } else {
            None
        }
    }

    /// Asexual reproduction: a deep copy of the parent's genotype, mapping
    /// and cached state.
    pub fn reproduce_from(&mut self, parent: &Individual) {
        self.clone_from(parent);
    }

    /// Sexual breeding: produces two children from two parents via the
    /// representation-specific operators. When the representation reports
    /// that no recombination happened, the parents' cached mapping and
    /// evaluation state is propagated onto the corresponding child: its
    /// phenotype is identical, so re-deriving it would be wasted work.
    /// Otherwise the children are left unmapped and unevaluated for the
    /// caller to map and evaluate.
    pub fn breed<R: RandomSource>(
        params: &Parameters,
        grammar: &Grammar,
        mother: &Individual,
        father: &Individual,
        daughter: &mut Individual,
        son: &mut Individual,
        rng: &mut R,
    ) {
        let cloned = match (
            &mother.genome,
            &father.genome,
            &mut daughter.genome,
            &mut son.genome,
        ) {
            (Genome::CodonList(m), Genome::CodonList(f), Genome::CodonList(d), Genome::CodonList(s)) => {
                CodonList::breed(
                    m,
                    f,
                    d,
                    s,
                    params.fixed_point_crossover,
                    params.crossover_rate,
                    params.mutation_rate,
                    rng,
                )
            }
            (Genome::Tree(Some(m)), Genome::Tree(Some(f)), Genome::Tree(d), Genome::Tree(s)) => {
                tree::breed(
                    grammar,
                    m,
                    f,
                    d,
                    s,
                    params.maximum_mutation_depth,
                    params.maximum_tree_depth,
                    params.node_selection,
                    params.crossover_rate,
                    params.mutation_rate,
                    rng,
                )
            }
            (Genome::Structured(m), Genome::Structured(f), Genome::Structured(d), Genome::Structured(s)) => {
                StructuredGenome::breed(
                    grammar,
                    m,
                    f,
                    d,
                    s,
                    params.sge_mutation,
                    params.crossover_rate,
                    params.mutation_rate,
                    rng,
                )
            }
            _ => unreachable!("parents and children must share one genome variant"),
        };

        if cloned {
            daughter.mapping.clone_from(&mother.mapping);
            daughter.mapped = mother.mapped;
            daughter.evaluated = mother.evaluated;
            daughter.fitness = mother.fitness;
            daughter.objective = mother.objective;

            son.mapping.clone_from(&father.mapping);
            son.mapped = father.mapped;
            son.evaluated = father.evaluated;
            son.fitness = father.fitness;
            son.objective = father.objective;
        } else {
            daughter.mapped = false;
            daughter.evaluated = false;
            daughter.fitness = WORST_FITNESS;
            son.mapped = false;
            son.evaluated = false;
            son.fitness = WORST_FITNESS;
        }
    }

    /// Ranking comparator: `Less` means `a` ranks ahead of `b`. Mapped
    /// individuals always rank ahead of unmapped ones regardless of their
    /// numeric fitness; among equals, higher fitness ranks first and NaN
    /// ranks last.
    pub fn compare_rank(a: &Individual, b: &Individual) -> Ordering {
        match (a.mapped, b.mapped) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => b.fitness.partial_cmp(&a.fitness).unwrap_or_else(|| {
                if a.fitness.is_nan() && b.fitness.is_nan() {
                    Ordering::Equal
                } else if a.fitness.is_nan() {
                    Ordering::Greater
                } else {
                    Ordering::Less
                }
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evolution::Parameters;
    use crate::rng::RandomNumberGenerator;

    fn ge_params() -> Parameters {
        Parameters::builder().init_codon_count(20).build()
    }

    fn simple_grammar() -> Grammar {
        Grammar::parse("<S> ::= a <S> | b").unwrap()
    }

    #[test]
    fn test_new_matches_model() {
        let params = Parameters::builder().model(ModelType::ContextFreeGp).build();
        let ind = Individual::new(&params);
        assert!(matches!(ind.genome, Genome::Tree(None)));
        assert!(!ind.mapped);
        assert_eq!(ind.fitness, WORST_FITNESS);
    }

    #[test]
    fn test_init_maps_and_resets_state() {
        let params = ge_params();
        let g = simple_grammar();
        let mut rng = RandomNumberGenerator::from_seed(3);
        let mut ind = Individual::new(&params);
        ind.init(&params, &g, None, &mut rng).unwrap();
        assert!(!ind.evaluated);
        assert_eq!(ind.fitness, WORST_FITNESS);
        if ind.mapped {
            assert!(!ind.mapping.is_empty());
        }
    }

    #[test]
    fn test_codon_count_range_upper_bound_is_exclusive() {
        let params = Parameters::builder().init_codon_count_range(5, 8).build();
        let g = simple_grammar();
        let mut rng = RandomNumberGenerator::from_seed(11);
        for _ in 0..200 {
            let mut ind = Individual::new(&params);
            ind.init(&params, &g, None, &mut rng).unwrap();
            let Genome::CodonList(list) = &ind.genome else {
                panic!("codon list genome expected");
            };
            assert!((5..8).contains(&list.len()), "length {}", list.len());
        }
    }

    #[test]
    fn test_reproduce_is_deep_copy() {
        let params = ge_params();
        let g = simple_grammar();
        let mut rng = RandomNumberGenerator::from_seed(5);
        let mut parent = Individual::new(&params);
        parent.init(&params, &g, None, &mut rng).unwrap();
        parent.fitness = 0.75;
        parent.evaluated = true;

        let mut child = Individual::new(&params);
        child.reproduce_from(&parent);
        assert_eq!(child.fitness, 0.75);
        assert_eq!(child.mapping.as_str(), parent.mapping.as_str());

        // mutating the child leaves the parent untouched, and vice versa
        let before = match &parent.genome {
            Genome::CodonList(list) => list.codons().to_vec(),
            _ => unreachable!(),
        };
        if let Genome::CodonList(list) = &mut child.genome {
            list.mutate(1.0, &mut rng);
        }
        if let Genome::CodonList(list) = &parent.genome {
            assert_eq!(list.codons(), before.as_slice());
        }
    }

    #[test]
    fn test_breed_propagates_cached_state_on_clone() {
        let mut params = ge_params();
        params.crossover_rate = 0.0;
        params.mutation_rate = 0.0;
        let g = simple_grammar();
        let mut rng = RandomNumberGenerator::from_seed(7);

        let mut mother = Individual::new(&params);
        mother.init(&params, &g, None, &mut rng).unwrap();
        mother.fitness = 0.9;
        mother.objective = 1.5;
        mother.evaluated = true;

        let mut father = Individual::new(&params);
        father.init(&params, &g, None, &mut rng).unwrap();
        father.fitness = 0.4;
        father.objective = 3.0;
        father.evaluated = true;

        let mut daughter = Individual::new(&params);
        let mut son = Individual::new(&params);
        Individual::breed(&params, &g, &mother, &father, &mut daughter, &mut son, &mut rng);

        assert!(daughter.evaluated);
        assert_eq!(daughter.fitness, 0.9);
        assert_eq!(daughter.objective, 1.5);
        assert_eq!(daughter.mapping.as_str(), mother.mapping.as_str());
        assert!(son.evaluated);
        assert_eq!(son.fitness, 0.4);
        assert_eq!(son.objective, 3.0);
    }

    #[test]
    fn test_breed_resets_state_on_recombination() {
        let mut params = ge_params();
        params.crossover_rate = 1.0;
        params.mutation_rate = 0.0;
        let g = simple_grammar();
        let mut rng = RandomNumberGenerator::from_seed(11);

        let mut mother = Individual::new(&params);
        mother.init(&params, &g, None, &mut rng).unwrap();
        mother.fitness = 0.9;
        mother.evaluated = true;
        let mut father = Individual::new(&params);
        father.init(&params, &g, None, &mut rng).unwrap();
        father.fitness = 0.4;
        father.evaluated = true;

        let mut daughter = Individual::new(&params);
        let mut son = Individual::new(&params);
        Individual::breed(&params, &g, &mother, &father, &mut daughter, &mut son, &mut rng);

        assert!(!daughter.evaluated);
        assert_eq!(daughter.fitness, WORST_FITNESS);
        assert!(!son.evaluated);
    }

    #[test]
    fn test_compare_rank_unmapped_always_worst() {
        let params = ge_params();
        let mut good = Individual::new(&params);
        good.mapped = true;
        good.fitness = 0.1;

        let mut unmapped = Individual::new(&params);
        unmapped.mapped = false;
        unmapped.fitness = 100.0; // numeric fitness must not matter

        assert_eq!(
            Individual::compare_rank(&good, &unmapped),
            Ordering::Less
        );
        assert_eq!(
            Individual::compare_rank(&unmapped, &good),
            Ordering::Greater
        );
    }

    #[test]
    fn test_compare_rank_orders_by_fitness() {
        let params = ge_params();
        let mut a = Individual::new(&params);
        a.mapped = true;
        a.fitness = 0.9;
        let mut b = Individual::new(&params);
        b.mapped = true;
        b.fitness = 0.2;

        assert_eq!(Individual::compare_rank(&a, &b), Ordering::Less);
        assert_eq!(Individual::compare_rank(&b, &a), Ordering::Greater);

        b.fitness = f64::NAN;
        assert_eq!(Individual::compare_rank(&a, &b), Ordering::Less);
    }
}
