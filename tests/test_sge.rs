//! End-to-end runs of the structured (SGE) model.

use gramevo::error::EvolveError;
use gramevo::evolution::{EvolutionEngine, ModelType, Parameters};
use gramevo::grammar::Grammar;
use gramevo::individual::{Individual, WORST_FITNESS};
use gramevo::representation::{GeneSizes, Genome, SgeMutation};
use gramevo::rng::RandomNumberGenerator;

// Non-recursive: every derivation terminates, so gene sizes are finite.
fn layered_grammar() -> Grammar {
    Grammar::parse(
        "<word> ::= <syll> <syll> | <syll>\n\
         <syll> ::= <cons> <vowel> | <vowel>\n\
         <cons> ::= b | d | g\n\
         <vowel> ::= a | o",
    )
    .unwrap()
}

fn score_length(ind: &mut Individual) -> f64 {
    match ind.phenotype() {
        Some(text) => text.len() as f64,
        None => WORST_FITNESS,
    }
}

fn params() -> Parameters {
    Parameters::builder()
        .model(ModelType::StructuredGe)
        .population_size(30)
        .generation_count(10)
        .build()
}

#[test]
fn test_recursive_grammar_is_a_fatal_configuration_error() {
    let grammar = Grammar::parse("<S> ::= a <S> | b").unwrap();
    let mut rng = RandomNumberGenerator::from_seed(1);
    let mut engine = EvolutionEngine::new(params(), &grammar, score_length);
    assert!(matches!(
        engine.run(&mut rng),
        Err(EvolveError::RecursiveGrammar(_))
    ));
}

#[test]
fn test_every_individual_is_always_mapped() {
    let grammar = layered_grammar();
    let mut rng = RandomNumberGenerator::from_seed(5);
    let mut engine = EvolutionEngine::new(params(), &grammar, score_length);
    let pop = engine.run(&mut rng).unwrap();
    // structured mapping cannot fail on a non-recursive grammar
    assert!(pop.members().iter().all(|i| i.mapped));
}

#[test]
fn test_gene_layout_survives_breeding() {
    let grammar = layered_grammar();
    let sizes = GeneSizes::compute(&grammar).unwrap();
    let mut rng = RandomNumberGenerator::from_seed(11);
    let mut engine = EvolutionEngine::new(params(), &grammar, score_length)
        .after_generation(move |gen, members| {
            for ind in members {
                let Genome::Structured(genome) = &ind.genome else {
                    panic!("structured genome expected");
                };
                assert_eq!(genome.gene_offset().len(), grammar_gene_count(), "generation {gen}");
                // consumption recorded by the last mapping never exceeds
                // the allocated slots of any gene
                for (i, &consumed) in genome.gene_size().iter().enumerate() {
                    assert!(
                        consumed <= sizes.sizes()[i],
                        "generation {gen}: gene {i} consumed {consumed} of {}",
                        sizes.sizes()[i]
                    );
                }
            }
        });
    engine.run(&mut rng).unwrap();
}

fn grammar_gene_count() -> usize {
    layered_grammar().len()
}

#[test]
fn test_both_mutation_policies_run() {
    let grammar = layered_grammar();
    for policy in [SgeMutation::OnePerGene, SgeMutation::PerSlot] {
        let params = Parameters::builder()
            .model(ModelType::StructuredGe)
            .population_size(20)
            .generation_count(5)
            .sge_mutation(policy)
            .mutation_rate(0.2)
            .build();
        let mut rng = RandomNumberGenerator::from_seed(17);
        let mut engine = EvolutionEngine::new(params, &grammar, score_length);
        let pop = engine.run(&mut rng).unwrap();
        assert_eq!(pop.len(), 20);
    }
}

#[test]
fn test_best_fitness_never_regresses_with_elitism() {
    let grammar = layered_grammar();
    let mut history: Vec<f64> = Vec::new();
    let mut rng = RandomNumberGenerator::from_seed(23);
    let mut engine = EvolutionEngine::new(params(), &grammar, score_length)
        .after_generation(|_gen, members| history.push(members[0].fitness));
    engine.run(&mut rng).unwrap();
    drop(engine);

    for pair in history.windows(2) {
        assert!(pair[1] >= pair[0]);
    }
}
