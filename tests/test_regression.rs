//! A small symbolic-regression consumer exercising the whole pipeline:
//! grammar parsing and extension, mapping, evaluation and the generation
//! loop, the way a real application would wire them together.

use gramevo::evolution::{EvolutionEngine, Parameters};
use gramevo::grammar::Grammar;
use gramevo::individual::{Individual, WORST_FITNESS};
use gramevo::rng::RandomNumberGenerator;

fn expression_grammar() -> Grammar {
    let mut g = Grammar::parse(
        "<expr> ::= ( <expr> <op> <expr> ) | <var>\n\
         <op> ::= + | *\n\
         <var> ::= x",
    )
    .unwrap();
    // constants are supplied separately, mirroring how applications add
    // problem-specific terminals to a fixed skeleton grammar
    g.extend("<var> ::= 1").unwrap();
    g
}

/// Evaluates a phenotype of the expression grammar at `x`, or `None` if
/// the text is not a sentence of the grammar.
fn eval_expr(text: &str, x: f64) -> Option<f64> {
    fn expr(bytes: &[u8], at: usize, x: f64) -> Option<(f64, usize)> {
        match bytes.get(at)? {
            b'(' => {
                let (lhs, at) = expr(bytes, at + 1, x)?;
                let op = *bytes.get(at)?;
                let (rhs, at) = expr(bytes, at + 1, x)?;
                if bytes.get(at) != Some(&b')') {
                    return None;
                }
                let value = match op {
                    b'+' => lhs + rhs,
                    b'*' => lhs * rhs,
                    _ => return None,
                };
                Some((value, at + 1))
            }
            b'x' => Some((x, at + 1)),
            b'1' => Some((1.0, at + 1)),
            _ => None,
        }
    }
    let (value, end) = expr(text.as_bytes(), 0, x)?;
    (end == text.len()).then_some(value)
}

fn target(x: f64) -> f64 {
    x * x + x + 1.0
}

fn regression_fitness(ind: &mut Individual) -> f64 {
    let Some(text) = ind.phenotype() else {
        return WORST_FITNESS;
    };
    let Some(_) = eval_expr(text, 0.0) else {
        return WORST_FITNESS;
    };
    let mut error = 0.0;
    for i in 0..20 {
        let x = i as f64 / 2.0;
        // phenotype is grammatical, so evaluation cannot fail here
        let predicted = eval_expr(text, x).unwrap_or(f64::INFINITY);
        error += (predicted - target(x)).powi(2);
    }
    ind.objective = error / 20.0;
    -ind.objective
}

#[test]
fn test_extended_grammar_contains_both_variables() {
    let g = expression_grammar();
    assert!(g.has_non_terminal("<var>"));
    assert_eq!(g.non_terminal("<var>").unwrap().productions.len(), 2);
    // start symbol is the first rule defined, not the last extension
    assert_eq!(g.start().label, "<expr>");
}

#[test]
fn test_regression_run_finds_a_usable_model() {
    let grammar = expression_grammar();
    let params = Parameters::builder()
        .population_size(200)
        .generation_count(30)
        .sensible_initialisation(true)
        .init_depths(3, 7)
        .build();
    let mut rng = RandomNumberGenerator::from_seed(2023);
    let mut engine = EvolutionEngine::new(params, &grammar, regression_fitness);
    let pop = engine.run(&mut rng).unwrap();

    let best = pop.best().unwrap();
    assert!(best.mapped);
    let text = best.phenotype().unwrap();
    assert!(eval_expr(text, 1.0).is_some(), "unparseable best {text:?}");

    // the constant model "1" has mean squared error well above 1000 on
    // this sample; any run with selection pressure does much better
    assert!(
        best.objective < 1000.0,
        "no selection pressure: best error {}",
        best.objective
    );
}

#[test]
fn test_objective_is_reported_alongside_fitness() {
    let grammar = expression_grammar();
    let params = Parameters::builder()
        .population_size(50)
        .generation_count(5)
        .sensible_initialisation(true)
        .build();
    let mut rng = RandomNumberGenerator::from_seed(7);
    let mut engine = EvolutionEngine::new(params, &grammar, regression_fitness);
    let pop = engine.run(&mut rng).unwrap();

    for ind in pop.members().iter().filter(|i| i.mapped) {
        assert_eq!(ind.fitness, -ind.objective);
    }
}
