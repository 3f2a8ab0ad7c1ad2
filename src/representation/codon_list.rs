//! # Codon-list Representation (Grammatical Evolution)
//!
//! The GE genotype is an ordered, resizable list of non-negative integer
//! codons. During mapping, each codon (modulo the active non-terminal's
//! production count) selects a production in a leftmost derivation. When the
//! list is exhausted, the read cursor may wrap back to index 0 up to a
//! configured number of times; if the wrap budget runs out with
//! non-terminals still unexpanded the mapping *fails* and the individual is
//! marked unmapped; no partial output is considered valid.

use crate::derivation::DerivationNode;
use crate::error::Result;
use crate::grammar::{Grammar, NonTerminal, Token};
use crate::mapping::Mapping;
use crate::representation::tree;
use crate::rng::RandomSource;

/// The linear wrapped-codon genotype of Grammatical Evolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodonList {
    codons: Vec<u32>,
}

/// Read cursor over a codon list, tracking the wrap budget.
struct CodonReader<'a> {
    codons: &'a [u32],
    cursor: usize,
    wraps_left: usize,
}

impl<'a> CodonReader<'a> {
    fn new(codons: &'a [u32], wrap_limit: usize) -> Self {
        Self {
            codons,
            cursor: 0,
            wraps_left: wrap_limit,
        }
    }

    fn next(&mut self) -> Option<u32> {
        if self.codons.is_empty() {
            return None;
        }
        if self.cursor == self.codons.len() {
            if self.wraps_left == 0 {
                return None;
            }
            self.wraps_left -= 1;
            self.cursor = 0;
        }
        let codon = self.codons[self.cursor];
        self.cursor += 1;
        Some(codon)
    }
}

impl CodonList {
    /// Creates an empty codon list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a codon list from explicit codon values.
    pub fn from_codons(codons: &[u32]) -> Self {
        Self {
            codons: codons.to_vec(),
        }
    }

    /// The codon values, in order.
    pub fn codons(&self) -> &[u32] {
        &self.codons
    }

    /// The number of codons in the list.
    pub fn len(&self) -> usize {
        self.codons.len()
    }

    /// True if the list holds no codons.
    pub fn is_empty(&self) -> bool {
        self.codons.is_empty()
    }

    /// Fills the list with `length` uniform random codons.
    pub fn random_init<R: RandomSource>(&mut self, length: usize, rng: &mut R) {
        self.codons.clear();
        self.codons.extend((0..length).map(|_| rng.codon()));
    }

    /// Sensible initialisation: grows a depth-bounded derivation the same way
    /// the CFG-GP initialiser does, recording the production choice made at
    /// each expansion as a codon, then appends a random tail of
    /// `tail_length` times the derived length. Fails on a start symbol that
    /// cannot derive any terminal string.
    pub fn sensible_init<R: RandomSource>(
        &mut self,
        grammar: &Grammar,
        min_depth: usize,
        max_depth: usize,
        tail_length: f64,
        rng: &mut R,
    ) -> Result<()> {
        let depths = tree::DepthTable::build(grammar);
        depths.require_productive(grammar.start())?;
        let span = max_depth.saturating_sub(min_depth);
        let budget = min_depth + rng.below(span + 1);
        let full = rng.flip(0.5);

        self.codons.clear();
        let _ = tree::grow(
            grammar,
            grammar.start(),
            budget.max(2),
            full,
            &depths,
            &mut self.codons,
            rng,
        );

        let tail = (tail_length * self.codons.len() as f64) as usize;
        for _ in 0..tail {
            self.codons.push(rng.codon());
        }
        Ok(())
    }

    /// Maps the codon list to a phenotype via a leftmost derivation.
    ///
    /// Returns false (and leaves the individual unmapped) when the wrap
    /// budget is exhausted with non-terminals still pending.
    pub fn map(&self, grammar: &Grammar, mapping: &mut Mapping, wrap_limit: usize) -> bool {
        mapping.reset();
        let mut reader = CodonReader::new(&self.codons, wrap_limit);
        self.expand(grammar, grammar.start(), &mut reader, mapping)
    }

    fn expand(
        &self,
        grammar: &Grammar,
        nt: &NonTerminal,
        reader: &mut CodonReader<'_>,
        mapping: &mut Mapping,
    ) -> bool {
        let codon = match reader.next() {
            Some(codon) => codon,
            None => return false,
        };
        let production = &nt.productions[codon as usize % nt.productions.len()];

        for token in &production.tokens {
            match token {
                Token::Terminal(symbol) => mapping.append_symbol(symbol),
                Token::NonTerminal(id) => {
                    if !self.expand(grammar, &grammar.non_terminals()[*id], reader, mapping) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Builds the derivation tree the codon list encodes, or `None` when the
    /// wrap budget is exhausted before the derivation completes.
    pub fn derive(&self, grammar: &Grammar, wrap_limit: usize) -> Option<DerivationNode> {
        let mut reader = CodonReader::new(&self.codons, wrap_limit);
        self.derive_from(grammar, grammar.start(), &mut reader)
    }

    fn derive_from(
        &self,
        grammar: &Grammar,
        nt: &NonTerminal,
        reader: &mut CodonReader<'_>,
    ) -> Option<DerivationNode> {
        let codon = reader.next()?;
        let production = &nt.productions[codon as usize % nt.productions.len()];

        let mut node = DerivationNode::with_capacity(&nt.label, production.tokens.len());
        for token in &production.tokens {
            match token {
                Token::Terminal(symbol) => node.push_child(DerivationNode::new(symbol)),
                Token::NonTerminal(id) => {
                    let sub = self.derive_from(grammar, &grammar.non_terminals()[*id], reader)?;
                    node.push_child(sub);
                }
            }
        }
        Some(node)
    }

    /// One-point crossover: swaps the parents' tails at a cut point. With
    /// `fixed_point` the same cut index is used in both parents (drawn from
    /// the shorter list); otherwise each parent receives an independent cut.
    pub fn crossover<R: RandomSource>(
        mother: &CodonList,
        father: &CodonList,
        daughter: &mut CodonList,
        son: &mut CodonList,
        fixed_point: bool,
        rng: &mut R,
    ) {
        let (cut_m, cut_f) = if fixed_point {
            let cut = rng.below(mother.len().min(father.len()) + 1);
            (cut, cut)
        } else {
            (rng.below(mother.len() + 1), rng.below(father.len() + 1))
        };

        daughter.codons.clear();
        daughter.codons.extend_from_slice(&mother.codons[..cut_m]);
        daughter.codons.extend_from_slice(&father.codons[cut_f..]);

        son.codons.clear();
        son.codons.extend_from_slice(&father.codons[..cut_f]);
        son.codons.extend_from_slice(&mother.codons[cut_m..]);
    }

    /// Resets each codon independently to a new random value with probability
    /// `rate`. Returns true if any codon changed.
    pub fn mutate<R: RandomSource>(&mut self, rate: f64, rng: &mut R) -> bool {
        let mut mutated = false;
        for codon in &mut self.codons {
            if rng.flip(rate) {
                *codon = rng.codon();
                mutated = true;
            }
        }
        mutated
    }

    /// Asexual reproduction: an exact deep copy of the parent's codons.
    pub fn reproduce(parent: &CodonList, offspring: &mut CodonList) {
        offspring.codons.clear();
        offspring.codons.extend_from_slice(&parent.codons);
    }

    /// Sexual breeding: crossover with probability `crossover_rate`,
    /// otherwise plain reproduction, then per-codon mutation of both
    /// children. Returns true when the children are pure clones of the
    /// parents (no crossover and no codon changed), in which case the caller
    /// may propagate the parents' cached mapping and fitness state.
    #[allow(clippy::too_many_arguments)]
    pub fn breed<R: RandomSource>(
        mother: &CodonList,
        father: &CodonList,
        daughter: &mut CodonList,
        son: &mut CodonList,
        fixed_point: bool,
        crossover_rate: f64,
        mutation_rate: f64,
        rng: &mut R,
    ) -> bool {
        let crossed = rng.flip(crossover_rate);
        if crossed {
            Self::crossover(mother, father, daughter, son, fixed_point, rng);
        } else {
            Self::reproduce(mother, daughter);
            Self::reproduce(father, son);
        }

        // bitwise-or so that both children are always visited by mutation
        let mutated = daughter.mutate(mutation_rate, rng) | son.mutate(mutation_rate, rng);

        !crossed && !mutated
    }
}
