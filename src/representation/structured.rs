//! # Structured Fixed-genome Representation (Structured GE)
//!
//! SGE uses a fixed-length genome partitioned into one contiguous *gene* per
//! non-terminal. Gene lengths come from a one-off, conservative upper-bound
//! analysis of the grammar (the maximum number of times each non-terminal
//! can occur in any derivation from the start symbol), which only exists for
//! non-recursive grammars; a recursive grammar is a fatal configuration
//! error detected before any individual is created.
//!
//! Mapping walks the grammar top-down like GE, but each non-terminal indexes
//! its *own* gene through a per-non-terminal consumption counter; the sizing
//! analysis guarantees enough slots, so mapping always succeeds. The counts
//! consumed by the most recent mapping are recorded per gene (`gene_size`)
//! and are the effective boundary respected by crossover and mutation, not
//! the allocated gene length.

use crate::derivation::DerivationNode;
use crate::error::{EvolveError, Result};
use crate::grammar::{Grammar, NonTerminal, Token};
use crate::mapping::Mapping;
use crate::rng::RandomSource;

/// Which SGE mutation operator to apply.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SgeMutation {
    /// One mutation attempt per gene: with probability `rate`, pick a random
    /// *consumed* slot of the gene and force it to a different value.
    /// Non-terminals with fewer than two productions are skipped, since no
    /// alternative value exists.
    #[default]
    OnePerGene,
    /// Blanket operator: visit every allocated slot in the genome and
    /// resample it independently with probability `rate`.
    PerSlot,
}

/// The per-non-terminal gene lengths derived from a grammar, shared by every
/// SGE genome evolved against it.
#[derive(Debug, Clone)]
pub struct GeneSizes {
    sizes: Vec<usize>,
    total: usize,
}

impl GeneSizes {
    /// Walks the grammar to establish the allocated length of each gene:
    /// the maximum number of times the non-terminal can appear in a single
    /// derivation reachable from the start symbol. Non-terminals that never
    /// appear on a right-hand side (such as the start symbol) are lifted to
    /// a length of one.
    ///
    /// # Errors
    ///
    /// Returns [`EvolveError::RecursiveGrammar`] if any non-terminal in the
    /// grammar is recursive; the upper bound does not exist in that case.
    pub fn compute(grammar: &Grammar) -> Result<Self> {
        if let Some(nt) = grammar.non_terminals().iter().find(|nt| nt.recursive) {
            return Err(EvolveError::RecursiveGrammar(format!(
                "non-terminal {} is recursive",
                nt.label
            )));
        }

        let start = grammar.start();
        let mut sizes = Vec::with_capacity(grammar.len());
        for target in grammar.non_terminals() {
            let mut memo = vec![None; grammar.len()];
            let count = occurrences(grammar, target.id, start, &mut memo);
            sizes.push(count.max(1));
        }

        let total = sizes.iter().sum();
        Ok(Self { sizes, total })
    }

    /// The allocated length of each gene, indexed by non-terminal id.
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// The total genome length (the sum of all gene lengths).
    pub fn total(&self) -> usize {
        self.total
    }
}

/// The maximum number of times `target` occurs in any single derivation
/// rooted at `lhs`: the max over productions of the per-production sum.
fn occurrences(
    grammar: &Grammar,
    target: usize,
    lhs: &NonTerminal,
    memo: &mut Vec<Option<usize>>,
) -> usize {
    if let Some(count) = memo[lhs.id] {
        return count;
    }

    let mut best = 0;
    for production in &lhs.productions {
        let mut production_total = 0;
        for token in &production.tokens {
            if let Token::NonTerminal(id) = token {
                if *id == target {
                    production_total += 1;
                } else {
                    production_total +=
                        occurrences(grammar, target, &grammar.non_terminals()[*id], memo);
                }
            }
        }
        best = best.max(production_total);
    }

    memo[lhs.id] = Some(best);
    best
}

/// The structured fixed-length genotype: a single flat integer array with
/// per-gene offsets and the per-gene consumption counts of the most recent
/// mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuredGenome {
    genes: Vec<u32>,
    gene_offset: Vec<usize>,
    gene_size: Vec<usize>,
}

impl StructuredGenome {
    /// Creates an empty genome; [`StructuredGenome::random_init`] gives it
    /// its shape.
    pub fn new() -> Self {
        Self::default()
    }

    /// The flat gene values.
    pub fn genes(&self) -> &[u32] {
        &self.genes
    }

    /// The start offset of each gene in the flat array.
    pub fn gene_offset(&self) -> &[usize] {
        &self.gene_offset
    }

    /// How many slots of each gene the most recent mapping consumed.
    pub fn gene_size(&self) -> &[usize] {
        &self.gene_size
    }

    /// The number of genes (equal to the grammar's non-terminal count).
    pub fn n_genes(&self) -> usize {
        self.gene_offset.len()
    }

    /// The total allocated genome length.
    pub fn total_size(&self) -> usize {
        self.genes.len()
    }

    /// The allocated slot range of gene `i`.
    fn gene_range(&self, i: usize) -> std::ops::Range<usize> {
        let start = self.gene_offset[i];
        let end = if i + 1 < self.gene_offset.len() {
            self.gene_offset[i + 1]
        } else {
            self.genes.len()
        };
        start..end
    }

    /// Shapes the genome from the gene-size table and fills every slot with
    /// a uniform value in `[0, production count)` of the owning
    /// non-terminal.
    pub fn random_init<R: RandomSource>(
        &mut self,
        grammar: &Grammar,
        sizes: &GeneSizes,
        rng: &mut R,
    ) {
        self.gene_offset.clear();
        self.gene_size.clear();
        self.genes.clear();

        let mut total = 0;
        for size in sizes.sizes() {
            self.gene_offset.push(total);
            total += size;
        }
        self.gene_size.resize(grammar.len(), 0);

        self.genes.reserve(total);
        for (nt, size) in grammar.non_terminals().iter().zip(sizes.sizes()) {
            let choices = nt.productions.len();
            for _ in 0..*size {
                self.genes.push(rng.below(choices) as u32);
            }
        }
    }

    /// Maps the genome to its phenotype, recording per-gene consumption
    /// counts. Always succeeds on a genome sized for the grammar.
    pub fn map(&mut self, grammar: &Grammar, mapping: &mut Mapping) -> bool {
        mapping.reset();
        let mut consumed = vec![0usize; self.n_genes()];
        self.expand(grammar, grammar.start(), &mut consumed, mapping);
        self.gene_size = consumed;
        true
    }

    fn expand(
        &self,
        grammar: &Grammar,
        nt: &NonTerminal,
        consumed: &mut [usize],
        mapping: &mut Mapping,
    ) {
        let slot = self.gene_offset[nt.id] + consumed[nt.id];
        consumed[nt.id] += 1;
        let choice = self.genes[slot] as usize % nt.productions.len();
        let production = &nt.productions[choice];

        for token in &production.tokens {
            match token {
                Token::Terminal(symbol) => mapping.append_symbol(symbol),
                Token::NonTerminal(id) => {
                    self.expand(grammar, &grammar.non_terminals()[*id], consumed, mapping)
                }
            }
        }
    }

    /// Builds the derivation tree the genome encodes. Uses local consumption
    /// counters, leaving the recorded `gene_size` untouched.
    pub fn derive(&self, grammar: &Grammar) -> DerivationNode {
        let mut consumed = vec![0usize; self.n_genes()];
        self.derive_from(grammar, grammar.start(), &mut consumed)
    }

    fn derive_from(
        &self,
        grammar: &Grammar,
        nt: &NonTerminal,
        consumed: &mut [usize],
    ) -> DerivationNode {
        let slot = self.gene_offset[nt.id] + consumed[nt.id];
        consumed[nt.id] += 1;
        let choice = self.genes[slot] as usize % nt.productions.len();
        let production = &nt.productions[choice];

        let mut node = DerivationNode::with_capacity(&nt.label, production.tokens.len());
        for token in &production.tokens {
            match token {
                Token::Terminal(symbol) => node.push_child(DerivationNode::new(symbol)),
                Token::NonTerminal(id) => {
                    node.push_child(self.derive_from(grammar, &grammar.non_terminals()[*id], consumed))
                }
            }
        }
        node
    }

    /// Asexual reproduction: reshapes the offspring to the parent's layout
    /// and copies genes and consumption counts wholesale.
    pub fn reproduce(parent: &StructuredGenome, offspring: &mut StructuredGenome) {
        offspring.genes.clear();
        offspring.genes.extend_from_slice(&parent.genes);
        offspring.gene_offset.clear();
        offspring.gene_offset.extend_from_slice(&parent.gene_offset);
        offspring.gene_size.clear();
        offspring.gene_size.extend_from_slice(&parent.gene_size);
    }

    /// Uniform crossover on genes: independently per gene, each child
    /// inherits that whole gene segment from one parent or the other with
    /// equal probability. A child's consumption count per gene is the max of
    /// the parents' counts; a conservative estimate.
    pub fn crossover<R: RandomSource>(
        mother: &StructuredGenome,
        father: &StructuredGenome,
        daughter: &mut StructuredGenome,
        son: &mut StructuredGenome,
        rng: &mut R,
    ) {
        Self::reproduce(mother, daughter);
        Self::reproduce(father, son);

        for i in 0..mother.n_genes() {
            let range = mother.gene_range(i);
            if rng.flip(0.5) {
                daughter.genes[range.clone()].copy_from_slice(&mother.genes[range.clone()]);
                son.genes[range.clone()].copy_from_slice(&father.genes[range]);
            } else {
                daughter.genes[range.clone()].copy_from_slice(&father.genes[range.clone()]);
                son.genes[range.clone()].copy_from_slice(&mother.genes[range]);
            }
            let size = mother.gene_size[i].max(father.gene_size[i]);
            daughter.gene_size[i] = size;
            son.gene_size[i] = size;
        }
    }

    /// Applies the configured mutation operator at rate `rate`.
    pub fn mutate<R: RandomSource>(
        &mut self,
        grammar: &Grammar,
        policy: SgeMutation,
        rate: f64,
        rng: &mut R,
    ) {
        match policy {
            SgeMutation::OnePerGene => self.mutate_one_per_gene(grammar, rate, rng),
            SgeMutation::PerSlot => self.mutate_per_slot(grammar, rate, rng),
        }
    }

    fn mutate_one_per_gene<R: RandomSource>(&mut self, grammar: &Grammar, rate: f64, rng: &mut R) {
        for nt in grammar.non_terminals() {
            if nt.productions.len() < 2 {
                continue;
            }
            if !rng.flip(rate) {
                continue;
            }
            let slot = self.gene_offset[nt.id] + rng.below(self.gene_size[nt.id]);
            let current = self.genes[slot];
            loop {
                let candidate = rng.below(nt.productions.len()) as u32;
                if candidate != current {
                    self.genes[slot] = candidate;
                    break;
                }
            }
        }
    }

    fn mutate_per_slot<R: RandomSource>(&mut self, grammar: &Grammar, rate: f64, rng: &mut R) {
        for nt in grammar.non_terminals() {
            for slot in self.gene_range(nt.id) {
                if rng.flip(rate) {
                    self.genes[slot] = rng.below(nt.productions.len()) as u32;
                }
            }
        }
    }

    /// Sexual breeding: uniform-per-gene crossover with probability
    /// `crossover_rate`, otherwise reproduction, then mutation of both
    /// children. Always returns false: mutation is attempted on every child,
    /// so the offspring are never certified clones.
    #[allow(clippy::too_many_arguments)]
    pub fn breed<R: RandomSource>(
        grammar: &Grammar,
        mother: &StructuredGenome,
        father: &StructuredGenome,
        daughter: &mut StructuredGenome,
        son: &mut StructuredGenome,
        policy: SgeMutation,
        crossover_rate: f64,
        mutation_rate: f64,
        rng: &mut R,
    ) -> bool {
        if rng.flip(crossover_rate) {
            Self::crossover(mother, father, daughter, son, rng);
        } else {
            Self::reproduce(mother, daughter);
            Self::reproduce(father, son);
        }

        daughter.mutate(grammar, policy, mutation_rate, rng);
        son.mutate(grammar, policy, mutation_rate, rng);

        false
    }
}
