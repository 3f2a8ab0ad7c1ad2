//! # Derivation-tree Representation (Context-Free-Grammar GP)
//!
//! In CFG-GP the genotype *is* a derivation tree, so mapping is a pure
//! left-to-right traversal of its leaves and always succeeds. The genetic
//! operators work directly on the tree structure: crossover swaps subtrees
//! rooted at matching non-terminals, mutation regrows the subtree beneath a
//! selected node, and both respect a configured maximum tree depth by
//! falling back to cloning rather than producing an out-of-bound tree.
//!
//! The initialisation procedure here is also reused by the codon-list
//! representation's sensible initialisation, which records the production
//! choice made at each expansion.

use crate::derivation::DerivationNode;
use crate::error::{EvolveError, Result};
use crate::grammar::{Grammar, NonTerminal, Production, Token};
use crate::mapping::Mapping;
use crate::rng::RandomSource;

/// Policy for picking the crossover/mutation node within a derivation tree.
///
/// Selection always operates over the tree's non-terminal (non-leaf) nodes;
/// a terminal leaf is not an expansion point.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeSelection {
    /// Uniform random choice over all candidate nodes.
    #[default]
    UniformRandom,
    /// Koza's 90/10 split: with probability 0.9 pick among nodes that still
    /// contain further non-terminal structure, otherwise among fringe nodes
    /// whose children are all terminals.
    Koza9010,
    /// Weight each candidate node by its depth below the root, biasing the
    /// choice towards deeper nodes.
    DepthProportional,
}

/// Per-non-terminal derivation depth bounds, computed once per grammar and
/// consulted by the depth-budgeted initialiser.
#[derive(Debug, Clone)]
pub(crate) struct DepthTable {
    /// Depth of the smallest complete derivation tree rooted at each
    /// non-terminal (a lone leaf counts as depth 1).
    min: Vec<usize>,
    /// Depth of the largest derivation tree rooted at each non-terminal;
    /// `usize::MAX` for recursive non-terminals.
    max: Vec<usize>,
}

impl DepthTable {
    pub(crate) fn build(grammar: &Grammar) -> Self {
        let n = grammar.len();
        let mut min = vec![usize::MAX; n];

        // fixed-point iteration; converges within n passes because each pass
        // propagates finished depths one reference level further
        let mut changed = true;
        while changed {
            changed = false;
            for nt in grammar.non_terminals() {
                for p in &nt.productions {
                    if let Some(pd) = production_min(p, &min) {
                        if pd < min[nt.id] {
                            min[nt.id] = pd;
                            changed = true;
                        }
                    }
                }
            }
        }

        let max = grammar
            .non_terminals()
            .iter()
            .map(|nt| {
                if nt.recursive {
                    usize::MAX
                } else {
                    max_depth_of(grammar, nt)
                }
            })
            .collect();

        Self { min, max }
    }

    /// Rejects a start symbol with no finite derivation (for example
    /// `<A> ::= a <A>`, which `Grammar::parse` accepts because every
    /// reference resolves). Growing such a non-terminal would recurse
    /// without bound, so the initialisers fail up front instead.
    pub(crate) fn require_productive(&self, nt: &NonTerminal) -> Result<()> {
        if self.min[nt.id] == usize::MAX {
            return Err(EvolveError::Grammar(format!(
                "non-terminal {} cannot derive a terminal string",
                nt.label
            )));
        }
        Ok(())
    }

    fn production_min(&self, production: &Production) -> usize {
        production_min(production, &self.min).unwrap_or(usize::MAX)
    }

    fn production_max(&self, production: &Production) -> usize {
        let deepest = production
            .tokens
            .iter()
            .map(|t| match t {
                Token::Terminal(_) => 1,
                Token::NonTerminal(id) => self.max[*id],
            })
            .max()
            .unwrap_or(0);
        deepest.saturating_add(1)
    }
}

fn production_min(production: &Production, min: &[usize]) -> Option<usize> {
    let mut deepest = 0;
    for token in &production.tokens {
        let d = match token {
            Token::Terminal(_) => 1,
            Token::NonTerminal(id) => {
                if min[*id] == usize::MAX {
                    return None;
                }
                min[*id]
            }
        };
        deepest = deepest.max(d);
    }
    Some(deepest + 1)
}

fn max_depth_of(grammar: &Grammar, nt: &NonTerminal) -> usize {
    // only called on non-recursive non-terminals, so plain recursion is safe
    let deepest = nt
        .productions
        .iter()
        .flat_map(|p| p.tokens.iter())
        .map(|t| match t {
            Token::Terminal(_) => 1,
            Token::NonTerminal(id) => max_depth_of(grammar, &grammar.non_terminals()[*id]),
        })
        .max()
        .unwrap_or(0);
    deepest + 1
}

/// Expands `nt` into a derivation tree of depth at most `budget`, choosing
/// uniformly among the productions that can finish within the budget. With
/// `full` set, productions able to reach the full budget are preferred, so
/// every branch is grown as deep as allowed. The production index chosen at
/// each expansion is appended to `choices` in leftmost-derivation order.
pub(crate) fn grow<R: RandomSource>(
    grammar: &Grammar,
    nt: &NonTerminal,
    budget: usize,
    full: bool,
    depths: &DepthTable,
    choices: &mut Vec<u32>,
    rng: &mut R,
) -> DerivationNode {
    let budget = budget.max(depths.min[nt.id]);

    let mut eligible: Vec<usize> = (0..nt.productions.len())
        .filter(|&i| depths.production_min(&nt.productions[i]) <= budget)
        .collect();
    if eligible.is_empty() {
        // budget is tighter than any production allows; fall back to the
        // shallowest derivations available
        let smallest = (0..nt.productions.len())
            .map(|i| depths.production_min(&nt.productions[i]))
            .min()
            .unwrap_or(usize::MAX);
        eligible = (0..nt.productions.len())
            .filter(|&i| depths.production_min(&nt.productions[i]) == smallest)
            .collect();
    }

    if full {
        let deep: Vec<usize> = eligible
            .iter()
            .copied()
            .filter(|&i| depths.production_max(&nt.productions[i]) >= budget)
            .collect();
        if !deep.is_empty() {
            eligible = deep;
        }
    }

    let index = eligible[rng.below(eligible.len())];
    choices.push(index as u32);

    let production = &nt.productions[index];
    let mut node = DerivationNode::with_capacity(&nt.label, production.tokens.len());
    for token in &production.tokens {
        match token {
            Token::Terminal(symbol) => node.push_child(DerivationNode::new(symbol)),
            Token::NonTerminal(id) => {
                let child = grow(
                    grammar,
                    &grammar.non_terminals()[*id],
                    budget.saturating_sub(1),
                    full,
                    depths,
                    choices,
                    rng,
                );
                node.push_child(child);
            }
        }
    }
    node
}

/// Builds a random derivation tree rooted at the grammar's start symbol,
/// bounded by `max_depth`. Fails on a start symbol that cannot derive any
/// terminal string.
pub fn random_init<R: RandomSource>(
    grammar: &Grammar,
    max_depth: usize,
    rng: &mut R,
) -> Result<DerivationNode> {
    let depths = DepthTable::build(grammar);
    depths.require_productive(grammar.start())?;
    let mut choices = Vec::new();
    Ok(grow(
        grammar,
        grammar.start(),
        max_depth.max(2),
        false,
        &depths,
        &mut choices,
        rng,
    ))
}

/// Sensible initialisation: draws a depth budget uniformly from
/// `[min_depth, max_depth]` and grows either a full tree (every branch
/// pushed to the budget) or a grow-style tree, with equal probability.
pub fn sensible_init<R: RandomSource>(
    grammar: &Grammar,
    min_depth: usize,
    max_depth: usize,
    rng: &mut R,
) -> Result<DerivationNode> {
    let depths = DepthTable::build(grammar);
    depths.require_productive(grammar.start())?;
    let span = max_depth.saturating_sub(min_depth);
    let budget = min_depth + rng.below(span + 1);
    let full = rng.flip(0.5);
    let mut choices = Vec::new();
    Ok(grow(
        grammar,
        grammar.start(),
        budget.max(2),
        full,
        &depths,
        &mut choices,
        rng,
    ))
}

/// Maps a derivation tree to its phenotype. A pure traversal of the leaf
/// labels in left-to-right order; always succeeds.
pub fn map(tree: &DerivationNode, mapping: &mut Mapping) -> bool {
    mapping.reset();
    tree.write_phenotype(mapping);
    true
}

/// A candidate crossover/mutation point within a tree.
struct Point {
    /// Child indices from the root to the node.
    path: Vec<usize>,
    /// Distance from the root, root = 1.
    level: usize,
    /// True if some child carries further non-terminal structure.
    interior: bool,
}

fn collect_points(tree: &DerivationNode, label: Option<&str>) -> Vec<Point> {
    let mut points = Vec::new();
    let mut path = Vec::new();
    collect_into(tree, label, 1, &mut path, &mut points);
    points
}

fn collect_into(
    node: &DerivationNode,
    label: Option<&str>,
    level: usize,
    path: &mut Vec<usize>,
    out: &mut Vec<Point>,
) {
    if node.is_leaf() {
        return;
    }
    if label.map_or(true, |l| node.label() == l) {
        out.push(Point {
            path: path.clone(),
            level,
            interior: node.children().iter().any(|c| !c.is_leaf()),
        });
    }
    for (i, child) in node.children().iter().enumerate() {
        path.push(i);
        collect_into(child, label, level + 1, path, out);
        path.pop();
    }
}

fn select_point<'p, R: RandomSource>(
    points: &'p [Point],
    policy: NodeSelection,
    rng: &mut R,
) -> &'p Point {
    match policy {
        NodeSelection::UniformRandom => &points[rng.below(points.len())],
        NodeSelection::Koza9010 => {
            let want_interior = rng.flip(0.9);
            let pool: Vec<&Point> = points
                .iter()
                .filter(|p| p.interior == want_interior)
                .collect();
            if pool.is_empty() {
                &points[rng.below(points.len())]
            } else {
                pool[rng.below(pool.len())]
            }
        }
        NodeSelection::DepthProportional => {
            let total: usize = points.iter().map(|p| p.level).sum();
            let mut target = rng.next_uniform() * total as f64;
            for p in points {
                target -= p.level as f64;
                if target < 0.0 {
                    return p;
                }
            }
            // rounding can leave a sliver of target; the last point takes it
            &points[points.len() - 1]
        }
    }
}

fn subtree_mut<'t>(root: &'t mut DerivationNode, path: &[usize]) -> &'t mut DerivationNode {
    let mut node = root;
    for &i in path {
        node = &mut node.children_mut()[i];
    }
    node
}

/// Subtree crossover: picks a non-terminal node in each parent (the second
/// constrained to the same non-terminal as the first, keeping the offspring
/// grammatical) and swaps the two subtrees. If either resulting tree would
/// exceed `max_depth`, the children revert to plain clones of the parents
/// and the operator reports failure.
pub fn crossover<R: RandomSource>(
    mother: &DerivationNode,
    father: &DerivationNode,
    daughter: &mut DerivationNode,
    son: &mut DerivationNode,
    max_depth: usize,
    policy: NodeSelection,
    rng: &mut R,
) -> bool {
    daughter.clone_from(mother);
    son.clone_from(father);

    let mother_points = collect_points(mother, None);
    if mother_points.is_empty() {
        return false;
    }
    let pick = select_point(&mother_points, policy, rng);

    let label = {
        let node = subtree_mut(daughter, &pick.path);
        node.label().to_string()
    };
    let father_points = collect_points(father, Some(&label));
    if father_points.is_empty() {
        return false;
    }
    let other = select_point(&father_points, policy, rng);

    std::mem::swap(
        subtree_mut(daughter, &pick.path),
        subtree_mut(son, &other.path),
    );

    if daughter.depth() > max_depth || son.depth() > max_depth {
        daughter.clone_from(mother);
        son.clone_from(father);
        return false;
    }
    true
}

/// Subtree mutation: picks a non-terminal node and regrows the derivation
/// beneath it, bounded by `max_mutation_depth` and never letting the whole
/// tree exceed `max_tree_depth`. Returns false when no in-bound regrowth is
/// possible at the selected node.
pub fn mutate<R: RandomSource>(
    grammar: &Grammar,
    tree: &mut DerivationNode,
    max_mutation_depth: usize,
    max_tree_depth: usize,
    policy: NodeSelection,
    rng: &mut R,
) -> bool {
    let points = collect_points(tree, None);
    if points.is_empty() {
        return false;
    }
    let pick = select_point(&points, policy, rng);

    let budget = max_mutation_depth.min(max_tree_depth.saturating_sub(pick.level - 1));
    if budget < 2 {
        return false;
    }

    let node = subtree_mut(tree, &pick.path);
    let nt = match grammar.non_terminal(node.label()) {
        Some(nt) => nt,
        None => return false,
    };

    let depths = DepthTable::build(grammar);
    let mut choices = Vec::new();
    *node = grow(grammar, nt, budget, false, &depths, &mut choices, rng);
    true
}

/// Asexual reproduction: a full structural deep copy.
pub fn reproduce(parent: &DerivationNode, offspring: &mut Option<DerivationNode>) {
    *offspring = Some(parent.clone());
}

/// Sexual breeding: subtree crossover with probability `crossover_rate`
/// (reverting to clones on a depth violation), then subtree mutation of each
/// child with probability `mutation_rate`. Returns true when the children
/// ended up as pure clones of the parents.
#[allow(clippy::too_many_arguments)]
pub fn breed<R: RandomSource>(
    grammar: &Grammar,
    mother: &DerivationNode,
    father: &DerivationNode,
    daughter: &mut Option<DerivationNode>,
    son: &mut Option<DerivationNode>,
    max_mutation_depth: usize,
    max_tree_depth: usize,
    policy: NodeSelection,
    crossover_rate: f64,
    mutation_rate: f64,
    rng: &mut R,
) -> bool {
    let mut d = mother.clone();
    let mut s = father.clone();

    let mut crossed = false;
    if rng.flip(crossover_rate) {
        crossed = crossover(mother, father, &mut d, &mut s, max_tree_depth, policy, rng);
    }

    let mut mutated = false;
    if rng.flip(mutation_rate) {
        mutated |= mutate(grammar, &mut d, max_mutation_depth, max_tree_depth, policy, rng);
    }
    if rng.flip(mutation_rate) {
        mutated |= mutate(grammar, &mut s, max_mutation_depth, max_tree_depth, policy, rng);
    }

    *daughter = Some(d);
    *son = Some(s);

    !crossed && !mutated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::RandomNumberGenerator;

    fn expr_grammar() -> Grammar {
        Grammar::parse("<expr> ::= ( <expr> + <expr> ) | <var>\n<var> ::= x | y").unwrap()
    }

    #[test]
    fn test_depth_table() {
        let g = expr_grammar();
        let depths = DepthTable::build(&g);
        // <var> derives a single terminal: depth 2; <expr> -> <var> adds one
        assert_eq!(depths.min[g.non_terminal("<var>").unwrap().id], 2);
        assert_eq!(depths.min[g.non_terminal("<expr>").unwrap().id], 3);
        assert_eq!(depths.max[g.non_terminal("<expr>").unwrap().id], usize::MAX);
        assert_eq!(depths.max[g.non_terminal("<var>").unwrap().id], 2);
    }

    #[test]
    fn test_init_rejects_start_symbol_without_terminal_derivation() {
        // every production keeps an <A> alive, so no finite derivation exists
        let g = Grammar::parse("<A> ::= a <A>").unwrap();
        let mut rng = RandomNumberGenerator::from_seed(7);
        assert!(matches!(
            random_init(&g, 6, &mut rng),
            Err(EvolveError::Grammar(_))
        ));
        assert!(matches!(
            sensible_init(&g, 2, 6, &mut rng),
            Err(EvolveError::Grammar(_))
        ));
    }

    #[test]
    fn test_random_init_respects_max_depth() {
        let g = expr_grammar();
        let mut rng = RandomNumberGenerator::from_seed(5);
        for _ in 0..100 {
            let tree = random_init(&g, 6, &mut rng).unwrap();
            assert!(tree.depth() <= 6, "depth {} exceeds bound", tree.depth());
            assert_eq!(tree.label(), "<expr>");
        }
    }

    #[test]
    fn test_sensible_init_full_trees_reach_budget() {
        let g = expr_grammar();
        let depths = DepthTable::build(&g);
        let mut rng = RandomNumberGenerator::from_seed(9);
        // grow full trees directly so the budget is exact
        for budget in 3..8 {
            let mut choices = Vec::new();
            let tree = grow(&g, g.start(), budget, true, &depths, &mut choices, &mut rng);
            assert_eq!(tree.depth(), budget);
        }
    }

    #[test]
    fn test_map_always_succeeds() {
        let g = expr_grammar();
        let mut rng = RandomNumberGenerator::from_seed(2);
        let tree = random_init(&g, 8, &mut rng).unwrap();
        let mut mapping = Mapping::new();
        assert!(map(&tree, &mut mapping));
        assert!(!mapping.is_empty());

        // mapping is a pure function of the tree
        let mut again = Mapping::new();
        map(&tree, &mut again);
        assert_eq!(mapping.as_str(), again.as_str());
    }

    #[test]
    fn test_crossover_respects_depth_bound() {
        let g = expr_grammar();
        let mut rng = RandomNumberGenerator::from_seed(17);
        for _ in 0..100 {
            let mother = random_init(&g, 8, &mut rng).unwrap();
            let father = random_init(&g, 8, &mut rng).unwrap();
            let mut daughter = mother.clone();
            let mut son = father.clone();
            let swapped = crossover(
                &mother,
                &father,
                &mut daughter,
                &mut son,
                8,
                NodeSelection::UniformRandom,
                &mut rng,
            );
            assert!(daughter.depth() <= 8);
            assert!(son.depth() <= 8);
            if !swapped {
                // fallback leaves the children as clones of the parents
                assert_eq!(daughter, mother);
                assert_eq!(son, father);
            }
        }
    }

    #[test]
    fn test_crossover_swaps_matching_non_terminals() {
        let g = expr_grammar();
        let mut rng = RandomNumberGenerator::from_seed(23);
        for _ in 0..50 {
            let mother = random_init(&g, 6, &mut rng).unwrap();
            let father = random_init(&g, 6, &mut rng).unwrap();
            let mut daughter = mother.clone();
            let mut son = father.clone();
            crossover(
                &mother,
                &father,
                &mut daughter,
                &mut son,
                10,
                NodeSelection::Koza9010,
                &mut rng,
            );
            // grammaticality: the roots stay rooted at the start symbol and
            // both children still map
            assert_eq!(daughter.label(), "<expr>");
            assert_eq!(son.label(), "<expr>");
        }
    }

    #[test]
    fn test_mutation_regrows_within_bounds() {
        let g = expr_grammar();
        let mut rng = RandomNumberGenerator::from_seed(31);
        for _ in 0..100 {
            let mut tree = random_init(&g, 6, &mut rng).unwrap();
            mutate(&g, &mut tree, 4, 8, NodeSelection::DepthProportional, &mut rng);
            assert!(tree.depth() <= 8, "depth {} exceeds bound", tree.depth());
            assert_eq!(tree.label(), "<expr>");
        }
    }

    #[test]
    fn test_breed_pure_clone_path() {
        let g = expr_grammar();
        let mut rng = RandomNumberGenerator::from_seed(41);
        let mother = random_init(&g, 6, &mut rng).unwrap();
        let father = random_init(&g, 6, &mut rng).unwrap();

        let mut daughter = None;
        let mut son = None;
        let cloned = breed(
            &g,
            &mother,
            &father,
            &mut daughter,
            &mut son,
            4,
            8,
            NodeSelection::UniformRandom,
            0.0, // never cross
            0.0, // never mutate
            &mut rng,
        );
        assert!(cloned);
        assert_eq!(daughter.unwrap(), mother);
        assert_eq!(son.unwrap(), father);
    }
}
