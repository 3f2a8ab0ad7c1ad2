//! # Derivation Tree
//!
//! An ownership tree of labelled nodes. A node's label is either a terminal
//! symbol or a non-terminal name; a node owns an ordered sequence of child
//! nodes (empty for terminals). The derivation tree serves two roles: it is
//! the genotype of the CFG-GP representation, and it is the optional
//! derivation output every representation can produce alongside its
//! phenotype.
//!
//! Nodes are exclusively owned by their parent (or by the individual, for
//! the root); cloning is always a full structural deep copy.

use crate::mapping::Mapping;

/// One node of a derivation tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationNode {
    label: String,
    children: Vec<DerivationNode>,
}

impl DerivationNode {
    /// Creates a leaf node with the given label.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            children: Vec::new(),
        }
    }

    /// Creates a node with the given label and room for `capacity` children.
    pub fn with_capacity(label: impl Into<String>, capacity: usize) -> Self {
        Self {
            label: label.into(),
            children: Vec::with_capacity(capacity),
        }
    }

    /// The node's label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The node's ordered children.
    pub fn children(&self) -> &[DerivationNode] {
        &self.children
    }

    /// Mutable access to the node's ordered children.
    pub fn children_mut(&mut self) -> &mut Vec<DerivationNode> {
        &mut self.children
    }

    /// Appends a sub-derivation as the rightmost child.
    pub fn push_child(&mut self, child: DerivationNode) {
        self.children.push(child);
    }

    /// True if the node has no children (a terminal symbol).
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// The depth of the tree rooted here; a lone leaf has depth 1.
    pub fn depth(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(DerivationNode::depth)
            .max()
            .unwrap_or(0)
    }

    /// The number of nodes in the tree rooted here.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(DerivationNode::node_count).sum::<usize>()
    }

    /// Appends the phenotype of this tree (its leaf labels, left to right)
    /// to the mapping buffer.
    pub fn write_phenotype(&self, mapping: &mut Mapping) {
        if self.children.is_empty() {
            mapping.append_symbol(&self.label);
        } else {
            for child in &self.children {
                child.write_phenotype(mapping);
            }
        }
    }
}
