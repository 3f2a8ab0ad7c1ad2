//! # Grammar Model
//!
//! The in-memory context-free grammar that drives every genotype-to-phenotype
//! mapping. A grammar is an ordered list of non-terminals, each carrying an
//! ordered list of productions; a production is an ordered sequence of tokens,
//! each either a terminal symbol or a reference to another non-terminal.
//!
//! Grammars are built from BNF text, where non-terminals are written in angle
//! brackets and alternatives are separated by `|`:
//!
//! ```rust
//! use gramevo::grammar::Grammar;
//!
//! let g = Grammar::parse("<expr> ::= <expr> + <term> | <term>\n<term> ::= x | 1").unwrap();
//! assert!(g.has_non_terminal("<expr>"));
//! assert!(g.non_terminal("<expr>").unwrap().recursive);
//! ```
//!
//! Callers can splice problem-specific terminals into an otherwise complete
//! grammar at setup time via [`Grammar::extend`], e.g. to add one production
//! per feature variable of a data set:
//!
//! ```rust
//! use gramevo::grammar::Grammar;
//!
//! let mut g = Grammar::parse("<expr> ::= <var> + <var>\n<var> ::= x1").unwrap();
//! for i in 2..=3 {
//!     g.extend(&format!("<var> ::= x{}", i)).unwrap();
//! }
//! assert_eq!(g.non_terminal("<var>").unwrap().productions.len(), 3);
//! ```

use std::collections::HashMap;
use std::fmt;

use crate::error::{EvolveError, Result};

/// One token on the right-hand side of a production: either a terminal
/// symbol, carried verbatim into the phenotype, or a reference to a
/// non-terminal (by its dense index in the grammar).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Terminal(String),
    NonTerminal(usize),
}

/// One alternative expansion of a non-terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Production {
    pub tokens: Vec<Token>,
}

/// A non-terminal symbol and its ordered productions.
///
/// `recursive` records whether the non-terminal can derive a sentential form
/// containing itself; it is recomputed whenever the grammar changes.
#[derive(Debug, Clone)]
pub struct NonTerminal {
    pub id: usize,
    pub label: String,
    pub productions: Vec<Production>,
    pub recursive: bool,
}

/// An in-memory context-free grammar.
///
/// The start symbol defaults to the first defined non-terminal unless one is
/// nominated explicitly through [`Grammar::set_start`].
#[derive(Debug, Clone)]
pub struct Grammar {
    non_terminals: Vec<NonTerminal>,
    by_label: HashMap<String, usize>,
    start: Option<usize>,
}

impl Grammar {
    /// Parses BNF text into a grammar.
    ///
    /// Each rule is written `<name> ::= alternative | alternative`; a line
    /// beginning with `|` continues the previous rule. Blank lines and lines
    /// starting with `#` are skipped. Tokens within an alternative are
    /// whitespace-separated; angle-bracketed tokens are non-terminal
    /// references, everything else is a terminal. Forward references are
    /// allowed, but every referenced non-terminal must be defined somewhere
    /// in the text.
    pub fn parse(text: &str) -> Result<Self> {
        let mut grammar = Self {
            non_terminals: Vec::new(),
            by_label: HashMap::new(),
            start: None,
        };
        grammar.ingest(text)?;
        if grammar.non_terminals.is_empty() {
            return Err(EvolveError::Grammar(
                "no production rules found in grammar text".to_string(),
            ));
        }
        Ok(grammar)
    }

    /// Appends productions to the grammar at setup time.
    ///
    /// The fragment uses the same BNF syntax as [`Grammar::parse`]. Rules for
    /// an existing non-terminal append to its production list; rules for a
    /// new non-terminal define it. Recursion flags are re-derived afterwards.
    pub fn extend(&mut self, fragment: &str) -> Result<()> {
        self.ingest(fragment)
    }

    /// True if a non-terminal with the given label is defined.
    pub fn has_non_terminal(&self, label: &str) -> bool {
        self.by_label.contains_key(label)
    }

    /// Looks up a non-terminal by label.
    pub fn non_terminal(&self, label: &str) -> Option<&NonTerminal> {
        self.by_label.get(label).map(|&id| &self.non_terminals[id])
    }

    /// The non-terminals of the grammar, in definition order.
    pub fn non_terminals(&self) -> &[NonTerminal] {
        &self.non_terminals
    }

    /// The number of non-terminals in the grammar.
    pub fn len(&self) -> usize {
        self.non_terminals.len()
    }

    /// True if the grammar defines no non-terminals.
    pub fn is_empty(&self) -> bool {
        self.non_terminals.is_empty()
    }

    /// The start symbol: the nominated one, or the first defined.
    pub fn start(&self) -> &NonTerminal {
        &self.non_terminals[self.start.unwrap_or(0)]
    }

    /// Nominates the start symbol by label.
    pub fn set_start(&mut self, label: &str) -> Result<()> {
        match self.by_label.get(label) {
            Some(&id) => {
                self.start = Some(id);
                Ok(())
            }
            None => Err(EvolveError::Grammar(format!(
                "cannot nominate undefined non-terminal {} as start symbol",
                label
            ))),
        }
    }

    /// True if any non-terminal in the grammar is recursive.
    pub fn is_recursive(&self) -> bool {
        self.non_terminals.iter().any(|nt| nt.recursive)
    }

    fn ingest(&mut self, text: &str) -> Result<()> {
        // Raw rules in source order: (lhs label, alternatives as raw token
        // strings). Token resolution happens in a second pass so that rules
        // may reference non-terminals defined later in the text.
        let mut rules: Vec<(String, Vec<Vec<String>>)> = Vec::new();

        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(rest) = line.strip_prefix('|') {
                let (_, alternatives) = rules.last_mut().ok_or_else(|| {
                    EvolveError::Grammar(format!(
                        "line {}: continuation with no preceding rule",
                        line_no + 1
                    ))
                })?;
                alternatives.extend(split_alternatives(rest, line_no)?);
            } else if let Some((lhs, rhs)) = line.split_once("::=") {
                let lhs = lhs.trim();
                if !is_non_terminal_token(lhs) {
                    return Err(EvolveError::Grammar(format!(
                        "line {}: left-hand side {:?} is not a non-terminal",
                        line_no + 1,
                        lhs
                    )));
                }
                rules.push((lhs.to_string(), split_alternatives(rhs, line_no)?));
            } else {
                return Err(EvolveError::Grammar(format!(
                    "line {}: expected a rule of the form <nt> ::= ...",
                    line_no + 1
                )));
            }
        }

        // Define all left-hand sides first, so references resolve regardless
        // of rule order.
        for (label, _) in &rules {
            if !self.by_label.contains_key(label) {
                let id = self.non_terminals.len();
                self.by_label.insert(label.clone(), id);
                self.non_terminals.push(NonTerminal {
                    id,
                    label: label.clone(),
                    productions: Vec::new(),
                    recursive: false,
                });
            }
        }

        for (label, alternatives) in rules {
            let id = self.by_label[&label];
            for raw_tokens in alternatives {
                let mut tokens = Vec::with_capacity(raw_tokens.len());
                for raw in raw_tokens {
                    if is_non_terminal_token(&raw) {
                        let target = self.by_label.get(&raw).ok_or_else(|| {
                            EvolveError::Grammar(format!(
                                "production of {} references undefined non-terminal {}",
                                label, raw
                            ))
                        })?;
                        tokens.push(Token::NonTerminal(*target));
                    } else {
                        tokens.push(Token::Terminal(raw));
                    }
                }
                self.non_terminals[id].productions.push(Production { tokens });
            }
        }

        self.compute_recursion();
        Ok(())
    }

    /// Re-derives the `recursive` flag of every non-terminal: a non-terminal
    /// is recursive iff it is reachable from itself through production
    /// references.
    fn compute_recursion(&mut self) {
        let n = self.non_terminals.len();
        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); n];
        for nt in &self.non_terminals {
            for p in &nt.productions {
                for t in &p.tokens {
                    if let Token::NonTerminal(target) = t {
                        successors[nt.id].push(*target);
                    }
                }
            }
        }

        for id in 0..n {
            let mut seen = vec![false; n];
            let mut stack: Vec<usize> = successors[id].clone();
            let mut recursive = false;
            while let Some(next) = stack.pop() {
                if next == id {
                    recursive = true;
                    break;
                }
                if !seen[next] {
                    seen[next] = true;
                    stack.extend(successors[next].iter().copied());
                }
            }
            self.non_terminals[id].recursive = recursive;
        }
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for nt in &self.non_terminals {
            write!(f, "{} ::=", nt.label)?;
            for (i, p) in nt.productions.iter().enumerate() {
                if i > 0 {
                    write!(f, " |")?;
                }
                for t in &p.tokens {
                    match t {
                        Token::Terminal(s) => write!(f, " {}", s)?,
                        Token::NonTerminal(id) => {
                            write!(f, " {}", self.non_terminals[*id].label)?
                        }
                    }
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

fn is_non_terminal_token(token: &str) -> bool {
    token.len() > 2 && token.starts_with('<') && token.ends_with('>')
}

fn split_alternatives(rhs: &str, line_no: usize) -> Result<Vec<Vec<String>>> {
    rhs.split('|')
        .map(|alt| {
            let tokens: Vec<String> =
                alt.split_whitespace().map(str::to_string).collect();
            if tokens.is_empty() {
                Err(EvolveError::Grammar(format!(
                    "line {}: empty alternative in production",
                    line_no + 1
                )))
            } else {
                Ok(tokens)
            }
        })
        .collect()
}
