//! Shared packed parse forest.
//!
//! An arena of nodes identified by dense handles. Terminal leaves carry the
//! matched lexeme; nonterminal nodes are unique per `(symbol, span)` and
//! hold one or more packings, each a `(production, children)` pair.
//! Ambiguity is represented by multiple packings under one node.
//!
//! Packing insertion applies precedence/associativity pruning: a strictly
//! higher-priority root production evicts lower-priority packings, and
//! among equal priorities a packing whose shape contradicts its
//! production's associativity is dropped in favor of a consistent rival.
//! Anything left is true ambiguity.

use crate::error::AmbiguityError;
use crate::grammar::{Assoc, Grammar, NonTermId, ProdId, TermId};
use crate::parser::{Actions, Context};
use crate::tree::{ParseTree, Span};
use ahash::RandomState;
use compact_str::CompactString;
use hashbrown::HashMap;
use smallvec::SmallVec;

/// Dense handle of an SPPF node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SppfId(u32);

impl SppfId {
    const fn index(self) -> usize {
        self.0 as usize
    }

    #[cfg(test)]
    pub(crate) const fn for_tests(raw: u32) -> Self {
        Self(raw)
    }
}

/// One derivation of a nonterminal node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Packing {
    pub prod: ProdId,
    pub children: SmallVec<[SppfId; 4]>,
}

/// An SPPF node.
#[derive(Debug, Clone)]
pub(crate) enum SppfNode {
    Terminal {
        term: TermId,
        lexeme: CompactString,
        span: Span,
    },
    NonTerminal {
        sym: NonTermId,
        span: Span,
        packings: SmallVec<[Packing; 1]>,
    },
}

impl SppfNode {
    pub(crate) fn span(&self) -> Span {
        match self {
            Self::Terminal { span, .. } | Self::NonTerminal { span, .. } => *span,
        }
    }
}

/// The forest arena.
#[derive(Debug)]
pub(crate) struct Sppf {
    nodes: Vec<SppfNode>,
    term_index: HashMap<(TermId, usize, usize), SppfId, RandomState>,
    nt_index: HashMap<(NonTermId, usize, usize), SppfId, RandomState>,
}

impl Sppf {
    pub(crate) fn new() -> Self {
        Self {
            nodes: Vec::new(),
            term_index: HashMap::with_hasher(RandomState::new()),
            nt_index: HashMap::with_hasher(RandomState::new()),
        }
    }

    pub(crate) fn node(&self, id: SppfId) -> &SppfNode {
        &self.nodes[id.index()]
    }

    /// Leaf for a matched terminal, shared per `(terminal, span)`.
    pub(crate) fn terminal(&mut self, term: TermId, lexeme: &str, span: Span) -> SppfId {
        let key = (term, span.start, span.end);
        if let Some(&id) = self.term_index.get(&key) {
            return id;
        }
        let id = SppfId(self.nodes.len() as u32);
        self.nodes.push(SppfNode::Terminal {
            term,
            lexeme: lexeme.into(),
            span,
        });
        self.term_index.insert(key, id);
        id
    }

    /// Node for a nonterminal over a span, shared per `(symbol, span)`.
    pub(crate) fn nonterminal(&mut self, sym: NonTermId, span: Span) -> SppfId {
        let key = (sym, span.start, span.end);
        if let Some(&id) = self.nt_index.get(&key) {
            return id;
        }
        let id = SppfId(self.nodes.len() as u32);
        self.nodes.push(SppfNode::NonTerminal {
            sym,
            span,
            packings: SmallVec::new(),
        });
        self.nt_index.insert(key, id);
        id
    }

    /// Add a derivation under a nonterminal node, applying disambiguation.
    /// Returns whether the node changed.
    pub(crate) fn add_packing(
        &mut self,
        grammar: &Grammar,
        node: SppfId,
        prod: ProdId,
        children: SmallVec<[SppfId; 4]>,
    ) -> bool {
        // A packing containing its own node only arises from cyclic
        // derivations; it can never contribute a finite tree.
        if children.contains(&node) {
            return false;
        }

        let (sym, existing) = match &self.nodes[node.index()] {
            SppfNode::NonTerminal { sym, packings, .. } => (*sym, packings.clone()),
            SppfNode::Terminal { .. } => {
                panic!("packing added to a terminal SPPF node (forest invariant)")
            }
        };

        let candidate = Packing { prod, children };
        if existing.contains(&candidate) {
            return false;
        }

        let new_prio = grammar.production(prod).prio;
        if existing
            .iter()
            .any(|p| grammar.production(p.prod).prio > new_prio)
        {
            return false;
        }

        let new_inconsistent = self.assoc_inconsistent(grammar, sym, &candidate);
        if new_inconsistent {
            let consistent_rival = existing.iter().any(|p| {
                grammar.production(p.prod).prio == new_prio
                    && !self.assoc_inconsistent(grammar, sym, p)
            });
            if consistent_rival {
                return false;
            }
        }

        let mut kept: SmallVec<[Packing; 1]> = existing
            .iter()
            .filter(|p| {
                let prio = grammar.production(p.prod).prio;
                if prio < new_prio {
                    return false;
                }
                if !new_inconsistent && self.assoc_inconsistent(grammar, sym, p) {
                    return false;
                }
                true
            })
            .cloned()
            .collect();
        kept.push(candidate);

        let changed = kept != existing;
        if let SppfNode::NonTerminal { packings, .. } = &mut self.nodes[node.index()] {
            *packings = kept;
        }
        changed
    }

    /// A packing contradicts its production's associativity when it is an
    /// infix application whose recursive child on the wrong side is itself
    /// an equal-priority infix application: for left associativity the
    /// rightmost child, for right associativity the leftmost.
    fn assoc_inconsistent(&self, grammar: &Grammar, sym: NonTermId, packing: &Packing) -> bool {
        let production = grammar.production(packing.prod);
        if !production.is_infix() {
            return false;
        }
        let child = match production.assoc {
            Assoc::None => return false,
            Assoc::Left => packing.children.last(),
            Assoc::Right => packing.children.first(),
        };
        let Some(&child) = child else {
            return false;
        };
        match self.node(child) {
            SppfNode::NonTerminal {
                sym: child_sym,
                packings,
                ..
            } if *child_sym == sym => packings.iter().any(|p| {
                let inner = grammar.production(p.prod);
                inner.is_infix() && inner.prio == production.prio
            }),
            _ => false,
        }
    }
}

/// Result of a GLR parse: the accepted SPPF roots over their arena.
///
/// A forest owns a copy of the parsed input, so trees and semantic values
/// can be extracted without keeping the caller's buffer alive.
#[derive(Debug)]
pub struct Forest<'g> {
    grammar: &'g Grammar,
    input: Box<str>,
    sppf: Sppf,
    roots: Vec<SppfId>,
}

impl<'g> Forest<'g> {
    pub(crate) fn new(grammar: &'g Grammar, input: &str, sppf: Sppf, roots: Vec<SppfId>) -> Self {
        Self {
            grammar,
            input: input.into(),
            sppf,
            roots,
        }
    }

    /// Number of distinct derivations in the forest.
    #[must_use]
    pub fn solutions(&self) -> usize {
        let mut visiting = vec![false; self.sppf.nodes.len()];
        self.roots
            .iter()
            .map(|&root| self.count(root, &mut visiting))
            .sum()
    }

    /// Whether more than one derivation was accepted.
    #[must_use]
    pub fn is_ambiguous(&self) -> bool {
        self.solutions() > 1
    }

    /// The input region covered by the forest.
    #[must_use]
    pub fn span(&self) -> Span {
        self.roots
            .first()
            .map_or_else(|| Span::empty(0), |&root| self.sppf.node(root).span())
    }

    /// Extract every parse tree, one per derivation.
    #[must_use]
    pub fn trees(&self) -> Vec<ParseTree> {
        let mut visiting = vec![false; self.sppf.nodes.len()];
        let mut out = Vec::new();
        for &root in &self.roots {
            out.extend(self.build_trees(root, &mut visiting));
        }
        out
    }

    /// Extract one parse tree by derivation index.
    #[must_use]
    pub fn get_tree(&self, index: usize) -> Option<ParseTree> {
        self.trees().into_iter().nth(index)
    }

    /// Extract the single parse tree.
    ///
    /// # Errors
    ///
    /// Returns [`AmbiguityError`] when the forest holds more than one
    /// derivation.
    pub fn single_tree(&self) -> Result<ParseTree, AmbiguityError> {
        let mut trees = self.trees();
        if trees.len() == 1 {
            Ok(trees.pop().expect("length checked"))
        } else {
            Err(AmbiguityError {
                solutions: trees.len(),
                span: self.span(),
            })
        }
    }

    /// Evaluate semantic actions bottom-up over every derivation.
    #[must_use]
    pub fn evaluate<V: Clone>(&self, actions: &Actions<V>) -> Vec<V> {
        let mut visiting = vec![false; self.sppf.nodes.len()];
        let mut out = Vec::new();
        for &root in &self.roots {
            out.extend(self.eval_node(root, actions, &mut visiting));
        }
        out
    }

    /// Evaluate semantic actions expecting a single derivation.
    ///
    /// # Errors
    ///
    /// Returns [`AmbiguityError`] when the forest holds more than one
    /// derivation.
    pub fn evaluate_single<V: Clone>(&self, actions: &Actions<V>) -> Result<V, AmbiguityError> {
        let mut values = self.evaluate(actions);
        if values.len() == 1 {
            Ok(values.pop().expect("length checked"))
        } else {
            Err(AmbiguityError {
                solutions: values.len(),
                span: self.span(),
            })
        }
    }

    fn count(&self, id: SppfId, visiting: &mut Vec<bool>) -> usize {
        match self.sppf.node(id) {
            SppfNode::Terminal { .. } => 1,
            SppfNode::NonTerminal { packings, .. } => {
                if visiting[id.index()] {
                    return 0;
                }
                visiting[id.index()] = true;
                let total = packings
                    .iter()
                    .map(|packing| {
                        packing
                            .children
                            .iter()
                            .map(|&child| self.count(child, visiting))
                            .product::<usize>()
                    })
                    .sum();
                visiting[id.index()] = false;
                total
            }
        }
    }

    fn build_trees(&self, id: SppfId, visiting: &mut Vec<bool>) -> Vec<ParseTree> {
        match self.sppf.node(id) {
            SppfNode::Terminal { term, lexeme, span } => vec![ParseTree::Terminal {
                terminal: self.grammar.terminal(*term).name.clone(),
                lexeme: lexeme.clone(),
                span: *span,
            }],
            SppfNode::NonTerminal {
                sym,
                span,
                packings,
            } => {
                if visiting[id.index()] {
                    return Vec::new();
                }
                visiting[id.index()] = true;
                let mut out = Vec::new();
                for packing in packings {
                    let child_trees: Vec<Vec<ParseTree>> = packing
                        .children
                        .iter()
                        .map(|&child| self.build_trees(child, visiting))
                        .collect();
                    let production = self.grammar.production(packing.prod);
                    for combo in cartesian(&child_trees) {
                        out.push(ParseTree::NonTerminal {
                            symbol: self.grammar.nonterminal(*sym).name.clone(),
                            production: production.index.index() as u32,
                            children: combo,
                            span: *span,
                        });
                    }
                }
                visiting[id.index()] = false;
                out
            }
        }
    }

    fn eval_node<V: Clone>(
        &self,
        id: SppfId,
        actions: &Actions<V>,
        visiting: &mut Vec<bool>,
    ) -> Vec<V> {
        match self.sppf.node(id) {
            SppfNode::Terminal { term, lexeme, span } => {
                let ctx = Context {
                    span: *span,
                    production: None,
                    input: &self.input,
                };
                vec![actions.token_value(&ctx, &self.grammar.terminal(*term).name, lexeme)]
            }
            SppfNode::NonTerminal { span, packings, .. } => {
                if visiting[id.index()] {
                    return Vec::new();
                }
                visiting[id.index()] = true;
                let mut out = Vec::new();
                for packing in packings {
                    let child_values: Vec<Vec<V>> = packing
                        .children
                        .iter()
                        .map(|&child| self.eval_node(child, actions, visiting))
                        .collect();
                    let production = self.grammar.production(packing.prod);
                    let ctx = Context {
                        span: *span,
                        production: Some(production),
                        input: &self.input,
                    };
                    for combo in cartesian(&child_values) {
                        out.push(actions.reduce_value(self.grammar, &ctx, production, combo));
                    }
                }
                visiting[id.index()] = false;
                out
            }
        }
    }
}

/// Cartesian product across per-child alternative lists.
fn cartesian<T: Clone>(lists: &[Vec<T>]) -> Vec<Vec<T>> {
    let mut out: Vec<Vec<T>> = vec![Vec::new()];
    for list in lists {
        let mut next = Vec::with_capacity(out.len() * list.len());
        for prefix in &out {
            for item in list {
                let mut combo = prefix.clone();
                combo.push(item.clone());
                next.push(combo);
            }
        }
        out = next;
    }
    out
}
