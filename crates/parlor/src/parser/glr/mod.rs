//! # GLR Runtime
//!
//! Generalized parsing over a graph-structured stack and a shared packed
//! parse forest.
//!
//! The input is processed in generations, one per post-layout position.
//! Within a generation every reduction reachable from any stack top is
//! performed to saturation — new nodes, new edges and new packings all
//! re-arm the loop, and because every insertion is idempotent the fixed
//! point is reached in bounded time. Shifts are then performed
//! collectively over the recognizer's surviving matches, which all share
//! one end position and so define the next generation.

pub(crate) mod gss;
pub(crate) mod sppf;

pub use sppf::Forest;

use super::{build_recognizer, parse_error_at, ParserConfig};
use crate::error::{LrConflictError, ParseError};
use crate::grammar::{Grammar, TermId};
use crate::recognizer::Recognizer;
use crate::table::{Action, LrTable};
use crate::tree::Span;
use gss::{Gss, GssNodeId};
use smallvec::SmallVec;
use sppf::{Sppf, SppfId};
use tracing::{debug, trace};

/// Generalized LR parser: handles any context-free grammar, returning a
/// [`Forest`] of every accepted derivation.
pub struct GlrParser<'g> {
    grammar: &'g Grammar,
    table: LrTable,
    recognizer: Recognizer<'g>,
}

impl<'g> GlrParser<'g> {
    /// Compile the grammar with the default configuration. Conflicted
    /// cells are kept, so any grammar builds.
    ///
    /// # Errors
    ///
    /// Returns [`LrConflictError`] only when the layout grammar (which is
    /// parsed deterministically) has unresolved conflicts.
    pub fn new(grammar: &'g Grammar) -> Result<Self, LrConflictError> {
        Self::with_config(grammar, &ParserConfig::default())
    }

    /// Compile the grammar with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LrConflictError`] only when the layout grammar has
    /// unresolved conflicts.
    pub fn with_config(
        grammar: &'g Grammar,
        config: &ParserConfig,
    ) -> Result<Self, LrConflictError> {
        let table = LrTable::build(grammar, config.use_lalr, true)?;
        let recognizer = build_recognizer(grammar, config)?;
        Ok(Self {
            grammar,
            table,
            recognizer,
        })
    }

    /// Construction notes (LALR merge findings).
    #[must_use]
    pub fn diagnostics(&self) -> &[String] {
        self.table.diagnostics()
    }

    /// Parse the input into a forest of accepted derivations.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] when a generation produces no new stack top
    /// and nothing was accepted.
    pub fn parse(&self, input: &str) -> Result<Forest<'g>, ParseError> {
        debug!(len = input.len(), "glr parse");
        let grammar = self.grammar;
        let table = &self.table;

        let mut gss = Gss::new();
        let mut sppf = Sppf::new();
        let (start_node, _) = gss.get_or_insert(0, 0);
        let mut heads: Vec<GssNodeId> = vec![start_node];
        let mut pos = 0;
        let mut roots: Vec<SppfId> = Vec::new();

        loop {
            let expected = self.expected_union(&heads, &gss);
            let (tok_start, matches) = self.recognizer.recognize(input, pos, &expected);
            let at_end = tok_start == input.len();

            self.saturate_reductions(&mut gss, &mut sppf, &mut heads, &matches, tok_start);

            if at_end {
                for &head in &heads {
                    let state = gss.node(head).state;
                    if table.actions(state, TermId::STOP).contains(&Action::Accept) {
                        for edge in &gss.node(head).edges {
                            if !roots.contains(&edge.label) {
                                roots.push(edge.label);
                            }
                        }
                    }
                }
            }

            // Collective shift over every surviving match. Zero-length
            // matches are never shifted: they cannot advance a generation.
            let mut next: Vec<GssNodeId> = Vec::new();
            let mut next_pos = None;
            for m in &matches {
                if m.term == TermId::STOP || m.term == TermId::EMPTY || m.len() == 0 {
                    continue;
                }
                let leaf = sppf.terminal(m.term, &input[m.start..m.end], m.span());
                for &head in &heads {
                    let state = gss.node(head).state;
                    for action in table.actions(state, m.term) {
                        if let Action::Shift(target) = *action {
                            let (node, _) = gss.get_or_insert(target, m.end);
                            gss.add_edge(node, head, leaf);
                            if !next.contains(&node) {
                                next.push(node);
                            }
                            debug_assert!(next_pos.is_none_or(|p| p == m.end));
                            next_pos = Some(m.end);
                        }
                    }
                }
            }

            trace!(
                generation = tok_start,
                heads = heads.len(),
                shifted = next.len(),
                "generation complete"
            );

            let Some(new_pos) = next_pos else {
                if at_end && !roots.is_empty() {
                    debug!(roots = roots.len(), "glr accepted");
                    return Ok(Forest::new(grammar, input, sppf, roots));
                }
                return Err(parse_error_at(grammar, input, tok_start, &expected));
            };
            heads = next;
            pos = new_pos;
        }
    }

    /// Union of the expected-terminal sets of every head state, in
    /// declaration order.
    fn expected_union(&self, heads: &[GssNodeId], gss: &Gss) -> SmallVec<[TermId; 8]> {
        let mut expected: SmallVec<[TermId; 8]> = SmallVec::new();
        for &head in heads {
            for term in self.table.expected_terms(gss.node(head).state) {
                if !expected.contains(&term) {
                    expected.push(term);
                }
            }
        }
        expected.sort_unstable();
        expected
    }

    /// Perform every reduction reachable from the current tops, to a fixed
    /// point. Reduce-created tops join the generation at `tok_start`.
    fn saturate_reductions(
        &self,
        gss: &mut Gss,
        sppf: &mut Sppf,
        heads: &mut Vec<GssNodeId>,
        matches: &[crate::recognizer::TokenMatch],
        tok_start: usize,
    ) {
        let grammar = self.grammar;
        let table = &self.table;
        loop {
            let mut changed = false;
            let mut i = 0;
            while i < heads.len() {
                let head = heads[i];
                i += 1;
                let state = gss.node(head).state;
                for m in matches {
                    for action in table.actions(state, m.term) {
                        let Action::Reduce(prod) = *action else {
                            continue;
                        };
                        let production = grammar.production(prod);
                        let paths = gss.paths(head, production.rhs.len());
                        for (labels, bottom) in paths {
                            let span = labels
                                .iter()
                                .map(|&label| sppf.node(label).span())
                                .reduce(Span::cover)
                                .unwrap_or_else(|| Span::empty(tok_start));
                            let nt_node = sppf.nonterminal(production.lhs, span);
                            changed |= sppf.add_packing(grammar, nt_node, prod, labels);

                            let bottom_state = gss.node(bottom).state;
                            let target =
                                table.goto(bottom_state, production.lhs).unwrap_or_else(|| {
                                    panic!(
                                        "GOTO miss on '{}' during GLR reduce (goto-totality \
                                         invariant)",
                                        grammar.nonterminal(production.lhs).name
                                    )
                                });
                            let (node, created) = gss.get_or_insert(target, tok_start);
                            if created {
                                heads.push(node);
                                changed = true;
                            }
                            changed |= gss.add_edge(node, bottom, nt_node);
                        }
                    }
                }
            }
            if !changed {
                break;
            }
        }
    }
}
