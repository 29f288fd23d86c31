//! Deterministic shift/reduce runtime.
//!
//! The driver is generic over the value type: tree building and semantic
//! actions are two instantiations of the same loop. Stack entries are
//! `(state, value, span)`; the recognizer is consulted with the expected
//! set of the current state, so each input position is examined at most a
//! bounded number of times.

use super::{build_recognizer, parse_error_at, Actions, Context, ParserConfig};
use crate::error::{LrConflictError, ParseError};
use crate::grammar::{Grammar, Production, TermId};
use crate::recognizer::{Recognizer, Skip, TokenMatch};
use crate::table::{Action, LrTable, StateId};
use crate::tree::{ParseTree, Span};
use tracing::{debug, trace};

/// Deterministic LR(1)/LALR parser for a frozen grammar.
pub struct LrParser<'g> {
    grammar: &'g Grammar,
    table: LrTable,
    recognizer: Recognizer<'g>,
}

impl<'g> LrParser<'g> {
    /// Compile the grammar with the default configuration (LALR tables).
    ///
    /// # Errors
    ///
    /// Returns [`LrConflictError`] when the grammar leaves unresolved
    /// conflicts in the table.
    pub fn new(grammar: &'g Grammar) -> Result<Self, LrConflictError> {
        Self::with_config(grammar, &ParserConfig::default())
    }

    /// Compile the grammar with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LrConflictError`] when the grammar (or its layout grammar)
    /// leaves unresolved conflicts in the table.
    pub fn with_config(
        grammar: &'g Grammar,
        config: &ParserConfig,
    ) -> Result<Self, LrConflictError> {
        let table = LrTable::build(grammar, config.use_lalr, false)?;
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

    /// The compiled parse table.
    #[must_use]
    pub const fn table(&self) -> &LrTable {
        &self.table
    }

    /// Parse the input into a concrete parse tree.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] at the first position with no applicable
    /// action.
    pub fn parse(&self, input: &str) -> Result<ParseTree, ParseError> {
        debug!(len = input.len(), "lr parse");
        let grammar = self.grammar;
        let mut shift = |term: TermId, lexeme: &str, span: Span| ParseTree::Terminal {
            terminal: grammar.terminal(term).name.clone(),
            lexeme: lexeme.into(),
            span,
        };
        let mut reduce =
            |production: &Production, children: Vec<ParseTree>, span: Span| {
                ParseTree::NonTerminal {
                    symbol: grammar.nonterminal(production.lhs).name.clone(),
                    production: production.index.index() as u32,
                    children,
                    span,
                }
            };
        let (tree, _) = run_lr(
            grammar,
            &self.table,
            &self.recognizer,
            input,
            0,
            false,
            &mut shift,
            &mut reduce,
        )?;
        Ok(tree)
    }

    /// Parse the input, dispatching semantic actions bottom-up.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] at the first position with no applicable
    /// action.
    pub fn parse_with_actions<V>(
        &self,
        input: &str,
        actions: &Actions<V>,
    ) -> Result<V, ParseError> {
        debug!(len = input.len(), "lr parse with actions");
        let grammar = self.grammar;
        let mut shift = |term: TermId, lexeme: &str, span: Span| {
            let ctx = Context {
                span,
                production: None,
                input,
            };
            actions.token_value(&ctx, &grammar.terminal(term).name, lexeme)
        };
        let mut reduce = |production: &Production, children: Vec<V>, span: Span| {
            let ctx = Context {
                span,
                production: Some(production),
                input,
            };
            actions.reduce_value(grammar, &ctx, production, children)
        };
        let (value, _) = run_lr(
            grammar,
            &self.table,
            &self.recognizer,
            input,
            0,
            false,
            &mut shift,
            &mut reduce,
        )?;
        Ok(value)
    }
}

/// Consume a layout prefix: parse the layout grammar from `pos` in prefix
/// mode and return the new position; a failed layout parse consumes
/// nothing.
pub(crate) fn consume_prefix(
    layout: &Grammar,
    table: &LrTable,
    input: &str,
    pos: usize,
) -> usize {
    let recognizer = Recognizer::new(layout, Skip::None);
    let mut shift = |_: TermId, _: &str, _: Span| ();
    let mut reduce = |_: &Production, _: Vec<()>, _: Span| ();
    match run_lr(
        layout, table, &recognizer, input, pos, true, &mut shift, &mut reduce,
    ) {
        Ok(((), end)) => end,
        Err(_) => pos,
    }
}

/// The shift/reduce loop shared by tree building, semantic actions and
/// layout consumption.
///
/// In `prefix` mode the end of the recognized region acts as end of input:
/// when nothing matches and the state can act on `STOP`, a zero-length
/// `STOP` token is synthesized. Acceptance then reports the reached
/// position instead of requiring the real end.
#[allow(clippy::too_many_arguments)]
pub(crate) fn run_lr<V>(
    grammar: &Grammar,
    table: &LrTable,
    recognizer: &Recognizer<'_>,
    input: &str,
    start_pos: usize,
    prefix: bool,
    shift: &mut dyn FnMut(TermId, &str, Span) -> V,
    reduce: &mut dyn FnMut(&Production, Vec<V>, Span) -> V,
) -> Result<(V, usize), ParseError> {
    let mut stack: Vec<(StateId, Option<V>, Span)> =
        vec![(0, None, Span::empty(start_pos))];
    let mut pos = start_pos;

    loop {
        let state = stack.last().expect("parse stack is never empty").0;
        let expected = table.expected_terms(state);
        let (tok_start, matches) = recognizer.recognize(input, pos, &expected);

        let matched = matches.first().copied().or_else(|| {
            // Prefix mode: the first unrecognized position terminates the
            // region, provided the state can act on STOP.
            (prefix && !table.actions(state, TermId::STOP).is_empty()).then_some(TokenMatch {
                term: TermId::STOP,
                start: tok_start,
                end: tok_start,
            })
        });
        let Some(tok) = matched else {
            return Err(parse_error_at(grammar, input, tok_start, &expected));
        };

        let action = *table
            .actions(state, tok.term)
            .first()
            .expect("expected set only lists actionable terminals");

        match action {
            Action::Shift(next) => {
                let span = tok.span();
                trace!(state, next, term = tok.term.index(), "shift");
                let value = shift(tok.term, &input[tok.start..tok.end], span);
                stack.push((next, Some(value), span));
                pos = tok.end;
            }
            Action::Reduce(prod) => {
                let production = grammar.production(prod);
                trace!(state, prod = prod.index(), "reduce");
                let at = stack.len() - production.rhs.len();
                let mut children = Vec::with_capacity(production.rhs.len());
                let mut span: Option<Span> = None;
                for (_, value, child_span) in stack.drain(at..) {
                    children.push(value.expect("reduced stack entries carry values"));
                    span = Some(match span {
                        Some(s) => s.cover(child_span),
                        None => child_span,
                    });
                }
                let span = span.unwrap_or_else(|| Span::empty(tok_start));
                let value = reduce(production, children, span);
                let base = stack.last().expect("reduce keeps the start entry").0;
                let target = table.goto(base, production.lhs).unwrap_or_else(|| {
                    panic!(
                        "GOTO miss on '{}' after reduce (goto-totality invariant)",
                        grammar.nonterminal(production.lhs).name
                    )
                });
                stack.push((target, Some(value), span));
            }
            Action::Accept => {
                trace!(state, pos = tok_start, "accept");
                let (_, value, _) = stack.pop().expect("accepting stack has a value");
                let value = value.expect("accepted entry carries the start value");
                return Ok((value, tok_start));
            }
        }
    }
}
