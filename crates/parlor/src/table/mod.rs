//! # Parse Tables
//!
//! ACTION/GOTO table population with precedence-based conflict resolution.
//!
//! The ACTION table is a dense `state × terminal` array of action sets; the
//! GOTO table is a dense `state × nonterminal` array of optional states. In
//! deterministic (LR) mode every surviving cell must hold at most one
//! action, otherwise [`LrConflictError`] is raised; in GLR mode cells keep
//! every action that survives resolution.
//!
//! Conflict resolution, applied per cell:
//!
//! 1. **Shift/reduce** — the shifting terminal's precedence is compared
//!    with the reducing production's precedence (which defaults to its
//!    rightmost terminal's). The higher side wins; on a tie the production's
//!    associativity decides: left → reduce, right → shift, none → retained.
//! 2. **Reduce/reduce** — a strictly higher-priority production evicts the
//!    lower one; equal priorities are retained.

pub(crate) mod items;

pub(crate) use items::StateId;

use crate::error::{Conflict, ConflictKind, LrConflictError};
use crate::grammar::{Assoc, FirstSets, Grammar, NonTermId, ProdId, Symbol, TermId};
use items::Automaton;
use smallvec::SmallVec;
use std::cmp::Ordering;
use tracing::{debug, trace};

/// A parse action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Consume the terminal and move to the state.
    Shift(StateId),
    /// Reduce by the production.
    Reduce(ProdId),
    /// Successful parse.
    Accept,
}

type ActionCell = SmallVec<[Action; 1]>;

/// Compiled ACTION/GOTO tables for a grammar.
///
/// Immutable once built; a table may be shared across threads together with
/// its grammar for read-only parsing.
#[derive(Debug, Clone)]
pub struct LrTable {
    num_states: usize,
    num_terms: usize,
    num_nonterms: usize,
    actions: Vec<ActionCell>,
    gotos: Vec<Option<StateId>>,
    diagnostics: Vec<String>,
}

impl LrTable {
    /// Build the table for a frozen grammar.
    ///
    /// `use_lalr` selects LALR core-merging over canonical LR(1);
    /// `allow_conflicts` is set by the GLR runtime to keep unresolved cells.
    ///
    /// # Errors
    ///
    /// Returns [`LrConflictError`] when `allow_conflicts` is false and a
    /// cell retains more than one action after resolution.
    pub fn build(
        grammar: &Grammar,
        use_lalr: bool,
        allow_conflicts: bool,
    ) -> Result<Self, LrConflictError> {
        let firsts = FirstSets::compute(grammar);
        let automaton = Automaton::build(grammar, &firsts, use_lalr);

        let num_states = automaton.states.len();
        let num_terms = grammar.term_count();
        let num_nonterms = grammar.nonterm_count();
        let mut table = Self {
            num_states,
            num_terms,
            num_nonterms,
            actions: vec![ActionCell::new(); num_states * num_terms],
            gotos: vec![None; num_states * num_nonterms],
            diagnostics: automaton.diagnostics.clone(),
        };

        for (state, items) in automaton.states.iter().enumerate() {
            let state = state as StateId;
            for &(symbol, target) in &automaton.transitions[state as usize] {
                match symbol {
                    Symbol::Terminal(term) => table.insert_shift(grammar, state, term, target),
                    Symbol::NonTerminal(nt) => {
                        table.gotos[state as usize * num_nonterms + nt.index()] = Some(target);
                    }
                }
            }
            for &item in items {
                if item.is_complete(grammar) {
                    if item.prod == ProdId(0) {
                        continue;
                    }
                    table.insert_reduce(grammar, state, item.lookahead, item.prod);
                } else if item.prod == ProdId(0)
                    && item.next_symbol(grammar) == Some(Symbol::Terminal(TermId::STOP))
                {
                    let cell = table.cell_mut(state, TermId::STOP);
                    if !cell.contains(&Action::Accept) {
                        cell.push(Action::Accept);
                    }
                }
            }
        }

        let conflicts = table.collect_conflicts(grammar);
        debug!(
            states = num_states,
            conflicts = conflicts.len(),
            "parse table built"
        );
        if !allow_conflicts && !conflicts.is_empty() {
            return Err(LrConflictError { conflicts });
        }
        Ok(table)
    }

    fn cell_mut(&mut self, state: StateId, term: TermId) -> &mut ActionCell {
        &mut self.actions[state as usize * self.num_terms + term.index()]
    }

    /// Actions of a cell; at most one in a deterministic table.
    #[must_use]
    pub fn actions(&self, state: StateId, term: TermId) -> &[Action] {
        &self.actions[state as usize * self.num_terms + term.index()]
    }

    /// Goto target for a nonterminal.
    #[must_use]
    pub fn goto(&self, state: StateId, nt: NonTermId) -> Option<StateId> {
        self.gotos[state as usize * self.num_nonterms + nt.index()]
    }

    /// Number of states in the automaton.
    #[must_use]
    pub const fn num_states(&self) -> usize {
        self.num_states
    }

    /// Terminals with at least one action in the state, in declaration
    /// order. This is the expected set handed to the recognizer and listed
    /// in parse errors.
    #[must_use]
    pub fn expected_terms(&self, state: StateId) -> SmallVec<[TermId; 8]> {
        let mut expected = SmallVec::new();
        for index in 0..self.num_terms {
            let term = TermId(index as u32);
            if !self.actions(state, term).is_empty() {
                expected.push(term);
            }
        }
        expected
    }

    /// Construction notes, currently LALR-merge findings.
    #[must_use]
    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    /// Insert a shift, resolving against reduces already in the cell.
    fn insert_shift(&mut self, grammar: &Grammar, state: StateId, term: TermId, target: StateId) {
        let shift_prio = grammar.terminal(term).prio;
        let cell = &mut self.actions[state as usize * self.num_terms + term.index()];
        if cell.iter().any(|a| matches!(a, Action::Shift(_))) {
            return;
        }

        let mut beaten = false;
        cell.retain(|action| {
            let Action::Reduce(prod) = *action else {
                return true;
            };
            let production = grammar.production(prod);
            match shift_prio.cmp(&production.prio) {
                Ordering::Greater => {
                    trace!(state, prod = prod.index(), "shift wins by priority");
                    false
                }
                Ordering::Less => {
                    beaten = true;
                    true
                }
                Ordering::Equal => match production.assoc {
                    Assoc::Left => {
                        beaten = true;
                        true
                    }
                    Assoc::Right => {
                        trace!(state, prod = prod.index(), "shift wins by associativity");
                        false
                    }
                    Assoc::None => true,
                },
            }
        });
        if !beaten {
            cell.push(Action::Shift(target));
        }
    }

    /// Insert a reduce, resolving against the cell's shift and reduces.
    fn insert_reduce(&mut self, grammar: &Grammar, state: StateId, term: TermId, prod: ProdId) {
        let shift_prio = grammar.terminal(term).prio;
        let new = grammar.production(prod);
        let new_prio = new.prio;
        let new_assoc = new.assoc;
        let other_prios: Vec<Option<u32>> = self
            .actions(state, term)
            .iter()
            .map(|action| match *action {
                Action::Reduce(other) => Some(grammar.production(other).prio),
                Action::Shift(_) | Action::Accept => None,
            })
            .collect();

        let cell = &mut self.actions[state as usize * self.num_terms + term.index()];
        if cell.contains(&Action::Reduce(prod)) {
            return;
        }

        let mut beaten = false;
        let mut index = 0;
        cell.retain(|action| {
            let keep = match *action {
                Action::Shift(_) => match new_prio.cmp(&shift_prio) {
                    Ordering::Greater => {
                        trace!(state, prod = prod.index(), "reduce wins by priority");
                        false
                    }
                    Ordering::Less => {
                        beaten = true;
                        true
                    }
                    Ordering::Equal => match new_assoc {
                        Assoc::Left => {
                            trace!(state, prod = prod.index(), "reduce wins by associativity");
                            false
                        }
                        Assoc::Right => {
                            beaten = true;
                            true
                        }
                        Assoc::None => true,
                    },
                },
                Action::Reduce(_) => {
                    let other_prio =
                        other_prios[index].expect("reduce priority recorded for reduce action");
                    match new_prio.cmp(&other_prio) {
                        Ordering::Greater => false,
                        Ordering::Less => {
                            beaten = true;
                            true
                        }
                        Ordering::Equal => true,
                    }
                }
                Action::Accept => true,
            };
            index += 1;
            keep
        });
        if !beaten {
            cell.push(Action::Reduce(prod));
        }
    }

    fn collect_conflicts(&self, grammar: &Grammar) -> Vec<Conflict> {
        let mut conflicts = Vec::new();
        for state in 0..self.num_states {
            for term_index in 0..self.num_terms {
                let term = TermId(term_index as u32);
                let cell = self.actions(state as StateId, term);
                if cell.len() <= 1 {
                    continue;
                }
                let has_shift = cell.iter().any(|a| matches!(a, Action::Shift(_)));
                let productions: Vec<String> = cell
                    .iter()
                    .filter_map(|action| match *action {
                        Action::Reduce(prod) => Some(grammar.production_display(prod)),
                        Action::Shift(_) | Action::Accept => None,
                    })
                    .collect();
                conflicts.push(Conflict {
                    state: state as u32,
                    lookahead: grammar.terminal(term).name.to_string(),
                    kind: if has_shift {
                        ConflictKind::ShiftReduce
                    } else {
                        ConflictKind::ReduceReduce
                    },
                    productions,
                });
            }
        }
        conflicts
    }
}
