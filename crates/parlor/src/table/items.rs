//! LR(1) items, closure/goto and the canonical item-set automaton.
//!
//! States are identified structurally: an item set is canonicalized by
//! sorting its items, and that encoding keys the state-dedup map. Together
//! with breadth-first generation over symbol-ordered transitions this makes
//! state numbering deterministic, so building the same grammar twice yields
//! identical automata.

use crate::grammar::{FirstSets, Grammar, ProdId, Symbol, TermId};
use ahash::RandomState;
use hashbrown::{HashMap, HashSet};
use std::collections::{BTreeMap, VecDeque};
use tracing::debug;

/// Dense state index; state 0 is the start state.
pub(crate) type StateId = u32;

/// An LR(1) item: a production, a dot position and one lookahead terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct Item {
    pub prod: ProdId,
    pub dot: u32,
    pub lookahead: TermId,
}

impl Item {
    /// The symbol right after the dot, if any.
    pub(crate) fn next_symbol(self, grammar: &Grammar) -> Option<Symbol> {
        grammar
            .production(self.prod)
            .rhs
            .get(self.dot as usize)
            .copied()
    }

    /// Whether the dot is at the end of the production.
    pub(crate) fn is_complete(self, grammar: &Grammar) -> bool {
        self.dot as usize == grammar.production(self.prod).rhs.len()
    }
}

/// The canonical collection of item sets plus goto transitions.
pub(crate) struct Automaton {
    /// Closed item sets, sorted canonically.
    pub states: Vec<Vec<Item>>,
    /// Goto transitions per state, sorted by symbol.
    pub transitions: Vec<Vec<(Symbol, StateId)>>,
    /// Notes produced during construction (LALR merge findings).
    pub diagnostics: Vec<String>,
}

impl Automaton {
    /// Build the LR(1) automaton, optionally merging LR(0) cores (LALR).
    pub(crate) fn build(grammar: &Grammar, firsts: &FirstSets, use_lalr: bool) -> Self {
        let mut automaton = Self::build_lr1(grammar, firsts);
        if use_lalr {
            automaton = automaton.merge_cores(grammar);
        }
        debug!(
            states = automaton.states.len(),
            lalr = use_lalr,
            "item-set automaton built"
        );
        automaton
    }

    fn build_lr1(grammar: &Grammar, firsts: &FirstSets) -> Self {
        let mut states: Vec<Vec<Item>> = Vec::new();
        let mut transitions: Vec<Vec<(Symbol, StateId)>> = Vec::new();
        let mut index: HashMap<Vec<Item>, StateId, RandomState> =
            HashMap::with_hasher(RandomState::new());

        let start = closure(
            grammar,
            firsts,
            &[Item {
                prod: ProdId(0),
                dot: 0,
                lookahead: TermId::STOP,
            }],
        );
        index.insert(start.clone(), 0);
        states.push(start);
        transitions.push(Vec::new());

        let mut queue: VecDeque<StateId> = VecDeque::new();
        queue.push_back(0);

        while let Some(state) = queue.pop_front() {
            // Group items by the symbol after the dot; BTreeMap keeps the
            // exploration order stable. Transitions on STOP are never taken:
            // the accept action covers that column.
            let mut grouped: BTreeMap<Symbol, Vec<Item>> = BTreeMap::new();
            for &item in &states[state as usize] {
                if let Some(symbol) = item.next_symbol(grammar) {
                    if symbol == Symbol::Terminal(TermId::STOP) {
                        continue;
                    }
                    grouped.entry(symbol).or_default().push(Item {
                        prod: item.prod,
                        dot: item.dot + 1,
                        lookahead: item.lookahead,
                    });
                }
            }

            for (symbol, mut kernel) in grouped {
                kernel.sort_unstable();
                kernel.dedup();
                let closed = closure(grammar, firsts, &kernel);
                let target = match index.get(&closed) {
                    Some(&id) => id,
                    None => {
                        let id = states.len() as StateId;
                        index.insert(closed.clone(), id);
                        states.push(closed);
                        transitions.push(Vec::new());
                        queue.push_back(id);
                        id
                    }
                };
                transitions[state as usize].push((symbol, target));
            }
        }

        Self {
            states,
            transitions,
            diagnostics: Vec::new(),
        }
    }

    /// Merge states with identical LR(0) cores, unioning lookaheads.
    ///
    /// A merge can introduce a reduce/reduce conflict that no source state
    /// had; this is detected and reported as a diagnostic, but construction
    /// proceeds (the conflict then goes through normal resolution).
    fn merge_cores(self, grammar: &Grammar) -> Self {
        let core_of = |items: &[Item]| -> Vec<(ProdId, u32)> {
            let mut core: Vec<(ProdId, u32)> =
                items.iter().map(|item| (item.prod, item.dot)).collect();
            core.sort_unstable();
            core.dedup();
            core
        };

        let mut core_index: HashMap<Vec<(ProdId, u32)>, StateId, RandomState> =
            HashMap::with_hasher(RandomState::new());
        let mut old_to_new: Vec<StateId> = Vec::with_capacity(self.states.len());
        let mut groups: Vec<Vec<StateId>> = Vec::new();

        for (old, items) in self.states.iter().enumerate() {
            let core = core_of(items);
            let new = match core_index.get(&core) {
                Some(&id) => id,
                None => {
                    let id = groups.len() as StateId;
                    core_index.insert(core, id);
                    groups.push(Vec::new());
                    id
                }
            };
            old_to_new.push(new);
            groups[new as usize].push(old as StateId);
        }

        let mut states: Vec<Vec<Item>> = Vec::with_capacity(groups.len());
        let mut transitions: Vec<Vec<(Symbol, StateId)>> = Vec::with_capacity(groups.len());
        for members in &groups {
            let mut items: Vec<Item> = Vec::new();
            for &old in members {
                items.extend_from_slice(&self.states[old as usize]);
            }
            items.sort_unstable();
            items.dedup();
            states.push(items);

            let mut merged: Vec<(Symbol, StateId)> = Vec::new();
            for &old in members {
                for &(symbol, old_target) in &self.transitions[old as usize] {
                    let target = old_to_new[old_target as usize];
                    match merged.iter().find(|(s, _)| *s == symbol) {
                        Some(&(_, existing)) => {
                            assert_eq!(
                                existing, target,
                                "LALR merge produced inconsistent goto targets"
                            );
                        }
                        None => merged.push((symbol, target)),
                    }
                }
            }
            merged.sort_unstable();
            transitions.push(merged);
        }

        let diagnostics = detect_introduced_conflicts(grammar, &states, &groups, &self.states);

        Self {
            states,
            transitions,
            diagnostics,
        }
    }

    /// Goto target of `state` on `symbol`, if the transition exists.
    #[cfg(test)]
    pub(crate) fn goto(&self, state: StateId, symbol: Symbol) -> Option<StateId> {
        self.transitions[state as usize]
            .iter()
            .find(|(s, _)| *s == symbol)
            .map(|&(_, target)| target)
    }
}

/// Expand an item set: for every `A → α·Bβ, a` add `B → ·γ, b` for each
/// production `B → γ` and each `b ∈ FIRST(βa)`.
fn closure(grammar: &Grammar, firsts: &FirstSets, kernel: &[Item]) -> Vec<Item> {
    let mut set: HashSet<Item, RandomState> = HashSet::with_hasher(RandomState::new());
    let mut queue: Vec<Item> = Vec::new();
    for &item in kernel {
        if set.insert(item) {
            queue.push(item);
        }
    }

    while let Some(item) = queue.pop() {
        let production = grammar.production(item.prod);
        if let Some(Symbol::NonTerminal(b)) = item.next_symbol(grammar) {
            let beta = &production.rhs[item.dot as usize + 1..];
            let lookaheads = firsts.first_of(beta, item.lookahead);
            for &prod in grammar.productions_of(b) {
                for &lookahead in &lookaheads {
                    let new = Item {
                        prod,
                        dot: 0,
                        lookahead,
                    };
                    if set.insert(new) {
                        queue.push(new);
                    }
                }
            }
        }
    }

    let mut items: Vec<Item> = set.into_iter().collect();
    items.sort_unstable();
    items
}

/// Report reduce/reduce conflicts that exist in a merged state but in none
/// of its source states.
fn detect_introduced_conflicts(
    grammar: &Grammar,
    merged: &[Vec<Item>],
    groups: &[Vec<StateId>],
    originals: &[Vec<Item>],
) -> Vec<String> {
    let mut diagnostics = Vec::new();
    for (state, items) in merged.iter().enumerate() {
        let mut complete: BTreeMap<TermId, Vec<Item>> = BTreeMap::new();
        for &item in items {
            if item.is_complete(grammar) && item.prod != ProdId(0) {
                complete.entry(item.lookahead).or_default().push(item);
            }
        }
        for (lookahead, conflicting) in complete {
            for i in 0..conflicting.len() {
                for j in i + 1..conflicting.len() {
                    let (a, b) = (conflicting[i], conflicting[j]);
                    let preexisting = groups[state].iter().any(|&old| {
                        let source = &originals[old as usize];
                        source.binary_search(&a).is_ok() && source.binary_search(&b).is_ok()
                    });
                    if !preexisting {
                        diagnostics.push(format!(
                            "LALR merging introduced a reduce/reduce conflict in state {} \
                             on lookahead '{}': {} vs {}",
                            state,
                            grammar.terminal(lookahead).name,
                            grammar.production_display(a.prod),
                            grammar.production_display(b.prod),
                        ));
                    }
                }
            }
        }
    }
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{GrammarBuilder, TerminalSpec};

    fn arithmetic() -> Grammar {
        let mut builder = GrammarBuilder::new();
        builder
            .terminal("number", TerminalSpec::regex(r"\d+"))
            .terminal("plus", TerminalSpec::literal("+"))
            .rule("E", &["E", "plus", "E"])
            .rule("E", &["number"])
            .start("E");
        builder.build().unwrap()
    }

    #[test]
    fn start_state_contains_augmented_item() {
        let grammar = arithmetic();
        let firsts = FirstSets::compute(&grammar);
        let automaton = Automaton::build(&grammar, &firsts, false);
        assert!(automaton.states[0].contains(&Item {
            prod: ProdId(0),
            dot: 0,
            lookahead: TermId::STOP,
        }));
        // Closure adds items for every production of the start symbol.
        let kernels: Vec<_> = automaton.states[0]
            .iter()
            .filter(|item| item.dot == 0 && item.prod != ProdId(0))
            .collect();
        assert!(!kernels.is_empty());
    }

    #[test]
    fn goto_exists_for_every_dotted_symbol() {
        let grammar = arithmetic();
        let firsts = FirstSets::compute(&grammar);
        let automaton = Automaton::build(&grammar, &firsts, true);
        for (state, items) in automaton.states.iter().enumerate() {
            for &item in items {
                if let Some(symbol) = item.next_symbol(&grammar) {
                    if symbol == Symbol::Terminal(TermId::STOP) {
                        continue;
                    }
                    assert!(
                        automaton.goto(state as StateId, symbol).is_some(),
                        "missing goto from state {state} on {:?}",
                        symbol
                    );
                }
            }
        }
    }

    #[test]
    fn lalr_merges_cores() {
        let grammar = arithmetic();
        let firsts = FirstSets::compute(&grammar);
        let lr1 = Automaton::build(&grammar, &firsts, false);
        let lalr = Automaton::build(&grammar, &firsts, true);
        assert!(lalr.states.len() <= lr1.states.len());
        assert!(lalr.diagnostics.is_empty());
    }

    #[test]
    fn construction_is_deterministic() {
        let grammar = arithmetic();
        let firsts = FirstSets::compute(&grammar);
        let first_run = Automaton::build(&grammar, &firsts, true);
        let second_run = Automaton::build(&grammar, &firsts, true);
        assert_eq!(first_run.states, second_run.states);
        assert_eq!(first_run.transitions, second_run.transitions);
    }
}
