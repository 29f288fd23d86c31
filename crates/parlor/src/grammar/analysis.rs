//! Nullability and FIRST-set computation.
//!
//! Both relations are computed by monotone fixed-point iteration over the
//! productions, so termination is guaranteed. The sets are frozen into
//! sorted vectors; the item-set closure consumes them through
//! [`FirstSets::first_of`].

use super::{Grammar, NonTermId, Symbol, TermId};
use ahash::RandomState;
use hashbrown::HashSet;
use smallvec::SmallVec;

/// Nullability and FIRST sets for every nonterminal of a grammar.
#[derive(Debug, Clone)]
pub struct FirstSets {
    nullable: Vec<bool>,
    first: Vec<Vec<TermId>>,
}

impl FirstSets {
    /// Compute the sets for a frozen grammar.
    #[must_use]
    pub fn compute(grammar: &Grammar) -> Self {
        let n = grammar.nonterm_count();
        let mut nullable = vec![false; n];
        let mut first: Vec<HashSet<TermId, RandomState>> =
            (0..n).map(|_| HashSet::with_hasher(RandomState::new())).collect();

        let mut changed = true;
        while changed {
            changed = false;
            for production in grammar.productions() {
                let lhs = production.lhs.index();
                let mut all_nullable = true;
                for &symbol in &production.rhs {
                    match symbol {
                        Symbol::Terminal(t) => {
                            changed |= first[lhs].insert(t);
                            all_nullable = false;
                        }
                        Symbol::NonTerminal(nt) => {
                            let additions: SmallVec<[TermId; 8]> =
                                first[nt.index()].iter().copied().collect();
                            for t in additions {
                                changed |= first[lhs].insert(t);
                            }
                            if !nullable[nt.index()] {
                                all_nullable = false;
                            }
                        }
                    }
                    if !all_nullable {
                        break;
                    }
                }
                if all_nullable && !nullable[lhs] {
                    nullable[lhs] = true;
                    changed = true;
                }
            }
        }

        let first = first
            .into_iter()
            .map(|set| {
                let mut sorted: Vec<TermId> = set.into_iter().collect();
                sorted.sort_unstable();
                sorted
            })
            .collect();

        Self { nullable, first }
    }

    /// Whether the nonterminal derives ε.
    #[must_use]
    pub fn nullable(&self, id: NonTermId) -> bool {
        self.nullable[id.index()]
    }

    /// FIRST set of the nonterminal, sorted by terminal id.
    #[must_use]
    pub fn first(&self, id: NonTermId) -> &[TermId] {
        &self.first[id.index()]
    }

    /// Whether every symbol of the sequence is nullable.
    #[must_use]
    pub fn sequence_nullable(&self, symbols: &[Symbol]) -> bool {
        symbols.iter().all(|&symbol| match symbol {
            Symbol::Terminal(_) => false,
            Symbol::NonTerminal(nt) => self.nullable(nt),
        })
    }

    /// `FIRST(symbols · lookahead)`: first of each symbol left to right,
    /// stopping at the first non-nullable one; the lookahead itself when the
    /// whole sequence is nullable. Sorted and deduplicated.
    #[must_use]
    pub fn first_of(&self, symbols: &[Symbol], lookahead: TermId) -> SmallVec<[TermId; 4]> {
        let mut out: SmallVec<[TermId; 4]> = SmallVec::new();
        let mut nullable_prefix = true;
        for &symbol in symbols {
            match symbol {
                Symbol::Terminal(t) => {
                    out.push(t);
                    nullable_prefix = false;
                }
                Symbol::NonTerminal(nt) => {
                    out.extend_from_slice(self.first(nt));
                    nullable_prefix = self.nullable(nt);
                }
            }
            if !nullable_prefix {
                break;
            }
        }
        if nullable_prefix {
            out.push(lookahead);
        }
        out.sort_unstable();
        out.dedup();
        out
    }
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
            .terminal("lparen", TerminalSpec::literal("("))
            .terminal("rparen", TerminalSpec::literal(")"))
            .rule("E", &["E", "plus", "T"])
            .rule("E", &["T"])
            .rule("T", &["lparen", "E", "rparen"])
            .rule("T", &["number"])
            .start("E");
        builder.build().unwrap()
    }

    fn nt(grammar: &Grammar, name: &str) -> NonTermId {
        let index = grammar
            .nonterminals()
            .iter()
            .position(|n| n.name == name)
            .unwrap();
        NonTermId(index as u32)
    }

    fn term(grammar: &Grammar, name: &str) -> TermId {
        let index = grammar
            .terminals()
            .iter()
            .position(|t| t.name == name)
            .unwrap();
        TermId(index as u32)
    }

    #[test]
    fn first_of_expression_grammar() {
        let grammar = arithmetic();
        let firsts = FirstSets::compute(&grammar);
        let e = nt(&grammar, "E");
        let t = nt(&grammar, "T");
        let number = term(&grammar, "number");
        let lparen = term(&grammar, "lparen");

        assert!(!firsts.nullable(e));
        assert_eq!(firsts.first(e), &[number, lparen]);
        assert_eq!(firsts.first(e), firsts.first(t));
    }

    #[test]
    fn nullable_propagates_through_sequences() {
        let mut builder = GrammarBuilder::new();
        builder
            .terminal("a", TerminalSpec::literal("a"))
            .rule("S", &["A", "B"])
            .rule("A", &[])
            .rule("B", &[])
            .rule("B", &["a"])
            .start("S");
        let grammar = builder.build().unwrap();
        let firsts = FirstSets::compute(&grammar);
        assert!(firsts.nullable(nt(&grammar, "S")));
        assert!(firsts.nullable(nt(&grammar, "A")));
        assert!(firsts.nullable(nt(&grammar, "B")));
        assert_eq!(firsts.first(nt(&grammar, "S")), &[term(&grammar, "a")]);
    }

    #[test]
    fn first_of_sequence_with_lookahead() {
        let grammar = arithmetic();
        let firsts = FirstSets::compute(&grammar);
        let plus = term(&grammar, "plus");
        let number = term(&grammar, "number");
        let lparen = term(&grammar, "lparen");

        // FIRST(T · plus) where T is not nullable: lookahead excluded.
        let t = nt(&grammar, "T");
        let seq = [Symbol::NonTerminal(t)];
        let first = firsts.first_of(&seq, plus);
        assert!(first.contains(&number));
        assert!(first.contains(&lparen));
        assert!(!first.contains(&plus));

        // FIRST(ε · plus) is the lookahead alone.
        let first = firsts.first_of(&[], plus);
        assert_eq!(first.as_slice(), &[plus]);
    }

    #[test]
    fn first_is_union_over_productions() {
        let grammar = arithmetic();
        let firsts = FirstSets::compute(&grammar);
        // Fixed point: FIRST(A) equals the union of FIRST(rhs) over A's
        // productions.
        for (index, _) in grammar.nonterminals().iter().enumerate().skip(1) {
            let id = NonTermId(index as u32);
            let mut union: Vec<TermId> = Vec::new();
            for &prod in grammar.productions_of(id) {
                let rhs = &grammar.production(prod).rhs;
                let mut nullable_prefix = true;
                for &symbol in rhs.iter() {
                    match symbol {
                        Symbol::Terminal(t) => {
                            union.push(t);
                            nullable_prefix = false;
                        }
                        Symbol::NonTerminal(n) => {
                            union.extend_from_slice(firsts.first(n));
                            nullable_prefix = firsts.nullable(n);
                        }
                    }
                    if !nullable_prefix {
                        break;
                    }
                }
            }
            union.sort_unstable();
            union.dedup();
            assert_eq!(union.as_slice(), firsts.first(id));
        }
    }
}
