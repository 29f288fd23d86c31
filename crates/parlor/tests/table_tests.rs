//! Tests for parse-table construction and conflict reporting

use parlor::error::ConflictKind;
use parlor::grammar::{GrammarBuilder, TermId, TerminalSpec};
use parlor::table::LrTable;
use parlor::{Assoc, Grammar};

fn precedence_grammar() -> Grammar {
    let mut builder = GrammarBuilder::new();
    builder
        .terminal("number", TerminalSpec::regex(r"\d+(\.\d+)?"))
        .terminal("plus", TerminalSpec::literal("+").prec(1, Assoc::Left))
        .terminal("minus", TerminalSpec::literal("-").prec(1, Assoc::Left))
        .terminal("times", TerminalSpec::literal("*").prec(2, Assoc::Left))
        .terminal("divide", TerminalSpec::literal("/").prec(2, Assoc::Left))
        .terminal("power", TerminalSpec::literal("^").prec(3, Assoc::Right))
        .terminal("lparen", TerminalSpec::literal("("))
        .terminal("rparen", TerminalSpec::literal(")"))
        .rule("E", &["E", "plus", "E"])
        .rule("E", &["E", "minus", "E"])
        .rule("E", &["E", "times", "E"])
        .rule("E", &["E", "divide", "E"])
        .rule("E", &["E", "power", "E"])
        .rule("E", &["lparen", "E", "rparen"])
        .rule("E", &["number"])
        .start("E");
    builder.build().expect("grammar builds")
}

fn assert_deterministic(grammar: &Grammar, table: &LrTable) {
    for state in 0..table.num_states() {
        for term in 0..grammar.term_count() {
            let cell = table.actions(state as u32, term_id(grammar, term));
            assert!(
                cell.len() <= 1,
                "state {state} keeps {} actions on '{}'",
                cell.len(),
                grammar.terminals()[term].name
            );
        }
    }
}

fn term_id(grammar: &Grammar, index: usize) -> TermId {
    let name = grammar.terminals()[index].name.as_str();
    grammar.terminal_id(name).expect("declared terminal resolves")
}

#[test]
fn operator_precedence_leaves_no_conflicts() {
    let grammar = precedence_grammar();
    let table = LrTable::build(&grammar, true, false).expect("all conflicts resolve");
    assert_deterministic(&grammar, &table);
    assert!(table.diagnostics().is_empty());
}

#[test]
fn table_construction_is_idempotent() {
    let grammar = precedence_grammar();
    let first = LrTable::build(&grammar, true, false).unwrap();
    let second = LrTable::build(&grammar, true, false).unwrap();
    assert_eq!(first.num_states(), second.num_states());
    for state in 0..first.num_states() as u32 {
        for term in 0..grammar.term_count() {
            let id = term_id(&grammar, term);
            assert_eq!(first.actions(state, id), second.actions(state, id));
        }
        for production in grammar.productions() {
            assert_eq!(
                first.goto(state, production.lhs),
                second.goto(state, production.lhs)
            );
        }
    }
}

#[test]
fn shift_reduce_conflict_is_reported() {
    // As needs two tokens of lookahead to know when to stop growing.
    let mut builder = GrammarBuilder::new();
    builder
        .terminal("A", TerminalSpec::literal("A"))
        .rule("S", &["As", "A", "A"])
        .rule("As", &["As", "A"])
        .rule("As", &["A"])
        .start("S");
    let grammar = builder.build().unwrap();
    let error = LrTable::build(&grammar, true, false).unwrap_err();
    assert!(error
        .conflicts
        .iter()
        .any(|c| c.kind == ConflictKind::ShiftReduce));
    assert!(error.to_string().contains("As: As A"));
}

#[test]
fn reduce_reduce_conflict_on_empty_productions_is_reported() {
    let mut builder = GrammarBuilder::new();
    builder
        .terminal("A", TerminalSpec::literal("A"))
        .terminal("C", TerminalSpec::literal("C"))
        .terminal("B1", TerminalSpec::literal("B1"))
        .terminal("D1", TerminalSpec::literal("D1"))
        .rule("S", &["A", "B", "C"])
        .rule("S", &["A", "D", "C"])
        .rule("B", &["B1"])
        .rule("B", &[])
        .rule("D", &["D1"])
        .rule("D", &[])
        .start("S");
    let grammar = builder.build().unwrap();
    let error = LrTable::build(&grammar, true, false).unwrap_err();
    let message = error.to_string();
    assert!(error
        .conflicts
        .iter()
        .any(|c| c.kind == ConflictKind::ReduceReduce));
    assert!(message.contains("B: <EMPTY>"));
    assert!(message.contains("D: <EMPTY>"));
}

#[test]
fn reduce_reduce_conflict_on_identical_bodies_is_reported() {
    let mut builder = GrammarBuilder::new();
    builder
        .terminal("A1", TerminalSpec::literal("A1"))
        .terminal("B1", TerminalSpec::literal("B1"))
        .rule("S", &["A"])
        .rule("S", &["B"])
        .rule("A", &["A1", "B1"])
        .rule("B", &["A1", "B1"])
        .start("S");
    let grammar = builder.build().unwrap();
    let error = LrTable::build(&grammar, true, false).unwrap_err();
    let message = error.to_string();
    assert!(message.contains("A: A1 B1"));
    assert!(message.contains("B: A1 B1"));
}

#[test]
fn lalr_merge_that_introduces_conflicts_is_diagnosed() {
    // The classic LALR-but-not-LR(1) failure: merging the states after
    // 'a e' and 'b e' mixes the lookaheads of E and F.
    let mut builder = GrammarBuilder::new();
    builder
        .terminal("a", TerminalSpec::literal("a"))
        .terminal("b", TerminalSpec::literal("b"))
        .terminal("c", TerminalSpec::literal("c"))
        .terminal("d", TerminalSpec::literal("d"))
        .terminal("e", TerminalSpec::literal("e"))
        .rule("S", &["a", "E", "c"])
        .rule("S", &["a", "F", "d"])
        .rule("S", &["b", "F", "c"])
        .rule("S", &["b", "E", "d"])
        .rule("E", &["e"])
        .rule("F", &["e"])
        .start("S");
    let grammar = builder.build().unwrap();

    // Canonical LR(1) handles the grammar.
    let lr1 = LrTable::build(&grammar, false, false).expect("LR(1) is conflict free");
    assert_deterministic(&grammar, &lr1);

    // LALR merging introduces a reduce/reduce conflict; the merge is
    // diagnosed and construction proceeds, so the GLR table still builds.
    let lalr = LrTable::build(&grammar, true, true).expect("GLR table keeps conflicts");
    assert!(lalr
        .diagnostics()
        .iter()
        .any(|d| d.contains("LALR merging introduced")));

    // In LR mode the same conflict is fatal.
    let error = LrTable::build(&grammar, true, false).unwrap_err();
    assert!(error
        .conflicts
        .iter()
        .any(|c| c.kind == ConflictKind::ReduceReduce));
}
