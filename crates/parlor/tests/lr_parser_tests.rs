//! Tests for the deterministic LR runtime

use parlor::{
    Actions, Assoc, Grammar, GrammarBuilder, LrParser, ParseTree, ParserConfig, TerminalSpec,
};

/// Arithmetic with the full operator set and conventional precedences.
fn calculator_grammar() -> Grammar {
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

fn calculator_actions() -> Actions<f64> {
    Actions::new(|_, lexeme: &str| lexeme.parse().unwrap_or(0.0)).rule(
        "E",
        vec![
            Box::new(|_, v: Vec<f64>| v[0] + v[2]),
            Box::new(|_, v: Vec<f64>| v[0] - v[2]),
            Box::new(|_, v: Vec<f64>| v[0] * v[2]),
            Box::new(|_, v: Vec<f64>| v[0] / v[2]),
            Box::new(|_, v: Vec<f64>| v[0].powf(v[2])),
            Box::new(|_, v: Vec<f64>| v[1]),
            Box::new(|_, v: Vec<f64>| v[0]),
        ],
    )
}

#[test]
fn arithmetic_with_precedence() {
    let grammar = calculator_grammar();
    let parser = LrParser::new(&grammar).expect("all conflicts resolve");
    let actions = calculator_actions();

    let value = parser
        .parse_with_actions("34 + 4.6 / 2 * 4^2^2 + 78", &actions)
        .expect("input parses");
    assert!((value - 700.8).abs() < 1e-9, "got {value}");

    let value = parser
        .parse_with_actions("2 ^ 3 ^ 2", &actions)
        .expect("right associative power");
    assert!((value - 512.0).abs() < 1e-9);

    let value = parser
        .parse_with_actions("(1 + 2) * 3", &actions)
        .expect("parens override precedence");
    assert!((value - 9.0).abs() < 1e-9);
}

#[test]
fn precedence_shapes_the_tree() {
    let grammar = calculator_grammar();
    let parser = LrParser::new(&grammar).unwrap();
    let tree = parser.parse("1+2*3").unwrap();

    // Root is the addition; multiplication binds tighter on the right.
    let ParseTree::NonTerminal {
        production,
        children,
        ..
    } = &tree
    else {
        panic!("root is a nonterminal");
    };
    assert_eq!(*production, 1, "root production is E: E plus E");
    let ParseTree::NonTerminal {
        production: right, ..
    } = &children[2]
    else {
        panic!("right operand is a nonterminal");
    };
    assert_eq!(*right, 3, "right child is E: E times E");
}

#[test]
fn dangling_else_binds_to_the_inner_if() {
    let mut builder = GrammarBuilder::new();
    builder
        .terminal("if", TerminalSpec::literal("if"))
        .terminal("then", TerminalSpec::literal("then"))
        .terminal("else", TerminalSpec::literal("else"))
        .terminal("x", TerminalSpec::literal("x"))
        .terminal("cond", TerminalSpec::regex("[ab]"))
        // The tie on 'else' is resolved toward shift.
        .rule_prec("S", &["if", "cond", "then", "S"], 10, Assoc::Right)
        .rule("S", &["if", "cond", "then", "S", "else", "S"])
        .rule("S", &["x"])
        .start("S");
    let grammar = builder.build().unwrap();
    let parser = LrParser::new(&grammar).expect("tie resolves toward shift");

    let tree = parser.parse("if a then if b then x else x").unwrap();
    let ParseTree::NonTerminal {
        production,
        children,
        ..
    } = &tree
    else {
        panic!("root is a nonterminal");
    };
    // Outer if has no else; the inner one consumed it.
    assert_eq!(*production, 1);
    let ParseTree::NonTerminal {
        production: inner, ..
    } = &children[3]
    else {
        panic!("inner statement is a nonterminal");
    };
    assert_eq!(*inner, 2);
}

fn list_grammar() -> Grammar {
    let mut builder = GrammarBuilder::new();
    builder
        .terminal("comma", TerminalSpec::literal(","))
        .terminal("x", TerminalSpec::regex("[ab]"))
        .rule("L", &["L", "comma", "x"])
        .rule("L", &["x"])
        .rule("L", &[])
        .start("L");
    builder.build().unwrap()
}

#[test]
fn empty_production_parses_empty_input() {
    let grammar = list_grammar();
    let parser = LrParser::new(&grammar).unwrap();
    let tree = parser.parse("").unwrap();
    let ParseTree::NonTerminal {
        production,
        children,
        span,
        ..
    } = &tree
    else {
        panic!("root is a nonterminal");
    };
    assert_eq!(*production, 3, "the ε-production reduced");
    assert!(children.is_empty());
    assert!(span.is_empty());
}

#[test]
fn list_elements_come_back_in_order() {
    let grammar = list_grammar();
    let parser = LrParser::new(&grammar).unwrap();
    let tree = parser.parse("a , b").unwrap();
    let elements: Vec<&str> = tree
        .leaves()
        .into_iter()
        .filter(|leaf| leaf.symbol() == "x")
        .map(|leaf| leaf.text("a , b"))
        .collect();
    assert_eq!(elements, ["a", "b"]);
}

#[test]
fn keyword_beats_identifier_at_equal_length() {
    let mut builder = GrammarBuilder::new();
    builder
        .terminal("IF", TerminalSpec::literal("if"))
        .terminal("ID", TerminalSpec::regex("[a-z]+"))
        .rule("S", &["IF"])
        .rule("S", &["ID"])
        .start("S");
    let grammar = builder.build().unwrap();
    let parser = LrParser::new(&grammar).unwrap();

    let tree = parser.parse("if").unwrap();
    assert_eq!(tree.leaves()[0].symbol(), "IF");

    // A longer identifier outgrows the keyword prefix.
    let tree = parser.parse("iffy").unwrap();
    assert_eq!(tree.leaves()[0].symbol(), "ID");
}

fn commented_grammar() -> Grammar {
    let mut layout = GrammarBuilder::new();
    layout
        .terminal("ws", TerminalSpec::regex(r"\s+"))
        .terminal("comment", TerminalSpec::regex(r"/\*.*?\*/"))
        .rule("LAYOUT", &["unit", "LAYOUT"])
        .rule("LAYOUT", &[])
        .rule("unit", &["ws"])
        .rule("unit", &["comment"])
        .start("LAYOUT");

    let mut builder = GrammarBuilder::new();
    builder
        .terminal("id", TerminalSpec::regex("[ab]"))
        .terminal("plus", TerminalSpec::literal("+").prec(1, Assoc::Left))
        .rule("E", &["E", "plus", "E"])
        .rule("E", &["id"])
        .start("E")
        .layout(layout);
    builder.build().unwrap()
}

#[test]
fn layout_grammar_skips_comments() {
    let grammar = commented_grammar();
    let parser = LrParser::new(&grammar).unwrap();
    let input = "a  /*c*/  +  b";
    let tree = parser.parse(input).unwrap();

    // Layout is absent from the tree.
    let leaves: Vec<&str> = tree.leaves().iter().map(|l| l.symbol()).collect();
    assert_eq!(leaves, ["id", "plus", "id"]);

    // Spans still cover the original input, layout included.
    assert_eq!(tree.text(input), input);
}

#[test]
fn parse_round_trips_through_spans() {
    let grammar = calculator_grammar();
    let parser = LrParser::new(&grammar).unwrap();
    let input = "34 + 4.6 / 2 * 4^2^2 + 78";
    let tree = parser.parse(input).unwrap();
    let rendered = tree.text(input);
    assert_eq!(rendered, input);
    let reparsed = parser.parse(rendered).unwrap();
    assert_eq!(tree, reparsed);
}

#[test]
fn syntax_error_reports_position_and_expectations() {
    let grammar = calculator_grammar();
    let parser = LrParser::new(&grammar).unwrap();

    let error = parser.parse("34 + + 2").unwrap_err();
    assert_eq!(error.position, 5);
    assert_eq!(error.line, 1);
    assert_eq!(error.column, 6);
    assert!(error.expected.iter().any(|t| t == "number"));
    assert!(error.expected.iter().any(|t| t == "lparen"));
    assert!(error.found.starts_with('+'));

    let error = parser.parse("34 +").unwrap_err();
    assert_eq!(error.position, 4);
    assert_eq!(error.found, "<EOF>");

    let error = parser.parse("1\n+ 2 +\n* 3").unwrap_err();
    assert_eq!(error.line, 3);
    assert_eq!(error.column, 1);
}

#[test]
fn ws_override_disables_skipping() {
    let grammar = list_grammar();
    let config = ParserConfig {
        use_lalr: true,
        ws: None,
    };
    let parser = LrParser::with_config(&grammar, &config).unwrap();
    assert!(parser.parse("a,b").is_ok());
    assert!(parser.parse("a , b").is_err());
}

#[test]
fn lr1_and_lalr_agree_on_plain_grammars() {
    let grammar = calculator_grammar();
    let lalr = LrParser::new(&grammar).unwrap();
    let lr1 = LrParser::with_config(
        &grammar,
        &ParserConfig {
            use_lalr: false,
            ws: Some(" \t\r\n".into()),
        },
    )
    .unwrap();
    let input = "1 + 2 * (3 - 4) ^ 2";
    assert_eq!(lalr.parse(input).unwrap(), lr1.parse(input).unwrap());
    assert!(lalr.diagnostics().is_empty());
}
