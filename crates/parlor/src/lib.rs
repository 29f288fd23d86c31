//! # Parlor
//!
//! A scannerless LR(1)/GLR parser generator and runtime for context-free
//! grammars with operator precedence, associativity and declarative
//! conflict resolution.
//!
//! ## Overview
//!
//! A grammar is described programmatically — productions, terminal
//! recognizers (literal, regex or custom), a start symbol, an optional
//! layout sub-grammar — and compiled into a deterministic pushdown
//! automaton (canonical LR(1) or LALR). The automaton is executed directly
//! against an input string: terminals are matched on demand from the
//! expected set of the current state, with no separate tokenizer pass.
//!
//! - [`LrParser`] runs the deterministic shift/reduce loop and requires a
//!   conflict-free table; precedence and associativity annotations resolve
//!   most conflicts declaratively.
//! - [`GlrParser`] keeps every conflicting action and explores all of them
//!   over a graph-structured stack, returning a [`Forest`] that packs every
//!   derivation of an ambiguous input.
//!
//! Parse results are concrete [`ParseTree`]s, or semantic values computed
//! bottom-up through [`Actions`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use parlor::{Actions, Assoc, GrammarBuilder, LrParser, TerminalSpec};
//!
//! let mut builder = GrammarBuilder::new();
//! builder
//!     .terminal("number", TerminalSpec::regex(r"\d+(\.\d+)?"))
//!     .terminal("plus", TerminalSpec::literal("+").prec(1, Assoc::Left))
//!     .terminal("times", TerminalSpec::literal("*").prec(2, Assoc::Left))
//!     .rule("E", &["E", "plus", "E"])
//!     .rule("E", &["E", "times", "E"])
//!     .rule("E", &["number"])
//!     .start("E");
//! let grammar = builder.build()?;
//!
//! let parser = LrParser::new(&grammar)?;
//! let actions: Actions<f64> = Actions::new(|_, lexeme| lexeme.parse().unwrap_or(0.0))
//!     .rule(
//!         "E",
//!         vec![
//!             Box::new(|_, values: Vec<f64>| values[0] + values[2]),
//!             Box::new(|_, values: Vec<f64>| values[0] * values[2]),
//!             Box::new(|_, values: Vec<f64>| values[0]),
//!         ],
//!     );
//! let value = parser.parse_with_actions("2 + 3 * 4", &actions)?;
//! assert_eq!(value, 14.0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Modules
//!
//! - [`grammar`] - grammar model, builder and FIRST-set analysis
//! - [`table`] - ACTION/GOTO tables and conflict resolution
//! - [`parser`] - the LR and GLR runtimes and semantic actions
//! - [`tree`] - concrete parse trees and spans
//! - [`error`] - error types

pub mod error;
pub mod grammar;
pub mod parser;
pub mod table;
pub mod tree;

pub(crate) mod recognizer;

// Re-export commonly used types
pub use error::{AmbiguityError, GrammarError, LrConflictError, ParseError};
pub use grammar::{Assoc, Grammar, GrammarBuilder, TerminalSpec};
pub use parser::{Actions, Context, Forest, GlrParser, LrParser, ParserConfig, RuleFn, TokenFn};
pub use tree::{ParseTree, Span};
