//! # Parser Runtimes
//!
//! The deterministic [`LrParser`](lr::LrParser) and the generalized
//! [`GlrParser`](glr::GlrParser), their shared configuration and the
//! semantic-action machinery.

pub mod glr;
pub mod lr;

pub use glr::{Forest, GlrParser};
pub use lr::LrParser;

use crate::error::{LrConflictError, ParseError};
use crate::grammar::{Grammar, Production, TermId};
use crate::recognizer::{LayoutRuntime, Recognizer, Skip};
use crate::table::LrTable;
use crate::tree::Span;
use ahash::RandomState;
use compact_str::CompactString;
use hashbrown::HashMap;

/// Configuration shared by both runtimes.
///
/// # Example
///
/// ```rust
/// use parlor::ParserConfig;
///
/// // Default: LALR tables, plain whitespace skipped between tokens.
/// let config = ParserConfig::default();
///
/// // Canonical LR(1) tables and no implicit whitespace skipping.
/// let config = ParserConfig {
///     use_lalr: false,
///     ws: None,
/// };
/// ```
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Merge LR(1) states with identical cores (smaller tables, same power
    /// for most grammars). Disable for canonical LR(1).
    pub use_lalr: bool,

    /// Characters skipped between tokens when no layout grammar is
    /// configured. `None` disables skipping entirely.
    pub ws: Option<CompactString>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            use_lalr: true,
            ws: Some(" \t\r\n".into()),
        }
    }
}

/// Context handed to semantic actions.
///
/// Carries the covered span, the reduced production (absent for terminal
/// actions) and the input. Richer context is deliberately not provided.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    /// Input covered by the value under construction.
    pub span: Span,
    /// The production being reduced; `None` in terminal actions.
    pub production: Option<&'a Production>,
    /// The full input text.
    pub input: &'a str,
}

/// Semantic action for one production: receives the context and the child
/// values in rhs order.
pub type RuleFn<V> = Box<dyn Fn(&Context<'_>, Vec<V>) -> V + Send + Sync>;

/// Semantic action for a terminal: receives the context and the lexeme.
pub type TokenFn<V> = Box<dyn Fn(&Context<'_>, &str) -> V + Send + Sync>;

/// Semantic actions keyed by symbol name.
///
/// Production functions are dispatched by the production's ordinal within
/// its nonterminal, in declaration order. A nonterminal without functions
/// passes its first child through. Terminals fall back to the default token
/// function given to [`Actions::new`].
pub struct Actions<V> {
    default_token: TokenFn<V>,
    tokens: HashMap<CompactString, TokenFn<V>, RandomState>,
    rules: HashMap<CompactString, Vec<RuleFn<V>>, RandomState>,
}

impl<V> Actions<V> {
    /// Create an action table with a default terminal handler.
    #[must_use]
    pub fn new<F>(default_token: F) -> Self
    where
        F: Fn(&Context<'_>, &str) -> V + Send + Sync + 'static,
    {
        Self {
            default_token: Box::new(default_token),
            tokens: HashMap::with_hasher(RandomState::new()),
            rules: HashMap::with_hasher(RandomState::new()),
        }
    }

    /// Override the handler for one terminal.
    #[must_use]
    pub fn terminal<F>(mut self, name: impl Into<CompactString>, f: F) -> Self
    where
        F: Fn(&Context<'_>, &str) -> V + Send + Sync + 'static,
    {
        self.tokens.insert(name.into(), Box::new(f));
        self
    }

    /// Supply per-production functions for a nonterminal, in declaration
    /// order of its productions.
    #[must_use]
    pub fn rule(mut self, name: impl Into<CompactString>, fns: Vec<RuleFn<V>>) -> Self {
        self.rules.insert(name.into(), fns);
        self
    }

    pub(crate) fn token_value(&self, ctx: &Context<'_>, name: &str, lexeme: &str) -> V {
        match self.tokens.get(name) {
            Some(f) => f(ctx, lexeme),
            None => (self.default_token)(ctx, lexeme),
        }
    }

    pub(crate) fn reduce_value(
        &self,
        grammar: &Grammar,
        ctx: &Context<'_>,
        production: &Production,
        mut children: Vec<V>,
    ) -> V {
        let lhs = &grammar.nonterminal(production.lhs).name;
        if let Some(fns) = self.rules.get(lhs.as_str()) {
            if let Some(f) = fns.get(production.nt_index as usize) {
                return f(ctx, children);
            }
        }
        // Pass-through default. An empty production without a function is a
        // programmer error.
        if children.is_empty() {
            panic!(
                "no semantic action for empty production '{}'",
                grammar.production_display(production.index)
            );
        }
        children.swap_remove(0)
    }
}

/// Build the recognizer for a grammar under a configuration; compiles the
/// layout grammar's table when one is present.
pub(crate) fn build_recognizer<'g>(
    grammar: &'g Grammar,
    config: &ParserConfig,
) -> Result<Recognizer<'g>, LrConflictError> {
    let skip = if let Some(layout) = grammar.layout() {
        let table = LrTable::build(layout, config.use_lalr, false)?;
        Skip::Layout(LayoutRuntime { table })
    } else if let Some(ws) = &config.ws {
        Skip::Chars(ws.clone())
    } else {
        Skip::None
    };
    Ok(Recognizer::new(grammar, skip))
}

/// 1-based line and column of a byte position.
pub(crate) fn line_col(input: &str, pos: usize) -> (usize, usize) {
    let prefix = &input[..pos.min(input.len())];
    let line = prefix.bytes().filter(|&b| b == b'\n').count() + 1;
    let column = match prefix.rfind('\n') {
        Some(nl) => prefix[nl + 1..].chars().count() + 1,
        None => prefix.chars().count() + 1,
    };
    (line, column)
}

/// Assemble a [`ParseError`] at a position with the expected-terminal set.
pub(crate) fn parse_error_at(
    grammar: &Grammar,
    input: &str,
    pos: usize,
    expected: &[TermId],
) -> ParseError {
    let (line, column) = line_col(input, pos);
    let found: String = if pos >= input.len() {
        "<EOF>".to_string()
    } else {
        input[pos..].chars().take(16).collect()
    };
    ParseError {
        position: pos,
        line,
        column,
        expected: expected
            .iter()
            .filter(|&&t| t != TermId::EMPTY)
            .map(|&t| grammar.terminal(t).name.to_string())
            .collect(),
        found,
    }
}
