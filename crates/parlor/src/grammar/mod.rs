//! # Grammar Module
//!
//! Canonical in-memory representation of a context-free grammar.
//!
//! A [`Grammar`] is produced by the [`GrammarBuilder`] and is frozen from
//! that point on: parse tables may be computed from it and it may be shared
//! across threads for read-only parsing. Symbols are identified by dense
//! integer indices; the sentinels `EMPTY` (ε), `STOP` (end of input) and the
//! augmented start symbol `S'` are always present, and production 0 is
//! always `S' → start STOP`.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use parlor::grammar::{Assoc, GrammarBuilder, TerminalSpec};
//!
//! let mut builder = GrammarBuilder::new();
//! builder
//!     .terminal("number", TerminalSpec::regex(r"\d+"))
//!     .terminal("plus", TerminalSpec::literal("+").prec(1, Assoc::Left))
//!     .rule("E", &["E", "plus", "E"])
//!     .rule("E", &["number"])
//!     .start("E");
//! let grammar = builder.build()?;
//! # Ok::<(), parlor::GrammarError>(())
//! ```

pub mod analysis;
pub mod builder;

pub use analysis::FirstSets;
pub use builder::{GrammarBuilder, TerminalSpec};

use compact_str::CompactString;
use smallvec::SmallVec;
use std::sync::Arc;

/// Priority assigned to terminals and productions that carry no annotation.
pub const DEFAULT_PRIORITY: u32 = 10;

/// Associativity used for conflict resolution and GLR disambiguation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Assoc {
    /// No associativity; equal-priority conflicts are retained.
    #[default]
    None,
    /// Left-associative; prefer reduce on equal priority.
    Left,
    /// Right-associative; prefer shift on equal priority.
    Right,
}

/// Dense index of a terminal within a grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermId(pub(crate) u32);

impl TermId {
    /// The ε sentinel, always terminal 0.
    pub const EMPTY: Self = Self(0);
    /// The end-of-input sentinel, always terminal 1.
    pub const STOP: Self = Self(1);

    /// Raw index of this terminal.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Dense index of a nonterminal within a grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NonTermId(pub(crate) u32);

impl NonTermId {
    /// The augmented start symbol `S'`, always nonterminal 0.
    pub const AUGMENTED_START: Self = Self(0);

    /// Raw index of this nonterminal.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Dense index of a production within a grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProdId(pub(crate) u32);

impl ProdId {
    /// Raw index of this production.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A grammar symbol: either a terminal or a nonterminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
    /// Terminal reference.
    Terminal(TermId),
    /// Nonterminal reference.
    NonTerminal(NonTermId),
}

impl Symbol {
    /// The terminal id, if this symbol is a terminal.
    #[must_use]
    pub const fn as_terminal(self) -> Option<TermId> {
        match self {
            Self::Terminal(t) => Some(t),
            Self::NonTerminal(_) => None,
        }
    }

    /// The nonterminal id, if this symbol is a nonterminal.
    #[must_use]
    pub const fn as_nonterminal(self) -> Option<NonTermId> {
        match self {
            Self::Terminal(_) => None,
            Self::NonTerminal(n) => Some(n),
        }
    }
}

/// Signature of a custom terminal recognizer.
///
/// Receives the whole input and the position to match at; returns the end
/// position of the match, or `None` when the terminal does not match.
pub type CustomRecognizer = Arc<dyn Fn(&str, usize) -> Option<usize> + Send + Sync>;

/// How a terminal matches input at a position.
#[derive(Clone)]
pub enum TerminalRecognizer {
    /// ε: matches the empty string anywhere. Sentinel only.
    Empty,
    /// End of input: matches the empty string exactly at the end. Sentinel only.
    Stop,
    /// Literal prefix match.
    Literal(CompactString),
    /// Anchored regex match. The compiled regex lives here for the lifetime
    /// of the grammar; there is no process-wide cache.
    Regex(regex::Regex),
    /// User-supplied matcher.
    Custom(CustomRecognizer),
}

impl std::fmt::Debug for TerminalRecognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "Empty"),
            Self::Stop => write!(f, "Stop"),
            Self::Literal(s) => write!(f, "Literal({s:?})"),
            Self::Regex(re) => write!(f, "Regex({:?})", re.as_str()),
            Self::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// A terminal symbol: name, recognizer and lexical precedence.
#[derive(Debug, Clone)]
pub struct Terminal {
    /// Terminal name as declared.
    pub name: CompactString,
    /// How the terminal matches input.
    pub recognizer: TerminalRecognizer,
    /// Precedence used in shift/reduce resolution. Defaults to
    /// [`DEFAULT_PRIORITY`].
    pub prio: u32,
    /// Associativity inherited by productions whose rightmost terminal this
    /// is. Defaults to [`Assoc::None`].
    pub assoc: Assoc,
}

impl Terminal {
    /// Whether this terminal matches by literal prefix.
    #[must_use]
    pub const fn is_literal(&self) -> bool {
        matches!(self.recognizer, TerminalRecognizer::Literal(_))
    }
}

/// A nonterminal symbol.
#[derive(Debug, Clone)]
pub struct NonTerminal {
    /// Nonterminal name as declared.
    pub name: CompactString,
}

/// A production `lhs → rhs` with disambiguation metadata.
#[derive(Debug, Clone)]
pub struct Production {
    /// Left-hand side nonterminal.
    pub lhs: NonTermId,
    /// Right-hand side symbols; empty for ε-productions.
    pub rhs: SmallVec<[Symbol; 4]>,
    /// Stable production index; 0 is the augmented production.
    pub index: ProdId,
    /// Priority used for conflict resolution and packing disambiguation.
    pub prio: u32,
    /// Associativity used on priority ties.
    pub assoc: Assoc,
    /// Ordinal of this production among the productions of the same lhs;
    /// semantic actions are dispatched by this number.
    pub nt_index: u32,
}

impl Production {
    /// Whether this production derives ε.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rhs.is_empty()
    }

    /// Whether this production is an infix application of its own lhs, i.e.
    /// its rhs both starts and ends with the lhs nonterminal. Associativity
    /// based disambiguation applies only to this shape.
    #[must_use]
    pub fn is_infix(&self) -> bool {
        self.rhs.len() >= 2
            && self.rhs.first() == Some(&Symbol::NonTerminal(self.lhs))
            && self.rhs.last() == Some(&Symbol::NonTerminal(self.lhs))
    }
}

/// A frozen context-free grammar.
///
/// Construction goes through [`GrammarBuilder`]; once built the grammar is
/// immutable and can be shared across threads.
#[derive(Debug, Clone)]
pub struct Grammar {
    pub(crate) terminals: Vec<Terminal>,
    pub(crate) nonterminals: Vec<NonTerminal>,
    pub(crate) productions: Vec<Production>,
    /// Productions grouped by lhs, in declaration order.
    pub(crate) by_lhs: Vec<Vec<ProdId>>,
    pub(crate) start: NonTermId,
    pub(crate) layout: Option<Box<Grammar>>,
}

impl Grammar {
    /// All terminals, sentinels first, then declaration order.
    #[must_use]
    pub fn terminals(&self) -> &[Terminal] {
        &self.terminals
    }

    /// All nonterminals, `S'` first, then declaration order.
    #[must_use]
    pub fn nonterminals(&self) -> &[NonTerminal] {
        &self.nonterminals
    }

    /// All productions; index 0 is `S' → start STOP`.
    #[must_use]
    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    /// Terminal by id.
    #[must_use]
    pub fn terminal(&self, id: TermId) -> &Terminal {
        &self.terminals[id.index()]
    }

    /// Nonterminal by id.
    #[must_use]
    pub fn nonterminal(&self, id: NonTermId) -> &NonTerminal {
        &self.nonterminals[id.index()]
    }

    /// Production by id.
    #[must_use]
    pub fn production(&self, id: ProdId) -> &Production {
        &self.productions[id.index()]
    }

    /// Productions of a nonterminal, in declaration order.
    #[must_use]
    pub fn productions_of(&self, id: NonTermId) -> &[ProdId] {
        &self.by_lhs[id.index()]
    }

    /// The designated start nonterminal (not `S'`).
    #[must_use]
    pub const fn start(&self) -> NonTermId {
        self.start
    }

    /// The layout sub-grammar, if one was configured.
    #[must_use]
    pub fn layout(&self) -> Option<&Grammar> {
        self.layout.as_deref()
    }

    /// Number of terminals, sentinels included.
    #[must_use]
    pub fn term_count(&self) -> usize {
        self.terminals.len()
    }

    /// Number of nonterminals, `S'` included.
    #[must_use]
    pub fn nonterm_count(&self) -> usize {
        self.nonterminals.len()
    }

    /// Terminal id by declared name.
    #[must_use]
    pub fn terminal_id(&self, name: &str) -> Option<TermId> {
        self.terminals
            .iter()
            .position(|t| t.name == name)
            .map(|index| TermId(index as u32))
    }

    /// Nonterminal id by declared name.
    #[must_use]
    pub fn nonterminal_id(&self, name: &str) -> Option<NonTermId> {
        self.nonterminals
            .iter()
            .position(|n| n.name == name)
            .map(|index| NonTermId(index as u32))
    }

    /// Name of any symbol.
    #[must_use]
    pub fn symbol_name(&self, symbol: Symbol) -> &str {
        match symbol {
            Symbol::Terminal(t) => &self.terminal(t).name,
            Symbol::NonTerminal(n) => &self.nonterminal(n).name,
        }
    }

    /// Render a production as `lhs: rhs...` for diagnostics.
    #[must_use]
    pub fn production_display(&self, id: ProdId) -> String {
        let production = self.production(id);
        let lhs = &self.nonterminal(production.lhs).name;
        if production.rhs.is_empty() {
            return format!("{lhs}: <EMPTY>");
        }
        let rhs: Vec<&str> = production
            .rhs
            .iter()
            .map(|&symbol| self.symbol_name(symbol))
            .collect();
        format!("{lhs}: {}", rhs.join(" "))
    }
}
