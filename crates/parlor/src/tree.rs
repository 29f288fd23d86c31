//! Concrete parse trees built by the default (action-less) parse.

use compact_str::CompactString;
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Byte span into the parsed input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Span {
    /// Byte offset of the first covered character.
    pub start: usize,
    /// Byte offset one past the last covered character.
    pub end: usize,
}

impl Span {
    /// Create a span covering `start..end`.
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Create an empty span at `pos`.
    #[must_use]
    pub const fn empty(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    /// Length of the span in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    /// Check whether the span covers no input.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Smallest span covering both `self` and `other`.
    #[must_use]
    pub fn cover(self, other: Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// A node of the concrete parse tree.
///
/// Terminal leaves keep the matched lexeme; interior nodes record the
/// production that produced them so semantic processing can be layered on
/// after the fact. Layout (whitespace, comments) is never present in the
/// tree; slicing the original input by [`ParseTree::span`] restores it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum ParseTree {
    /// A matched terminal.
    Terminal {
        /// Terminal name as declared in the grammar.
        terminal: CompactString,
        /// The exact input slice the recognizer matched.
        lexeme: CompactString,
        /// Location of the lexeme in the input.
        span: Span,
    },
    /// A reduced nonterminal.
    NonTerminal {
        /// Nonterminal name.
        symbol: CompactString,
        /// Index of the production that was reduced.
        production: u32,
        /// Child values in rhs order.
        children: Vec<ParseTree>,
        /// Input covered by this derivation.
        span: Span,
    },
}

impl ParseTree {
    /// The input span covered by this node.
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::Terminal { span, .. } | Self::NonTerminal { span, .. } => *span,
        }
    }

    /// The grammar symbol name of this node.
    #[must_use]
    pub fn symbol(&self) -> &str {
        match self {
            Self::Terminal { terminal, .. } => terminal,
            Self::NonTerminal { symbol, .. } => symbol,
        }
    }

    /// Whether this node is a terminal leaf.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal { .. })
    }

    /// Child nodes; empty for terminals.
    #[must_use]
    pub fn children(&self) -> &[ParseTree] {
        match self {
            Self::Terminal { .. } => &[],
            Self::NonTerminal { children, .. } => children,
        }
    }

    /// Terminal leaves in left-to-right order.
    #[must_use]
    pub fn leaves(&self) -> Vec<&ParseTree> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a ParseTree>) {
        match self {
            Self::Terminal { .. } => out.push(self),
            Self::NonTerminal { children, .. } => {
                for child in children {
                    child.collect_leaves(out);
                }
            }
        }
    }

    /// Slice of the original input covered by this node, layout included.
    #[must_use]
    pub fn text<'i>(&self, input: &'i str) -> &'i str {
        let span = self.span();
        &input[span.start..span.end]
    }
}
