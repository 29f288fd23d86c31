//! # Error Types
//!
//! Error types for grammar construction, table building and parsing.
//!
//! - [`GrammarError`]: structural problems detected while freezing a grammar
//! - [`LrConflictError`]: unresolved shift/reduce or reduce/reduce conflicts
//!   in deterministic (LR) mode, with a dump of the involved productions
//! - [`ParseError`]: no applicable action at the current input position
//! - [`AmbiguityError`]: a GLR parse produced several derivations when the
//!   caller asked for exactly one
//!
//! Grammar- and table-time errors are fatal and surface immediately.
//! Parse-time errors are reported once, with positional context; there is no
//! recovery. When the `diagnostics` feature is enabled, errors carry
//! [`miette`] diagnostic codes.

use crate::tree::Span;
use thiserror::Error;

#[cfg(feature = "diagnostics")]
use miette::Diagnostic;

/// Structural problem detected during grammar construction.
#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum GrammarError {
    #[error("rule '{rule}' references undefined symbol '{symbol}'")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::undefined_symbol)))]
    UndefinedSymbol { rule: String, symbol: String },

    #[error("terminal '{name}' is defined more than once")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::duplicate_terminal)))]
    DuplicateTerminal { name: String },

    #[error("'{name}' is defined both as a terminal and as a rule")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::terminal_rule_clash)))]
    TerminalRuleClash { name: String },

    #[error("rule '{rule}' mixes EMPTY with other symbols")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::mixed_empty)))]
    MixedEmpty { rule: String },

    #[error("start symbol '{name}' is not defined by any rule")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::undefined_start)))]
    UndefinedStart { name: String },

    #[error("no start symbol was given")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::missing_start)))]
    MissingStart,

    #[error("terminal '{terminal}' has an invalid regex: {source}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::invalid_regex)))]
    InvalidRegex {
        terminal: String,
        #[source]
        source: Box<regex::Error>,
    },
}

/// The flavor of a parse-table conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// A shift and one or more reductions compete for the same cell.
    ShiftReduce,
    /// Two or more reductions compete for the same cell.
    ReduceReduce,
}

/// A single unresolved ACTION-table conflict.
#[derive(Debug, Clone)]
pub struct Conflict {
    /// State in which the conflict occurs.
    pub state: u32,
    /// Lookahead terminal name.
    pub lookahead: String,
    /// Shift/reduce or reduce/reduce.
    pub kind: ConflictKind,
    /// Rendered productions involved in the conflict.
    pub productions: Vec<String>,
}

impl std::fmt::Display for Conflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            ConflictKind::ShiftReduce => "shift/reduce",
            ConflictKind::ReduceReduce => "reduce/reduce",
        };
        write!(
            f,
            "state {}, lookahead '{}': {} conflict involving {}",
            self.state,
            self.lookahead,
            kind,
            self.productions.join("; ")
        )
    }
}

/// Unresolved conflicts left in a deterministic parse table.
///
/// Raised only in LR mode; a GLR table keeps every surviving action instead.
#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
#[cfg_attr(feature = "diagnostics", diagnostic(code(table::conflicts)))]
#[error("{}", render_conflicts(.conflicts))]
pub struct LrConflictError {
    /// All conflicts found, in state order.
    pub conflicts: Vec<Conflict>,
}

fn render_conflicts(conflicts: &[Conflict]) -> String {
    let mut out = format!(
        "grammar is not deterministic: {} unresolved conflict(s)\n",
        conflicts.len()
    );
    for conflict in conflicts {
        out.push_str("  ");
        out.push_str(&conflict.to_string());
        out.push('\n');
    }
    out
}

/// Syntactic error: no applicable action at the current input position.
#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
#[cfg_attr(feature = "diagnostics", diagnostic(code(parser::syntax_error)))]
#[error("parse error at {line}:{column}: expected one of {} but found '{found}'", .expected.join(", "))]
pub struct ParseError {
    /// Byte offset of the failure, after any layout was skipped.
    pub position: usize,
    /// 1-based line of the failure.
    pub line: usize,
    /// 1-based column of the failure.
    pub column: usize,
    /// Names of the terminals that would have been accepted.
    pub expected: Vec<String>,
    /// Short preview of the input at the failure position.
    pub found: String,
}

/// A GLR parse yielded several derivations when the caller asked for one.
#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
#[cfg_attr(feature = "diagnostics", diagnostic(code(parser::ambiguous)))]
#[error("ambiguous parse: {solutions} derivations cover {span:?}")]
pub struct AmbiguityError {
    /// Number of distinct derivations found.
    pub solutions: usize,
    /// Input region covered by the ambiguous derivations.
    pub span: Span,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grammar_error_display() {
        let error = GrammarError::UndefinedSymbol {
            rule: "E".to_string(),
            symbol: "plus".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "rule 'E' references undefined symbol 'plus'"
        );
    }

    #[test]
    fn conflict_error_display() {
        let error = LrConflictError {
            conflicts: vec![Conflict {
                state: 4,
                lookahead: "else".to_string(),
                kind: ConflictKind::ShiftReduce,
                productions: vec!["S: if E then S".to_string()],
            }],
        };
        let rendered = error.to_string();
        assert!(rendered.contains("1 unresolved conflict"));
        assert!(rendered.contains("state 4"));
        assert!(rendered.contains("shift/reduce"));
        assert!(rendered.contains("S: if E then S"));
    }

    #[test]
    fn parse_error_display() {
        let error = ParseError {
            position: 5,
            line: 1,
            column: 6,
            expected: vec!["number".to_string(), "(".to_string()],
            found: "+ 2".to_string(),
        };
        let rendered = error.to_string();
        assert!(rendered.contains("1:6"));
        assert!(rendered.contains("number"));
        assert!(rendered.contains("'+ 2'"));
    }

    #[test]
    fn ambiguity_error_display() {
        let error = AmbiguityError {
            solutions: 2,
            span: Span::new(0, 5),
        };
        assert!(error.to_string().contains("2 derivations"));
    }
}
