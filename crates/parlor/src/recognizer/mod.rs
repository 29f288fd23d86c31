//! # Recognizer
//!
//! Scannerless token recognition: matching terminals against the raw input
//! at a position, driven by the expected-terminal set of the current parse
//! state. There is no separate tokenizer pass.
//!
//! Before any terminal is attempted, layout is skipped once per position —
//! either by the configured layout sub-grammar (parsed in prefix mode) or by
//! plain whitespace-character skipping. All GLR heads therefore observe the
//! same post-layout position.
//!
//! Tie-breaking between simultaneous matches is deterministic: the longest
//! match wins; among equal lengths, literal terminals beat regex and custom
//! ones; among those, declaration order decides. `EMPTY` is always reported
//! as a zero-length match when it is expected. The full surviving list is
//! returned for GLR use; LR callers take the first entry.

use crate::grammar::{Grammar, TermId, TerminalRecognizer};
use crate::table::LrTable;
use crate::tree::Span;
use compact_str::CompactString;
use smallvec::SmallVec;
use tracing::trace;

/// One successful terminal match at a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TokenMatch {
    pub term: TermId,
    pub start: usize,
    pub end: usize,
}

impl TokenMatch {
    pub(crate) const fn len(&self) -> usize {
        self.end - self.start
    }

    pub(crate) const fn span(&self) -> Span {
        Span::new(self.start, self.end)
    }
}

/// Layout handling strategy, fixed at parser construction.
pub(crate) enum Skip {
    /// No skipping; used by layout parsers themselves.
    None,
    /// Skip characters from the set.
    Chars(CompactString),
    /// Parse a layout sub-grammar in prefix mode.
    Layout(LayoutRuntime),
}

/// Compiled layout sub-grammar.
pub(crate) struct LayoutRuntime {
    pub table: LrTable,
}

/// Token recognition bound to a grammar and a layout strategy.
pub(crate) struct Recognizer<'g> {
    grammar: &'g Grammar,
    skip: Skip,
}

impl<'g> Recognizer<'g> {
    pub(crate) fn new(grammar: &'g Grammar, skip: Skip) -> Self {
        Self { grammar, skip }
    }

    /// Advance past layout, then attempt every expected terminal at the
    /// post-layout position. Returns that position and all surviving
    /// matches.
    pub(crate) fn recognize(
        &self,
        input: &str,
        pos: usize,
        expected: &[TermId],
    ) -> (usize, SmallVec<[TokenMatch; 4]>) {
        let start = self.skip_layout(input, pos);
        let mut matches: SmallVec<[TokenMatch; 4]> = SmallVec::new();

        for &term in expected {
            let terminal = self.grammar.terminal(term);
            let end = match &terminal.recognizer {
                TerminalRecognizer::Empty => Some(start),
                TerminalRecognizer::Stop => (start == input.len()).then_some(start),
                TerminalRecognizer::Literal(text) => input[start..]
                    .starts_with(text.as_str())
                    .then(|| start + text.len()),
                TerminalRecognizer::Regex(re) => {
                    re.find(&input[start..]).map(|m| start + m.end())
                }
                TerminalRecognizer::Custom(f) => f(input, start),
            };
            if let Some(end) = end {
                matches.push(TokenMatch { term, start, end });
            }
        }

        let max_len = matches.iter().map(TokenMatch::len).max().unwrap_or(0);
        matches.retain(|m| m.len() == max_len || m.term == TermId::EMPTY);

        // Literal matches are more specific than regex or custom ones.
        if max_len > 0
            && matches
                .iter()
                .any(|m| m.len() == max_len && self.grammar.terminal(m.term).is_literal())
        {
            matches.retain(|m| {
                m.len() != max_len
                    || self.grammar.terminal(m.term).is_literal()
                    || m.term == TermId::EMPTY
            });
        }

        trace!(pos, start, matched = matches.len(), "recognize");
        (start, matches)
    }

    fn skip_layout(&self, input: &str, pos: usize) -> usize {
        match &self.skip {
            Skip::None => pos,
            Skip::Chars(set) => {
                let mut current = pos;
                for c in input[pos..].chars() {
                    if !set.contains(c) {
                        break;
                    }
                    current += c.len_utf8();
                }
                current
            }
            Skip::Layout(runtime) => {
                let layout_grammar = self
                    .grammar
                    .layout()
                    .expect("layout runtime without layout grammar");
                crate::parser::lr::consume_prefix(layout_grammar, &runtime.table, input, pos)
            }
        }
    }
}
