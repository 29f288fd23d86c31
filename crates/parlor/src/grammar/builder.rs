//! Grammar construction from structured input.
//!
//! [`GrammarBuilder`] is the programmatic equivalent of a grammar file: a
//! map from terminal names to recognizer specs, an ordered list of rules per
//! nonterminal, a start symbol and an optional layout sub-grammar. `build`
//! validates the description, synthesizes the augmented production
//! `S' → start STOP` at index 0 and freezes everything into a [`Grammar`].

use super::{
    Assoc, CustomRecognizer, Grammar, NonTermId, NonTerminal, ProdId, Production, Symbol, TermId,
    Terminal, TerminalRecognizer, DEFAULT_PRIORITY,
};
use crate::error::GrammarError;
use compact_str::CompactString;
use indexmap::IndexMap;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::debug;

/// Recognizer specification for one terminal.
#[derive(Clone)]
pub struct TerminalSpec {
    kind: SpecKind,
    prio: u32,
    assoc: Assoc,
}

#[derive(Clone)]
enum SpecKind {
    Literal(CompactString),
    Regex(CompactString),
    Custom(CustomRecognizer),
}

impl TerminalSpec {
    /// A terminal matching a literal string by prefix equality.
    #[must_use]
    pub fn literal(text: impl Into<CompactString>) -> Self {
        Self {
            kind: SpecKind::Literal(text.into()),
            prio: DEFAULT_PRIORITY,
            assoc: Assoc::None,
        }
    }

    /// A terminal matching an anchored regex.
    #[must_use]
    pub fn regex(pattern: impl Into<CompactString>) -> Self {
        Self {
            kind: SpecKind::Regex(pattern.into()),
            prio: DEFAULT_PRIORITY,
            assoc: Assoc::None,
        }
    }

    /// A terminal matching through a user-supplied function.
    #[must_use]
    pub fn custom<F>(recognizer: F) -> Self
    where
        F: Fn(&str, usize) -> Option<usize> + Send + Sync + 'static,
    {
        Self {
            kind: SpecKind::Custom(Arc::new(recognizer)),
            prio: DEFAULT_PRIORITY,
            assoc: Assoc::None,
        }
    }

    /// Attach a precedence annotation. Productions whose rightmost terminal
    /// is this one inherit the annotation unless they carry their own.
    #[must_use]
    pub const fn prec(mut self, prio: u32, assoc: Assoc) -> Self {
        self.prio = prio;
        self.assoc = assoc;
        self
    }
}

struct RuleAlt {
    rhs: Vec<CompactString>,
    prio: Option<u32>,
    assoc: Option<Assoc>,
}

/// Builder assembling a [`Grammar`] from productions and terminal specs.
pub struct GrammarBuilder {
    terminals: IndexMap<CompactString, TerminalSpec>,
    rules: IndexMap<CompactString, Vec<RuleAlt>>,
    start: Option<CompactString>,
    layout: Option<Box<GrammarBuilder>>,
    duplicate: Option<CompactString>,
}

impl GrammarBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            terminals: IndexMap::new(),
            rules: IndexMap::new(),
            start: None,
            layout: None,
            duplicate: None,
        }
    }

    /// Declare a terminal. Declaration order is significant: it breaks
    /// recognition ties between equally long, equally specific matches.
    pub fn terminal(&mut self, name: impl Into<CompactString>, spec: TerminalSpec) -> &mut Self {
        let name = name.into();
        if self.terminals.insert(name.clone(), spec).is_some() && self.duplicate.is_none() {
            self.duplicate = Some(name);
        }
        self
    }

    /// Add a production for `name`. An empty `rhs` declares an ε-production;
    /// so does a rhs consisting of the single symbol `EMPTY`.
    pub fn rule(&mut self, name: impl Into<CompactString>, rhs: &[&str]) -> &mut Self {
        self.push_rule(name.into(), rhs, None, None);
        self
    }

    /// Add a production with an explicit `{assoc, priority}` annotation,
    /// overriding the rightmost-terminal default.
    pub fn rule_prec(
        &mut self,
        name: impl Into<CompactString>,
        rhs: &[&str],
        prio: u32,
        assoc: Assoc,
    ) -> &mut Self {
        self.push_rule(name.into(), rhs, Some(prio), Some(assoc));
        self
    }

    fn push_rule(
        &mut self,
        name: CompactString,
        rhs: &[&str],
        prio: Option<u32>,
        assoc: Option<Assoc>,
    ) {
        let alt = RuleAlt {
            rhs: rhs.iter().map(|&s| CompactString::from(s)).collect(),
            prio,
            assoc,
        };
        self.rules.entry(name).or_default().push(alt);
    }

    /// Designate the start symbol.
    pub fn start(&mut self, name: impl Into<CompactString>) -> &mut Self {
        self.start = Some(name.into());
        self
    }

    /// Attach a layout sub-grammar, consumed between tokens and absent from
    /// parse results. Replaces the default whitespace skipping.
    pub fn layout(&mut self, layout: GrammarBuilder) -> &mut Self {
        self.layout = Some(Box::new(layout));
        self
    }

    /// Validate the description and freeze it into a [`Grammar`].
    ///
    /// # Errors
    ///
    /// Returns a [`GrammarError`] on undefined symbol references, duplicate
    /// terminals, a terminal reused as a rule name, `EMPTY` mixed with other
    /// symbols, a missing or undefined start symbol, or an invalid regex.
    pub fn build(self) -> Result<Grammar, GrammarError> {
        if let Some(name) = self.duplicate {
            return Err(GrammarError::DuplicateTerminal {
                name: name.to_string(),
            });
        }
        for name in self.rules.keys() {
            if self.terminals.contains_key(name) {
                return Err(GrammarError::TerminalRuleClash {
                    name: name.to_string(),
                });
            }
        }

        let start_name = self.start.ok_or(GrammarError::MissingStart)?;
        if !self.rules.contains_key(&start_name) {
            return Err(GrammarError::UndefinedStart {
                name: start_name.to_string(),
            });
        }

        let mut terminals = vec![
            Terminal {
                name: "EMPTY".into(),
                recognizer: TerminalRecognizer::Empty,
                prio: DEFAULT_PRIORITY,
                assoc: Assoc::None,
            },
            Terminal {
                name: "STOP".into(),
                recognizer: TerminalRecognizer::Stop,
                prio: DEFAULT_PRIORITY,
                assoc: Assoc::None,
            },
        ];
        let mut term_ids: IndexMap<CompactString, TermId> = IndexMap::new();
        for (name, spec) in &self.terminals {
            let recognizer = match &spec.kind {
                SpecKind::Literal(text) => TerminalRecognizer::Literal(text.clone()),
                SpecKind::Regex(pattern) => {
                    // Anchor at the match position; the recognizer matches
                    // against the input suffix.
                    let anchored = format!("^(?:{pattern})");
                    let compiled = regex::Regex::new(&anchored).map_err(|source| {
                        GrammarError::InvalidRegex {
                            terminal: name.to_string(),
                            source: Box::new(source),
                        }
                    })?;
                    TerminalRecognizer::Regex(compiled)
                }
                SpecKind::Custom(f) => TerminalRecognizer::Custom(f.clone()),
            };
            let id = TermId(terminals.len() as u32);
            terminals.push(Terminal {
                name: name.clone(),
                recognizer,
                prio: spec.prio,
                assoc: spec.assoc,
            });
            term_ids.insert(name.clone(), id);
        }

        let mut nonterminals = vec![NonTerminal { name: "S'".into() }];
        let mut nt_ids: IndexMap<CompactString, NonTermId> = IndexMap::new();
        for name in self.rules.keys() {
            let id = NonTermId(nonterminals.len() as u32);
            nonterminals.push(NonTerminal { name: name.clone() });
            nt_ids.insert(name.clone(), id);
        }
        let start = nt_ids[&start_name];

        let mut productions = vec![Production {
            lhs: NonTermId::AUGMENTED_START,
            rhs: SmallVec::from_slice(&[
                Symbol::NonTerminal(start),
                Symbol::Terminal(TermId::STOP),
            ]),
            index: ProdId(0),
            prio: DEFAULT_PRIORITY,
            assoc: Assoc::None,
            nt_index: 0,
        }];

        for (name, alts) in &self.rules {
            let lhs = nt_ids[name];
            for (nt_index, alt) in alts.iter().enumerate() {
                let rhs = Self::resolve_rhs(name, alt, &term_ids, &nt_ids)?;
                let (prio, assoc) =
                    Self::effective_precedence(alt, &rhs, &terminals);
                let index = ProdId(productions.len() as u32);
                productions.push(Production {
                    lhs,
                    rhs,
                    index,
                    prio,
                    assoc,
                    nt_index: nt_index as u32,
                });
            }
        }

        let mut by_lhs = vec![Vec::new(); nonterminals.len()];
        for production in &productions {
            by_lhs[production.lhs.index()].push(production.index);
        }

        let layout = match self.layout {
            Some(builder) => Some(Box::new(builder.build()?)),
            None => None,
        };

        debug!(
            terminals = terminals.len(),
            nonterminals = nonterminals.len(),
            productions = productions.len(),
            "grammar frozen"
        );

        Ok(Grammar {
            terminals,
            nonterminals,
            productions,
            by_lhs,
            start,
            layout,
        })
    }

    fn resolve_rhs(
        rule: &str,
        alt: &RuleAlt,
        term_ids: &IndexMap<CompactString, TermId>,
        nt_ids: &IndexMap<CompactString, NonTermId>,
    ) -> Result<SmallVec<[Symbol; 4]>, GrammarError> {
        if alt.rhs.iter().any(|s| s == "EMPTY") {
            if alt.rhs.len() != 1 {
                return Err(GrammarError::MixedEmpty {
                    rule: rule.to_string(),
                });
            }
            return Ok(SmallVec::new());
        }
        let mut rhs = SmallVec::with_capacity(alt.rhs.len());
        for name in &alt.rhs {
            let symbol = if let Some(&t) = term_ids.get(name) {
                Symbol::Terminal(t)
            } else if let Some(&n) = nt_ids.get(name) {
                Symbol::NonTerminal(n)
            } else {
                return Err(GrammarError::UndefinedSymbol {
                    rule: rule.to_string(),
                    symbol: name.to_string(),
                });
            };
            rhs.push(symbol);
        }
        Ok(rhs)
    }

    /// Explicit annotation wins; otherwise the production inherits the
    /// precedence of its rightmost terminal.
    fn effective_precedence(
        alt: &RuleAlt,
        rhs: &[Symbol],
        terminals: &[Terminal],
    ) -> (u32, Assoc) {
        if let Some(prio) = alt.prio {
            return (prio, alt.assoc.unwrap_or(Assoc::None));
        }
        let rightmost = rhs
            .iter()
            .rev()
            .find_map(|symbol| symbol.as_terminal())
            .map(|t| &terminals[t.index()]);
        match rightmost {
            Some(terminal) => (terminal.prio, terminal.assoc),
            None => (DEFAULT_PRIORITY, Assoc::None),
        }
    }
}

impl Default for GrammarBuilder {
    fn default() -> Self {
        Self::new()
    }
}
