//! The parse-table store.
//!
//! A [`Grammar`] is the immutable product of loading an externally compiled
//! table blob (or of a [`GrammarBuilder`](super::GrammarBuilder)). It is
//! shared behind an `Arc` for the engine's lifetime and only ever read:
//! every query here is `&self` and the parser may consult one grammar from
//! any number of concurrent parses without locking.

use indexmap::IndexMap;
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;

use super::symbol::{Symbol, SymbolId, SymbolKind};

/// Identifier of a parse-table state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateId(pub u16);

impl StateId {
    /// The table's entry state.
    pub const START: StateId = StateId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One shift/reduce/accept entry. A `(state, lookahead)` pair may carry
/// several actions; that is how the table encodes a GLR conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Shift(StateId),
    Reduce {
        /// Non-terminal produced by the reduction.
        symbol: SymbolId,
        /// How many stack entries (non-trivia) the right-hand side spans.
        child_count: u16,
        /// Production id, used for field-name lookup on the built node.
        production: u16,
        /// Grammar-declared precedence applied when competing GLR stacks
        /// converge with equal error cost.
        dynamic_precedence: i32,
    },
    Accept,
}

/// Transitions out of one parse state.
#[derive(Debug, Clone, Default)]
pub struct ParseState {
    pub(crate) actions: FxHashMap<SymbolId, Vec<Action>>,
    pub(crate) gotos: FxHashMap<SymbolId, StateId>,
}

/// How a terminal is recognized by the static lexical table.
#[derive(Debug, Clone)]
pub enum LexPattern {
    /// Exact text, e.g. punctuation or a keyword.
    Literal(SmolStr),
    /// A regular expression compiled at load time, matched anchored at the
    /// current lexer position.
    Pattern { source: SmolStr, regex: Regex },
}

impl LexPattern {
    /// Length of the match at the start of `rest`, if any.
    pub fn match_len(&self, rest: &str) -> Option<usize> {
        match self {
            LexPattern::Literal(text) => rest.starts_with(text.as_str()).then(|| text.len()),
            LexPattern::Pattern { regex, .. } => regex.find(rest).map(|m| m.end()),
        }
    }
}

/// A lexical rule: which terminal a pattern produces. Rules are kept in
/// declaration order; earlier rules win length ties, which is how keywords
/// take priority over identifiers.
#[derive(Debug, Clone)]
pub struct LexRule {
    pub symbol: SymbolId,
    pub pattern: LexPattern,
}

/// Immutable grammar tables plus symbol metadata.
///
/// Constructed by [`Grammar::from_bytes`](super::load) or a
/// [`GrammarBuilder`](super::GrammarBuilder); never mutated afterwards.
#[derive(Debug)]
pub struct Grammar {
    pub(crate) name: SmolStr,
    /// Symbol table in declaration order; a symbol's id is its index here.
    pub(crate) symbols: IndexMap<SmolStr, Symbol>,
    pub(crate) states: Vec<ParseState>,
    pub(crate) lex_rules: Vec<LexRule>,
    pub(crate) extras: FxHashSet<SymbolId>,
    pub(crate) externals: Vec<SymbolId>,
    pub(crate) start_symbol: SymbolId,
    /// `(production, child index)` to field name.
    pub(crate) fields: FxHashMap<(u16, u16), SmolStr>,
}

impl Grammar {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start_symbol(&self) -> SymbolId {
        self.start_symbol
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// Actions for `symbol` in `state`; empty when the lookahead is invalid
    /// there.
    pub fn actions(&self, state: StateId, symbol: SymbolId) -> &[Action] {
        self.states[state.index()]
            .actions
            .get(&symbol)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// `stateTransition(state, symbol)` for non-terminals.
    pub fn goto(&self, state: StateId, symbol: SymbolId) -> Option<StateId> {
        self.states[state.index()].gotos.get(&symbol).copied()
    }

    /// The lookahead symbols that have at least one action in `state`.
    pub fn valid_symbols(&self, state: StateId) -> impl Iterator<Item = SymbolId> + '_ {
        self.states[state.index()].actions.keys().copied()
    }

    /// Whether `state` can shift or splice `symbol` next: a shift action for
    /// terminals, a goto for non-terminals. Used both by recovery scans and
    /// by the reuse walker.
    pub fn accepts_symbol(&self, state: StateId, symbol: SymbolId) -> bool {
        if self.states[state.index()].gotos.contains_key(&symbol) {
            return true;
        }
        self.actions(state, symbol)
            .iter()
            .any(|a| matches!(a, Action::Shift(_)))
    }

    pub fn is_external(&self, symbol: SymbolId) -> bool {
        self.externals.contains(&symbol)
    }

    pub fn is_extra(&self, symbol: SymbolId) -> bool {
        self.extras.contains(&symbol)
    }

    /// The external tokens among `state`'s valid lookaheads, in declaration
    /// order.
    pub fn valid_externals(&self, state: StateId) -> Vec<SymbolId> {
        self.externals
            .iter()
            .copied()
            .filter(|s| self.states[state.index()].actions.contains_key(s))
            .collect()
    }

    /// Extras are valid everywhere; expose them for the lexer.
    pub fn extra_symbols(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.lex_rules
            .iter()
            .map(|r| r.symbol)
            .filter(|s| self.extras.contains(s))
    }

    pub fn lex_rules(&self) -> &[LexRule] {
        &self.lex_rules
    }

    /// Look up a symbol id by name.
    pub fn symbol(&self, name: &str) -> Option<SymbolId> {
        self.symbols.get_index_of(name).map(|i| SymbolId(i as u16))
    }

    pub fn symbol_name(&self, symbol: SymbolId) -> &str {
        match symbol {
            SymbolId::END => "end",
            SymbolId::ERROR => "ERROR",
            id => self
                .symbols
                .get_index(id.index())
                .map(|(name, _)| name.as_str())
                .unwrap_or("?"),
        }
    }

    pub fn symbol_kind(&self, symbol: SymbolId) -> Option<SymbolKind> {
        self.symbols.get_index(symbol.index()).map(|(_, s)| s.kind)
    }

    pub fn is_named(&self, symbol: SymbolId) -> bool {
        self.symbols
            .get_index(symbol.index())
            .map(|(_, s)| s.named)
            .unwrap_or(false)
    }

    /// `fieldNameFor(production, childIndex)`.
    pub fn field_name(&self, production: u16, child_index: u16) -> Option<&str> {
        self.fields
            .get(&(production, child_index))
            .map(SmolStr::as_str)
    }

    pub(crate) fn symbol_meta(&self, symbol: SymbolId) -> Option<&Symbol> {
        self.symbols.get_index(symbol.index()).map(|(_, s)| s)
    }
}
