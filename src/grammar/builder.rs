//! Programmatic construction of grammar tables.
//!
//! Hosts that embed generated tables (and this crate's own tests) build a
//! [`Grammar`] through [`GrammarBuilder`] instead of a serialized blob. The
//! builder produces the same raw table shape the loader consumes, so both
//! paths share one validation pass.

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::load::{self, RawAction, RawActionEntry, RawField, RawGrammar, RawLexRule, RawState};
use super::symbol::{Symbol, SymbolId, SymbolKind};
use super::tables::{Grammar, StateId};
use super::TableError;

/// Builder for a [`Grammar`]. Symbols get dense ids in declaration order;
/// states are added explicitly and wired up with shift/reduce/goto entries.
pub struct GrammarBuilder {
    name: String,
    symbols: Vec<Symbol>,
    by_name: FxHashMap<SmolStr, SymbolId>,
    states: Vec<RawState>,
    lex: Vec<RawLexRule>,
    extras: Vec<u16>,
    externals: Vec<u16>,
    start: Option<u16>,
    fields: Vec<RawField>,
}

impl GrammarBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            symbols: Vec::new(),
            by_name: FxHashMap::default(),
            states: Vec::new(),
            lex: Vec::new(),
            extras: Vec::new(),
            externals: Vec::new(),
            start: None,
            fields: Vec::new(),
        }
    }

    fn intern(&mut self, name: &str, kind: SymbolKind, named: bool) -> SymbolId {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let id = SymbolId(self.symbols.len() as u16);
        self.symbols.push(Symbol {
            name: SmolStr::new(name),
            kind,
            named,
        });
        self.by_name.insert(SmolStr::new(name), id);
        id
    }

    /// Declare a named rule symbol.
    pub fn non_terminal(&mut self, name: &str) -> SymbolId {
        self.intern(name, SymbolKind::NonTerminal, true)
    }

    /// Declare a named terminal recognized by `pattern` (a regex matched
    /// anchored at the lexer position).
    pub fn token(&mut self, name: &str, pattern: &str) -> SymbolId {
        let id = self.intern(name, SymbolKind::Terminal, true);
        self.lex.push(RawLexRule {
            symbol: id.0,
            literal: None,
            pattern: Some(pattern.to_string()),
        });
        id
    }

    /// Declare an anonymous terminal matching exactly `text` (punctuation,
    /// keywords).
    pub fn literal(&mut self, text: &str) -> SymbolId {
        let fresh = !self.by_name.contains_key(text);
        let id = self.intern(text, SymbolKind::Terminal, false);
        if fresh {
            self.lex.push(RawLexRule {
                symbol: id.0,
                literal: Some(text.to_string()),
                pattern: None,
            });
        }
        id
    }

    /// Declare a token produced by the grammar's external scanner.
    pub fn external(&mut self, name: &str) -> SymbolId {
        let id = self.intern(name, SymbolKind::External, true);
        if !self.externals.contains(&id.0) {
            self.externals.push(id.0);
        }
        id
    }

    /// Mark a terminal as trivia, valid between any two tokens.
    pub fn extra(&mut self, symbol: SymbolId) -> &mut Self {
        if !self.extras.contains(&symbol.0) {
            self.extras.push(symbol.0);
        }
        self
    }

    pub fn start_symbol(&mut self, symbol: SymbolId) -> &mut Self {
        self.start = Some(symbol.0);
        self
    }

    /// Name the `child`-th child of `production`.
    pub fn field(&mut self, production: u16, child: u16, name: &str) -> &mut Self {
        self.fields.push(RawField {
            production,
            child,
            name: name.to_string(),
        });
        self
    }

    /// Add an empty parse state; the first added state is the start state.
    pub fn add_state(&mut self) -> StateId {
        let id = StateId(self.states.len() as u16);
        self.states.push(RawState::default());
        id
    }

    fn entry(&mut self, state: StateId, lookahead: SymbolId) -> &mut Vec<RawAction> {
        let state = &mut self.states[state.index()];
        if let Some(pos) = state.actions.iter().position(|e| e.symbol == lookahead.0) {
            &mut state.actions[pos].actions
        } else {
            state.actions.push(RawActionEntry {
                symbol: lookahead.0,
                actions: Vec::new(),
            });
            &mut state.actions.last_mut().expect("just pushed").actions
        }
    }

    pub fn shift(&mut self, state: StateId, lookahead: SymbolId, target: StateId) -> &mut Self {
        self.entry(state, lookahead)
            .push(RawAction::Shift { state: target.0 });
        self
    }

    #[allow(clippy::too_many_arguments)]
    pub fn reduce(
        &mut self,
        state: StateId,
        lookahead: SymbolId,
        symbol: SymbolId,
        child_count: u16,
        production: u16,
        dynamic_precedence: i32,
    ) -> &mut Self {
        self.entry(state, lookahead).push(RawAction::Reduce {
            symbol: symbol.0,
            child_count,
            production,
            dynamic_precedence,
        });
        self
    }

    pub fn accept(&mut self, state: StateId, lookahead: SymbolId) -> &mut Self {
        self.entry(state, lookahead).push(RawAction::Accept);
        self
    }

    pub fn goto(&mut self, state: StateId, symbol: SymbolId, target: StateId) -> &mut Self {
        self.states[state.index()].gotos.push((symbol.0, target.0));
        self
    }

    /// Validate and freeze the tables.
    pub fn build(self) -> Result<Grammar, TableError> {
        let raw = RawGrammar {
            version: load::FORMAT_VERSION,
            name: self.name,
            symbols: self.symbols,
            states: self.states,
            lex: self.lex,
            extras: self.extras,
            externals: self.externals,
            start: self.start.unwrap_or(u16::MAX),
            fields: self.fields,
        };
        load::assemble(raw)
    }
}
