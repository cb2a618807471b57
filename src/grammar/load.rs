//! Loading and validating grammar table blobs.
//!
//! The blob is a versioned serde document produced by an external grammar
//! compiler. Loading fails fast with [`TableError`] when the format version
//! falls outside the supported range or when the tables are structurally
//! inconsistent; a parser is never constructed over a bad table.

use indexmap::IndexMap;
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use thiserror::Error;

use super::symbol::{Symbol, SymbolId, SymbolKind};
use super::tables::{Action, Grammar, LexPattern, LexRule, ParseState, StateId};

/// Newest table format this engine understands.
pub const FORMAT_VERSION: u32 = 1;
/// Oldest table format this engine still accepts.
pub const MIN_FORMAT_VERSION: u32 = 1;

/// Why a grammar table was rejected.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("unsupported grammar table version {found} (supported {min}..={max})")]
    UnsupportedVersion { found: u32, min: u32, max: u32 },
    #[error("malformed grammar table: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("lex pattern for `{symbol}` failed to compile: {source}")]
    BadPattern {
        symbol: SmolStr,
        #[source]
        source: Box<regex::Error>,
    },
    #[error("state {state} references unknown state {target}")]
    UnknownState { state: u16, target: u16 },
    #[error("unknown symbol id {0}")]
    UnknownSymbol(u16),
    #[error("start symbol `{0}` is not a non-terminal")]
    BadStartSymbol(SmolStr),
    #[error("lex rule given for `{0}`, which is not a terminal")]
    LexRuleForNonTerminal(SmolStr),
    #[error("`{0}` is declared external but has kind {1:?}")]
    ExternalKindMismatch(SmolStr, SymbolKind),
    #[error("grammar has no parse states")]
    NoStates,
}

// ============================================================================
// Raw (serialized) table shapes
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct RawGrammar {
    pub version: u32,
    pub name: String,
    pub symbols: Vec<Symbol>,
    pub states: Vec<RawState>,
    #[serde(default)]
    pub lex: Vec<RawLexRule>,
    #[serde(default)]
    pub extras: Vec<u16>,
    #[serde(default)]
    pub externals: Vec<u16>,
    pub start: u16,
    #[serde(default)]
    pub fields: Vec<RawField>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct RawState {
    #[serde(default)]
    pub actions: Vec<RawActionEntry>,
    #[serde(default)]
    pub gotos: Vec<(u16, u16)>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct RawActionEntry {
    pub symbol: u16,
    pub actions: Vec<RawAction>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum RawAction {
    Shift {
        state: u16,
    },
    Reduce {
        symbol: u16,
        child_count: u16,
        #[serde(default)]
        production: u16,
        #[serde(default)]
        dynamic_precedence: i32,
    },
    Accept,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct RawLexRule {
    pub symbol: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub literal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct RawField {
    pub production: u16,
    pub child: u16,
    pub name: String,
}

// ============================================================================
// Loading
// ============================================================================

impl Grammar {
    /// Load a grammar from a versioned table blob.
    pub fn from_bytes(data: &[u8]) -> Result<Grammar, TableError> {
        let raw: RawGrammar = serde_json::from_slice(data)?;
        assemble(raw)
    }

    /// Serialize this grammar back into a table blob at the current
    /// [`FORMAT_VERSION`].
    pub fn to_bytes(&self) -> Vec<u8> {
        let raw = disassemble(self);
        serde_json::to_vec(&raw).expect("grammar tables are always serializable")
    }
}

/// Validate raw tables and compile them into the immutable [`Grammar`].
pub(crate) fn assemble(raw: RawGrammar) -> Result<Grammar, TableError> {
    if raw.version < MIN_FORMAT_VERSION || raw.version > FORMAT_VERSION {
        return Err(TableError::UnsupportedVersion {
            found: raw.version,
            min: MIN_FORMAT_VERSION,
            max: FORMAT_VERSION,
        });
    }
    if raw.states.is_empty() {
        return Err(TableError::NoStates);
    }

    let symbol_count = raw.symbols.len() as u16;
    let check_symbol = |id: u16| -> Result<SymbolId, TableError> {
        let sym = SymbolId(id);
        if id < symbol_count || sym.is_builtin() {
            Ok(sym)
        } else {
            Err(TableError::UnknownSymbol(id))
        }
    };
    let state_count = raw.states.len() as u16;

    let mut symbols: IndexMap<SmolStr, Symbol> = IndexMap::with_capacity(raw.symbols.len());
    for sym in &raw.symbols {
        symbols.insert(sym.name.clone(), sym.clone());
    }

    let start = check_symbol(raw.start)?;
    match raw.symbols.get(start.index()) {
        Some(s) if s.kind == SymbolKind::NonTerminal => {}
        Some(s) => return Err(TableError::BadStartSymbol(s.name.clone())),
        None => return Err(TableError::UnknownSymbol(raw.start)),
    }

    let mut states = Vec::with_capacity(raw.states.len());
    for (state_idx, raw_state) in raw.states.iter().enumerate() {
        let mut state = ParseState::default();
        for entry in &raw_state.actions {
            let lookahead = check_symbol(entry.symbol)?;
            let mut actions = Vec::with_capacity(entry.actions.len());
            for action in &entry.actions {
                actions.push(match *action {
                    RawAction::Shift { state: target } => {
                        if target >= state_count {
                            return Err(TableError::UnknownState {
                                state: state_idx as u16,
                                target,
                            });
                        }
                        Action::Shift(StateId(target))
                    }
                    RawAction::Reduce {
                        symbol,
                        child_count,
                        production,
                        dynamic_precedence,
                    } => Action::Reduce {
                        symbol: check_symbol(symbol)?,
                        child_count,
                        production,
                        dynamic_precedence,
                    },
                    RawAction::Accept => Action::Accept,
                });
            }
            state.actions.insert(lookahead, actions);
        }
        for &(symbol, target) in &raw_state.gotos {
            if target >= state_count {
                return Err(TableError::UnknownState {
                    state: state_idx as u16,
                    target,
                });
            }
            state.gotos.insert(check_symbol(symbol)?, StateId(target));
        }
        states.push(state);
    }

    let mut lex_rules = Vec::with_capacity(raw.lex.len());
    for rule in &raw.lex {
        let symbol = check_symbol(rule.symbol)?;
        let meta = &raw.symbols[symbol.index()];
        if meta.kind != SymbolKind::Terminal {
            return Err(TableError::LexRuleForNonTerminal(meta.name.clone()));
        }
        let pattern = match (&rule.literal, &rule.pattern) {
            (Some(text), _) => LexPattern::Literal(SmolStr::new(text)),
            (None, Some(source)) => {
                let regex =
                    Regex::new(&format!("^(?:{source})")).map_err(|e| TableError::BadPattern {
                        symbol: meta.name.clone(),
                        source: Box::new(e),
                    })?;
                LexPattern::Pattern {
                    source: SmolStr::new(source),
                    regex,
                }
            }
            (None, None) => LexPattern::Literal(meta.name.clone()),
        };
        lex_rules.push(LexRule { symbol, pattern });
    }

    let mut externals = Vec::with_capacity(raw.externals.len());
    for &id in &raw.externals {
        let symbol = check_symbol(id)?;
        let meta = &raw.symbols[symbol.index()];
        if meta.kind != SymbolKind::External {
            return Err(TableError::ExternalKindMismatch(meta.name.clone(), meta.kind));
        }
        externals.push(symbol);
    }

    let mut extras = FxHashSet::default();
    for &id in &raw.extras {
        extras.insert(check_symbol(id)?);
    }

    let mut fields = FxHashMap::default();
    for field in raw.fields {
        fields.insert((field.production, field.child), SmolStr::new(field.name));
    }

    Ok(Grammar {
        name: SmolStr::new(raw.name),
        symbols,
        states,
        lex_rules,
        extras,
        externals,
        start_symbol: start,
        fields,
    })
}

fn disassemble(grammar: &Grammar) -> RawGrammar {
    let states = grammar
        .states
        .iter()
        .map(|state| {
            let mut actions: Vec<RawActionEntry> = state
                .actions
                .iter()
                .map(|(&symbol, actions)| RawActionEntry {
                    symbol: symbol.0,
                    actions: actions
                        .iter()
                        .map(|a| match *a {
                            Action::Shift(target) => RawAction::Shift { state: target.0 },
                            Action::Reduce {
                                symbol,
                                child_count,
                                production,
                                dynamic_precedence,
                            } => RawAction::Reduce {
                                symbol: symbol.0,
                                child_count,
                                production,
                                dynamic_precedence,
                            },
                            Action::Accept => RawAction::Accept,
                        })
                        .collect(),
                })
                .collect();
            actions.sort_by_key(|e| e.symbol);
            let mut gotos: Vec<(u16, u16)> = state
                .gotos
                .iter()
                .map(|(&symbol, &target)| (symbol.0, target.0))
                .collect();
            gotos.sort_unstable();
            RawState { actions, gotos }
        })
        .collect();

    RawGrammar {
        version: FORMAT_VERSION,
        name: grammar.name.to_string(),
        symbols: grammar.symbols.values().cloned().collect(),
        states,
        lex: grammar
            .lex_rules
            .iter()
            .map(|rule| match &rule.pattern {
                LexPattern::Literal(text) => RawLexRule {
                    symbol: rule.symbol.0,
                    literal: Some(text.to_string()),
                    pattern: None,
                },
                LexPattern::Pattern { source, .. } => RawLexRule {
                    symbol: rule.symbol.0,
                    literal: None,
                    pattern: Some(source.to_string()),
                },
            })
            .collect(),
        extras: {
            let mut extras: Vec<u16> = grammar.extras.iter().map(|s| s.0).collect();
            extras.sort_unstable();
            extras
        },
        externals: grammar.externals.iter().map(|s| s.0).collect(),
        start: grammar.start_symbol.0,
        fields: {
            let mut fields: Vec<RawField> = grammar
                .fields
                .iter()
                .map(|(&(production, child), name)| RawField {
                    production,
                    child,
                    name: name.to_string(),
                })
                .collect();
            fields.sort_by_key(|f| (f.production, f.child));
            fields
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_raw() -> RawGrammar {
        serde_json::from_value(serde_json::json!({
            "version": 1,
            "name": "mini",
            "symbols": [
                { "name": "doc", "kind": "non_terminal", "named": true },
                { "name": "word", "kind": "terminal", "named": true },
            ],
            "states": [
                { "actions": [
                    { "symbol": 1, "actions": [ { "shift": { "state": 1 } } ] },
                  ],
                  "gotos": [[0, 1]] },
                { "actions": [
                    { "symbol": 65534, "actions": [ "accept" ] },
                  ] },
            ],
            "lex": [ { "symbol": 1, "pattern": "[a-z]+" } ],
            "start": 0,
        }))
        .expect("valid raw grammar")
    }

    #[test]
    fn loads_minimal_grammar() {
        let grammar = assemble(minimal_raw()).expect("assemble");
        assert_eq!(grammar.name(), "mini");
        assert_eq!(grammar.state_count(), 2);
        assert_eq!(grammar.symbol("word"), Some(SymbolId(1)));
        assert_eq!(grammar.symbol_name(SymbolId(0)), "doc");
    }

    #[test]
    fn rejects_version_outside_supported_range() {
        let mut raw = minimal_raw();
        raw.version = FORMAT_VERSION + 1;
        match assemble(raw) {
            Err(TableError::UnsupportedVersion { found, .. }) => {
                assert_eq!(found, FORMAT_VERSION + 1);
            }
            other => panic!("expected version error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_action_to_unknown_state() {
        let mut raw = minimal_raw();
        raw.states[0].actions[0].actions[0] = RawAction::Shift { state: 99 };
        assert!(matches!(
            assemble(raw),
            Err(TableError::UnknownState { target: 99, .. })
        ));
    }

    #[test]
    fn rejects_lex_rule_for_non_terminal() {
        let mut raw = minimal_raw();
        raw.lex.push(RawLexRule {
            symbol: 0,
            literal: None,
            pattern: Some("x".into()),
        });
        assert!(matches!(
            assemble(raw),
            Err(TableError::LexRuleForNonTerminal(name)) if name == "doc"
        ));
    }

    #[test]
    fn rejects_bad_regex() {
        let mut raw = minimal_raw();
        raw.lex[0].pattern = Some("[unclosed".into());
        assert!(matches!(assemble(raw), Err(TableError::BadPattern { .. })));
    }

    #[test]
    fn blob_round_trip() {
        let grammar = assemble(minimal_raw()).expect("assemble");
        let bytes = grammar.to_bytes();
        let reloaded = Grammar::from_bytes(&bytes).expect("reload");
        assert_eq!(reloaded.name(), grammar.name());
        assert_eq!(reloaded.state_count(), grammar.state_count());
        assert_eq!(reloaded.symbol("word"), grammar.symbol("word"));
    }

    #[test]
    fn malformed_json_is_a_table_error() {
        assert!(matches!(
            Grammar::from_bytes(b"{ not json"),
            Err(TableError::Malformed(_))
        ));
    }
}
