//! Grammar symbols.
//!
//! Symbols are dense `u16` identifiers assigned in declaration order, with
//! two reserved ids for the end-of-input marker and the error symbol.

use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Identifier for a grammar symbol (terminal, non-terminal, or external).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SymbolId(pub u16);

impl SymbolId {
    /// Lookahead symbol used for actions at end of input.
    pub const END: SymbolId = SymbolId(u16::MAX - 1);
    /// Symbol of synthesized error nodes.
    pub const ERROR: SymbolId = SymbolId(u16::MAX);

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn is_builtin(self) -> bool {
        self == Self::END || self == Self::ERROR
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::END => write!(f, "end"),
            Self::ERROR => write!(f, "ERROR"),
            Self(id) => write!(f, "sym#{id}"),
        }
    }
}

/// What role a symbol plays in the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    /// A rule symbol produced by reductions.
    NonTerminal,
    /// A token matched by the static lexical table.
    Terminal,
    /// A token produced by the grammar's external scanner.
    External,
}

/// Per-symbol metadata held by the grammar's symbol table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: SmolStr,
    pub kind: SymbolKind,
    /// Named symbols appear with their name in s-expressions; anonymous
    /// tokens (punctuation, keywords) appear as quoted text.
    pub named: bool,
}
