//! The Table Store: parse tables and grammar metadata.
//!
//! A [`Grammar`] is produced externally (by a grammar compiler) and loaded
//! once via [`Grammar::from_bytes`], or assembled programmatically with
//! [`GrammarBuilder`]. After construction it is immutable and shared behind
//! an `Arc` by every parser and tree derived from it.

mod builder;
mod load;
mod symbol;
mod tables;

pub use builder::GrammarBuilder;
pub use load::{TableError, FORMAT_VERSION, MIN_FORMAT_VERSION};
pub use symbol::{Symbol, SymbolId, SymbolKind};
pub use tables::{Action, Grammar, LexPattern, LexRule, ParseState, StateId};
