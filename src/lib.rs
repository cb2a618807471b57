//! # sylva
//!
//! An incremental, error-tolerant GLR parsing engine: externally compiled
//! grammar tables drive a table-based lexer (with an external-scanner hook)
//! and a generalized LR parser that splits its stack on conflicts, recovers
//! from any input, and splices unchanged subtrees from a previous parse
//! into the next one.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! parser    → GLR parse loop, error recovery, subtree reuse
//!   ↓
//! tree      → Shared green nodes, Tree/Node facade, cursors
//!   ↓
//! lexer     → Table-driven lexer, external-scanner bridge
//!   ↓
//! grammar   → Symbols, parse tables, blob loader, builder
//!   ↓
//! base      → Primitives (Point, InputEdit, TextRange)
//! ```

// ============================================================================
// MODULES (dependency order: base → grammar → lexer → tree → parser)
// ============================================================================

/// Foundation types: byte/point positions and edit bookkeeping
pub mod base;

/// Grammar tables: symbols, actions, the versioned blob loader, the builder
pub mod grammar;

/// Lexing: static lexical table plus the external-scanner bridge
pub mod lexer;

/// Trees: immutable shared green nodes and the positioned node facade
pub mod tree;

/// Parsing: the GLR engine, recovery, cancellation, incremental reuse
pub mod parser;

// Re-export the working surface
pub use base::{EditError, InputEdit, Point, TextRange, TextSize};
pub use grammar::{Grammar, GrammarBuilder, SymbolId, TableError};
pub use lexer::{ExternalScanner, ScanCursor, Token};
pub use parser::{ParseError, ParseOptions, Parser, TieBreak};
pub use tree::{Node, Tree, TreeCursor};
