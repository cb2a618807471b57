//! Shared grammar fixtures and an external scanner for integration tests.
#![allow(dead_code)]

use std::any::Any;
use std::sync::Arc;

use once_cell::sync::Lazy;

use sylva::grammar::{Grammar, GrammarBuilder, SymbolId};
use sylva::lexer::{ExternalScanner, ScanCursor};
use sylva::{InputEdit, Parser, Point, TextSize, Tree};

// ── Expression grammar ──────────────────────────────────────────

/// `expr -> expr '+' expr | operand`, with an ambiguous table: state 4 has
/// both a reduce and a shift on `+`.
pub fn expr_grammar() -> Arc<Grammar> {
    static GRAMMAR: Lazy<Arc<Grammar>> = Lazy::new(|| {
        let mut b = GrammarBuilder::new("expr");
        let expr = b.non_terminal("expr");
        b.start_symbol(expr);
        let operand = b.token("operand", "a+");
        let plus = b.literal("+");
        let ws = b.token("ws", r"[ \t\n]+");
        b.extra(ws);

        let s0 = b.add_state();
        let s1 = b.add_state();
        let s2 = b.add_state();
        let s3 = b.add_state();
        let s4 = b.add_state();
        b.shift(s0, operand, s1).goto(s0, expr, s2);
        b.reduce(s1, plus, expr, 1, 0, 0);
        b.reduce(s1, SymbolId::END, expr, 1, 0, 0);
        b.shift(s2, plus, s3).accept(s2, SymbolId::END);
        b.shift(s3, operand, s1).goto(s3, expr, s4);
        b.reduce(s4, plus, expr, 3, 1, 0).shift(s4, plus, s3);
        b.reduce(s4, SymbolId::END, expr, 3, 1, 0);
        b.field(1, 0, "left").field(1, 1, "operator").field(1, 2, "right");
        Arc::new(b.build().expect("expr grammar should validate"))
    });
    Arc::clone(&GRAMMAR)
}

pub fn parse_expr(source: &str) -> Tree {
    Parser::new(expr_grammar())
        .parse(source, None)
        .expect("parse should succeed")
}

/// An edit replacing `start..old_end` (single-line offsets) with text of
/// length `new_len`.
pub fn line_edit(start: u32, old_end: u32, new_len: u32) -> InputEdit {
    InputEdit {
        start_byte: TextSize::new(start),
        old_end_byte: TextSize::new(old_end),
        new_end_byte: TextSize::new(start + new_len),
        start_point: Point::new(0, start),
        old_end_point: Point::new(0, old_end),
        new_end_point: Point::new(0, start + new_len),
    }
}

// ── Chunk grammar with an external scanner ──────────────────────

/// `doc -> chunk doc | chunk`, where `chunk` is produced by an external
/// scanner that consumes through the next `;`.
pub fn chunk_grammar() -> Arc<Grammar> {
    static GRAMMAR: Lazy<Arc<Grammar>> = Lazy::new(|| {
        let mut b = GrammarBuilder::new("chunks");
        let doc = b.non_terminal("doc");
        b.start_symbol(doc);
        let chunk = b.external("chunk");

        let s0 = b.add_state();
        let s1 = b.add_state();
        let s2 = b.add_state();
        let s3 = b.add_state();
        b.shift(s0, chunk, s1).goto(s0, doc, s3);
        b.shift(s1, chunk, s1).goto(s1, doc, s2);
        b.reduce(s1, SymbolId::END, doc, 1, 0, 0);
        b.reduce(s2, SymbolId::END, doc, 2, 1, 0);
        b.accept(s3, SymbolId::END);
        Arc::new(b.build().expect("chunk grammar should validate"))
    });
    Arc::clone(&GRAMMAR)
}

#[derive(Default)]
struct ChunkState {
    /// Chunks recognized so far; round-trips through serialize.
    count: u8,
}

/// Scanner for `chunk`: everything up to and including the next `;`.
pub struct ChunkScanner;

impl ExternalScanner for ChunkScanner {
    fn create(&self) -> Box<dyn Any + Send> {
        Box::new(ChunkState::default())
    }

    fn scan(
        &self,
        state: &mut dyn Any,
        cursor: &mut ScanCursor<'_>,
        valid: &[SymbolId],
    ) -> Option<SymbolId> {
        let state = state.downcast_mut::<ChunkState>()?;
        let &symbol = valid.first()?;
        if cursor.at_eof() {
            return None;
        }
        while let Some(ch) = cursor.bump() {
            if ch == ';' {
                break;
            }
        }
        cursor.mark_end();
        state.count = state.count.saturating_add(1);
        Some(symbol)
    }

    fn serialize(&self, state: &dyn Any) -> Vec<u8> {
        state
            .downcast_ref::<ChunkState>()
            .map(|s| vec![s.count])
            .unwrap_or_default()
    }

    fn deserialize(&self, bytes: &[u8]) -> Box<dyn Any + Send> {
        Box::new(ChunkState {
            count: bytes.first().copied().unwrap_or(0),
        })
    }
}
