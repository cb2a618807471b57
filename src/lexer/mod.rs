//! Table-driven lexer with an external-scanner bridge.
//!
//! The lexer is stateless over the input; all mutable position state lives
//! in a [`LexerState`] owned by exactly one in-progress parse candidate, so
//! GLR stack splits can carry independent lexer positions and scanner-state
//! snapshots.
//!
//! Token resolution order follows the runtime this engine models: when any
//! valid lookahead is an external token and a scanner is attached, the
//! scanner gets the first try (it may consume zero or more bytes); on no
//! match the lexer rewinds and falls back to the static table, which picks
//! the longest match, breaking ties by rule declaration order.

mod scanner;

pub use scanner::{ExternalScanner, ScanCursor};

use smol_str::SmolStr;
use text_size::TextSize;

use crate::base::Point;
use crate::grammar::{Grammar, SymbolId};

/// A lexed token. `len` may be zero only for external tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub symbol: SymbolId,
    pub text: SmolStr,
    pub len: TextSize,
    pub point_len: Point,
    pub is_extra: bool,
    pub is_external: bool,
}

/// Position state owned by one parse candidate: byte offset, point, and the
/// serialized external-scanner state at that position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexerState {
    pub offset: TextSize,
    pub point: Point,
    pub scanner_state: Vec<u8>,
}

/// The lexer/scanner bridge for one parse invocation.
pub struct Lexer<'a> {
    grammar: &'a Grammar,
    input: &'a str,
    scanner: Option<&'a dyn ExternalScanner>,
}

impl<'a> Lexer<'a> {
    pub fn new(
        grammar: &'a Grammar,
        input: &'a str,
        scanner: Option<&'a dyn ExternalScanner>,
    ) -> Self {
        Self {
            grammar,
            input,
            scanner,
        }
    }

    /// The state a parse starts from: offset zero and a fresh scanner
    /// snapshot.
    pub fn initial_state(&self) -> LexerState {
        let scanner_state = match self.scanner {
            Some(scanner) => {
                let state = scanner.create();
                scanner.serialize(state.as_ref())
            }
            None => Vec::new(),
        };
        LexerState {
            offset: TextSize::new(0),
            point: Point::ZERO,
            scanner_state,
        }
    }

    pub fn at_eof(&self, state: &LexerState) -> bool {
        usize::from(state.offset) >= self.input.len()
    }

    /// Produce the next token given the symbols valid in the current parse
    /// state. Advances `state` past the token on success; on failure the
    /// state is left exactly as it was (the reset-marker contract), and the
    /// parser turns the dead end into error recovery.
    pub fn advance(&self, state: &mut LexerState, valid: &[SymbolId]) -> Option<Token> {
        if let Some(token) = self.scan_external(state, valid) {
            return Some(token);
        }
        self.scan_static(state, valid)
    }

    fn scan_external(&self, state: &mut LexerState, valid: &[SymbolId]) -> Option<Token> {
        let scanner = self.scanner?;
        let valid_external: Vec<SymbolId> = valid
            .iter()
            .copied()
            .filter(|&s| self.grammar.is_external(s))
            .collect();
        if valid_external.is_empty() {
            return None;
        }

        let mut scanner_state = scanner.deserialize(&state.scanner_state);
        let mut cursor = ScanCursor::new(self.input, state.offset.into(), state.point);
        let symbol = scanner.scan(scanner_state.as_mut(), &mut cursor, &valid_external)?;

        let len = cursor.token_len();
        let point_len = cursor.token_point_delta();
        let text = SmolStr::new(cursor.token_text());
        state.scanner_state = scanner.serialize(scanner_state.as_ref());
        state.offset += TextSize::new(len as u32);
        state.point = state.point.shift_by(point_len);
        tracing::trace!(
            symbol = self.grammar.symbol_name(symbol),
            len,
            "external token"
        );
        Some(Token {
            symbol,
            text,
            len: TextSize::new(len as u32),
            point_len,
            is_extra: self.grammar.is_extra(symbol),
            is_external: true,
        })
    }

    fn scan_static(&self, state: &mut LexerState, valid: &[SymbolId]) -> Option<Token> {
        let rest = &self.input[usize::from(state.offset)..];
        if rest.is_empty() {
            return None;
        }

        let mut best: Option<(usize, usize, SymbolId)> = None; // (len, order, symbol)
        for (order, rule) in self.grammar.lex_rules().iter().enumerate() {
            let wanted = valid.contains(&rule.symbol) || self.grammar.is_extra(rule.symbol);
            if !wanted {
                continue;
            }
            let Some(len) = rule.pattern.match_len(rest) else {
                continue;
            };
            // Zero-width static matches would stall the parse.
            if len == 0 {
                continue;
            }
            let better = match best {
                None => true,
                Some((best_len, best_order, _)) => {
                    len > best_len || (len == best_len && order < best_order)
                }
            };
            if better {
                best = Some((len, order, rule.symbol));
            }
        }

        let (len, _, symbol) = best?;
        let text = &rest[..len];
        let point_len = Point::delta_of(text);
        let token = Token {
            symbol,
            text: SmolStr::new(text),
            len: TextSize::new(len as u32),
            point_len,
            is_extra: self.grammar.is_extra(symbol),
            is_external: false,
        };
        state.offset += token.len;
        state.point = state.point.shift_by(point_len);
        Some(token)
    }
}
