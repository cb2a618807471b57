//! The external-scanner capability.
//!
//! Some tokens cannot be classified by static lexical tables: layout tokens
//! in whitespace-significant languages, nested block delimiters, heredocs.
//! A grammar may supply an [`ExternalScanner`] for those. The engine treats
//! it purely as an injected capability: scanner state is opaque, carried as
//! a serialized blob in parse-stack entries so GLR backtracking can rewind
//! tokenization to an earlier scanner state.

use std::any::Any;

use crate::base::Point;
use crate::grammar::SymbolId;

/// Character-level view of the input handed to an external scanner.
///
/// The scanner consumes lookahead with [`bump`](ScanCursor::bump) and
/// declares where the token ends with [`mark_end`](ScanCursor::mark_end);
/// lookahead past the mark is allowed and not consumed. Column access is
/// provided for indentation-sensitive scanners.
pub struct ScanCursor<'a> {
    text: &'a str,
    start: usize,
    pos: usize,
    point: Point,
    start_point: Point,
    mark: Option<(usize, Point)>,
}

impl<'a> ScanCursor<'a> {
    /// A cursor over `text` starting at `offset`. Exposed so grammars can
    /// unit-test their scanners outside a parse.
    pub fn new(text: &'a str, offset: usize, point: Point) -> Self {
        Self {
            text,
            start: offset,
            pos: offset,
            point,
            start_point: point,
            mark: None,
        }
    }

    /// The next character, without consuming it.
    pub fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    /// Consume and return the next character.
    pub fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        self.point = if ch == '\n' {
            Point::new(self.point.row + 1, 0)
        } else {
            Point::new(self.point.row, self.point.column + ch.len_utf8() as u32)
        };
        Some(ch)
    }

    /// Declare that the token ends at the current position. Further bumps
    /// are lookahead only.
    pub fn mark_end(&mut self) {
        self.mark = Some((self.pos, self.point));
    }

    pub fn at_eof(&self) -> bool {
        self.pos >= self.text.len()
    }

    /// Column of the current lookahead position, in bytes from line start.
    pub fn column(&self) -> u32 {
        self.point.column
    }

    pub fn row(&self) -> u32 {
        self.point.row
    }

    /// Bytes consumed into the token so far (up to the mark, if one is set).
    pub(crate) fn token_len(&self) -> usize {
        let end = self.mark.map(|(pos, _)| pos).unwrap_or(self.pos);
        end - self.start
    }

    pub(crate) fn token_point_delta(&self) -> Point {
        let end_point = self.mark.map(|(_, point)| point).unwrap_or(self.point);
        self.start_point.delta_to(end_point)
    }

    pub(crate) fn token_text(&self) -> &'a str {
        let end = self.mark.map(|(pos, _)| pos).unwrap_or(self.pos);
        &self.text[self.start..end]
    }
}

/// A grammar-supplied scanner for context-sensitive tokens.
///
/// State is created once per parse, mutated by [`scan`](Self::scan), and
/// snapshotted with [`serialize`](Self::serialize) after every external
/// token so the parser can rewind it; destruction is ordinary `Drop`.
pub trait ExternalScanner: Send + Sync {
    /// Fresh scanner state for a new parse.
    fn create(&self) -> Box<dyn Any + Send>;

    /// Try to recognize one of `valid` at the cursor. Returns the matched
    /// symbol, with the token extent taken from the cursor's mark (a
    /// zero-length token is legal, e.g. layout dedents); `None` means no
    /// match and the engine falls back to the static tables.
    fn scan(
        &self,
        state: &mut dyn Any,
        cursor: &mut ScanCursor<'_>,
        valid: &[SymbolId],
    ) -> Option<SymbolId>;

    /// Snapshot scanner state into bytes.
    fn serialize(&self, state: &dyn Any) -> Vec<u8>;

    /// Restore scanner state from a snapshot.
    fn deserialize(&self, bytes: &[u8]) -> Box<dyn Any + Send>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_tracks_rows_and_columns() {
        let mut cursor = ScanCursor::new("ab\ncd", 0, Point::ZERO);
        assert_eq!(cursor.bump(), Some('a'));
        assert_eq!(cursor.bump(), Some('b'));
        assert_eq!(cursor.column(), 2);
        assert_eq!(cursor.bump(), Some('\n'));
        assert_eq!(cursor.row(), 1);
        assert_eq!(cursor.column(), 0);
    }

    #[test]
    fn mark_end_limits_token_extent() {
        let mut cursor = ScanCursor::new("abcdef", 0, Point::ZERO);
        cursor.bump();
        cursor.bump();
        cursor.mark_end();
        // Lookahead past the mark.
        cursor.bump();
        cursor.bump();
        assert_eq!(cursor.token_len(), 2);
        assert_eq!(cursor.token_text(), "ab");
    }

    #[test]
    fn unmarked_token_extends_to_position() {
        let mut cursor = ScanCursor::new("xyz", 1, Point::new(0, 1));
        cursor.bump();
        assert_eq!(cursor.token_len(), 1);
        assert_eq!(cursor.token_text(), "y");
        assert_eq!(cursor.token_point_delta(), Point::new(0, 1));
    }
}
