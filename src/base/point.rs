//! Row/column coordinates for syntax nodes.
//!
//! A [`Point`] is a 0-indexed (row, column) position. Columns are measured in
//! bytes from the start of the line, which keeps point arithmetic exact for
//! any byte offset regardless of encoding.

use std::fmt;

/// A 0-indexed row/column position in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Point {
    pub row: u32,
    pub column: u32,
}

impl Point {
    pub const ZERO: Point = Point { row: 0, column: 0 };

    pub fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }

    /// The point delta covered by `text`: rows are newline counts, and the
    /// column is the byte length of the final line.
    pub fn delta_of(text: &str) -> Point {
        let bytes = text.as_bytes();
        let rows = bytes.iter().filter(|&&b| b == b'\n').count() as u32;
        let column = match bytes.iter().rposition(|&b| b == b'\n') {
            Some(i) => (bytes.len() - i - 1) as u32,
            None => bytes.len() as u32,
        };
        Point::new(rows, column)
    }

    /// Advance this point by a delta. A delta with rows resets the column to
    /// the delta's column (the new line starts fresh).
    pub fn shift_by(self, delta: Point) -> Point {
        if delta.row == 0 {
            Point::new(self.row, self.column.saturating_add(delta.column))
        } else {
            Point::new(self.row.saturating_add(delta.row), delta.column)
        }
    }

    /// The delta that carries `self` to `later`. `later` must not precede
    /// `self`.
    pub fn delta_to(self, later: Point) -> Point {
        debug_assert!(self <= later);
        if later.row == self.row {
            Point::new(0, later.column - self.column)
        } else {
            Point::new(later.row - self.row, later.column)
        }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_of_single_line() {
        assert_eq!(Point::delta_of("abc"), Point::new(0, 3));
        assert_eq!(Point::delta_of(""), Point::ZERO);
    }

    #[test]
    fn delta_of_multi_line() {
        assert_eq!(Point::delta_of("a\nbc"), Point::new(1, 2));
        assert_eq!(Point::delta_of("a\n\n"), Point::new(2, 0));
    }

    #[test]
    fn shift_by_same_row_extends_column() {
        let p = Point::new(3, 5);
        assert_eq!(p.shift_by(Point::new(0, 2)), Point::new(3, 7));
    }

    #[test]
    fn shift_by_newline_resets_column() {
        let p = Point::new(3, 5);
        assert_eq!(p.shift_by(Point::new(2, 1)), Point::new(5, 1));
    }

    #[test]
    fn shift_by_saturates_instead_of_overflowing() {
        let p = Point::new(u32::MAX, u32::MAX);
        assert_eq!(p.shift_by(Point::new(0, 1)), Point::new(u32::MAX, u32::MAX));
        assert_eq!(p.shift_by(Point::new(1, 0)), Point::new(u32::MAX, 0));
    }

    #[test]
    fn delta_roundtrip() {
        let start = Point::new(2, 7);
        let text = "xy\nlonger line\nz";
        let end = start.shift_by(Point::delta_of(text));
        assert_eq!(start.delta_to(end), Point::delta_of(text));
    }
}
