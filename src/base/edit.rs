//! Text edits and the coordinate bookkeeping around them.
//!
//! An [`InputEdit`] describes one splice of the source text: the byte range
//! that was replaced and the byte range of the replacement, with matching
//! row/column coordinates. Edits recorded against a tree are kept in an
//! [`EditList`], which answers the two questions incremental reparsing needs:
//!
//! - where does an original-tree position land in the edited text
//!   ([`EditList::transform_byte`] / [`EditList::transform_point`]), and
//! - does an original-tree subtree touch any edited region
//!   ([`EditList::invalidates`]).
//!
//! Edits are validated when recorded: out-of-bounds ranges, inverted ranges,
//! and edits that overlap a previously recorded edit are rejected with
//! [`EditError`] before any tree state is derived from them.

use text_size::{TextRange, TextSize};
use thiserror::Error;

use super::point::Point;

/// A single edit to source text, in the coordinates of the text as it was
/// before this edit (and after any previously recorded ones).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEdit {
    pub start_byte: TextSize,
    pub old_end_byte: TextSize,
    pub new_end_byte: TextSize,
    pub start_point: Point,
    pub old_end_point: Point,
    pub new_end_point: Point,
}

impl InputEdit {
    /// The change in text length this edit causes.
    pub fn len_delta(&self) -> i64 {
        i64::from(u32::from(self.new_end_byte)) - i64::from(u32::from(self.old_end_byte))
    }
}

/// Why an edit was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("edit range {start}..{old_end} is inverted")]
    Inverted { start: u32, old_end: u32 },
    #[error("edit end {old_end} is out of bounds for text of length {len}")]
    OutOfBounds { old_end: u32, len: u32 },
    #[error("edit {start}..{old_end} overlaps a previously recorded edit")]
    Overlapping { start: u32, old_end: u32 },
}

/// An edit stored in original-tree coordinates plus its replacement extent.
#[derive(Debug, Clone, Copy)]
struct AppliedEdit {
    start_byte: TextSize,
    old_end_byte: TextSize,
    start_point: Point,
    old_end_point: Point,
    /// Byte length of the replacement text.
    new_len: TextSize,
    /// Row/column extent of the replacement text.
    new_point_delta: Point,
}

impl AppliedEdit {
    fn len_delta(&self) -> i64 {
        i64::from(u32::from(self.new_len)) - i64::from(u32::from(self.old_end_byte - self.start_byte))
    }

    /// End of the replacement, expressed from the original start point.
    fn new_end_point(&self) -> Point {
        self.start_point.shift_by(self.new_point_delta)
    }
}

/// A validated, ordered set of edits against one tree.
///
/// All stored coordinates are those of the original (pre-edit) tree; incoming
/// edits arrive in current coordinates and are mapped back on insertion.
#[derive(Debug, Clone, Default)]
pub struct EditList {
    edits: Vec<AppliedEdit>,
}

impl EditList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// Net byte-length change of all recorded edits.
    pub fn net_delta(&self) -> i64 {
        self.edits.iter().map(AppliedEdit::len_delta).sum()
    }

    /// Record an edit given in current (post-previous-edits) coordinates.
    /// `current_len` is the text length those coordinates refer to.
    pub fn push(&mut self, edit: &InputEdit, current_len: TextSize) -> Result<(), EditError> {
        if edit.old_end_byte < edit.start_byte || edit.new_end_byte < edit.start_byte {
            return Err(EditError::Inverted {
                start: edit.start_byte.into(),
                old_end: edit.old_end_byte.into(),
            });
        }
        if edit.old_end_byte > current_len {
            return Err(EditError::OutOfBounds {
                old_end: edit.old_end_byte.into(),
                len: current_len.into(),
            });
        }

        let overlap = || EditError::Overlapping {
            start: edit.start_byte.into(),
            old_end: edit.old_end_byte.into(),
        };

        let start = self.inverse_byte(edit.start_byte).ok_or_else(overlap)?;
        let old_end = self.inverse_byte(edit.old_end_byte).ok_or_else(overlap)?;

        // The mapped range must stay clear of every previously edited range.
        for e in &self.edits {
            if start < e.old_end_byte && old_end > e.start_byte {
                return Err(overlap());
            }
        }

        let applied = AppliedEdit {
            start_byte: start,
            old_end_byte: old_end,
            start_point: self.inverse_point(edit.start_point),
            old_end_point: self.inverse_point(edit.old_end_point),
            new_len: edit.new_end_byte - edit.start_byte,
            new_point_delta: edit.start_point.delta_to(edit.new_end_point),
        };
        let at = self
            .edits
            .partition_point(|e| e.start_byte <= applied.start_byte);
        self.edits.insert(at, applied);
        Ok(())
    }

    /// Map an original-tree byte offset into the edited text. Offsets inside
    /// a replaced region clamp to the replacement's start.
    pub fn transform_byte(&self, offset: TextSize) -> TextSize {
        let mut delta: i64 = 0;
        for e in &self.edits {
            if e.old_end_byte <= offset {
                delta += e.len_delta();
            } else if e.start_byte <= offset {
                return TextSize::new((i64::from(u32::from(e.start_byte)) + delta) as u32);
            } else {
                break;
            }
        }
        TextSize::new((i64::from(u32::from(offset)) + delta) as u32)
    }

    /// Map an original-tree point into the edited text.
    pub fn transform_point(&self, point: Point) -> Point {
        let mut row_delta: i64 = 0;
        let mut col_delta: i64 = 0;
        for e in &self.edits {
            if e.old_end_point <= point {
                let new_end = e.new_end_point();
                row_delta += i64::from(new_end.row) - i64::from(e.old_end_point.row);
                if e.old_end_point.row == point.row {
                    col_delta += i64::from(new_end.column) - i64::from(e.old_end_point.column);
                }
            } else if e.start_point <= point {
                return Point::new(
                    (i64::from(e.start_point.row) + row_delta) as u32,
                    e.start_point.column,
                );
            } else {
                break;
            }
        }
        Point::new(
            (i64::from(point.row) + row_delta) as u32,
            (i64::from(point.column) + col_delta) as u32,
        )
    }

    /// Whether `range` (original-tree coordinates) touches an edited region.
    ///
    /// Boundaries count: an insertion at a node's start or end invalidates
    /// the node, so reuse stays conservative around edit points.
    pub fn invalidates(&self, range: TextRange) -> bool {
        self.edits
            .iter()
            .any(|e| e.start_byte <= range.end() && e.old_end_byte >= range.start())
    }

    /// Map a current-coordinates offset back to original-tree coordinates.
    /// Returns `None` if the offset lies strictly inside replacement text,
    /// which has no original counterpart.
    fn inverse_byte(&self, offset: TextSize) -> Option<TextSize> {
        let mut delta: i64 = 0;
        for e in &self.edits {
            let cur_start = (i64::from(u32::from(e.start_byte)) + delta) as u32;
            let cur_new_end = cur_start + u32::from(e.new_len);
            let offset_u = u32::from(offset);
            if offset_u >= cur_new_end {
                delta += e.len_delta();
            } else if offset_u > cur_start {
                return None;
            } else {
                break;
            }
        }
        Some(TextSize::new((i64::from(u32::from(offset)) - delta) as u32))
    }

    fn inverse_point(&self, point: Point) -> Point {
        let mut row_delta: i64 = 0;
        let mut col_delta: i64 = 0;
        for e in &self.edits {
            let new_end = e.new_end_point();
            let cur_end = Point::new(
                (i64::from(new_end.row) + row_delta) as u32,
                new_end.column,
            );
            if cur_end <= point {
                row_delta += i64::from(new_end.row) - i64::from(e.old_end_point.row);
                if cur_end.row == point.row {
                    col_delta += i64::from(new_end.column) - i64::from(e.old_end_point.column);
                }
            } else {
                break;
            }
        }
        Point::new(
            (i64::from(point.row) - row_delta) as u32,
            (i64::from(point.column) - col_delta).max(0) as u32,
        )
    }
}
