//! Stateful tree traversal.
//!
//! A [`TreeCursor`] walks a tree without re-descending from the root on
//! every move, which is what query layers and editors want for linear scans.
//! It mirrors the facade contract: first child, next sibling, parent, plus
//! range-based descent.

use text_size::TextSize;

use crate::base::Point;

use super::green::GreenNode;
use super::node::Node;
use super::Tree;

struct Frame<'t> {
    green: &'t GreenNode,
    raw_start_byte: TextSize,
    raw_start_point: Point,
    child_index: u16,
}

/// A cursor positioned on one node of a [`Tree`].
pub struct TreeCursor<'t> {
    tree: &'t Tree,
    // Invariant: never empty; the bottom frame is the root.
    stack: Vec<Frame<'t>>,
}

impl<'t> TreeCursor<'t> {
    pub(crate) fn new(tree: &'t Tree) -> TreeCursor<'t> {
        TreeCursor {
            tree,
            stack: vec![Frame {
                green: tree.root_green(),
                raw_start_byte: TextSize::new(0),
                raw_start_point: Point::ZERO,
                child_index: 0,
            }],
        }
    }

    fn top(&self) -> &Frame<'t> {
        self.stack.last().expect("cursor stack is never empty")
    }

    /// The node the cursor currently points at.
    pub fn node(&self) -> Node<'t> {
        let top = self.top();
        let parent_production = if self.stack.len() >= 2 {
            self.stack[self.stack.len() - 2].green.production()
        } else {
            None
        };
        Node::at(
            self.tree,
            top.green,
            top.raw_start_byte,
            top.raw_start_point,
            parent_production,
            top.child_index,
        )
    }

    /// Move to the current node's first child. Returns false on a leaf.
    pub fn goto_first_child(&mut self) -> bool {
        let top = self.top();
        let Some(child) = top.green.children().first() else {
            return false;
        };
        let frame = Frame {
            green: child,
            raw_start_byte: top.raw_start_byte,
            raw_start_point: top.raw_start_point,
            child_index: 0,
        };
        self.stack.push(frame);
        true
    }

    /// Move to the next sibling. Returns false on the last child or the
    /// root.
    pub fn goto_next_sibling(&mut self) -> bool {
        if self.stack.len() < 2 {
            return false;
        }
        let parent = &self.stack[self.stack.len() - 2];
        let top = self.stack.last().expect("non-empty");
        let next_index = top.child_index as usize + 1;
        let Some(next) = parent.green.children().get(next_index) else {
            return false;
        };
        let frame = Frame {
            green: next,
            raw_start_byte: top.raw_start_byte + top.green.byte_len(),
            raw_start_point: top.raw_start_point.shift_by(top.green.point_len()),
            child_index: next_index as u16,
        };
        self.stack.pop();
        self.stack.push(frame);
        true
    }

    /// Move to the parent. Returns false at the root.
    pub fn goto_parent(&mut self) -> bool {
        if self.stack.len() < 2 {
            return false;
        }
        self.stack.pop();
        true
    }

    /// Re-position the cursor on the smallest node containing the byte
    /// range, descending from the current node.
    pub fn goto_descendant_for_byte_range(&mut self, start: TextSize, end: TextSize) -> Node<'t> {
        'descend: loop {
            if self.goto_first_child() {
                loop {
                    let node = self.node();
                    if node.start_byte() <= start && end <= node.end_byte() {
                        continue 'descend;
                    }
                    if !self.goto_next_sibling() {
                        break;
                    }
                }
                self.goto_parent();
            }
            return self.node();
        }
    }
}
