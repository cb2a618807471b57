//! The read-only node facade.
//!
//! A [`Node`] is a lightweight view pairing a green node with the absolute
//! position computed on the way down. Positions are presented in the tree's
//! current coordinates: on a freshly parsed tree that is the raw offset, on
//! an edited tree recorded edits shift the answer.

use std::fmt;

use text_size::{TextRange, TextSize};

use crate::base::Point;
use crate::grammar::SymbolId;

use super::green::{GreenNode, NodeKind};
use super::Tree;

/// A node view into a [`Tree`]. Cheap to copy.
#[derive(Clone, Copy)]
pub struct Node<'t> {
    tree: &'t Tree,
    green: &'t GreenNode,
    raw_start_byte: TextSize,
    raw_start_point: Point,
    parent_production: Option<u16>,
    child_index: u16,
}

impl<'t> Node<'t> {
    pub(crate) fn new_root(tree: &'t Tree, green: &'t GreenNode) -> Node<'t> {
        Node {
            tree,
            green,
            raw_start_byte: TextSize::new(0),
            raw_start_point: Point::ZERO,
            parent_production: None,
            child_index: 0,
        }
    }

    pub(crate) fn at(
        tree: &'t Tree,
        green: &'t GreenNode,
        raw_start_byte: TextSize,
        raw_start_point: Point,
        parent_production: Option<u16>,
        child_index: u16,
    ) -> Node<'t> {
        Node {
            tree,
            green,
            raw_start_byte,
            raw_start_point,
            parent_production,
            child_index,
        }
    }

    pub fn symbol(&self) -> SymbolId {
        self.green.symbol()
    }

    /// The symbol's grammar name, or `ERROR`/`MISSING` for synthesized
    /// nodes.
    pub fn kind(&self) -> &'t str {
        match self.green.kind() {
            NodeKind::Error => "ERROR",
            NodeKind::Missing => "MISSING",
            _ => self.tree.grammar().symbol_name(self.green.symbol()),
        }
    }

    pub fn is_named(&self) -> bool {
        match self.green.kind() {
            NodeKind::Error | NodeKind::Missing => true,
            _ => self.tree.grammar().is_named(self.green.symbol()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.green.kind() == NodeKind::Error
    }

    pub fn is_missing(&self) -> bool {
        self.green.kind() == NodeKind::Missing
    }

    pub fn is_extra(&self) -> bool {
        self.green.is_extra()
    }

    /// Whether this subtree contains any error or missing node.
    pub fn has_error(&self) -> bool {
        self.green.has_error()
    }

    pub fn start_byte(&self) -> TextSize {
        self.tree.edits().transform_byte(self.raw_start_byte)
    }

    pub fn end_byte(&self) -> TextSize {
        self.tree
            .edits()
            .transform_byte(self.raw_start_byte + self.green.byte_len())
    }

    pub fn byte_range(&self) -> TextRange {
        TextRange::new(self.start_byte(), self.end_byte())
    }

    pub fn start_point(&self) -> Point {
        self.tree.edits().transform_point(self.raw_start_point)
    }

    pub fn end_point(&self) -> Point {
        self.tree
            .edits()
            .transform_point(self.raw_start_point.shift_by(self.green.point_len()))
    }

    /// Source text covered by this node, reassembled from its leaves.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.green.write_text(&mut out);
        out
    }

    pub fn child_count(&self) -> usize {
        self.green.child_count()
    }

    pub fn child(&self, index: usize) -> Option<Node<'t>> {
        let mut byte = self.raw_start_byte;
        let mut point = self.raw_start_point;
        for (i, child) in self.green.children().iter().enumerate() {
            if i == index {
                return Some(Node::at(
                    self.tree,
                    child,
                    byte,
                    point,
                    self.green.production(),
                    i as u16,
                ));
            }
            byte += child.byte_len();
            point = point.shift_by(child.point_len());
        }
        None
    }

    pub fn children(&self) -> NodeChildren<'t> {
        NodeChildren {
            parent: *self,
            next_index: 0,
            next_byte: self.raw_start_byte,
            next_point: self.raw_start_point,
        }
    }

    /// Named, non-trivia children only.
    pub fn named_children(&self) -> impl Iterator<Item = Node<'t>> {
        self.children().filter(|c| c.is_named() && !c.is_extra())
    }

    /// The field name the parent production gives this child, if any.
    pub fn field_name(&self) -> Option<&'t str> {
        let production = self.parent_production?;
        self.tree.grammar().field_name(production, self.child_index)
    }

    /// The smallest descendant (possibly `self`) whose byte range fully
    /// contains `start..end`.
    pub fn descendant_for_byte_range(&self, start: TextSize, end: TextSize) -> Node<'t> {
        let mut current = *self;
        'descend: loop {
            for child in current.children() {
                if child.start_byte() <= start && end <= child.end_byte() {
                    current = child;
                    continue 'descend;
                }
            }
            return current;
        }
    }

    /// The smallest descendant whose point range fully contains
    /// `start..end`.
    pub fn descendant_for_point_range(&self, start: Point, end: Point) -> Node<'t> {
        let mut current = *self;
        'descend: loop {
            for child in current.children() {
                if child.start_point() <= start && end <= child.end_point() {
                    current = child;
                    continue 'descend;
                }
            }
            return current;
        }
    }

    /// Identity check across tree versions: true when both views share the
    /// same underlying green node.
    pub fn shares_green_with(&self, other: &Node<'_>) -> bool {
        GreenNode::ptr_eq(self.green, other.green)
    }

    pub(crate) fn green(&self) -> &'t GreenNode {
        self.green
    }

    /// Render this subtree as an s-expression: named nodes as
    /// `(name child…)`, anonymous tokens as quoted text, trivia omitted.
    pub fn to_sexp(&self) -> String {
        let mut out = String::new();
        self.write_sexp(&mut out);
        out
    }

    fn write_sexp(&self, out: &mut String) {
        match self.green.kind() {
            NodeKind::Missing => {
                out.push_str("(MISSING ");
                out.push_str(self.tree.grammar().symbol_name(self.green.symbol()));
                out.push(')');
            }
            NodeKind::Token => {
                if self.is_named() {
                    out.push('(');
                    out.push_str(self.kind());
                    out.push(')');
                } else {
                    out.push('"');
                    out.push_str(&self.text());
                    out.push('"');
                }
            }
            NodeKind::Error | NodeKind::Interior => {
                out.push('(');
                out.push_str(self.kind());
                if self.green.is_leaf() {
                    if self.green.kind() == NodeKind::Error {
                        out.push_str(" \"");
                        out.push_str(&self.text());
                        out.push('"');
                    }
                } else {
                    for child in self.children() {
                        if child.is_extra() {
                            continue;
                        }
                        out.push(' ');
                        child.write_sexp(out);
                    }
                }
                out.push(')');
            }
        }
    }
}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{:?}..{:?}",
            self.kind(),
            u32::from(self.start_byte()),
            u32::from(self.end_byte())
        )
    }
}

/// Iterator over a node's direct children.
pub struct NodeChildren<'t> {
    parent: Node<'t>,
    next_index: usize,
    next_byte: TextSize,
    next_point: Point,
}

impl<'t> Iterator for NodeChildren<'t> {
    type Item = Node<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        let child = self.parent.green.children().get(self.next_index)?;
        let node = Node::at(
            self.parent.tree,
            child,
            self.next_byte,
            self.next_point,
            self.parent.green.production(),
            self.next_index as u16,
        );
        self.next_index += 1;
        self.next_byte += child.byte_len();
        self.next_point = self.next_point.shift_by(child.point_len());
        Some(node)
    }
}
