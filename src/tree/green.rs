//! The shared, immutable node layer.
//!
//! Green nodes store *relative* extents (byte length and point delta), never
//! absolute positions. That is what makes structural sharing work across
//! tree versions: a reused subtree is the same `Arc` spliced into a new
//! parse, and its absolute position is recomputed during traversal. Leaves
//! keep their text, so a tree is a lossless record of its source.

use std::sync::Arc;

use smol_str::SmolStr;
use text_size::TextSize;

use crate::base::Point;
use crate::grammar::SymbolId;

/// What a node is, structurally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A rule node produced by a reduction.
    Interior,
    /// A lexed token leaf.
    Token,
    /// Synthesized around input the grammar could not match.
    Error,
    /// A zero-width leaf standing in for a required but absent terminal.
    Missing,
}

#[derive(Debug)]
pub(crate) struct GreenData {
    symbol: SymbolId,
    kind: NodeKind,
    byte_len: TextSize,
    point_len: Point,
    /// Leaf text; interior nodes derive text from their leaves.
    text: Option<SmolStr>,
    children: Vec<GreenNode>,
    /// Number of error/missing nodes in this subtree, itself included.
    error_count: u32,
    is_extra: bool,
    /// Production id of the reduction that built this node.
    production: Option<u16>,
}

/// A reference-counted immutable syntax node. Cloning is pointer-cheap;
/// dropping one tree never disturbs another tree sharing its subtrees.
#[derive(Debug, Clone)]
pub struct GreenNode(Arc<GreenData>);

impl GreenNode {
    /// A token leaf.
    pub fn token(symbol: SymbolId, text: SmolStr, point_len: Point, is_extra: bool) -> GreenNode {
        GreenNode(Arc::new(GreenData {
            symbol,
            kind: NodeKind::Token,
            byte_len: TextSize::new(text.len() as u32),
            point_len,
            text: Some(text),
            children: Vec::new(),
            error_count: 0,
            is_extra,
            production: None,
        }))
    }

    /// A zero-width missing leaf for the expected `symbol`.
    pub fn missing(symbol: SymbolId) -> GreenNode {
        GreenNode(Arc::new(GreenData {
            symbol,
            kind: NodeKind::Missing,
            byte_len: TextSize::new(0),
            point_len: Point::ZERO,
            text: Some(SmolStr::default()),
            children: Vec::new(),
            error_count: 1,
            is_extra: false,
            production: None,
        }))
    }

    /// An error leaf covering skipped input.
    pub fn error_text(text: SmolStr, point_len: Point) -> GreenNode {
        GreenNode(Arc::new(GreenData {
            symbol: SymbolId::ERROR,
            kind: NodeKind::Error,
            byte_len: TextSize::new(text.len() as u32),
            point_len,
            text: Some(text),
            children: Vec::new(),
            error_count: 1,
            is_extra: false,
            production: None,
        }))
    }

    /// An interior node over `children`; extents and error counts are the
    /// fold of the children's.
    pub fn interior(
        symbol: SymbolId,
        production: Option<u16>,
        children: Vec<GreenNode>,
    ) -> GreenNode {
        Self::assemble(symbol, NodeKind::Interior, production, children, 0)
    }

    /// An error node wrapping already-built children.
    pub fn error(children: Vec<GreenNode>) -> GreenNode {
        Self::assemble(SymbolId::ERROR, NodeKind::Error, None, children, 1)
    }

    fn assemble(
        symbol: SymbolId,
        kind: NodeKind,
        production: Option<u16>,
        children: Vec<GreenNode>,
        own_errors: u32,
    ) -> GreenNode {
        let mut byte_len = TextSize::new(0);
        let mut point_len = Point::ZERO;
        let mut error_count = own_errors;
        for child in &children {
            byte_len += child.byte_len();
            point_len = point_len.shift_by(child.point_len());
            error_count += child.error_count();
        }
        GreenNode(Arc::new(GreenData {
            symbol,
            kind,
            byte_len,
            point_len,
            text: None,
            children,
            error_count,
            is_extra: false,
            production,
        }))
    }

    pub fn symbol(&self) -> SymbolId {
        self.0.symbol
    }

    pub fn kind(&self) -> NodeKind {
        self.0.kind
    }

    pub fn byte_len(&self) -> TextSize {
        self.0.byte_len
    }

    pub fn point_len(&self) -> Point {
        self.0.point_len
    }

    pub fn children(&self) -> &[GreenNode] {
        &self.0.children
    }

    pub fn child_count(&self) -> usize {
        self.0.children.len()
    }

    pub fn error_count(&self) -> u32 {
        self.0.error_count
    }

    pub fn has_error(&self) -> bool {
        self.0.error_count > 0
    }

    pub fn is_extra(&self) -> bool {
        self.0.is_extra
    }

    pub fn is_leaf(&self) -> bool {
        self.0.children.is_empty()
    }

    pub fn leaf_text(&self) -> Option<&str> {
        self.0.text.as_deref()
    }

    pub fn production(&self) -> Option<u16> {
        self.0.production
    }

    /// Identity: do two handles share the same underlying node?
    pub fn ptr_eq(a: &GreenNode, b: &GreenNode) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    /// Append this subtree's text to `out`.
    pub fn write_text(&self, out: &mut String) {
        if let Some(text) = &self.0.text {
            out.push_str(text);
        }
        for child in &self.0.children {
            child.write_text(out);
        }
    }
}

/// Structural equality, with a pointer-identity fast path.
impl PartialEq for GreenNode {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.0, &other.0) {
            return true;
        }
        self.0.symbol == other.0.symbol
            && self.0.kind == other.0.kind
            && self.0.byte_len == other.0.byte_len
            && self.0.text == other.0.text
            && self.0.children == other.0.children
    }
}

impl Eq for GreenNode {}
