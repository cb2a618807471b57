//! Subtree reuse for incremental reparsing.
//!
//! Before lexing at a position, the parser asks the walker whether the
//! previous tree has a subtree that starts exactly there once recorded
//! edits are accounted for. A subtree qualifies when its old byte range
//! touches no edit and it contains no error or missing nodes; candidates
//! are offered largest first so the parser splices the biggest subtree the
//! tables allow. Splicing clones an `Arc`, never node storage, which is
//! what makes the reused-subtree identity property observable.

use text_size::{TextRange, TextSize};

use crate::tree::{GreenNode, Tree};

pub(crate) struct ReuseWalker<'t> {
    tree: &'t Tree,
}

impl<'t> ReuseWalker<'t> {
    pub fn new(tree: &'t Tree) -> ReuseWalker<'t> {
        ReuseWalker { tree }
    }

    /// Reusable subtrees whose post-edit start equals `offset`, largest
    /// first.
    pub fn candidates_at(&self, offset: TextSize) -> Vec<&'t GreenNode> {
        let edits = self.tree.edits();
        let mut out = Vec::new();
        let mut green = self.tree.root_green();
        let mut raw_start = TextSize::new(0);

        loop {
            let raw_end = raw_start + green.byte_len();
            if edits.transform_byte(raw_start) == offset
                && green.byte_len() > TextSize::new(0)
                && !green.has_error()
                && !edits.invalidates(TextRange::new(raw_start, raw_end))
            {
                out.push(green);
            }

            // Descend into the child covering the target position.
            let mut next = None;
            let mut child_start = raw_start;
            for child in green.children() {
                let child_end = child_start + child.byte_len();
                let t_start = edits.transform_byte(child_start);
                let t_end = edits.transform_byte(child_end);
                if t_start > offset {
                    break;
                }
                if t_start <= offset && offset < t_end {
                    next = Some((child, child_start));
                    break;
                }
                child_start = child_end;
            }
            match next {
                Some((child, start)) => {
                    green = child;
                    raw_start = start;
                }
                None => break,
            }
        }
        out
    }
}
