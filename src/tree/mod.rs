//! Syntax trees and their read-only facade.
//!
//! A [`Tree`] owns an immutable green root plus the grammar it was parsed
//! with. Trees are cheap to clone and safe to share: all node storage is
//! reference-counted, and an edited or reparsed tree shares every untouched
//! subtree with its ancestor by reference, never by copy.
//!
//! [`Tree::edit`] records a validated [`InputEdit`] without reparsing:
//! facade queries then answer in post-edit coordinates, and the edited tree
//! is what a subsequent incremental parse takes as its `old_tree` input.

mod cursor;
mod green;
mod node;

pub use cursor::TreeCursor;
pub use green::{GreenNode, NodeKind};
pub use node::{Node, NodeChildren};

use std::sync::Arc;

use text_size::TextSize;

use crate::base::{EditError, EditList, InputEdit};
use crate::grammar::Grammar;

/// An immutable, versioned syntax tree.
#[derive(Clone)]
pub struct Tree {
    grammar: Arc<Grammar>,
    root: GreenNode,
    edits: EditList,
}

impl Tree {
    pub(crate) fn new(grammar: Arc<Grammar>, root: GreenNode) -> Tree {
        Tree {
            grammar,
            root,
            edits: EditList::new(),
        }
    }

    pub fn grammar(&self) -> &Arc<Grammar> {
        &self.grammar
    }

    pub fn root_node(&self) -> Node<'_> {
        Node::new_root(self, &self.root)
    }

    pub fn walk(&self) -> TreeCursor<'_> {
        TreeCursor::new(self)
    }

    /// Length of the text this tree currently describes, accounting for
    /// recorded edits.
    pub fn text_len(&self) -> TextSize {
        let raw = i64::from(u32::from(self.root.byte_len()));
        TextSize::new((raw + self.edits.net_delta()) as u32)
    }

    /// Whether any error or missing node exists in the tree.
    pub fn has_error(&self) -> bool {
        self.root.has_error()
    }

    /// Record an edit, producing a positionally adjusted tree suitable as
    /// the `old_tree` input to an incremental reparse. No node storage is
    /// copied; invalid edits fail fast.
    pub fn edit(&self, edit: &InputEdit) -> Result<Tree, EditError> {
        let mut edited = self.clone();
        edited.edits.push(edit, self.text_len())?;
        Ok(edited)
    }

    pub(crate) fn root_green(&self) -> &GreenNode {
        &self.root
    }

    pub(crate) fn edits(&self) -> &EditList {
        &self.edits
    }
}

impl std::fmt::Debug for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tree")
            .field("grammar", &self.grammar.name())
            .field("len", &u32::from(self.root.byte_len()))
            .field("errors", &self.root.error_count())
            .field("pending_edits", &self.edits.len())
            .finish()
    }
}
