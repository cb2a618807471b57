//! Persistent parse stacks.
//!
//! GLR exploration needs many candidate stacks that differ only near the
//! top, so stack entries form a persistent `Arc`-linked list: splitting a
//! stack is one pointer clone and the shared prefix is never copied. Each
//! entry pairs a table state with the syntax node whose recognition got us
//! there; spans of the entries are contiguous in source order by
//! construction.

use std::sync::Arc;

use crate::grammar::StateId;
use crate::tree::{GreenNode, NodeKind};

#[derive(Debug)]
struct StackEntry {
    state: StateId,
    /// `None` only for the bottom-of-stack sentinel.
    node: Option<GreenNode>,
    prev: Option<Arc<StackEntry>>,
}

/// One candidate stack. Cloning shares the whole spine.
#[derive(Debug, Clone)]
pub(crate) struct ParseStack {
    head: Arc<StackEntry>,
}

impl ParseStack {
    pub fn new(start: StateId) -> ParseStack {
        ParseStack {
            head: Arc::new(StackEntry {
                state: start,
                node: None,
                prev: None,
            }),
        }
    }

    /// Table state at the top of the stack.
    pub fn state(&self) -> StateId {
        self.head.state
    }

    pub fn push(&self, state: StateId, node: GreenNode) -> ParseStack {
        ParseStack {
            head: Arc::new(StackEntry {
                state,
                node: Some(node),
                prev: Some(Arc::clone(&self.head)),
            }),
        }
    }

    /// Pop entries for a reduction of `child_count` grammar children.
    /// Interleaved trivia and error nodes ride along without counting
    /// toward the right-hand side. Returns the popped nodes in source
    /// order and the remaining stack.
    pub fn pop_for_reduce(&self, child_count: usize) -> (Vec<GreenNode>, ParseStack) {
        let mut children = Vec::new();
        let mut cursor = Arc::clone(&self.head);
        let mut counted = 0;
        while counted < child_count {
            let Some(node) = cursor.node.clone() else {
                break; // ran into the sentinel; malformed table, keep going
            };
            if !node.is_extra() && node.kind() != NodeKind::Error {
                counted += 1;
            }
            children.push(node);
            let prev = cursor.prev.clone().expect("entry with node has prev");
            cursor = prev;
        }
        children.reverse();
        (children, ParseStack { head: cursor })
    }

    /// Whether two stacks are the same parse: identical states and node
    /// identities along the whole spine. A shared tail short-circuits the
    /// walk.
    pub fn same_spine(&self, other: &ParseStack) -> bool {
        let mut a = Some(&self.head);
        let mut b = Some(&other.head);
        loop {
            match (a, b) {
                (Some(x), Some(y)) => {
                    if Arc::ptr_eq(x, y) {
                        return true;
                    }
                    if x.state != y.state {
                        return false;
                    }
                    match (&x.node, &y.node) {
                        (None, None) => {}
                        (Some(m), Some(n)) if GreenNode::ptr_eq(m, n) => {}
                        _ => return false,
                    }
                    a = x.prev.as_ref();
                    b = y.prev.as_ref();
                }
                (None, None) => return true,
                _ => return false,
            }
        }
    }

    /// All nodes on the stack, bottom to top.
    pub fn all_nodes(&self) -> Vec<GreenNode> {
        let mut nodes = Vec::new();
        let mut cursor = Some(&self.head);
        while let Some(entry) = cursor {
            if let Some(node) = &entry.node {
                nodes.push(node.clone());
            }
            cursor = entry.prev.as_ref();
        }
        nodes.reverse();
        nodes
    }

    /// Number of nodes on the stack.
    #[cfg(test)]
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut cursor = Some(&self.head);
        while let Some(entry) = cursor {
            if entry.node.is_some() {
                count += 1;
            }
            cursor = entry.prev.as_ref();
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::Point;
    use crate::grammar::SymbolId;
    use smol_str::SmolStr;

    fn leaf(text: &str, extra: bool) -> GreenNode {
        GreenNode::token(SymbolId(1), SmolStr::new(text), Point::new(0, text.len() as u32), extra)
    }

    #[test]
    fn push_and_pop_round_trip() {
        let stack = ParseStack::new(StateId(0))
            .push(StateId(1), leaf("a", false))
            .push(StateId(2), leaf("+", false))
            .push(StateId(1), leaf("b", false));
        assert_eq!(stack.state(), StateId(1));

        let (children, rest) = stack.pop_for_reduce(3);
        assert_eq!(children.len(), 3);
        assert_eq!(children[0].leaf_text(), Some("a"));
        assert_eq!(children[2].leaf_text(), Some("b"));
        assert_eq!(rest.state(), StateId(0));
        assert_eq!(rest.node_count(), 0);
    }

    #[test]
    fn reduce_keeps_interleaved_trivia() {
        let stack = ParseStack::new(StateId(0))
            .push(StateId(1), leaf("a", false))
            .push(StateId(1), leaf(" ", true))
            .push(StateId(2), leaf("+", false));
        let (children, rest) = stack.pop_for_reduce(2);
        assert_eq!(children.len(), 3);
        assert!(children[1].is_extra());
        assert_eq!(rest.node_count(), 0);
    }

    #[test]
    fn split_stacks_share_their_prefix() {
        let base = ParseStack::new(StateId(0)).push(StateId(1), leaf("a", false));
        let left = base.push(StateId(2), leaf("+", false));
        let right = base.push(StateId(3), leaf("*", false));

        let shared_left = &left.all_nodes()[0];
        let shared_right = &right.all_nodes()[0];
        assert!(GreenNode::ptr_eq(shared_left, shared_right));
    }

    #[test]
    fn same_spine_distinguishes_stacks_below_an_equal_head() {
        let base = ParseStack::new(StateId(0));
        let one = base.push(StateId(1), leaf("a", false));
        let two = base
            .push(StateId(2), leaf("b", false))
            .push(StateId(1), leaf("c", false));
        // Heads agree on the state, the histories do not.
        assert_eq!(one.state(), two.state());
        assert!(!one.same_spine(&two));
        assert!(one.same_spine(&one.clone()));
    }

    #[test]
    fn underflow_stops_at_sentinel() {
        let stack = ParseStack::new(StateId(0)).push(StateId(1), leaf("a", false));
        let (children, rest) = stack.pop_for_reduce(5);
        assert_eq!(children.len(), 1);
        assert_eq!(rest.node_count(), 0);
    }
}
