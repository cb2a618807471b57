//! Error recovery: the engine terminates on any input and produces a
//! full-span tree, inserting zero-width missing leaves or wrapping skipped
//! bytes in error nodes.

mod helpers;

use std::sync::Arc;

use helpers::parse_expr;
use pretty_assertions::assert_eq;
use rstest::rstest;
use sylva::{GrammarBuilder, Parser, SymbolId, TextSize};

#[test]
fn missing_operand_is_inserted_at_end_of_input() {
    let tree = parse_expr("a+");
    assert!(tree.has_error());
    let sexp = tree.root_node().to_sexp();
    assert!(sexp.contains("(MISSING operand)"), "got {sexp}");
    // The missing leaf is zero width; the tree still spans the input.
    assert_eq!(tree.root_node().end_byte(), TextSize::new(2));
}

#[test]
fn missing_leaf_is_flagged_on_the_node() {
    let tree = parse_expr("a+");
    let root = tree.root_node();
    let right = root.child(root.child_count() - 1).expect("right operand");
    let leaf = right.child(0).expect("missing leaf");
    assert!(leaf.is_missing());
    assert!(!leaf.is_error());
    assert_eq!(leaf.start_byte(), leaf.end_byte());
}

#[test]
fn unmatched_bytes_become_an_error_node() {
    let tree = parse_expr("a+%+a");
    assert!(tree.has_error());
    let root = tree.root_node();
    assert_eq!(root.end_byte(), TextSize::new(5));
    assert_eq!(root.text(), "a+%+a");
    // Exactly the skipped byte is inside an error node.
    let error = root.descendant_for_byte_range(TextSize::new(2), TextSize::new(3));
    assert!(error.is_error());
    assert_eq!(error.text(), "%");
}

#[rstest]
#[case::pure_garbage("@@@@@@")]
#[case::garbage_then_valid("###a+a")]
#[case::valid_then_garbage("a+a###")]
#[case::interleaved("a#+#a")]
#[case::operators_only("+++")]
fn recovery_always_terminates_with_a_full_span_tree(#[case] source: &str) {
    let tree = parse_expr(source);
    assert!(tree.has_error());
    assert_eq!(tree.root_node().end_byte(), TextSize::new(source.len() as u32));
    assert_eq!(tree.root_node().text(), source);
}

#[test]
fn clean_region_after_garbage_still_parses() {
    let tree = parse_expr("###a+a");
    let root = tree.root_node();
    // The trailing expression survives as a normal subtree.
    let expr = root.descendant_for_byte_range(TextSize::new(3), TextSize::new(6));
    assert_eq!(expr.kind(), "expr");
    assert!(!expr.has_error());
    assert_eq!(expr.text(), "a+a");
}

#[test]
fn skipped_garbage_stops_at_the_next_lexable_token() {
    let tree = parse_expr("a+%+a");
    let sexp = tree.root_node().to_sexp();
    // Only the garbage byte is skipped; the following operator becomes
    // usable again through a zero-width missing operand.
    assert!(sexp.contains("(ERROR \"%\")"), "got {sexp}");
    assert!(sexp.contains("(MISSING operand)"), "got {sexp}");
}

#[test]
fn eof_reduce_without_a_goto_still_yields_a_tree() {
    // The loader accepts a table whose reduction names a non-terminal with
    // no goto anywhere; the parse must degrade to an error tree instead of
    // losing its only candidate.
    let mut b = GrammarBuilder::new("orphan");
    let doc = b.non_terminal("doc");
    let stray = b.non_terminal("stray");
    b.start_symbol(doc);
    let s0 = b.add_state();
    b.reduce(s0, SymbolId::END, stray, 0, 0, 0);
    let parser = Parser::new(Arc::new(b.build().expect("grammar should validate")));

    let empty = parser.parse("", None).expect("parse");
    assert!(empty.has_error());
    assert_eq!(empty.root_node().end_byte(), TextSize::new(0));

    let tree = parser.parse("z", None).expect("parse");
    assert!(tree.has_error());
    assert_eq!(tree.root_node().text(), "z");
}

#[test]
fn error_counts_propagate_to_the_root() {
    let clean = parse_expr("a+a");
    assert!(!clean.root_node().has_error());
    let broken = parse_expr("a+%");
    assert!(broken.root_node().has_error());
}
