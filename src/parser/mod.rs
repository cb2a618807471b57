//! The incremental parser.
//!
//! A [`Parser`] owns a grammar (and optionally an external scanner) and
//! turns source text into [`Tree`]s. Passing the previous tree back in,
//! after recording edits on it, makes the parse incremental: unchanged
//! subtrees are spliced into the new tree by reference instead of being
//! re-lexed and re-built.

mod glr;
mod reuse;
mod stack;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::base::{EditError, InputEdit};
use crate::grammar::Grammar;
use crate::lexer::{ExternalScanner, Lexer};
use crate::tree::Tree;

use glr::ParseSession;
use reuse::ReuseWalker;

/// How the engine picks a winner among ambiguous parses that reach the end
/// of input with equal error cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TieBreak {
    /// Prefer lower error cost, then higher summed dynamic precedence,
    /// then earlier stack creation.
    #[default]
    ErrorCountThenPrecedence,
    /// Prefer lower error cost, then earlier stack creation; dynamic
    /// precedence only breaks remaining ties.
    DeclarationOrder,
}

/// Knobs for one parse invocation.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Abort once more than this many input bytes have been consumed.
    /// Zero cancels before any work is done.
    pub byte_budget: Option<usize>,
    /// Abort when this much wall-clock time has elapsed.
    pub timeout: Option<Duration>,
    pub tie_break: TieBreak,
}

#[derive(Debug, Error)]
pub enum ParseError {
    /// The byte budget or timeout expired; `consumed` is how far the
    /// furthest candidate had read.
    #[error("parse cancelled after {consumed} bytes")]
    Cancelled { consumed: u32 },
    #[error("invalid edit: {0}")]
    Edit(#[from] EditError),
}

/// A reusable parsing engine for one grammar.
pub struct Parser {
    grammar: Arc<Grammar>,
    scanner: Option<Box<dyn ExternalScanner>>,
}

impl Parser {
    pub fn new(grammar: Arc<Grammar>) -> Parser {
        Parser {
            grammar,
            scanner: None,
        }
    }

    /// Attach the grammar's external scanner. Subtree reuse is disabled
    /// while a scanner is attached, because reused subtrees do not record
    /// the scanner state they were built under.
    pub fn with_scanner(grammar: Arc<Grammar>, scanner: Box<dyn ExternalScanner>) -> Parser {
        Parser {
            grammar,
            scanner: Some(scanner),
        }
    }

    pub fn grammar(&self) -> &Arc<Grammar> {
        &self.grammar
    }

    /// Parse `source`, reusing subtrees of `old_tree` where its recorded
    /// edits allow.
    pub fn parse(&self, source: &str, old_tree: Option<&Tree>) -> Result<Tree, ParseError> {
        self.parse_with(source, old_tree, &ParseOptions::default())
    }

    pub fn parse_with(
        &self,
        source: &str,
        old_tree: Option<&Tree>,
        options: &ParseOptions,
    ) -> Result<Tree, ParseError> {
        let span = tracing::debug_span!(
            "parse",
            grammar = self.grammar.name(),
            len = source.len(),
            incremental = old_tree.is_some()
        );
        let _enter = span.enter();

        let reuse = old_tree
            .filter(|t| self.scanner.is_none() && Arc::ptr_eq(t.grammar(), &self.grammar))
            .map(ReuseWalker::new);
        let lexer = Lexer::new(&self.grammar, source, self.scanner.as_deref());
        let session = ParseSession::new(&self.grammar, lexer, source, options, reuse);
        let root = session.run()?;
        Ok(Tree::new(Arc::clone(&self.grammar), root))
    }

    /// Convenience wrapper that records `edits` on `old_tree` and then
    /// reparses `source` (the post-edit text) against it.
    pub fn parse_edited(
        &self,
        source: &str,
        old_tree: &Tree,
        edits: &[InputEdit],
        options: &ParseOptions,
    ) -> Result<Tree, ParseError> {
        let mut edited = old_tree.clone();
        for edit in edits {
            edited = edited.edit(edit)?;
        }
        self.parse_with(source, Some(&edited), options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::Point;
    use crate::grammar::{GrammarBuilder, SymbolId};
    use text_size::TextSize;

    /// Ambiguous infix grammar: expr -> expr '+' expr | operand. State 4
    /// carries a shift/reduce conflict on '+', so "a+a+a" splits the stack.
    fn expr_grammar() -> Arc<Grammar> {
        let mut b = GrammarBuilder::new("expr");
        let expr = b.non_terminal("expr");
        b.start_symbol(expr);
        let operand = b.token("operand", "a+");
        let plus = b.literal("+");
        let ws = b.token("ws", r"[ \t\n]+");
        b.extra(ws);

        let s0 = b.add_state();
        let s1 = b.add_state();
        let s2 = b.add_state();
        let s3 = b.add_state();
        let s4 = b.add_state();
        b.shift(s0, operand, s1).goto(s0, expr, s2);
        b.reduce(s1, plus, expr, 1, 0, 0);
        b.reduce(s1, SymbolId::END, expr, 1, 0, 0);
        b.shift(s2, plus, s3).accept(s2, SymbolId::END);
        b.shift(s3, operand, s1).goto(s3, expr, s4);
        b.reduce(s4, plus, expr, 3, 1, 0).shift(s4, plus, s3);
        b.reduce(s4, SymbolId::END, expr, 3, 1, 0);
        b.field(1, 0, "left").field(1, 1, "operator").field(1, 2, "right");
        Arc::new(b.build().expect("expr grammar"))
    }

    #[test]
    fn parses_a_simple_expression() {
        let parser = Parser::new(expr_grammar());
        let tree = parser.parse("a+a", None).expect("parse");
        let root = tree.root_node();
        assert_eq!(root.kind(), "expr");
        assert_eq!(root.start_byte(), TextSize::new(0));
        assert_eq!(root.end_byte(), TextSize::new(3));
        assert!(!tree.has_error());
        assert_eq!(
            root.to_sexp(),
            "(expr (expr (operand)) \"+\" (expr (operand)))"
        );
    }

    #[test]
    fn trivia_is_kept_inside_the_tree() {
        let parser = Parser::new(expr_grammar());
        let tree = parser.parse("a + a", None).expect("parse");
        let root = tree.root_node();
        assert_eq!(root.end_byte(), TextSize::new(5));
        let mut text = String::new();
        tree.root_green().write_text(&mut text);
        assert_eq!(text, "a + a");
    }

    #[test]
    fn ambiguity_resolves_left_associative() {
        let parser = Parser::new(expr_grammar());
        let tree = parser.parse("a+a+a", None).expect("parse");
        let root = tree.root_node();
        // The earliest-created stack reduces before shifting the second
        // '+', so the left operand is itself a binary expression.
        let left = root.child(0).expect("left child");
        assert_eq!(left.kind(), "expr");
        assert_eq!(left.end_byte(), TextSize::new(3));
        assert_eq!(left.child_count(), 3);
        let right = root.child(2).expect("right child");
        assert_eq!(right.child_count(), 1);
    }

    #[test]
    fn field_names_come_from_the_production() {
        let parser = Parser::new(expr_grammar());
        let tree = parser.parse("a+a", None).expect("parse");
        let root = tree.root_node();
        assert_eq!(root.child(0).and_then(|c| c.field_name()), Some("left"));
        assert_eq!(root.child(1).and_then(|c| c.field_name()), Some("operator"));
        assert_eq!(root.child(2).and_then(|c| c.field_name()), Some("right"));
    }

    #[test]
    fn empty_input_yields_full_span_error_tree() {
        let parser = Parser::new(expr_grammar());
        let tree = parser.parse("", None).expect("parse");
        let root = tree.root_node();
        assert_eq!(root.start_byte(), TextSize::new(0));
        assert_eq!(root.end_byte(), TextSize::new(0));
        assert!(tree.has_error());
    }

    #[test]
    fn unlexable_input_is_skipped_into_an_error_node() {
        let parser = Parser::new(expr_grammar());
        let tree = parser.parse("!!!", None).expect("parse");
        let root = tree.root_node();
        assert_eq!(root.end_byte(), TextSize::new(3));
        assert!(tree.has_error());
        let mut text = String::new();
        tree.root_green().write_text(&mut text);
        assert_eq!(text, "!!!");
    }

    #[test]
    fn trailing_operator_gets_a_missing_operand() {
        let parser = Parser::new(expr_grammar());
        let tree = parser.parse("a+", None).expect("parse");
        let root = tree.root_node();
        assert_eq!(root.end_byte(), TextSize::new(2));
        assert!(tree.has_error());
        assert!(root.to_sexp().contains("MISSING"));
    }

    #[test]
    fn zero_byte_budget_cancels_immediately() {
        let parser = Parser::new(expr_grammar());
        let options = ParseOptions {
            byte_budget: Some(0),
            ..ParseOptions::default()
        };
        let err = parser.parse_with("a+a", None, &options).unwrap_err();
        assert!(matches!(err, ParseError::Cancelled { consumed: 0 }));
    }

    #[test]
    fn reparse_without_edits_reuses_the_whole_tree() {
        let parser = Parser::new(expr_grammar());
        let old = parser.parse("a+a", None).expect("parse");
        let new = parser.parse("a+a", Some(&old)).expect("reparse");
        assert!(old.root_node().shares_green_with(&new.root_node()));
    }

    #[test]
    fn edited_reparse_shares_the_untouched_subtree() {
        let parser = Parser::new(expr_grammar());
        let old = parser.parse("a+a", None).expect("parse");
        // Grow the second operand: "a+a" -> "a+aa".
        let edit = InputEdit {
            start_byte: TextSize::new(2),
            old_end_byte: TextSize::new(3),
            new_end_byte: TextSize::new(4),
            start_point: Point::new(0, 2),
            old_end_point: Point::new(0, 3),
            new_end_point: Point::new(0, 4),
        };
        let new = parser
            .parse_edited("a+aa", &old, &[edit], &ParseOptions::default())
            .expect("reparse");
        let old_root = old.root_node();
        let new_root = new.root_node();
        assert_eq!(new_root.end_byte(), TextSize::new(4));
        assert!(!new.has_error());
        // The left operand predates the edit and is spliced by reference.
        let old_left = old_root.child(0).expect("old left");
        let new_left = new_root.child(0).expect("new left");
        assert!(old_left.shares_green_with(&new_left));
        // The edited operand is rebuilt.
        let old_right = old_root.child(2).expect("old right");
        let new_right = new_root.child(2).expect("new right");
        assert!(!old_right.shares_green_with(&new_right));
        assert_eq!(new_right.text(), "aa");
    }

    #[test]
    fn overlapping_edits_are_rejected() {
        let parser = Parser::new(expr_grammar());
        let old = parser.parse("a+a", None).expect("parse");
        let edit = |start: u32, old_end: u32| InputEdit {
            start_byte: TextSize::new(start),
            old_end_byte: TextSize::new(old_end),
            new_end_byte: TextSize::new(old_end),
            start_point: Point::new(0, start),
            old_end_point: Point::new(0, old_end),
            new_end_point: Point::new(0, old_end),
        };
        let err = parser
            .parse_edited("a+a", &old, &[edit(0, 2), edit(1, 3)], &ParseOptions::default())
            .unwrap_err();
        assert!(matches!(err, ParseError::Edit(EditError::Overlapping { .. })));
    }
}
