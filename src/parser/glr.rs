//! The GLR parse loop.
//!
//! One parse invocation drives a work-list of candidate stacks. Each step
//! takes the candidate at the earliest input position, tries subtree reuse,
//! lexes a token, applies every valid action (splitting the stack on
//! conflicts), and collapses candidates that turn out to be the same parse.
//! Dead candidates are discarded while siblings live; the
//! last candidate standing goes into error recovery instead, so a parse
//! always terminates with a tree unless its budget expires first.

use std::time::Instant;

use smol_str::SmolStr;
use text_size::TextSize;

use crate::base::Point;
use crate::grammar::{Action, Grammar, StateId, SymbolId};
use crate::lexer::{Lexer, LexerState, Token};
use crate::tree::GreenNode;

use super::reuse::ReuseWalker;
use super::stack::ParseStack;
use super::{ParseError, ParseOptions, TieBreak};

/// Upper bound on simultaneously live candidate stacks.
const MAX_ACTIVE_STACKS: usize = 12;
/// Consecutive zero-width shifts tolerated before a branch is declared
/// stuck.
const MAX_ZERO_WIDTH_RUN: u8 = 16;
/// Missing-terminal insertions tolerated per candidate.
const MAX_MISSING_INSERTIONS: u8 = 12;

const MISSING_COST: u32 = 110;
const SKIP_COST: u32 = 100;
const FORCED_WRAP_COST: u32 = 5_000;

#[derive(Clone)]
struct Candidate {
    stack: ParseStack,
    lexer_state: LexerState,
    error_cost: u32,
    dyn_precedence: i64,
    order: u32,
    zero_width_run: u8,
    missing_insertions: u8,
}

struct Finished {
    root: GreenNode,
    error_cost: u32,
    dyn_precedence: i64,
    order: u32,
}

pub(crate) struct ParseSession<'a> {
    grammar: &'a Grammar,
    lexer: Lexer<'a>,
    input: &'a str,
    options: &'a ParseOptions,
    reuse: Option<ReuseWalker<'a>>,
    next_order: u32,
}

impl<'a> ParseSession<'a> {
    pub fn new(
        grammar: &'a Grammar,
        lexer: Lexer<'a>,
        input: &'a str,
        options: &'a ParseOptions,
        reuse: Option<ReuseWalker<'a>>,
    ) -> Self {
        Self {
            grammar,
            lexer,
            input,
            options,
            reuse,
            next_order: 0,
        }
    }

    fn fresh_order(&mut self) -> u32 {
        self.next_order += 1;
        self.next_order
    }

    pub fn run(mut self) -> Result<GreenNode, ParseError> {
        let deadline = self.options.timeout.map(|t| Instant::now() + t);
        // Generous bound so degenerate tables cannot spin the loop forever.
        let step_limit = 512 + (self.input.len() as u64 + 1) * 256;
        let mut steps: u64 = 0;

        let mut active = vec![Candidate {
            stack: ParseStack::new(StateId::START),
            lexer_state: self.lexer.initial_state(),
            error_cost: 0,
            dyn_precedence: 0,
            order: 0,
            zero_width_run: 0,
            missing_insertions: 0,
        }];
        let mut finished: Vec<Finished> = Vec::new();

        while !active.is_empty() {
            let consumed = active
                .iter()
                .map(|c| u32::from(c.lexer_state.offset))
                .max()
                .unwrap_or(0);
            if let Some(budget) = self.options.byte_budget {
                if budget == 0 || consumed as usize > budget {
                    return Err(ParseError::Cancelled { consumed });
                }
            }
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return Err(ParseError::Cancelled { consumed });
                }
            }

            steps += 1;
            if steps > step_limit {
                tracing::warn!(steps, "parse step limit reached, forcing error tree");
                let candidate = active.swap_remove(0);
                finished.push(self.force_finish(candidate));
                break;
            }

            // Process the candidate at the earliest position so converging
            // heads meet and merge.
            let idx = Self::earliest(&active);
            let candidate = active.swap_remove(idx);

            if self.lexer.at_eof(&candidate.lexer_state) {
                self.step_eof(candidate, &mut active, &mut finished);
            } else {
                self.step(candidate, &mut active, &mut finished);
            }

            self.prune(&mut active);
        }

        let winner = finished
            .into_iter()
            .min_by_key(|f| self.rank(f.error_cost, f.dyn_precedence, f.order))
            .expect("recovery guarantees at least one finished candidate");
        tracing::debug!(errors = winner.error_cost, "parse finished");
        Ok(winner.root)
    }

    fn earliest(active: &[Candidate]) -> usize {
        let mut best = 0;
        for (i, c) in active.iter().enumerate() {
            let key = (c.lexer_state.offset, c.order);
            let best_key = (active[best].lexer_state.offset, active[best].order);
            if key < best_key {
                best = i;
            }
        }
        best
    }

    fn rank(&self, error_cost: u32, dyn_precedence: i64, order: u32) -> (u32, i64, i64) {
        match self.options.tie_break {
            TieBreak::ErrorCountThenPrecedence => (error_cost, -dyn_precedence, i64::from(order)),
            TieBreak::DeclarationOrder => (error_cost, i64::from(order), -dyn_precedence),
        }
    }

    // ========================================================================
    // One candidate, one step
    // ========================================================================

    fn step(
        &mut self,
        candidate: Candidate,
        active: &mut Vec<Candidate>,
        finished: &mut Vec<Finished>,
    ) {
        // Incremental splice: the largest clean old subtree starting here
        // that the tables let us push.
        if let Some(walker) = &self.reuse {
            let offset = candidate.lexer_state.offset;
            let state = candidate.stack.state();
            for green in walker.candidates_at(offset) {
                if let Some(target) = self.splice_target(state, green) {
                    tracing::trace!(
                        symbol = self.grammar.symbol_name(green.symbol()),
                        offset = u32::from(offset),
                        len = u32::from(green.byte_len()),
                        "reusing subtree"
                    );
                    let mut c = candidate;
                    c.lexer_state.offset += green.byte_len();
                    c.lexer_state.point = c.lexer_state.point.shift_by(green.point_len());
                    c.zero_width_run = 0;
                    c.stack = c.stack.push(target, green.clone());
                    self.insert_merged(active, c);
                    return;
                }
            }
        }

        let state = candidate.stack.state();
        let valid = self.valid_lookaheads(state);
        let mut post = candidate.lexer_state.clone();
        match self.lexer.advance(&mut post, &valid) {
            Some(token) if token.is_extra => {
                let mut c = candidate;
                if token.len == TextSize::new(0) {
                    c.zero_width_run += 1;
                } else {
                    c.zero_width_run = 0;
                }
                if c.zero_width_run > MAX_ZERO_WIDTH_RUN {
                    self.dead_or_recover(c, None, active, finished);
                    return;
                }
                let leaf = GreenNode::token(token.symbol, token.text, token.point_len, true);
                c.stack = c.stack.push(state, leaf);
                c.lexer_state = post;
                self.insert_merged(active, c);
            }
            Some(token) => {
                if token.len == TextSize::new(0) && candidate.zero_width_run >= MAX_ZERO_WIDTH_RUN {
                    self.dead_or_recover(candidate, None, active, finished);
                    return;
                }
                let fallback = candidate.clone();
                let successors = self.apply_token(candidate, &token, &post);
                if successors.is_empty() {
                    self.dead_or_recover(fallback, Some((token, post)), active, finished);
                } else {
                    for c in successors {
                        self.insert_merged(active, c);
                    }
                }
            }
            None => {
                self.dead_or_recover(candidate, None, active, finished);
            }
        }
    }

    /// Apply every action the table has for `token`, chaining reductions
    /// until each branch either shifts the token or dies.
    fn apply_token(
        &mut self,
        candidate: Candidate,
        token: &Token,
        post: &LexerState,
    ) -> Vec<Candidate> {
        let leaf = GreenNode::token(token.symbol, token.text.clone(), token.point_len, false);
        let mut pending = vec![candidate];
        let mut shifted = Vec::new();
        let mut guard = 0u32;

        while let Some(cand) = pending.pop() {
            guard += 1;
            if guard > 4 * 1024 {
                tracing::warn!("reduction chain limit reached, dropping branch");
                break;
            }
            let actions = self.grammar.actions(cand.stack.state(), token.symbol).to_vec();
            if actions.is_empty() {
                continue; // dead branch
            }
            if actions.len() > 1 {
                tracing::trace!(
                    state = cand.stack.state().0,
                    lookahead = self.grammar.symbol_name(token.symbol),
                    ways = actions.len(),
                    "stack split"
                );
            }
            for (i, &action) in actions.iter().enumerate() {
                let mut c = cand.clone();
                if i > 0 {
                    c.order = self.fresh_order();
                }
                match action {
                    Action::Shift(target) => {
                        c.stack = c.stack.push(target, leaf.clone());
                        c.lexer_state = post.clone();
                        c.zero_width_run = if token.len == TextSize::new(0) {
                            c.zero_width_run + 1
                        } else {
                            0
                        };
                        shifted.push(c);
                    }
                    Action::Reduce {
                        symbol,
                        child_count,
                        production,
                        dynamic_precedence,
                    } => {
                        let (children, rest) = c.stack.pop_for_reduce(child_count as usize);
                        let Some(target) = self.grammar.goto(rest.state(), symbol) else {
                            continue; // no goto: this branch is dead
                        };
                        let node = GreenNode::interior(symbol, Some(production), children);
                        c.dyn_precedence += i64::from(dynamic_precedence);
                        c.stack = rest.push(target, node);
                        pending.push(c);
                    }
                    // Accept is only meaningful on end-of-input.
                    Action::Accept => {}
                }
            }
        }
        shifted
    }

    fn step_eof(
        &mut self,
        candidate: Candidate,
        active: &mut Vec<Candidate>,
        finished: &mut Vec<Finished>,
    ) {
        let state = candidate.stack.state();
        let actions = self.grammar.actions(state, SymbolId::END).to_vec();
        let mut produced = false;
        for (i, &action) in actions.iter().enumerate() {
            let mut c = candidate.clone();
            if i > 0 {
                c.order = self.fresh_order();
            }
            match action {
                Action::Accept => {
                    let root = self.build_root(c.stack.all_nodes());
                    finished.push(Finished {
                        root,
                        error_cost: c.error_cost,
                        dyn_precedence: c.dyn_precedence,
                        order: c.order,
                    });
                    produced = true;
                }
                Action::Reduce {
                    symbol,
                    child_count,
                    production,
                    dynamic_precedence,
                } => {
                    let (children, rest) = c.stack.pop_for_reduce(child_count as usize);
                    let Some(target) = self.grammar.goto(rest.state(), symbol) else {
                        continue;
                    };
                    let node = GreenNode::interior(symbol, Some(production), children);
                    c.dyn_precedence += i64::from(dynamic_precedence);
                    c.stack = rest.push(target, node);
                    self.insert_merged(active, c);
                    produced = true;
                }
                // A shift on end-of-input cannot consume anything.
                Action::Shift(_) => {}
            }
        }
        // No action (or every action dead-ended on a missing goto): the
        // candidate still owes the caller a tree.
        if !produced {
            self.eof_recover(candidate, active, finished);
        }
    }

    // ========================================================================
    // Error recovery
    // ========================================================================

    fn dead_or_recover(
        &mut self,
        candidate: Candidate,
        stuck: Option<(Token, LexerState)>,
        active: &mut Vec<Candidate>,
        finished: &mut Vec<Finished>,
    ) {
        if !active.is_empty() || !finished.is_empty() {
            tracing::trace!(
                state = candidate.stack.state().0,
                offset = u32::from(candidate.lexer_state.offset),
                "discarding dead candidate"
            );
            return;
        }
        self.recover(candidate, stuck, active);
    }

    /// Recovery for the last live candidate. First try inserting one
    /// missing terminal that lets the next token proceed; otherwise skip
    /// input into an error node up to the next position where any known
    /// token lexes. Every path makes progress, so the parse terminates.
    fn recover(
        &mut self,
        mut candidate: Candidate,
        stuck: Option<(Token, LexerState)>,
        active: &mut Vec<Candidate>,
    ) {
        let state = candidate.stack.state();
        let lexable = self.all_terminals();

        // The token the caller got stuck on, or whatever lexes here once
        // the state's own lookahead restriction is lifted.
        let stuck = stuck.or_else(|| {
            let mut probe = candidate.lexer_state.clone();
            self.lexer
                .advance(&mut probe, &lexable)
                .filter(|t| !t.is_extra && t.len > TextSize::new(0))
                .map(|t| (t, probe))
        });

        if let Some((token, post)) = &stuck {
            if candidate.missing_insertions < MAX_MISSING_INSERTIONS {
                for (symbol, target) in self.shiftable_terminals(state) {
                    if symbol == token.symbol {
                        continue;
                    }
                    if self.grammar.actions(target, token.symbol).is_empty() {
                        continue;
                    }
                    let mut c = candidate.clone();
                    c.stack = c.stack.push(target, GreenNode::missing(symbol));
                    c.error_cost += MISSING_COST;
                    c.missing_insertions += 1;
                    tracing::trace!(
                        missing = self.grammar.symbol_name(symbol),
                        offset = u32::from(c.lexer_state.offset),
                        "inserted missing terminal"
                    );
                    let successors = self.apply_token(c, token, post);
                    if !successors.is_empty() {
                        for s in successors {
                            self.insert_merged(active, s);
                        }
                        return;
                    }
                }
            }
        }

        // Skip forward to the next position where any known token lexes;
        // later steps decide whether it parses or needs further recovery.
        let start = candidate.lexer_state.offset;
        let rest = &self.input[usize::from(start)..];
        let mut end = TextSize::new(self.input.len() as u32);
        for (i, _) in rest.char_indices() {
            if i == 0 {
                continue;
            }
            let offset = start + TextSize::new(i as u32);
            let mut probe = LexerState {
                offset,
                point: candidate
                    .lexer_state
                    .point
                    .shift_by(Point::delta_of(&rest[..i])),
                scanner_state: candidate.lexer_state.scanner_state.clone(),
            };
            if self.lexer.advance(&mut probe, &lexable).is_some() {
                end = offset;
                break;
            }
        }

        let skipped = &self.input[usize::from(start)..usize::from(end)];
        tracing::trace!(
            offset = u32::from(start),
            len = skipped.len(),
            "skipping unmatched input into error node"
        );
        let error = GreenNode::error_text(SmolStr::new(skipped), Point::delta_of(skipped));
        candidate.stack = candidate.stack.push(state, error);
        candidate.lexer_state.point = candidate
            .lexer_state
            .point
            .shift_by(Point::delta_of(skipped));
        candidate.lexer_state.offset = end;
        candidate.error_cost += SKIP_COST + u32::from(end - start);
        candidate.zero_width_run = 0;
        self.insert_merged(active, candidate);
    }

    fn eof_recover(
        &mut self,
        candidate: Candidate,
        active: &mut Vec<Candidate>,
        finished: &mut Vec<Finished>,
    ) {
        if !active.is_empty() || !finished.is_empty() {
            return;
        }
        if candidate.missing_insertions < MAX_MISSING_INSERTIONS {
            if let Some((symbol, target)) = self.shiftable_terminals(candidate.stack.state()).first().copied() {
                let mut c = candidate;
                c.stack = c.stack.push(target, GreenNode::missing(symbol));
                c.error_cost += MISSING_COST;
                c.missing_insertions += 1;
                tracing::trace!(
                    missing = self.grammar.symbol_name(symbol),
                    "inserted missing terminal at end of input"
                );
                self.insert_merged(active, c);
                return;
            }
        }
        finished.push(self.force_finish(candidate));
    }

    /// Give up on reaching the accept action and wrap whatever the stack
    /// holds into a root node, so the caller still gets a full-span tree.
    /// The wrapped content counts as an error.
    fn force_finish(&self, candidate: Candidate) -> Finished {
        let nodes = candidate.stack.all_nodes();
        let root = GreenNode::interior(
            self.grammar.start_symbol(),
            None,
            vec![GreenNode::error(nodes)],
        );
        Finished {
            root,
            error_cost: candidate.error_cost + FORCED_WRAP_COST,
            dyn_precedence: candidate.dyn_precedence,
            order: candidate.order,
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn valid_lookaheads(&self, state: StateId) -> Vec<SymbolId> {
        let mut valid: Vec<SymbolId> = self
            .grammar
            .valid_symbols(state)
            .filter(|&s| s != SymbolId::END)
            .collect();
        valid.sort_unstable();
        valid
    }

    /// Every statically lexable terminal. Recovery probes with this set so
    /// it can see tokens the current state's lookaheads exclude.
    fn all_terminals(&self) -> Vec<SymbolId> {
        let mut out: Vec<SymbolId> = self
            .grammar
            .lex_rules()
            .iter()
            .map(|rule| rule.symbol)
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Terminals with a shift action in `state`, in declaration order.
    fn shiftable_terminals(&self, state: StateId) -> Vec<(SymbolId, StateId)> {
        let mut out: Vec<(SymbolId, StateId)> = self
            .grammar
            .valid_symbols(state)
            .filter(|&s| s != SymbolId::END && !self.grammar.is_external(s))
            .filter_map(|s| {
                self.grammar.actions(state, s).iter().find_map(|a| match a {
                    Action::Shift(target) => Some((s, *target)),
                    _ => None,
                })
            })
            .collect();
        out.sort_unstable_by_key(|(s, _)| *s);
        out
    }

    /// Which state a reused subtree would put the parser in, if any.
    fn splice_target(&self, state: StateId, green: &GreenNode) -> Option<StateId> {
        use crate::tree::NodeKind;
        match green.kind() {
            NodeKind::Interior => self.grammar.goto(state, green.symbol()),
            NodeKind::Token => {
                if green.is_extra() {
                    Some(state)
                } else {
                    self.grammar
                        .actions(state, green.symbol())
                        .iter()
                        .find_map(|a| match a {
                            Action::Shift(target) => Some(*target),
                            _ => None,
                        })
                }
            }
            NodeKind::Error | NodeKind::Missing => None,
        }
    }

    /// Insert a candidate, merging with an existing one only when the two
    /// are the same parse: same position and the same stack along the whole
    /// spine. Candidates whose heads converge over different histories stay
    /// separate, since a later reduction can expose the states below the
    /// head and kill one branch but not the other.
    fn insert_merged(&self, active: &mut Vec<Candidate>, candidate: Candidate) {
        if let Some(existing) = active.iter_mut().find(|c| {
            c.lexer_state.offset == candidate.lexer_state.offset
                && c.stack.same_spine(&candidate.stack)
        }) {
            let new_rank = self.rank(candidate.error_cost, candidate.dyn_precedence, candidate.order);
            let old_rank = self.rank(existing.error_cost, existing.dyn_precedence, existing.order);
            if new_rank < old_rank {
                *existing = candidate;
            }
        } else {
            active.push(candidate);
        }
    }

    fn prune(&self, active: &mut Vec<Candidate>) {
        if active.len() <= MAX_ACTIVE_STACKS {
            return;
        }
        active.sort_by_key(|c| self.rank(c.error_cost, c.dyn_precedence, c.order));
        active.truncate(MAX_ACTIVE_STACKS);
    }

    fn build_root(&self, mut nodes: Vec<GreenNode>) -> GreenNode {
        if let [node] = nodes.as_slice() {
            if node.symbol() == self.grammar.start_symbol() && !node.is_extra() {
                return nodes.remove(0);
            }
        }
        // Dangling trivia or partial content: fold everything into a
        // start-symbol root so the root always spans the whole input.
        GreenNode::interior(self.grammar.start_symbol(), None, nodes)
    }
}
