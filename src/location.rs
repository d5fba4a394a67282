//! Program locations: one record per program point, carrying the abstract
//! stores and the transfer function for that point.
//!
//! The transfer function is determined by the variant tag plus the syntax
//! slice captured at build time, so it is a `match` in [`Location::apply`]
//! rather than a per-instance closure. Locations are laid out linearly in
//! syntactic order; the store routing that linear order cannot express
//! (branch entries, join points, loop feedback) goes through the FIFO
//! queues of [`Wiring`].

use std::collections::VecDeque;
use std::fmt;

use crate::ast::{AstNode, LogicOp};
use crate::check::comparison_holds;
use crate::diagnostics::{Branch, Diagnostics};
use crate::eval::{eval, refine};
use crate::store::Store;

/// A branch or loop condition `var op rhs`, with a constant right side.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub var: String,
    pub op: LogicOp,
    pub rhs: AstNode,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.var, self.op, self.rhs)
    }
}

/// Where a location's predecessor store comes from within one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    /// The previous location's output store (the normal case; the first
    /// location reads the precondition store).
    Previous,
    /// The restricted then-store pushed by if-construct `id`.
    IfBody(usize),
    /// The restricted else-store pushed by if-construct `id`.
    ElseBody(usize),
    /// The restricted body store pushed by while-construct `id`.
    WhileBody(usize),
}

/// FIFO store queues wiring heads, body tails and end locations together.
///
/// Every queue is keyed by the compound statement it belongs to, so nested
/// constructs cannot intercept each other's entries; within one key the
/// queue discipline is strictly first-in first-out. All queues are drained
/// within the pass that filled them except `while_feedback`, which carries a
/// body-tail store from one iteration to the next.
#[derive(Debug, Clone, Default)]
pub struct Wiring {
    if_body: Vec<VecDeque<Store>>,
    else_body: Vec<VecDeque<Store>>,
    final_if: Vec<VecDeque<Store>>,
    final_else: Vec<VecDeque<Store>>,
    while_body: Vec<VecDeque<Store>>,
    while_exit: Vec<VecDeque<Store>>,
    while_feedback: Vec<VecDeque<Store>>,
}

impl Wiring {
    pub fn new(if_count: usize, while_count: usize) -> Self {
        Self {
            if_body: vec![VecDeque::new(); if_count],
            else_body: vec![VecDeque::new(); if_count],
            final_if: vec![VecDeque::new(); if_count],
            final_else: vec![VecDeque::new(); if_count],
            while_body: vec![VecDeque::new(); while_count],
            while_exit: vec![VecDeque::new(); while_count],
            while_feedback: vec![VecDeque::new(); while_count],
        }
    }

    pub fn push_if_body(&mut self, id: usize, store: Store) {
        self.if_body[id].push_back(store);
    }

    pub fn pop_if_body(&mut self, id: usize) -> Option<Store> {
        self.if_body[id].pop_front()
    }

    pub fn push_else_body(&mut self, id: usize, store: Store) {
        self.else_body[id].push_back(store);
    }

    pub fn pop_else_body(&mut self, id: usize) -> Option<Store> {
        self.else_body[id].pop_front()
    }

    pub fn push_final_if(&mut self, id: usize, store: Store) {
        self.final_if[id].push_back(store);
    }

    pub fn pop_final_if(&mut self, id: usize) -> Option<Store> {
        self.final_if[id].pop_front()
    }

    pub fn push_final_else(&mut self, id: usize, store: Store) {
        self.final_else[id].push_back(store);
    }

    pub fn pop_final_else(&mut self, id: usize) -> Option<Store> {
        self.final_else[id].pop_front()
    }

    pub fn push_while_body(&mut self, id: usize, store: Store) {
        self.while_body[id].push_back(store);
    }

    pub fn pop_while_body(&mut self, id: usize) -> Option<Store> {
        self.while_body[id].pop_front()
    }

    pub fn push_while_exit(&mut self, id: usize, store: Store) {
        self.while_exit[id].push_back(store);
    }

    pub fn pop_while_exit(&mut self, id: usize) -> Option<Store> {
        self.while_exit[id].pop_front()
    }

    pub fn push_while_feedback(&mut self, id: usize, store: Store) {
        self.while_feedback[id].push_back(store);
    }

    pub fn pop_while_feedback(&mut self, id: usize) -> Option<Store> {
        self.while_feedback[id].pop_front()
    }
}

/// Mutable solver state handed to each transfer function.
pub struct Context<'a> {
    pub wiring: &'a mut Wiring,
    pub diag: &'a mut Diagnostics,
    /// Apply widening at loop heads this pass.
    pub widen: bool,
}

/// The per-variant stores and syntax of a program point.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationKind {
    /// `var = expr`.
    Assignment {
        var: String,
        expr: AstNode,
        input: Store,
        output: Store,
    },
    /// A declared assertion, checked after the fixpoint converges.
    Postcondition {
        op: LogicOp,
        lhs: AstNode,
        rhs: AstNode,
        store: Store,
    },
    /// Head of an `if`/`else`: splits the incoming store by the condition
    /// and its complement.
    IfElseHead {
        id: usize,
        cond: Condition,
        has_else: bool,
        before: Store,
        if_body: Store,
        else_body: Store,
    },
    /// Join point after an `if`/`else`.
    EndIf {
        id: usize,
        before: Store,
        after_if: Store,
        after_else: Store,
        after: Store,
    },
    /// Head of a `while`: joins the loop feedback into the incoming store,
    /// then splits by the condition and its complement.
    WhileHead {
        id: usize,
        cond: Condition,
        before: Store,
        body: Store,
        exit: Store,
    },
    /// Exit point after a `while`.
    EndWhile {
        id: usize,
        from_exit: Store,
        after: Store,
    },
}

/// One equation of the system: a program point plus its wiring metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub kind: LocationKind,
    pub entry: Entry,
    /// Set when this location is the last of a then-body; carries the
    /// if-construct it terminates.
    pub ends_if_body: Option<usize>,
    pub ends_else_body: Option<usize>,
    pub ends_while_body: Option<usize>,
}

impl Location {
    pub fn new(kind: LocationKind, entry: Entry) -> Self {
        Self {
            kind,
            entry,
            ends_if_body: None,
            ends_else_body: None,
            ends_while_body: None,
        }
    }

    /// Executes this location's transfer function on the routed predecessor
    /// store.
    pub fn apply(&mut self, pred: Store, ctx: &mut Context<'_>) {
        match &mut self.kind {
            LocationKind::Assignment {
                var,
                expr,
                input,
                output,
            } => {
                *input = pred;
                let value = eval(expr, input, ctx.diag);
                let mut out = input.clone();
                out.set(var.clone(), value);
                *output = out;
            }
            LocationKind::Postcondition { store, .. } => {
                // No effect on the store during fixpoint iteration; the
                // assertion itself is evaluated by `verify` once stable.
                *store = pred;
            }
            LocationKind::IfElseHead {
                id,
                cond,
                has_else,
                before,
                if_body,
                else_body,
            } => {
                *before = pred;
                let bound = eval(&cond.rhs, before, ctx.diag);

                let then_store = refine(before, &cond.var, cond.op, &bound);
                if then_store.get(&cond.var).is_empty() {
                    ctx.diag.empty_branch(&cond.var, Branch::Then);
                }
                ctx.wiring.push_if_body(*id, then_store.clone());

                let else_store = refine(before, &cond.var, cond.op.complement(), &bound);
                if else_store.get(&cond.var).is_empty() {
                    ctx.diag.empty_branch(&cond.var, Branch::Else);
                }
                if *has_else {
                    ctx.wiring.push_else_body(*id, else_store.clone());
                } else {
                    // No else body: the complement-restricted store is the
                    // join input the end location would otherwise get from
                    // an else tail.
                    ctx.wiring.push_final_else(*id, else_store.clone());
                }

                *if_body = then_store;
                *else_body = else_store;
            }
            LocationKind::EndIf {
                id,
                before,
                after_if,
                after_else,
                after,
            } => {
                *before = pred;
                *after_if = ctx
                    .wiring
                    .pop_final_if(*id)
                    .expect("then tail must queue its store before the matching end");
                *after_else = ctx
                    .wiring
                    .pop_final_else(*id)
                    .expect("else tail or head must queue its store before the matching end");
                let mut joined = after_if.clone();
                joined.join_all(after_else);
                *after = joined;
            }
            LocationKind::WhileHead {
                id,
                cond,
                before,
                body,
                exit,
            } => {
                *before = pred;
                let mut joined = before.clone();
                match ctx.wiring.pop_while_feedback(*id) {
                    Some(feedback) => joined.join_all(&feedback),
                    // First pass: the body has not produced a tail store yet.
                    None => log::debug!("while #{id}: no feedback store yet"),
                }
                let bound = eval(&cond.rhs, &joined, ctx.diag);

                let base = if ctx.widen {
                    let mut widened = body.clone();
                    widened.widen_all(&joined);
                    widened
                } else {
                    joined.clone()
                };
                let body_store = refine(&base, &cond.var, cond.op, &bound);
                if body_store.get(&cond.var).is_empty() {
                    ctx.diag.empty_branch(&cond.var, Branch::LoopBody);
                }
                ctx.wiring.push_while_body(*id, body_store.clone());

                // The exit derives from the unwidened join: widening only
                // accelerates the body and must not blur the exit bound.
                let exit_store = refine(&joined, &cond.var, cond.op.complement(), &bound);
                ctx.wiring.push_while_exit(*id, exit_store.clone());

                *body = body_store;
                *exit = exit_store;
            }
            LocationKind::EndWhile {
                id,
                from_exit,
                after,
            } => {
                let _ = pred;
                *from_exit = ctx
                    .wiring
                    .pop_while_exit(*id)
                    .expect("loop head must queue its exit store before the matching end");
                *after = from_exit.clone();
            }
        }
    }

    /// Evaluates the assertion of a postcondition location against its
    /// converged store; other variants are untouched.
    pub fn verify(&self, diag: &mut Diagnostics) {
        if let LocationKind::Postcondition {
            op,
            lhs,
            rhs,
            store,
        } = &self.kind
        {
            let left = eval(lhs, store, diag);
            let right = eval(rhs, store, diag);
            let satisfied = comparison_holds(*op, &left, &right);
            diag.verdict(format!("{lhs} {op} {rhs}"), satisfied);
        }
    }

    /// The store the next location in program order reads, when linear
    /// adjacency applies. Heads route their stores through [`Wiring`]
    /// instead.
    pub fn output(&self) -> Option<&Store> {
        match &self.kind {
            LocationKind::Assignment { output, .. } => Some(output),
            LocationKind::Postcondition { store, .. } => Some(store),
            LocationKind::EndIf { after, .. } => Some(after),
            LocationKind::EndWhile { after, .. } => Some(after),
            LocationKind::IfElseHead { .. } | LocationKind::WhileHead { .. } => None,
        }
    }

    /// Compares this location against its state from the previous iteration.
    pub fn is_stable(&self, old: &Location) -> bool {
        match (&self.kind, &old.kind) {
            (
                LocationKind::Assignment { output, .. },
                LocationKind::Assignment {
                    output: old_output, ..
                },
            ) => output == old_output,
            (LocationKind::Postcondition { .. }, LocationKind::Postcondition { .. }) => true,
            (
                LocationKind::IfElseHead {
                    if_body, else_body, ..
                },
                LocationKind::IfElseHead {
                    if_body: old_if,
                    else_body: old_else,
                    ..
                },
            ) => if_body == old_if && else_body == old_else,
            (
                LocationKind::EndIf {
                    after_if,
                    after_else,
                    ..
                },
                LocationKind::EndIf {
                    after_if: old_if,
                    after_else: old_else,
                    ..
                },
            ) => after_if == old_if && after_else == old_else,
            (
                LocationKind::WhileHead { body, exit, .. },
                LocationKind::WhileHead {
                    body: old_body,
                    exit: old_exit,
                    ..
                },
            ) => body == old_body && exit == old_exit,
            (
                LocationKind::EndWhile { after, .. },
                LocationKind::EndWhile {
                    after: old_after, ..
                },
            ) => after == old_after,
            _ => false,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            LocationKind::Assignment {
                var,
                expr,
                input,
                output,
            } => {
                writeln!(f, "assignment {var} = {expr}")?;
                writeln!(f, "  in:  {input}")?;
                write!(f, "  out: {output}")
            }
            LocationKind::Postcondition {
                op,
                lhs,
                rhs,
                store,
            } => {
                writeln!(f, "postcondition {lhs} {op} {rhs}")?;
                write!(f, "  at:  {store}")
            }
            LocationKind::IfElseHead {
                cond,
                before,
                if_body,
                else_body,
                ..
            } => {
                writeln!(f, "if ({cond})")?;
                writeln!(f, "  before: {before}")?;
                writeln!(f, "  then:   {if_body}")?;
                write!(f, "  else:   {else_body}")
            }
            LocationKind::EndIf {
                after_if,
                after_else,
                after,
                ..
            } => {
                writeln!(f, "end if")?;
                writeln!(f, "  then: {after_if}")?;
                writeln!(f, "  else: {after_else}")?;
                write!(f, "  join: {after}")
            }
            LocationKind::WhileHead {
                cond,
                before,
                body,
                exit,
                ..
            } => {
                writeln!(f, "while ({cond})")?;
                writeln!(f, "  before: {before}")?;
                writeln!(f, "  body:   {body}")?;
                write!(f, "  exit:   {exit}")
            }
            LocationKind::EndWhile { after, .. } => {
                writeln!(f, "end while")?;
                write!(f, "  after: {after}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ArithOp;
    use crate::interval::Interval;

    fn ctx<'a>(wiring: &'a mut Wiring, diag: &'a mut Diagnostics) -> Context<'a> {
        Context {
            wiring,
            diag,
            widen: false,
        }
    }

    #[test]
    fn assignment_transfer_writes_the_evaluated_interval() {
        let mut wiring = Wiring::new(0, 0);
        let mut diag = Diagnostics::new();
        let mut loc = Location::new(
            LocationKind::Assignment {
                var: "x".to_string(),
                expr: AstNode::arith(ArithOp::Add, AstNode::variable("x"), AstNode::integer(4)),
                input: Store::new(),
                output: Store::new(),
            },
            Entry::Previous,
        );

        let mut pred = Store::new();
        pred.set("x", Interval::singleton(3));
        loc.apply(pred, &mut ctx(&mut wiring, &mut diag));

        assert_eq!(loc.output().unwrap().get("x"), Interval::singleton(7));
    }

    #[test]
    fn if_head_splits_and_queues_both_branches() {
        let mut wiring = Wiring::new(1, 0);
        let mut diag = Diagnostics::new();
        let mut loc = Location::new(
            LocationKind::IfElseHead {
                id: 0,
                cond: Condition {
                    var: "x".to_string(),
                    op: LogicOp::Eq,
                    rhs: AstNode::integer(5),
                },
                has_else: true,
                before: Store::new(),
                if_body: Store::new(),
                else_body: Store::new(),
            },
            Entry::Previous,
        );

        let mut pred = Store::new();
        pred.set("x", Interval::new(0, 10));
        loc.apply(pred, &mut ctx(&mut wiring, &mut diag));

        let then_store = wiring.pop_if_body(0).unwrap();
        assert_eq!(then_store.get("x"), Interval::singleton(5));
        let else_store = wiring.pop_else_body(0).unwrap();
        assert_eq!(else_store.get("x"), Interval::new(0, 10));
        assert!(wiring.pop_final_else(0).is_none());
    }

    #[test]
    fn if_head_without_else_queues_the_complement_as_final() {
        let mut wiring = Wiring::new(1, 0);
        let mut diag = Diagnostics::new();
        let mut loc = Location::new(
            LocationKind::IfElseHead {
                id: 0,
                cond: Condition {
                    var: "x".to_string(),
                    op: LogicOp::Le,
                    rhs: AstNode::integer(5),
                },
                has_else: false,
                before: Store::new(),
                if_body: Store::new(),
                else_body: Store::new(),
            },
            Entry::Previous,
        );

        let mut pred = Store::new();
        pred.set("x", Interval::new(0, 10));
        loc.apply(pred, &mut ctx(&mut wiring, &mut diag));

        assert_eq!(
            wiring.pop_final_else(0).unwrap().get("x"),
            Interval::new(6, 10)
        );
        assert!(wiring.pop_else_body(0).is_none());
    }

    #[test]
    fn while_head_joins_feedback_before_restricting() {
        let mut wiring = Wiring::new(0, 1);
        let mut diag = Diagnostics::new();
        let mut loc = Location::new(
            LocationKind::WhileHead {
                id: 0,
                cond: Condition {
                    var: "i".to_string(),
                    op: LogicOp::Lt,
                    rhs: AstNode::integer(10),
                },
                before: Store::new(),
                body: Store::new(),
                exit: Store::new(),
            },
            Entry::Previous,
        );

        let mut feedback = Store::new();
        feedback.set("i", Interval::new(1, 10));
        wiring.push_while_feedback(0, feedback);

        let mut pred = Store::new();
        pred.set("i", Interval::singleton(0));
        loc.apply(pred, &mut ctx(&mut wiring, &mut diag));

        assert_eq!(wiring.pop_while_body(0).unwrap().get("i"), Interval::new(0, 9));
        assert_eq!(
            wiring.pop_while_exit(0).unwrap().get("i"),
            Interval::singleton(10)
        );
    }

    #[test]
    fn postcondition_is_always_stable() {
        let loc = Location::new(
            LocationKind::Postcondition {
                op: LogicOp::Eq,
                lhs: AstNode::variable("x"),
                rhs: AstNode::integer(7),
                store: Store::new(),
            },
            Entry::Previous,
        );
        let mut changed = loc.clone();
        if let LocationKind::Postcondition { store, .. } = &mut changed.kind {
            store.set("x", Interval::singleton(7));
        }
        assert!(changed.is_stable(&loc));
    }

    #[test]
    fn verify_records_a_verdict() {
        let mut store = Store::new();
        store.set("x", Interval::singleton(7));
        let loc = Location::new(
            LocationKind::Postcondition {
                op: LogicOp::Eq,
                lhs: AstNode::variable("x"),
                rhs: AstNode::integer(7),
                store,
            },
            Entry::Previous,
        );
        let mut diag = Diagnostics::new();
        loc.verify(&mut diag);
        assert_eq!(diag.verdicts().len(), 1);
        assert!(diag.verdicts()[0].satisfied);
        assert_eq!(diag.verdicts()[0].condition, "x == 7");
    }
}
