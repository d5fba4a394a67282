//! Abstract evaluation of expressions and condition refinement.

use crate::ast::{ArithOp, AstNode, LogicOp, NodeKind};
use crate::diagnostics::Diagnostics;
use crate::interval::Interval;
use crate::store::Store;

/// Evaluates an expression node to an interval under the given store.
///
/// The equation builder admits only `Integer`, `Variable` and binary
/// `ArithOp` nodes in expression position, so any other kind here is a
/// builder-invariant violation.
pub fn eval(expr: &AstNode, store: &Store, diag: &mut Diagnostics) -> Interval {
    match expr.kind {
        NodeKind::Integer => {
            let value = expr
                .as_int()
                .expect("integer node must carry an integer literal");
            Interval::singleton(value)
        }
        NodeKind::Variable => {
            let name = expr
                .as_name()
                .expect("variable node must carry a variable name");
            store.get(name)
        }
        NodeKind::ArithOp => {
            let op = expr
                .as_arith()
                .expect("arithmetic node must carry an operator tag");
            let [lhs, rhs] = expr.children.as_slice() else {
                panic!("arithmetic node must have exactly two children");
            };
            let left = eval(lhs, store, diag);
            let right = eval(rhs, store, diag);
            match op {
                ArithOp::Add => left.add(&right, diag),
                ArithOp::Sub => left.sub(&right, diag),
                ArithOp::Mul => left.mul(&right, diag),
                ArithOp::Div => left.div(&right, diag),
            }
        }
        kind => panic!("{kind:?} node reached expression evaluation; the builder admits only integers, variables and arithmetic"),
    }
}

/// Refines `store[var]` under the assumption `var op bound`.
///
/// The bound comes from evaluating the constant right side of a condition.
/// Each operator meets the current interval with the corresponding
/// half-line; `!=` subtracts the bound interval instead, which can only
/// trim a side actually covered by it.
pub fn refine(store: &Store, var: &str, op: LogicOp, bound: &Interval) -> Store {
    let current = store.get(var);
    let refined = refine_interval(&current, op, bound);
    let mut restricted = store.clone();
    restricted.set(var, refined);
    restricted
}

fn refine_interval(current: &Interval, op: LogicOp, bound: &Interval) -> Interval {
    if current.is_empty() || bound.is_empty() {
        return Interval::EMPTY;
    }
    match op {
        LogicOp::Le => current.meet(&Interval::new(i64::MIN, bound.ub())),
        LogicOp::Lt => match bound.ub().checked_sub(1) {
            Some(ub) => current.meet(&Interval::new(i64::MIN, ub)),
            // nothing is strictly below i64::MIN
            None => Interval::EMPTY,
        },
        LogicOp::Ge => current.meet(&Interval::new(bound.lb(), i64::MAX)),
        LogicOp::Gt => match bound.lb().checked_add(1) {
            Some(lb) => current.meet(&Interval::new(lb, i64::MAX)),
            None => Interval::EMPTY,
        },
        LogicOp::Eq => current.meet(bound),
        LogicOp::Neq => subtract(current, bound),
    }
}

/// Interval subtraction restricted to results expressible as one interval.
fn subtract(current: &Interval, removed: &Interval) -> Interval {
    let Some((clb, cub)) = current.bounds() else {
        return Interval::EMPTY;
    };
    let Some((rlb, rub)) = removed.bounds() else {
        return *current;
    };
    if rub < clb || rlb > cub {
        // disjoint: nothing to remove
        *current
    } else if rlb <= clb && rub >= cub {
        Interval::EMPTY
    } else if rlb <= clb {
        // rub < cub here, so the increment cannot overflow
        Interval::new(rub + 1, cub)
    } else if rub >= cub {
        Interval::new(clb, rlb - 1)
    } else {
        // strictly inside: a single interval cannot express the hole
        *current
    }
}
