//! Postcondition verdicts over converged intervals.

use crate::ast::LogicOp;
use crate::interval::Interval;

/// Decides whether `left op right` holds for every pair of concrete values
/// drawn from the two intervals.
///
/// The ordering operators compare both bounds pointwise; equality demands
/// two equal non-empty singletons, and inequality is its negation. An empty
/// side means the assertion sits at an unreachable point, so it holds
/// vacuously.
pub fn comparison_holds(op: LogicOp, left: &Interval, right: &Interval) -> bool {
    let (Some((llb, lub)), Some((rlb, rub))) = (left.bounds(), right.bounds()) else {
        return true;
    };
    match op {
        LogicOp::Le => lub <= rub && llb <= rlb,
        LogicOp::Ge => llb >= rlb && lub >= rub,
        LogicOp::Lt => lub < rub && llb < rlb,
        LogicOp::Gt => llb > rlb && lub > rub,
        LogicOp::Eq => llb == lub && rlb == rub && llb == rlb,
        LogicOp::Neq => !(llb == lub && rlb == rub && llb == rlb),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_compares_both_bounds() {
        let narrow = Interval::new(0, 6);
        let wide = Interval::new(0, 10);
        assert!(comparison_holds(LogicOp::Le, &narrow, &wide));
        assert!(comparison_holds(LogicOp::Ge, &wide, &narrow));
        assert!(!comparison_holds(LogicOp::Le, &wide, &narrow));

        let low = Interval::new(-5, -1);
        let high = Interval::new(0, 3);
        assert!(comparison_holds(LogicOp::Lt, &low, &high));
        assert!(comparison_holds(LogicOp::Gt, &high, &low));
        assert!(!comparison_holds(LogicOp::Lt, &low, &low));
    }

    #[test]
    fn equality_needs_equal_singletons() {
        let seven = Interval::singleton(7);
        assert!(comparison_holds(LogicOp::Eq, &seven, &seven));
        assert!(!comparison_holds(
            LogicOp::Eq,
            &seven,
            &Interval::singleton(8)
        ));
        assert!(!comparison_holds(LogicOp::Eq, &seven, &Interval::new(6, 8)));
        assert!(comparison_holds(LogicOp::Neq, &seven, &Interval::new(6, 8)));
        assert!(!comparison_holds(LogicOp::Neq, &seven, &seven));
    }

    #[test]
    fn empty_side_holds_vacuously() {
        let seven = Interval::singleton(7);
        for op in [
            LogicOp::Le,
            LogicOp::Lt,
            LogicOp::Ge,
            LogicOp::Gt,
            LogicOp::Eq,
            LogicOp::Neq,
        ] {
            assert!(comparison_holds(op, &Interval::EMPTY, &seven));
            assert!(comparison_holds(op, &seven, &Interval::EMPTY));
        }
    }
}
