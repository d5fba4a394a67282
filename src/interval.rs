//! Bounded integer intervals: the abstract domain of the analysis.
//!
//! Each value is a closed interval `[lb, ub]` over `i64`, or the empty
//! interval. The intervals form a lattice:
//!
//! - **Order**: `[l₁, h₁] ⊑ [l₂, h₂]` iff `l₂ ≤ l₁` and `h₁ ≤ h₂` (containment)
//! - **Join** (`⊔`): `[min(l₁, l₂), max(h₁, h₂)]` (convex hull)
//! - **Meet** (`⊓`): `[max(l₁, l₂), min(h₁, h₂)]` (intersection)
//! - **Bottom** (`⊥`): the empty interval
//! - **Top** (`⊤`): `[i64::MIN, i64::MAX]`
//!
//! Arithmetic is sound over-approximation: the result interval covers every
//! sum/difference/product/quotient of concrete values drawn from the
//! operands. A bound computation that leaves the `i64` range saturates the
//! whole result to ⊤ and reports an overflow warning, which keeps the result
//! sound without modelling wraparound.

use std::fmt;

use crate::diagnostics::Diagnostics;

/// A closed interval over `i64`, possibly empty.
///
/// The empty interval has a single canonical representation so that derived
/// structural equality coincides with lattice equality (two empty intervals
/// are equal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    empty: bool,
    lb: i64,
    ub: i64,
}

impl Interval {
    /// The empty interval, ⊥.
    pub const EMPTY: Self = Self {
        empty: true,
        lb: 0,
        ub: 0,
    };

    /// The full interval, ⊤.
    pub const TOP: Self = Self {
        empty: false,
        lb: i64::MIN,
        ub: i64::MAX,
    };

    /// Builds `[lb, ub]`; a crossed pair yields the empty interval.
    pub fn new(lb: i64, ub: i64) -> Self {
        if lb > ub {
            Self::EMPTY
        } else {
            Self {
                empty: false,
                lb,
                ub,
            }
        }
    }

    /// The interval `[value, value]`.
    pub fn singleton(value: i64) -> Self {
        Self::new(value, value)
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn is_top(&self) -> bool {
        *self == Self::TOP
    }

    pub fn is_singleton(&self) -> bool {
        !self.empty && self.lb == self.ub
    }

    /// Lower bound; meaningful only for non-empty intervals.
    pub fn lb(&self) -> i64 {
        self.lb
    }

    /// Upper bound; meaningful only for non-empty intervals.
    pub fn ub(&self) -> i64 {
        self.ub
    }

    /// Both bounds, or `None` for the empty interval.
    pub fn bounds(&self) -> Option<(i64, i64)> {
        if self.empty {
            None
        } else {
            Some((self.lb, self.ub))
        }
    }

    /// Least upper bound.
    pub fn join(&self, other: &Interval) -> Interval {
        if self.empty {
            return *other;
        }
        if other.empty {
            return *self;
        }
        Interval::new(self.lb.min(other.lb), self.ub.max(other.ub))
    }

    /// Greatest lower bound.
    pub fn meet(&self, other: &Interval) -> Interval {
        if self.empty || other.empty {
            return Interval::EMPTY;
        }
        Interval::new(self.lb.max(other.lb), self.ub.min(other.ub))
    }

    /// `self ⊒ other`: every value of `other` is covered by `self`.
    pub fn contains(&self, other: &Interval) -> bool {
        if other.empty {
            return true;
        }
        if self.empty {
            return false;
        }
        self.lb <= other.lb && self.ub >= other.ub
    }

    pub fn contains_value(&self, value: i64) -> bool {
        !self.empty && self.lb <= value && value <= self.ub
    }

    /// Widening: any bound that strictly grew in `newer` jumps to the
    /// corresponding `i64` extreme. Used by the solver to accelerate loop
    /// convergence; `self ⊑ self.widen(newer)` always holds.
    pub fn widen(&self, newer: &Interval) -> Interval {
        if self.empty {
            return *newer;
        }
        if newer.empty {
            return *self;
        }
        let lb = if newer.lb < self.lb { i64::MIN } else { self.lb };
        let ub = if newer.ub > self.ub { i64::MAX } else { self.ub };
        Interval::new(lb, ub)
    }

    /// Abstract addition.
    pub fn add(&self, other: &Interval, diag: &mut Diagnostics) -> Interval {
        if self.empty || other.empty {
            return Interval::EMPTY;
        }
        match (self.lb.checked_add(other.lb), self.ub.checked_add(other.ub)) {
            (Some(lb), Some(ub)) => Interval::new(lb, ub),
            _ => {
                diag.overflow("addition");
                Interval::TOP
            }
        }
    }

    /// Abstract subtraction.
    pub fn sub(&self, other: &Interval, diag: &mut Diagnostics) -> Interval {
        if self.empty || other.empty {
            return Interval::EMPTY;
        }
        match (self.lb.checked_sub(other.ub), self.ub.checked_sub(other.lb)) {
            (Some(lb), Some(ub)) => Interval::new(lb, ub),
            _ => {
                diag.overflow("subtraction");
                Interval::TOP
            }
        }
    }

    /// Abstract negation.
    pub fn neg(&self, diag: &mut Diagnostics) -> Interval {
        if self.empty {
            return Interval::EMPTY;
        }
        match (self.ub.checked_neg(), self.lb.checked_neg()) {
            (Some(lb), Some(ub)) => Interval::new(lb, ub),
            _ => {
                diag.overflow("negation");
                Interval::TOP
            }
        }
    }

    /// Abstract multiplication: the hull of the four corner products.
    pub fn mul(&self, other: &Interval, diag: &mut Diagnostics) -> Interval {
        if self.empty || other.empty {
            return Interval::EMPTY;
        }
        let corners = [
            self.lb.checked_mul(other.lb),
            self.lb.checked_mul(other.ub),
            self.ub.checked_mul(other.lb),
            self.ub.checked_mul(other.ub),
        ];
        let mut lb = i64::MAX;
        let mut ub = i64::MIN;
        for corner in corners {
            match corner {
                Some(c) => {
                    lb = lb.min(c);
                    ub = ub.max(c);
                }
                None => {
                    diag.overflow("multiplication");
                    return Interval::TOP;
                }
            }
        }
        Interval::new(lb, ub)
    }

    /// Abstract division. A divisor containing zero yields ⊤ with a
    /// division-by-zero warning; otherwise the hull of the four corner
    /// quotients (the only overflowing corner is `i64::MIN / -1`).
    pub fn div(&self, other: &Interval, diag: &mut Diagnostics) -> Interval {
        if self.empty || other.empty {
            return Interval::EMPTY;
        }
        if other.contains_value(0) {
            diag.division_by_zero();
            return Interval::TOP;
        }
        let corners = [
            self.lb.checked_div(other.lb),
            self.lb.checked_div(other.ub),
            self.ub.checked_div(other.lb),
            self.ub.checked_div(other.ub),
        ];
        let mut lb = i64::MAX;
        let mut ub = i64::MIN;
        for corner in corners {
            match corner {
                Some(c) => {
                    lb = lb.min(c);
                    ub = ub.max(c);
                }
                None => {
                    diag.overflow("division");
                    return Interval::TOP;
                }
            }
        }
        Interval::new(lb, ub)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.empty {
            write!(f, "⊥")
        } else {
            write!(f, "[{}, {}]", self.lb, self.ub)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crossed_bounds_are_empty() {
        assert!(Interval::new(1, 0).is_empty());
        assert_eq!(Interval::new(1, 0), Interval::new(5, -5));
    }

    #[test]
    fn lattice_identities() {
        let samples = [
            Interval::EMPTY,
            Interval::TOP,
            Interval::singleton(0),
            Interval::singleton(7),
            Interval::new(0, 10),
            Interval::new(-5, 5),
            Interval::new(i64::MIN, 0),
        ];
        for i in samples {
            assert_eq!(i.meet(&Interval::TOP), i, "meet with top must be identity");
            assert_eq!(i.join(&Interval::EMPTY), i, "join with bottom must be identity");
            assert_eq!(i.meet(&i), i, "meet must be idempotent");
            assert_eq!(i.join(&i), i, "join must be idempotent");
        }
        for a in samples {
            for b in samples {
                assert_eq!(a.join(&b), b.join(&a));
                assert_eq!(a.meet(&b), b.meet(&a));
                assert!(a.join(&b).contains(&a));
                assert!(a.contains(&a.meet(&b)));
            }
        }
    }

    #[test]
    fn join_and_meet() {
        let a = Interval::new(0, 10);
        let b = Interval::new(5, 15);
        assert_eq!(a.join(&b), Interval::new(0, 15));
        assert_eq!(a.meet(&b), Interval::new(5, 10));
        assert!(Interval::new(0, 4).meet(&Interval::new(5, 9)).is_empty());
    }

    #[test]
    fn arithmetic_on_empty_is_empty() {
        let mut diag = Diagnostics::new();
        let x = Interval::new(0, 10);
        assert!(Interval::EMPTY.add(&x, &mut diag).is_empty());
        assert!(x.sub(&Interval::EMPTY, &mut diag).is_empty());
        assert!(Interval::EMPTY.mul(&Interval::EMPTY, &mut diag).is_empty());
        assert!(x.div(&Interval::EMPTY, &mut diag).is_empty());
        assert!(Interval::EMPTY.neg(&mut diag).is_empty());
        assert!(diag.warnings().is_empty());
    }

    #[test]
    fn addition_and_subtraction() {
        let mut diag = Diagnostics::new();
        let a = Interval::new(1, 3);
        let b = Interval::new(10, 20);
        assert_eq!(a.add(&b, &mut diag), Interval::new(11, 23));
        assert_eq!(b.sub(&a, &mut diag), Interval::new(7, 19));
        assert_eq!(a.neg(&mut diag), Interval::new(-3, -1));
        assert!(diag.warnings().is_empty());
    }

    #[test]
    fn multiplication_corners() {
        let mut diag = Diagnostics::new();
        let a = Interval::new(-2, 3);
        let b = Interval::new(-5, 4);
        // corners: 10, -8, -15, 12
        assert_eq!(a.mul(&b, &mut diag), Interval::new(-15, 12));
        assert!(diag.warnings().is_empty());
    }

    #[test]
    fn division_avoiding_zero() {
        let mut diag = Diagnostics::new();
        let a = Interval::new(10, 10);
        let b = Interval::new(1, 10);
        assert_eq!(a.div(&b, &mut diag), Interval::new(1, 10));
        let c = Interval::new(-20, 20);
        let d = Interval::new(2, 4);
        assert_eq!(c.div(&d, &mut diag), Interval::new(-10, 10));
        assert!(diag.warnings().is_empty());
    }

    #[test]
    fn division_by_zero_straddling_divisor() {
        use crate::diagnostics::Warning;

        let mut diag = Diagnostics::new();
        let a = Interval::new(10, 10);
        assert_eq!(a.div(&Interval::singleton(0), &mut diag), Interval::TOP);
        assert_eq!(a.div(&Interval::new(-1, 1), &mut diag), Interval::TOP);
        assert_eq!(
            diag.warnings(),
            &[Warning::DivisionByZero, Warning::DivisionByZero]
        );
    }

    #[test]
    fn overflow_saturates_to_top() {
        use crate::diagnostics::Warning;

        let mut diag = Diagnostics::new();
        let big = Interval::new(i64::MAX - 1, i64::MAX);
        assert_eq!(big.add(&Interval::singleton(2), &mut diag), Interval::TOP);
        assert!(diag.has_warning(&Warning::Overflow {
            operation: "addition"
        }));

        let mut diag = Diagnostics::new();
        let low = Interval::new(i64::MIN, i64::MIN + 1);
        assert_eq!(low.sub(&Interval::singleton(2), &mut diag), Interval::TOP);
        assert!(diag.has_warning(&Warning::Overflow {
            operation: "subtraction"
        }));

        let mut diag = Diagnostics::new();
        assert_eq!(big.mul(&big, &mut diag), Interval::TOP);
        assert!(diag.has_warning(&Warning::Overflow {
            operation: "multiplication"
        }));

        let mut diag = Diagnostics::new();
        assert_eq!(
            Interval::singleton(i64::MIN).neg(&mut diag),
            Interval::TOP
        );
        assert!(diag.has_warning(&Warning::Overflow {
            operation: "negation"
        }));

        let mut diag = Diagnostics::new();
        assert_eq!(
            Interval::singleton(i64::MIN).div(&Interval::singleton(-1), &mut diag),
            Interval::TOP
        );
        assert!(diag.has_warning(&Warning::Overflow {
            operation: "division"
        }));
    }

    #[test]
    fn widening_jumps_grown_bounds() {
        let a = Interval::new(0, 1);
        let b = Interval::new(0, 2);
        assert_eq!(a.widen(&b), Interval::new(0, i64::MAX));
        let c = Interval::new(-1, 1);
        assert_eq!(a.widen(&c), Interval::new(i64::MIN, 1));
        assert_eq!(a.widen(&a), a);
        assert_eq!(Interval::EMPTY.widen(&a), a);
        for (old, new) in [(a, b), (a, c), (b, c)] {
            assert!(old.widen(&new).contains(&old));
        }
    }
}
