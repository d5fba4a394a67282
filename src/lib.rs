//! # Interval Analyzer
//!
//! An equational abstract interpreter over the interval domain for a small
//! imperative language with integer variables, assignments, `if`/`else`,
//! `while` loops and pre/postcondition annotations.
//!
//! Instead of executing the program with concrete values, the analyzer runs
//! it over intervals: every variable is tracked as a closed range
//! `[lb, ub]` of the values it may hold. The result is a sound
//! over-approximation of all executions at once — if the converged interval
//! of `x` at some point is `[0, 6]`, no concrete run can reach that point
//! with `x = 7`.
//!
//! ## Pipeline
//!
//! 1. **Parse** ([`parser`]): source text → syntax tree ([`ast`]).
//! 2. **Build** ([`builder`]): the tree is lowered into an ordered list of
//!    [`Location`]s — one per program point — plus the store wiring that
//!    connects branch heads, body tails and join points.
//! 3. **Solve** ([`solver`]): the locations are iterated in program order
//!    until every store stops changing. Loops feed the store of their body
//!    tail back into the loop head on the next iteration; the bounded
//!    integer lattice makes plain iteration terminate, and widening can be
//!    switched on to converge faster.
//! 4. **Check** ([`check`]): the declared postconditions are evaluated
//!    against the converged stores and reported as satisfied or not.
//!
//! Overflow, division by an interval containing zero, and branches made
//! unreachable by the abstraction are reported as warnings; none of them
//! stop the analysis.
//!
//! ## Example
//!
//! ```rust
//! use interval_analyzer::{analyze, Interval};
//!
//! let report = analyze(
//!     "int x;
//!      precondition x >= 0;
//!      precondition x <= 10;
//!      if (x == 5) { x = x + 1; } else { x = 0; }
//!      postcondition x <= 10;",
//! )
//! .unwrap();
//!
//! assert!(report.all_satisfied());
//! let last = report.locations.last().unwrap();
//! assert_eq!(last.output().unwrap().get("x"), Interval::new(0, 6));
//! ```

pub mod ast;
pub mod builder;
pub mod check;
pub mod diagnostics;
pub mod error;
pub mod eval;
pub mod interval;
pub mod location;
pub mod parser;
pub mod solver;
pub mod store;

pub use ast::{ArithOp, AstNode, LogicOp, NodeKind, NodeValue};
pub use builder::{build, EquationSystem};
pub use diagnostics::{Branch, Diagnostics, Verdict, Warning};
pub use error::{AnalysisError, BuildError, ParseError, SolveError};
pub use interval::Interval;
pub use location::{Condition, Entry, Location, LocationKind, Wiring};
pub use parser::parse;
pub use solver::{Report, Solver};
pub use store::Store;

/// Parses, builds and solves a program with the default solver.
pub fn analyze(source: &str) -> Result<Report, AnalysisError> {
    let ast = parser::parse(source)?;
    let system = builder::build(&ast)?;
    let report = Solver::default().solve(system)?;
    Ok(report)
}
