//! Fixpoint iteration over the equation system.
//!
//! Each iteration snapshots all locations, walks them in program order
//! routing predecessor stores per the wiring, and stops once every location
//! reports itself stable against the snapshot. Within one pass a location
//! consumes the freshly computed output of its predecessor, which converges
//! at the same fixpoint as re-reading the snapshot but usually in fewer
//! passes. The `i64` interval lattice over a fixed variable set is finite,
//! so iteration terminates even without widening; the iteration cap is a
//! safety valve, and widening an opt-in accelerator.

use crate::builder::EquationSystem;
use crate::diagnostics::{Diagnostics, Verdict, Warning};
use crate::error::SolveError;
use crate::location::{Context, Entry, Location, Wiring};
use crate::store::Store;

/// Fixpoint solver configuration.
#[derive(Debug, Clone)]
pub struct Solver {
    /// Abort with [`SolveError::IterationLimit`] beyond this many passes.
    pub max_iterations: usize,
    /// Apply widening at loop heads from this iteration on; `None` iterates
    /// plainly.
    pub widening_delay: Option<usize>,
}

impl Default for Solver {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            widening_delay: None,
        }
    }
}

/// Outcome of a converged analysis.
#[derive(Debug, Clone)]
pub struct Report {
    /// The converged locations, in program order.
    pub locations: Vec<Location>,
    pub diagnostics: Diagnostics,
    /// Number of passes until stability.
    pub iterations: usize,
}

impl Report {
    pub fn verdicts(&self) -> &[Verdict] {
        self.diagnostics.verdicts()
    }

    pub fn warnings(&self) -> &[Warning] {
        self.diagnostics.warnings()
    }

    pub fn all_satisfied(&self) -> bool {
        self.verdicts().iter().all(|v| v.satisfied)
    }
}

impl Solver {
    /// Runs the system to a fixpoint, then verifies the postconditions.
    pub fn solve(&self, system: EquationSystem) -> Result<Report, SolveError> {
        let EquationSystem {
            mut locations,
            precondition,
            if_count,
            while_count,
            diagnostics: build_diag,
            ..
        } = system;

        let mut wiring = Wiring::new(if_count, while_count);
        let mut diag = Diagnostics::new();
        let mut iterations = 0usize;
        loop {
            if iterations == self.max_iterations {
                return Err(SolveError::IterationLimit(self.max_iterations));
            }
            let snapshot = locations.clone();
            // The warnings that describe the converged system are those of
            // the final pass.
            diag.clear_warnings();
            let widen = self
                .widening_delay
                .is_some_and(|delay| iterations >= delay.max(1));
            pass(&mut locations, &precondition, &mut wiring, &mut diag, widen);
            iterations += 1;

            let stable = locations
                .iter()
                .zip(&snapshot)
                .all(|(new, old)| new.is_stable(old));
            log::debug!(
                "iteration {iterations}: {}",
                if stable { "stable" } else { "not stable" }
            );
            if stable {
                break;
            }
        }

        for location in &locations {
            location.verify(&mut diag);
        }
        diag.prepend(&build_diag);

        Ok(Report {
            locations,
            diagnostics: diag,
            iterations,
        })
    }
}

/// One pass over all locations in program order.
fn pass(
    locations: &mut [Location],
    precondition: &Store,
    wiring: &mut Wiring,
    diag: &mut Diagnostics,
    widen: bool,
) {
    let mut last_output = precondition.clone();
    for location in locations.iter_mut() {
        let pred = match location.entry {
            Entry::Previous => last_output.clone(),
            Entry::IfBody(id) => wiring
                .pop_if_body(id)
                .expect("head must queue the then store before its body runs"),
            Entry::ElseBody(id) => wiring
                .pop_else_body(id)
                .expect("head must queue the else store before its body runs"),
            Entry::WhileBody(id) => wiring
                .pop_while_body(id)
                .expect("head must queue the body store before its body runs"),
        };

        let mut ctx = Context {
            wiring: &mut *wiring,
            diag: &mut *diag,
            widen,
        };
        location.apply(pred, &mut ctx);

        if let Some(output) = location.output() {
            last_output = output.clone();
        }
        if let Some(id) = location.ends_if_body {
            wiring.push_final_if(id, last_output.clone());
        }
        if let Some(id) = location.ends_else_body {
            wiring.push_final_else(id, last_output.clone());
        }
        if let Some(id) = location.ends_while_body {
            wiring.push_while_feedback(id, last_output.clone());
        }
    }
}
