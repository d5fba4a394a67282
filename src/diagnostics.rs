//! Analysis diagnostics: warnings and postcondition verdicts.
//!
//! Warnings never stop the analysis. They are collected here and mirrored to
//! the [`log`] facade, so library users can inspect them programmatically
//! while the CLI still gets live output.

use std::fmt;

/// Which restricted branch of a compound statement turned out empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Branch {
    Then,
    Else,
    LoopBody,
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Branch::Then => write!(f, "then branch"),
            Branch::Else => write!(f, "else branch"),
            Branch::LoopBody => write!(f, "loop body"),
        }
    }
}

/// A non-fatal condition encountered during abstract evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Warning {
    /// An arithmetic bound computation left the host integer range; the
    /// result was saturated to the full interval.
    Overflow { operation: &'static str },
    /// Division by an interval containing zero; the result is the full
    /// interval.
    DivisionByZero,
    /// Condition refinement left a branch with an empty interval for `var`:
    /// the branch is unreachable under the abstraction.
    EmptyBranch { var: String, branch: Branch },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::Overflow { operation } => {
                write!(f, "overflow while evaluating {operation}, result widened to top")
            }
            Warning::DivisionByZero => {
                write!(f, "division by an interval containing zero, result widened to top")
            }
            Warning::EmptyBranch { var, branch } => {
                write!(f, "{branch} is unreachable: `{var}` has an empty interval")
            }
        }
    }
}

/// Outcome of a single postcondition, recorded during the verification phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Rendered source of the checked comparison, e.g. `x == 7`.
    pub condition: String,
    pub satisfied: bool,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.satisfied {
            write!(f, "postcondition {} satisfied", self.condition)
        } else {
            write!(f, "postcondition {} not satisfied", self.condition)
        }
    }
}

/// Collector for warnings and verdicts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
    verdicts: Vec<Verdict>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn overflow(&mut self, operation: &'static str) {
        log::warn!("overflow while evaluating {operation}, result widened to top");
        self.warnings.push(Warning::Overflow { operation });
    }

    pub fn division_by_zero(&mut self) {
        log::warn!("division by an interval containing zero, result widened to top");
        self.warnings.push(Warning::DivisionByZero);
    }

    pub fn empty_branch(&mut self, var: &str, branch: Branch) {
        log::warn!("{branch} is unreachable: `{var}` has an empty interval");
        self.warnings.push(Warning::EmptyBranch {
            var: var.to_string(),
            branch,
        });
    }

    pub fn verdict(&mut self, condition: String, satisfied: bool) {
        if satisfied {
            log::info!("postcondition {condition} satisfied");
        } else {
            log::warn!("postcondition {condition} not satisfied");
        }
        self.verdicts.push(Verdict {
            condition,
            satisfied,
        });
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn verdicts(&self) -> &[Verdict] {
        &self.verdicts
    }

    /// Drop accumulated warnings, keeping verdicts.
    ///
    /// The solver re-evaluates every location each iteration; the warnings
    /// that describe the converged system are those of the last pass, so each
    /// pass starts from a clean slate.
    pub fn clear_warnings(&mut self) {
        self.warnings.clear();
    }

    /// Prepend warnings from an earlier phase (e.g. equation building).
    pub fn prepend(&mut self, earlier: &Diagnostics) {
        let mut warnings = earlier.warnings.clone();
        warnings.append(&mut self.warnings);
        self.warnings = warnings;
    }

    pub fn has_warning(&self, warning: &Warning) -> bool {
        self.warnings.contains(warning)
    }
}
