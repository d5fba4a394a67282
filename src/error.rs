//! Typed errors for the parse, build and solve phases.

use thiserror::Error;

use crate::ast::NodeKind;

/// A syntax error in the analyzed program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parse error at {line}:{column}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

/// An unsupported or malformed construct found while lowering the syntax
/// tree into the equation system. All of these are fatal at build time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("program must start with a declaration block")]
    MissingDeclarations,

    #[error("{kind:?} node is not a supported statement")]
    UnsupportedStatement { kind: NodeKind },

    #[error("{kind:?} node is not a supported expression")]
    UnsupportedExpression { kind: NodeKind },

    #[error("malformed {kind:?} node: {reason}")]
    MalformedNode { kind: NodeKind, reason: &'static str },

    #[error("undeclared variable `{0}`")]
    UndeclaredVariable(String),

    #[error("condition left side must be a variable")]
    ConditionLhsNotVariable,

    #[error("condition right side must be a constant expression, found variable `{0}`")]
    ConditionRhsNotConstant(String),

    #[error("precondition must relate a variable and a constant expression")]
    MalformedPrecondition,

    #[error("precondition is only allowed before the first statement")]
    MisplacedPrecondition,

    #[error("{0} body has no statements")]
    EmptyBody(&'static str),
}

/// Failure of the fixpoint iteration itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolveError {
    #[error("fixpoint not reached within {0} iterations")]
    IterationLimit(usize),
}

/// Any failure of the whole analysis pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Solve(#[from] SolveError),
}
