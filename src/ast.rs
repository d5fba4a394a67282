//! Syntax tree consumed by the equation builder.
//!
//! The tree is deliberately schema-light: a node kind, an optional literal
//! payload, and ordered children. This is the contract with the parser
//! collaborator; the builder validates shapes and rejects anything it does
//! not understand with a typed error.
//!
//! Shape conventions:
//!
//! - the program root is a [`NodeKind::Sequence`] whose leading children are
//!   [`NodeKind::Declaration`] nodes, followed by one statement `Sequence`;
//! - the statement sequence's leading children are `PreCondition` nodes;
//! - `Assignment` has two children: variable, expression;
//! - `IfElse` has two or three children: condition, then-body, optional
//!   else-body;
//! - `WhileLoop` has two children: condition, body;
//! - `PreCondition` and `PostCondition` have one `LogicOp` child.

use std::fmt;

/// Kind tag of a syntax tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Declaration,
    Sequence,
    PreCondition,
    PostCondition,
    Assignment,
    IfElse,
    WhileLoop,
    Variable,
    Integer,
    ArithOp,
    LogicOp,
}

/// Binary arithmetic operator tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArithOp::Add => write!(f, "+"),
            ArithOp::Sub => write!(f, "-"),
            ArithOp::Mul => write!(f, "*"),
            ArithOp::Div => write!(f, "/"),
        }
    }
}

/// Comparison operator tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicOp {
    Le,
    Lt,
    Ge,
    Gt,
    Eq,
    Neq,
}

impl LogicOp {
    /// The operator describing the states that fail `self`:
    /// `≤ ↔ >`, `≥ ↔ <`, `= ↔ ≠`.
    pub fn complement(self) -> LogicOp {
        match self {
            LogicOp::Le => LogicOp::Gt,
            LogicOp::Gt => LogicOp::Le,
            LogicOp::Ge => LogicOp::Lt,
            LogicOp::Lt => LogicOp::Ge,
            LogicOp::Eq => LogicOp::Neq,
            LogicOp::Neq => LogicOp::Eq,
        }
    }

    /// The operator obtained by swapping operands: `c ≤ x` is `x ≥ c`.
    pub fn flipped(self) -> LogicOp {
        match self {
            LogicOp::Le => LogicOp::Ge,
            LogicOp::Lt => LogicOp::Gt,
            LogicOp::Ge => LogicOp::Le,
            LogicOp::Gt => LogicOp::Lt,
            LogicOp::Eq => LogicOp::Eq,
            LogicOp::Neq => LogicOp::Neq,
        }
    }
}

impl fmt::Display for LogicOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicOp::Le => write!(f, "<="),
            LogicOp::Lt => write!(f, "<"),
            LogicOp::Ge => write!(f, ">="),
            LogicOp::Gt => write!(f, ">"),
            LogicOp::Eq => write!(f, "=="),
            LogicOp::Neq => write!(f, "!="),
        }
    }
}

/// Optional literal payload of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeValue {
    None,
    Int(i64),
    Name(String),
    Arith(ArithOp),
    Logic(LogicOp),
}

/// One node of the syntax tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AstNode {
    pub kind: NodeKind,
    pub value: NodeValue,
    pub children: Vec<AstNode>,
}

impl AstNode {
    pub fn new(kind: NodeKind, value: NodeValue, children: Vec<AstNode>) -> Self {
        Self {
            kind,
            value,
            children,
        }
    }

    pub fn sequence(children: Vec<AstNode>) -> Self {
        Self::new(NodeKind::Sequence, NodeValue::None, children)
    }

    pub fn declaration(variables: Vec<AstNode>) -> Self {
        Self::new(NodeKind::Declaration, NodeValue::None, variables)
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Self::new(NodeKind::Variable, NodeValue::Name(name.into()), Vec::new())
    }

    pub fn integer(value: i64) -> Self {
        Self::new(NodeKind::Integer, NodeValue::Int(value), Vec::new())
    }

    pub fn arith(op: ArithOp, lhs: AstNode, rhs: AstNode) -> Self {
        Self::new(NodeKind::ArithOp, NodeValue::Arith(op), vec![lhs, rhs])
    }

    pub fn logic(op: LogicOp, lhs: AstNode, rhs: AstNode) -> Self {
        Self::new(NodeKind::LogicOp, NodeValue::Logic(op), vec![lhs, rhs])
    }

    pub fn assignment(var: AstNode, expr: AstNode) -> Self {
        Self::new(NodeKind::Assignment, NodeValue::None, vec![var, expr])
    }

    pub fn precondition(comparison: AstNode) -> Self {
        Self::new(NodeKind::PreCondition, NodeValue::None, vec![comparison])
    }

    pub fn postcondition(comparison: AstNode) -> Self {
        Self::new(NodeKind::PostCondition, NodeValue::None, vec![comparison])
    }

    pub fn if_else(condition: AstNode, then_body: AstNode, else_body: Option<AstNode>) -> Self {
        let mut children = vec![condition, then_body];
        if let Some(body) = else_body {
            children.push(body);
        }
        Self::new(NodeKind::IfElse, NodeValue::None, children)
    }

    pub fn while_loop(condition: AstNode, body: AstNode) -> Self {
        Self::new(NodeKind::WhileLoop, NodeValue::None, vec![condition, body])
    }

    pub fn as_name(&self) -> Option<&str> {
        match &self.value {
            NodeValue::Name(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self.value {
            NodeValue::Int(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_arith(&self) -> Option<ArithOp> {
        match self.value {
            NodeValue::Arith(op) => Some(op),
            _ => None,
        }
    }

    pub fn as_logic(&self) -> Option<LogicOp> {
        match self.value {
            NodeValue::Logic(op) => Some(op),
            _ => None,
        }
    }
}

impl fmt::Display for AstNode {
    /// Renders expression and comparison nodes back to source form; other
    /// kinds fall back to their kind name. Used for diagnostics.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            NodeKind::Integer => match self.as_int() {
                Some(n) => write!(f, "{n}"),
                None => write!(f, "<integer>"),
            },
            NodeKind::Variable => match self.as_name() {
                Some(name) => write!(f, "{name}"),
                None => write!(f, "<variable>"),
            },
            NodeKind::ArithOp => match (self.as_arith(), self.children.as_slice()) {
                (Some(op), [lhs, rhs]) => write!(f, "({lhs} {op} {rhs})"),
                _ => write!(f, "<arith>"),
            },
            NodeKind::LogicOp => match (self.as_logic(), self.children.as_slice()) {
                (Some(op), [lhs, rhs]) => write!(f, "{lhs} {op} {rhs}"),
                _ => write!(f, "<comparison>"),
            },
            kind => write!(f, "<{kind:?}>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complement_is_involutive() {
        for op in [
            LogicOp::Le,
            LogicOp::Lt,
            LogicOp::Ge,
            LogicOp::Gt,
            LogicOp::Eq,
            LogicOp::Neq,
        ] {
            assert_eq!(op.complement().complement(), op);
            assert_eq!(op.flipped().flipped(), op);
        }
        assert_eq!(LogicOp::Le.complement(), LogicOp::Gt);
        assert_eq!(LogicOp::Ge.complement(), LogicOp::Lt);
        assert_eq!(LogicOp::Eq.complement(), LogicOp::Neq);
        assert_eq!(LogicOp::Lt.flipped(), LogicOp::Gt);
    }

    #[test]
    fn expressions_render_back_to_source() {
        let expr = AstNode::arith(ArithOp::Add, AstNode::variable("x"), AstNode::integer(4));
        assert_eq!(expr.to_string(), "(x + 4)");
        let cmp = AstNode::logic(LogicOp::Eq, AstNode::variable("x"), AstNode::integer(7));
        assert_eq!(cmp.to_string(), "x == 7");
    }
}
