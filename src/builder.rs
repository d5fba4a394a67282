//! Lowering of the syntax tree into the equation system.
//!
//! The builder walks the statement list once, emitting one [`Location`] per
//! program point in syntactic order and recording how each location's
//! predecessor store is routed. Compound statements get a fresh construct
//! id; their head, body tails and end location all reference that id in the
//! wiring queues.
//!
//! Everything the transfer functions assume about node shapes is validated
//! here, so malformed or unsupported trees surface as typed [`BuildError`]s
//! before any fixpoint work starts.

use crate::ast::{AstNode, NodeKind};
use crate::diagnostics::Diagnostics;
use crate::error::BuildError;
use crate::eval::{eval, refine};
use crate::interval::Interval;
use crate::location::{Condition, Entry, Location, LocationKind};
use crate::store::Store;

/// The ordered location list plus everything the solver needs to run it.
#[derive(Debug, Clone)]
pub struct EquationSystem {
    pub locations: Vec<Location>,
    /// External input of the first location: every declared variable bound
    /// to ⊤, refined by the precondition clauses.
    pub precondition: Store,
    /// Declared variables in source order.
    pub variables: Vec<String>,
    pub if_count: usize,
    pub while_count: usize,
    /// Warnings produced while evaluating precondition bounds.
    pub diagnostics: Diagnostics,
}

/// Lowers a program tree into an [`EquationSystem`].
pub fn build(program: &AstNode) -> Result<EquationSystem, BuildError> {
    let mut builder = Builder::default();
    builder.run(program)?;
    Ok(EquationSystem {
        locations: builder.locations,
        precondition: builder.precondition,
        variables: builder.variables,
        if_count: builder.if_count,
        while_count: builder.while_count,
        diagnostics: builder.diag,
    })
}

#[derive(Default)]
struct Builder {
    locations: Vec<Location>,
    precondition: Store,
    variables: Vec<String>,
    if_count: usize,
    while_count: usize,
    /// Entry tag for the next emitted location; set when descending into a
    /// branch or loop body, consumed by the body's first location.
    pending_entry: Option<Entry>,
    diag: Diagnostics,
}

impl Builder {
    fn run(&mut self, program: &AstNode) -> Result<(), BuildError> {
        if program.kind != NodeKind::Sequence {
            return Err(BuildError::MalformedNode {
                kind: program.kind,
                reason: "program root must be a sequence",
            });
        }

        let mut children = program.children.iter().peekable();

        let mut declared = 0usize;
        while children
            .peek()
            .is_some_and(|node| node.kind == NodeKind::Declaration)
        {
            let declaration = children.next().expect("peeked");
            for variable in &declaration.children {
                self.declare(variable)?;
                declared += 1;
            }
        }
        if declared == 0 {
            return Err(BuildError::MissingDeclarations);
        }
        log::debug!("declared {declared} variables");

        let Some(body) = children.next() else {
            return Ok(());
        };
        if body.kind != NodeKind::Sequence {
            return Err(BuildError::MalformedNode {
                kind: body.kind,
                reason: "declarations must be followed by a statement sequence",
            });
        }
        if children.next().is_some() {
            return Err(BuildError::MalformedNode {
                kind: NodeKind::Sequence,
                reason: "trailing nodes after the statement sequence",
            });
        }

        let mut statements = body.children.iter().peekable();
        let mut preconditions = 0usize;
        while statements
            .peek()
            .is_some_and(|node| node.kind == NodeKind::PreCondition)
        {
            let precondition = statements.next().expect("peeked");
            for clause in &precondition.children {
                self.apply_precondition(clause)?;
                preconditions += 1;
            }
        }
        log::debug!(
            "applied {preconditions} precondition clauses, input store {}",
            self.precondition
        );

        for statement in statements {
            self.lower_statement(statement)?;
        }
        Ok(())
    }

    fn declare(&mut self, node: &AstNode) -> Result<(), BuildError> {
        if node.kind != NodeKind::Variable {
            return Err(BuildError::MalformedNode {
                kind: node.kind,
                reason: "declaration children must be variables",
            });
        }
        let name = node.as_name().ok_or(BuildError::MalformedNode {
            kind: node.kind,
            reason: "variable node must carry a name",
        })?;
        self.precondition.set(name, Interval::TOP);
        self.variables.push(name.to_string());
        Ok(())
    }

    /// Meets a variable's interval with the half-line of one precondition
    /// clause. The variable may sit on either side of the comparison; the
    /// other side must be a constant expression.
    fn apply_precondition(&mut self, clause: &AstNode) -> Result<(), BuildError> {
        if clause.kind != NodeKind::LogicOp {
            return Err(BuildError::MalformedPrecondition);
        }
        let op = clause.as_logic().ok_or(BuildError::MalformedPrecondition)?;
        let [lhs, rhs] = clause.children.as_slice() else {
            return Err(BuildError::MalformedPrecondition);
        };

        let (var, op, bound_expr) = if lhs.kind == NodeKind::Variable {
            (lhs, op, rhs)
        } else if rhs.kind == NodeKind::Variable {
            (rhs, op.flipped(), lhs)
        } else {
            return Err(BuildError::MalformedPrecondition);
        };
        let var = self.checked_variable(var)?.to_string();
        self.validate_expression(bound_expr)?;
        if find_variable(bound_expr).is_some() {
            return Err(BuildError::MalformedPrecondition);
        }

        let bound = eval(bound_expr, &Store::new(), &mut self.diag);
        self.precondition = refine(&self.precondition, &var, op, &bound);
        Ok(())
    }

    fn lower_statement(&mut self, node: &AstNode) -> Result<(), BuildError> {
        match node.kind {
            NodeKind::Assignment => {
                let [lhs, expr] = node.children.as_slice() else {
                    return Err(BuildError::MalformedNode {
                        kind: node.kind,
                        reason: "assignment must have a variable and an expression",
                    });
                };
                if lhs.kind != NodeKind::Variable {
                    return Err(BuildError::MalformedNode {
                        kind: node.kind,
                        reason: "assignment target must be a variable",
                    });
                }
                let var = self.checked_variable(lhs)?.to_string();
                self.validate_expression(expr)?;
                self.emit(LocationKind::Assignment {
                    var,
                    expr: expr.clone(),
                    input: Store::new(),
                    output: Store::new(),
                });
                Ok(())
            }
            NodeKind::PostCondition => {
                let [comparison] = node.children.as_slice() else {
                    return Err(BuildError::MalformedNode {
                        kind: node.kind,
                        reason: "postcondition must wrap one comparison",
                    });
                };
                let comparison = condition_node(comparison)?;
                let op = comparison.as_logic().ok_or(BuildError::MalformedNode {
                    kind: comparison.kind,
                    reason: "comparison node must carry an operator tag",
                })?;
                let [lhs, rhs] = comparison.children.as_slice() else {
                    return Err(BuildError::MalformedNode {
                        kind: comparison.kind,
                        reason: "comparison must have two operands",
                    });
                };
                self.validate_expression(lhs)?;
                self.validate_expression(rhs)?;
                self.emit(LocationKind::Postcondition {
                    op,
                    lhs: lhs.clone(),
                    rhs: rhs.clone(),
                    store: Store::new(),
                });
                Ok(())
            }
            NodeKind::IfElse => {
                let (condition, then_body, else_body) = match node.children.as_slice() {
                    [condition, then_body] => (condition, then_body, None),
                    [condition, then_body, else_body] => (condition, then_body, Some(else_body)),
                    _ => {
                        return Err(BuildError::MalformedNode {
                            kind: node.kind,
                            reason: "if must have a condition, a body and at most one else body",
                        })
                    }
                };
                let cond = self.parse_condition(condition)?;
                let id = self.if_count;
                self.if_count += 1;
                self.emit(LocationKind::IfElseHead {
                    id,
                    cond,
                    has_else: else_body.is_some(),
                    before: Store::new(),
                    if_body: Store::new(),
                    else_body: Store::new(),
                });

                self.lower_body(then_body, Entry::IfBody(id), "if")?;
                self.last_location().ends_if_body = Some(id);

                if let Some(else_body) = else_body {
                    self.lower_body(else_body, Entry::ElseBody(id), "else")?;
                    self.last_location().ends_else_body = Some(id);
                }

                self.emit(LocationKind::EndIf {
                    id,
                    before: Store::new(),
                    after_if: Store::new(),
                    after_else: Store::new(),
                    after: Store::new(),
                });
                Ok(())
            }
            NodeKind::WhileLoop => {
                let [condition, body] = node.children.as_slice() else {
                    return Err(BuildError::MalformedNode {
                        kind: node.kind,
                        reason: "while must have a condition and a body",
                    });
                };
                let cond = self.parse_condition(condition)?;
                let id = self.while_count;
                self.while_count += 1;
                self.emit(LocationKind::WhileHead {
                    id,
                    cond,
                    before: Store::new(),
                    body: Store::new(),
                    exit: Store::new(),
                });

                self.lower_body(body, Entry::WhileBody(id), "while")?;
                self.last_location().ends_while_body = Some(id);

                self.emit(LocationKind::EndWhile {
                    id,
                    from_exit: Store::new(),
                    after: Store::new(),
                });
                Ok(())
            }
            NodeKind::PreCondition => Err(BuildError::MisplacedPrecondition),
            kind => Err(BuildError::UnsupportedStatement { kind }),
        }
    }

    /// Lowers the statements of a branch or loop body; the body's first
    /// location consumes `entry`.
    fn lower_body(
        &mut self,
        body: &AstNode,
        entry: Entry,
        label: &'static str,
    ) -> Result<(), BuildError> {
        let statements = body_statements(body);
        if statements.is_empty() {
            return Err(BuildError::EmptyBody(label));
        }
        self.pending_entry = Some(entry);
        for statement in statements {
            self.lower_statement(statement)?;
        }
        debug_assert!(
            self.pending_entry.is_none(),
            "body lowering must emit at least one location"
        );
        Ok(())
    }

    fn emit(&mut self, kind: LocationKind) {
        let entry = self.pending_entry.take().unwrap_or(Entry::Previous);
        log::debug!("location {}: {:?} entry", self.locations.len(), entry);
        self.locations.push(Location::new(kind, entry));
    }

    fn last_location(&mut self) -> &mut Location {
        self.locations
            .last_mut()
            .expect("a body always emits at least one location")
    }

    /// Validates the shape of a branch or loop condition: a variable on the
    /// left, a constant expression on the right.
    fn parse_condition(&mut self, node: &AstNode) -> Result<Condition, BuildError> {
        let comparison = condition_node(node)?;
        let op = comparison.as_logic().ok_or(BuildError::MalformedNode {
            kind: comparison.kind,
            reason: "comparison node must carry an operator tag",
        })?;
        let [lhs, rhs] = comparison.children.as_slice() else {
            return Err(BuildError::MalformedNode {
                kind: comparison.kind,
                reason: "comparison must have two operands",
            });
        };
        if lhs.kind != NodeKind::Variable {
            return Err(BuildError::ConditionLhsNotVariable);
        }
        let var = self.checked_variable(lhs)?.to_string();
        self.validate_expression(rhs)?;
        if let Some(name) = find_variable(rhs) {
            return Err(BuildError::ConditionRhsNotConstant(name.to_string()));
        }
        Ok(Condition {
            var,
            op,
            rhs: rhs.clone(),
        })
    }

    fn checked_variable<'n>(&self, node: &'n AstNode) -> Result<&'n str, BuildError> {
        let name = node.as_name().ok_or(BuildError::MalformedNode {
            kind: node.kind,
            reason: "variable node must carry a name",
        })?;
        if !self.precondition.contains_var(name) {
            return Err(BuildError::UndeclaredVariable(name.to_string()));
        }
        Ok(name)
    }

    fn validate_expression(&self, node: &AstNode) -> Result<(), BuildError> {
        match node.kind {
            NodeKind::Integer => {
                node.as_int().ok_or(BuildError::MalformedNode {
                    kind: node.kind,
                    reason: "integer node must carry an integer literal",
                })?;
                Ok(())
            }
            NodeKind::Variable => self.checked_variable(node).map(|_| ()),
            NodeKind::ArithOp => {
                node.as_arith().ok_or(BuildError::MalformedNode {
                    kind: node.kind,
                    reason: "arithmetic node must carry an operator tag",
                })?;
                let [lhs, rhs] = node.children.as_slice() else {
                    return Err(BuildError::MalformedNode {
                        kind: node.kind,
                        reason: "arithmetic node must have exactly two children",
                    });
                };
                self.validate_expression(lhs)?;
                self.validate_expression(rhs)
            }
            kind => Err(BuildError::UnsupportedExpression { kind }),
        }
    }
}

/// Accepts a comparison either directly or behind one wrapper node, the two
/// shapes parsers produce for conditions.
fn condition_node(node: &AstNode) -> Result<&AstNode, BuildError> {
    if node.kind == NodeKind::LogicOp {
        return Ok(node);
    }
    if let [inner] = node.children.as_slice() {
        if inner.kind == NodeKind::LogicOp {
            return Ok(inner);
        }
    }
    Err(BuildError::MalformedNode {
        kind: node.kind,
        reason: "expected a comparison",
    })
}

/// Unwraps a statement body: a sequence of statements, possibly behind one
/// extra sequence layer, or a single bare statement.
fn body_statements(body: &AstNode) -> Vec<&AstNode> {
    if body.kind != NodeKind::Sequence {
        return vec![body];
    }
    match body.children.as_slice() {
        [single] if single.kind == NodeKind::Sequence => single.children.iter().collect(),
        children => children.iter().collect(),
    }
}

fn find_variable(node: &AstNode) -> Option<&str> {
    if node.kind == NodeKind::Variable {
        return node.as_name();
    }
    node.children.iter().find_map(find_variable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ArithOp, LogicOp};

    fn program(statements: Vec<AstNode>) -> AstNode {
        AstNode::sequence(vec![
            AstNode::declaration(vec![AstNode::variable("x")]),
            AstNode::sequence(statements),
        ])
    }

    #[test]
    fn declarations_bind_variables_to_top() {
        let system = build(&program(Vec::new())).unwrap();
        assert_eq!(system.variables, vec!["x".to_string()]);
        assert_eq!(system.precondition.get("x"), Interval::TOP);
        assert!(system.locations.is_empty());
    }

    #[test]
    fn preconditions_refine_the_input_store() {
        let system = build(&program(vec![
            AstNode::precondition(AstNode::logic(
                LogicOp::Ge,
                AstNode::variable("x"),
                AstNode::integer(0),
            )),
            AstNode::precondition(AstNode::logic(
                LogicOp::Le,
                AstNode::variable("x"),
                AstNode::integer(10),
            )),
        ]))
        .unwrap();
        assert_eq!(system.precondition.get("x"), Interval::new(0, 10));
    }

    #[test]
    fn precondition_accepts_the_constant_on_the_left() {
        let system = build(&program(vec![AstNode::precondition(AstNode::logic(
            LogicOp::Le,
            AstNode::integer(-1),
            AstNode::variable("x"),
        ))]))
        .unwrap();
        assert_eq!(
            system.precondition.get("x"),
            Interval::new(-1, i64::MAX)
        );
    }

    #[test]
    fn if_else_lowering_emits_head_bodies_and_end() {
        let system = build(&program(vec![AstNode::if_else(
            AstNode::logic(LogicOp::Eq, AstNode::variable("x"), AstNode::integer(5)),
            AstNode::sequence(vec![AstNode::assignment(
                AstNode::variable("x"),
                AstNode::integer(1),
            )]),
            Some(AstNode::sequence(vec![AstNode::assignment(
                AstNode::variable("x"),
                AstNode::integer(0),
            )])),
        )]))
        .unwrap();

        assert_eq!(system.locations.len(), 4);
        assert_eq!(system.if_count, 1);
        assert!(matches!(
            system.locations[0].kind,
            LocationKind::IfElseHead { has_else: true, .. }
        ));
        assert_eq!(system.locations[1].entry, Entry::IfBody(0));
        assert_eq!(system.locations[1].ends_if_body, Some(0));
        assert_eq!(system.locations[2].entry, Entry::ElseBody(0));
        assert_eq!(system.locations[2].ends_else_body, Some(0));
        assert!(matches!(system.locations[3].kind, LocationKind::EndIf { .. }));
    }

    #[test]
    fn while_lowering_marks_the_body_tail() {
        let system = build(&program(vec![AstNode::while_loop(
            AstNode::logic(LogicOp::Lt, AstNode::variable("x"), AstNode::integer(10)),
            AstNode::sequence(vec![AstNode::assignment(
                AstNode::variable("x"),
                AstNode::arith(ArithOp::Add, AstNode::variable("x"), AstNode::integer(1)),
            )]),
        )]))
        .unwrap();

        assert_eq!(system.locations.len(), 3);
        assert_eq!(system.while_count, 1);
        assert_eq!(system.locations[1].entry, Entry::WhileBody(0));
        assert_eq!(system.locations[1].ends_while_body, Some(0));
        assert!(matches!(
            system.locations[2].kind,
            LocationKind::EndWhile { .. }
        ));
    }

    #[test]
    fn rejects_programs_without_declarations() {
        let ast = AstNode::sequence(vec![AstNode::sequence(Vec::new())]);
        assert_eq!(build(&ast).unwrap_err(), BuildError::MissingDeclarations);
    }

    #[test]
    fn rejects_undeclared_variables() {
        let err = build(&program(vec![AstNode::assignment(
            AstNode::variable("y"),
            AstNode::integer(1),
        )]))
        .unwrap_err();
        assert_eq!(err, BuildError::UndeclaredVariable("y".to_string()));
    }

    #[test]
    fn rejects_non_variable_condition_left_sides() {
        let err = build(&program(vec![AstNode::if_else(
            AstNode::logic(LogicOp::Eq, AstNode::integer(5), AstNode::variable("x")),
            AstNode::sequence(vec![AstNode::assignment(
                AstNode::variable("x"),
                AstNode::integer(1),
            )]),
            None,
        )]))
        .unwrap_err();
        assert_eq!(err, BuildError::ConditionLhsNotVariable);
    }

    #[test]
    fn rejects_variables_on_condition_right_sides() {
        let err = build(&program(vec![AstNode::while_loop(
            AstNode::logic(LogicOp::Lt, AstNode::variable("x"), AstNode::variable("x")),
            AstNode::sequence(vec![AstNode::assignment(
                AstNode::variable("x"),
                AstNode::integer(1),
            )]),
        )]))
        .unwrap_err();
        assert_eq!(err, BuildError::ConditionRhsNotConstant("x".to_string()));
    }

    #[test]
    fn rejects_preconditions_after_statements() {
        let err = build(&program(vec![
            AstNode::assignment(AstNode::variable("x"), AstNode::integer(1)),
            AstNode::precondition(AstNode::logic(
                LogicOp::Ge,
                AstNode::variable("x"),
                AstNode::integer(0),
            )),
        ]))
        .unwrap_err();
        assert_eq!(err, BuildError::MisplacedPrecondition);
    }

    #[test]
    fn rejects_empty_bodies() {
        let err = build(&program(vec![AstNode::while_loop(
            AstNode::logic(LogicOp::Lt, AstNode::variable("x"), AstNode::integer(10)),
            AstNode::sequence(Vec::new()),
        )]))
        .unwrap_err();
        assert_eq!(err, BuildError::EmptyBody("while"));
    }
}
