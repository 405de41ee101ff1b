//! Boolean condition nodes.
//!
//! Conditions come from control flow rather than from stack values: every
//! conditional branch contributes one guard, and chains of guards that share an
//! outcome are folded into n-ary [`Condition::And`] / [`Condition::Or`] nodes.
//! Operand order is the order in which the guards execute, which source-level
//! short-circuit semantics depend on.

use std::fmt;

use strum::{EnumCount, EnumIter};

use crate::ast::{Instruction, InstructionVisitor};

/// Relational operator of a comparison condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount)]
pub enum CompareOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `>=`
    Ge,
    /// `>`
    Gt,
    /// `<=`
    Le,
}

impl CompareOp {
    /// Returns the operator that holds exactly when `self` does not.
    #[must_use]
    pub const fn invert(self) -> Self {
        match self {
            CompareOp::Eq => CompareOp::Ne,
            CompareOp::Ne => CompareOp::Eq,
            CompareOp::Lt => CompareOp::Ge,
            CompareOp::Ge => CompareOp::Lt,
            CompareOp::Gt => CompareOp::Le,
            CompareOp::Le => CompareOp::Gt,
        }
    }

    /// Returns the source-level symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Ge => ">=",
            CompareOp::Gt => ">",
            CompareOp::Le => "<=",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A boolean value tested directly: `value` or `!value`.
#[derive(Debug, Clone, PartialEq)]
pub struct BooleanCondition {
    /// The tested expression, normally of type `Z`
    pub value: Instruction,
    /// `true` when the test is for `false`
    pub inverse: bool,
}

/// A comparison: `left op right`.
#[derive(Debug, Clone, PartialEq)]
pub struct CompareCondition {
    /// Left operand
    pub left: Instruction,
    /// Relational operator
    pub op: CompareOp,
    /// Right operand
    pub right: Instruction,
}

/// A boolean condition node.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Direct boolean test
    Boolean(BooleanCondition),
    /// Comparison of two values
    Compare(CompareCondition),
    /// Negation of a nested condition
    Inverse(Box<Condition>),
    /// Short-circuit conjunction over ordered operands
    And(Vec<Condition>),
    /// Short-circuit disjunction over ordered operands
    Or(Vec<Condition>),
}

impl Condition {
    /// Tests `value` for `true`.
    #[must_use]
    pub fn boolean(value: Instruction) -> Self {
        Condition::Boolean(BooleanCondition {
            value,
            inverse: false,
        })
    }

    /// Builds `left op right`.
    #[must_use]
    pub fn compare(left: Instruction, op: CompareOp, right: Instruction) -> Self {
        Condition::Compare(CompareCondition { left, op, right })
    }

    /// Builds the constant `true` condition used by `while (true)`.
    #[must_use]
    pub fn always() -> Self {
        Condition::boolean(Instruction::Constant(crate::ast::Constant::Boolean(true)))
    }

    /// Wraps `condition` in an explicit negation without simplifying it.
    #[must_use]
    pub fn not(condition: Condition) -> Self {
        Condition::Inverse(Box::new(condition))
    }

    /// Builds a conjunction, flattening nested conjunctions.
    ///
    /// A single operand is returned unchanged.
    #[must_use]
    pub fn and(operands: Vec<Condition>) -> Self {
        let mut flat = Vec::with_capacity(operands.len());
        for operand in operands {
            match operand {
                Condition::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            flat.remove(0)
        } else {
            Condition::And(flat)
        }
    }

    /// Builds a disjunction, flattening nested disjunctions.
    ///
    /// A single operand is returned unchanged.
    #[must_use]
    pub fn or(operands: Vec<Condition>) -> Self {
        let mut flat = Vec::with_capacity(operands.len());
        for operand in operands {
            match operand {
                Condition::Or(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            flat.remove(0)
        } else {
            Condition::Or(flat)
        }
    }

    /// Returns the logical negation of this condition.
    ///
    /// Comparisons flip their operator, boolean tests flip their polarity,
    /// an explicit negation is unwrapped, and conjunctions and disjunctions are
    /// rewritten with De Morgan's laws. Floating point comparisons are inverted
    /// as if NaN could not occur.
    #[must_use]
    pub fn invert(self) -> Self {
        match self {
            Condition::Boolean(test) => Condition::Boolean(BooleanCondition {
                value: test.value,
                inverse: !test.inverse,
            }),
            Condition::Compare(cmp) => Condition::Compare(CompareCondition {
                left: cmp.left,
                op: cmp.op.invert(),
                right: cmp.right,
            }),
            Condition::Inverse(inner) => *inner,
            Condition::And(operands) => {
                Condition::or(operands.into_iter().map(Condition::invert).collect())
            }
            Condition::Or(operands) => {
                Condition::and(operands.into_iter().map(Condition::invert).collect())
            }
        }
    }

    /// Returns `true` if evaluating the condition may have side effects.
    #[must_use]
    pub fn has_side_effects(&self) -> bool {
        match self {
            Condition::Boolean(test) => test.value.has_side_effects(),
            Condition::Compare(cmp) => cmp.left.has_side_effects() || cmp.right.has_side_effects(),
            Condition::Inverse(inner) => inner.has_side_effects(),
            Condition::And(operands) | Condition::Or(operands) => {
                operands.iter().any(Condition::has_side_effects)
            }
        }
    }

    /// Returns `true` if the condition reads the local in `slot`.
    #[must_use]
    pub fn references_local(&self, slot: u16) -> bool {
        match self {
            Condition::Boolean(test) => test.value.references_local(slot),
            Condition::Compare(cmp) => {
                cmp.left.references_local(slot) || cmp.right.references_local(slot)
            }
            Condition::Inverse(inner) => inner.references_local(slot),
            Condition::And(operands) | Condition::Or(operands) => {
                operands.iter().any(|c| c.references_local(slot))
            }
        }
    }

    /// Walks this condition with `visitor`: the node's hook first, then its
    /// operands left to right.
    pub fn accept<V: InstructionVisitor + ?Sized>(&self, visitor: &mut V) {
        match self {
            Condition::Boolean(test) => {
                visitor.visit_boolean_condition(test);
                test.value.accept(visitor);
            }
            Condition::Compare(cmp) => {
                visitor.visit_compare_condition(cmp);
                cmp.left.accept(visitor);
                cmp.right.accept(visitor);
            }
            Condition::Inverse(inner) => {
                visitor.visit_inverse_condition(inner);
                inner.accept(visitor);
            }
            Condition::And(operands) => {
                visitor.visit_and_condition(operands);
                for operand in operands {
                    operand.accept(visitor);
                }
            }
            Condition::Or(operands) => {
                visitor.visit_or_condition(operands);
                for operand in operands {
                    operand.accept(visitor);
                }
            }
        }
    }
}

fn write_value(f: &mut fmt::Formatter<'_>, value: &Instruction, min: u8) -> fmt::Result {
    if value.precedence() < min {
        write!(f, "({value})")
    } else {
        write!(f, "{value}")
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Boolean(test) => {
                if test.inverse {
                    f.write_str("!")?;
                    write_value(f, &test.value, 15)
                } else {
                    write_value(f, &test.value, 2)
                }
            }
            Condition::Compare(cmp) => {
                write_value(f, &cmp.left, 8)?;
                write!(f, " {} ", cmp.op)?;
                write_value(f, &cmp.right, 8)
            }
            Condition::Inverse(inner) => match inner.as_ref() {
                Condition::Boolean(_) => write!(f, "!{inner}"),
                _ => write!(f, "!({inner})"),
            },
            Condition::And(operands) => {
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" && ")?;
                    }
                    match operand {
                        Condition::Or(_) => write!(f, "({operand})")?,
                        _ => write!(f, "{operand}")?,
                    }
                }
                Ok(())
            }
            Condition::Or(operands) => {
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" || ")?;
                    }
                    write!(f, "{operand}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::LocalVariable;
    use strum::IntoEnumIterator;

    fn var(slot: u16, name: &str) -> Instruction {
        Instruction::Local(LocalVariable::new(slot, name, "Z"))
    }

    #[test]
    fn test_or_flattens_and_renders_without_parentheses() {
        let cond = Condition::or(vec![
            Condition::or(vec![Condition::boolean(var(1, "a")), Condition::boolean(var(2, "b"))]),
            Condition::boolean(var(3, "c")),
        ]);
        match &cond {
            Condition::Or(operands) => assert_eq!(operands.len(), 3),
            other => panic!("expected or, got {other:?}"),
        }
        assert_eq!(cond.to_string(), "a || b || c");
    }

    #[test]
    fn test_or_inside_and_is_parenthesized() {
        let cond = Condition::and(vec![
            Condition::or(vec![Condition::boolean(var(1, "a")), Condition::boolean(var(2, "b"))]),
            Condition::boolean(var(3, "c")),
        ]);
        assert_eq!(cond.to_string(), "(a || b) && c");
    }

    #[test]
    fn test_single_operand_collapses() {
        let cond = Condition::and(vec![Condition::boolean(var(1, "a"))]);
        assert_eq!(cond, Condition::boolean(var(1, "a")));
    }

    #[test]
    fn test_invert_de_morgan() {
        let cond = Condition::and(vec![
            Condition::compare(var(1, "x"), CompareOp::Lt, Instruction::int(10)),
            Condition::boolean(var(2, "ok")),
        ]);
        assert_eq!(cond.clone().invert().to_string(), "x >= 10 || !ok");
        assert_eq!(cond.clone().invert().invert(), cond);
    }

    #[test]
    fn test_explicit_negation_rendering() {
        let cond = Condition::not(Condition::or(vec![
            Condition::boolean(var(1, "a")),
            Condition::boolean(var(2, "b")),
        ]));
        assert_eq!(cond.to_string(), "!(a || b)");
        assert_eq!(
            cond.invert(),
            Condition::or(vec![Condition::boolean(var(1, "a")), Condition::boolean(var(2, "b"))])
        );
    }

    #[test]
    fn test_compare_op_inversion_is_involutive() {
        for op in CompareOp::iter() {
            assert_eq!(op.invert().invert(), op);
            assert_ne!(op.invert(), op);
        }
        assert_eq!(CompareOp::COUNT, 6);
    }
}
