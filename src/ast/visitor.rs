//! The visitor protocol.
//!
//! [`InstructionVisitor`] has one hook per concrete node variant, each with an
//! empty default body, so a visitor only overrides what it cares about. The set
//! of hooks is closed: a new node variant needs a new hook here and a new arm
//! in the corresponding `accept`.
//!
//! Traversal is driven by the nodes (`Instruction::accept`, `Condition::accept`,
//! `Statement::accept`, `StatementBlock::accept`). It is synchronous, depth-first
//! and pre-order, and the tree is borrowed immutably for its whole duration.
//!
//! # Examples
//!
//! ```rust,ignore
//! use classcope::ast::{InstructionVisitor, MethodRef, StaticMethodInvoke};
//!
//! #[derive(Default)]
//! struct CallCollector(Vec<String>);
//!
//! impl InstructionVisitor for CallCollector {
//!     fn visit_static_method_invoke(&mut self, invoke: &StaticMethodInvoke) {
//!         self.0.push(invoke.method.name.clone());
//!     }
//! }
//!
//! let mut calls = CallCollector::default();
//! method.body.accept(&mut calls);
//! ```

use crate::ast::{
    ArrayAccess, ArrayLength, Assignment, BooleanCondition, Cast, CompareCondition,
    CompoundAssignment, Condition, ConditionalGoto, Constant, DoWhile, ForLoop, If,
    IncrementExpression, IncrementStatement, InstanceFieldAccess, InstanceMethodInvoke,
    InstanceOf, Instruction, LocalVariable, Negate, New, NewArray, NumberCompare, Operator,
    StaticFieldAccess, StaticMethodInvoke, Switch, Ternary, While,
};

/// Hooks invoked while walking a recovered tree.
#[allow(unused_variables)]
pub trait InstructionVisitor {
    // Expressions

    /// Literal.
    fn visit_constant(&mut self, constant: &Constant) {}
    /// Local variable read.
    fn visit_local_access(&mut self, local: &LocalVariable) {}
    /// Instance field read, before its receiver.
    fn visit_instance_field_access(&mut self, access: &InstanceFieldAccess) {}
    /// Static field read.
    fn visit_static_field_access(&mut self, access: &StaticFieldAccess) {}
    /// Array element read, before array and index.
    fn visit_array_access(&mut self, access: &ArrayAccess) {}
    /// Array length, before the array.
    fn visit_array_length(&mut self, length: &ArrayLength) {}
    /// Binary operator, before left and right.
    fn visit_operator(&mut self, op: &Operator) {}
    /// Negation.
    fn visit_negate(&mut self, negate: &Negate) {}
    /// Cast.
    fn visit_cast(&mut self, cast: &Cast) {}
    /// `instanceof`.
    fn visit_instance_of(&mut self, test: &InstanceOf) {}
    /// Array construction, before size and initializer values.
    fn visit_new_array(&mut self, array: &NewArray) {}
    /// Constructor invocation, before its arguments.
    fn visit_new(&mut self, new: &New) {}
    /// Instance invocation, before receiver and arguments.
    fn visit_instance_method_invoke(&mut self, invoke: &InstanceMethodInvoke) {}
    /// Static invocation, before its arguments.
    fn visit_static_method_invoke(&mut self, invoke: &StaticMethodInvoke) {}
    /// Ternary, before condition, true value and false value.
    fn visit_ternary(&mut self, ternary: &Ternary) {}
    /// Raw three-way comparison.
    fn visit_number_compare(&mut self, compare: &NumberCompare) {}
    /// Increment expression.
    fn visit_increment_expression(&mut self, increment: &IncrementExpression) {}

    // Conditions

    /// Boolean test, before the tested value.
    fn visit_boolean_condition(&mut self, condition: &BooleanCondition) {}
    /// Comparison, before its operands.
    fn visit_compare_condition(&mut self, condition: &CompareCondition) {}
    /// Explicit negation, before the negated condition.
    fn visit_inverse_condition(&mut self, inner: &Condition) {}
    /// Conjunction, before its operands.
    fn visit_and_condition(&mut self, operands: &[Condition]) {}
    /// Disjunction, before its operands.
    fn visit_or_condition(&mut self, operands: &[Condition]) {}

    // Statements

    /// Assignment, before destination sub-expressions and value.
    fn visit_assignment(&mut self, assignment: &Assignment) {}
    /// Compound assignment.
    fn visit_compound_assignment(&mut self, assignment: &CompoundAssignment) {}
    /// Increment statement.
    fn visit_increment_statement(&mut self, increment: &IncrementStatement) {}
    /// Expression statement, before the expression.
    fn visit_invoke_statement(&mut self, expression: &Instruction) {}
    /// Return.
    fn visit_return(&mut self, value: Option<&Instruction>) {}
    /// Throw.
    fn visit_throw(&mut self, value: &Instruction) {}
    /// If, before condition, then-body and else-body.
    fn visit_if(&mut self, statement: &If) {}
    /// While, before condition and body.
    fn visit_while(&mut self, statement: &While) {}
    /// Do-while, before body and condition.
    fn visit_do_while(&mut self, statement: &DoWhile) {}
    /// For, before init, condition, increment and body.
    fn visit_for_loop(&mut self, statement: &ForLoop) {}
    /// Switch, before the switched value and each arm.
    fn visit_switch(&mut self, statement: &Switch) {}
    /// Break.
    fn visit_break(&mut self) {}
    /// Continue.
    fn visit_continue(&mut self) {}
    /// Fallback label.
    fn visit_label(&mut self, block: usize) {}
    /// Fallback jump.
    fn visit_goto(&mut self, target: usize) {}
    /// Fallback conditional jump, before its condition.
    fn visit_conditional_goto(&mut self, jump: &ConditionalGoto) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BlockKind, CompareOp, Lvalue, OperatorKind, Statement, StatementBlock};

    #[derive(Default)]
    struct Recorder(Vec<String>);

    impl InstructionVisitor for Recorder {
        fn visit_local_access(&mut self, local: &LocalVariable) {
            self.0.push(local.name.clone());
        }

        fn visit_constant(&mut self, constant: &Constant) {
            self.0.push(constant.to_string());
        }

        fn visit_or_condition(&mut self, _: &[Condition]) {
            self.0.push("or".into());
        }

        fn visit_for_loop(&mut self, _: &ForLoop) {
            self.0.push("for".into());
        }

        fn visit_assignment(&mut self, _: &Assignment) {
            self.0.push("assign".into());
        }

        fn visit_compare_condition(&mut self, _: &CompareCondition) {
            self.0.push("compare".into());
        }

        fn visit_increment_statement(&mut self, _: &IncrementStatement) {
            self.0.push("increment".into());
        }

        fn visit_compound_assignment(&mut self, _: &CompoundAssignment) {
            self.0.push("compound".into());
        }
    }

    fn local(slot: u16, name: &str, desc: &str) -> LocalVariable {
        LocalVariable::new(slot, name, desc)
    }

    #[test]
    fn test_or_operands_in_order() {
        let cond = Condition::or(
            ["a", "b", "c"]
                .iter()
                .zip(1..)
                .map(|(name, slot)| Condition::boolean(Instruction::Local(local(slot, name, "Z"))))
                .collect(),
        );
        let mut recorder = Recorder::default();
        cond.accept(&mut recorder);
        assert_eq!(recorder.0, ["or", "a", "b", "c"]);
    }

    #[test]
    fn test_for_loop_order() {
        let i = local(1, "i", "I");
        let sum = local(2, "sum", "I");
        let mut body = StatementBlock::new(BlockKind::Loop);
        body.append(Statement::CompoundAssignment(CompoundAssignment {
            target: Lvalue::Local(sum),
            op: OperatorKind::Add,
            value: Instruction::Local(i.clone()),
        }))
        .unwrap();

        let stmt = Statement::For(ForLoop {
            init: Some(Box::new(Statement::assign(Lvalue::Local(i.clone()), Instruction::int(0)))),
            condition: Condition::compare(Instruction::Local(i.clone()), CompareOp::Lt, Instruction::int(10)),
            incr: Some(Box::new(Statement::Increment(IncrementStatement { local: i, amount: 1 }))),
            body,
        });

        let mut recorder = Recorder::default();
        stmt.accept(&mut recorder);
        let hooks: Vec<&str> = recorder
            .0
            .iter()
            .map(String::as_str)
            .filter(|event| {
                matches!(*event, "for" | "assign" | "compare" | "increment" | "compound")
            })
            .collect();
        assert_eq!(hooks, ["for", "assign", "compare", "increment", "compound"]);

        let compare = recorder.0.iter().position(|e| e == "compare").unwrap();
        assert_eq!(recorder.0[compare + 1..compare + 3], ["i", "10"]);
    }
}
