//! Statement nodes.
//!
//! Statements are the imperative layer of the tree. Control constructs own
//! nested [`StatementBlock`]s for their bodies; everything else holds
//! expressions only.

use std::fmt;

use crate::{
    ast::{
        Condition, FieldRef, Instruction, InstructionVisitor, LocalVariable, OperatorKind,
        StatementBlock,
    },
    utils::descriptor,
};

/// The destination of an assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum Lvalue {
    /// Local variable slot
    Local(LocalVariable),
    /// `receiver.field`
    InstanceField {
        /// The assigned field
        field: FieldRef,
        /// The object owning the field
        receiver: Instruction,
    },
    /// `Owner.field`
    StaticField(FieldRef),
    /// `array[index]`
    Array {
        /// The array
        array: Instruction,
        /// The element index
        index: Instruction,
    },
}

impl Lvalue {
    /// Returns the expression that reads the current value of this destination.
    ///
    /// Used to recognize `x = x op v` as a compound assignment.
    #[must_use]
    pub fn read(&self) -> Instruction {
        use crate::ast::{ArrayAccess, InstanceFieldAccess, StaticFieldAccess};

        match self {
            Lvalue::Local(local) => Instruction::Local(local.clone()),
            Lvalue::InstanceField { field, receiver } => {
                Instruction::InstanceField(InstanceFieldAccess {
                    field: field.clone(),
                    receiver: Box::new(receiver.clone()),
                })
            }
            Lvalue::StaticField(field) => Instruction::StaticField(StaticFieldAccess {
                field: field.clone(),
            }),
            Lvalue::Array { array, index } => Instruction::ArrayAccess(ArrayAccess {
                array: Box::new(array.clone()),
                index: Box::new(index.clone()),
            }),
        }
    }

    /// Returns the local slot when the destination is a local.
    #[must_use]
    pub fn local_slot(&self) -> Option<u16> {
        match self {
            Lvalue::Local(local) => Some(local.slot),
            _ => None,
        }
    }

    fn accept<V: InstructionVisitor + ?Sized>(&self, visitor: &mut V) {
        match self {
            Lvalue::Local(_) | Lvalue::StaticField(_) => {}
            Lvalue::InstanceField { receiver, .. } => receiver.accept(visitor),
            Lvalue::Array { array, index } => {
                array.accept(visitor);
                index.accept(visitor);
            }
        }
    }
}

impl fmt::Display for Lvalue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lvalue::Local(local) => f.write_str(&local.name),
            other => write!(f, "{}", other.read()),
        }
    }
}

/// `target = value`
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Destination
    pub target: Lvalue,
    /// Assigned value
    pub value: Instruction,
}

/// `target op= value`
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundAssignment {
    /// Destination, also the left operand
    pub target: Lvalue,
    /// The operator
    pub op: OperatorKind,
    /// Right operand
    pub value: Instruction,
}

/// `local += amount` as produced by `iinc`; rendered `i++` / `i--` for ±1.
#[derive(Debug, Clone, PartialEq)]
pub struct IncrementStatement {
    /// The incremented local
    pub local: LocalVariable,
    /// Signed amount
    pub amount: i32,
}

/// `if (condition) { body } else { else_body }`
#[derive(Debug, Clone, PartialEq)]
pub struct If {
    /// Guard
    pub condition: Condition,
    /// Taken when the guard holds
    pub body: StatementBlock,
    /// Taken otherwise, if present
    pub else_body: Option<StatementBlock>,
}

/// `while (condition) { body }`
#[derive(Debug, Clone, PartialEq)]
pub struct While {
    /// Loop guard, checked before each iteration
    pub condition: Condition,
    /// Loop body
    pub body: StatementBlock,
}

/// `do { body } while (condition);`
#[derive(Debug, Clone, PartialEq)]
pub struct DoWhile {
    /// Loop guard, checked after each iteration
    pub condition: Condition,
    /// Loop body
    pub body: StatementBlock,
}

/// `for (init; condition; incr) { body }`
#[derive(Debug, Clone, PartialEq)]
pub struct ForLoop {
    /// Initialization statement
    pub init: Option<Box<Statement>>,
    /// Loop guard
    pub condition: Condition,
    /// Statement run after each iteration
    pub incr: Option<Box<Statement>>,
    /// Loop body
    pub body: StatementBlock,
}

/// One arm of a switch.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    /// Case keys sharing this arm, ascending
    pub labels: Vec<i32>,
    /// `true` if this arm is also the `default` arm
    pub is_default: bool,
    /// Arm statements
    pub body: StatementBlock,
    /// `true` if the arm ends with `break`; `false` means it falls through
    pub breaks: bool,
}

/// `switch (value) { cases }`
#[derive(Debug, Clone, PartialEq)]
pub struct Switch {
    /// Switched value
    pub value: Instruction,
    /// Arms in target order
    pub cases: Vec<SwitchCase>,
}

/// `if (condition) goto target;` in fallback output.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalGoto {
    /// Jump guard
    pub condition: Condition,
    /// Target block index
    pub target: usize,
}

/// A statement node.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Plain assignment
    Assignment(Assignment),
    /// Compound assignment
    CompoundAssignment(CompoundAssignment),
    /// Local increment
    Increment(IncrementStatement),
    /// Expression evaluated for its side effects
    Invoke(Instruction),
    /// `return;` or `return value;`
    Return(Option<Instruction>),
    /// `throw value;`
    Throw(Instruction),
    /// Conditional
    If(If),
    /// Pre-tested loop
    While(While),
    /// Post-tested loop
    DoWhile(DoWhile),
    /// Counted loop
    For(ForLoop),
    /// Multi-way branch
    Switch(Switch),
    /// `break;`
    Break,
    /// `continue;`
    Continue,
    /// Fallback label marking the start of a block
    Label(usize),
    /// Fallback unconditional jump
    Goto(usize),
    /// Fallback conditional jump
    ConditionalGoto(ConditionalGoto),
}

impl Statement {
    /// Shorthand for an assignment.
    #[must_use]
    pub fn assign(target: Lvalue, value: Instruction) -> Self {
        Statement::Assignment(Assignment { target, value })
    }

    /// Returns the local slot this statement writes, if it writes exactly one
    /// local and nothing else.
    #[must_use]
    pub fn assigned_local(&self) -> Option<u16> {
        match self {
            Statement::Assignment(assign) if !assign.value.has_side_effects() => {
                assign.target.local_slot()
            }
            Statement::CompoundAssignment(assign) if !assign.value.has_side_effects() => {
                assign.target.local_slot()
            }
            Statement::Increment(inc) => Some(inc.local.slot),
            _ => None,
        }
    }

    /// Returns `true` if control never continues past this statement.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Statement::Return(_)
                | Statement::Throw(_)
                | Statement::Break
                | Statement::Continue
                | Statement::Goto(_)
        )
    }

    /// Walks this statement with `visitor`: its own hook, then expressions and
    /// nested blocks in source order.
    pub fn accept<V: InstructionVisitor + ?Sized>(&self, visitor: &mut V) {
        match self {
            Statement::Assignment(assign) => {
                visitor.visit_assignment(assign);
                assign.target.accept(visitor);
                assign.value.accept(visitor);
            }
            Statement::CompoundAssignment(assign) => {
                visitor.visit_compound_assignment(assign);
                assign.target.accept(visitor);
                assign.value.accept(visitor);
            }
            Statement::Increment(inc) => visitor.visit_increment_statement(inc),
            Statement::Invoke(expr) => {
                visitor.visit_invoke_statement(expr);
                expr.accept(visitor);
            }
            Statement::Return(value) => {
                visitor.visit_return(value.as_ref());
                if let Some(value) = value {
                    value.accept(visitor);
                }
            }
            Statement::Throw(value) => {
                visitor.visit_throw(value);
                value.accept(visitor);
            }
            Statement::If(stmt) => {
                visitor.visit_if(stmt);
                stmt.condition.accept(visitor);
                stmt.body.accept(visitor);
                if let Some(else_body) = &stmt.else_body {
                    else_body.accept(visitor);
                }
            }
            Statement::While(stmt) => {
                visitor.visit_while(stmt);
                stmt.condition.accept(visitor);
                stmt.body.accept(visitor);
            }
            Statement::DoWhile(stmt) => {
                visitor.visit_do_while(stmt);
                stmt.body.accept(visitor);
                stmt.condition.accept(visitor);
            }
            Statement::For(stmt) => {
                visitor.visit_for_loop(stmt);
                if let Some(init) = &stmt.init {
                    init.accept(visitor);
                }
                stmt.condition.accept(visitor);
                if let Some(incr) = &stmt.incr {
                    incr.accept(visitor);
                }
                stmt.body.accept(visitor);
            }
            Statement::Switch(stmt) => {
                visitor.visit_switch(stmt);
                stmt.value.accept(visitor);
                for case in &stmt.cases {
                    case.body.accept(visitor);
                }
            }
            Statement::Break => visitor.visit_break(),
            Statement::Continue => visitor.visit_continue(),
            Statement::Label(block) => visitor.visit_label(*block),
            Statement::Goto(target) => visitor.visit_goto(*target),
            Statement::ConditionalGoto(jump) => {
                visitor.visit_conditional_goto(jump);
                jump.condition.accept(visitor);
            }
        }
    }

    /// Writes the one-line forms used both as statements and in `for` headers.
    fn write_simple(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Assignment(assign) => write!(f, "{} = {}", assign.target, assign.value),
            Statement::CompoundAssignment(assign) => {
                write!(f, "{} {}= {}", assign.target, assign.op, assign.value)
            }
            Statement::Increment(inc) => match inc.amount {
                1 => write!(f, "{}++", inc.local.name),
                -1 => write!(f, "{}--", inc.local.name),
                n if n < 0 => write!(f, "{} -= {}", inc.local.name, -i64::from(n)),
                n => write!(f, "{} += {n}", inc.local.name),
            },
            Statement::Invoke(expr) => write!(f, "{expr}"),
            other => write!(f, "{other}"),
        }
    }

    pub(crate) fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let pad = "    ".repeat(depth);
        match self {
            Statement::Assignment(_)
            | Statement::CompoundAssignment(_)
            | Statement::Increment(_)
            | Statement::Invoke(_) => {
                f.write_str(&pad)?;
                self.write_simple(f)?;
                f.write_str(";\n")
            }
            Statement::Return(None) => writeln!(f, "{pad}return;"),
            Statement::Return(Some(value)) => writeln!(f, "{pad}return {value};"),
            Statement::Throw(value) => writeln!(f, "{pad}throw {value};"),
            Statement::If(stmt) => {
                writeln!(f, "{pad}if ({}) {{", stmt.condition)?;
                stmt.body.write_indented(f, depth + 1)?;
                if let Some(else_body) = &stmt.else_body {
                    writeln!(f, "{pad}}} else {{")?;
                    else_body.write_indented(f, depth + 1)?;
                }
                writeln!(f, "{pad}}}")
            }
            Statement::While(stmt) => {
                writeln!(f, "{pad}while ({}) {{", stmt.condition)?;
                stmt.body.write_indented(f, depth + 1)?;
                writeln!(f, "{pad}}}")
            }
            Statement::DoWhile(stmt) => {
                writeln!(f, "{pad}do {{")?;
                stmt.body.write_indented(f, depth + 1)?;
                writeln!(f, "{pad}}} while ({});", stmt.condition)
            }
            Statement::For(stmt) => {
                write!(f, "{pad}for (")?;
                if let Some(init) = &stmt.init {
                    if let Statement::Assignment(Assignment {
                        target: Lvalue::Local(local),
                        ..
                    }) = init.as_ref()
                    {
                        write!(f, "{} ", descriptor::source_name(&local.descriptor))?;
                    }
                    init.write_simple(f)?;
                }
                write!(f, "; {}; ", stmt.condition)?;
                if let Some(incr) = &stmt.incr {
                    incr.write_simple(f)?;
                }
                writeln!(f, ") {{")?;
                stmt.body.write_indented(f, depth + 1)?;
                writeln!(f, "{pad}}}")
            }
            Statement::Switch(stmt) => {
                writeln!(f, "{pad}switch ({}) {{", stmt.value)?;
                for case in &stmt.cases {
                    for label in &case.labels {
                        writeln!(f, "{pad}case {label}:")?;
                    }
                    if case.is_default {
                        writeln!(f, "{pad}default:")?;
                    }
                    case.body.write_indented(f, depth + 1)?;
                    if case.breaks {
                        writeln!(f, "{pad}    break;")?;
                    }
                }
                writeln!(f, "{pad}}}")
            }
            Statement::Break => writeln!(f, "{pad}break;"),
            Statement::Continue => writeln!(f, "{pad}continue;"),
            Statement::Label(block) => writeln!(f, "{pad}label_{block}:"),
            Statement::Goto(target) => writeln!(f, "{pad}goto label_{target};"),
            Statement::ConditionalGoto(jump) => {
                writeln!(f, "{pad}if ({}) goto label_{};", jump.condition, jump.target)
            }
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Assignment(_)
            | Statement::CompoundAssignment(_)
            | Statement::Increment(_)
            | Statement::Invoke(_) => {
                self.write_simple(f)?;
                f.write_str(";")
            }
            other => {
                let text = DisplayIndented(other).to_string();
                f.write_str(text.trim_end())
            }
        }
    }
}

struct DisplayIndented<'a>(&'a Statement);

impl fmt::Display for DisplayIndented<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.write_indented(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BlockKind, CompareOp};

    fn i() -> LocalVariable {
        LocalVariable::new(1, "i", "I")
    }

    #[test]
    fn test_simple_statement_rendering() {
        let assign = Statement::assign(Lvalue::Local(i()), Instruction::int(0));
        assert_eq!(assign.to_string(), "i = 0;");

        let inc = Statement::Increment(IncrementStatement { local: i(), amount: -3 });
        assert_eq!(inc.to_string(), "i -= 3;");

        let compound = Statement::CompoundAssignment(CompoundAssignment {
            target: Lvalue::Local(LocalVariable::new(2, "sum", "I")),
            op: OperatorKind::Add,
            value: Instruction::Local(i()),
        });
        assert_eq!(compound.to_string(), "sum += i;");
    }

    #[test]
    fn test_for_loop_rendering() {
        let mut body = StatementBlock::new(BlockKind::Loop);
        body.append(Statement::Invoke(Instruction::Local(i()))).unwrap();
        body.lock().unwrap();

        let stmt = Statement::For(ForLoop {
            init: Some(Box::new(Statement::assign(Lvalue::Local(i()), Instruction::int(0)))),
            condition: Condition::compare(Instruction::Local(i()), CompareOp::Lt, Instruction::int(10)),
            incr: Some(Box::new(Statement::Increment(IncrementStatement { local: i(), amount: 1 }))),
            body,
        });
        assert_eq!(stmt.to_string(), "for (int i = 0; i < 10; i++) {\n    i;\n}");
    }

    #[test]
    fn test_assigned_local() {
        let assign = Statement::assign(Lvalue::Local(i()), Instruction::int(0));
        assert_eq!(assign.assigned_local(), Some(1));

        let static_store = Statement::assign(
            Lvalue::StaticField(FieldRef::new("Foo", "count", "I")),
            Instruction::int(0),
        );
        assert_eq!(static_store.assigned_local(), None);
        assert!(Statement::Break.is_terminal());
        assert!(!assign.is_terminal());
    }
}
