//! The recovered program tree.
//!
//! Three node families make up the tree:
//!
//! - [`Instruction`] - expressions that produce a value
//! - [`Condition`] - boolean guards recovered from branch structure
//! - [`Statement`] - imperative statements, some owning nested [`StatementBlock`]s
//!
//! A method's tree is rooted in a locked [`StatementBlock`] of kind
//! [`BlockKind::Method`]. Consumers walk it through [`InstructionVisitor`] or
//! render it with `Display`.

mod block;
mod condition;
mod instruction;
mod locals;
mod statement;
mod visitor;

pub use block::{BlockKind, BlockState, StatementBlock};
pub use condition::{BooleanCondition, CompareCondition, CompareOp, Condition};
pub use instruction::{
    ArrayAccess, ArrayLength, Cast, CompareKind, Constant, FieldRef, IncrementExpression,
    InstanceFieldAccess, InstanceMethodInvoke, InstanceOf, Instruction, MethodRef, Negate, New,
    NewArray, NumberCompare, Operator, OperatorKind, StaticFieldAccess, StaticMethodInvoke, Ternary,
};
pub use locals::{LocalVariable, Locals};
pub use statement::{
    Assignment, CompoundAssignment, ConditionalGoto, DoWhile, ForLoop, If, IncrementStatement,
    Lvalue, Statement, Switch, SwitchCase, While,
};
pub use visitor::InstructionVisitor;
