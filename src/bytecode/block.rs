//! Basic blocks and their terminators.

use crate::{ast::CompareOp, bytecode::Insn};

/// How a block's terminator affects control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowType {
    /// Always continues at one target (`goto` or fall-through)
    UnconditionalBranch,
    /// Two-way branch
    ConditionalBranch,
    /// Multi-way branch (`tableswitch` / `lookupswitch`)
    Switch,
    /// Returns from the method
    Return,
    /// Throws an exception
    Throw,
}

/// The test performed by a two-way branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchKind {
    /// `ifeq`, `ifne`, `iflt`, `ifge`, `ifgt`, `ifle`: pops one value and
    /// compares it against zero
    IfZero(CompareOp),
    /// `if_icmp*` / `if_acmp*`: pops two values and compares them
    IfCmp(CompareOp),
    /// `ifnull`
    IfNull,
    /// `ifnonnull`
    IfNonNull,
}

impl BranchKind {
    /// Returns the number of values the test pops.
    #[must_use]
    pub const fn pops(self) -> usize {
        match self {
            BranchKind::IfCmp(_) => 2,
            _ => 1,
        }
    }
}

/// How control leaves a basic block.
///
/// Fall-through into the next block is always explicit as [`Terminator::Goto`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminator {
    /// Continue at the block with this index
    Goto(usize),
    /// Jump to `taken` if the test holds, otherwise continue at `fallthrough`
    Branch {
        /// The test
        kind: BranchKind,
        /// Target when the test holds
        taken: usize,
        /// Target otherwise
        fallthrough: usize,
    },
    /// Pops an `int` key and jumps to the matching case or to `default`
    Switch {
        /// `(key, target)` pairs
        cases: Vec<(i32, usize)>,
        /// Target when no key matches
        default: usize,
    },
    /// `return` from a void method
    Return,
    /// `ireturn` ... `areturn`: pops the returned value
    ReturnValue,
    /// `athrow`: pops the exception
    Throw,
}

impl Terminator {
    /// Returns the target block indices, in edge order.
    ///
    /// For a branch the taken target comes first; for a switch the case targets
    /// come in key order followed by the default.
    #[must_use]
    pub fn successors(&self) -> Vec<usize> {
        match self {
            Terminator::Goto(target) => vec![*target],
            Terminator::Branch {
                taken, fallthrough, ..
            } => vec![*taken, *fallthrough],
            Terminator::Switch { cases, default } => cases
                .iter()
                .map(|&(_, target)| target)
                .chain(std::iter::once(*default))
                .collect(),
            Terminator::Return | Terminator::ReturnValue | Terminator::Throw => Vec::new(),
        }
    }

    /// Returns the flow classification of this terminator.
    #[must_use]
    pub const fn flow_type(&self) -> FlowType {
        match self {
            Terminator::Goto(_) => FlowType::UnconditionalBranch,
            Terminator::Branch { .. } => FlowType::ConditionalBranch,
            Terminator::Switch { .. } => FlowType::Switch,
            Terminator::Return | Terminator::ReturnValue => FlowType::Return,
            Terminator::Throw => FlowType::Throw,
        }
    }

    /// Returns the number of values the terminator pops.
    #[must_use]
    pub const fn pops(&self) -> usize {
        match self {
            Terminator::Goto(_) | Terminator::Return => 0,
            Terminator::Branch { kind, .. } => kind.pops(),
            Terminator::Switch { .. } | Terminator::ReturnValue | Terminator::Throw => 1,
        }
    }
}

/// A straight-line run of instructions ending in a terminator.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    /// Instructions in execution order
    pub insns: Vec<Insn>,
    /// How control leaves the block
    pub terminator: Terminator,
}

impl BasicBlock {
    /// Creates a block.
    #[must_use]
    pub fn new(insns: Vec<Insn>, terminator: Terminator) -> Self {
        BasicBlock { insns, terminator }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminator_successors() {
        let branch = Terminator::Branch {
            kind: BranchKind::IfCmp(CompareOp::Ge),
            taken: 4,
            fallthrough: 2,
        };
        assert_eq!(branch.successors(), vec![4, 2]);
        assert_eq!(branch.flow_type(), FlowType::ConditionalBranch);
        assert_eq!(branch.pops(), 2);

        let switch = Terminator::Switch {
            cases: vec![(1, 3), (2, 3), (5, 4)],
            default: 6,
        };
        assert_eq!(switch.successors(), vec![3, 3, 4, 6]);

        assert!(Terminator::ReturnValue.successors().is_empty());
        assert_eq!(Terminator::ReturnValue.pops(), 1);
        assert_eq!(Terminator::Throw.flow_type(), FlowType::Throw);
    }
}
