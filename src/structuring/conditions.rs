//! Branch conditions and short-circuit chain folding.
//!
//! A source-level `a && b` or `a || b` compiles to a chain of conditional
//! branch blocks that share targets. [`ConditionFolder`] walks such a chain
//! from its head and merges every block that only evaluates a test into one
//! n-ary [`Condition`].

use log::trace;
use rustc_hash::FxHashSet;

use crate::{
    analysis::cfg::ControlFlowGraph,
    ast::{BlockKind, CompareOp, Condition, Constant, Instruction, StatementBlock},
    bytecode::{BranchKind, Terminator},
    structuring::stack::{ExprStack, StackSimulator},
    utils::{descriptor, graph::NodeId},
    Result,
};

/// Builds the condition under which a branch of `kind` takes its jump,
/// popping the tested operands from `stack`.
///
/// # Errors
///
/// Returns [`crate::Error::Malformed`] if the stack holds fewer operands than
/// the test pops.
pub(crate) fn branch_condition(kind: BranchKind, stack: &mut ExprStack) -> Result<Condition> {
    Ok(match kind {
        BranchKind::IfZero(op) => {
            let value = stack.pop()?;
            zero_test(value, op)
        }
        BranchKind::IfCmp(op) => {
            let right = stack.pop()?;
            let left = stack.pop()?;
            Condition::compare(left, op, right)
        }
        BranchKind::IfNull => Condition::compare(
            stack.pop()?,
            CompareOp::Eq,
            Instruction::Constant(Constant::Null),
        ),
        BranchKind::IfNonNull => Condition::compare(
            stack.pop()?,
            CompareOp::Ne,
            Instruction::Constant(Constant::Null),
        ),
    })
}

/// `value op 0`, with `lcmp`-style comparisons and booleans rewritten into
/// their source forms.
fn zero_test(value: Instruction, op: CompareOp) -> Condition {
    match value {
        Instruction::Compare(cmp) => Condition::compare(*cmp.left, op, *cmp.right),
        value if value.infer_type() == descriptor::BOOLEAN && matches!(op, CompareOp::Eq | CompareOp::Ne) => {
            let test = Condition::boolean(value);
            if op == CompareOp::Eq {
                test.invert()
            } else {
                test
            }
        }
        value => Condition::compare(value, op, Instruction::int(0)),
    }
}

/// A two-way branch: the condition for `taken` and the fallthrough.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BranchTest {
    pub condition: Condition,
    pub taken: NodeId,
    pub fallthrough: NodeId,
}

/// Folds chains of pure test blocks into short-circuit conditions.
pub(crate) struct ConditionFolder<'s, 'c, 'g> {
    cfg: &'c ControlFlowGraph<'g>,
    sim: &'s StackSimulator<'s>,
    max_chain: usize,
}

impl<'s, 'c, 'g> ConditionFolder<'s, 'c, 'g> {
    pub(crate) fn new(cfg: &'c ControlFlowGraph<'g>, sim: &'s StackSimulator<'s>, max_chain: usize) -> Self {
        ConditionFolder {
            cfg,
            sim,
            max_chain: max_chain.max(1),
        }
    }

    /// Returns the test of `node` if the block does nothing but evaluate its
    /// branch condition from an empty stack.
    pub(crate) fn pure_test(&self, node: NodeId, scope: &StatementBlock) -> Option<BranchTest> {
        let block = self.cfg.block(node)?;
        let Terminator::Branch {
            kind,
            taken,
            fallthrough,
        } = &block.terminator
        else {
            return None;
        };

        let mut scratch = scope.child(BlockKind::Block);
        let mut stack = ExprStack::new();
        self.sim.run(&block.insns, &mut scratch, &mut stack).ok()?;
        if !scratch.is_empty() || stack.len() != kind.pops() {
            return None;
        }
        let condition = branch_condition(*kind, &mut stack).ok()?;
        Some(BranchTest {
            condition,
            taken: NodeId::new(*taken),
            fallthrough: NodeId::new(*fallthrough),
        })
    }

    /// Extends `head` with every pure test block that continues its chain.
    ///
    /// `eligible` filters the blocks that may join, and every block that joins
    /// is recorded in `chain` (which starts with the head block).
    pub(crate) fn fold(
        &self,
        mut head: BranchTest,
        chain: &mut Vec<NodeId>,
        scope: &StatementBlock,
        eligible: impl Fn(NodeId) -> bool,
    ) -> BranchTest {
        let mut members: FxHashSet<NodeId> = chain.iter().copied().collect();

        while chain.len() < self.max_chain {
            let joinable = |node: NodeId| {
                !members.contains(&node)
                    && eligible(node)
                    && self.cfg.predecessors(node).all(|pred| members.contains(&pred))
            };

            let mut joined = None;
            if joinable(head.fallthrough) {
                if let Some(next) = self.pure_test(head.fallthrough, scope) {
                    if next.taken == head.taken {
                        // a || b
                        joined = Some((head.fallthrough, BranchTest {
                            condition: Condition::or(vec![head.condition.clone(), next.condition]),
                            taken: head.taken,
                            fallthrough: next.fallthrough,
                        }));
                    } else if next.fallthrough == head.taken {
                        joined = Some((head.fallthrough, BranchTest {
                            condition: Condition::or(vec![
                                head.condition.clone(),
                                next.condition.invert(),
                            ]),
                            taken: head.taken,
                            fallthrough: next.taken,
                        }));
                    }
                }
            }
            if joined.is_none() && joinable(head.taken) {
                if let Some(next) = self.pure_test(head.taken, scope) {
                    if next.fallthrough == head.fallthrough {
                        // a && b
                        joined = Some((head.taken, BranchTest {
                            condition: Condition::and(vec![head.condition.clone(), next.condition]),
                            taken: next.taken,
                            fallthrough: head.fallthrough,
                        }));
                    } else if next.taken == head.fallthrough {
                        joined = Some((head.taken, BranchTest {
                            condition: Condition::and(vec![
                                head.condition.clone(),
                                next.condition.invert(),
                            ]),
                            taken: next.fallthrough,
                            fallthrough: head.fallthrough,
                        }));
                    }
                }
            }

            match joined {
                Some((node, folded)) => {
                    trace!("folded test block {node} into condition {}", folded.condition);
                    members.insert(node);
                    chain.push(node);
                    head = folded;
                }
                None => break,
            }
        }
        head
    }
}
