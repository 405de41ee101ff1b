//! Flat label-and-goto rendering for code that cannot be structured.
//!
//! [`flatten`] renders a whole method; [`flat_block`] renders the blocks the
//! structurer leaves behind after a region falls back to `goto`. Every block
//! becomes a [`Statement::Label`] followed by its simulated statements and
//! explicit jumps. No condition folding or idiom
//! recovery across blocks happens here, so the output stays faithful to the
//! graph even when no structured form exists.

use log::trace;

use crate::{
    analysis::cfg::ControlFlowGraph,
    ast::{CompareOp, Condition, ConditionalGoto, Instruction, Statement, StatementBlock},
    bytecode::Terminator,
    structuring::{
        conditions::branch_condition,
        stack::{ExprStack, StackSimulator},
    },
    utils::graph::NodeId,
    DecompilerConfig, Error, Result,
};

/// Appends the flat rendering of `cfg` to `body`.
///
/// # Errors
///
/// Returns [`Error::Malformed`] on stack underflow and
/// [`Error::Unstructurable`] when a value crosses a block boundary or a switch
/// key has side effects.
pub(crate) fn flatten(
    config: &DecompilerConfig,
    cfg: &ControlFlowGraph<'_>,
    mut body: StatementBlock,
) -> Result<StatementBlock> {
    let sim = StackSimulator::new(config);

    for index in 0..cfg.block_count() {
        let node = NodeId::new(index);
        if !cfg.is_reachable(node) {
            trace!("fallback skips unreachable block {index}");
            continue;
        }
        flat_block(&sim, cfg, node, &mut body)?;
    }
    Ok(body)
}

/// Appends one block as a label, its statements and explicit jumps.
///
/// Returns the blocks the appended jumps target.
///
/// # Errors
///
/// Same as [`flatten`].
pub(crate) fn flat_block(
    sim: &StackSimulator<'_>,
    cfg: &ControlFlowGraph<'_>,
    node: NodeId,
    body: &mut StatementBlock,
) -> Result<Vec<NodeId>> {
    let index = node.index();
    let block = cfg
        .block(node)
        .ok_or_else(|| Error::GraphError(format!("block {index} out of range")))?;

    body.append(Statement::Label(index))?;
    let mut stack = ExprStack::new();
    sim.run(&block.insns, body, &mut stack)?;

    let mut targets = Vec::new();
    match &block.terminator {
        Terminator::Goto(target) => {
            body.append(Statement::Goto(*target))?;
            targets.push(*target);
        }
        Terminator::Return => body.append(Statement::Return(None))?,
        Terminator::ReturnValue => {
            let value = stack.pop()?;
            body.append(Statement::Return(Some(value)))?;
        }
        Terminator::Throw => {
            let value = stack.pop()?;
            body.append(Statement::Throw(value))?;
        }
        Terminator::Branch {
            kind,
            taken,
            fallthrough,
        } => {
            let condition = branch_condition(*kind, &mut stack)?;
            body.append(Statement::ConditionalGoto(ConditionalGoto {
                condition,
                target: *taken,
            }))?;
            body.append(Statement::Goto(*fallthrough))?;
            targets.extend([*taken, *fallthrough]);
        }
        Terminator::Switch { cases, default } => {
            let key = stack.pop()?;
            if key.has_side_effects() {
                return Err(Error::Unstructurable(format!(
                    "switch key {key} in block {index} has side effects"
                )));
            }
            for (value, target) in cases {
                body.append(Statement::ConditionalGoto(ConditionalGoto {
                    condition: Condition::compare(
                        key.clone(),
                        CompareOp::Eq,
                        Instruction::int(*value),
                    ),
                    target: *target,
                }))?;
                targets.push(*target);
            }
            body.append(Statement::Goto(*default))?;
            targets.push(*default);
        }
    }

    if !stack.is_empty() {
        return Err(Error::Unstructurable(format!(
            "{} values cross the end of block {index}",
            stack.len()
        )));
    }
    Ok(targets.into_iter().map(NodeId::new).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::{BlockKind, LocalVariable},
        bytecode::{BasicBlock, BranchKind, Insn},
    };

    #[test]
    fn test_flatten_branch() {
        let blocks = vec![
            BasicBlock::new(
                vec![Insn::Load {
                    local: 1,
                    ty: "I".into(),
                }],
                Terminator::Branch {
                    kind: BranchKind::IfZero(CompareOp::Eq),
                    taken: 2,
                    fallthrough: 1,
                },
            ),
            BasicBlock::new(vec![], Terminator::Goto(2)),
            BasicBlock::new(vec![], Terminator::Return),
        ];
        let cfg = ControlFlowGraph::from_blocks_ref(&blocks).unwrap();
        let mut body = StatementBlock::new(BlockKind::Method);
        body.locals_mut()
            .unwrap()
            .declare(LocalVariable::new(1, "x", "I"));

        let flat = flatten(&DecompilerConfig::default(), &cfg, body).unwrap();
        let rendered = flat.to_string();
        assert!(rendered.contains("label_0:"));
        assert!(rendered.contains("if (x == 0) goto label_2;"));
        assert!(rendered.contains("goto label_1;"));
        assert!(rendered.contains("return;"));
    }

    #[test]
    fn test_value_across_blocks_fails() {
        let blocks = vec![
            BasicBlock::new(vec![Insn::Const(crate::ast::Constant::Int(1))], Terminator::Goto(1)),
            BasicBlock::new(vec![], Terminator::ReturnValue),
        ];
        let cfg = ControlFlowGraph::from_blocks_ref(&blocks).unwrap();
        let result = flatten(
            &DecompilerConfig::default(),
            &cfg,
            StatementBlock::new(BlockKind::Method),
        );
        assert!(matches!(result, Err(Error::Unstructurable(_))));
    }
}
