//! Region-based control flow structuring.
//!
//! [`Structurer`] walks the control flow graph from the entry block and emits
//! one statement tree. Each region is a run of blocks between a start block
//! and a stop block:
//!
//! - straight-line blocks are simulated into the current scope
//! - a two-way branch becomes a ternary, an `if` / `if-else` closed at the
//!   branch's immediate post-dominator, or a guarded `if` around an arm that
//!   never rejoins
//! - a loop header becomes `while`, `for`, `do-while` or `while (true)`
//! - a switch becomes a `switch` whose arms end at the next arm or the follow
//!
//! Jumps are resolved against a stack of enclosing loop and switch frames into
//! `continue` or `break`. A jump that no frame can express becomes a `goto`
//! when [`fallback_on_failure`](crate::DecompilerConfig::fallback_on_failure)
//! is set, and makes the method [`Error::Unstructurable`] otherwise. Blocks
//! that only gotos reach are appended after the structured code in their flat
//! form, and every goto target receives a label. Placing labels can need a
//! second pass, since a target may already have been emitted unlabeled.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, trace};
use rustc_hash::FxHashSet;

use crate::{
    analysis::cfg::{ControlFlowGraph, LoopInfo, LoopType},
    ast::{
        BlockKind, Condition, ConditionalGoto, DoWhile, ForLoop, If, Instruction, Lvalue,
        Statement, StatementBlock, Switch, SwitchCase, While,
    },
    bytecode::{BasicBlock, BranchKind, Terminator},
    structuring::{
        conditions::{branch_condition, BranchTest, ConditionFolder},
        fallback,
        stack::{ExprStack, StackSimulator},
        StructuringContext,
    },
    utils::graph::NodeId,
    Error, Result,
};

/// Where control goes after a block; `None` when it leaves the method.
type Next = Option<NodeId>;

/// An enclosing construct that jumps can target.
#[derive(Debug)]
enum Frame {
    Loop {
        header: NodeId,
        continue_target: NodeId,
        body: FxHashSet<NodeId>,
        follow: Option<NodeId>,
    },
    Switch {
        follow: Option<NodeId>,
    },
}

impl Frame {
    fn follow(&self) -> Option<NodeId> {
        match self {
            Frame::Loop { follow, .. } | Frame::Switch { follow } => *follow,
        }
    }
}

/// How a control transfer to a block is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Jump {
    /// Structure the block in place
    Enter,
    /// The block ends the current region
    Stop,
    Continue,
    Break,
    /// Needs a label or goto
    Invalid,
}

/// A structured method body.
pub(crate) struct Structured {
    pub(crate) body: StatementBlock,
    /// `true` if some region fell back to labels and gotos
    pub(crate) has_gotos: bool,
}

/// Structures the whole graph into `body`.
///
/// # Errors
///
/// Returns [`Error::Unstructurable`] for control flow that needs a goto when
/// gotos are disabled, or when a goto target has no place for its label, and
/// propagates stack simulation errors.
pub(crate) fn structure(
    ctx: &StructuringContext,
    cfg: &ControlFlowGraph<'_>,
    body: &StatementBlock,
) -> Result<Structured> {
    let mut labels = FxHashSet::default();
    loop {
        let pass = Structurer::new(ctx, cfg, &labels);
        let (structured, unlabeled) = pass.run(body.copy())?;
        if unlabeled.is_empty() {
            return Ok(structured);
        }
        let before = labels.len();
        labels.extend(unlabeled.iter().copied());
        if labels.len() == before {
            return Err(Error::Unstructurable(format!(
                "goto targets {unlabeled:?} have no place for a label"
            )));
        }
        trace!("restructuring with labels at {labels:?}");
    }
}

/// Structures one method's control flow graph.
struct Structurer<'a, 'g> {
    ctx: &'a StructuringContext,
    cfg: &'a ControlFlowGraph<'g>,
    sim: StackSimulator<'a>,
    emitted: Vec<bool>,
    frames: Vec<Frame>,
    /// Blocks that need a label where they are emitted
    labels: &'a FxHashSet<NodeId>,
    placed: FxHashSet<NodeId>,
    targets: BTreeSet<NodeId>,
}

impl<'a, 'g> Structurer<'a, 'g> {
    fn new(
        ctx: &'a StructuringContext,
        cfg: &'a ControlFlowGraph<'g>,
        labels: &'a FxHashSet<NodeId>,
    ) -> Self {
        Structurer {
            ctx,
            cfg,
            sim: StackSimulator::new(ctx.config()),
            emitted: vec![false; cfg.block_count()],
            frames: Vec::new(),
            labels,
            placed: FxHashSet::default(),
            targets: BTreeSet::new(),
        }
    }

    /// Runs one pass and returns the goto targets that did not get a label.
    fn run(mut self, mut body: StatementBlock) -> Result<(Structured, Vec<NodeId>)> {
        if !self.gotos_allowed() {
            let irreducible = self.cfg.irreducible_edges();
            if !irreducible.is_empty() {
                return Err(Error::Unstructurable(format!(
                    "irreducible control flow, retreating edges {irreducible:?}"
                )));
            }
        }

        let mut stack = ExprStack::new();
        self.structure_region(self.cfg.entry(), None, &mut body, &mut stack)?;

        let tail: Vec<NodeId> = (0..self.cfg.block_count())
            .map(NodeId::new)
            .filter(|&n| !self.is_emitted(n) && self.cfg.is_reachable(n))
            .collect();
        if tail.is_empty() || !self.gotos_allowed() {
            if matches!(body.last(), Some(Statement::Return(None))) {
                body.pop_last()?;
            }
            if !tail.is_empty() {
                debug!("{} reachable blocks were never emitted", tail.len());
            }
        } else {
            debug!("{} blocks only reached through goto", tail.len());
            for node in tail {
                self.mark(node);
                self.placed.insert(node);
                let jumps = fallback::flat_block(&self.sim, self.cfg, node, &mut body)?;
                self.targets.extend(jumps);
            }
        }

        let unlabeled = self
            .targets
            .iter()
            .copied()
            .filter(|target| !self.placed.contains(target))
            .collect();
        let structured = Structured {
            body,
            has_gotos: !self.targets.is_empty(),
        };
        Ok((structured, unlabeled))
    }

    fn gotos_allowed(&self) -> bool {
        self.ctx.config().fallback_on_failure
    }

    /// Ends the current region with `goto target`.
    fn emit_goto(
        &mut self,
        target: NodeId,
        scope: &mut StatementBlock,
        stack: &ExprStack,
    ) -> Result<()> {
        if !self.gotos_allowed() {
            return Err(Error::Unstructurable(format!(
                "jump to block {target} cannot be expressed without a label"
            )));
        }
        if !stack.is_empty() {
            return Err(Error::Unstructurable(format!(
                "{} values on the stack at the jump to block {target}",
                stack.len()
            )));
        }
        debug!("goto block {target}");
        self.targets.insert(target);
        scope.append(Statement::Goto(target.index()))
    }

    fn place_label(
        &mut self,
        node: NodeId,
        scope: &mut StatementBlock,
        stack: &ExprStack,
    ) -> Result<()> {
        if !stack.is_empty() {
            return Err(Error::Unstructurable(format!(
                "goto target {node} is entered with values on the stack"
            )));
        }
        self.placed.insert(node);
        scope.append(Statement::Label(node.index()))
    }

    fn block(&self, node: NodeId) -> Result<&'a BasicBlock> {
        let cfg = self.cfg;
        cfg.block(node)
            .ok_or_else(|| Error::GraphError(format!("block {node} out of range")))
    }

    fn is_emitted(&self, node: NodeId) -> bool {
        self.emitted.get(node.index()).copied().unwrap_or(false)
    }

    fn mark(&mut self, node: NodeId) {
        if let Some(flag) = self.emitted.get_mut(node.index()) {
            *flag = true;
        }
    }

    fn innermost_loop(&self) -> Option<&Frame> {
        self.frames
            .iter()
            .rev()
            .find(|frame| matches!(frame, Frame::Loop { .. }))
    }

    fn in_current_loop(&self, node: NodeId) -> bool {
        match self.innermost_loop() {
            Some(Frame::Loop { body, .. }) => body.contains(&node),
            _ => true,
        }
    }

    fn is_active_header(&self, node: NodeId) -> bool {
        self.frames
            .iter()
            .any(|frame| matches!(frame, Frame::Loop { header, .. } if *header == node))
    }

    fn is_loop_header(&self, node: NodeId) -> bool {
        self.cfg.loops().loop_for_header(node).is_some()
    }

    /// Returns `true` if every block reachable from `node` is dominated by it,
    /// so the blocks can be emitted wherever `node` is first reached.
    fn is_private_tail(&self, node: NodeId) -> bool {
        let mut seen = FxHashSet::default();
        let mut work = vec![node];
        while let Some(current) = work.pop() {
            if !seen.insert(current) {
                continue;
            }
            if !self.cfg.dominates(node, current) {
                return false;
            }
            work.extend(self.cfg.successors(current));
        }
        true
    }

    fn jump(&self, target: NodeId, stop: Option<NodeId>) -> Jump {
        if stop == Some(target) {
            return Jump::Stop;
        }
        if let Some(Frame::Loop {
            continue_target, ..
        }) = self.innermost_loop()
        {
            if *continue_target == target {
                return Jump::Continue;
            }
        }
        if self.frames.last().and_then(Frame::follow) == Some(target) {
            return Jump::Break;
        }
        let outer_target = self.frames.iter().any(|frame| {
            frame.follow() == Some(target)
                || matches!(frame, Frame::Loop { continue_target, .. } if *continue_target == target)
        });
        if outer_target {
            return Jump::Invalid;
        }
        if !self.in_current_loop(target) && !self.is_private_tail(target) {
            return Jump::Invalid;
        }
        if self.is_emitted(target) {
            return Jump::Invalid;
        }
        Jump::Enter
    }

    /// Structures blocks from `start` until `stop`, a `continue`/`break`, or
    /// the end of the method.
    fn structure_region(
        &mut self,
        start: NodeId,
        stop: Option<NodeId>,
        scope: &mut StatementBlock,
        stack: &mut ExprStack,
    ) -> Result<()> {
        let mut current = start;
        loop {
            match self.jump(current, stop) {
                Jump::Stop => return Ok(()),
                Jump::Continue => return scope.append(Statement::Continue),
                Jump::Break => return scope.append(Statement::Break),
                Jump::Invalid => return self.emit_goto(current, scope, stack),
                Jump::Enter => {}
            }

            trace!("entering block {current}");
            if self.labels.contains(&current) {
                self.place_label(current, scope, stack)?;
            }
            let next = if self.is_loop_header(current) && !self.is_active_header(current) {
                self.structure_loop(current, scope, stack)?
            } else {
                self.structure_block(current, stop, scope, stack)?
            };
            match next {
                Some(next) => current = next,
                None => return Ok(()),
            }
        }
    }

    fn structure_block(
        &mut self,
        node: NodeId,
        stop: Option<NodeId>,
        scope: &mut StatementBlock,
        stack: &mut ExprStack,
    ) -> Result<Next> {
        self.mark(node);
        let block = self.block(node)?;
        self.sim.run(&block.insns, scope, stack)?;

        match &block.terminator {
            Terminator::Goto(target) => Ok(Some(NodeId::new(*target))),
            Terminator::Return => {
                scope.append(Statement::Return(None))?;
                Ok(None)
            }
            Terminator::ReturnValue => {
                let value = stack.pop()?;
                scope.append(Statement::Return(Some(value)))?;
                Ok(None)
            }
            Terminator::Throw => {
                let value = stack.pop()?;
                scope.append(Statement::Throw(value))?;
                Ok(None)
            }
            Terminator::Branch {
                kind,
                taken,
                fallthrough,
            } => self.structure_branch(
                node,
                *kind,
                NodeId::new(*taken),
                NodeId::new(*fallthrough),
                stop,
                scope,
                stack,
            ),
            Terminator::Switch { cases, default } => {
                self.structure_switch(node, cases, NodeId::new(*default), stop, scope, stack)
            }
        }
    }

    fn folder(&self) -> ConditionFolder<'_, 'a, 'g> {
        ConditionFolder::new(self.cfg, &self.sim, self.ctx.config().max_condition_chain)
    }

    fn fold_chain(
        &self,
        head: BranchTest,
        chain: &mut Vec<NodeId>,
        stop: Option<NodeId>,
        scope: &StatementBlock,
    ) -> BranchTest {
        self.folder().fold(head, chain, scope, |node| {
            self.jump(node, stop) == Jump::Enter
                && !self.is_loop_header(node)
                && self.in_current_loop(node)
        })
    }

    fn structure_branch(
        &mut self,
        node: NodeId,
        kind: BranchKind,
        taken: NodeId,
        fallthrough: NodeId,
        stop: Option<NodeId>,
        scope: &mut StatementBlock,
        stack: &mut ExprStack,
    ) -> Result<Next> {
        let condition = branch_condition(kind, stack)?;
        let mut chain = vec![node];
        let test = self.fold_chain(
            BranchTest {
                condition,
                taken,
                fallthrough,
            },
            &mut chain,
            stop,
            scope,
        );
        for member in &chain {
            self.mark(*member);
        }

        if self.ctx.config().recover_ternaries {
            if let Some(next) = self.recover_ternary(&test, &chain, stop, scope, stack)? {
                return Ok(next);
            }
        }
        if !stack.is_empty() {
            return Err(Error::Unstructurable(format!(
                "{} values left on the stack at the branch in block {node}",
                stack.len()
            )));
        }

        let merge = self
            .cfg
            .ipdom(node)
            .filter(|merge| self.usable_merge(*merge, stop));
        match merge {
            // loop follow: emit `if (c) break;` when an arm is closed
            Some(merge) if self.jump(merge, stop) == Jump::Break => {
                match self.guarded_arm(&test, stop) {
                    Some(guard) => self.emit_guarded(test, guard, stop, scope),
                    None => self.emit_if_else(test, merge, scope),
                }
            }
            Some(merge) => self.emit_if_else(test, merge, scope),
            None => match self.guarded_arm(&test, stop) {
                Some(guard) => self.emit_guarded(test, guard, stop, scope),
                None if self.gotos_allowed() => {
                    debug!("branch in block {node} falls back to goto {}", test.taken);
                    self.targets.insert(test.taken);
                    scope.append(Statement::ConditionalGoto(ConditionalGoto {
                        condition: test.condition,
                        target: test.taken.index(),
                    }))?;
                    Ok(Some(test.fallthrough))
                }
                None => Err(Error::Unstructurable(format!(
                    "no structured form for the branch in block {node}"
                ))),
            },
        }
    }

    /// Emits `if` or `if-else` with both arms closed at `merge`.
    fn emit_if_else(
        &mut self,
        test: BranchTest,
        merge: NodeId,
        scope: &mut StatementBlock,
    ) -> Result<Next> {
        let (condition, then_start, else_start) = if test.fallthrough == merge {
            (test.condition, test.taken, None)
        } else if test.taken == merge {
            (test.condition.invert(), test.fallthrough, None)
        } else {
            (test.condition.invert(), test.fallthrough, Some(test.taken))
        };

        let body = self.arm(then_start, Some(merge), scope)?;
        let else_body = match else_start {
            Some(start) => Some(self.arm(start, Some(merge), scope)?),
            None => None,
        };
        scope.append(Statement::If(If {
            condition,
            body,
            else_body,
        }))?;
        Ok(Some(merge))
    }

    /// Picks the arm that never rejoins the other one, smallest first.
    ///
    /// Returns `(arm, other, arm_is_taken)`.
    fn guarded_arm(&self, test: &BranchTest, stop: Option<NodeId>) -> Option<(NodeId, NodeId, bool)> {
        let stop = self.guard_stop(stop);
        [
            (test.fallthrough, test.taken, false),
            (test.taken, test.fallthrough, true),
        ]
        .into_iter()
        .filter_map(|(arm, other, is_taken)| {
            self.closed_arm_size(arm, other, stop)
                .map(|size| (size, (arm, other, is_taken)))
        })
        .min_by_key(|(size, _)| *size)
        .map(|(_, guard)| guard)
    }

    /// Emits `if (cond) { arm }` and continues with the other target.
    fn emit_guarded(
        &mut self,
        test: BranchTest,
        (arm, other, is_taken): (NodeId, NodeId, bool),
        stop: Option<NodeId>,
        scope: &mut StatementBlock,
    ) -> Result<Next> {
        let condition = if is_taken {
            test.condition
        } else {
            test.condition.invert()
        };
        let body = self.arm(arm, self.guard_stop(stop), scope)?;
        scope.append(Statement::If(If {
            condition,
            body,
            else_body: None,
        }))?;
        Ok(Some(other))
    }

    /// A guarded arm never falls back into the region, so reaching the
    /// innermost continue target from it is an explicit `continue`.
    fn guard_stop(&self, stop: Option<NodeId>) -> Option<NodeId> {
        match self.innermost_loop() {
            Some(Frame::Loop {
                continue_target, ..
            }) if stop == Some(*continue_target) => None,
            _ => stop,
        }
    }

    fn usable_merge(&self, merge: NodeId, stop: Option<NodeId>) -> bool {
        match self.jump(merge, stop) {
            Jump::Stop | Jump::Continue | Jump::Break => true,
            Jump::Enter => self.in_current_loop(merge),
            Jump::Invalid => false,
        }
    }

    /// Returns the number of blocks reachable from `arm` before control
    /// leaves through a `continue`, `break` or exit, or `None` if the arm
    /// reaches `other` or the region stop.
    fn closed_arm_size(&self, arm: NodeId, other: NodeId, stop: Option<NodeId>) -> Option<usize> {
        if arm == other {
            return None;
        }
        match self.jump(arm, stop) {
            Jump::Continue | Jump::Break => return Some(0),
            Jump::Stop | Jump::Invalid => return None,
            Jump::Enter => {}
        }

        let mut seen = FxHashSet::default();
        seen.insert(arm);
        let mut work = vec![arm];
        while let Some(current) = work.pop() {
            for succ in self.cfg.successors(current) {
                if succ == other || Some(succ) == stop {
                    return None;
                }
                if !seen.insert(succ) {
                    continue;
                }
                match self.jump(succ, stop) {
                    Jump::Enter => work.push(succ),
                    Jump::Continue | Jump::Break => {}
                    Jump::Stop | Jump::Invalid => {
                        // back edges to headers inside the arm are fine
                        if !(self.is_loop_header(succ) && self.cfg.dominates(arm, succ)) {
                            return None;
                        }
                    }
                }
            }
        }
        Some(seen.len())
    }

    /// Structures one arm of a conditional into a fresh scope.
    fn arm(
        &mut self,
        start: NodeId,
        stop: Option<NodeId>,
        scope: &StatementBlock,
    ) -> Result<StatementBlock> {
        let mut body = scope.child(BlockKind::If);
        let mut stack = ExprStack::new();
        self.structure_region(start, stop, &mut body, &mut stack)?;
        if !stack.is_empty() {
            return Err(Error::Unstructurable(format!(
                "conditional arm starting at block {start} leaves values on the stack"
            )));
        }
        body.lock()?;
        Ok(body)
    }

    fn make_ternary(
        &self,
        condition: Condition,
        true_value: Instruction,
        false_value: Instruction,
    ) -> Instruction {
        let ternary = Instruction::ternary(condition, true_value, false_value);
        if let Instruction::Ternary(node) = &ternary {
            if let Some((true_type, false_type)) = node.type_conflict() {
                if !self.ctx.types().is_assignable(&false_type, &true_type) {
                    debug!(
                        "ternary arms disagree ({true_type} vs {false_type}), typed as {true_type}"
                    );
                }
            }
        }
        ternary
    }

    /// Returns `true` if every predecessor of `node` is one of `from`.
    fn only_reached_from(&self, node: NodeId, from: &[NodeId]) -> bool {
        self.cfg.predecessors(node).all(|pred| from.contains(&pred))
    }

    /// Simulates `node` on a scratch scope and empty stack.
    fn scratch(&self, node: NodeId, scope: &StatementBlock) -> Option<(StatementBlock, ExprStack)> {
        let block = self.block(node).ok()?;
        let mut scratch = scope.child(BlockKind::Block);
        let mut stack = ExprStack::new();
        self.sim.run(&block.insns, &mut scratch, &mut stack).ok()?;
        Some((scratch, stack))
    }

    /// Recognizes an arm that only computes a value and jumps to a merge
    /// block, including nested conditional values.
    fn value_arm(
        &self,
        node: NodeId,
        from: &[NodeId],
        stop: Option<NodeId>,
        scope: &StatementBlock,
        visited: &mut Vec<NodeId>,
    ) -> Option<(Instruction, NodeId)> {
        if self.jump(node, stop) != Jump::Enter
            || self.is_loop_header(node)
            || !self.only_reached_from(node, from)
        {
            return None;
        }

        match &self.block(node).ok()?.terminator {
            Terminator::Goto(merge) => {
                let (scratch, mut stack) = self.scratch(node, scope)?;
                if !scratch.is_empty() || stack.len() != 1 {
                    return None;
                }
                visited.push(node);
                Some((stack.pop().ok()?, NodeId::new(*merge)))
            }
            Terminator::Branch { .. } => {
                let folder = self.folder();
                let head = folder.pure_test(node, scope)?;
                let mut chain = vec![node];
                let test = folder.fold(head, &mut chain, scope, |n| {
                    self.jump(n, stop) == Jump::Enter && !self.is_loop_header(n)
                });
                let (taken_value, taken_merge) =
                    self.value_arm(test.taken, &chain, stop, scope, visited)?;
                let (fall_value, fall_merge) =
                    self.value_arm(test.fallthrough, &chain, stop, scope, visited)?;
                if taken_merge != fall_merge {
                    return None;
                }
                visited.extend(chain);
                let value = self.make_ternary(test.condition.invert(), fall_value, taken_value);
                Some((value, taken_merge))
            }
            _ => None,
        }
    }

    /// Collapses a branch into a conditional expression when both arms only
    /// produce a value, assign the same destination, or return a value.
    fn recover_ternary(
        &mut self,
        test: &BranchTest,
        chain: &[NodeId],
        stop: Option<NodeId>,
        scope: &mut StatementBlock,
        stack: &mut ExprStack,
    ) -> Result<Option<Next>> {
        if test.taken == test.fallthrough {
            return Ok(None);
        }

        let mut visited = Vec::new();
        let taken = self.value_arm(test.taken, chain, stop, scope, &mut visited);
        let fall = self.value_arm(test.fallthrough, chain, stop, scope, &mut visited);
        if let (Some((taken_value, taken_merge)), Some((fall_value, fall_merge))) = (taken, fall) {
            if taken_merge == fall_merge
                && taken_merge != test.taken
                && taken_merge != test.fallthrough
            {
                debug!("value ternary merging at block {taken_merge}");
                for node in visited {
                    self.mark(node);
                }
                let value = self.make_ternary(test.condition.clone().invert(), fall_value, taken_value);
                stack.push(value);
                return Ok(Some(Some(taken_merge)));
            }
        }
        if !stack.is_empty() {
            return Ok(None);
        }

        let arms = [test.fallthrough, test.taken];
        if arms.iter().any(|&arm| {
            self.jump(arm, stop) != Jump::Enter
                || self.is_loop_header(arm)
                || !self.only_reached_from(arm, chain)
        }) {
            return Ok(None);
        }
        let mut shapes = Vec::with_capacity(2);
        for arm in arms {
            let Some(terminator) = self.block(arm).ok().map(|b| &b.terminator) else {
                return Ok(None);
            };
            let Some((mut scratch, mut arm_stack)) = self.scratch(arm, scope) else {
                return Ok(None);
            };
            shapes.push(match terminator {
                Terminator::Goto(merge) if scratch.len() == 1 && arm_stack.is_empty() => {
                    match scratch.pop_last()? {
                        Statement::Assignment(assign) => ArmShape::Assign(assign.target, assign.value, NodeId::new(*merge)),
                        _ => return Ok(None),
                    }
                }
                Terminator::ReturnValue if scratch.is_empty() && arm_stack.len() == 1 => {
                    ArmShape::Return(arm_stack.pop()?)
                }
                _ => return Ok(None),
            });
        }

        let mut shapes = shapes.into_iter();
        match (shapes.next(), shapes.next()) {
            (
                Some(ArmShape::Assign(fall_target, fall_value, fall_merge)),
                Some(ArmShape::Assign(taken_target, taken_value, taken_merge)),
            ) if fall_target == taken_target && fall_merge == taken_merge => {
                debug!("assignment ternary merging at block {fall_merge}");
                self.mark(test.fallthrough);
                self.mark(test.taken);
                let value = self.make_ternary(test.condition.clone().invert(), fall_value, taken_value);
                scope.append(Statement::assign(fall_target, value))?;
                Ok(Some(Some(fall_merge)))
            }
            (Some(ArmShape::Return(fall_value)), Some(ArmShape::Return(taken_value))) => {
                self.mark(test.fallthrough);
                self.mark(test.taken);
                let value = self.make_ternary(test.condition.clone().invert(), fall_value, taken_value);
                scope.append(Statement::Return(Some(value)))?;
                Ok(Some(None))
            }
            _ => Ok(None),
        }
    }

    /// Returns the test of a loop header that only evaluates its condition,
    /// oriented so that the condition selects the block inside the loop.
    fn loop_test(
        &self,
        header: NodeId,
        body: &FxHashSet<NodeId>,
        scope: &StatementBlock,
    ) -> Option<(Condition, NodeId, NodeId, Vec<NodeId>)> {
        let folder = self.folder();
        let head = folder.pure_test(header, scope)?;
        let mut chain = vec![header];
        let test = folder.fold(head, &mut chain, scope, |node| {
            node != header
                && body.contains(&node)
                && !self.is_emitted(node)
                && !self.is_loop_header(node)
        });

        let taken_inside = body.contains(&test.taken);
        let fall_inside = body.contains(&test.fallthrough);
        match (taken_inside, fall_inside) {
            (true, false) => Some((test.condition, test.taken, test.fallthrough, chain)),
            (false, true) => Some((test.condition.invert(), test.fallthrough, test.taken, chain)),
            _ => None,
        }
    }

    fn structure_loop(
        &mut self,
        header: NodeId,
        scope: &mut StatementBlock,
        stack: &mut ExprStack,
    ) -> Result<Next> {
        if !stack.is_empty() {
            return Err(Error::Unstructurable(format!(
                "loop at block {header} entered with values on the stack"
            )));
        }
        let cfg = self.cfg;
        let info = cfg
            .loops()
            .loop_for_header(header)
            .ok_or_else(|| Error::GraphError(format!("block {header} is not a loop header")))?;

        let (pre_tested, post_tested) = match info.loop_type {
            LoopType::PreTested => (true, false),
            LoopType::PostTested => (false, true),
            LoopType::Complex => (true, true),
            LoopType::Infinite => (false, false),
        };
        if pre_tested {
            if let Some(next) = self.while_loop(info, scope)? {
                return Ok(next);
            }
        }
        if post_tested {
            if let Some(next) = self.do_while_loop(info, scope)? {
                return Ok(next);
            }
        }
        self.endless_loop(info, scope)
    }

    /// `while (cond) { ... }`, or `for` when the preheader initializes the
    /// counter. `None` if the header does more than test.
    fn while_loop(&mut self, info: &LoopInfo, scope: &mut StatementBlock) -> Result<Option<Next>> {
        let header = info.header;
        let Some((condition, inside, outside, chain)) = self.loop_test(header, &info.body, scope)
        else {
            return Ok(None);
        };
        debug!("while loop at block {header}, follow {outside}");
        for member in &chain {
            self.mark(*member);
        }
        self.frames.push(Frame::Loop {
            header,
            continue_target: header,
            body: info.body.clone(),
            follow: Some(outside),
        });
        let mut body = scope.child(BlockKind::Loop);
        let result = self.loop_body(inside, Some(header), &mut body);
        self.frames.pop();
        result?;

        let statement = self.promote_for(condition, body, info.preheader.is_some(), scope)?;
        scope.append(statement)?;
        Ok(Some(Some(outside)))
    }

    /// `do { ... } while (cond);` closed by the single latch. `None` if the
    /// latch does not branch between the header and the outside.
    fn do_while_loop(&mut self, info: &LoopInfo, scope: &mut StatementBlock) -> Result<Option<Next>> {
        let header = info.header;
        let Some(latch) = info.single_latch() else {
            return Ok(None);
        };
        let Terminator::Branch {
            kind,
            taken,
            fallthrough,
        } = &self.block(latch)?.terminator
        else {
            return Ok(None);
        };
        let (taken, fallthrough) = (NodeId::new(*taken), NodeId::new(*fallthrough));
        let outside = if taken == header && !info.contains(fallthrough) {
            fallthrough
        } else if fallthrough == header && !info.contains(taken) {
            taken
        } else {
            return Ok(None);
        };

        debug!("do-while loop at block {header}, latch {latch}, follow {outside}");
        self.frames.push(Frame::Loop {
            header,
            continue_target: latch,
            body: info.body.clone(),
            follow: Some(outside),
        });
        let mut body = scope.child(BlockKind::Loop);
        let result = self.do_while_body(header, latch, *kind, &mut body);
        self.frames.pop();
        let condition = result?;
        let condition = if taken == header {
            condition
        } else {
            condition.invert()
        };
        body.lock()?;
        scope.append(Statement::DoWhile(DoWhile { condition, body }))?;
        Ok(Some(Some(outside)))
    }

    /// `while (true) { ... }` left through `break`.
    fn endless_loop(&mut self, info: &LoopInfo, scope: &mut StatementBlock) -> Result<Next> {
        let header = info.header;
        let follow = self.loop_follow(&info.exit_blocks());
        debug!("endless loop at block {header}, follow {follow:?}");

        self.frames.push(Frame::Loop {
            header,
            continue_target: header,
            body: info.body.clone(),
            follow,
        });
        let mut body = scope.child(BlockKind::Loop);
        let result = self.endless_body(header, &mut body);
        self.frames.pop();
        result?;

        if matches!(body.last(), Some(Statement::Continue)) {
            body.pop_last()?;
        }
        body.lock()?;
        scope.append(Statement::While(While {
            condition: Condition::always(),
            body,
        }))?;
        Ok(follow)
    }

    fn loop_body(
        &mut self,
        start: NodeId,
        stop: Option<NodeId>,
        body: &mut StatementBlock,
    ) -> Result<()> {
        let mut stack = ExprStack::new();
        self.structure_region(start, stop, body, &mut stack)?;
        if stack.is_empty() {
            Ok(())
        } else {
            Err(Error::Unstructurable(format!(
                "loop body starting at block {start} leaves values on the stack"
            )))
        }
    }

    fn do_while_body(
        &mut self,
        header: NodeId,
        latch: NodeId,
        kind: BranchKind,
        body: &mut StatementBlock,
    ) -> Result<Condition> {
        if latch != header {
            self.loop_body(header, Some(latch), body)?;
        }
        self.mark(header);
        self.mark(latch);

        let mut stack = ExprStack::new();
        self.sim.run(&self.block(latch)?.insns, body, &mut stack)?;
        let condition = branch_condition(kind, &mut stack)?;
        if !stack.is_empty() {
            return Err(Error::Unstructurable(format!(
                "loop condition in block {latch} leaves values on the stack"
            )));
        }
        Ok(condition)
    }

    fn endless_body(&mut self, header: NodeId, body: &mut StatementBlock) -> Result<()> {
        let mut stack = ExprStack::new();
        if let Some(next) = self.structure_block(header, None, body, &mut stack)? {
            self.structure_region(next, None, body, &mut stack)?;
        }
        if stack.is_empty() {
            Ok(())
        } else {
            Err(Error::Unstructurable(format!(
                "loop at block {header} leaves values on the stack"
            )))
        }
    }

    /// Picks the block control reaches after an endless loop: the only exit,
    /// the only exit that is not a private tail, or the exit every other
    /// exit flows into.
    fn loop_follow(&self, exits: &[NodeId]) -> Option<NodeId> {
        if let [single] = exits {
            return Some(*single);
        }
        let shared: Vec<NodeId> = exits
            .iter()
            .copied()
            .filter(|exit| !self.is_private_tail(*exit))
            .collect();
        if let [single] = shared.as_slice() {
            return Some(*single);
        }
        shared.iter().copied().find(|candidate| {
            shared
                .iter()
                .all(|other| other == candidate || self.reaches(*other, *candidate))
        })
    }

    fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        let mut seen = FxHashSet::default();
        let mut work = vec![from];
        while let Some(current) = work.pop() {
            if current == to {
                return true;
            }
            if seen.insert(current) {
                work.extend(self.cfg.successors(current));
            }
        }
        false
    }

    /// Turns `init; while (cond) { ...; update; }` into a `for` loop when the
    /// initializer, condition and update all concern the same local. The
    /// initializer must be the last statement before a loop entered only from
    /// its preheader.
    fn promote_for(
        &self,
        condition: Condition,
        mut body: StatementBlock,
        has_preheader: bool,
        scope: &mut StatementBlock,
    ) -> Result<Statement> {
        if self.ctx.config().recover_for_loops && has_preheader {
            let counter = match scope.last() {
                Some(init @ Statement::Assignment(_)) => init.assigned_local(),
                _ => None,
            };
            if let Some(slot) = counter {
                let updates_counter = body.last().and_then(Statement::assigned_local) == Some(slot);
                if condition.references_local(slot) && updates_counter && !has_own_continue(&body) {
                    debug!("promoting loop over local {slot} to for");
                    let incr = body.pop_last()?;
                    let init = scope.pop_last()?;
                    body.lock()?;
                    return Ok(Statement::For(ForLoop {
                        init: Some(Box::new(init)),
                        condition,
                        incr: Some(Box::new(incr)),
                        body,
                    }));
                }
            }
        }
        body.lock()?;
        Ok(Statement::While(While { condition, body }))
    }

    fn structure_switch(
        &mut self,
        node: NodeId,
        cases: &[(i32, usize)],
        default: NodeId,
        stop: Option<NodeId>,
        scope: &mut StatementBlock,
        stack: &mut ExprStack,
    ) -> Result<Next> {
        let value = stack.pop()?;
        if !stack.is_empty() {
            return Err(Error::Unstructurable(format!(
                "{} values left on the stack at the switch in block {node}",
                stack.len()
            )));
        }

        let follow = self.cfg.ipdom(node);
        let own_follow = follow.filter(|f| {
            Some(*f) == stop || (self.jump(*f, stop) == Jump::Enter && self.in_current_loop(*f))
        });

        let mut starts: BTreeMap<NodeId, (Vec<i32>, bool)> = BTreeMap::new();
        for (key, target) in cases {
            starts.entry(NodeId::new(*target)).or_default().0.push(*key);
        }
        if Some(default) != own_follow {
            starts.entry(default).or_default().1 = true;
        }
        let entries: Vec<(NodeId, Vec<i32>, bool)> = starts
            .into_iter()
            .map(|(start, (mut labels, is_default))| {
                labels.sort_unstable();
                (start, labels, is_default)
            })
            .collect();
        debug!(
            "switch at block {node} with {} arms, follow {follow:?}",
            entries.len()
        );

        self.frames.push(Frame::Switch { follow: own_follow });
        let result = self.switch_arms(&entries, own_follow, scope);
        self.frames.pop();
        let cases = result?;

        scope.append(Statement::Switch(Switch { value, cases }))?;
        Ok(follow)
    }

    fn switch_arms(
        &mut self,
        entries: &[(NodeId, Vec<i32>, bool)],
        follow: Option<NodeId>,
        scope: &StatementBlock,
    ) -> Result<Vec<SwitchCase>> {
        let mut cases = Vec::with_capacity(entries.len());
        for (index, (start, labels, is_default)) in entries.iter().enumerate() {
            let next = entries.get(index + 1).map(|entry| entry.0).or(follow);
            let mut body = scope.child(BlockKind::Switch);
            let mut breaks = false;

            if Some(*start) == follow {
                breaks = true;
            } else {
                let mut stack = ExprStack::new();
                self.structure_region(*start, next, &mut body, &mut stack)?;
                if !stack.is_empty() {
                    return Err(Error::Unstructurable(format!(
                        "switch arm at block {start} leaves values on the stack"
                    )));
                }
                if matches!(body.last(), Some(Statement::Break)) {
                    body.pop_last()?;
                    breaks = true;
                } else if next.is_some()
                    && next == follow
                    && !body.last().is_some_and(Statement::is_terminal)
                {
                    breaks = true;
                }
            }

            body.lock()?;
            cases.push(SwitchCase {
                labels: labels.clone(),
                is_default: *is_default,
                body,
                breaks,
            });
        }
        Ok(cases)
    }
}

/// Shape of a conditional arm that may collapse into a ternary.
enum ArmShape {
    Assign(Lvalue, Instruction, NodeId),
    Return(Instruction),
}

/// Returns `true` if `block` contains a `continue` that belongs to the loop
/// owning `block` rather than to a nested loop.
fn has_own_continue(block: &StatementBlock) -> bool {
    block.statements().any(|statement| match statement {
        Statement::Continue => true,
        Statement::If(stmt) => {
            has_own_continue(&stmt.body) || stmt.else_body.as_ref().is_some_and(has_own_continue)
        }
        Statement::Switch(stmt) => stmt.cases.iter().any(|case| has_own_continue(&case.body)),
        _ => false,
    })
}
