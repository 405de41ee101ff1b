//! The scope container.
//!
//! A [`StatementBlock`] is an ordered statement sequence plus the [`Locals`]
//! visible in that scope. It is used for method bodies, loop bodies, branch arms
//! and switch arms.
//!
//! # State machine
//!
//! ```text
//!   Open ──lock()──> Locked
//! ```
//!
//! While open, statements can be appended and the last statement can be popped
//! again; the structurer uses this to reshape a statement it appended
//! provisionally once a richer idiom becomes visible (`iinc i; load i` turning
//! into `++i`, a `for` header absorbing the initializer and the increment).
//! Once locked, every mutation fails with [`Error::InvalidContainerMutation`].
//!
//! # Copying
//!
//! Statements are held in an [`imbl::Vector`], so [`StatementBlock::copy`] is
//! O(1): the copy shares structure with the original until either side is
//! mutated. The locals table is deep-copied.

use std::fmt;

use imbl::Vector;
use strum::EnumIter;

use crate::{
    ast::{InstructionVisitor, Locals, Statement},
    Error, Result,
};

/// What kind of scope a block represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum BlockKind {
    /// Plain nested block
    Block,
    /// Arm of an `if`
    If,
    /// Body of a loop
    Loop,
    /// Method body
    Method,
    /// Arm of a `switch`
    Switch,
}

/// Mutation state of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockState {
    /// Accepts appends and pops
    Open,
    /// Finalized, read-only
    Locked,
}

/// An ordered, lockable sequence of statements with its own locals.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementBlock {
    kind: BlockKind,
    locals: Locals,
    statements: Vector<Statement>,
    state: BlockState,
}

impl StatementBlock {
    /// Creates an empty open block with no locals.
    #[must_use]
    pub fn new(kind: BlockKind) -> Self {
        Self::with_locals(kind, Locals::new())
    }

    /// Creates an empty open block with the given locals.
    #[must_use]
    pub fn with_locals(kind: BlockKind, locals: Locals) -> Self {
        StatementBlock {
            kind,
            locals,
            statements: Vector::new(),
            state: BlockState::Open,
        }
    }

    /// Creates an empty open child scope that starts from a copy of this
    /// block's locals.
    #[must_use]
    pub fn child(&self, kind: BlockKind) -> Self {
        Self::with_locals(kind, self.locals.clone())
    }

    /// Returns the kind of this block.
    #[must_use]
    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    /// Returns the mutation state.
    #[must_use]
    pub fn state(&self) -> BlockState {
        self.state
    }

    /// Returns `true` once the block has been locked.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.state == BlockState::Locked
    }

    /// Returns the locals of this scope.
    #[must_use]
    pub fn locals(&self) -> &Locals {
        &self.locals
    }

    /// Returns the locals for modification.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContainerMutation`] if the block is locked.
    pub fn locals_mut(&mut self) -> Result<&mut Locals> {
        self.ensure_open("modify locals of")?;
        Ok(&mut self.locals)
    }

    /// Appends a statement.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContainerMutation`] if the block is locked; the
    /// statement sequence is left untouched.
    pub fn append(&mut self, statement: Statement) -> Result<()> {
        self.ensure_open("append to")?;
        self.statements.push_back(statement);
        Ok(())
    }

    /// Removes and returns the most recently appended statement.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContainerMutation`] if the block is locked or empty.
    pub fn pop_last(&mut self) -> Result<Statement> {
        self.ensure_open("pop from")?;
        self.statements.pop_back().ok_or_else(|| {
            Error::InvalidContainerMutation(format!("cannot pop from empty {:?} block", self.kind))
        })
    }

    /// Returns the last statement, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Statement> {
        self.statements.last()
    }

    /// Returns the statement at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Statement> {
        self.statements.get(index)
    }

    /// Iterates statements in order.
    pub fn statements(&self) -> impl Iterator<Item = &Statement> {
        self.statements.iter()
    }

    /// Returns the number of statements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Returns `true` if the block holds no statements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Returns an independent open copy of this block.
    ///
    /// The statement sequence is shared structurally until either side is
    /// mutated; the locals table is deep-copied. The copy is open even when
    /// `self` is locked.
    #[must_use]
    pub fn copy(&self) -> Self {
        StatementBlock {
            kind: self.kind,
            locals: self.locals.clone(),
            statements: self.statements.clone(),
            state: BlockState::Open,
        }
    }

    /// Finalizes the block.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContainerMutation`] if the block is already locked.
    pub fn lock(&mut self) -> Result<()> {
        self.ensure_open("lock")?;
        self.state = BlockState::Locked;
        Ok(())
    }

    /// Visits every statement in order.
    pub fn accept<V: InstructionVisitor + ?Sized>(&self, visitor: &mut V) {
        for statement in &self.statements {
            statement.accept(visitor);
        }
    }

    fn ensure_open(&self, action: &str) -> Result<()> {
        match self.state {
            BlockState::Open => Ok(()),
            BlockState::Locked => Err(Error::InvalidContainerMutation(format!(
                "cannot {action} locked {:?} block",
                self.kind
            ))),
        }
    }

    pub(crate) fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        for statement in &self.statements {
            statement.write_indented(f, depth)?;
        }
        Ok(())
    }
}

impl fmt::Display for StatementBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Instruction, LocalVariable};
    use strum::IntoEnumIterator;

    #[test]
    fn test_append_and_pop() {
        let mut block = StatementBlock::new(BlockKind::Block);
        block.append(Statement::Break).unwrap();
        block.append(Statement::Continue).unwrap();
        assert_eq!(block.len(), 2);
        assert_eq!(block.pop_last().unwrap(), Statement::Continue);
        assert_eq!(block.last(), Some(&Statement::Break));
    }

    #[test]
    fn test_locked_block_rejects_mutation() {
        let mut block = StatementBlock::new(BlockKind::Method);
        block.append(Statement::Return(None)).unwrap();
        block.lock().unwrap();

        assert!(matches!(
            block.append(Statement::Break),
            Err(Error::InvalidContainerMutation(_))
        ));
        assert!(block.pop_last().is_err());
        assert!(block.locals_mut().is_err());
        assert!(block.lock().is_err());
        assert_eq!(block.len(), 1);
    }

    #[test]
    fn test_pop_empty_fails() {
        for kind in BlockKind::iter() {
            let mut block = StatementBlock::new(kind);
            assert!(matches!(
                block.pop_last(),
                Err(Error::InvalidContainerMutation(_))
            ));
        }
    }

    #[test]
    fn test_copy_is_independent() {
        let mut original = StatementBlock::new(BlockKind::Loop);
        original
            .locals_mut()
            .unwrap()
            .declare(LocalVariable::new(1, "i", "I"));
        original.append(Statement::Invoke(Instruction::int(1))).unwrap();

        let mut copy = original.copy();
        assert_eq!(copy.locals(), original.locals());

        original.append(Statement::Break).unwrap();
        copy.locals_mut()
            .unwrap()
            .declare(LocalVariable::new(2, "j", "I"));

        assert_eq!(copy.len(), 1);
        assert_eq!(original.len(), 2);
        assert!(!original.locals().contains(2));
    }

    #[test]
    fn test_child_inherits_locals() {
        let mut parent = StatementBlock::new(BlockKind::Method);
        parent
            .locals_mut()
            .unwrap()
            .declare(LocalVariable::new(0, "this", "LFoo;"));
        parent.append(Statement::Break).unwrap();

        let child = parent.child(BlockKind::If);
        assert!(child.is_empty());
        assert!(child.locals().contains(0));
        assert_eq!(child.kind(), BlockKind::If);
        assert_eq!(child.state(), BlockState::Open);
    }
}
