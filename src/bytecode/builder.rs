//! Fluent construction of [`MethodBody`] values.
//!
//! Loaders that already have decoded blocks can fill [`MethodBody`] directly.
//! [`MethodBuilder`] is for the other cases (tests, benchmarks, synthesized
//! code): instructions are appended to the open block, and each terminator
//! call closes it and opens the next one. Blocks are numbered in the order
//! they are closed, starting at 0.
//!
//! # Examples
//!
//! ```rust
//! use classcope::ast::{CompareOp, OperatorKind};
//! use classcope::bytecode::{MethodAccess, MethodBuilder};
//!
//! // static int abs(int x) { return x < 0 ? -x : x; }
//! let method = MethodBuilder::new("demo/Math", "abs", "(I)I")
//!     .access(MethodAccess::PUBLIC | MethodAccess::STATIC)
//!     .load(0, "I")
//!     .if_zero(CompareOp::Ge, 2, 1) // block 0
//!     .load(0, "I")
//!     .negate("I")
//!     .goto(3) // block 1
//!     .load(0, "I")
//!     .goto(3) // block 2
//!     .ret_value() // block 3
//!     .build()?;
//!
//! assert_eq!(method.blocks.len(), 4);
//! # Ok::<(), classcope::Error>(())
//! ```

use crate::{
    ast::{CompareKind, CompareOp, Constant, FieldRef, LocalVariable, MethodRef, OperatorKind},
    bytecode::{BasicBlock, BranchKind, Insn, InvokeKind, MethodAccess, MethodBody, Terminator},
    utils::descriptor::{self, MethodDescriptor},
    Error, Result,
};

/// Builder for [`MethodBody`].
#[derive(Debug, Clone)]
pub struct MethodBuilder {
    owner: String,
    name: String,
    descriptor: String,
    access: MethodAccess,
    max_locals: Option<u16>,
    locals: Vec<LocalVariable>,
    blocks: Vec<BasicBlock>,
    current: Vec<Insn>,
}

impl MethodBuilder {
    /// Starts a method with no access flags and an empty entry block.
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        descriptor: impl Into<String>,
    ) -> Self {
        MethodBuilder {
            owner: owner.into(),
            name: name.into(),
            descriptor: descriptor.into(),
            access: MethodAccess::empty(),
            max_locals: None,
            locals: Vec::new(),
            blocks: Vec::new(),
            current: Vec::new(),
        }
    }

    /// Sets the access flags.
    #[must_use]
    pub fn access(mut self, access: MethodAccess) -> Self {
        self.access = access;
        self
    }

    /// Sets the frame size. Computed from the highest slot used if not set.
    #[must_use]
    pub fn max_locals(mut self, max_locals: u16) -> Self {
        self.max_locals = Some(max_locals);
        self
    }

    /// Declares a named local, as debug information would.
    #[must_use]
    pub fn local(mut self, slot: u16, name: &str, desc: &str) -> Self {
        self.locals.push(LocalVariable::new(slot, name, desc));
        self
    }

    /// Appends an instruction to the open block.
    #[must_use]
    pub fn insn(mut self, insn: Insn) -> Self {
        self.current.push(insn);
        self
    }

    /// `iconst` / `bipush` / `sipush` / `ldc` of an int.
    #[must_use]
    pub fn iconst(self, value: i32) -> Self {
        self.insn(Insn::Const(Constant::Int(value)))
    }

    /// Pushes any literal.
    #[must_use]
    pub fn constant(self, value: Constant) -> Self {
        self.insn(Insn::Const(value))
    }

    /// Loads a local.
    #[must_use]
    pub fn load(self, local: u16, ty: &str) -> Self {
        self.insn(Insn::Load {
            local,
            ty: ty.to_string(),
        })
    }

    /// Stores into a local.
    #[must_use]
    pub fn store(self, local: u16, ty: &str) -> Self {
        self.insn(Insn::Store {
            local,
            ty: ty.to_string(),
        })
    }

    /// `iinc local amount`
    #[must_use]
    pub fn iinc(self, local: u16, amount: i32) -> Self {
        self.insn(Insn::Iinc { local, amount })
    }

    /// Binary operator.
    #[must_use]
    pub fn binary(self, op: OperatorKind, ty: &str) -> Self {
        self.insn(Insn::Binary {
            op,
            ty: ty.to_string(),
        })
    }

    /// Arithmetic negation.
    #[must_use]
    pub fn negate(self, ty: &str) -> Self {
        self.insn(Insn::Negate { ty: ty.to_string() })
    }

    /// `lcmp` / `fcmp*` / `dcmp*`
    #[must_use]
    pub fn compare(self, kind: CompareKind) -> Self {
        self.insn(Insn::Compare(kind))
    }

    /// `getfield`
    #[must_use]
    pub fn get_field(self, owner: &str, name: &str, desc: &str) -> Self {
        self.insn(Insn::GetField(FieldRef::new(owner, name, desc)))
    }

    /// `putfield`
    #[must_use]
    pub fn put_field(self, owner: &str, name: &str, desc: &str) -> Self {
        self.insn(Insn::PutField(FieldRef::new(owner, name, desc)))
    }

    /// `getstatic`
    #[must_use]
    pub fn get_static(self, owner: &str, name: &str, desc: &str) -> Self {
        self.insn(Insn::GetStatic(FieldRef::new(owner, name, desc)))
    }

    /// `putstatic`
    #[must_use]
    pub fn put_static(self, owner: &str, name: &str, desc: &str) -> Self {
        self.insn(Insn::PutStatic(FieldRef::new(owner, name, desc)))
    }

    /// Method invocation.
    #[must_use]
    pub fn invoke(self, kind: InvokeKind, owner: &str, name: &str, desc: &str) -> Self {
        self.insn(Insn::Invoke {
            kind,
            method: MethodRef::new(owner, name, desc),
        })
    }

    /// `new` of an internal class name.
    #[must_use]
    pub fn new_object(self, class: &str) -> Self {
        self.insn(Insn::New(class.to_string()))
    }

    /// `dup`
    #[must_use]
    pub fn dup(self) -> Self {
        self.insn(Insn::Dup)
    }

    /// `pop`
    #[must_use]
    pub fn pop(self) -> Self {
        self.insn(Insn::Pop)
    }

    /// Closes the open block with `terminator`.
    #[must_use]
    pub fn terminate(mut self, terminator: Terminator) -> Self {
        let insns = std::mem::take(&mut self.current);
        self.blocks.push(BasicBlock::new(insns, terminator));
        self
    }

    /// Closes the open block with `goto target`.
    #[must_use]
    pub fn goto(self, target: usize) -> Self {
        self.terminate(Terminator::Goto(target))
    }

    /// Closes the open block with a conditional branch.
    #[must_use]
    pub fn branch(self, kind: BranchKind, taken: usize, fallthrough: usize) -> Self {
        self.terminate(Terminator::Branch {
            kind,
            taken,
            fallthrough,
        })
    }

    /// Closes the open block with `if<op>` against zero.
    #[must_use]
    pub fn if_zero(self, op: CompareOp, taken: usize, fallthrough: usize) -> Self {
        self.branch(BranchKind::IfZero(op), taken, fallthrough)
    }

    /// Closes the open block with `if_icmp<op>` / `if_acmp<op>`.
    #[must_use]
    pub fn if_cmp(self, op: CompareOp, taken: usize, fallthrough: usize) -> Self {
        self.branch(BranchKind::IfCmp(op), taken, fallthrough)
    }

    /// Closes the open block with a table or lookup switch.
    #[must_use]
    pub fn switch(self, cases: &[(i32, usize)], default: usize) -> Self {
        self.terminate(Terminator::Switch {
            cases: cases.to_vec(),
            default,
        })
    }

    /// Closes the open block with `return`.
    #[must_use]
    pub fn ret(self) -> Self {
        self.terminate(Terminator::Return)
    }

    /// Closes the open block with a value return.
    #[must_use]
    pub fn ret_value(self) -> Self {
        self.terminate(Terminator::ReturnValue)
    }

    /// Closes the open block with `athrow`.
    #[must_use]
    pub fn throw(self) -> Self {
        self.terminate(Terminator::Throw)
    }

    fn frame_size(&self) -> Result<u16> {
        let desc = MethodDescriptor::parse(&self.descriptor)?;
        let mut size = u16::from(!self.access.contains(MethodAccess::STATIC));
        for param in &desc.params {
            size += if descriptor::is_wide(param) { 2 } else { 1 };
        }

        let used = self
            .blocks
            .iter()
            .flat_map(|block| &block.insns)
            .filter_map(|insn| match insn {
                Insn::Load { local, ty } | Insn::Store { local, ty } => {
                    Some(local + if descriptor::is_wide(ty) { 2 } else { 1 })
                }
                Insn::Iinc { local, .. } => Some(local + 1),
                _ => None,
            })
            .chain(self.locals.iter().map(|local| local.slot + 1))
            .max()
            .unwrap_or(0);
        Ok(size.max(used))
    }

    /// Finishes the method.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnrecognizedInput`] if instructions were appended
    /// after the last terminator, or if [`MethodBody::validate`] fails.
    pub fn build(self) -> Result<MethodBody> {
        if !self.current.is_empty() {
            return Err(Error::UnrecognizedInput(format!(
                "{} instructions after the last terminator of {}{}",
                self.current.len(),
                self.name,
                self.descriptor
            )));
        }
        let max_locals = match self.max_locals {
            Some(max_locals) => max_locals,
            None => self.frame_size()?,
        };

        let method = MethodBody {
            owner: self.owner,
            name: self.name,
            descriptor: self.descriptor,
            access: self.access,
            max_locals,
            local_variables: self.locals,
            blocks: self.blocks,
        };
        method.validate()?;
        Ok(method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_are_numbered_in_order() {
        let method = MethodBuilder::new("a/B", "f", "(I)V")
            .load(1, "I")
            .if_zero(CompareOp::Eq, 2, 1)
            .iinc(1, 1)
            .goto(2)
            .ret()
            .build()
            .unwrap();

        assert_eq!(method.blocks.len(), 3);
        assert_eq!(method.blocks[1].insns, vec![Insn::Iinc { local: 1, amount: 1 }]);
        assert_eq!(method.blocks[2].terminator, Terminator::Return);
        assert_eq!(method.max_locals, 2);
    }

    #[test]
    fn test_unterminated_block_is_rejected() {
        let result = MethodBuilder::new("a/B", "f", "()V").iconst(1).build();
        assert!(matches!(result, Err(Error::UnrecognizedInput(_))));
    }

    #[test]
    fn test_missing_target_is_rejected() {
        let result = MethodBuilder::new("a/B", "f", "()V").goto(5).build();
        assert!(matches!(result, Err(Error::UnrecognizedInput(_))));
    }

    #[test]
    fn test_wide_locals_widen_frame() {
        let method = MethodBuilder::new("a/B", "f", "(J)V")
            .access(MethodAccess::STATIC)
            .load(0, "J")
            .store(2, "J")
            .ret()
            .build()
            .unwrap();
        assert_eq!(method.max_locals, 4);
    }
}
