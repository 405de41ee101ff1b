//! Abstract stack instructions.
//!
//! [`Insn`] abstracts the JVM opcode set down to what expression recovery needs:
//! typed opcode families (`iload`/`lload`/`aload` ...) collapse into one variant
//! carrying the operand descriptor, and constant-pool references arrive already
//! resolved into [`FieldRef`] / [`MethodRef`] values.

use crate::{
    ast::{CompareKind, Constant, FieldRef, MethodRef, OperatorKind},
    utils::descriptor::MethodDescriptor,
    Error, Result,
};

/// How an invocation dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvokeKind {
    /// `invokevirtual`
    Virtual,
    /// `invokeinterface`
    Interface,
    /// `invokespecial` (constructors, private and super calls)
    Special,
    /// `invokestatic`
    Static,
}

impl InvokeKind {
    /// Returns `true` if the invocation pops a receiver.
    #[must_use]
    pub const fn has_receiver(self) -> bool {
        !matches!(self, InvokeKind::Static)
    }
}

/// Stack effect of an instruction, counted in values.
///
/// `long` and `double` values count as one value here. The two-slot forms
/// (`dup2`, `pop2`, `dup_x2`) are reported in their single-slot shape and are
/// resolved against the actual operand types during simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackBehavior {
    /// Number of values popped
    pub pops: u16,
    /// Number of values pushed
    pub pushes: u16,
    /// Net effect on stack depth (pushes - pops)
    pub net_effect: i32,
}

impl StackBehavior {
    const fn new(pops: u16, pushes: u16) -> Self {
        StackBehavior {
            pops,
            pushes,
            net_effect: pushes as i32 - pops as i32,
        }
    }
}

/// A stack-machine instruction inside a basic block.
///
/// Control transfers are not instructions; they live in the block's
/// [`Terminator`](crate::bytecode::Terminator).
#[derive(Debug, Clone, PartialEq)]
pub enum Insn {
    /// Push a literal (`iconst_*`, `bipush`, `sipush`, `ldc*`, `aconst_null`)
    Const(Constant),
    /// Push a local (`iload`, `lload`, `fload`, `dload`, `aload`)
    Load {
        /// Local slot
        local: u16,
        /// Descriptor of the loaded value
        ty: String,
    },
    /// Pop into a local (`istore` ... `astore`)
    Store {
        /// Local slot
        local: u16,
        /// Descriptor of the stored value
        ty: String,
    },
    /// `iinc local amount`
    Iinc {
        /// Local slot
        local: u16,
        /// Signed increment
        amount: i32,
    },
    /// Binary arithmetic or bitwise operation (`iadd`, `lshl`, `ixor` ...)
    Binary {
        /// The operator
        op: OperatorKind,
        /// Operand descriptor
        ty: String,
    },
    /// `ineg`, `lneg`, `fneg`, `dneg`
    Negate {
        /// Operand descriptor
        ty: String,
    },
    /// `lcmp`, `fcmpl`, `fcmpg`, `dcmpl`, `dcmpg`
    Compare(CompareKind),
    /// Primitive conversion (`i2l`, `d2i` ...)
    Convert {
        /// Target descriptor
        to: String,
    },
    /// `checkcast`
    CheckCast(String),
    /// `instanceof`
    InstanceOf(String),
    /// `getfield`
    GetField(FieldRef),
    /// `putfield`
    PutField(FieldRef),
    /// `getstatic`
    GetStatic(FieldRef),
    /// `putstatic`
    PutStatic(FieldRef),
    /// `iaload` ... `aaload`
    ArrayLoad {
        /// Element descriptor
        ty: String,
    },
    /// `iastore` ... `aastore`
    ArrayStore {
        /// Element descriptor
        ty: String,
    },
    /// `arraylength`
    ArrayLength,
    /// `newarray` / `anewarray`
    NewArray {
        /// Element descriptor
        element: String,
    },
    /// `new` (allocation only; the constructor call follows)
    New(String),
    /// Method invocation
    Invoke {
        /// Dispatch kind
        kind: InvokeKind,
        /// The invoked method
        method: MethodRef,
    },
    /// `dup`
    Dup,
    /// `dup_x1`
    DupX1,
    /// `dup_x2`
    DupX2,
    /// `dup2`
    Dup2,
    /// `pop`
    Pop,
    /// `pop2`
    Pop2,
    /// `swap`
    Swap,
}

impl Insn {
    /// Returns the stack effect of this instruction.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnrecognizedInput`] for an invocation whose
    /// descriptor cannot be parsed.
    pub fn stack_effect(&self) -> Result<StackBehavior> {
        let effect = match self {
            Insn::Const(_) | Insn::Load { .. } | Insn::GetStatic(_) | Insn::New(_) => {
                StackBehavior::new(0, 1)
            }
            Insn::Store { .. } | Insn::PutStatic(_) | Insn::Pop | Insn::Pop2 => {
                StackBehavior::new(1, 0)
            }
            Insn::Iinc { .. } => StackBehavior::new(0, 0),
            Insn::Binary { .. } | Insn::Compare(_) | Insn::ArrayLoad { .. } => {
                StackBehavior::new(2, 1)
            }
            Insn::Negate { .. }
            | Insn::Convert { .. }
            | Insn::CheckCast(_)
            | Insn::InstanceOf(_)
            | Insn::GetField(_)
            | Insn::ArrayLength
            | Insn::NewArray { .. } => StackBehavior::new(1, 1),
            Insn::PutField(_) => StackBehavior::new(2, 0),
            Insn::ArrayStore { .. } => StackBehavior::new(3, 0),
            Insn::Invoke { kind, method } => {
                let desc = MethodDescriptor::parse(&method.descriptor)?;
                let receiver = usize::from(kind.has_receiver());
                let pops = u16::try_from(desc.params.len() + receiver).map_err(|_| {
                    Error::UnrecognizedInput(format!(
                        "{}.{}{} takes too many arguments",
                        method.owner, method.name, method.descriptor
                    ))
                })?;
                StackBehavior::new(pops, u16::from(!desc.returns_void()))
            }
            Insn::Dup => StackBehavior::new(1, 2),
            Insn::DupX1 => StackBehavior::new(2, 3),
            Insn::DupX2 => StackBehavior::new(3, 4),
            Insn::Dup2 => StackBehavior::new(2, 4),
            Insn::Swap => StackBehavior::new(2, 2),
        };
        Ok(effect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_effects() {
        assert_eq!(
            Insn::Const(Constant::Int(1)).stack_effect().unwrap(),
            StackBehavior { pops: 0, pushes: 1, net_effect: 1 }
        );
        assert_eq!(
            Insn::ArrayStore { ty: "I".into() }.stack_effect().unwrap().net_effect,
            -3
        );
        assert_eq!(Insn::Iinc { local: 1, amount: 1 }.stack_effect().unwrap().net_effect, 0);
    }

    #[test]
    fn test_invoke_effects() {
        let virtual_call = Insn::Invoke {
            kind: InvokeKind::Virtual,
            method: MethodRef::new("java/lang/String", "charAt", "(I)C"),
        };
        assert_eq!(
            virtual_call.stack_effect().unwrap(),
            StackBehavior { pops: 2, pushes: 1, net_effect: -1 }
        );

        let static_void = Insn::Invoke {
            kind: InvokeKind::Static,
            method: MethodRef::new("Foo", "bar", "(JLjava/lang/String;)V"),
        };
        assert_eq!(
            static_void.stack_effect().unwrap(),
            StackBehavior { pops: 2, pushes: 0, net_effect: -2 }
        );

        let broken = Insn::Invoke {
            kind: InvokeKind::Static,
            method: MethodRef::new("Foo", "bar", "broken"),
        };
        assert!(broken.stack_effect().is_err());
    }

    #[test]
    fn test_wide_invoke_effect() {
        let params = "I".repeat(128);
        let call = Insn::Invoke {
            kind: InvokeKind::Virtual,
            method: MethodRef::new("Foo", "bar", &format!("({params})J")),
        };
        assert_eq!(
            call.stack_effect().unwrap(),
            StackBehavior { pops: 129, pushes: 1, net_effect: -128 }
        );

        let params = "I".repeat(255);
        let call = Insn::Invoke {
            kind: InvokeKind::Static,
            method: MethodRef::new("Foo", "bar", &format!("({params})V")),
        };
        assert_eq!(call.stack_effect().unwrap().net_effect, -255);
    }
}
