//! The decoded input consumed by the structuring engine.
//!
//! Reading class files is out of scope for this crate. A loader hands over one
//! [`ClassEntry`] per class, each holding [`MethodBody`] records whose code has
//! already been split into [`BasicBlock`]s of abstract stack instructions
//! ([`Insn`]) ending in an explicit [`Terminator`]. [`MethodBuilder`] assembles
//! such records by hand.

mod block;
mod builder;
mod insn;
mod method;

pub use block::{BasicBlock, BranchKind, FlowType, Terminator};
pub use builder::MethodBuilder;
pub use insn::{Insn, InvokeKind, StackBehavior};
pub use method::{ClassEntry, MethodAccess, MethodBody};
