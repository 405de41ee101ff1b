//! # classcope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the classcope library. Import this module to get quick access to the essential
//! types for building method bodies and structuring them.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all classcope operations
pub use crate::Error;

/// The result type used throughout classcope
pub use crate::Result;

/// Feature switches for expression and statement recovery
pub use crate::DecompilerConfig;

// ================================================================================================
// Driver
// ================================================================================================

/// Batch driver over a set of classes
pub use crate::Decompiler;

/// Outcome of a batch run
pub use crate::{DecompileReport, DecompiledClass, DecompiledMethod, MethodFailure};

/// Single-method entry point and the shared context it reads
pub use crate::structuring::{structure_method, StructuredBody, StructuringContext, TypeDatabase};

// ================================================================================================
// Input
// ================================================================================================

/// Decoded classes, methods and blocks
pub use crate::bytecode::{
    BasicBlock, BranchKind, ClassEntry, Insn, InvokeKind, MethodAccess, MethodBody, MethodBuilder,
    Terminator,
};

// ================================================================================================
// Analysis
// ================================================================================================

/// Control flow graph with dominators and loops
pub use crate::analysis::ControlFlowGraph;

/// Stable node identifier used by every graph
pub use crate::utils::graph::NodeId;

// ================================================================================================
// Program Tree
// ================================================================================================

/// Expressions
pub use crate::ast::{CompareKind, Constant, FieldRef, Instruction, MethodRef, OperatorKind};

/// Conditions
pub use crate::ast::{CompareOp, Condition};

/// Statements and their containers
pub use crate::ast::{BlockKind, LocalVariable, Lvalue, Statement, StatementBlock};

/// Read-only tree walking
pub use crate::ast::InstructionVisitor;
