// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]

//! # classcope
//!
//! The structuring core of a JVM bytecode decompiler. `classcope` takes method
//! bodies that have already been decoded into basic blocks of stack
//! instructions and recovers readable, Java-like source trees from them:
//! expressions rebuilt from the operand stack, `if`/`else`, `while`, `for`,
//! `do-while` and `switch` rebuilt from the control flow graph, and short
//! circuit conditions and ternaries folded back together.
//!
//! ## Architecture
//!
//! - [`utils::graph`] - Generic directed graphs, traversals and dominator trees
//! - [`bytecode`] - The decoded input: classes, methods, blocks and instructions
//! - [`analysis`] - Control flow graph, post-dominators and natural loops
//! - [`ast`] - The recovered program tree, its rendering and visitors
//! - [`structuring`] - Stack simulation and control flow structuring
//! - [`Decompiler`] - Batch driver over many classes, optionally parallel
//!
//! ## Quick Start
//!
//! ```rust
//! use classcope::prelude::*;
//!
//! // static int sign(int x) { return x < 0 ? -1 : 1; }
//! let method = MethodBuilder::new("demo/Math", "sign", "(I)I")
//!     .access(MethodAccess::PUBLIC | MethodAccess::STATIC)
//!     .local(0, "x", "I")
//!     .load(0, "I")
//!     .if_zero(CompareOp::Ge, 2, 1)
//!     .iconst(-1)
//!     .ret_value()
//!     .iconst(1)
//!     .ret_value()
//!     .build()?;
//!
//! let class = ClassEntry::new("demo/Math").with_method(method);
//! let decompiler = Decompiler::new(DecompilerConfig::default(), std::slice::from_ref(&class));
//! let recovered = decompiler.decompile_method(&class, &class.methods[0])?;
//! assert_eq!(recovered.body.to_string(), "return x < 0 ? -1 : 1;\n");
//! # Ok::<(), classcope::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T>`] with [`Error`]. A method that
//! cannot be structured yields [`Error::Unstructurable`]. When
//! [`DecompilerConfig::fallback_on_failure`] is set, only the offending region
//! is rendered with labels and gotos.
//! The batch driver never stops on a failing method; failures are collected in
//! the [`DecompileReport`].
//!
//! ## Logging
//!
//! Progress is reported through the [`log`](https://docs.rs/log) facade:
//! `info` for batch summaries, `warn` for fallbacks, `debug` and `trace` for
//! per-method and per-region detail. Install any logger to see it.

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

mod config;
mod decompiler;

/// Convenient re-exports of the most commonly used types and traits.
///
/// This module provides a curated selection of the most frequently used types
/// from across the classcope library, allowing for convenient glob imports.
///
/// # Example
///
/// ```rust
/// use classcope::prelude::*;
///
/// let config = DecompilerConfig::literal().with_parallel(false);
/// let decompiler = Decompiler::new(config, &[]);
/// let report = decompiler.decompile(&[]);
/// assert!(report.is_complete());
/// ```
pub mod prelude;

/// Generic infrastructure shared by the analysis passes
///
/// - [`utils::graph`] - Directed graphs with stable node ids, traversals and
///   dominator computation
/// - [`utils::descriptor`] - JVM field and method descriptor parsing and the
///   source-level spelling of types
pub mod utils;

/// Decoded method bodies as consumed by the structuring engine
///
/// Reading class files is left to the caller. The types here describe classes
/// and methods whose code is already split into basic blocks of abstract
/// stack instructions.
///
/// # Key Types
///
/// - [`bytecode::ClassEntry`] - One class and its methods
/// - [`bytecode::MethodBody`] - One method's blocks and debug locals
/// - [`bytecode::Insn`] - A stack instruction inside a block
/// - [`bytecode::Terminator`] - The control transfer ending a block
/// - [`bytecode::MethodBuilder`] - Fluent construction of method bodies
pub mod bytecode;

/// Control flow analysis
///
/// Builds a [`analysis::ControlFlowGraph`] over a method's blocks and lazily
/// computes dominators, post-dominators and the natural loop forest.
///
/// # Examples
///
/// ```rust
/// use classcope::analysis::ControlFlowGraph;
/// use classcope::bytecode::MethodBuilder;
///
/// let method = MethodBuilder::new("a/B", "f", "()V").goto(1).ret().build()?;
/// let cfg = ControlFlowGraph::from_blocks_ref(&method.blocks)?;
/// assert_eq!(cfg.block_count(), 2);
/// assert!(cfg.loops().is_empty());
/// # Ok::<(), classcope::Error>(())
/// ```
pub mod analysis;

/// The recovered program tree
///
/// Expressions ([`ast::Instruction`]), conditions ([`ast::Condition`]) and
/// statements ([`ast::Statement`]) nested in scoped [`ast::StatementBlock`]s.
/// Every node renders as Java-like source through `Display`.
pub mod ast;

/// Stack simulation and control flow structuring
///
/// [`structuring::structure_method`] is the single-method entry point used by
/// the batch [`Decompiler`].
pub mod structuring;

pub use config::DecompilerConfig;
pub use decompiler::{
    DecompileReport, DecompiledClass, DecompiledMethod, Decompiler, MethodFailure,
};

/// `classcope` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always [`Error`].
/// This is used consistently throughout the crate for all fallible operations.
pub type Result<T> = std::result::Result<T, Error>;

/// `classcope` Error type
///
/// The main error type for all operations in this crate. Covers malformed
/// input, unstructurable control flow and misuse of statement containers.
pub use error::Error;
