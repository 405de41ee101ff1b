//! Control flow structuring and expression recovery.
//!
//! This module turns one method's basic blocks into a statement tree:
//!
//! 1. The method is validated and its parameters become the locals of the
//!    method scope.
//! 2. A [`ControlFlowGraph`] is built over the blocks; dominators,
//!    post-dominators and natural loops are computed lazily on it.
//! 3. The structurer walks the graph region by region. Each block's
//!    instructions are replayed on an expression stack, and branches, loops
//!    and switches become `if`, `while` / `for` / `do-while` and `switch`.
//! 4. With [`DecompilerConfig::fallback_on_failure`](crate::DecompilerConfig)
//!    set, a jump no structured form can express becomes a `goto` and the
//!    surrounding code stays structured. If even that fails, the whole method
//!    is rendered as labels and gotos instead.
//!
//! The returned body is always locked.
//!
//! # Examples
//!
//! ```rust,ignore
//! use classcope::structuring::{structure_method, StructuringContext};
//!
//! let ctx = StructuringContext::default();
//! let structured = structure_method(&ctx, &method)?;
//! println!("{}", structured.body);
//! ```

mod conditions;
mod context;
mod fallback;
mod stack;
mod structurer;

pub use context::{ClassSymbols, StructuringContext, TypeDatabase};

use log::{debug, warn};

use crate::{
    analysis::cfg::ControlFlowGraph,
    ast::{BlockKind, StatementBlock},
    bytecode::MethodBody,
    Error, Result,
};

/// The recovered body of one method.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredBody {
    /// The locked method scope
    pub body: StatementBlock,
    /// `true` if any part of the body is rendered with labels and gotos
    pub fallback: bool,
}

/// Recovers the statement tree of `method`.
///
/// Bodyless (abstract or native) methods yield an empty body holding only the
/// parameter locals.
///
/// # Arguments
///
/// * `ctx` - Shared type database and configuration
/// * `method` - The method to structure
///
/// # Errors
///
/// - [`Error::UnrecognizedInput`] if the method's descriptor or branch targets
///   are invalid
/// - [`Error::Malformed`] if the instructions underflow the operand stack
/// - [`Error::Unstructurable`] if no structured form exists and fallback is
///   disabled, or if the fallback rendering fails too
pub fn structure_method(ctx: &StructuringContext, method: &MethodBody) -> Result<StructuredBody> {
    method.validate()?;
    let mut body = StatementBlock::with_locals(BlockKind::Method, method.parameter_locals()?);

    if method.is_bodyless() {
        body.lock()?;
        return Ok(StructuredBody {
            body,
            fallback: false,
        });
    }

    let cfg = ControlFlowGraph::from_blocks_ref(&method.blocks)?;
    debug!(
        "structuring {}.{}{} ({} blocks, {} loops)",
        method.owner,
        method.name,
        method.descriptor,
        cfg.block_count(),
        cfg.loops().len()
    );

    let (mut body, fallback) = match structurer::structure(ctx, &cfg, &body) {
        Ok(structured) => {
            if structured.has_gotos {
                warn!(
                    "{}.{}{} keeps some regions as gotos",
                    method.owner, method.name, method.descriptor
                );
            }
            (structured.body, structured.has_gotos)
        }
        Err(Error::Unstructurable(reason)) if ctx.config().fallback_on_failure => {
            warn!(
                "{}.{}{} falls back to labels: {reason}",
                method.owner, method.name, method.descriptor
            );
            (fallback::flatten(ctx.config(), &cfg, body)?, true)
        }
        Err(error) => return Err(error),
    };

    body.lock()?;
    Ok(StructuredBody { body, fallback })
}
