//! Control Flow Graph (CFG) construction and analysis.
//!
//! This module provides a graph abstraction over a method's basic blocks with
//! traversal, dominator, post-dominator and loop queries.
//!
//! # Key Components
//!
//! - [`ControlFlowGraph`] - The main CFG structure wrapping basic blocks
//! - [`CfgEdge`] - Edge representation with control flow semantics
//! - [`CfgEdgeKind`] - Classification of edge types (unconditional, conditional, switch)
//! - [`LoopForest`] / [`LoopInfo`] - Natural loops with latch and exit analysis
//!
//! # Lazy Computation
//!
//! Dominator trees and loop information are computed lazily on first access
//! and cached for subsequent queries using [`std::sync::OnceLock`].
//!
//! # Examples
//!
//! ```rust,ignore
//! use classcope::analysis::ControlFlowGraph;
//!
//! let cfg = ControlFlowGraph::from_blocks_ref(&method.blocks)?;
//! for info in cfg.loops().iter() {
//!     println!("loop at {} with {} blocks", info.header, info.size());
//! }
//! ```

mod edge;
mod graph;
mod loops;

pub use edge::{CfgEdge, CfgEdgeKind};
pub use graph::ControlFlowGraph;
pub use loops::{detect_loops, LoopExit, LoopForest, LoopInfo, LoopType};
