//! Program analysis over decoded method bodies.
//!
//! The analysis module builds upon the generic graph infrastructure in
//! [`crate::utils::graph`]:
//!
//! - [`cfg`] - Control Flow Graph construction, dominators and loop detection
//!
//! ```rust,ignore
//! use classcope::analysis::ControlFlowGraph;
//!
//! let cfg = ControlFlowGraph::from_blocks_ref(&method.blocks)?;
//! let dominators = cfg.dominators();
//! assert!(dominators.dominates(cfg.entry(), some_block));
//! ```

pub mod cfg;

pub use cfg::{CfgEdge, CfgEdgeKind, ControlFlowGraph, LoopForest, LoopInfo, LoopType};
