//! Graph algorithms for control flow analysis.
//!
//! All algorithms are generic over the traits in [`crate::utils::graph`], so they
//! work on [`DirectedGraph`](crate::utils::graph::DirectedGraph), on
//! [`ControlFlowGraph`](crate::analysis::ControlFlowGraph) and on the reversed
//! view used for post-dominators.
//!
//! - [`postorder`] / [`reverse_postorder`] - depth-first orderings
//! - [`compute_dominators`] - dominator tree (Cooper-Harvey-Kennedy)
//! - [`compute_post_dominators`] - post-dominator tree over a virtual exit

mod dominators;
mod traversal;

pub use dominators::{
    compute_dominators, compute_dominators_rooted, compute_post_dominators, DominatorIterator,
    DominatorTree, PostDominatorTree,
};
pub use traversal::{postorder, reverse_postorder};
