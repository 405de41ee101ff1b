//! Generic directed graph infrastructure.
//!
//! The control flow graph of a method is a [`DirectedGraph`] whose nodes borrow
//! the method's basic blocks and whose edges carry the branch kind. Dominator and
//! post-dominator trees, loop detection and the structuring engine all run on top
//! of the traits defined here.
//!
//! # Key Components
//!
//! - [`NodeId`] - Strongly-typed node identifier
//! - [`EdgeId`] - Strongly-typed edge identifier
//! - [`DirectedGraph`] - Adjacency list graph with borrowed or owned nodes
//! - [`algorithms`] - Traversals, dominators and post-dominators
//!
//! # Usage Examples
//!
//! ```rust,ignore
//! use classcope::utils::graph::{algorithms, DirectedGraph};
//!
//! // entry -> a, entry -> b, a -> exit, b -> exit
//! let mut graph: DirectedGraph<&str, ()> = DirectedGraph::new();
//! let entry = graph.add_node("entry");
//! let a = graph.add_node("A");
//! let b = graph.add_node("B");
//! let exit = graph.add_node("exit");
//! graph.add_edge(entry, a, ())?;
//! graph.add_edge(entry, b, ())?;
//! graph.add_edge(a, exit, ())?;
//! graph.add_edge(b, exit, ())?;
//!
//! let dominators = algorithms::compute_dominators(&graph, entry);
//! assert!(dominators.dominates(entry, exit));
//!
//! let post = algorithms::compute_post_dominators(&graph);
//! assert_eq!(post.immediate_post_dominator(entry), Some(exit));
//! # Ok::<(), classcope::Error>(())
//! ```

mod directed;
mod edge;
mod node;
mod traits;

pub mod algorithms;

pub use directed::DirectedGraph;
pub use edge::EdgeId;
pub use node::NodeId;
pub use traits::{GraphBase, Predecessors, RootedGraph, Successors};
