//! Node identifiers for directed graphs.
//!
//! [`NodeId`] is a newtype over a dense `usize` index. In a control flow graph the
//! index of a node is the index of the basic block it was built from, so per-block
//! analysis results can be stored in plain vectors indexed by `NodeId::index`.

use std::fmt;

/// A strongly-typed identifier for a node within a [`DirectedGraph`](crate::utils::graph::DirectedGraph).
///
/// Node IDs are assigned sequentially from 0 as nodes are added. They are `Copy`,
/// hashable and totally ordered, which makes them suitable as keys in sets and
/// maps and gives deterministic iteration order when sorted.
///
/// # Examples
///
/// ```rust
/// use classcope::utils::graph::NodeId;
///
/// let node = NodeId::new(3);
/// assert_eq!(node.index(), 3);
/// assert_eq!(node.to_string(), "n3");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Creates a `NodeId` from a raw index.
    ///
    /// Mostly useful in tests and when mapping block indices of an input method
    /// onto the nodes of its control flow graph.
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        NodeId(index)
    }

    /// Returns the raw 0-based index of this node.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl From<usize> for NodeId {
    #[inline]
    fn from(index: usize) -> Self {
        NodeId(index)
    }
}

impl From<NodeId> for usize {
    #[inline]
    fn from(node: NodeId) -> Self {
        node.0
    }
}
