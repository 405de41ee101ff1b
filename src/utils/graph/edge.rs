//! Edge identifiers for directed graphs.

use std::fmt;

/// A strongly-typed identifier for an edge within a [`DirectedGraph`](crate::utils::graph::DirectedGraph).
///
/// Edge IDs are handed out by [`DirectedGraph::add_edge`](crate::utils::graph::DirectedGraph::add_edge)
/// in insertion order. Keeping them distinct from [`NodeId`](crate::utils::graph::NodeId)
/// prevents mixing up the two index spaces.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeId(pub(crate) usize);

impl EdgeId {
    /// Creates an `EdgeId` from a raw index.
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        EdgeId(index)
    }

    /// Returns the raw 0-based index of this edge.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EdgeId({})", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}
