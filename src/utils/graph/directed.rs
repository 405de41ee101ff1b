//! Core directed graph implementation.
//!
//! [`DirectedGraph`] stores nodes in a [`Cow`] slice so a control flow graph can
//! borrow the basic blocks of a method body instead of cloning them, while edges
//! and adjacency lists are always owned.

use std::borrow::Cow;

use crate::{
    utils::graph::{
        edge::EdgeId,
        node::NodeId,
        traits::{GraphBase, Predecessors, Successors},
    },
    Error, Result,
};

/// Internal storage for edge data and endpoints.
#[derive(Debug, Clone)]
struct EdgeData<E> {
    /// Source node of the edge
    source: NodeId,
    /// Target node of the edge
    target: NodeId,
    /// User-provided edge data
    data: E,
}

/// A directed graph with typed node and edge data.
///
/// - Generic node data (`N`), borrowed or owned via [`Cow`]
/// - Generic edge data (`E`), e.g. the branch kind of a control flow edge
/// - O(1) successor and predecessor lookup through adjacency lists
///
/// Edges are kept in insertion order, so successor iteration is deterministic.
/// The structuring engine relies on that when it walks the branch targets of a
/// block.
///
/// # Thread Safety
///
/// `DirectedGraph<N, E>` is [`Send`] and [`Sync`] when both `N` and `E` are.
/// Build it single-threaded, then share it immutably.
///
/// # Examples
///
/// ```rust,ignore
/// use classcope::utils::graph::DirectedGraph;
///
/// let mut graph: DirectedGraph<&str, i32> = DirectedGraph::new();
/// let a = graph.add_node("A");
/// let b = graph.add_node("B");
/// graph.add_edge(a, b, 10)?;
///
/// assert_eq!(graph.successors(a).collect::<Vec<_>>(), vec![b]);
/// assert_eq!(graph.predecessors(b).collect::<Vec<_>>(), vec![a]);
/// # Ok::<(), classcope::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct DirectedGraph<'a, N: Clone, E> {
    /// Node data storage (borrowed or owned)
    nodes: Cow<'a, [N]>,
    /// Edge data storage
    edges: Vec<EdgeData<E>>,
    /// Outgoing edges per node
    outgoing: Vec<Vec<EdgeId>>,
    /// Incoming edges per node
    incoming: Vec<Vec<EdgeId>>,
}

impl<N: Clone, E> Default for DirectedGraph<'static, N, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Clone, E> DirectedGraph<'static, N, E> {
    /// Creates a new empty directed graph with owned storage.
    #[must_use]
    pub fn new() -> Self {
        DirectedGraph {
            nodes: Cow::Owned(Vec::new()),
            edges: Vec::new(),
            outgoing: Vec::new(),
            incoming: Vec::new(),
        }
    }

    /// Adds a node and returns its identifier.
    ///
    /// Node identifiers are assigned sequentially starting from 0.
    pub fn add_node(&mut self, data: N) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.to_mut().push(data);
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        id
    }
}

impl<'a, N: Clone, E> DirectedGraph<'a, N, E> {
    /// Creates a graph whose nodes borrow an existing slice.
    ///
    /// Node `i` of the graph refers to `nodes[i]`. No edges are created; add them
    /// with [`add_edge`](Self::add_edge).
    ///
    /// # Arguments
    ///
    /// * `nodes` - The node data to borrow for the lifetime of the graph
    #[must_use]
    pub fn from_nodes_borrowed(nodes: &'a [N]) -> Self {
        let count = nodes.len();
        DirectedGraph {
            nodes: Cow::Borrowed(nodes),
            edges: Vec::new(),
            outgoing: vec![Vec::new(); count],
            incoming: vec![Vec::new(); count],
        }
    }

    /// Returns the data of a node, or `None` if it does not exist.
    #[must_use]
    pub fn node(&self, node: NodeId) -> Option<&N> {
        self.nodes.get(node.index())
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns an iterator over all node identifiers.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId::new)
    }

    /// Returns an iterator over `(NodeId, &N)` pairs.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &N)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, data)| (NodeId::new(index), data))
    }

    /// Adds a directed edge from `source` to `target`.
    ///
    /// Parallel edges are allowed; a two-way branch whose targets coincide
    /// produces two edges between the same pair of nodes.
    ///
    /// # Arguments
    ///
    /// * `source` - The node the edge originates from
    /// * `target` - The node the edge points to
    /// * `data` - The data to associate with the edge
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`] if either endpoint does not exist.
    pub fn add_edge(&mut self, source: NodeId, target: NodeId, data: E) -> Result<EdgeId> {
        if source.index() >= self.nodes.len() {
            return Err(Error::GraphError(format!(
                "source node {} does not exist in graph with {} nodes",
                source,
                self.nodes.len()
            )));
        }
        if target.index() >= self.nodes.len() {
            return Err(Error::GraphError(format!(
                "target node {} does not exist in graph with {} nodes",
                target,
                self.nodes.len()
            )));
        }

        let id = EdgeId::new(self.edges.len());
        self.edges.push(EdgeData {
            source,
            target,
            data,
        });

        self.outgoing[source.index()].push(id);
        self.incoming[target.index()].push(id);

        Ok(id)
    }

    /// Returns the data of an edge, or `None` if it does not exist.
    #[must_use]
    pub fn edge(&self, edge: EdgeId) -> Option<&E> {
        self.edges.get(edge.index()).map(|e| &e.data)
    }

    /// Returns the `(source, target)` pair of an edge.
    #[must_use]
    pub fn edge_endpoints(&self, edge: EdgeId) -> Option<(NodeId, NodeId)> {
        self.edges.get(edge.index()).map(|e| (e.source, e.target))
    }

    /// Returns the number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns an iterator over the successors of `node`, in edge insertion order.
    ///
    /// An unknown node has no successors.
    pub fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.outgoing
            .get(node.index())
            .into_iter()
            .flatten()
            .map(|&edge| self.edges[edge.index()].target)
    }

    /// Returns an iterator over the predecessors of `node`, in edge insertion order.
    pub fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.incoming
            .get(node.index())
            .into_iter()
            .flatten()
            .map(|&edge| self.edges[edge.index()].source)
    }

    /// Returns the outgoing edges of `node` as `(EdgeId, target, &E)` triples.
    pub fn outgoing_edges(&self, node: NodeId) -> impl Iterator<Item = (EdgeId, NodeId, &E)> + '_ {
        self.outgoing
            .get(node.index())
            .into_iter()
            .flatten()
            .map(|&edge| {
                let data = &self.edges[edge.index()];
                (edge, data.target, &data.data)
            })
    }

    /// Returns the incoming edges of `node` as `(EdgeId, source, &E)` triples.
    pub fn incoming_edges(&self, node: NodeId) -> impl Iterator<Item = (EdgeId, NodeId, &E)> + '_ {
        self.incoming
            .get(node.index())
            .into_iter()
            .flatten()
            .map(|&edge| {
                let data = &self.edges[edge.index()];
                (edge, data.source, &data.data)
            })
    }

    /// Returns the number of outgoing edges of `node`.
    #[must_use]
    pub fn out_degree(&self, node: NodeId) -> usize {
        self.outgoing.get(node.index()).map_or(0, Vec::len)
    }

    /// Returns the number of incoming edges of `node`.
    #[must_use]
    pub fn in_degree(&self, node: NodeId) -> usize {
        self.incoming.get(node.index()).map_or(0, Vec::len)
    }

    /// Returns the nodes without outgoing edges.
    pub fn exit_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.node_ids().filter(|&node| self.out_degree(node) == 0)
    }
}

impl<N: Clone, E> GraphBase for DirectedGraph<'_, N, E> {
    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId::new)
    }
}

impl<N: Clone, E> Successors for DirectedGraph<'_, N, E> {
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        DirectedGraph::successors(self, node)
    }
}

impl<N: Clone, E> Predecessors for DirectedGraph<'_, N, E> {
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        DirectedGraph::predecessors(self, node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_diamond_graph() -> DirectedGraph<'static, &'static str, &'static str> {
        let mut graph = DirectedGraph::new();
        let a = graph.add_node("A");
        let b = graph.add_node("B");
        let c = graph.add_node("C");
        let d = graph.add_node("D");
        graph.add_edge(a, b, "a-b").unwrap();
        graph.add_edge(a, c, "a-c").unwrap();
        graph.add_edge(b, d, "b-d").unwrap();
        graph.add_edge(c, d, "c-d").unwrap();
        graph
    }

    #[test]
    fn test_new_graph_is_empty() {
        let graph: DirectedGraph<'static, (), ()> = DirectedGraph::default();
        assert!(graph.is_empty());
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_diamond_adjacency() {
        let graph = create_diamond_graph();
        let (a, b, c, d) = (NodeId::new(0), NodeId::new(1), NodeId::new(2), NodeId::new(3));

        assert_eq!(graph.successors(a).collect::<Vec<_>>(), vec![b, c]);
        assert_eq!(graph.predecessors(d).collect::<Vec<_>>(), vec![b, c]);
        assert_eq!(graph.out_degree(a), 2);
        assert_eq!(graph.in_degree(d), 2);
        assert_eq!(graph.exit_nodes().collect::<Vec<_>>(), vec![d]);
        assert_eq!(graph.node(c), Some(&"C"));
    }

    #[test]
    fn test_edge_data_and_endpoints() {
        let graph = create_diamond_graph();
        let edges: Vec<_> = graph.outgoing_edges(NodeId::new(0)).collect();
        assert_eq!(edges.len(), 2);
        assert_eq!(*edges[1].2, "a-c");
        assert_eq!(graph.edge_endpoints(edges[1].0), Some((NodeId::new(0), NodeId::new(2))));
        assert_eq!(graph.edge(EdgeId::new(3)), Some(&"c-d"));
        assert_eq!(graph.edge(EdgeId::new(9)), None);

        let incoming: Vec<_> = graph.incoming_edges(NodeId::new(3)).map(|(_, s, _)| s).collect();
        assert_eq!(incoming, vec![NodeId::new(1), NodeId::new(2)]);
    }

    #[test]
    fn test_add_edge_invalid_nodes() {
        let mut graph: DirectedGraph<'static, (), ()> = DirectedGraph::new();
        let a = graph.add_node(());
        assert!(matches!(
            graph.add_edge(a, NodeId::new(5), ()),
            Err(Error::GraphError(_))
        ));
        assert!(matches!(
            graph.add_edge(NodeId::new(5), a, ()),
            Err(Error::GraphError(_))
        ));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_borrowed_nodes() {
        let data = vec![10, 20, 30];
        let mut graph: DirectedGraph<'_, i32, ()> = DirectedGraph::from_nodes_borrowed(&data);
        graph.add_edge(NodeId::new(0), NodeId::new(2), ()).unwrap();

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.nodes().map(|(_, v)| *v).sum::<i32>(), 60);
        assert_eq!(graph.successors(NodeId::new(0)).collect::<Vec<_>>(), vec![NodeId::new(2)]);
        assert_eq!(graph.successors(NodeId::new(7)).count(), 0);
    }

    #[test]
    fn test_parallel_edges() {
        let mut graph: DirectedGraph<'static, (), bool> = DirectedGraph::new();
        let a = graph.add_node(());
        let b = graph.add_node(());
        graph.add_edge(a, b, true).unwrap();
        graph.add_edge(a, b, false).unwrap();
        assert_eq!(graph.successors(a).count(), 2);
        assert_eq!(graph.in_degree(b), 2);
    }
}
