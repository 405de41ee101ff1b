//! Dominator and post-dominator trees.
//!
//! A node `d` **dominates** `n` if every path from the entry to `n` passes
//! through `d`. A node `p` **post-dominates** `n` if every path from `n` to a
//! method exit passes through `p`. The structuring engine uses dominators to
//! find back edges and post-dominators to find the merge point of a branch.
//!
//! # Algorithm
//!
//! Dominators are computed with the iterative algorithm of Cooper, Harvey and
//! Kennedy ("A Simple, Fast Dominance Algorithm"). Method graphs are small, and
//! the fixpoint over reverse postorder converges in two or three passes.
//!
//! Post-dominators run the same algorithm on a reversed view of the graph in
//! which a virtual exit node precedes every node without successors. Nodes that
//! cannot reach an exit (e.g. the body of an infinite loop) have no
//! post-dominator.

use crate::utils::graph::{
    algorithms::traversal::postorder, GraphBase, NodeId, Predecessors, RootedGraph, Successors,
};

/// Result of dominator tree computation.
///
/// Each reachable node except the entry has exactly one immediate dominator.
/// Unreachable nodes have none and are dominated only by themselves.
///
/// # Examples
///
/// ```rust,ignore
/// use classcope::utils::graph::{algorithms::compute_dominators, DirectedGraph};
///
/// let mut graph: DirectedGraph<&str, ()> = DirectedGraph::new();
/// let entry = graph.add_node("entry");
/// let a = graph.add_node("a");
/// let b = graph.add_node("b");
/// graph.add_edge(entry, a, ())?;
/// graph.add_edge(a, b, ())?;
///
/// let dom_tree = compute_dominators(&graph, entry);
/// assert_eq!(dom_tree.immediate_dominator(b), Some(a));
/// assert!(dom_tree.dominates(entry, b));
/// # Ok::<(), classcope::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct DominatorTree {
    /// The entry (root) node of the dominator tree
    entry: NodeId,
    /// Immediate dominator per node; the entry maps to itself, unreachable nodes to `None`
    idom: Vec<Option<NodeId>>,
    /// Number of nodes in the graph
    node_count: usize,
}

impl DominatorTree {
    /// Returns the entry (root) node of the dominator tree.
    #[inline]
    #[must_use]
    pub fn entry(&self) -> NodeId {
        self.entry
    }

    /// Returns the immediate dominator of a node.
    ///
    /// `None` for the entry node, for unreachable nodes and for unknown nodes.
    #[must_use]
    pub fn immediate_dominator(&self, node: NodeId) -> Option<NodeId> {
        if node == self.entry {
            return None;
        }
        self.idom.get(node.index()).copied().flatten()
    }

    /// Returns `true` if `node` is reachable from the entry.
    #[must_use]
    pub fn is_reachable(&self, node: NodeId) -> bool {
        self.idom.get(node.index()).is_some_and(Option::is_some)
    }

    /// Checks if node `a` dominates node `b`.
    ///
    /// A node dominates itself.
    ///
    /// # Complexity
    ///
    /// O(depth) where depth is the depth of `b` in the dominator tree.
    #[must_use]
    pub fn dominates(&self, a: NodeId, b: NodeId) -> bool {
        self.dominators(b).any(|d| d == a)
    }

    /// Checks if node `a` strictly dominates node `b`.
    #[inline]
    #[must_use]
    pub fn strictly_dominates(&self, a: NodeId, b: NodeId) -> bool {
        a != b && self.dominates(a, b)
    }

    /// Returns an iterator over all dominators of a node, from the node itself
    /// up to and including the entry node.
    ///
    /// For an unreachable node the iterator yields only the node itself.
    pub fn dominators(&self, node: NodeId) -> DominatorIterator<'_> {
        DominatorIterator {
            tree: self,
            current: Some(node),
        }
    }

    /// Returns the depth of a node in the dominator tree. The entry has depth 0.
    #[must_use]
    pub fn depth(&self, node: NodeId) -> usize {
        self.dominators(node).count().saturating_sub(1)
    }

    /// Returns all children of a node in the dominator tree, by ascending index.
    ///
    /// # Complexity
    ///
    /// O(V) where V is the number of nodes.
    #[must_use]
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        (0..self.node_count)
            .map(NodeId::new)
            .filter(|&n| n != self.entry && self.idom[n.index()] == Some(node))
            .collect()
    }

    /// Returns the number of nodes covered by the tree.
    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.node_count
    }
}

/// Iterator over dominators of a node, from the node up to the entry.
pub struct DominatorIterator<'a> {
    tree: &'a DominatorTree,
    current: Option<NodeId>,
}

impl Iterator for DominatorIterator<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current?;
        self.current = self.tree.immediate_dominator(current);
        Some(current)
    }
}

/// Computes the dominator tree of `graph` rooted at `entry`.
///
/// # Arguments
///
/// * `graph` - The graph to analyze
/// * `entry` - The root node
///
/// # Returns
///
/// The dominator tree. If `entry` is not a node of the graph every node is
/// reported as unreachable.
pub fn compute_dominators<G>(graph: &G, entry: NodeId) -> DominatorTree
where
    G: Successors + Predecessors,
{
    let node_count = graph.node_count();
    let order = postorder(graph, entry);

    let mut po_number = vec![usize::MAX; node_count];
    for (index, node) in order.iter().enumerate() {
        po_number[node.index()] = index;
    }

    let mut idom: Vec<Option<NodeId>> = vec![None; node_count];
    if entry.index() < node_count {
        idom[entry.index()] = Some(entry);
    }

    let mut changed = true;
    while changed {
        changed = false;
        for &node in order.iter().rev() {
            if node == entry {
                continue;
            }

            let mut new_idom: Option<NodeId> = None;
            for pred in graph.predecessors(node) {
                if idom.get(pred.index()).copied().flatten().is_none() {
                    continue;
                }
                new_idom = Some(match new_idom {
                    None => pred,
                    Some(current) => intersect(&idom, &po_number, pred, current),
                });
            }

            if new_idom.is_some() && idom[node.index()] != new_idom {
                idom[node.index()] = new_idom;
                changed = true;
            }
        }
    }

    DominatorTree {
        entry,
        idom,
        node_count,
    }
}

/// Computes the dominator tree of a graph with a designated entry.
pub fn compute_dominators_rooted<G: RootedGraph>(graph: &G) -> DominatorTree {
    compute_dominators(graph, graph.entry())
}

/// Walks both fingers up the partial tree until they meet.
fn intersect(idom: &[Option<NodeId>], po_number: &[usize], a: NodeId, b: NodeId) -> NodeId {
    let mut finger1 = a;
    let mut finger2 = b;
    while finger1 != finger2 {
        while po_number[finger1.index()] < po_number[finger2.index()] {
            match idom[finger1.index()] {
                Some(next) => finger1 = next,
                None => return finger2,
            }
        }
        while po_number[finger2.index()] < po_number[finger1.index()] {
            match idom[finger2.index()] {
                Some(next) => finger2 = next,
                None => return finger1,
            }
        }
    }
    finger1
}

/// Reversed view of a graph with an extra node standing for "method exit".
struct ReversedWithExit<'g, G> {
    graph: &'g G,
    exits: Vec<NodeId>,
    virtual_exit: NodeId,
}

impl<G: Successors + Predecessors> GraphBase for ReversedWithExit<'_, G> {
    fn node_count(&self) -> usize {
        self.graph.node_count() + 1
    }

    fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..=self.graph.node_count()).map(NodeId::new)
    }
}

impl<G: Successors + Predecessors> Successors for ReversedWithExit<'_, G> {
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        let next: Vec<NodeId> = if node == self.virtual_exit {
            self.exits.clone()
        } else {
            self.graph.predecessors(node).collect()
        };
        next.into_iter()
    }
}

impl<G: Successors + Predecessors> Predecessors for ReversedWithExit<'_, G> {
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        let mut prev: Vec<NodeId> = Vec::new();
        if node != self.virtual_exit {
            prev.extend(self.graph.successors(node));
            if prev.is_empty() {
                prev.push(self.virtual_exit);
            }
        }
        prev.into_iter()
    }
}

/// Post-dominator tree of a graph.
///
/// Built over a virtual exit node that follows every node without successors.
/// The virtual exit never appears in query results.
#[derive(Debug, Clone)]
pub struct PostDominatorTree {
    tree: DominatorTree,
    virtual_exit: NodeId,
}

impl PostDominatorTree {
    /// Returns the immediate post-dominator of `node`.
    ///
    /// `None` when the closest post-dominator is the virtual exit (for example a
    /// branch whose arms both return) or when `node` cannot reach any exit.
    #[must_use]
    pub fn immediate_post_dominator(&self, node: NodeId) -> Option<NodeId> {
        self.tree
            .immediate_dominator(node)
            .filter(|&n| n != self.virtual_exit)
    }

    /// Checks if `a` post-dominates `b`. A node post-dominates itself.
    #[must_use]
    pub fn post_dominates(&self, a: NodeId, b: NodeId) -> bool {
        self.tree.dominates(a, b)
    }

    /// Returns `true` if some exit is reachable from `node`.
    #[must_use]
    pub fn reaches_exit(&self, node: NodeId) -> bool {
        node != self.virtual_exit && self.tree.is_reachable(node)
    }
}

/// Computes the post-dominator tree of `graph`.
///
/// Every node without successors is treated as an exit.
pub fn compute_post_dominators<G>(graph: &G) -> PostDominatorTree
where
    G: Successors + Predecessors,
{
    let virtual_exit = NodeId::new(graph.node_count());
    let exits = graph
        .node_ids()
        .filter(|&node| graph.successors(node).next().is_none())
        .collect();

    let reversed = ReversedWithExit {
        graph,
        exits,
        virtual_exit,
    };

    PostDominatorTree {
        tree: compute_dominators(&reversed, virtual_exit),
        virtual_exit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::graph::DirectedGraph;

    fn graph_from_edges(count: usize, edges: &[(usize, usize)]) -> DirectedGraph<'static, (), ()> {
        let mut graph = DirectedGraph::new();
        for _ in 0..count {
            graph.add_node(());
        }
        for &(from, to) in edges {
            graph.add_edge(NodeId::new(from), NodeId::new(to), ()).unwrap();
        }
        graph
    }

    #[test]
    fn test_diamond_dominators() {
        let graph = graph_from_edges(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        let dom = compute_dominators(&graph, NodeId::new(0));

        assert_eq!(dom.immediate_dominator(NodeId::new(0)), None);
        assert_eq!(dom.immediate_dominator(NodeId::new(1)), Some(NodeId::new(0)));
        assert_eq!(dom.immediate_dominator(NodeId::new(3)), Some(NodeId::new(0)));
        assert!(!dom.dominates(NodeId::new(1), NodeId::new(3)));
        assert!(dom.strictly_dominates(NodeId::new(0), NodeId::new(3)));
        assert_eq!(dom.depth(NodeId::new(3)), 1);
        assert_eq!(
            dom.children(NodeId::new(0)),
            vec![NodeId::new(1), NodeId::new(2), NodeId::new(3)]
        );
    }

    #[test]
    fn test_loop_dominators() {
        // 0 -> 1 (header) -> 2 (body) -> 1, 1 -> 3 (exit)
        let graph = graph_from_edges(4, &[(0, 1), (1, 2), (2, 1), (1, 3)]);
        let dom = compute_dominators(&graph, NodeId::new(0));

        assert!(dom.dominates(NodeId::new(1), NodeId::new(2)));
        assert!(dom.dominates(NodeId::new(1), NodeId::new(3)));
        let chain: Vec<_> = dom.dominators(NodeId::new(2)).collect();
        assert_eq!(chain, vec![NodeId::new(2), NodeId::new(1), NodeId::new(0)]);
    }

    #[test]
    fn test_unreachable_node() {
        let graph = graph_from_edges(3, &[(0, 1), (2, 1)]);
        let dom = compute_dominators(&graph, NodeId::new(0));

        assert!(!dom.is_reachable(NodeId::new(2)));
        assert_eq!(dom.immediate_dominator(NodeId::new(2)), None);
        assert_eq!(dom.immediate_dominator(NodeId::new(1)), Some(NodeId::new(0)));
        assert!(dom.dominates(NodeId::new(2), NodeId::new(2)));
        assert!(!dom.dominates(NodeId::new(0), NodeId::new(2)));
    }

    #[test]
    fn test_diamond_post_dominators() {
        let graph = graph_from_edges(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        let post = compute_post_dominators(&graph);

        assert_eq!(post.immediate_post_dominator(NodeId::new(0)), Some(NodeId::new(3)));
        assert_eq!(post.immediate_post_dominator(NodeId::new(1)), Some(NodeId::new(3)));
        assert_eq!(post.immediate_post_dominator(NodeId::new(3)), None);
        assert!(post.post_dominates(NodeId::new(3), NodeId::new(0)));
        assert!(post.reaches_exit(NodeId::new(2)));
    }

    #[test]
    fn test_post_dominators_two_returns() {
        // Both arms exit: the branch has no real merge
        let graph = graph_from_edges(3, &[(0, 1), (0, 2)]);
        let post = compute_post_dominators(&graph);
        assert_eq!(post.immediate_post_dominator(NodeId::new(0)), None);
    }

    #[test]
    fn test_post_dominators_infinite_loop() {
        let graph = graph_from_edges(3, &[(0, 1), (1, 2), (2, 1)]);
        let post = compute_post_dominators(&graph);
        assert!(!post.reaches_exit(NodeId::new(1)));
        assert_eq!(post.immediate_post_dominator(NodeId::new(0)), None);
    }

    #[test]
    fn test_loop_post_dominators() {
        let graph = graph_from_edges(4, &[(0, 1), (1, 2), (2, 1), (1, 3)]);
        let post = compute_post_dominators(&graph);
        assert_eq!(post.immediate_post_dominator(NodeId::new(1)), Some(NodeId::new(3)));
        assert_eq!(post.immediate_post_dominator(NodeId::new(2)), Some(NodeId::new(1)));
    }
}
