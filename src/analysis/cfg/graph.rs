//! Control Flow Graph implementation.
//!
//! This module provides the main [`ControlFlowGraph`] structure that wraps a
//! method's basic blocks with graph semantics and provides access to dominator
//! trees, post-dominator trees, loops and traversals.

use std::sync::OnceLock;

use crate::{
    analysis::cfg::{detect_loops, CfgEdge, CfgEdgeKind, LoopForest},
    bytecode::{BasicBlock, FlowType, Terminator},
    utils::graph::{
        algorithms::{self, DominatorTree, PostDominatorTree},
        DirectedGraph, EdgeId, GraphBase, NodeId, Predecessors, RootedGraph, Successors,
    },
    Error::GraphError,
    Result,
};

/// A control flow graph over one method's basic blocks.
///
/// The graph borrows the blocks of a [`MethodBody`](crate::bytecode::MethodBody);
/// node `n` is block `n` and block 0 is the entry.
///
/// # Lazy Computation
///
/// Expensive analyses are computed on first access and cached:
///
/// - [`dominators`](Self::dominators)
/// - [`post_dominators`](Self::post_dominators)
/// - [`loops`](Self::loops)
/// - [`reverse_postorder`](Self::reverse_postorder)
///
/// # Thread Safety
///
/// `ControlFlowGraph` is [`Send`] and [`Sync`]. Lazy-initialized fields use
/// [`OnceLock`] for thread-safe initialization.
#[derive(Debug)]
pub struct ControlFlowGraph<'a> {
    graph: DirectedGraph<'a, BasicBlock, CfgEdge>,
    entry: NodeId,
    /// Blocks ending in `return` or `throw`.
    exits: Vec<NodeId>,
    dominators: OnceLock<DominatorTree>,
    post_dominators: OnceLock<PostDominatorTree>,
    loops: OnceLock<LoopForest>,
    rpo: OnceLock<Vec<NodeId>>,
}

impl<'a> ControlFlowGraph<'a> {
    /// Creates a control flow graph borrowing blocks from a slice.
    ///
    /// # Arguments
    ///
    /// * `blocks` - The method's blocks, entry first
    ///
    /// # Errors
    ///
    /// Returns [`GraphError`] if the slice is empty or a terminator names a
    /// block outside it.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use classcope::analysis::ControlFlowGraph;
    ///
    /// let cfg = ControlFlowGraph::from_blocks_ref(&method.blocks)?;
    /// assert_eq!(cfg.entry().index(), 0);
    /// ```
    pub fn from_blocks_ref(blocks: &'a [BasicBlock]) -> Result<Self> {
        if blocks.is_empty() {
            return Err(GraphError(
                "Cannot create CFG from empty block list".to_string(),
            ));
        }

        let block_count = blocks.len();
        let mut graph: DirectedGraph<'a, BasicBlock, CfgEdge> =
            DirectedGraph::from_nodes_borrowed(blocks);

        for (block_idx, block) in blocks.iter().enumerate() {
            let node_id = NodeId::new(block_idx);
            for edge in Self::edges_of(&block.terminator) {
                let target = edge.target();
                if target >= block_count {
                    return Err(GraphError(format!(
                        "Block {block_idx} has successor index {target} which exceeds block count {block_count}"
                    )));
                }
                graph.add_edge(node_id, NodeId::new(target), edge)?;
            }
        }

        let exits = blocks
            .iter()
            .enumerate()
            .filter(|(_, block)| {
                matches!(
                    block.terminator.flow_type(),
                    FlowType::Return | FlowType::Throw
                )
            })
            .map(|(idx, _)| NodeId::new(idx))
            .collect();

        Ok(Self {
            graph,
            entry: NodeId::new(0),
            exits,
            dominators: OnceLock::new(),
            post_dominators: OnceLock::new(),
            loops: OnceLock::new(),
            rpo: OnceLock::new(),
        })
    }

    /// Maps a terminator to its typed edges, taken edge first.
    fn edges_of(terminator: &Terminator) -> Vec<CfgEdge> {
        match terminator {
            Terminator::Goto(target) => vec![CfgEdge::unconditional(*target)],
            Terminator::Branch {
                kind,
                taken,
                fallthrough,
            } => vec![
                CfgEdge::conditional_true(*taken, *kind),
                CfgEdge::conditional_false(*fallthrough),
            ],
            Terminator::Switch { cases, default } => cases
                .iter()
                .map(|&(key, target)| CfgEdge::switch_case(target, Some(key)))
                .chain(std::iter::once(CfgEdge::switch_case(*default, None)))
                .collect(),
            Terminator::Return | Terminator::ReturnValue | Terminator::Throw => Vec::new(),
        }
    }

    /// Returns the entry block ID.
    #[must_use]
    pub const fn entry(&self) -> NodeId {
        self.entry
    }

    /// Returns the blocks that leave the method.
    #[must_use]
    pub fn exits(&self) -> &[NodeId] {
        &self.exits
    }

    /// Returns the number of blocks in the CFG.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns a reference to the basic block at the given node ID.
    #[must_use]
    pub fn block(&self, node_id: NodeId) -> Option<&BasicBlock> {
        self.graph.node(node_id)
    }

    /// Returns the dominator tree for this CFG.
    #[must_use]
    pub fn dominators(&self) -> &DominatorTree {
        self.dominators
            .get_or_init(|| algorithms::compute_dominators(&self.graph, self.entry))
    }

    /// Returns the post-dominator tree for this CFG.
    ///
    /// All exits are joined under one virtual exit, so a block whose paths end
    /// in different `return`s has no immediate post-dominator.
    #[must_use]
    pub fn post_dominators(&self) -> &PostDominatorTree {
        self.post_dominators
            .get_or_init(|| algorithms::compute_post_dominators(&self.graph))
    }

    /// Returns the natural loops detected in this CFG.
    #[must_use]
    pub fn loops(&self) -> &LoopForest {
        self.loops
            .get_or_init(|| detect_loops(&self.graph, self.dominators()))
    }

    /// Returns true if this CFG contains any loops.
    #[must_use]
    pub fn has_loops(&self) -> bool {
        !self.loops().is_empty()
    }

    /// Checks if a block dominates another block.
    #[must_use]
    pub fn dominates(&self, dominator: NodeId, dominated: NodeId) -> bool {
        self.dominators().dominates(dominator, dominated)
    }

    /// Returns the immediate post-dominator of a block.
    ///
    /// `None` when the nearest common post-dominator is the virtual exit, or
    /// when the block never reaches an exit.
    #[must_use]
    pub fn ipdom(&self, node_id: NodeId) -> Option<NodeId> {
        self.post_dominators().immediate_post_dominator(node_id)
    }

    /// Returns true if the block is reachable from the entry.
    #[must_use]
    pub fn is_reachable(&self, node_id: NodeId) -> bool {
        self.dominators().is_reachable(node_id)
    }

    /// Returns the successor block IDs for a given block, in edge order.
    pub fn successors(&self, node_id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.successors(node_id)
    }

    /// Returns the predecessor block IDs for a given block.
    pub fn predecessors(&self, node_id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.predecessors(node_id)
    }

    /// Returns the outgoing edges from a block as `(edge_id, target, edge)` triples.
    pub fn outgoing_edges(
        &self,
        node_id: NodeId,
    ) -> impl Iterator<Item = (EdgeId, NodeId, &CfgEdge)> + '_ {
        self.graph.outgoing_edges(node_id)
    }

    /// Returns the kinds of the edges from `from` to `to`.
    pub fn edge_kinds(&self, from: NodeId, to: NodeId) -> impl Iterator<Item = &CfgEdgeKind> + '_ {
        self.outgoing_edges(from)
            .filter(move |(_, target, _)| *target == to)
            .map(|(_, _, edge)| edge.kind())
    }

    /// Returns reachable blocks in reverse postorder.
    #[must_use]
    pub fn reverse_postorder(&self) -> &[NodeId] {
        self.rpo
            .get_or_init(|| algorithms::reverse_postorder(&self.graph, self.entry))
    }

    /// Returns reachable blocks in postorder.
    #[must_use]
    pub fn postorder(&self) -> Vec<NodeId> {
        algorithms::postorder(&self.graph, self.entry)
    }

    /// Returns the retreating edges whose target does not dominate their source.
    ///
    /// Such an edge enters a cycle somewhere other than its header, which no
    /// structured loop can express.
    #[must_use]
    pub fn irreducible_edges(&self) -> Vec<(NodeId, NodeId)> {
        let mut rpo_index = vec![usize::MAX; self.block_count()];
        for (position, node) in self.reverse_postorder().iter().enumerate() {
            rpo_index[node.index()] = position;
        }

        let dominators = self.dominators();
        let mut edges = Vec::new();
        for &node in self.reverse_postorder() {
            for succ in self.successors(node) {
                let retreating = rpo_index[succ.index()] <= rpo_index[node.index()];
                if retreating && !dominators.dominates(succ, node) {
                    edges.push((node, succ));
                }
            }
        }
        edges
    }

    /// Returns true if every cycle in the graph is a natural loop.
    #[must_use]
    pub fn is_reducible(&self) -> bool {
        self.irreducible_edges().is_empty()
    }
}

impl GraphBase for ControlFlowGraph<'_> {
    fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        self.graph.node_ids()
    }
}

impl Successors for ControlFlowGraph<'_> {
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.graph.successors(node)
    }
}

impl Predecessors for ControlFlowGraph<'_> {
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.graph.predecessors(node)
    }
}

impl RootedGraph for ControlFlowGraph<'_> {
    fn entry(&self) -> NodeId {
        self.entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{analysis::cfg::LoopType, ast::CompareOp, bytecode::BranchKind};

    fn branch(taken: usize, fallthrough: usize) -> BasicBlock {
        BasicBlock::new(
            Vec::new(),
            Terminator::Branch {
                kind: BranchKind::IfZero(CompareOp::Eq),
                taken,
                fallthrough,
            },
        )
    }

    fn goto(target: usize) -> BasicBlock {
        BasicBlock::new(Vec::new(), Terminator::Goto(target))
    }

    fn ret() -> BasicBlock {
        BasicBlock::new(Vec::new(), Terminator::Return)
    }

    #[test]
    fn test_cfg_from_empty_blocks() {
        let blocks: Vec<BasicBlock> = Vec::new();
        assert!(ControlFlowGraph::from_blocks_ref(&blocks).is_err());
    }

    #[test]
    fn test_cfg_invalid_successor() {
        let blocks = vec![goto(7)];
        assert!(matches!(
            ControlFlowGraph::from_blocks_ref(&blocks),
            Err(GraphError(_))
        ));
    }

    #[test]
    fn test_cfg_diamond_shape() {
        let blocks = vec![branch(2, 1), goto(3), goto(3), ret()];
        let cfg = ControlFlowGraph::from_blocks_ref(&blocks).unwrap();

        assert_eq!(cfg.block_count(), 4);
        assert_eq!(cfg.exits(), &[NodeId::new(3)]);
        assert_eq!(
            cfg.successors(NodeId::new(0)).collect::<Vec<_>>(),
            vec![NodeId::new(2), NodeId::new(1)]
        );
        assert!(cfg.dominates(NodeId::new(0), NodeId::new(3)));
        assert!(!cfg.dominates(NodeId::new(1), NodeId::new(3)));
        assert_eq!(cfg.ipdom(NodeId::new(0)), Some(NodeId::new(3)));
        assert!(!cfg.has_loops());
        assert!(cfg.is_reducible());

        let kinds: Vec<_> = cfg.edge_kinds(NodeId::new(0), NodeId::new(2)).collect();
        assert_eq!(
            kinds,
            vec![&CfgEdgeKind::ConditionalTrue(BranchKind::IfZero(CompareOp::Eq))]
        );
    }

    #[test]
    fn test_cfg_two_returns_have_no_merge() {
        let blocks = vec![branch(2, 1), ret(), ret()];
        let cfg = ControlFlowGraph::from_blocks_ref(&blocks).unwrap();
        assert_eq!(cfg.ipdom(NodeId::new(0)), None);
        assert_eq!(cfg.exits().len(), 2);
    }

    #[test]
    fn test_cfg_simple_loop_detection() {
        // 0 -> 1; 1 -> 3 | 2; 2 -> 1
        let blocks = vec![goto(1), branch(3, 2), goto(1), ret()];
        let cfg = ControlFlowGraph::from_blocks_ref(&blocks).unwrap();

        assert!(cfg.has_loops());
        let info = cfg.loops().loop_for_header(NodeId::new(1)).unwrap();
        assert_eq!(info.loop_type, LoopType::PreTested);
        assert_eq!(info.single_latch(), Some(NodeId::new(2)));
        assert!(cfg.is_reducible());
    }

    #[test]
    fn test_cfg_irreducible() {
        // Two entries into the cycle 1 <-> 2
        let blocks = vec![branch(2, 1), goto(2), branch(1, 3), ret()];
        let cfg = ControlFlowGraph::from_blocks_ref(&blocks).unwrap();

        assert!(!cfg.is_reducible());
        assert_eq!(cfg.irreducible_edges().len(), 1);
    }

    #[test]
    fn test_cfg_switch_edges() {
        let blocks = vec![
            BasicBlock::new(
                Vec::new(),
                Terminator::Switch {
                    cases: vec![(1, 1), (2, 2)],
                    default: 3,
                },
            ),
            ret(),
            ret(),
            ret(),
        ];
        let cfg = ControlFlowGraph::from_blocks_ref(&blocks).unwrap();
        let kinds: Vec<_> = cfg
            .outgoing_edges(NodeId::new(0))
            .map(|(_, _, edge)| edge.kind().clone())
            .collect();
        assert_eq!(
            kinds,
            vec![
                CfgEdgeKind::Switch { case_value: Some(1) },
                CfgEdgeKind::Switch { case_value: Some(2) },
                CfgEdgeKind::Switch { case_value: None },
            ]
        );
    }

    #[test]
    fn test_cfg_traversal_orders() {
        let blocks = vec![goto(1), goto(2), ret()];
        let cfg = ControlFlowGraph::from_blocks_ref(&blocks).unwrap();
        assert_eq!(
            cfg.reverse_postorder(),
            &[NodeId::new(0), NodeId::new(1), NodeId::new(2)]
        );
        assert_eq!(
            cfg.postorder(),
            vec![NodeId::new(2), NodeId::new(1), NodeId::new(0)]
        );
    }
}
