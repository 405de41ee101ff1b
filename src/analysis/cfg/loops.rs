//! Natural loop detection and classification.
//!
//! Every edge `latch -> header` where the header dominates the latch closes a
//! natural loop. All back edges into one header share a single [`LoopInfo`].
//! The structurer picks the source form of a loop from its [`LoopType`] and
//! anchors `for` initializers on its preheader:
//!
//! ```text
//!     [preheader]      <- single entry from outside
//!          |
//!     [header] <----+  <- dominates every body block
//!          |        |
//!     [body ...]    |
//!          |        |
//!     [latch] ------+  <- back edge source
//!          |
//!     [exit ...]
//! ```

use rustc_hash::{FxHashMap, FxHashSet};

use crate::utils::graph::{algorithms::DominatorTree, GraphBase, NodeId, Predecessors, Successors};

/// Where a loop tests its exit condition, which selects its source form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopType {
    /// Only the header leaves the loop: `while (cond) { body }`.
    PreTested,
    /// Only the single latch leaves the loop: `do { body } while (cond);`.
    PostTested,
    /// Nothing leaves the loop: `while (true) { body }`.
    Infinite,
    /// Several blocks leave the loop, or it has several latches.
    Complex,
}

/// An edge leaving a loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopExit {
    /// Body block the edge starts in
    pub exiting_block: NodeId,
    /// Block outside the loop the edge reaches
    pub exit_block: NodeId,
}

/// One natural loop.
#[derive(Debug, Clone)]
pub struct LoopInfo {
    /// The single entry block; dominates the whole body.
    pub header: NodeId,
    /// Every block of the loop, header included.
    pub body: FxHashSet<NodeId>,
    /// Back edge sources in block order.
    pub latches: Vec<NodeId>,
    /// The header's only predecessor outside the loop, if it has exactly one.
    pub preheader: Option<NodeId>,
    /// Edges leaving the loop, ordered by exiting block.
    pub exits: Vec<LoopExit>,
    /// Source form suggested by the exit layout.
    pub loop_type: LoopType,
}

impl LoopInfo {
    fn new(header: NodeId) -> Self {
        let mut body = FxHashSet::default();
        body.insert(header);
        Self {
            header,
            body,
            latches: Vec::new(),
            preheader: None,
            exits: Vec::new(),
            loop_type: LoopType::Complex,
        }
    }

    /// Returns `true` if `node` belongs to the loop.
    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        self.body.contains(&node)
    }

    /// Number of blocks in the loop.
    #[must_use]
    pub fn size(&self) -> usize {
        self.body.len()
    }

    /// The latch, when the loop has exactly one back edge.
    #[must_use]
    pub fn single_latch(&self) -> Option<NodeId> {
        match self.latches.as_slice() {
            [latch] => Some(*latch),
            _ => None,
        }
    }

    /// Distinct exit targets in ascending block order.
    #[must_use]
    pub fn exit_blocks(&self) -> Vec<NodeId> {
        let mut blocks: Vec<NodeId> = self.exits.iter().map(|exit| exit.exit_block).collect();
        blocks.sort_unstable();
        blocks.dedup();
        blocks
    }

    fn classify(&self) -> LoopType {
        if self.exits.is_empty() {
            return LoopType::Infinite;
        }
        let only_from = |block: NodeId| self.exits.iter().all(|exit| exit.exiting_block == block);
        // checked first, so a one-block loop testing at its bottom is post-tested
        if self.single_latch().is_some_and(only_from) {
            LoopType::PostTested
        } else if only_from(self.header) {
            LoopType::PreTested
        } else {
            LoopType::Complex
        }
    }
}

/// All natural loops of one method, ordered by header.
#[derive(Debug, Clone, Default)]
pub struct LoopForest {
    loops: Vec<LoopInfo>,
}

impl LoopForest {
    /// Returns the loops ordered by header.
    #[must_use]
    pub fn loops(&self) -> &[LoopInfo] {
        &self.loops
    }

    /// Number of loops.
    #[must_use]
    pub fn len(&self) -> usize {
        self.loops.len()
    }

    /// Returns `true` if the method has no loops.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.loops.is_empty()
    }

    /// Returns the loop headed by `header`.
    #[must_use]
    pub fn loop_for_header(&self, header: NodeId) -> Option<&LoopInfo> {
        self.loops
            .binary_search_by_key(&header, |info| info.header)
            .ok()
            .map(|index| &self.loops[index])
    }

    /// Iterates over the loops ordered by header.
    pub fn iter(&self) -> impl Iterator<Item = &LoopInfo> {
        self.loops.iter()
    }
}

/// Finds the natural loops of `graph` from its dominator tree.
#[must_use]
pub fn detect_loops<G>(graph: &G, dominators: &DominatorTree) -> LoopForest
where
    G: GraphBase + Successors + Predecessors,
{
    let mut by_header: FxHashMap<NodeId, LoopInfo> = FxHashMap::default();

    for node in graph.node_ids() {
        if !dominators.is_reachable(node) {
            continue;
        }
        for header in graph.successors(node) {
            if !dominators.dominates(header, node) {
                continue;
            }
            let info = by_header
                .entry(header)
                .or_insert_with(|| LoopInfo::new(header));
            if !info.latches.contains(&node) {
                info.latches.push(node);
            }
            collect_body(graph, info, node);
        }
    }

    let mut loops: Vec<LoopInfo> = by_header
        .into_values()
        .map(|mut info| {
            info.latches.sort_unstable();
            info.preheader = preheader(graph, &info);
            info.exits = exits(graph, &info);
            info.loop_type = info.classify();
            info
        })
        .collect();
    loops.sort_by_key(|info| info.header);
    LoopForest { loops }
}

/// Adds every block that reaches `latch` without passing the header.
fn collect_body<G: Predecessors>(graph: &G, info: &mut LoopInfo, latch: NodeId) {
    let mut work = vec![latch];
    while let Some(node) = work.pop() {
        if node != info.header && info.body.insert(node) {
            work.extend(graph.predecessors(node));
        }
    }
}

fn preheader<G: Predecessors>(graph: &G, info: &LoopInfo) -> Option<NodeId> {
    let mut outside = graph
        .predecessors(info.header)
        .filter(|pred| !info.contains(*pred));
    match (outside.next(), outside.next()) {
        (Some(single), None) => Some(single),
        _ => None,
    }
}

fn exits<G: Successors>(graph: &G, info: &LoopInfo) -> Vec<LoopExit> {
    let mut body: Vec<NodeId> = info.body.iter().copied().collect();
    body.sort_unstable();
    body.into_iter()
        .flat_map(|block| {
            graph
                .successors(block)
                .filter(|succ| !info.contains(*succ))
                .map(move |exit_block| LoopExit {
                    exiting_block: block,
                    exit_block,
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::graph::{algorithms::compute_dominators, DirectedGraph};

    fn forest(nodes: usize, edges: &[(usize, usize)]) -> LoopForest {
        let mut graph: DirectedGraph<'static, (), ()> = DirectedGraph::new();
        for _ in 0..nodes {
            graph.add_node(());
        }
        for &(from, to) in edges {
            graph
                .add_edge(NodeId::new(from), NodeId::new(to), ())
                .unwrap();
        }
        let doms = compute_dominators(&graph, NodeId::new(0));
        detect_loops(&graph, &doms)
    }

    #[test]
    fn test_while_loop_is_pre_tested() {
        // 0 -> 1; 1 -> 2 | 3; 2 -> 1
        let loops = forest(4, &[(0, 1), (1, 2), (1, 3), (2, 1)]);

        assert_eq!(loops.len(), 1);
        let info = &loops.loops()[0];
        assert_eq!(info.header, NodeId::new(1));
        assert_eq!(info.single_latch(), Some(NodeId::new(2)));
        assert_eq!(info.preheader, Some(NodeId::new(0)));
        assert_eq!(info.loop_type, LoopType::PreTested);
        assert_eq!(info.exit_blocks(), vec![NodeId::new(3)]);
    }

    #[test]
    fn test_do_while_is_post_tested() {
        // 0 -> 1; 1 -> 2; 2 -> 1 | 3
        let loops = forest(4, &[(0, 1), (1, 2), (2, 1), (2, 3)]);
        assert_eq!(loops.loops()[0].loop_type, LoopType::PostTested);
    }

    #[test]
    fn test_self_loop_is_post_tested() {
        let loops = forest(3, &[(0, 1), (1, 1), (1, 2)]);
        let info = &loops.loops()[0];
        assert_eq!(info.size(), 1);
        assert_eq!(info.loop_type, LoopType::PostTested);
    }

    #[test]
    fn test_infinite_loop() {
        let loops = forest(2, &[(0, 1), (1, 1)]);
        assert_eq!(loops.loops()[0].loop_type, LoopType::Infinite);
    }

    #[test]
    fn test_two_exits_are_complex() {
        // 1 tests, 2 breaks out to 4, 3 is the latch
        let loops = forest(5, &[(0, 1), (1, 2), (1, 4), (2, 3), (2, 4), (3, 1)]);
        let info = &loops.loops()[0];
        assert_eq!(info.loop_type, LoopType::Complex);
        assert_eq!(info.exit_blocks(), vec![NodeId::new(4)]);
        assert_eq!(info.exits.len(), 2);
    }

    #[test]
    fn test_nested_loops() {
        // outer: 1 .. 4, inner: 2 .. 3
        let loops = forest(
            6,
            &[(0, 1), (1, 2), (1, 5), (2, 3), (2, 4), (3, 2), (4, 1)],
        );

        assert_eq!(loops.len(), 2);
        let outer = loops.loop_for_header(NodeId::new(1)).unwrap();
        let inner = loops.loop_for_header(NodeId::new(2)).unwrap();
        assert!(outer.contains(NodeId::new(3)));
        assert!(!inner.contains(NodeId::new(4)));
        assert_eq!(inner.preheader, Some(NodeId::new(1)));
        assert_eq!(outer.preheader, Some(NodeId::new(0)));
        assert!(loops.loop_for_header(NodeId::new(3)).is_none());
    }

    #[test]
    fn test_two_entries_have_no_preheader() {
        // 0 -> 1 | 2; both enter the loop at 2
        let loops = forest(5, &[(0, 1), (0, 2), (1, 2), (2, 3), (3, 2), (2, 4)]);
        assert_eq!(loops.loops()[0].preheader, None);
    }

    #[test]
    fn test_no_loops() {
        assert!(forest(3, &[(0, 1), (1, 2)]).is_empty());
    }
}
