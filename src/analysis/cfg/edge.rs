//! Control flow edge types for the CFG.

use crate::bytecode::BranchKind;

/// The kind of control flow represented by an edge.
///
/// ```rust
/// use classcope::analysis::CfgEdgeKind;
/// use classcope::bytecode::BranchKind;
///
/// let edge_kind = CfgEdgeKind::ConditionalTrue(BranchKind::IfNull);
/// assert!(edge_kind.is_conditional());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CfgEdgeKind {
    /// `goto` or fall-through to a single successor.
    Unconditional,

    /// The taken edge of a two-way branch, labeled with the test that selects it.
    ConditionalTrue(BranchKind),

    /// The fall-through edge of a two-way branch.
    ConditionalFalse,

    /// A switch edge; `None` marks the default.
    Switch {
        /// The case key that selects this edge, or `None` for the default case.
        case_value: Option<i32>,
    },
}

impl CfgEdgeKind {
    /// Returns `true` if this is a conditional branch edge.
    #[must_use]
    pub const fn is_conditional(&self) -> bool {
        matches!(self, Self::ConditionalTrue(_) | Self::ConditionalFalse)
    }

    /// Returns `true` if this is a switch case edge.
    #[must_use]
    pub const fn is_switch(&self) -> bool {
        matches!(self, Self::Switch { .. })
    }
}

/// An edge in the control flow graph.
///
/// ```rust
/// use classcope::analysis::{CfgEdge, CfgEdgeKind};
///
/// let edge = CfgEdge::unconditional(1);
/// assert_eq!(edge.target(), 1);
/// assert!(!edge.kind().is_conditional());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfgEdge {
    target: usize,
    kind: CfgEdgeKind,
}

impl CfgEdge {
    /// Creates a new CFG edge.
    ///
    /// # Arguments
    ///
    /// * `target` - The target block index
    /// * `kind` - The kind of control flow
    #[must_use]
    pub const fn new(target: usize, kind: CfgEdgeKind) -> Self {
        Self { target, kind }
    }

    /// Returns the target block index of this edge.
    #[must_use]
    pub const fn target(&self) -> usize {
        self.target
    }

    /// Returns the kind of control flow this edge represents.
    #[must_use]
    pub const fn kind(&self) -> &CfgEdgeKind {
        &self.kind
    }

    /// Creates an unconditional edge to the target block.
    #[must_use]
    pub const fn unconditional(target: usize) -> Self {
        Self::new(target, CfgEdgeKind::Unconditional)
    }

    /// Creates the taken edge of a branch.
    #[must_use]
    pub const fn conditional_true(target: usize, test: BranchKind) -> Self {
        Self::new(target, CfgEdgeKind::ConditionalTrue(test))
    }

    /// Creates the fall-through edge of a branch.
    #[must_use]
    pub const fn conditional_false(target: usize) -> Self {
        Self::new(target, CfgEdgeKind::ConditionalFalse)
    }

    /// Creates a switch case edge to the target block.
    ///
    /// # Arguments
    ///
    /// * `target` - The target block index
    /// * `case_value` - The case value, or `None` for the default case
    #[must_use]
    pub const fn switch_case(target: usize, case_value: Option<i32>) -> Self {
        Self::new(target, CfgEdgeKind::Switch { case_value })
    }
}
