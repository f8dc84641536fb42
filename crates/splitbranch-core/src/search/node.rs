//! Search node representation.

use crate::branching::{LinearConstraint, NodeId};

/// How a processed node left the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    /// Node was pruned (bound >= incumbent).
    Pruned,

    /// Node LP relaxation is infeasible.
    Infeasible,

    /// Node produced an integer-feasible solution.
    IntegerFeasible,

    /// Node was branched (children created).
    Branched,
}

/// A variable bound tightening from branching.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundChange {
    pub column: usize,
    pub lower: f64,
    pub upper: f64,
}

impl BoundChange {
    /// "Down" branch: x <= floor(value).
    pub fn down(column: usize, value: f64) -> Self {
        Self {
            column,
            lower: f64::NEG_INFINITY,
            upper: value.floor(),
        }
    }

    /// "Up" branch: x >= ceil(value).
    pub fn up(column: usize, value: f64) -> Self {
        Self {
            column,
            lower: value.ceil(),
            upper: f64::INFINITY,
        }
    }
}

/// A node in the search tree.
///
/// Bound changes and local constraints are accumulated from the root, so a
/// node carries everything needed to rebuild its LP.
#[derive(Debug, Clone)]
pub struct SearchNode {
    pub id: NodeId,

    /// Parent node (None for root).
    pub parent: Option<NodeId>,

    /// Depth in the tree (0 for root).
    pub depth: usize,

    pub bound_changes: Vec<BoundChange>,

    /// Split halves valid in this subtree.
    pub local_constraints: Vec<LinearConstraint>,

    /// Lower bound on the (minimization form) objective in this subtree.
    pub dual_bound: f64,

    /// Estimate of the best integer solution reachable.
    pub estimate: f64,

    /// Child priority assigned by the branching rule.
    pub priority: f64,
}

impl SearchNode {
    /// Create the root node.
    pub fn root() -> Self {
        Self {
            id: NodeId(0),
            parent: None,
            depth: 0,
            bound_changes: Vec::new(),
            local_constraints: Vec::new(),
            dual_bound: f64::NEG_INFINITY,
            estimate: f64::NEG_INFINITY,
            priority: 0.0,
        }
    }

    /// Create a child that inherits the bound, estimate and path of this node.
    pub fn child(&self, id: NodeId) -> Self {
        Self {
            id,
            parent: Some(self.id),
            depth: self.depth + 1,
            bound_changes: self.bound_changes.clone(),
            local_constraints: self.local_constraints.clone(),
            dual_bound: self.dual_bound,
            estimate: self.estimate,
            priority: 0.0,
        }
    }

    /// Child with one more bound change.
    pub fn bound_child(&self, id: NodeId, change: BoundChange) -> Self {
        let mut child = self.child(id);
        child.bound_changes.push(change);
        child
    }

    /// A node can be pruned if its dual bound is not below the incumbent.
    pub fn can_prune(&self, incumbent: f64) -> bool {
        self.dual_bound >= incumbent
    }
}
