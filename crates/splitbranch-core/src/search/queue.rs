//! Node priority queue for tree exploration.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::SearchNode;
use crate::settings::NodeSelection;

/// Entry in the node queue with its selection key.
struct QueuedNode {
    node: SearchNode,
    /// Higher is selected first
    key: f64,
}

impl QueuedNode {
    fn order(&self, other: &Self) -> Ordering {
        self.key
            .total_cmp(&other.key)
            .then_with(|| self.node.priority.total_cmp(&other.node.priority))
            // older nodes first
            .then_with(|| other.node.id.cmp(&self.node.id))
    }
}

impl PartialEq for QueuedNode {
    fn eq(&self, other: &Self) -> bool {
        self.order(other) == Ordering::Equal
    }
}

impl Eq for QueuedNode {}

impl PartialOrd for QueuedNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order(other)
    }
}

/// Priority queue of open nodes.
pub struct NodeQueue {
    strategy: NodeSelection,
    heap: BinaryHeap<QueuedNode>,
}

impl NodeQueue {
    pub fn new(strategy: NodeSelection) -> Self {
        Self {
            strategy,
            heap: BinaryHeap::new(),
        }
    }

    pub fn push(&mut self, node: SearchNode) {
        let key = match self.strategy {
            // lowest dual bound first
            NodeSelection::BestBound => -node.dual_bound,
            NodeSelection::DepthFirst => node.depth as f64,
        };
        self.heap.push(QueuedNode { node, key });
    }

    pub fn pop(&mut self) -> Option<SearchNode> {
        self.heap.pop().map(|q| q.node)
    }

    /// Lowest dual bound of the open nodes, `+inf` when empty.
    pub fn best_bound(&self) -> f64 {
        self.heap
            .iter()
            .map(|q| q.node.dual_bound)
            .fold(f64::INFINITY, f64::min)
    }

    /// Drop nodes dominated by the incumbent and return how many were dropped.
    pub fn prune_by_bound(&mut self, incumbent: f64) -> usize {
        let before = self.heap.len();
        self.heap.retain(|q| !q.node.can_prune(incumbent));
        before - self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }
}
