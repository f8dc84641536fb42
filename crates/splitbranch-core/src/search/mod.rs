//! Branch-and-bound search over node LPs.

mod node;
mod queue;
mod tree;

pub use node::{BoundChange, NodeStatus, SearchNode};
pub use queue::NodeQueue;
pub use tree::{BranchAndBound, ChildCollector};
