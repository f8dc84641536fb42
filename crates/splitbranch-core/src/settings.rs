//! Configuration settings for the branch-and-bound driver.

use crate::tolerance::Tolerances;

/// Branching rule used at fractional nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BranchingRule {
    /// Branch on GMI split disjunctions.
    ///
    /// Nodes deeper than `max_depth` fall back to most-fractional branching;
    /// `None` uses splits at every depth.
    Gmi { max_depth: Option<usize> },

    /// Branch on the variable whose fractional part is closest to 0.5.
    MostFractional,
}

impl Default for BranchingRule {
    fn default() -> Self {
        BranchingRule::Gmi { max_depth: Some(20) }
    }
}

impl BranchingRule {
    /// Whether splits are tried at a node of the given depth.
    pub fn uses_splits_at(&self, depth: usize) -> bool {
        match *self {
            BranchingRule::Gmi { max_depth } => max_depth.is_none_or(|d| depth <= d),
            BranchingRule::MostFractional => false,
        }
    }
}

/// Node selection strategy for the search tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeSelection {
    /// Always select the node with the lowest dual bound.
    #[default]
    BestBound,

    /// Deepest node first.
    DepthFirst,
}

/// Branch-and-bound settings.
#[derive(Debug, Clone)]
pub struct MipSettings {
    /// Maximum number of nodes to explore.
    pub max_nodes: u64,

    /// Nodes whose bound is within this distance of the incumbent are pruned.
    pub gap_abs_tol: f64,

    pub branching_rule: BranchingRule,

    pub node_selection: NodeSelection,

    /// Comparison tolerances for snapshots, splits and integrality checks.
    pub tolerances: Tolerances,

    /// Simplex iteration limit per node LP.
    pub lp_iteration_limit: usize,

    /// Log progress at `info` level.
    pub verbose: bool,

    /// Log frequency (every N nodes).
    pub log_freq: u64,
}

impl Default for MipSettings {
    fn default() -> Self {
        Self {
            max_nodes: 100_000,
            gap_abs_tol: 1e-6,
            branching_rule: BranchingRule::default(),
            node_selection: NodeSelection::default(),
            tolerances: Tolerances::default(),
            lp_iteration_limit: 10_000,
            verbose: false,
            log_freq: 100,
        }
    }
}

impl MipSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_nodes(mut self, max_nodes: u64) -> Self {
        self.max_nodes = max_nodes;
        self
    }

    pub fn with_branching_rule(mut self, rule: BranchingRule) -> Self {
        self.branching_rule = rule;
        self
    }

    pub fn with_node_selection(mut self, selection: NodeSelection) -> Self {
        self.node_selection = selection;
        self
    }

    pub fn with_tolerances(mut self, tolerances: Tolerances) -> Self {
        self.tolerances = tolerances;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}
