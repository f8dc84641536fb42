//! MIP solution types.

/// Status of the MIP solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MipStatus {
    /// Optimal solution found within tolerance.
    Optimal,

    /// Problem is infeasible.
    Infeasible,

    /// The LP relaxation is unbounded.
    Unbounded,

    /// Node limit reached, best solution (if any) returned.
    NodeLimit,
}

impl MipStatus {
    pub fn is_optimal(&self) -> bool {
        *self == MipStatus::Optimal
    }
}

/// Result of a branch-and-bound run, in the sense of the original objective.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MipSolution {
    pub status: MipStatus,

    /// Best integer-feasible point; empty when none was found.
    pub values: Vec<f64>,

    /// Objective of `values`, `None` when no solution was found.
    pub objective: Option<f64>,

    /// Best bound proven by the LP relaxations.
    pub best_bound: f64,

    pub nodes_explored: u64,

    pub nodes_pruned: u64,

    /// Nodes branched on a GMI split.
    pub split_branchings: u64,

    /// Nodes branched on a single variable.
    pub fallback_branchings: u64,

    pub incumbent_updates: u64,

    pub solve_time_ms: u64,
}

impl MipSolution {
    pub fn has_solution(&self) -> bool {
        self.objective.is_some()
    }

    /// Relative gap `|objective - bound| / max(|objective|, 1e-10)`.
    pub fn gap(&self) -> f64 {
        match self.objective {
            Some(obj) if self.best_bound.is_finite() => (obj - self.best_bound).abs() / obj.abs().max(1e-10),
            _ => f64::INFINITY,
        }
    }
}
