use crate::tableau::Tableau;

/// The result of solving an LP problem
#[derive(Debug, Clone)]
pub struct Solution {
    /// Solution status
    pub status: SolutionStatus,
    /// Optimal values for each column
    pub values: Vec<f64>,
    /// Optimal objective value (including the offset)
    pub objective_value: f64,
    /// Row activities `a . x + constant`
    pub row_activities: Vec<f64>,
    /// Basis status of every column
    pub column_status: Vec<BasisStatus>,
    /// Basis status of every row, in terms of the row activity
    pub row_status: Vec<BasisStatus>,
    /// Simplex iterations spent (both phases)
    pub iterations: usize,
    /// Optimal basis, present only when `status` is `Optimal`
    pub tableau: Option<Tableau>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolutionStatus {
    /// An optimal solution was found
    Optimal,
    /// The problem is infeasible (no solution exists)
    Infeasible,
    /// The problem is unbounded
    Unbounded,
    /// The iteration limit was hit before optimality was proven
    IterationLimit,
}

/// Position of a variable relative to the simplex basis.
///
/// For rows the status describes the row activity: `Lower` means the activity
/// sits at the left-hand side, `Upper` at the right-hand side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum BasisStatus {
    /// Nonbasic at the lower bound
    Lower,
    /// Nonbasic at the upper bound
    Upper,
    /// Nonbasic free variable at zero
    Zero,
    /// In the basis
    Basic,
}

impl Solution {
    pub fn infeasible(iterations: usize) -> Self {
        Self::without_point(SolutionStatus::Infeasible, f64::INFINITY, iterations)
    }

    pub fn unbounded(iterations: usize) -> Self {
        Self::without_point(SolutionStatus::Unbounded, f64::NEG_INFINITY, iterations)
    }

    pub fn iteration_limit(iterations: usize) -> Self {
        Self::without_point(SolutionStatus::IterationLimit, f64::NAN, iterations)
    }

    fn without_point(status: SolutionStatus, objective_value: f64, iterations: usize) -> Self {
        Self {
            status,
            values: Vec::new(),
            objective_value,
            row_activities: Vec::new(),
            column_status: Vec::new(),
            row_status: Vec::new(),
            iterations,
            tableau: None,
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.status == SolutionStatus::Optimal
    }
}
