//! MIP problem representation.

use splitbranch_lp::{LpProblem, Sense};

use crate::error::MipError;
use crate::search::SearchNode;
use crate::tolerance::Tolerances;

/// An LP together with integrality and branching priority per column.
#[derive(Debug, Clone)]
pub struct MipProblem {
    lp: LpProblem,
    integer: Vec<bool>,
    priority: Vec<i32>,
}

impl MipProblem {
    /// Wrap `lp`, rounding the bounds of integer columns and the finite sides
    /// of integral rows inward. Sides within `tol.feastol` of an integer snap
    /// to it.
    pub fn new(
        mut lp: LpProblem,
        integer: Vec<bool>,
        priority: Vec<i32>,
        tol: &Tolerances,
    ) -> Result<Self, MipError> {
        let n = lp.num_columns();
        if integer.len() != n || priority.len() != n {
            return Err(MipError::InvalidProblem(format!(
                "{} columns but {} integrality flags and {} priorities",
                n,
                integer.len(),
                priority.len()
            )));
        }
        lp.validate()?;

        for (column, _) in lp.columns.iter_mut().zip(&integer).filter(|&(_, &int)| int) {
            if column.lower.is_finite() {
                column.lower = tol.feas_ceil(column.lower);
            }
            if column.upper.is_finite() {
                column.upper = tol.feas_floor(column.upper);
            }
        }
        for row in &mut lp.rows {
            let integral = tol.is_integral(row.constant)
                && row
                    .coefficients
                    .iter()
                    .all(|&(j, a)| integer[j] && tol.is_integral(a));
            if !integral {
                continue;
            }
            if row.lhs.is_finite() {
                row.lhs = tol.feas_ceil(row.lhs);
            }
            if row.rhs.is_finite() {
                row.rhs = tol.feas_floor(row.rhs);
            }
        }

        Ok(Self { lp, integer, priority })
    }

    /// Mark the given columns integer, all with priority 0.
    pub fn with_integers(lp: LpProblem, integer_columns: &[usize], tol: &Tolerances) -> Result<Self, MipError> {
        let n = lp.num_columns();
        let mut integer = vec![false; n];
        for &j in integer_columns {
            let slot = integer
                .get_mut(j)
                .ok_or_else(|| MipError::InvalidProblem(format!("integer column {} of {}", j, n)))?;
            *slot = true;
        }
        Self::new(lp, integer, vec![0; n], tol)
    }

    pub fn lp(&self) -> &LpProblem {
        &self.lp
    }

    pub fn integer(&self) -> &[bool] {
        &self.integer
    }

    pub fn priority(&self) -> &[i32] {
        &self.priority
    }

    pub fn num_integer(&self) -> usize {
        self.integer.iter().filter(|&&b| b).count()
    }

    /// Objective in minimization form.
    pub fn to_min(&self, objective: f64) -> f64 {
        match self.lp.sense {
            Sense::Minimize => objective,
            Sense::Maximize => -objective,
        }
    }

    /// Inverse of [`MipProblem::to_min`].
    pub fn from_min(&self, objective: f64) -> f64 {
        self.to_min(objective)
    }

    /// Whether `x` is within bounds, satisfies every row and is integral on
    /// integer columns.
    pub fn is_feasible(&self, x: &[f64], tol: &Tolerances) -> bool {
        if x.len() != self.lp.num_columns() {
            return false;
        }
        let bounds = self.lp.columns.iter().zip(x).all(|(c, &v)| {
            v >= c.lower - tol.feastol && v <= c.upper + tol.feastol
        });
        let rows = self.lp.rows.iter().all(|r| {
            let activity = r.activity(x);
            activity >= r.lhs - tol.feastol && activity <= r.rhs + tol.feastol
        });
        let integral = self
            .integer
            .iter()
            .zip(x)
            .all(|(&int, &v)| !int || tol.is_feas_integral(v));
        bounds && rows && integral
    }

    /// LP of a search node: tightened bounds plus one row per local
    /// constraint. `None` when the bound changes leave an empty domain.
    pub fn node_lp(&self, node: &SearchNode) -> Option<LpProblem> {
        let mut lp = self.lp.clone();
        for change in &node.bound_changes {
            let column = &mut lp.columns[change.column];
            column.lower = column.lower.max(change.lower);
            column.upper = column.upper.min(change.upper);
            if column.lower > column.upper {
                return None;
            }
        }
        for (k, constraint) in node.local_constraints.iter().enumerate() {
            lp.add_row(format!("split_{}", k), constraint.sparse(), constraint.lhs, constraint.rhs);
        }
        Some(lp)
    }
}
