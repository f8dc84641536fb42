//! Read-only views of an optimal LP relaxation.

use splitbranch_lp::{BasisIndex, BasisStatus, LpError, LpProblem, Solution, Tableau};

use crate::error::Precondition;
use crate::tolerance::Tolerances;

/// A structural column of the LP relaxation.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Position in the LP, stable for the lifetime of the LP
    pub lp_pos: usize,
    pub integral: bool,
    pub status: BasisStatus,
    pub lower: f64,
    pub upper: f64,
    pub primal: f64,
    /// Branching priority; larger is branched on first
    pub priority: i32,
}

/// Sparse row coefficients, partitioned so that the entries whose columns are
/// in the current LP come first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowEntries {
    entries: Vec<(usize, f64)>,
    lp_len: usize,
}

impl RowEntries {
    pub fn new(mut in_lp: Vec<(usize, f64)>, mut outside_lp: Vec<(usize, f64)>) -> Self {
        in_lp.sort_by_key(|&(j, _)| j);
        outside_lp.sort_by_key(|&(j, _)| j);
        let lp_len = in_lp.len();
        in_lp.extend(outside_lp);
        Self {
            entries: in_lp,
            lp_len,
        }
    }

    /// All entries reference LP columns.
    pub fn in_lp(entries: Vec<(usize, f64)>) -> Self {
        Self::new(entries, Vec::new())
    }

    /// Entries whose columns are currently in the LP.
    pub fn lp_entries(&self) -> &[(usize, f64)] {
        &self.entries[..self.lp_len]
    }
}

/// A row of the LP relaxation, seen through its slack.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub lp_pos: usize,
    /// Activity is integral for every integral point
    pub integral: bool,
    /// Rows that may still change structure are never used for elimination
    pub modifiable: bool,
    /// Status of the row activity: `Lower` is at `lhs`, `Upper` at `rhs`
    pub status: BasisStatus,
    pub lhs: f64,
    pub rhs: f64,
    pub constant: f64,
    pub entries: RowEntries,
    pub activity: f64,
}

/// Basis-inverse row and tableau row of one basic variable.
#[derive(Debug, Clone, PartialEq)]
pub struct TableauRow {
    /// Row of `B^-1`, indexed by row LP position
    pub binv: Vec<f64>,
    /// Row of `B^-1 A`, indexed by column LP position
    pub binva: Vec<f64>,
}

/// What the split machinery needs from the LP solver.
pub trait LpView {
    fn columns(&self) -> &[Column];

    fn rows(&self) -> &[Row];

    /// Basic variable of every tableau row.
    fn basis_indices(&self) -> &[BasisIndex];

    fn binv_row(&self, tableau_row: usize) -> Result<Vec<f64>, LpError>;

    fn binva_row(&self, tableau_row: usize) -> Result<Vec<f64>, LpError>;

    fn tableau_row(&self, tableau_row: usize) -> Result<TableauRow, LpError> {
        Ok(TableauRow {
            binv: self.binv_row(tableau_row)?,
            binva: self.binva_row(tableau_row)?,
        })
    }
}

/// Snapshot of a solved `splitbranch-lp` relaxation.
#[derive(Debug, Clone)]
pub struct LpSnapshot {
    columns: Vec<Column>,
    rows: Vec<Row>,
    tableau: Tableau,
    objective: f64,
}

impl LpSnapshot {
    /// Capture columns, rows and the optimal basis of `solution`.
    ///
    /// A row is integral when all its columns are integral and its
    /// coefficients, constant and finite sides are integers. A fractional
    /// side leaves a fractional slack at integral points, so such rows are
    /// never eliminated by the split generator.
    pub fn capture(
        problem: &LpProblem,
        solution: &Solution,
        integer: &[bool],
        priority: &[i32],
        tol: &Tolerances,
    ) -> Result<Self, Precondition> {
        let n = problem.num_columns();
        for (what, got) in [("integrality", integer.len()), ("priority", priority.len())] {
            if got != n {
                return Err(Precondition::Dimension {
                    what,
                    got,
                    expected: n,
                });
            }
        }
        let tableau = solution.tableau.clone().ok_or(Precondition::NoOptimalBasis)?;

        let columns = problem
            .columns
            .iter()
            .enumerate()
            .map(|(j, c)| Column {
                lp_pos: j,
                integral: integer[j],
                status: solution.column_status[j],
                lower: c.lower,
                upper: c.upper,
                primal: solution.values[j],
                priority: priority[j],
            })
            .collect();

        let rows = problem
            .rows
            .iter()
            .enumerate()
            .map(|(r, row)| {
                let integral = tol.is_integral(row.constant)
                    && [-row.lhs, row.rhs]
                        .iter()
                        .all(|&side| tol.is_infinity(side) || tol.is_integral(side))
                    && row
                        .coefficients
                        .iter()
                        .all(|&(j, a)| integer[j] && tol.is_integral(a));
                Row {
                    lp_pos: r,
                    integral,
                    modifiable: false,
                    status: solution.row_status[r],
                    lhs: row.lhs,
                    rhs: row.rhs,
                    constant: row.constant,
                    entries: RowEntries::in_lp(row.coefficients.clone()),
                    activity: solution.row_activities[r],
                }
            })
            .collect();

        Ok(Self {
            columns,
            rows,
            tableau,
            objective: solution.objective_value,
        })
    }

    pub fn objective(&self) -> f64 {
        self.objective
    }

    pub fn values(&self) -> Vec<f64> {
        self.columns.iter().map(|c| c.primal).collect()
    }
}

impl LpView for LpSnapshot {
    fn columns(&self) -> &[Column] {
        &self.columns
    }

    fn rows(&self) -> &[Row] {
        &self.rows
    }

    fn basis_indices(&self) -> &[BasisIndex] {
        self.tableau.basis_indices()
    }

    fn binv_row(&self, tableau_row: usize) -> Result<Vec<f64>, LpError> {
        self.tableau.binv_row(tableau_row)
    }

    fn binva_row(&self, tableau_row: usize) -> Result<Vec<f64>, LpError> {
        self.tableau.binva_row(tableau_row)
    }
}
