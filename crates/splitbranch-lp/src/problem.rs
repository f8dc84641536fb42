use crate::error::LpError;

/// A linear programming problem over bounded columns and ranged rows.
///
/// Rows read `lhs <= sum(a_j * x_j) + constant <= rhs`. Either side may be
/// infinite, but not both.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LpProblem {
    /// Structural columns, indexed by LP position
    pub columns: Vec<Column>,
    /// Constraint rows, indexed by LP position
    pub rows: Vec<Row>,
    /// Whether to minimize or maximize the column costs
    pub sense: Sense,
    /// Constant added to the objective value
    pub objective_offset: f64,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Column {
    /// Name (for diagnostics)
    pub name: String,
    /// Lower bound, may be `f64::NEG_INFINITY`
    pub lower: f64,
    /// Upper bound, may be `f64::INFINITY`
    pub upper: f64,
    /// Objective coefficient
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Row {
    /// Name/label for the row (for diagnostics)
    pub name: String,
    /// Sparse coefficients as (column, value), sorted by column
    pub coefficients: Vec<(usize, f64)>,
    /// Left-hand side, may be `f64::NEG_INFINITY`
    pub lhs: f64,
    /// Right-hand side, may be `f64::INFINITY`
    pub rhs: f64,
    /// Constant term of the row activity
    pub constant: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Sense {
    #[default]
    Minimize,
    Maximize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintOp {
    /// Less than or equal (<=)
    Le,
    /// Greater than or equal (>=)
    Ge,
    /// Equal (=)
    Eq,
}

impl Row {
    /// Row activity `a . x + constant` at the given column values.
    pub fn activity(&self, values: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .map(|&(j, a)| a * values[j])
            .sum::<f64>()
            + self.constant
    }
}

impl LpProblem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column and return its LP position.
    pub fn add_column(&mut self, name: impl Into<String>, lower: f64, upper: f64, cost: f64) -> usize {
        self.columns.push(Column {
            name: name.into(),
            lower,
            upper,
            cost,
        });
        self.columns.len() - 1
    }

    /// Add a ranged row and return its LP position.
    pub fn add_row(
        &mut self,
        name: impl Into<String>,
        coefficients: Vec<(usize, f64)>,
        lhs: f64,
        rhs: f64,
    ) -> usize {
        let mut coefficients = coefficients;
        coefficients.sort_by_key(|&(j, _)| j);
        self.rows.push(Row {
            name: name.into(),
            coefficients,
            lhs,
            rhs,
            constant: 0.0,
        });
        self.rows.len() - 1
    }

    /// Add a one-sided or equality row from a comparison operator.
    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        coefficients: Vec<(usize, f64)>,
        op: ConstraintOp,
        rhs: f64,
    ) -> usize {
        let (lhs, rhs) = match op {
            ConstraintOp::Le => (f64::NEG_INFINITY, rhs),
            ConstraintOp::Ge => (rhs, f64::INFINITY),
            ConstraintOp::Eq => (rhs, rhs),
        };
        self.add_row(name, coefficients, lhs, rhs)
    }

    pub fn set_sense(&mut self, sense: Sense) {
        self.sense = sense;
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Objective value `c . x + offset` at the given column values.
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.columns
            .iter()
            .zip(values)
            .map(|(c, &x)| c.cost * x)
            .sum::<f64>()
            + self.objective_offset
    }

    /// Check bounds, row sides and column references.
    pub fn validate(&self) -> Result<(), LpError> {
        for c in &self.columns {
            if c.lower > c.upper {
                return Err(LpError::InvertedBounds {
                    name: c.name.clone(),
                    lower: c.lower,
                    upper: c.upper,
                });
            }
        }
        for r in &self.rows {
            if r.lhs == f64::NEG_INFINITY && r.rhs == f64::INFINITY {
                return Err(LpError::FreeRow(r.name.clone()));
            }
            if r.lhs > r.rhs {
                return Err(LpError::InvertedRow {
                    name: r.name.clone(),
                    lhs: r.lhs,
                    rhs: r.rhs,
                });
            }
            if let Some(&(j, _)) = r.coefficients.iter().find(|&&(j, _)| j >= self.columns.len()) {
                return Err(LpError::UnknownColumn {
                    row: r.name.clone(),
                    column: j,
                    columns: self.columns.len(),
                });
            }
        }
        Ok(())
    }
}
