use crate::error::LpError;

/// Basic variable of one tableau row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BasisIndex {
    /// Structural column at this LP position
    Column(usize),
    /// Slack of the row at this LP position
    Slack(usize),
}

/// Optimal basis of a solved LP.
///
/// The LP is stored as `A x + s = 0` with one `+1` slack per row, so the
/// basis matrix is made of columns of `[A | I]`. Tableau row `i` belongs to
/// the basic variable `basis_indices()[i]`.
#[derive(Debug, Clone)]
pub struct Tableau {
    head: Vec<BasisIndex>,
    binv: Vec<Vec<f64>>,
    rows: Vec<Vec<(usize, f64)>>,
    num_columns: usize,
}

impl Tableau {
    pub(crate) fn new(
        head: Vec<BasisIndex>,
        binv: Vec<Vec<f64>>,
        rows: Vec<Vec<(usize, f64)>>,
        num_columns: usize,
    ) -> Self {
        Self {
            head,
            binv,
            rows,
            num_columns,
        }
    }

    pub fn num_rows(&self) -> usize {
        self.head.len()
    }

    pub fn num_columns(&self) -> usize {
        self.num_columns
    }

    pub fn basis_indices(&self) -> &[BasisIndex] {
        &self.head
    }

    /// Row `i` of the basis inverse, one entry per LP row.
    pub fn binv_row(&self, i: usize) -> Result<Vec<f64>, LpError> {
        self.check_row(i)?;
        Ok(self.binv[i].clone())
    }

    /// Row `i` of `B^-1 A`, one entry per LP column.
    pub fn binva_row(&self, i: usize) -> Result<Vec<f64>, LpError> {
        self.check_row(i)?;
        let mut out = vec![0.0; self.num_columns];
        for (r, coefficients) in self.rows.iter().enumerate() {
            let beta = self.binv[i][r];
            if beta == 0.0 {
                continue;
            }
            for &(j, a) in coefficients {
                out[j] += beta * a;
            }
        }
        Ok(out)
    }

    fn check_row(&self, i: usize) -> Result<(), LpError> {
        if i >= self.head.len() {
            return Err(LpError::TableauRowOutOfRange {
                row: i,
                rows: self.head.len(),
            });
        }
        Ok(())
    }
}

/// Invert a dense square matrix by Gauss-Jordan elimination with partial pivoting.
pub(crate) fn invert(matrix: &[Vec<f64>], pivot_tolerance: f64) -> Result<Vec<Vec<f64>>, LpError> {
    let m = matrix.len();
    let mut work: Vec<Vec<f64>> = matrix.to_vec();
    let mut inv: Vec<Vec<f64>> = (0..m)
        .map(|i| {
            let mut row = vec![0.0; m];
            row[i] = 1.0;
            row
        })
        .collect();

    for col in 0..m {
        let mut best = col;
        for row in (col + 1)..m {
            if work[row][col].abs() > work[best][col].abs() {
                best = row;
            }
        }
        let pivot = work[best][col];
        if pivot.abs() < pivot_tolerance {
            return Err(LpError::SingularBasis { position: col, pivot });
        }
        work.swap(col, best);
        inv.swap(col, best);

        for j in 0..m {
            work[col][j] /= pivot;
            inv[col][j] /= pivot;
        }
        for row in 0..m {
            if row == col {
                continue;
            }
            let factor = work[row][col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..m {
                work[row][j] -= factor * work[col][j];
                inv[row][j] -= factor * inv[col][j];
            }
        }
    }

    Ok(inv)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invert_permuted_matrix() {
        let m = vec![vec![0.0, 2.0], vec![4.0, 1.0]];
        let inv = invert(&m, 1e-11).unwrap();
        // m * inv = I
        for i in 0..2 {
            for j in 0..2 {
                let v: f64 = (0..2).map(|k| m[i][k] * inv[k][j]).sum();
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((v - expected).abs() < 1e-12, "({}, {}) = {}", i, j, v);
            }
        }
    }

    #[test]
    fn test_invert_singular() {
        let m = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
        assert!(matches!(invert(&m, 1e-11), Err(LpError::SingularBasis { .. })));
    }

    #[test]
    fn test_tableau_rows() {
        // Rows: x + 2y, 3y ; basis {x, y}
        let rows = vec![vec![(0, 1.0), (1, 2.0)], vec![(1, 3.0)]];
        let b = vec![vec![1.0, 2.0], vec![0.0, 3.0]];
        let binv = invert(&b, 1e-11).unwrap();
        let tableau = Tableau::new(vec![BasisIndex::Column(0), BasisIndex::Column(1)], binv, rows, 2);

        let r0 = tableau.binva_row(0).unwrap();
        assert!((r0[0] - 1.0).abs() < 1e-12);
        assert!(r0[1].abs() < 1e-12);
        assert_eq!(tableau.basis_indices()[1], BasisIndex::Column(1));
        assert!(tableau.binv_row(2).is_err());
    }
}
