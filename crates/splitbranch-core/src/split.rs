//! Gomory mixed-integer split disjunctions.
//!
//! The tableau row of a basic column `k` reads
//!
//! ```text
//! x_k + sum_j (B^-1 A)_kj x_j + sum_r (B^-1)_kr s_r = 0,   s_r = -(a_r . x)
//! ```
//!
//! Every nonbasic variable is rewritten as a nonnegative distance `t` from the
//! bound it sits at, so the row becomes `x_k + sum alpha_j t_j = x_k*`.
//! Rounding each `alpha_j` of an integral variable to an integer gives an
//! integer-valued expression whose value at the current vertex is `x_k*`,
//! hence it lies strictly between two consecutive integers. Slacks of integral
//! rows are finally replaced by their row definition so that the split is
//! stated over structural columns only.

use log::trace;

use crate::branching::LinearConstraint;
use crate::error::{BasisInconsistency, Precondition, SplitError};
use crate::snapshot::{Column, Row, TableauRow};
use crate::tolerance::Tolerances;
use crate::BasisStatus;

/// A split disjunction `coefficients . x <= rhs` or `coefficients . x >= rhs + 1`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Split {
    /// Dense coefficients, indexed by column LP position
    pub coefficients: Vec<f64>,
    pub rhs: f64,
}

impl Split {
    pub fn activity(&self, x: &[f64]) -> f64 {
        self.coefficients.iter().zip(x).map(|(a, v)| a * v).sum()
    }

    /// True when no coefficient is nonzero; such a split branches on nothing.
    pub fn is_zero(&self) -> bool {
        self.coefficients.iter().all(|&a| a == 0.0)
    }

    /// Number of nonzero coefficients.
    pub fn support(&self) -> usize {
        self.coefficients.iter().filter(|&&a| a != 0.0).count()
    }

    /// `rhs < a . x < rhs + 1`, each side by more than the feasibility tolerance.
    pub fn separates(&self, x: &[f64], tol: &Tolerances) -> bool {
        let activity = self.activity(x);
        activity > self.rhs + tol.feastol && activity < self.rhs + 1.0 - tol.feastol
    }

    /// `a . x <= rhs`
    pub fn down_constraint(&self) -> LinearConstraint {
        LinearConstraint::le(self.coefficients.clone(), self.rhs)
    }

    /// `a . x >= rhs + 1`
    pub fn up_constraint(&self) -> LinearConstraint {
        LinearConstraint::ge(self.coefficients.clone(), self.rhs + 1.0)
    }
}

/// Derives GMI splits from single tableau rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct SplitGenerator {
    tol: Tolerances,
}

impl SplitGenerator {
    pub fn new(tol: Tolerances) -> Self {
        Self { tol }
    }

    pub fn tolerances(&self) -> &Tolerances {
        &self.tol
    }

    /// Derive the split of the tableau row belonging to `basic_column`.
    ///
    /// `primal` must be the fractional LP value of that column, `tableau` its
    /// `B^-1` row (one entry per row) and `B^-1 A` row (one entry per column).
    pub fn generate(
        &self,
        columns: &[Column],
        rows: &[Row],
        tableau: &TableauRow,
        primal: f64,
        basic_column: usize,
    ) -> Result<Split, SplitError> {
        self.check_preconditions(columns, rows, tableau, primal, basic_column)?;
        let tol = &self.tol;

        let f0 = tol.frac(primal);
        let mut coefficients = vec![0.0; columns.len()];
        // Accumulates split(x*) - f0; the vertex value of every term is added
        // as soon as its coefficient is fixed.
        let mut rhs = -f0;

        for col in columns.iter().filter(|c| c.integral) {
            let pos = col.lp_pos;
            if pos == basic_column {
                coefficients[pos] = 1.0;
                rhs += primal;
                continue;
            }

            let (alpha, bound) = match col.status {
                BasisStatus::Lower => (tableau.binva[pos], col.lower),
                // x = u - t
                BasisStatus::Upper => (-tableau.binva[pos], col.upper),
                BasisStatus::Zero | BasisStatus::Basic => continue,
            };
            if tol.is_zero(alpha) {
                continue;
            }

            let rounded = self.round(alpha, f0);
            let coefficient = match col.status {
                BasisStatus::Upper => -rounded,
                _ => rounded,
            };
            rhs += coefficient * bound;
            coefficients[pos] = coefficient;
        }

        for row in rows.iter().filter(|r| r.integral && !r.modifiable) {
            let beta = tableau.binv[row.lp_pos];
            let alpha = match row.status {
                BasisStatus::Zero => return Err(BasisInconsistency::FreeSlack(row.lp_pos).into()),
                BasisStatus::Basic => continue,
                // Activity at lhs puts the +1 slack at its upper bound: s = s_u - t
                BasisStatus::Lower => {
                    if tol.is_infinity(-row.lhs) {
                        return Err(BasisInconsistency::LowerWithoutLhs(row.lp_pos).into());
                    }
                    -beta
                }
                BasisStatus::Upper => beta,
            };
            if tol.is_zero(alpha) {
                continue;
            }

            if tol.is_infinity(-row.lhs) && tol.is_infinity(row.rhs) {
                return Err(BasisInconsistency::FreeRow(row.lp_pos).into());
            }
            if !tol.is_le(row.lhs, row.rhs) {
                return Err(BasisInconsistency::InvertedSides {
                    row: row.lp_pos,
                    lhs: row.lhs,
                    rhs: row.rhs,
                }
                .into());
            }
            // fixed slack
            if tol.is_feas_zero(row.rhs - row.lhs) {
                continue;
            }

            let rounded = self.round(alpha, f0);
            let entry = match row.status {
                BasisStatus::Lower => -rounded,
                _ => rounded,
            };

            let active = self.active_side(row)?;
            if entry == 0.0 {
                continue;
            }
            // s* = -(active - constant)
            rhs -= entry * (active - row.constant);
            for &(j, a) in row.entries.lp_entries() {
                coefficients[j] -= entry * a;
            }
        }

        for a in coefficients.iter_mut() {
            *a = if tol.is_zero(*a) { 0.0 } else { a.round() };
        }
        let rhs = tol.feas_floor(rhs);
        trace!(
            "split for column {}: f0={:.4}, {} nonzeros, rhs={}",
            basic_column,
            f0,
            coefficients.iter().filter(|&&a| a != 0.0).count(),
            rhs
        );

        Ok(Split { coefficients, rhs })
    }

    /// Round up above the fractionality threshold, down otherwise.
    pub fn round(&self, value: f64, f0: f64) -> f64 {
        if self.tol.is_integral(value) {
            self.tol.floor(value)
        } else if value > f0 {
            value.ceil()
        } else {
            value.floor()
        }
    }

    /// The side the row activity sits at; must agree with the reported status.
    fn active_side(&self, row: &Row) -> Result<f64, BasisInconsistency> {
        let tol = &self.tol;
        if !tol.is_infinity(row.rhs) && tol.is_feas_zero(row.rhs - row.activity) {
            if row.status != BasisStatus::Upper {
                return Err(BasisInconsistency::StatusMismatch {
                    row: row.lp_pos,
                    side: "rhs",
                });
            }
            Ok(row.rhs)
        } else if !tol.is_infinity(-row.lhs) && tol.is_feas_zero(row.activity - row.lhs) {
            if row.status != BasisStatus::Lower {
                return Err(BasisInconsistency::StatusMismatch {
                    row: row.lp_pos,
                    side: "lhs",
                });
            }
            Ok(row.lhs)
        } else {
            Err(BasisInconsistency::ActivityOffBounds {
                row: row.lp_pos,
                activity: row.activity,
                lhs: row.lhs,
                rhs: row.rhs,
            })
        }
    }

    fn check_preconditions(
        &self,
        columns: &[Column],
        rows: &[Row],
        tableau: &TableauRow,
        primal: f64,
        basic_column: usize,
    ) -> Result<(), Precondition> {
        let dims = [
            ("B^-1 row", tableau.binv.len(), rows.len()),
            ("B^-1 A row", tableau.binva.len(), columns.len()),
        ];
        for (what, got, expected) in dims {
            if got != expected {
                return Err(Precondition::Dimension { what, got, expected });
            }
        }
        if let Some(col) = columns.iter().find(|c| c.lp_pos >= columns.len()) {
            return Err(Precondition::UnknownColumn(col.lp_pos));
        }
        if let Some(row) = rows.iter().find(|r| r.lp_pos >= rows.len()) {
            return Err(Precondition::Dimension {
                what: "row positions",
                got: row.lp_pos + 1,
                expected: rows.len(),
            });
        }
        if let Some(&(j, _)) = rows
            .iter()
            .flat_map(|r| r.entries.lp_entries())
            .find(|&&(j, _)| j >= columns.len())
        {
            return Err(Precondition::UnknownColumn(j));
        }

        let Some(col) = columns.iter().find(|c| c.lp_pos == basic_column) else {
            return Err(Precondition::UnknownColumn(basic_column));
        };
        if col.status != BasisStatus::Basic {
            return Err(Precondition::NotBasic(basic_column));
        }
        if !col.integral {
            return Err(Precondition::NotIntegral(basic_column));
        }
        if self.tol.is_feas_integral(primal) {
            return Err(Precondition::NotFractional {
                column: basic_column,
                value: primal,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::RowEntries;
    use proptest::prelude::*;

    fn column(lp_pos: usize, status: BasisStatus, lower: f64, upper: f64, primal: f64) -> Column {
        Column {
            lp_pos,
            integral: true,
            status,
            lower,
            upper,
            primal,
            priority: 0,
        }
    }

    fn two_columns(entry: f64) -> (Vec<Column>, TableauRow) {
        let columns = vec![
            column(0, BasisStatus::Basic, 0.0, 10.0, 2.5),
            column(1, BasisStatus::Lower, 0.0, 10.0, 0.0),
        ];
        let tableau = TableauRow {
            binv: Vec::new(),
            binva: vec![1.0, entry],
        };
        (columns, tableau)
    }

    #[test]
    fn test_entry_below_threshold_rounds_down() {
        let (columns, tableau) = two_columns(0.3);
        let split = SplitGenerator::default()
            .generate(&columns, &[], &tableau, 2.5, 0)
            .unwrap();
        assert_eq!(split.coefficients, vec![1.0, 0.0]);
        assert_eq!(split.rhs, 2.0);
    }

    #[test]
    fn test_entry_above_threshold_rounds_up() {
        let (columns, tableau) = two_columns(0.7);
        let split = SplitGenerator::default()
            .generate(&columns, &[], &tableau, 2.5, 0)
            .unwrap();
        assert_eq!(split.coefficients, vec![1.0, 1.0]);
        assert_eq!(split.rhs, 2.0);
        assert!(split.separates(&[2.5, 0.0], &Tolerances::default()));
    }

    #[test]
    fn test_upper_bound_translation() {
        let columns = vec![
            column(0, BasisStatus::Basic, 0.0, 10.0, 2.5),
            column(1, BasisStatus::Upper, 0.0, 4.0, 4.0),
        ];
        let tableau = TableauRow {
            binv: Vec::new(),
            binva: vec![1.0, 0.3],
        };
        let split = SplitGenerator::default()
            .generate(&columns, &[], &tableau, 2.5, 0)
            .unwrap();
        // alpha = -0.3 rounds to -1 on the distance u - x, i.e. +1 on x
        assert_eq!(split.coefficients, vec![1.0, 1.0]);
        assert_eq!(split.rhs, 6.0);
        assert!(split.separates(&[2.5, 4.0], &Tolerances::default()));
    }

    #[test]
    fn test_continuous_and_basic_columns_get_zero() {
        let mut columns = vec![
            column(0, BasisStatus::Basic, 0.0, 10.0, 1.25),
            column(1, BasisStatus::Lower, 0.0, 10.0, 0.0),
            column(2, BasisStatus::Basic, 0.0, 10.0, 3.0),
            column(3, BasisStatus::Zero, f64::NEG_INFINITY, f64::INFINITY, 0.0),
        ];
        columns[1].integral = false;
        let tableau = TableauRow {
            binv: Vec::new(),
            binva: vec![1.0, 0.9, 0.0, 0.6],
        };
        let split = SplitGenerator::default()
            .generate(&columns, &[], &tableau, 1.25, 0)
            .unwrap();
        assert_eq!(split.coefficients, vec![1.0, 0.0, 0.0, 0.0]);
        assert_eq!(split.rhs, 1.0);
        assert_eq!(split.support(), 1);
    }

    /// `5x <= 17` with x basic at 3.4: the slack entry 0.2 rounds to zero.
    fn single_row(status: BasisStatus, activity: f64) -> (Vec<Column>, Vec<Row>, TableauRow) {
        let columns = vec![column(0, BasisStatus::Basic, 0.0, 10.0, 3.4)];
        let rows = vec![Row {
            lp_pos: 0,
            integral: true,
            modifiable: false,
            status,
            lhs: f64::NEG_INFINITY,
            rhs: 17.0,
            constant: 0.0,
            entries: RowEntries::in_lp(vec![(0, 5.0)]),
            activity,
        }];
        let tableau = TableauRow {
            binv: vec![0.2],
            binva: vec![1.0],
        };
        (columns, rows, tableau)
    }

    #[test]
    fn test_single_row_split() {
        let (columns, rows, tableau) = single_row(BasisStatus::Upper, 17.0);
        let split = SplitGenerator::default()
            .generate(&columns, &rows, &tableau, 3.4, 0)
            .unwrap();
        assert_eq!(split.coefficients, vec![1.0]);
        assert_eq!(split.rhs, 3.0);
    }

    #[test]
    fn test_free_slack_is_inconsistent() {
        let (columns, rows, tableau) = single_row(BasisStatus::Zero, 17.0);
        let err = SplitGenerator::default()
            .generate(&columns, &rows, &tableau, 3.4, 0)
            .unwrap_err();
        assert_eq!(err, SplitError::BasisInconsistency(BasisInconsistency::FreeSlack(0)));
    }

    #[test]
    fn test_lower_row_without_lhs_is_inconsistent() {
        let (columns, rows, tableau) = single_row(BasisStatus::Lower, 17.0);
        let err = SplitGenerator::default()
            .generate(&columns, &rows, &tableau, 3.4, 0)
            .unwrap_err();
        assert_eq!(err, SplitError::BasisInconsistency(BasisInconsistency::LowerWithoutLhs(0)));
    }

    #[test]
    fn test_activity_off_bounds_is_inconsistent() {
        let (columns, rows, mut tableau) = single_row(BasisStatus::Upper, 15.0);
        tableau.binv[0] = 0.8;
        let err = SplitGenerator::default()
            .generate(&columns, &rows, &tableau, 3.4, 0)
            .unwrap_err();
        assert!(matches!(
            err,
            SplitError::BasisInconsistency(BasisInconsistency::ActivityOffBounds { row: 0, .. })
        ));
    }

    #[test]
    fn test_slack_elimination() {
        // Rows: 2x + 2y <= 7 at rhs (slack entry 0.5 on the pivot row of x)
        let columns = vec![
            column(0, BasisStatus::Basic, 0.0, 10.0, 1.5),
            column(1, BasisStatus::Lower, 0.0, 10.0, 0.0),
        ];
        let rows = vec![Row {
            lp_pos: 0,
            integral: true,
            modifiable: false,
            status: BasisStatus::Upper,
            lhs: f64::NEG_INFINITY,
            rhs: 7.0,
            constant: 0.0,
            entries: RowEntries::in_lp(vec![(0, 2.0), (1, 2.0)]),
            activity: 3.0,
        }];
        let tableau = TableauRow {
            binv: vec![0.5],
            binva: vec![1.0, 1.0],
        };
        // Activity 3 is at neither side: rhs is 7
        let err = SplitGenerator::default().generate(&columns, &rows, &tableau, 1.5, 0);
        assert!(err.is_err());

        let mut rows = rows;
        rows[0].rhs = 3.0;
        let split = SplitGenerator::default()
            .generate(&columns, &rows, &tableau, 1.5, 0)
            .unwrap();
        // y: 1.0 -> 1; slack: 0.5 -> floor 0, so nothing is eliminated
        assert_eq!(split.coefficients, vec![1.0, 1.0]);
        assert_eq!(split.rhs, 1.0);

        let mut tableau = tableau;
        tableau.binv[0] = 0.75;
        let split = SplitGenerator::default()
            .generate(&columns, &rows, &tableau, 1.5, 0)
            .unwrap();
        // slack entry 0.75 -> 1: split = x + y - (2x + 2y) = -x - y, rhs = 1 + 0 - 3
        assert_eq!(split.coefficients, vec![-1.0, -1.0]);
        assert_eq!(split.rhs, -2.0);
        assert!(split.separates(&[1.5, 0.0], &Tolerances::default()));
    }

    /// `9 <= 2x + y + 1` at its lhs, x basic at 1.5, y at its upper bound 5
    /// with lower bound 2.
    fn lower_row(beta: f64) -> (Vec<Column>, Vec<Row>, TableauRow) {
        let columns = vec![
            column(0, BasisStatus::Basic, 0.0, 10.0, 1.5),
            column(1, BasisStatus::Upper, 2.0, 5.0, 5.0),
        ];
        let rows = vec![Row {
            lp_pos: 0,
            integral: true,
            modifiable: false,
            status: BasisStatus::Lower,
            lhs: 9.0,
            rhs: f64::INFINITY,
            constant: 1.0,
            entries: RowEntries::in_lp(vec![(0, 2.0), (1, 1.0)]),
            activity: 9.0,
        }];
        let tableau = TableauRow {
            binv: vec![beta],
            binva: vec![1.0, 0.2],
        };
        (columns, rows, tableau)
    }

    #[test]
    fn test_row_at_lhs_with_constant() {
        let (columns, rows, tableau) = lower_row(-0.75);
        let split = SplitGenerator::default()
            .generate(&columns, &rows, &tableau, 1.5, 0)
            .unwrap();
        // y: -0.2 on u - y rounds to -1, i.e. +1 on y, rhs 1 + 5
        // row: 0.75 on the distance to lhs rounds to 1, the slack enters with
        // -1 so the row is added back: 3x + 2y, rhs 6 + (9 - 1)
        assert_eq!(split.coefficients, vec![3.0, 2.0]);
        assert_eq!(split.rhs, 14.0);
        assert!(split.separates(&[1.5, 5.0], &Tolerances::default()));

        // 0.25 rounds to zero and leaves the row out
        let (columns, rows, tableau) = lower_row(-0.25);
        let split = SplitGenerator::default()
            .generate(&columns, &rows, &tableau, 1.5, 0)
            .unwrap();
        assert_eq!(split.coefficients, vec![1.0, 1.0]);
        assert_eq!(split.rhs, 6.0);
    }

    #[test]
    fn test_inverted_sides_are_inconsistent() {
        let (columns, mut rows, tableau) = lower_row(-0.75);
        rows[0].rhs = 8.0;
        let err = SplitGenerator::default()
            .generate(&columns, &rows, &tableau, 1.5, 0)
            .unwrap_err();
        assert_eq!(
            err,
            SplitError::BasisInconsistency(BasisInconsistency::InvertedSides {
                row: 0,
                lhs: 9.0,
                rhs: 8.0
            })
        );
    }

    #[test]
    fn test_modifiable_and_equality_rows_are_skipped() {
        let (columns, mut rows, mut tableau) = single_row(BasisStatus::Upper, 17.0);
        tableau.binv[0] = 0.8;
        rows[0].modifiable = true;
        let split = SplitGenerator::default()
            .generate(&columns, &rows, &tableau, 3.4, 0)
            .unwrap();
        assert_eq!(split.coefficients, vec![1.0]);

        rows[0].modifiable = false;
        rows[0].lhs = 17.0;
        let split = SplitGenerator::default()
            .generate(&columns, &rows, &tableau, 3.4, 0)
            .unwrap();
        assert_eq!(split.coefficients, vec![1.0]);
        assert_eq!(split.rhs, 3.0);
    }

    #[test]
    fn test_preconditions() {
        let (columns, tableau) = two_columns(0.3);
        let generator = SplitGenerator::default();

        let err = generator.generate(&columns, &[], &tableau, 3.0, 0).unwrap_err();
        assert!(matches!(err, SplitError::Precondition(Precondition::NotFractional { .. })));

        let err = generator.generate(&columns, &[], &tableau, 2.5, 1).unwrap_err();
        assert_eq!(err, SplitError::Precondition(Precondition::NotBasic(1)));

        let err = generator.generate(&columns, &[], &tableau, 2.5, 5).unwrap_err();
        assert_eq!(err, SplitError::Precondition(Precondition::UnknownColumn(5)));

        let short = TableauRow {
            binv: Vec::new(),
            binva: vec![1.0],
        };
        let err = generator.generate(&columns, &[], &short, 2.5, 0).unwrap_err();
        assert!(matches!(err, SplitError::Precondition(Precondition::Dimension { .. })));
    }

    #[test]
    fn test_generation_is_idempotent() {
        let (columns, rows, mut tableau) = single_row(BasisStatus::Upper, 17.0);
        tableau.binv[0] = 0.8;
        let generator = SplitGenerator::default();
        let first = generator.generate(&columns, &rows, &tableau, 3.4, 0).unwrap();
        let second = generator.generate(&columns, &rows, &tableau, 3.4, 0).unwrap();
        assert_eq!(first, second);
    }

    proptest! {
        #[test]
        fn rounding_is_integral_and_follows_threshold(value in -50.0f64..50.0, f0 in 0.01f64..0.99) {
            let generator = SplitGenerator::default();
            let r = generator.round(value, f0);
            prop_assert_eq!(r, r.round());
            if value > f0 {
                prop_assert!(r >= value - 1e-9);
            } else {
                prop_assert!(r <= value + 1e-9);
            }
            prop_assert!((r - value).abs() < 1.0 + 1e-9);
        }
    }
}
