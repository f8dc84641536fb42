//! Branching on GMI split disjunctions.

use log::{debug, warn};

use crate::error::{BranchError, Precondition, SplitError};
use crate::snapshot::LpView;
use crate::split::{Split, SplitGenerator};
use crate::tolerance::Tolerances;
use crate::BasisIndex;

/// Identifier of a node in the search tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(pub u64);

/// A dense linear constraint `lhs <= coefficients . x <= rhs`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinearConstraint {
    pub coefficients: Vec<f64>,
    pub lhs: f64,
    pub rhs: f64,
}

impl LinearConstraint {
    pub fn le(coefficients: Vec<f64>, rhs: f64) -> Self {
        Self {
            coefficients,
            lhs: f64::NEG_INFINITY,
            rhs,
        }
    }

    pub fn ge(coefficients: Vec<f64>, lhs: f64) -> Self {
        Self {
            coefficients,
            lhs,
            rhs: f64::INFINITY,
        }
    }

    pub fn activity(&self, x: &[f64]) -> f64 {
        self.coefficients.iter().zip(x).map(|(a, v)| a * v).sum()
    }

    pub fn is_satisfied(&self, x: &[f64], tol: &Tolerances) -> bool {
        let activity = self.activity(x);
        activity >= self.lhs - tol.feastol && activity <= self.rhs + tol.feastol
    }

    /// Nonzero coefficients as (column, value).
    pub fn sparse(&self) -> Vec<(usize, f64)> {
        self.coefficients
            .iter()
            .enumerate()
            .filter(|&(_, &a)| a != 0.0)
            .map(|(j, &a)| (j, a))
            .collect()
    }
}

/// What the branching rule needs from the search-tree manager.
pub trait SearchTree {
    /// Create a child of the node being branched on.
    fn create_child(&mut self, priority: f64, estimate: f64) -> NodeId;

    /// Attach a constraint that is only valid in the subtree of `node`.
    fn add_local_constraint(&mut self, node: NodeId, constraint: LinearConstraint) -> Result<(), BranchError>;
}

/// A fractional integer column of the current LP solution.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchCandidate {
    pub column: usize,
    pub value: f64,
    pub frac: f64,
    pub priority: i32,
}

/// Branching candidates with the priority candidates first.
#[derive(Debug, Clone, Default)]
pub struct BranchCandidates {
    candidates: Vec<BranchCandidate>,
    num_priority: usize,
}

impl BranchCandidates {
    pub fn all(&self) -> &[BranchCandidate] {
        &self.candidates
    }

    /// Candidates of maximal branching priority.
    pub fn priority(&self) -> &[BranchCandidate] {
        &self.candidates[..self.num_priority]
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }
}

/// Collect the integral columns whose LP value is fractional.
///
/// Within a priority class candidates are ordered by fractionality closest to
/// one half, ties by LP position.
pub fn branch_candidates<L: LpView + ?Sized>(lp: &L, tol: &Tolerances) -> BranchCandidates {
    let mut candidates: Vec<BranchCandidate> = lp
        .columns()
        .iter()
        .filter(|c| c.integral && !tol.is_feas_integral(c.primal))
        .map(|c| BranchCandidate {
            column: c.lp_pos,
            value: c.primal,
            frac: tol.frac(c.primal),
            priority: c.priority,
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| (a.frac - 0.5).abs().total_cmp(&(b.frac - 0.5).abs()))
            .then_with(|| a.column.cmp(&b.column))
    });
    let num_priority = match candidates.first() {
        Some(first) => candidates.iter().take_while(|c| c.priority == first.priority).count(),
        None => 0,
    };

    BranchCandidates {
        candidates,
        num_priority,
    }
}

/// Result of one branching call.
#[derive(Debug, Clone, PartialEq)]
pub enum BranchOutcome {
    /// Two children were created with `split <= rhs` and `split >= rhs + 1`.
    Branched {
        column: usize,
        split: Split,
        children: [NodeId; 2],
    },
    /// There was nothing to branch on.
    NoCandidates,
    /// Every candidate was nonbasic or produced an empty split or an
    /// inconsistent basis.
    Ineffective,
}

/// Branching rule that splits on GMI disjunctions.
///
/// One call creates at most one pair of children: the first candidate whose
/// tableau row yields a nonzero split wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct GmiBranching {
    generator: SplitGenerator,
}

impl GmiBranching {
    pub fn new(tol: Tolerances) -> Self {
        Self {
            generator: SplitGenerator::new(tol),
        }
    }

    pub fn generator(&self) -> &SplitGenerator {
        &self.generator
    }

    /// Derive the split of one basic candidate column.
    pub fn split_for<L: LpView + ?Sized>(
        &self,
        lp: &L,
        tableau_rows: &[Option<usize>],
        candidate: &BranchCandidate,
    ) -> Result<Split, BranchError> {
        let row = tableau_rows
            .get(candidate.column)
            .copied()
            .flatten()
            .ok_or(SplitError::Precondition(Precondition::NotBasic(candidate.column)))?;
        let tableau = lp.tableau_row(row)?;
        let split = self
            .generator
            .generate(lp.columns(), lp.rows(), &tableau, candidate.value, candidate.column)?;
        Ok(split)
    }

    /// Branch on the first usable candidate.
    ///
    /// `estimate` is passed on to both children, which get the same priority.
    pub fn branch<L, T>(
        &self,
        lp: &L,
        candidates: &[BranchCandidate],
        estimate: f64,
        tree: &mut T,
    ) -> Result<BranchOutcome, BranchError>
    where
        L: LpView + ?Sized,
        T: SearchTree + ?Sized,
    {
        if candidates.is_empty() {
            return Ok(BranchOutcome::NoCandidates);
        }

        let tableau_rows = column_tableau_rows(lp);

        for candidate in candidates {
            let split = match self.split_for(lp, &tableau_rows, candidate) {
                Ok(split) => split,
                Err(BranchError::Split(SplitError::BasisInconsistency(e))) => {
                    warn!("skipping column {}: {}", candidate.column, e);
                    continue;
                }
                // fractional at a fractional bound
                Err(BranchError::Split(SplitError::Precondition(Precondition::NotBasic(_)))) => {
                    debug!("skipping nonbasic column {}", candidate.column);
                    continue;
                }
                Err(e) => return Err(e),
            };
            if split.is_zero() {
                debug!("split of column {} is empty", candidate.column);
                continue;
            }

            let down = tree.create_child(1.0, estimate);
            let up = tree.create_child(1.0, estimate);
            tree.add_local_constraint(down, split.down_constraint())?;
            tree.add_local_constraint(up, split.up_constraint())?;
            debug!(
                "branched on split of column {} (value {:.4}): {} nonzeros, rhs {}",
                candidate.column,
                candidate.value,
                split.support(),
                split.rhs
            );

            return Ok(BranchOutcome::Branched {
                column: candidate.column,
                split,
                children: [down, up],
            });
        }

        Ok(BranchOutcome::Ineffective)
    }
}

/// Tableau row of every basic column, `None` for nonbasic columns.
pub fn column_tableau_rows<L: LpView + ?Sized>(lp: &L) -> Vec<Option<usize>> {
    let mut rows = vec![None; lp.columns().len()];
    for (i, b) in lp.basis_indices().iter().enumerate() {
        if let BasisIndex::Column(j) = *b {
            if let Some(slot) = rows.get_mut(j) {
                *slot = Some(i);
            }
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{Column, LpSnapshot, Row, RowEntries};
    use crate::BasisStatus;
    use splitbranch_lp::{ConstraintOp, LpError, LpProblem, Sense, Solver};

    #[derive(Default)]
    struct RecordingTree {
        children: Vec<(NodeId, f64, f64)>,
        constraints: Vec<(NodeId, LinearConstraint)>,
    }

    impl SearchTree for RecordingTree {
        fn create_child(&mut self, priority: f64, estimate: f64) -> NodeId {
            let id = NodeId(self.children.len() as u64 + 1);
            self.children.push((id, priority, estimate));
            id
        }

        fn add_local_constraint(&mut self, node: NodeId, constraint: LinearConstraint) -> Result<(), BranchError> {
            if !self.children.iter().any(|(id, _, _)| *id == node) {
                return Err(BranchError::UnknownNode(node));
            }
            self.constraints.push((node, constraint));
            Ok(())
        }
    }

    /// Hand-built LP view for rows the simplex would never produce.
    struct FixedView {
        columns: Vec<Column>,
        rows: Vec<Row>,
        basis: Vec<BasisIndex>,
        binv: Vec<Vec<f64>>,
        binva: Vec<Vec<f64>>,
    }

    impl LpView for FixedView {
        fn columns(&self) -> &[Column] {
            &self.columns
        }

        fn rows(&self) -> &[Row] {
            &self.rows
        }

        fn basis_indices(&self) -> &[BasisIndex] {
            &self.basis
        }

        fn binv_row(&self, i: usize) -> Result<Vec<f64>, LpError> {
            Ok(self.binv[i].clone())
        }

        fn binva_row(&self, i: usize) -> Result<Vec<f64>, LpError> {
            Ok(self.binva[i].clone())
        }
    }

    /// max x subject to 5x <= 17, x integer in [0, 10]
    fn knapsack() -> (LpProblem, LpSnapshot) {
        let mut problem = LpProblem::new();
        let x = problem.add_column("x", 0.0, 10.0, 1.0);
        problem.set_sense(Sense::Maximize);
        problem.add_constraint("cap", vec![(x, 5.0)], ConstraintOp::Le, 17.0);
        let solution = Solver::new().solve(&problem).unwrap();
        let snapshot = LpSnapshot::capture(&problem, &solution, &[true], &[0], &Tolerances::default()).unwrap();
        (problem, snapshot)
    }

    #[test]
    fn test_no_candidates() {
        let (_, snapshot) = knapsack();
        let mut tree = RecordingTree::default();
        let outcome = GmiBranching::default().branch(&snapshot, &[], 0.0, &mut tree).unwrap();
        assert_eq!(outcome, BranchOutcome::NoCandidates);
        assert!(tree.children.is_empty());
        assert!(tree.constraints.is_empty());
    }

    #[test]
    fn test_branch_creates_complementary_children() {
        let (_, snapshot) = knapsack();
        let tol = Tolerances::default();
        let candidates = branch_candidates(&snapshot, &tol);
        assert_eq!(candidates.priority().len(), 1);
        assert!((candidates.priority()[0].value - 3.4).abs() < 1e-9);

        let mut tree = RecordingTree::default();
        let outcome = GmiBranching::new(tol)
            .branch(&snapshot, candidates.priority(), -3.4, &mut tree)
            .unwrap();

        let BranchOutcome::Branched { column, split, children } = outcome else {
            panic!("expected branching, got {:?}", outcome);
        };
        assert_eq!(column, 0);
        assert_eq!(split.coefficients, vec![1.0]);
        assert_eq!(split.rhs, 3.0);
        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.children[0].1, tree.children[1].1);
        assert_eq!(tree.children[0].2, -3.4);

        let (down_node, down) = &tree.constraints[0];
        let (up_node, up) = &tree.constraints[1];
        assert_eq!(*down_node, children[0]);
        assert_eq!(*up_node, children[1]);
        assert_eq!(down.rhs, 3.0);
        assert_eq!(up.lhs, 4.0);
        let x = snapshot.values();
        assert!(!down.is_satisfied(&x, &tol));
        assert!(!up.is_satisfied(&x, &tol));
    }

    #[test]
    fn test_candidate_order_and_priorities() {
        let columns = vec![
            Column {
                lp_pos: 0,
                integral: true,
                status: BasisStatus::Basic,
                lower: 0.0,
                upper: 10.0,
                primal: 1.1,
                priority: 0,
            },
            Column {
                lp_pos: 1,
                integral: true,
                status: BasisStatus::Basic,
                lower: 0.0,
                upper: 10.0,
                primal: 2.5,
                priority: 0,
            },
            Column {
                lp_pos: 2,
                integral: true,
                status: BasisStatus::Basic,
                lower: 0.0,
                upper: 10.0,
                primal: 0.9,
                priority: 5,
            },
            Column {
                lp_pos: 3,
                integral: false,
                status: BasisStatus::Basic,
                lower: 0.0,
                upper: 10.0,
                primal: 0.5,
                priority: 9,
            },
        ];
        let view = FixedView {
            columns,
            rows: Vec::new(),
            basis: Vec::new(),
            binv: Vec::new(),
            binva: Vec::new(),
        };
        let candidates = branch_candidates(&view, &Tolerances::default());
        let order: Vec<usize> = candidates.all().iter().map(|c| c.column).collect();
        assert_eq!(order, vec![2, 1, 0]);
        assert_eq!(candidates.priority().len(), 1);
        assert_eq!(candidates.len(), 3);
    }

    #[test]
    fn test_empty_split_is_ineffective() {
        // x0 basic at 0.5; the row x0 - x1 <= 0 at rhs eliminates x0 again
        let columns = vec![
            Column {
                lp_pos: 0,
                integral: true,
                status: BasisStatus::Basic,
                lower: 0.0,
                upper: 1.0,
                primal: 0.5,
                priority: 0,
            },
            Column {
                lp_pos: 1,
                integral: true,
                status: BasisStatus::Basic,
                lower: 0.0,
                upper: 1.0,
                primal: 0.5,
                priority: 0,
            },
        ];
        let rows = vec![Row {
            lp_pos: 0,
            integral: true,
            modifiable: false,
            status: BasisStatus::Upper,
            lhs: f64::NEG_INFINITY,
            rhs: 0.0,
            constant: 0.0,
            entries: RowEntries::in_lp(vec![(0, 1.0)]),
            activity: 0.0,
        }];
        let view = FixedView {
            columns,
            rows,
            basis: vec![BasisIndex::Column(0), BasisIndex::Column(1)],
            binv: vec![vec![1.0], vec![0.0]],
            binva: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
        };
        let candidates = branch_candidates(&view, &Tolerances::default());
        let mut tree = RecordingTree::default();
        let outcome = GmiBranching::default()
            .branch(&view, &candidates.priority()[..1], 0.0, &mut tree)
            .unwrap();
        assert_eq!(outcome, BranchOutcome::Ineffective);
        assert!(tree.children.is_empty());
    }

    #[test]
    fn test_nonbasic_candidate_is_skipped() {
        // x0 sits at its fractional upper bound 2.5, x1 is basic at 1.5
        let columns = vec![
            Column {
                lp_pos: 0,
                integral: true,
                status: BasisStatus::Upper,
                lower: 0.0,
                upper: 2.5,
                primal: 2.5,
                priority: 0,
            },
            Column {
                lp_pos: 1,
                integral: true,
                status: BasisStatus::Basic,
                lower: 0.0,
                upper: 10.0,
                primal: 1.5,
                priority: 0,
            },
        ];
        let view = FixedView {
            columns,
            rows: Vec::new(),
            basis: vec![BasisIndex::Column(1)],
            binv: vec![Vec::new()],
            binva: vec![vec![0.0, 1.0]],
        };
        let candidates = branch_candidates(&view, &Tolerances::default());
        assert_eq!(candidates.all()[0].column, 0);

        let mut tree = RecordingTree::default();
        let outcome = GmiBranching::default()
            .branch(&view, candidates.all(), 0.0, &mut tree)
            .unwrap();
        let BranchOutcome::Branched { column, split, .. } = outcome else {
            panic!("expected branching on column 1, got {:?}", outcome);
        };
        assert_eq!(column, 1);
        assert_eq!(split.coefficients, vec![0.0, 1.0]);
        assert_eq!(split.rhs, 1.0);
        assert_eq!(tree.children.len(), 2);

        let outcome = GmiBranching::default()
            .branch(&view, &candidates.all()[..1], 0.0, &mut RecordingTree::default())
            .unwrap();
        assert_eq!(outcome, BranchOutcome::Ineffective);
    }

    #[test]
    fn test_nonbasic_candidate_is_rejected() {
        let (_, snapshot) = knapsack();
        let candidate = BranchCandidate {
            column: 0,
            value: 3.4,
            frac: 0.4,
            priority: 0,
        };
        let rows = vec![None];
        let err = GmiBranching::default().split_for(&snapshot, &rows, &candidate).unwrap_err();
        assert_eq!(err, BranchError::Split(SplitError::Precondition(Precondition::NotBasic(0))));
    }
}
