//! Gomory mixed-integer split disjunctions and a branching rule built on them.
//!
//! [`SplitGenerator`] turns one row of the optimal simplex tableau into a
//! split `a x <= rhs` or `a x >= rhs + 1` that cuts off the current fractional
//! vertex. [`GmiBranching`] installs the two halves on two new children of the
//! search tree. [`BranchAndBound`] is a small best-first driver that exercises
//! both on top of the `splitbranch-lp` simplex.

mod branching;
mod error;
mod model;
pub mod search;
mod settings;
mod snapshot;
mod solution;
mod split;
mod tolerance;

pub use branching::{
    branch_candidates, column_tableau_rows, BranchCandidate, BranchCandidates, BranchOutcome, GmiBranching,
    LinearConstraint, NodeId, SearchTree,
};
pub use error::{BasisInconsistency, BranchError, MipError, Precondition, SplitError};
pub use model::MipProblem;
pub use search::BranchAndBound;
pub use settings::{BranchingRule, MipSettings, NodeSelection};
pub use snapshot::{Column, LpSnapshot, LpView, Row, RowEntries, TableauRow};
pub use solution::{MipSolution, MipStatus};
pub use split::{Split, SplitGenerator};
pub use tolerance::Tolerances;

pub use splitbranch_lp::{BasisIndex, BasisStatus};
