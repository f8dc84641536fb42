use splitbranch_lp::LpError;
use thiserror::Error;

use crate::branching::NodeId;

/// Caller errors: the split was requested for an unsuitable column or with
/// mismatched tableau data.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Precondition {
    #[error("column {0} is outside the LP")]
    UnknownColumn(usize),
    #[error("column {0} is not basic")]
    NotBasic(usize),
    #[error("column {0} is not integral")]
    NotIntegral(usize),
    #[error("primal value {value} of column {column} is not fractional")]
    NotFractional { column: usize, value: f64 },
    #[error("LP solution carries no optimal basis")]
    NoOptimalBasis,
    #[error("{what} has {got} entries, expected {expected}")]
    Dimension {
        what: &'static str,
        got: usize,
        expected: usize,
    },
}

/// Internal invariant failures of the basis snapshot.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BasisInconsistency {
    #[error("slack of row {0} is nonbasic free")]
    FreeSlack(usize),
    #[error("row {0} has no finite side")]
    FreeRow(usize),
    #[error("row {row} has lhs {lhs} above rhs {rhs}")]
    InvertedSides { row: usize, lhs: f64, rhs: f64 },
    #[error("row {0} is nonbasic at lower but has an infinite lhs")]
    LowerWithoutLhs(usize),
    #[error("row {row} activity {activity} is at neither side [{lhs}, {rhs}]")]
    ActivityOffBounds { row: usize, activity: f64, lhs: f64, rhs: f64 },
    #[error("row {row} is active at its {side} side but reported nonbasic at the other")]
    StatusMismatch { row: usize, side: &'static str },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SplitError {
    #[error("Precondition violated: {0}")]
    Precondition(#[from] Precondition),
    #[error("Inconsistent basis: {0}")]
    BasisInconsistency(#[from] BasisInconsistency),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BranchError {
    #[error("Split generation failed: {0}")]
    Split(#[from] SplitError),
    #[error("LP error: {0}")]
    Lp(#[from] LpError),
    #[error("Unknown search node {0:?}")]
    UnknownNode(NodeId),
}

/// Errors that can occur during MIP solving.
#[derive(Error, Debug)]
pub enum MipError {
    /// Problem validation failed
    #[error("Invalid problem: {0}")]
    InvalidProblem(String),

    /// Node LP could not be solved
    #[error("LP error: {0}")]
    Lp(#[from] LpError),

    /// Node LP solution could not be turned into a snapshot
    #[error("LP snapshot failed: {0}")]
    Snapshot(#[from] Precondition),

    /// Node LP hit the simplex iteration limit
    #[error("LP iteration limit reached at node {0}")]
    LpIterationLimit(u64),

    /// Branching failed in a way the fallback rule cannot absorb
    #[error("Branching failed: {0}")]
    Branch(#[from] BranchError),
}
