mod error;
mod problem;
mod simplex;
mod solution;
mod tableau;

pub use error::LpError;
pub use problem::{Column, ConstraintOp, LpProblem, Row, Sense};
pub use simplex::Solver;
pub use solution::{BasisStatus, Solution, SolutionStatus};
pub use tableau::{BasisIndex, Tableau};
