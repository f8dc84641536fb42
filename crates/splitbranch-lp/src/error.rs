use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LpError {
    #[error("Row {row} references column {column}, but the problem has {columns} columns")]
    UnknownColumn { row: String, column: usize, columns: usize },
    #[error("Row {0} has no finite side")]
    FreeRow(String),
    #[error("Row {name} has lhs {lhs} above rhs {rhs}")]
    InvertedRow { name: String, lhs: f64, rhs: f64 },
    #[error("Column {name} has lower bound {lower} above upper bound {upper}")]
    InvertedBounds { name: String, lower: f64, upper: f64 },
    #[error("Basis matrix is singular (pivot {pivot:e} in position {position})")]
    SingularBasis { position: usize, pivot: f64 },
    #[error("Tableau row {row} out of range ({rows} rows)")]
    TableauRowOutOfRange { row: usize, rows: usize },
    #[error("Phase 1 produced an unbounded ray; the basis is numerically unstable")]
    NumericalTrouble,
}
