//! JSON model format.
//!
//! ```json
//! {
//!   "sense": "maximize",
//!   "variables": [{ "name": "x", "upper": 10, "cost": 1, "integer": true }],
//!   "constraints": [{ "name": "cap", "terms": { "x": 5 }, "rhs": 17 }]
//! }
//! ```
//!
//! A missing variable `lower` is 0 and a missing `upper` is unbounded; an
//! explicit `null` is infinite on either side. Constraint sides default to
//! infinite and at least one must be given.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Deserializer};
use splitbranch_core::{MipError, MipProblem, Tolerances};
use splitbranch_lp::{LpProblem, Sense};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate variable '{0}'")]
    DuplicateVariable(String),
    #[error("constraint '{constraint}' references unknown variable '{variable}'")]
    UnknownVariable { constraint: String, variable: String },
    #[error("constraint '{0}' has neither lhs nor rhs")]
    FreeConstraint(String),
    #[error(transparent)]
    Mip(#[from] MipError),
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ModelSense {
    #[default]
    Minimize,
    Maximize,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModelFile {
    #[serde(default)]
    sense: ModelSense,
    #[serde(default)]
    objective_offset: f64,
    variables: Vec<VariableSpec>,
    #[serde(default)]
    constraints: Vec<ConstraintSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct VariableSpec {
    name: String,
    #[serde(default, deserialize_with = "present")]
    lower: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present")]
    upper: Option<Option<f64>>,
    #[serde(default)]
    cost: f64,
    #[serde(default)]
    integer: bool,
    #[serde(default)]
    priority: i32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConstraintSpec {
    name: String,
    terms: BTreeMap<String, f64>,
    lhs: Option<f64>,
    rhs: Option<f64>,
}

/// Distinguishes a missing field (`None`) from an explicit `null` (`Some(None)`).
fn present<'de, D>(deserializer: D) -> Result<Option<Option<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<f64>::deserialize(deserializer).map(Some)
}

/// A parsed model: the MIP plus the variable names by column.
#[derive(Debug, Clone)]
pub struct Model {
    pub problem: MipProblem,
    pub names: Vec<String>,
    pub constraint_names: Vec<String>,
}

impl Model {
    pub fn parse(source: &str, tol: &Tolerances) -> Result<Self, ModelError> {
        let file: ModelFile = serde_json::from_str(source)?;

        let mut lp = LpProblem::new();
        lp.set_sense(match file.sense {
            ModelSense::Minimize => Sense::Minimize,
            ModelSense::Maximize => Sense::Maximize,
        });
        lp.objective_offset = file.objective_offset;

        let mut columns: HashMap<&str, usize> = HashMap::new();
        let mut integer = Vec::with_capacity(file.variables.len());
        let mut priority = Vec::with_capacity(file.variables.len());
        for var in &file.variables {
            let lower = match var.lower {
                None => 0.0,
                Some(v) => v.unwrap_or(f64::NEG_INFINITY),
            };
            let upper = var.upper.flatten().unwrap_or(f64::INFINITY);
            let j = lp.add_column(var.name.as_str(), lower, upper, var.cost);
            if columns.insert(var.name.as_str(), j).is_some() {
                return Err(ModelError::DuplicateVariable(var.name.clone()));
            }
            integer.push(var.integer);
            priority.push(var.priority);
        }

        for con in &file.constraints {
            let lhs = con.lhs.unwrap_or(f64::NEG_INFINITY);
            let rhs = con.rhs.unwrap_or(f64::INFINITY);
            if lhs == f64::NEG_INFINITY && rhs == f64::INFINITY {
                return Err(ModelError::FreeConstraint(con.name.clone()));
            }
            let coefficients = con
                .terms
                .iter()
                .map(|(name, &a)| {
                    columns
                        .get(name.as_str())
                        .map(|&j| (j, a))
                        .ok_or_else(|| ModelError::UnknownVariable {
                            constraint: con.name.clone(),
                            variable: name.clone(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            lp.add_row(con.name.as_str(), coefficients, lhs, rhs);
        }

        let names = file.variables.iter().map(|v| v.name.clone()).collect();
        let constraint_names = file.constraints.iter().map(|c| c.name.clone()).collect();
        let problem = MipProblem::new(lp, integer, priority, tol)?;
        Ok(Self {
            problem,
            names,
            constraint_names,
        })
    }
}
