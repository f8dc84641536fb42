use log::{debug, trace};

use crate::error::LpError;
use crate::problem::{LpProblem, Sense};
use crate::solution::{BasisStatus, Solution, SolutionStatus};
use crate::tableau::{invert, BasisIndex, Tableau};

/// Bounded-variable primal simplex solver.
///
/// The problem is brought into the form `A x + s = 0` with one slack per row
/// and box bounds on every variable. Phase 1 minimizes the sum of bound
/// violations of the basic variables, phase 2 the objective.
pub struct Solver {
    /// Maximum iterations before giving up
    max_iterations: usize,
    /// Tolerance for reduced costs and pivot ratios
    tolerance: f64,
    /// Tolerance for primal bound violations
    feasibility_tolerance: f64,
    /// Smallest pivot magnitude accepted in the ratio test and factorization
    pivot_tolerance: f64,
    /// Degenerate pivots in a row before switching to Bland's rule
    bland_after: usize,
}

impl Default for Solver {
    fn default() -> Self {
        Self {
            max_iterations: 10000,
            tolerance: 1e-9,
            feasibility_tolerance: 1e-7,
            pivot_tolerance: 1e-9,
            bland_after: 50,
        }
    }
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    pub fn with_feasibility_tolerance(mut self, tol: f64) -> Self {
        self.feasibility_tolerance = tol;
        self
    }

    /// Solve the LP problem using the two-phase bounded simplex method
    pub fn solve(&self, problem: &LpProblem) -> Result<Solution, LpError> {
        problem.validate()?;

        let mut state = State::new(problem);
        let mut phase = Phase::One;
        let mut degenerate = 0usize;

        for iteration in 0..self.max_iterations {
            state.refactor(self.pivot_tolerance)?;
            state.compute_basics();

            if phase == Phase::One && !state.has_infeasible_basic(self.feasibility_tolerance) {
                trace!("phase 1 finished after {} iterations", iteration);
                phase = Phase::Two;
            }

            let basic_costs = state.basic_costs(phase, self.feasibility_tolerance);
            let duals = state.duals(&basic_costs);
            let bland = degenerate >= self.bland_after;

            let Some(entering) = self.price(&state, phase, &duals, bland) else {
                return match phase {
                    Phase::One => {
                        debug!("LP infeasible after {} iterations", iteration);
                        Ok(Solution::infeasible(iteration))
                    }
                    Phase::Two => {
                        debug!("LP optimal after {} iterations", iteration);
                        Ok(state.into_solution(iteration))
                    }
                };
            };

            let alpha = state.ftran(entering.var);
            let step = self.ratio_test(&state, phase, &entering, &alpha, bland);

            match step {
                Step::Unbounded => {
                    return match phase {
                        Phase::One => Err(LpError::NumericalTrouble),
                        Phase::Two => {
                            debug!("LP unbounded after {} iterations", iteration);
                            Ok(Solution::unbounded(iteration))
                        }
                    };
                }
                Step::BoundFlip => {
                    degenerate = 0;
                    state.flip(entering.var, entering.direction);
                }
                Step::Pivot {
                    position,
                    theta,
                    leaves_at,
                } => {
                    if theta < self.tolerance {
                        degenerate += 1;
                    } else {
                        degenerate = 0;
                    }
                    state.pivot(position, entering.var, leaves_at);
                }
            }
        }

        debug!("LP iteration limit {} reached", self.max_iterations);
        Ok(Solution::iteration_limit(self.max_iterations))
    }

    /// Pick the entering variable: Dantzig's rule, or the lowest index under Bland's rule.
    fn price(&self, state: &State, phase: Phase, duals: &[f64], bland: bool) -> Option<Entering> {
        let mut best: Option<(Entering, f64)> = None;

        for j in 0..state.num_vars() {
            let status = state.status[j];
            if status == BasisStatus::Basic || state.lower[j] == state.upper[j] {
                continue;
            }
            let d = state.reduced_cost(j, phase, duals);
            let direction = match status {
                BasisStatus::Lower if d < -self.tolerance => 1.0,
                BasisStatus::Upper if d > self.tolerance => -1.0,
                BasisStatus::Zero if d.abs() > self.tolerance => -d.signum(),
                _ => continue,
            };
            let candidate = Entering { var: j, direction };
            if bland {
                return Some(candidate);
            }
            if best.as_ref().is_none_or(|(_, score)| d.abs() > *score) {
                best = Some((candidate, d.abs()));
            }
        }

        best.map(|(e, _)| e)
    }

    fn ratio_test(&self, state: &State, phase: Phase, entering: &Entering, alpha: &[f64], bland: bool) -> Step {
        let q = entering.var;
        let mut theta = state.upper[q] - state.lower[q];
        let mut leaving: Option<(usize, BasisStatus, f64)> = None;

        for (i, &a) in alpha.iter().enumerate() {
            // Rate of change of basic variable i per unit step of the entering variable
            let g = -entering.direction * a;
            if g.abs() < self.pivot_tolerance {
                continue;
            }
            let j = state.head[i];
            let x = state.x[j];
            let below = phase == Phase::One && x < state.lower[j] - self.feasibility_tolerance;
            let above = phase == Phase::One && x > state.upper[j] + self.feasibility_tolerance;

            let (limit, bound) = if below {
                if g <= 0.0 {
                    continue;
                }
                ((state.lower[j] - x) / g, BasisStatus::Lower)
            } else if above {
                if g >= 0.0 {
                    continue;
                }
                ((state.upper[j] - x) / g, BasisStatus::Upper)
            } else if g > 0.0 {
                if state.upper[j] == f64::INFINITY {
                    continue;
                }
                ((state.upper[j] - x) / g, BasisStatus::Upper)
            } else {
                if state.lower[j] == f64::NEG_INFINITY {
                    continue;
                }
                ((state.lower[j] - x) / g, BasisStatus::Lower)
            };
            let limit = limit.max(0.0);

            let better = match leaving {
                // A boxed entering variable flips bounds when nothing blocks earlier
                None => limit <= theta,
                Some((best_i, _, best_g)) => {
                    if limit < theta - self.tolerance {
                        true
                    } else if limit <= theta + self.tolerance {
                        if bland {
                            state.head[i] < state.head[best_i]
                        } else {
                            g.abs() > best_g
                        }
                    } else {
                        false
                    }
                }
            };
            if better {
                theta = theta.min(limit);
                leaving = Some((i, bound, g.abs()));
            }
        }

        match leaving {
            Some((position, leaves_at, _)) => Step::Pivot {
                position,
                theta,
                leaves_at,
            },
            None if theta.is_finite() => Step::BoundFlip,
            None => Step::Unbounded,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    One,
    Two,
}

struct Entering {
    var: usize,
    /// +1 to increase the variable, -1 to decrease it
    direction: f64,
}

enum Step {
    Unbounded,
    BoundFlip,
    Pivot {
        position: usize,
        theta: f64,
        leaves_at: BasisStatus,
    },
}

/// Working state over structural columns `0..n` and slacks `n..n+m`.
struct State<'a> {
    problem: &'a LpProblem,
    n: usize,
    /// Sparse columns of `[A | I]` as (row, value)
    matrix: Vec<Vec<(usize, f64)>>,
    lower: Vec<f64>,
    upper: Vec<f64>,
    /// Objective in minimization form
    cost: Vec<f64>,
    status: Vec<BasisStatus>,
    x: Vec<f64>,
    head: Vec<usize>,
    binv: Vec<Vec<f64>>,
}

impl<'a> State<'a> {
    fn new(problem: &'a LpProblem) -> Self {
        let n = problem.num_columns();
        let m = problem.num_rows();
        let sign = match problem.sense {
            Sense::Minimize => 1.0,
            Sense::Maximize => -1.0,
        };

        let mut matrix = vec![Vec::new(); n + m];
        for (r, row) in problem.rows.iter().enumerate() {
            for &(j, a) in &row.coefficients {
                if a != 0.0 {
                    matrix[j].push((r, a));
                }
            }
            matrix[n + r].push((r, 1.0));
        }

        let mut lower = Vec::with_capacity(n + m);
        let mut upper = Vec::with_capacity(n + m);
        let mut cost = Vec::with_capacity(n + m);
        let mut status = Vec::with_capacity(n + m);
        let mut x = Vec::with_capacity(n + m);

        for column in &problem.columns {
            lower.push(column.lower);
            upper.push(column.upper);
            cost.push(sign * column.cost);
            let (s, v) = if column.lower.is_finite() {
                (BasisStatus::Lower, column.lower)
            } else if column.upper.is_finite() {
                (BasisStatus::Upper, column.upper)
            } else {
                (BasisStatus::Zero, 0.0)
            };
            status.push(s);
            x.push(v);
        }
        // s_r = -(a_r . x), so the row sides swap and change sign
        for row in &problem.rows {
            lower.push(-(row.rhs - row.constant));
            upper.push(-(row.lhs - row.constant));
            cost.push(0.0);
            status.push(BasisStatus::Basic);
            x.push(0.0);
        }

        Self {
            problem,
            n,
            matrix,
            lower,
            upper,
            cost,
            status,
            x,
            head: (n..n + m).collect(),
            binv: Vec::new(),
        }
    }

    fn num_vars(&self) -> usize {
        self.matrix.len()
    }

    fn num_rows(&self) -> usize {
        self.head.len()
    }

    fn refactor(&mut self, pivot_tolerance: f64) -> Result<(), LpError> {
        let m = self.num_rows();
        let mut basis = vec![vec![0.0; m]; m];
        for (i, &j) in self.head.iter().enumerate() {
            for &(r, a) in &self.matrix[j] {
                basis[r][i] = a;
            }
        }
        self.binv = invert(&basis, pivot_tolerance)?;
        Ok(())
    }

    /// Recompute basic values from the nonbasic ones: `x_B = -B^-1 N x_N`.
    fn compute_basics(&mut self) {
        let m = self.num_rows();
        let mut rhs = vec![0.0; m];
        for (j, column) in self.matrix.iter().enumerate() {
            if self.status[j] == BasisStatus::Basic || self.x[j] == 0.0 {
                continue;
            }
            for &(r, a) in column {
                rhs[r] -= a * self.x[j];
            }
        }
        for i in 0..m {
            let value = self.binv[i].iter().zip(&rhs).map(|(b, v)| b * v).sum();
            self.x[self.head[i]] = value;
        }
    }

    fn has_infeasible_basic(&self, tol: f64) -> bool {
        self.head
            .iter()
            .any(|&j| self.x[j] < self.lower[j] - tol || self.x[j] > self.upper[j] + tol)
    }

    fn basic_costs(&self, phase: Phase, tol: f64) -> Vec<f64> {
        self.head
            .iter()
            .map(|&j| match phase {
                Phase::One if self.x[j] < self.lower[j] - tol => -1.0,
                Phase::One if self.x[j] > self.upper[j] + tol => 1.0,
                Phase::One => 0.0,
                Phase::Two => self.cost[j],
            })
            .collect()
    }

    /// Simplex multipliers `y = c_B^T B^-1`.
    fn duals(&self, basic_costs: &[f64]) -> Vec<f64> {
        let m = self.num_rows();
        let mut y = vec![0.0; m];
        for (i, &c) in basic_costs.iter().enumerate() {
            if c == 0.0 {
                continue;
            }
            for r in 0..m {
                y[r] += c * self.binv[i][r];
            }
        }
        y
    }

    fn reduced_cost(&self, j: usize, phase: Phase, duals: &[f64]) -> f64 {
        let c = match phase {
            Phase::One => 0.0,
            Phase::Two => self.cost[j],
        };
        c - self.matrix[j].iter().map(|&(r, a)| duals[r] * a).sum::<f64>()
    }

    /// Column `B^-1 a_j`.
    fn ftran(&self, j: usize) -> Vec<f64> {
        (0..self.num_rows())
            .map(|i| self.matrix[j].iter().map(|&(r, a)| self.binv[i][r] * a).sum())
            .collect()
    }

    fn flip(&mut self, j: usize, direction: f64) {
        if direction > 0.0 {
            self.status[j] = BasisStatus::Upper;
            self.x[j] = self.upper[j];
        } else {
            self.status[j] = BasisStatus::Lower;
            self.x[j] = self.lower[j];
        }
    }

    fn pivot(&mut self, position: usize, entering: usize, leaves_at: BasisStatus) {
        let leaving = self.head[position];
        self.status[leaving] = leaves_at;
        self.x[leaving] = match leaves_at {
            BasisStatus::Upper => self.upper[leaving],
            _ => self.lower[leaving],
        };
        self.status[entering] = BasisStatus::Basic;
        self.head[position] = entering;
    }

    fn into_solution(self, iterations: usize) -> Solution {
        let n = self.n;
        let values: Vec<f64> = self.x[..n].to_vec();
        let row_activities = self.problem.rows.iter().map(|r| r.activity(&values)).collect();
        let column_status = self.status[..n].to_vec();
        // Slack at its lower bound means the row activity sits at rhs
        let row_status = self.status[n..]
            .iter()
            .map(|s| match s {
                BasisStatus::Lower => BasisStatus::Upper,
                BasisStatus::Upper => BasisStatus::Lower,
                other => *other,
            })
            .collect();
        let head = self
            .head
            .iter()
            .map(|&j| {
                if j < n {
                    BasisIndex::Column(j)
                } else {
                    BasisIndex::Slack(j - n)
                }
            })
            .collect();
        let rows = self
            .problem
            .rows
            .iter()
            .map(|r| r.coefficients.clone())
            .collect();

        Solution {
            status: SolutionStatus::Optimal,
            objective_value: self.problem.objective_value(&values),
            values,
            row_activities,
            column_status,
            row_status,
            iterations,
            tableau: Some(Tableau::new(head, self.binv, rows, n)),
        }
    }
}
