//! Branch-and-bound tree controller.

use std::time::Instant;

use log::{debug, info, trace, warn};
use splitbranch_lp::{Solution, SolutionStatus, Solver};

use super::{BoundChange, NodeQueue, NodeStatus, SearchNode};
use crate::branching::{branch_candidates, BranchOutcome, GmiBranching, LinearConstraint, NodeId, SearchTree};
use crate::error::{BranchError, MipError};
use crate::model::MipProblem;
use crate::settings::MipSettings;
use crate::snapshot::LpSnapshot;
use crate::solution::{MipSolution, MipStatus};

/// Collects the children a branching rule creates below one node.
pub struct ChildCollector<'a> {
    parent: &'a SearchNode,
    next_id: &'a mut u64,
    children: Vec<SearchNode>,
}

impl<'a> ChildCollector<'a> {
    pub fn new(parent: &'a SearchNode, next_id: &'a mut u64) -> Self {
        Self {
            parent,
            next_id,
            children: Vec::new(),
        }
    }

    pub fn children(&self) -> &[SearchNode] {
        &self.children
    }

    pub fn into_children(self) -> Vec<SearchNode> {
        self.children
    }
}

impl SearchTree for ChildCollector<'_> {
    fn create_child(&mut self, priority: f64, estimate: f64) -> NodeId {
        let id = NodeId(*self.next_id);
        *self.next_id += 1;
        let mut child = self.parent.child(id);
        child.priority = priority;
        child.estimate = estimate;
        self.children.push(child);
        id
    }

    fn add_local_constraint(&mut self, node: NodeId, constraint: LinearConstraint) -> Result<(), BranchError> {
        let child = self
            .children
            .iter_mut()
            .find(|c| c.id == node)
            .ok_or(BranchError::UnknownNode(node))?;
        child.local_constraints.push(constraint);
        Ok(())
    }
}

/// Best incumbent in minimization form.
struct Incumbent {
    values: Vec<f64>,
    objective: f64,
}

/// Branch-and-bound driver over `splitbranch-lp` node relaxations.
///
/// Fractional nodes are branched with the configured rule; whenever the GMI
/// rule yields no children the node is branched on its most fractional
/// variable instead.
pub struct BranchAndBound {
    settings: MipSettings,
    solver: Solver,
    gmi: GmiBranching,
    queue: NodeQueue,
    incumbent: Option<Incumbent>,
    next_node_id: u64,
    nodes_explored: u64,
    nodes_pruned: u64,
    split_branchings: u64,
    fallback_branchings: u64,
    incumbent_updates: u64,
    start_time: Option<Instant>,
}

impl BranchAndBound {
    pub fn new(settings: MipSettings) -> Self {
        let solver = Solver::new()
            .with_max_iterations(settings.lp_iteration_limit)
            .with_feasibility_tolerance(settings.tolerances.feastol.min(1e-7));
        Self {
            solver,
            gmi: GmiBranching::new(settings.tolerances),
            queue: NodeQueue::new(settings.node_selection),
            incumbent: None,
            next_node_id: 1,
            nodes_explored: 0,
            nodes_pruned: 0,
            split_branchings: 0,
            fallback_branchings: 0,
            incumbent_updates: 0,
            start_time: None,
            settings,
        }
    }

    pub fn settings(&self) -> &MipSettings {
        &self.settings
    }

    /// Solve `problem` to optimality or until the node limit is reached.
    pub fn solve(&mut self, problem: &MipProblem) -> Result<MipSolution, MipError> {
        self.reset();
        self.start_time = Some(Instant::now());
        self.queue.push(SearchNode::root());

        if self.settings.verbose {
            info!(
                "branch-and-bound: {} columns ({} integer), {} rows, rule {:?}",
                problem.lp().num_columns(),
                problem.num_integer(),
                problem.lp().num_rows(),
                self.settings.branching_rule
            );
        }

        while let Some(mut node) = self.queue.pop() {
            if self.nodes_explored >= self.settings.max_nodes {
                self.queue.push(node);
                return Ok(self.finalize(problem, MipStatus::NodeLimit));
            }
            self.nodes_explored += 1;

            if self.is_dominated(&node) {
                self.close(&node, NodeStatus::Pruned);
                continue;
            }
            let Some(lp) = problem.node_lp(&node) else {
                self.close(&node, NodeStatus::Infeasible);
                continue;
            };

            let solution = self.solver.solve(&lp)?;
            match solution.status {
                SolutionStatus::Optimal => {}
                SolutionStatus::Infeasible => {
                    self.close(&node, NodeStatus::Infeasible);
                    continue;
                }
                SolutionStatus::Unbounded => {
                    debug!("node {} relaxation is unbounded", node.id.0);
                    return Ok(self.finalize(problem, MipStatus::Unbounded));
                }
                SolutionStatus::IterationLimit => return Err(MipError::LpIterationLimit(node.id.0)),
            }

            node.dual_bound = node.dual_bound.max(problem.to_min(solution.objective_value));
            if self.is_dominated(&node) {
                self.close(&node, NodeStatus::Pruned);
                continue;
            }

            let snapshot = LpSnapshot::capture(
                &lp,
                &solution,
                problem.integer(),
                problem.priority(),
                &self.settings.tolerances,
            )?;
            if branch_candidates(&snapshot, &self.settings.tolerances).is_empty() {
                self.update_incumbent(problem, &solution, node.dual_bound);
                self.close(&node, NodeStatus::IntegerFeasible);
                continue;
            }

            self.branch(&node, &snapshot)?;
            self.close(&node, NodeStatus::Branched);
            self.log_progress(problem);
        }

        let status = if self.incumbent.is_some() {
            MipStatus::Optimal
        } else {
            MipStatus::Infeasible
        };
        Ok(self.finalize(problem, status))
    }

    fn reset(&mut self) {
        self.queue = NodeQueue::new(self.settings.node_selection);
        self.incumbent = None;
        self.next_node_id = 1;
        self.nodes_explored = 0;
        self.nodes_pruned = 0;
        self.split_branchings = 0;
        self.fallback_branchings = 0;
        self.incumbent_updates = 0;
    }

    /// Branch on a GMI split if the rule allows it here, else on a variable.
    fn branch(&mut self, node: &SearchNode, snapshot: &LpSnapshot) -> Result<(), MipError> {
        let tol = self.settings.tolerances;
        let candidates = branch_candidates(snapshot, &tol);

        if self.settings.branching_rule.uses_splits_at(node.depth) {
            let mut collector = ChildCollector::new(node, &mut self.next_node_id);
            match self
                .gmi
                .branch(snapshot, candidates.priority(), node.estimate, &mut collector)
            {
                Ok(BranchOutcome::Branched { column, split, .. }) => {
                    trace!(
                        "node {}: split on column {} with {} nonzeros",
                        node.id.0,
                        column,
                        split.support()
                    );
                    for child in collector.into_children() {
                        self.queue.push(child);
                    }
                    self.split_branchings += 1;
                    return Ok(());
                }
                Ok(outcome) => debug!("node {}: GMI branching {:?}, falling back", node.id.0, outcome),
                Err(e) => warn!("node {}: GMI branching failed: {}", node.id.0, e),
            }
        }

        let candidate = candidates
            .all()
            .first()
            .ok_or_else(|| MipError::InvalidProblem(format!("node {} has no fractional column", node.id.0)))?;
        let down_id = NodeId(self.next_node_id);
        let up_id = NodeId(self.next_node_id + 1);
        self.next_node_id += 2;
        self.queue
            .push(node.bound_child(down_id, BoundChange::down(candidate.column, candidate.value)));
        self.queue
            .push(node.bound_child(up_id, BoundChange::up(candidate.column, candidate.value)));
        self.fallback_branchings += 1;
        Ok(())
    }

    fn is_dominated(&self, node: &SearchNode) -> bool {
        self.incumbent
            .as_ref()
            .is_some_and(|inc| node.can_prune(inc.objective - self.settings.gap_abs_tol))
    }

    fn close(&mut self, node: &SearchNode, status: NodeStatus) {
        if status == NodeStatus::Pruned {
            self.nodes_pruned += 1;
        }
        trace!("node {} (depth {}) {:?}", node.id.0, node.depth, status);
    }

    /// Record an integer-feasible LP solution if it improves the incumbent.
    fn update_incumbent(&mut self, problem: &MipProblem, solution: &Solution, objective: f64) {
        if self.incumbent.as_ref().is_some_and(|inc| inc.objective <= objective) {
            return;
        }
        let values: Vec<f64> = solution
            .values
            .iter()
            .zip(problem.integer())
            .map(|(&v, &int)| if int { v.round() } else { v })
            .collect();

        self.incumbent = Some(Incumbent { values, objective });
        self.incumbent_updates += 1;
        let pruned = self.queue.prune_by_bound(objective - self.settings.gap_abs_tol);
        self.nodes_pruned += pruned as u64;

        if self.settings.verbose {
            info!(
                "new incumbent: obj={:.6}, pruned {} nodes",
                problem.from_min(objective),
                pruned
            );
        }
    }

    /// Lowest bound over the open nodes and the incumbent.
    fn best_bound(&self) -> f64 {
        let open = self.queue.best_bound();
        match &self.incumbent {
            Some(inc) => open.min(inc.objective),
            None => open,
        }
    }

    fn elapsed_ms(&self) -> u64 {
        self.start_time
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0)
    }

    fn log_progress(&self, problem: &MipProblem) {
        if !self.settings.verbose || self.nodes_explored % self.settings.log_freq.max(1) != 0 {
            return;
        }
        let incumbent = self
            .incumbent
            .as_ref()
            .map(|inc| problem.from_min(inc.objective));
        info!(
            "nodes: {} ({} open) | bound: {:.6} | incumbent: {} | splits: {} | fallbacks: {} | time: {:.1}s",
            self.nodes_explored,
            self.queue.len(),
            problem.from_min(self.queue.best_bound()),
            incumbent.map_or_else(|| "-".to_string(), |v| format!("{:.6}", v)),
            self.split_branchings,
            self.fallback_branchings,
            self.elapsed_ms() as f64 / 1000.0,
        );
    }

    fn finalize(&self, problem: &MipProblem, status: MipStatus) -> MipSolution {
        let (values, objective) = match &self.incumbent {
            Some(inc) => (inc.values.clone(), Some(problem.from_min(inc.objective))),
            None => (Vec::new(), None),
        };
        let best_bound = match status {
            MipStatus::Unbounded => problem.from_min(f64::NEG_INFINITY),
            MipStatus::Infeasible => problem.from_min(f64::INFINITY),
            _ => problem.from_min(self.best_bound()),
        };

        if self.settings.verbose {
            info!(
                "{:?} after {} nodes ({} split, {} variable branchings)",
                status, self.nodes_explored, self.split_branchings, self.fallback_branchings
            );
        }

        MipSolution {
            status,
            values,
            objective,
            best_bound,
            nodes_explored: self.nodes_explored,
            nodes_pruned: self.nodes_pruned,
            split_branchings: self.split_branchings,
            fallback_branchings: self.fallback_branchings,
            incumbent_updates: self.incumbent_updates,
            solve_time_ms: self.elapsed_ms(),
        }
    }
}
