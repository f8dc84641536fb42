mod model;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use splitbranch_core::{
    branch_candidates, column_tableau_rows, BranchAndBound, BranchingRule, GmiBranching, LpSnapshot, MipSettings,
    MipSolution, MipStatus, NodeSelection, Tolerances,
};
use splitbranch_lp::Solver;

use crate::model::Model;

#[derive(Parser)]
#[command(name = "splitbranch")]
#[command(about = "Branch-and-bound with GMI split disjunctions", long_about = None)]
struct Cli {
    /// Log debug output (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a JSON model to optimality
    Solve {
        /// The model file
        file: PathBuf,
        /// Branching rule
        #[arg(short, long, value_enum, default_value_t = Rule::Gmi)]
        rule: Rule,
        /// Deepest node that branches on splits
        #[arg(long, default_value_t = 20)]
        max_depth: usize,
        /// Node selection strategy
        #[arg(long, value_enum, default_value_t = Selection::BestBound)]
        select: Selection,
        /// Maximum number of nodes
        #[arg(long, default_value_t = 100_000)]
        max_nodes: u64,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Solve the root LP and print the GMI split of every fractional column
    Split {
        /// The model file
        file: PathBuf,
        /// Print the splits as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check a model file for errors
    Check {
        /// The file to check
        file: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Rule {
    Gmi,
    MostFractional,
}

#[derive(Clone, Copy, ValueEnum)]
enum Selection {
    BestBound,
    DepthFirst,
}

#[derive(Serialize)]
struct SolveReport<'a> {
    #[serde(flatten)]
    solution: &'a MipSolution,
    variables: BTreeMap<&'a str, f64>,
}

#[derive(Serialize)]
struct SplitReport {
    column: String,
    value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    terms: Option<BTreeMap<String, f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rhs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    let tol = Tolerances::default();

    match cli.command {
        Commands::Solve {
            file,
            rule,
            max_depth,
            select,
            max_nodes,
            json,
        } => {
            let model = load(&file, &tol);
            let branching_rule = match rule {
                Rule::Gmi => BranchingRule::Gmi {
                    max_depth: Some(max_depth),
                },
                Rule::MostFractional => BranchingRule::MostFractional,
            };
            let node_selection = match select {
                Selection::BestBound => NodeSelection::BestBound,
                Selection::DepthFirst => NodeSelection::DepthFirst,
            };
            let settings = MipSettings::new()
                .with_branching_rule(branching_rule)
                .with_node_selection(node_selection)
                .with_max_nodes(max_nodes)
                .with_tolerances(tol)
                .with_verbose(!json);

            let solution = match BranchAndBound::new(settings).solve(&model.problem) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("Solve error: {}", e);
                    std::process::exit(1);
                }
            };

            if json {
                let report = SolveReport {
                    solution: &solution,
                    variables: model
                        .names
                        .iter()
                        .map(String::as_str)
                        .zip(solution.values.iter().copied())
                        .collect(),
                };
                match serde_json::to_string_pretty(&report) {
                    Ok(s) => println!("{}", s),
                    Err(e) => {
                        eprintln!("Error writing JSON: {}", e);
                        std::process::exit(1);
                    }
                }
            } else {
                print_solution(&model, &solution);
            }

            if !solution.has_solution() {
                std::process::exit(1);
            }
        }
        Commands::Split { file, json } => {
            let model = load(&file, &tol);

            let lp = model.problem.lp();
            let solution = match Solver::new().solve(lp) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("LP error: {}", e);
                    std::process::exit(1);
                }
            };
            let snapshot = match LpSnapshot::capture(
                lp,
                &solution,
                model.problem.integer(),
                model.problem.priority(),
                &tol,
            ) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("Root LP is not optimal ({:?}): {}", solution.status, e);
                    std::process::exit(1);
                }
            };

            let gmi = GmiBranching::new(tol);
            let rows = column_tableau_rows(&snapshot);
            let reports: Vec<SplitReport> = branch_candidates(&snapshot, &tol)
                .all()
                .iter()
                .map(|candidate| {
                    let column = model.names[candidate.column].clone();
                    match gmi.split_for(&snapshot, &rows, candidate) {
                        Ok(split) => SplitReport {
                            column,
                            value: candidate.value,
                            terms: Some(
                                split
                                    .coefficients
                                    .iter()
                                    .enumerate()
                                    .filter(|&(_, &a)| a != 0.0)
                                    .map(|(j, &a)| (model.names[j].clone(), a))
                                    .collect(),
                            ),
                            rhs: Some(split.rhs),
                            error: None,
                        },
                        Err(e) => SplitReport {
                            column,
                            value: candidate.value,
                            terms: None,
                            rhs: None,
                            error: Some(e.to_string()),
                        },
                    }
                })
                .collect();

            if json {
                match serde_json::to_string_pretty(&reports) {
                    Ok(s) => println!("{}", s),
                    Err(e) => {
                        eprintln!("Error writing JSON: {}", e);
                        std::process::exit(1);
                    }
                }
                return;
            }

            println!("Root LP objective: {:.6}", solution.objective_value);
            if reports.is_empty() {
                println!("No fractional integer columns.");
                return;
            }
            for report in &reports {
                match (&report.terms, report.rhs, &report.error) {
                    (Some(terms), Some(rhs), _) => {
                        let lhs = format_terms(terms);
                        println!("{} = {:.6}:", report.column, report.value);
                        println!("  {} <= {}  or  {} >= {}", lhs, rhs, lhs, rhs + 1.0);
                    }
                    (_, _, error) => {
                        println!("{} = {:.6}:", report.column, report.value);
                        println!("  no split: {}", error.as_deref().unwrap_or("unknown"));
                    }
                }
            }
        }
        Commands::Check { file } => {
            let source = read(&file);
            match Model::parse(&source, &tol) {
                Ok(model) => {
                    println!("✓ {} is valid", file.display());
                    println!("  {} variables ({} integer)", model.names.len(), model.problem.num_integer());
                    println!("  {} constraints", model.constraint_names.len());
                }
                Err(e) => {
                    eprintln!("✗ {} has errors:", file.display());
                    eprintln!("  {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}

fn read(file: &Path) -> String {
    match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file: {}", e);
            std::process::exit(1);
        }
    }
}

fn load(file: &Path, tol: &Tolerances) -> Model {
    match Model::parse(&read(file), tol) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Model error: {}", e);
            std::process::exit(1);
        }
    }
}

fn format_terms(terms: &BTreeMap<String, f64>) -> String {
    let mut out = String::new();
    for (name, &a) in terms {
        let sign = if a < 0.0 { "-" } else { "+" };
        if out.is_empty() {
            if a < 0.0 {
                out.push('-');
            }
        } else {
            out.push_str(&format!(" {} ", sign));
        }
        if a.abs() != 1.0 {
            out.push_str(&format!("{} ", a.abs()));
        }
        out.push_str(name);
    }
    out
}

fn print_solution(model: &Model, solution: &MipSolution) {
    match solution.status {
        MipStatus::Optimal => println!("Status: OPTIMAL"),
        MipStatus::Infeasible => {
            println!("Status: INFEASIBLE");
            println!("No integer solution satisfies all constraints.");
        }
        MipStatus::Unbounded => {
            println!("Status: UNBOUNDED");
            println!("The LP relaxation has no finite optimum.");
        }
        MipStatus::NodeLimit => println!("Status: NODE LIMIT"),
    }

    if let Some(objective) = solution.objective {
        println!("Objective: {:.6}", objective);
        println!("Best bound: {:.6}", solution.best_bound);
        println!("Gap: {:.4}%", 100.0 * solution.gap());
        println!();
        println!("Variables:");
        for (name, value) in model.names.iter().zip(&solution.values) {
            if value.abs() > 1e-9 {
                println!("  {:20} {:12.6}", name, value);
            }
        }
    }

    println!();
    println!(
        "Nodes: {} ({} pruned) | split branchings: {} | variable branchings: {} | {} ms",
        solution.nodes_explored,
        solution.nodes_pruned,
        solution.split_branchings,
        solution.fallback_branchings,
        solution.solve_time_ms
    );
}
