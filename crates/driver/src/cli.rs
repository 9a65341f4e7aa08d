//! Command-line definitions for the `minicheck` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use minicheck_analysis::{AnalysisConfig, BranchPolicy, MAX_UNROLL_DEPTH};
use minicheck_solver::SolverKind;

#[derive(Parser, Debug)]
#[command(name = "minicheck")]
#[command(version)]
#[command(about = "Bounded verification and equivalence checking for a small imperative language")]
#[command(
    long_about = "Bounded verification and equivalence checking for a small imperative language.\n\n\
    Programs are converted to SSA form with every loop unrolled a fixed number of times,\n\
    encoded as integer constraints and handed to an SMT solver. Executions needing more\n\
    iterations than the unroll depth are not considered."
)]
pub struct Cli {
    /// Log pipeline details (same as MINICHECK_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse a program and print it back in canonical form
    Parse {
        /// Program file
        file: PathBuf,
    },
    /// Print the SSA form of a program
    Ssa {
        /// Program file
        file: PathBuf,
        #[command(flatten)]
        analysis: AnalysisArgs,
    },
    /// Search for inputs under which every assertion holds
    Verify {
        /// Program file
        file: PathBuf,
        #[command(flatten)]
        analysis: AnalysisArgs,
        #[command(flatten)]
        solver: SolverArgs,
        #[command(flatten)]
        report: ReportArgs,
        /// Satisfying assignments to report
        #[arg(long, default_value_t = 2)]
        examples: usize,
    },
    /// Check whether two programs agree on the given output variables
    Equiv {
        /// First program file
        first: PathBuf,
        /// Second program file
        second: PathBuf,
        /// Comma-separated output variables, e.g. `x,y`
        #[arg(long)]
        outputs: String,
        #[command(flatten)]
        analysis: AnalysisArgs,
        #[command(flatten)]
        solver: SolverArgs,
        #[command(flatten)]
        report: ReportArgs,
        /// Counterexamples to report when the programs differ
        #[arg(long, default_value_t = 3)]
        counterexamples: usize,
    },
}

#[derive(Args, Debug, Clone)]
pub struct AnalysisArgs {
    /// Loop unroll depth (1..=10)
    #[arg(long, env = "MINICHECK_UNROLL", default_value_t = 3)]
    pub unroll: usize,

    /// Branch encoding: unconditional | guarded
    #[arg(long, default_value_t = BranchPolicy::Unconditional)]
    pub policy: BranchPolicy,
}

impl AnalysisArgs {
    pub fn config(&self) -> AnalysisConfig {
        AnalysisConfig::default()
            .with_unroll_depth(self.unroll)
            .with_branch_policy(self.policy)
    }
}

#[derive(Args, Debug, Clone)]
pub struct SolverArgs {
    /// Solver backend: z3 | cvc5 | builtin (default: native z3, else a z3 binary, else builtin)
    #[arg(long, env = "MINICHECK_SOLVER")]
    pub solver: Option<SolverKind>,

    /// Solver timeout in milliseconds (0 = none)
    #[arg(long, env = "MINICHECK_TIMEOUT_MS", default_value_t = 10_000)]
    pub timeout: u64,
}

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    /// Also print the SSA form
    #[arg(long)]
    pub show_ssa: bool,

    /// Also print the SMT-LIB constraints
    #[arg(long)]
    pub show_smt: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output_format: OutputFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Help line shown for out-of-range unroll depths.
pub fn unroll_hint() -> String {
    format!("--unroll accepts 1 to {MAX_UNROLL_DEPTH}")
}
