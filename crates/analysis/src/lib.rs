//! # minicheck-analysis
//!
//! Bounded verification and equivalence checking for a small imperative
//! language with assignment, `if`/`else`, `while`, `for` and `assert`.
//!
//! The pipeline is strictly sequential:
//!
//! 1. [`parser::parse`] turns program text into a [`Stmt`] tree.
//! 2. [`SsaConverter`] rewrites the tree into an [`SsaProgram`], unrolling
//!    every loop a fixed number of times.
//! 3. [`ConstraintBuilder`] encodes the SSA program as integer formulas.
//! 4. A [`minicheck_solver::SolverBackend`] decides them.
//!
//! Loops are under-approximated: executions that need more iterations than
//! the unroll depth are excluded, never proven.
//!
//! ## Usage
//!
//! ```
//! use minicheck_analysis::{AnalysisConfig, Verdict, verify_source};
//! use minicheck_solver::EvalSolver;
//!
//! let source = "x := 0; while (x < 4) { x := x + 1; } assert(x == 4);";
//! let config = AnalysisConfig::default().with_unroll_depth(4);
//! let report = verify_source(source, &config, &mut EvalSolver::new()).unwrap();
//! assert_eq!(report.verdict, Verdict::Satisfiable);
//! assert_eq!(report.examples.models[0].get("x_4"), Some(4));
//! ```

pub mod ast;
pub mod branch;
pub mod config;
pub mod encode;
pub mod equivalence;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod ssa;
pub mod verify;

pub use ast::{Assign, BinOp, CmpOp, Cond, Expr, Stmt, print_program};
pub use branch::BranchPolicy;
pub use config::{AnalysisConfig, MAX_UNROLL_DEPTH};
pub use encode::{ConstraintBuilder, Example, ExampleSet, StopReason};
pub use equivalence::{
    Counterexample, EquivalenceOutcome, EquivalenceReport, OutputPair, check_equivalence,
};
pub use error::{AnalysisError, ParseError};
pub use parser::parse;
pub use ssa::{Namespace, SsaConverter, SsaInstruction, SsaProgram, SsaVar, VersionTable};
pub use verify::{
    EquivalenceRun, ProgramAnalysis, VerificationReport, Verdict, check_equivalence_programs,
    check_equivalence_source, parse_output_vars, verify_program, verify_source,
};
