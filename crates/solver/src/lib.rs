//! # minicheck-solver
//!
//! Incremental SMT solver interface for the minicheck analyses.
//!
//! [`SolverBackend`] is a declare/assert/push/pop/check session over integer
//! constants. `Z3NativeSolver` calls the Z3 library directly (default
//! `z3-native` feature), [`CliSolver`] pipes SMT-LIB2 text to an external Z3
//! or CVC5 process, and [`EvalSolver`] decides the formulas in-process
//! without any solver at all.
//!
//! ## Usage
//!
//! ```
//! use minicheck_smtlib::Term;
//! use minicheck_solver::{EvalSolver, SolverBackend, SolverResult};
//!
//! let mut solver = EvalSolver::new();
//! solver.declare_int("x_0").unwrap();
//! solver.assert(&Term::var("x_0").equals(Term::IntLit(5))).unwrap();
//!
//! match solver.check().unwrap() {
//!     SolverResult::Sat(model) => println!("SAT: {model:?}"),
//!     SolverResult::Unsat => println!("UNSAT"),
//!     SolverResult::Unknown(reason) => println!("Unknown: {reason}"),
//! }
//! ```

pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod eval;
pub mod model;
mod parser;
pub mod result;
mod stack;
#[cfg(feature = "z3-native")]
pub mod z3_native;

pub use backend::{SolverBackend, create_backend, create_backend_for, create_default_backend};
pub use cli::CliSolver;
pub use config::{SolverConfig, SolverKind};
pub use error::SolverError;
pub use eval::EvalSolver;
pub use model::Model;
pub use result::SolverResult;
#[cfg(feature = "z3-native")]
pub use z3_native::Z3NativeSolver;
