//! Abstraction over the solver backends.
//!
//! `SolverBackend` is the incremental declare/assert/push/pop/check
//! interface the analysis crate drives. Implementations: the native Z3
//! binding (`Z3NativeSolver`, behind the default `z3-native` feature), the
//! subprocess-based [`CliSolver`] (Z3, CVC5) and the in-process
//! [`EvalSolver`].

use minicheck_smtlib::term::Term;

use crate::cli::CliSolver;
use crate::config::{SolverConfig, SolverKind};
use crate::error::SolverError;
use crate::eval::EvalSolver;
use crate::result::SolverResult;
#[cfg(feature = "z3-native")]
use crate::z3_native::Z3NativeSolver;

/// Incremental solver session over integer constants and boolean formulas.
///
/// A model is only meaningful as part of the `Sat` result it was returned
/// with; any later `assert` or `pop` invalidates it.
pub trait SolverBackend {
    /// Human-readable backend name for logs and reports.
    fn name(&self) -> String;

    /// Declare an integer constant. Declaring a live name again is a no-op.
    fn declare_int(&mut self, name: &str) -> Result<(), SolverError>;

    /// Assert a boolean formula in the current scope.
    fn assert(&mut self, term: &Term) -> Result<(), SolverError>;

    /// Open a new assertion scope.
    fn push(&mut self) -> Result<(), SolverError>;

    /// Discard everything since the matching `push`.
    fn pop(&mut self) -> Result<(), SolverError>;

    /// Check satisfiability of all live assertions.
    ///
    /// - `Ok(SolverResult::Sat(model))` if satisfiable
    /// - `Ok(SolverResult::Unsat)` if unsatisfiable
    /// - `Ok(SolverResult::Unknown(reason))` if the backend could not decide
    /// - `Err(SolverError)` if the backend itself failed
    fn check(&mut self) -> Result<SolverResult, SolverError>;

    /// Drop every declaration, assertion and scope.
    fn reset(&mut self);
}

/// Create a solver backend from an explicit configuration.
pub fn create_backend(config: &SolverConfig) -> Result<Box<dyn SolverBackend>, SolverError> {
    match config.kind {
        SolverKind::Builtin => {
            tracing::debug!("Using builtin evaluator backend");
            Ok(Box::new(EvalSolver::new()))
        }
        kind => {
            config.validate()?;
            tracing::debug!(solver = %kind, path = %config.solver_path.display(), "Using subprocess backend");
            Ok(Box::new(CliSolver::new(config.clone())))
        }
    }
}

/// Create a backend of the given kind.
///
/// Z3 goes through the native binding when the `z3-native` feature is
/// enabled; other kinds locate their binary automatically.
pub fn create_backend_for(
    kind: SolverKind,
    timeout_ms: u64,
) -> Result<Box<dyn SolverBackend>, SolverError> {
    #[cfg(feature = "z3-native")]
    if kind == SolverKind::Z3 {
        tracing::debug!("Using Z3 native API backend");
        return Ok(Box::new(Z3NativeSolver::new().with_timeout(timeout_ms)));
    }
    let config = SolverConfig::auto_detect_for(kind)?.with_timeout(timeout_ms);
    create_backend(&config)
}

/// Create the default backend: native Z3 when compiled in, then a Z3
/// binary on the system, then the builtin evaluator.
#[cfg(feature = "z3-native")]
pub fn create_default_backend(timeout_ms: u64) -> Box<dyn SolverBackend> {
    tracing::debug!("Using Z3 native API backend");
    Box::new(Z3NativeSolver::new().with_timeout(timeout_ms))
}

/// Create the default backend: a Z3 binary on the system, otherwise the
/// builtin evaluator. `timeout_ms` only applies to Z3.
#[cfg(not(feature = "z3-native"))]
pub fn create_default_backend(timeout_ms: u64) -> Box<dyn SolverBackend> {
    match SolverConfig::auto_detect() {
        Ok(config) => {
            tracing::debug!(path = %config.solver_path.display(), "Z3 detected");
            Box::new(CliSolver::new(config.with_timeout(timeout_ms)))
        }
        Err(err) => {
            tracing::warn!(%err, "Z3 not available, falling back to the builtin evaluator");
            Box::new(EvalSolver::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn builtin_backend_needs_no_binary() {
        let backend = create_backend(&SolverConfig::builtin()).unwrap();
        assert_eq!(backend.name(), "builtin");
    }

    #[test]
    fn missing_binary_is_reported() {
        let config = SolverConfig::new(SolverKind::Cvc5, PathBuf::from("/nonexistent/cvc5"));
        let err = create_backend(&config).err().unwrap();
        assert_eq!(
            err,
            SolverError::NotFound(SolverKind::Cvc5, PathBuf::from("/nonexistent/cvc5"))
        );
    }

    #[test]
    fn default_backend_always_available() {
        let mut backend = create_default_backend(10_000);
        backend.declare_int("x_0").unwrap();
        backend
            .assert(&Term::var("x_0").equals(Term::IntLit(3)))
            .unwrap();
        let result = backend.check().unwrap();
        assert_eq!(result.model().and_then(|m| m.int_value("x_0")), Some(3));
    }

    #[cfg(feature = "z3-native")]
    #[test]
    fn native_z3_is_preferred() {
        assert_eq!(create_default_backend(10_000).name(), "Z3 (native)");
        let backend = create_backend_for(SolverKind::Z3, 10_000).unwrap();
        assert_eq!(backend.name(), "Z3 (native)");
    }

    #[cfg(not(feature = "z3-native"))]
    #[test]
    fn default_backend_without_native_z3() {
        let name = create_default_backend(10_000).name();
        assert!(name == "Z3" || name == "builtin", "unexpected backend {name}");
    }
}
