use std::fmt;
use std::path::PathBuf;

use crate::config::SolverKind;

/// Failure to obtain a verdict from a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolverError {
    /// No executable for the kind at this path.
    NotFound(SolverKind, PathBuf),
    /// The process could not be spawned, fed, or reported an `(error ...)`.
    ProcessError(String),
    /// Output that is neither a verdict nor a readable model.
    ParseError(String),
    Timeout,
    /// A term or command the backend does not implement.
    Unsupported(String),
    ScopeUnderflow,
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverError::NotFound(kind, path) => {
                write!(f, "{kind} not found (looked for {})", path.display())
            }
            SolverError::ProcessError(msg) => write!(f, "solver process failed: {msg}"),
            SolverError::ParseError(msg) => write!(f, "unreadable solver output: {msg}"),
            SolverError::Timeout => f.write_str("solver ran out of time"),
            SolverError::Unsupported(what) => write!(f, "backend cannot handle {what}"),
            SolverError::ScopeUnderflow => f.write_str("pop without matching push"),
        }
    }
}

impl std::error::Error for SolverError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_kind_and_path() {
        let err = SolverError::NotFound(SolverKind::Cvc5, PathBuf::from("/no/cvc5"));
        assert_eq!(err.to_string(), "CVC5 not found (looked for /no/cvc5)");
    }

    #[test]
    fn messages_carry_detail() {
        let rendered: Vec<String> = [
            SolverError::ProcessError("broken pipe".into()),
            SolverError::ParseError("`segfault`".into()),
            SolverError::Unsupported("distinct".into()),
            SolverError::Timeout,
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        assert_eq!(
            rendered,
            [
                "solver process failed: broken pipe",
                "unreadable solver output: `segfault`",
                "backend cannot handle distinct",
                "solver ran out of time",
            ]
        );
    }

    #[test]
    fn equality_compares_payloads() {
        assert_ne!(
            SolverError::NotFound(SolverKind::Z3, PathBuf::from("z3")),
            SolverError::NotFound(SolverKind::Cvc5, PathBuf::from("z3"))
        );
        assert_ne!(SolverError::Timeout, SolverError::ScopeUnderflow);
    }
}
