//! Error taxonomy for the analysis pipeline.

use std::fmt;
use std::ops::Range;

use minicheck_solver::SolverError;

/// Malformed program text.
///
/// Carries the byte span of the offending token, its 1-based line and
/// column, and the source fragment itself so callers can point at it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub span: Range<usize>,
    pub line: usize,
    pub column: usize,
    pub fragment: String,
}

impl ParseError {
    /// Build an error for `span` in `source`, computing line, column and fragment.
    pub fn at(source: &str, span: Range<usize>, message: impl Into<String>) -> Self {
        let start = span.start.min(source.len());
        let end = span.end.clamp(start, source.len());
        let before = &source[..start];
        let line = before.matches('\n').count() + 1;
        let column = before
            .rfind('\n')
            .map_or(before.chars().count(), |nl| before[nl + 1..].chars().count())
            + 1;
        let fragment = if start == end {
            "end of input".to_string()
        } else {
            source[start..end].to_string()
        };
        Self {
            message: message.into(),
            span: start..end,
            line,
            column,
            fragment,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "syntax error at {}:{}: {} (near `{}`)",
            self.line, self.column, self.message, self.fragment
        )
    }
}

impl std::error::Error for ParseError {}

/// Every way an analysis run can fail.
///
/// Degenerate equivalence outcomes are not errors; they are reported through
/// [`crate::equivalence::EquivalenceOutcome`].
#[derive(Debug, PartialEq)]
pub enum AnalysisError {
    /// Program text could not be parsed.
    Syntax(ParseError),
    /// An expression or condition reads a name that was never assigned.
    UndefinedVariable { name: String },
    /// SSA input the constraint builder cannot translate.
    Encoding(String),
    /// The backend answered neither sat nor unsat.
    SolverUnknown(String),
    /// The backend itself failed.
    Solver(SolverError),
    /// Rejected configuration value.
    InvalidConfig(String),
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::Syntax(err) => write!(f, "{err}"),
            AnalysisError::UndefinedVariable { name } => {
                write!(f, "variable `{name}` is used before it is assigned")
            }
            AnalysisError::Encoding(msg) => write!(f, "encoding error: {msg}"),
            AnalysisError::SolverUnknown(reason) => write!(f, "solver returned unknown: {reason}"),
            AnalysisError::Solver(err) => write!(f, "{err}"),
            AnalysisError::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for AnalysisError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AnalysisError::Syntax(err) => Some(err),
            AnalysisError::Solver(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ParseError> for AnalysisError {
    fn from(err: ParseError) -> Self {
        AnalysisError::Syntax(err)
    }
}

impl From<SolverError> for AnalysisError {
    fn from(err: SolverError) -> Self {
        AnalysisError::Solver(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_is_one_based() {
        let src = "a := 1;\nb := ;";
        let err = ParseError::at(src, 13..14, "expected expression");
        assert_eq!(err.line, 2);
        assert_eq!(err.column, 6);
        assert_eq!(err.fragment, ";");
    }

    #[test]
    fn empty_span_at_end_names_end_of_input() {
        let src = "x := 1";
        let err = ParseError::at(src, 6..6, "expected `;`");
        assert_eq!(err.fragment, "end of input");
        assert_eq!(err.column, 7);
        assert_eq!(
            err.to_string(),
            "syntax error at 1:7: expected `;` (near `end of input`)"
        );
    }

    #[test]
    fn solver_errors_convert() {
        let err: AnalysisError = SolverError::ScopeUnderflow.into();
        assert_eq!(err, AnalysisError::Solver(SolverError::ScopeUnderflow));
        assert_eq!(err.to_string(), "pop without matching push");
    }

    #[test]
    fn undefined_variable_message() {
        let err = AnalysisError::UndefinedVariable {
            name: "z".to_string(),
        };
        assert_eq!(err.to_string(), "variable `z` is used before it is assigned");
    }
}
