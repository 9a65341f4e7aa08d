/// Structured JSON output for `verify` and `equiv`.
///
/// Selected with `--output-format json`. The document goes to stdout; logs
/// and diagnostics stay on stderr.
use minicheck_analysis::{
    AnalysisError, EquivalenceRun, Example, StopReason, Verdict, VerificationReport,
};
use serde::{Deserialize, Serialize};

/// Result of `minicheck verify`.
#[derive(Serialize, Deserialize, Debug)]
pub struct JsonVerification {
    pub file: String,
    /// "satisfiable" or "unsatisfiable"
    pub verdict: String,
    pub policy: String,
    pub unroll_depth: usize,
    pub solver: String,
    pub examples: Vec<Vec<JsonAssignment>>,
    /// Why example collection ended: "limit", "exhausted" or "unknown: <reason>"
    pub stop: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssa: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smt: Option<String>,
}

/// Result of `minicheck equiv`.
#[derive(Serialize, Deserialize, Debug)]
pub struct JsonEquivalence {
    pub first: String,
    pub second: String,
    /// "equivalent", "differ", "no_comparable_outputs" or "inconsistent"
    pub outcome: String,
    pub equivalent: bool,
    pub compared: Vec<JsonOutputPair>,
    pub unresolved: Vec<String>,
    pub counterexamples: Vec<Vec<JsonAssignment>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssa: Option<[Vec<String>; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smt: Option<[String; 2]>,
}

/// An output variable and the versions compared for it.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct JsonOutputPair {
    pub name: String,
    pub first: String,
    pub second: String,
}

/// Variable assignment in a model.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct JsonAssignment {
    pub variable: String,
    /// Decimal text; values may exceed the JSON safe-integer range.
    pub value: String,
}

/// A failed run.
#[derive(Serialize, Deserialize, Debug)]
pub struct JsonError {
    /// "syntax", "undefined_variable", "encoding", "solver_unknown", "solver",
    /// "config", "io" or "output"
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
}

fn stop_text(stop: &StopReason) -> String {
    match stop {
        StopReason::Limit => "limit".to_string(),
        StopReason::Exhausted => "exhausted".to_string(),
        StopReason::Unknown(reason) => format!("unknown: {reason}"),
    }
}

fn assignments(example: &Example) -> Vec<JsonAssignment> {
    example
        .values
        .iter()
        .map(|(variable, value)| JsonAssignment {
            variable: variable.clone(),
            value: value.to_string(),
        })
        .collect()
}

impl JsonVerification {
    pub fn from_report(
        file: &str,
        report: &VerificationReport,
        solver: &str,
        unroll_depth: usize,
        detail: bool,
    ) -> Self {
        let verdict = match report.verdict {
            Verdict::Satisfiable => "satisfiable",
            Verdict::Unsatisfiable => "unsatisfiable",
        };
        Self {
            file: file.to_string(),
            verdict: verdict.to_string(),
            policy: report.program.ssa.policy.to_string(),
            unroll_depth,
            solver: solver.to_string(),
            examples: report.examples.models.iter().map(assignments).collect(),
            stop: stop_text(&report.examples.stop),
            ssa: detail.then(|| report.program.ssa.lines()),
            smt: detail.then(|| report.program.smt.to_string()),
        }
    }
}

impl JsonEquivalence {
    pub fn from_run(first: &str, second: &str, run: &EquivalenceRun, detail: bool) -> Self {
        let report = &run.report;
        Self {
            first: first.to_string(),
            second: second.to_string(),
            outcome: report.outcome.key().to_string(),
            equivalent: report.is_equivalent(),
            compared: report
                .compared
                .iter()
                .map(|pair| JsonOutputPair {
                    name: pair.name.clone(),
                    first: pair.first.symbol(),
                    second: pair.second.symbol(),
                })
                .collect(),
            unresolved: report.unresolved.clone(),
            counterexamples: report
                .counterexamples
                .iter()
                .map(|cex| {
                    cex.values
                        .iter()
                        .map(|(variable, value)| JsonAssignment {
                            variable: variable.clone(),
                            value: value.to_string(),
                        })
                        .collect()
                })
                .collect(),
            stop: report.stop.as_ref().map(stop_text),
            ssa: detail.then(|| [run.first.ssa.lines(), run.second.ssa.lines()]),
            smt: detail.then(|| [run.first.smt.to_string(), run.second.smt.to_string()]),
        }
    }
}

impl JsonError {
    pub fn from_analysis(err: &AnalysisError) -> Self {
        let (kind, line, column) = match err {
            AnalysisError::Syntax(e) => ("syntax", Some(e.line), Some(e.column)),
            AnalysisError::UndefinedVariable { .. } => ("undefined_variable", None, None),
            AnalysisError::Encoding(_) => ("encoding", None, None),
            AnalysisError::SolverUnknown(_) => ("solver_unknown", None, None),
            AnalysisError::Solver(_) => ("solver", None, None),
            AnalysisError::InvalidConfig(_) => ("config", None, None),
        };
        Self {
            kind: kind.to_string(),
            message: err.to_string(),
            line,
            column,
        }
    }

    pub fn plain(kind: &str, message: String) -> Self {
        Self {
            kind: kind.to_string(),
            message,
            line: None,
            column: None,
        }
    }
}

/// Serialize `value` as pretty JSON.
pub fn to_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}
