//! End-to-end entry points: program text in, verdicts and models out.

use minicheck_smtlib::script::Script;
use minicheck_solver::SolverBackend;

use crate::ast::Stmt;
use crate::config::AnalysisConfig;
use crate::encode::{ConstraintBuilder, ExampleSet};
use crate::equivalence::{EquivalenceReport, check_equivalence};
use crate::error::AnalysisError;
use crate::parser::parse;
use crate::ssa::{Namespace, SsaConverter, SsaProgram};

/// Every intermediate form of one program.
#[derive(Debug, Clone)]
pub struct ProgramAnalysis {
    pub statements: Vec<Stmt>,
    pub ssa: SsaProgram,
    /// Declarations and constraints as sent to the solver.
    pub smt: Script,
}

impl ProgramAnalysis {
    /// Convert and encode `statements` with a fresh converter and builder.
    pub fn from_statements(
        statements: Vec<Stmt>,
        config: &AnalysisConfig,
        namespace: Namespace,
    ) -> Result<Self, AnalysisError> {
        let mut converter = SsaConverter::new(config.branch_policy);
        let ssa = converter
            .convert(&statements, config.unroll_depth)?
            .in_namespace(namespace);
        let mut builder = ConstraintBuilder::new();
        builder.build(&ssa)?;
        Ok(Self {
            statements,
            ssa,
            smt: builder.script(),
        })
    }

    pub fn from_source(
        source: &str,
        config: &AnalysisConfig,
        namespace: Namespace,
    ) -> Result<Self, AnalysisError> {
        Self::from_statements(parse(source)?, config, namespace)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Some input makes every assertion hold.
    Satisfiable,
    Unsatisfiable,
}

#[derive(Debug, Clone)]
pub struct VerificationReport {
    pub program: ProgramAnalysis,
    pub verdict: Verdict,
    pub examples: ExampleSet,
}

/// Look for inputs under which every assertion of the program holds.
pub fn verify_program(
    statements: Vec<Stmt>,
    config: &AnalysisConfig,
    backend: &mut dyn SolverBackend,
) -> Result<VerificationReport, AnalysisError> {
    config.validate()?;
    let program = ProgramAnalysis::from_statements(statements, config, Namespace::First)?;
    let examples = ConstraintBuilder::new().get_satisfying_examples(
        &program.ssa,
        config.max_examples,
        backend,
    )?;
    let verdict = if examples.is_empty() {
        Verdict::Unsatisfiable
    } else {
        Verdict::Satisfiable
    };
    tracing::info!(?verdict, backend = %backend.name(), "Verification finished");
    Ok(VerificationReport {
        program,
        verdict,
        examples,
    })
}

pub fn verify_source(
    source: &str,
    config: &AnalysisConfig,
    backend: &mut dyn SolverBackend,
) -> Result<VerificationReport, AnalysisError> {
    verify_program(parse(source)?, config, backend)
}

#[derive(Debug, Clone)]
pub struct EquivalenceRun {
    pub first: ProgramAnalysis,
    /// The second program, already renamed into [`Namespace::Second`].
    pub second: ProgramAnalysis,
    pub report: EquivalenceReport,
}

/// Compare two parsed programs, each converted by its own converter.
pub fn check_equivalence_programs(
    first: Vec<Stmt>,
    second: Vec<Stmt>,
    outputs: &[String],
    config: &AnalysisConfig,
    backend: &mut dyn SolverBackend,
) -> Result<EquivalenceRun, AnalysisError> {
    config.validate()?;
    let first = ProgramAnalysis::from_statements(first, config, Namespace::First)?;
    let second = ProgramAnalysis::from_statements(second, config, Namespace::Second)?;
    let report = check_equivalence(
        &first.ssa,
        &second.ssa,
        outputs,
        config.max_counterexamples,
        backend,
    )?;
    Ok(EquivalenceRun {
        first,
        second,
        report,
    })
}

pub fn check_equivalence_source(
    first: &str,
    second: &str,
    outputs: &[String],
    config: &AnalysisConfig,
    backend: &mut dyn SolverBackend,
) -> Result<EquivalenceRun, AnalysisError> {
    check_equivalence_programs(parse(first)?, parse(second)?, outputs, config, backend)
}

/// Split a comma-separated output list, trimming names and dropping empty
/// and repeated entries.
pub fn parse_output_vars(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in text.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}
