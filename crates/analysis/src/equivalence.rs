//! Equivalence of two programs on a set of output variables.
//!
//! The programs are encoded independently, program B with every symbol moved
//! into [`Namespace::Second`], and then checked together in one solver
//! context: if some input makes a compared output differ, that input is a
//! counterexample.

use std::collections::BTreeMap;
use std::fmt;

use minicheck_smtlib::term::Term;
use minicheck_solver::{SolverBackend, SolverResult};

use crate::encode::{ConstraintBuilder, StopReason, enumerate_models};
use crate::error::AnalysisError;
use crate::ssa::{Namespace, SsaProgram, SsaVar};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EquivalenceOutcome {
    /// Every compared output agrees for every input consistent with both programs.
    Equivalent,
    /// Some input makes at least one compared output differ.
    Differ,
    /// No requested output is defined in both programs.
    NoComparableOutputs,
    /// The two constraint sets admit no common input.
    Inconsistent,
}

impl EquivalenceOutcome {
    pub fn is_equivalent(self) -> bool {
        matches!(self, EquivalenceOutcome::Equivalent)
    }

    /// Stable snake_case identifier for machine-readable output.
    pub fn key(self) -> &'static str {
        match self {
            EquivalenceOutcome::Equivalent => "equivalent",
            EquivalenceOutcome::Differ => "differ",
            EquivalenceOutcome::NoComparableOutputs => "no_comparable_outputs",
            EquivalenceOutcome::Inconsistent => "inconsistent",
        }
    }
}

impl fmt::Display for EquivalenceOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EquivalenceOutcome::Equivalent => write!(f, "equivalent"),
            EquivalenceOutcome::Differ => write!(f, "not equivalent"),
            EquivalenceOutcome::NoComparableOutputs => {
                write!(f, "not equivalent (no comparable outputs)")
            }
            EquivalenceOutcome::Inconsistent => {
                write!(f, "not equivalent (programs admit no common input)")
            }
        }
    }
}

/// An output variable resolved in both programs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPair {
    pub name: String,
    pub first: SsaVar,
    pub second: SsaVar,
}

/// Values witnessing a difference, keyed `"<base> (prog1)"` /
/// `"<base> (prog2)"`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Counterexample {
    pub values: BTreeMap<String, i128>,
}

impl Counterexample {
    pub fn get(&self, base: &str, namespace: Namespace) -> Option<i128> {
        self.values.get(&display_key(base, namespace)).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquivalenceReport {
    pub outcome: EquivalenceOutcome,
    pub compared: Vec<OutputPair>,
    /// Requested outputs missing from at least one program.
    pub unresolved: Vec<String>,
    pub counterexamples: Vec<Counterexample>,
    /// Why counterexample collection ended, when it ran.
    pub stop: Option<StopReason>,
}

impl EquivalenceReport {
    pub fn is_equivalent(&self) -> bool {
        self.outcome.is_equivalent()
    }

    fn without_witnesses(
        outcome: EquivalenceOutcome,
        compared: Vec<OutputPair>,
        unresolved: Vec<String>,
    ) -> Self {
        Self {
            outcome,
            compared,
            unresolved,
            counterexamples: Vec::new(),
            stop: None,
        }
    }
}

fn display_key(base: &str, namespace: Namespace) -> String {
    format!("{base} ({})", namespace.label())
}

/// The version of `base` compared as an output: the highest defined
/// version, falling back to the version current at the end of conversion.
fn resolve_output<'p>(program: &'p SsaProgram, base: &str) -> Option<&'p SsaVar> {
    program
        .highest_version(base)
        .or_else(|| program.final_versions.get(base))
}

/// Check whether `first` and `second` agree on every name in `outputs`.
///
/// The backend is used inside `push`/`pop` scopes and left as it was.
pub fn check_equivalence(
    first: &SsaProgram,
    second: &SsaProgram,
    outputs: &[String],
    max_counterexamples: usize,
    backend: &mut dyn SolverBackend,
) -> Result<EquivalenceReport, AnalysisError> {
    let first = first.in_namespace(Namespace::First);
    let second = second.in_namespace(Namespace::Second);

    let mut first_builder = ConstraintBuilder::new();
    first_builder.build(&first)?;
    let mut second_builder = ConstraintBuilder::new();
    second_builder.build(&second)?;

    let mut compared = Vec::new();
    let mut unresolved = Vec::new();
    for name in outputs {
        if compared.iter().any(|p: &OutputPair| &p.name == name) || unresolved.contains(name) {
            continue;
        }
        match (resolve_output(&first, name), resolve_output(&second, name)) {
            (Some(a), Some(b)) => compared.push(OutputPair {
                name: name.clone(),
                first: a.clone(),
                second: b.clone(),
            }),
            _ => unresolved.push(name.clone()),
        }
    }
    if !unresolved.is_empty() {
        tracing::warn!(?unresolved, "Outputs missing from at least one program");
    }
    if compared.is_empty() {
        return Ok(EquivalenceReport::without_witnesses(
            EquivalenceOutcome::NoComparableOutputs,
            compared,
            unresolved,
        ));
    }

    // Every program variable, reported under its base name.
    let mut display: Vec<(String, String)> = Vec::new();
    for program in [&first, &second] {
        for base in program.bases() {
            if let Some(var) = program.highest_version(base) {
                display.push((display_key(base, program.namespace), var.symbol()));
            }
        }
    }

    backend.push()?;
    let result = differing_inputs(
        backend,
        [&first_builder, &second_builder],
        &compared,
        &display,
        max_counterexamples,
    );
    let popped = backend.pop();
    let (outcome, counterexamples, stop) = result?;
    popped?;

    tracing::info!(
        %outcome,
        outputs = compared.len(),
        counterexamples = counterexamples.len(),
        "Equivalence check finished"
    );
    Ok(EquivalenceReport {
        outcome,
        compared,
        unresolved,
        counterexamples,
        stop,
    })
}

type Witnesses = (EquivalenceOutcome, Vec<Counterexample>, Option<StopReason>);

fn differing_inputs(
    backend: &mut dyn SolverBackend,
    builders: [&ConstraintBuilder; 2],
    compared: &[OutputPair],
    display: &[(String, String)],
    limit: usize,
) -> Result<Witnesses, AnalysisError> {
    for builder in builders {
        builder.load_into(backend)?;
    }
    match backend.check()? {
        SolverResult::Unsat => return Ok((EquivalenceOutcome::Inconsistent, Vec::new(), None)),
        SolverResult::Unknown(reason) => return Err(AnalysisError::SolverUnknown(reason)),
        SolverResult::Sat(_) => {}
    }

    let outputs_agree: Vec<Term> = compared
        .iter()
        .map(|p| Term::var(p.first.symbol()).equals(Term::var(p.second.symbol())))
        .collect();
    // Block on every constant of both programs, so each counterexample is a
    // distinct model and not just a distinct set of displayed values.
    let symbols: Vec<String> = builders
        .iter()
        .flat_map(|b| b.declared().iter().cloned())
        .collect();
    backend.push()?;
    let found = backend
        .assert(&Term::And(outputs_agree).negate())
        .map_err(AnalysisError::from)
        .and_then(|()| enumerate_models(backend, &symbols, limit));
    let popped = backend.pop();
    let found = found?;
    popped?;

    if found.is_empty() {
        return Ok((EquivalenceOutcome::Equivalent, Vec::new(), Some(found.stop)));
    }
    let counterexamples = found
        .models
        .iter()
        .map(|example| Counterexample {
            values: display
                .iter()
                .filter_map(|(key, symbol)| example.get(symbol).map(|v| (key.clone(), v)))
                .collect(),
        })
        .collect();
    Ok((EquivalenceOutcome::Differ, counterexamples, Some(found.stop)))
}
