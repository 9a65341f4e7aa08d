//! End-to-end scenarios: program text through parsing, SSA, encoding and
//! the solver.
//!
//! Everything runs against the builtin evaluator so the suite is hermetic.
//! The `*_with_external_solvers` tests repeat the scenarios on Z3 (native
//! binding or binary) and on CVC5 when its binary can be found.

use minicheck_analysis::{
    AnalysisConfig, AnalysisError, BranchPolicy, EquivalenceOutcome, Namespace, Verdict,
    check_equivalence_source, parse_output_vars, verify_source,
};
use minicheck_solver::{EvalSolver, SolverBackend, SolverKind, create_backend_for};

// ---- Helpers ----

const POLICIES: [BranchPolicy; 2] = [BranchPolicy::Unconditional, BranchPolicy::Guarded];

fn config(policy: BranchPolicy) -> AnalysisConfig {
    AnalysisConfig::default().with_branch_policy(policy)
}

fn external_backends() -> Vec<Box<dyn SolverBackend>> {
    let mut out: Vec<Box<dyn SolverBackend>> = Vec::new();
    for kind in [SolverKind::Z3, SolverKind::Cvc5] {
        match create_backend_for(kind, 10_000) {
            Ok(backend) => out.push(backend),
            Err(err) => eprintln!("skipping {kind}: {err}"),
        }
    }
    out
}

const COMMUTED_A: &str = "a := 5; b := 10; c := a + b;";
const COMMUTED_B: &str = "a := 5; b := 10; c := b + a;";
const THRESHOLD_A: &str = "x := 4; if (x > 3) { y := 10; } else { y := 0; }";
const THRESHOLD_B: &str = "x := 4; if (x > 4) { y := 10; } else { y := 0; }";
const COUNTER: &str = "x := 0; while (x < 4) { x := x + 1; } assert(x == 4);";

// ============================================================
// Equivalence
// ============================================================

#[test]
fn commuted_addition_is_equivalent() {
    for policy in POLICIES {
        let run = check_equivalence_source(
            COMMUTED_A,
            COMMUTED_B,
            &parse_output_vars("c"),
            &config(policy),
            &mut EvalSolver::new(),
        )
        .unwrap();
        assert_eq!(run.report.outcome, EquivalenceOutcome::Equivalent, "{policy}");
        assert!(run.report.counterexamples.is_empty());
        assert_eq!(run.report.compared.len(), 1);
        assert_eq!(run.report.compared[0].first.symbol(), "c_0");
        assert_eq!(run.report.compared[0].second.symbol(), "c_0@2");
    }
}

#[test]
fn threshold_change_differs_when_branches_are_guarded() {
    let run = check_equivalence_source(
        THRESHOLD_A,
        THRESHOLD_B,
        &parse_output_vars("y"),
        &config(BranchPolicy::Guarded),
        &mut EvalSolver::new(),
    )
    .unwrap();
    assert_eq!(run.report.outcome, EquivalenceOutcome::Differ);
    assert!(!run.report.counterexamples.is_empty());
    let cex = &run.report.counterexamples[0];
    assert_eq!(cex.get("x", Namespace::First), Some(4));
    assert_eq!(cex.get("x", Namespace::Second), Some(4));
    assert_eq!(cex.get("y", Namespace::First), Some(10));
    assert_eq!(cex.get("y", Namespace::Second), Some(0));
}

#[test]
fn threshold_change_is_inconsistent_when_guards_are_asserted() {
    // Both branch conditions become facts, so neither program has a model.
    let run = check_equivalence_source(
        THRESHOLD_A,
        THRESHOLD_B,
        &parse_output_vars("y"),
        &config(BranchPolicy::Unconditional),
        &mut EvalSolver::new(),
    )
    .unwrap();
    assert_eq!(run.report.outcome, EquivalenceOutcome::Inconsistent);
    assert!(!run.report.is_equivalent());
    assert!(run.report.counterexamples.is_empty());
}

#[test]
fn unassigned_input_is_rejected() {
    let run = check_equivalence_source(
        "n := n0; r := n * 2;",
        "n := n0; r := n + 2;",
        &parse_output_vars("r"),
        &config(BranchPolicy::Guarded),
        &mut EvalSolver::new(),
    );
    assert!(matches!(
        run,
        Err(AnalysisError::UndefinedVariable { name }) if name == "n0"
    ));
}

#[test]
fn different_expressions_with_equal_values_agree() {
    let run = check_equivalence_source(
        "n := 3; r := n * 2;",
        "n := 3; r := n + 3;",
        &parse_output_vars("r"),
        &config(BranchPolicy::Guarded),
        &mut EvalSolver::new(),
    )
    .unwrap();
    assert_eq!(run.report.outcome, EquivalenceOutcome::Equivalent);
}

#[test]
fn missing_outputs_are_reported() {
    let run = check_equivalence_source(
        COMMUTED_A,
        "a := 5; b := 10;",
        &parse_output_vars("c, zz"),
        &AnalysisConfig::default(),
        &mut EvalSolver::new(),
    )
    .unwrap();
    assert_eq!(run.report.outcome, EquivalenceOutcome::NoComparableOutputs);
    assert_eq!(run.report.unresolved, vec!["c", "zz"]);
}

#[test]
fn loop_output_is_compared_at_its_last_version() {
    let run = check_equivalence_source(
        "i := 0; s := 0; while (i < 3) { s := s + i; i := i + 1; }",
        "s := 3;",
        &parse_output_vars("s"),
        &config(BranchPolicy::Guarded),
        &mut EvalSolver::new(),
    )
    .unwrap();
    assert_eq!(run.report.outcome, EquivalenceOutcome::Equivalent);
}

// ============================================================
// Verification
// ============================================================

#[test]
fn bounded_counter_reaches_four() {
    for policy in POLICIES {
        let config = config(policy).with_unroll_depth(4);
        let report = verify_source(COUNTER, &config, &mut EvalSolver::new()).unwrap();
        assert_eq!(report.verdict, Verdict::Satisfiable, "{policy}");
        let last = report
            .program
            .ssa
            .highest_version("x")
            .unwrap()
            .symbol();
        assert!(!report.examples.models.is_empty());
        for model in &report.examples.models {
            assert_eq!(model.get(&last), Some(4), "{policy}: {last}");
        }
    }
}

#[test]
fn unconditional_unrolling_defines_one_version_per_copy() {
    let config = AnalysisConfig::default().with_unroll_depth(4);
    let report = verify_source(COUNTER, &config, &mut EvalSolver::new()).unwrap();
    assert_eq!(report.program.ssa.highest_version("x").unwrap().symbol(), "x_4");
    assert_eq!(report.program.ssa.count_defines(), 5);
}

#[test]
fn too_shallow_unrolling_loses_the_model() {
    let config = AnalysisConfig::default().with_unroll_depth(3);
    let report = verify_source(COUNTER, &config, &mut EvalSolver::new()).unwrap();
    assert_eq!(report.verdict, Verdict::Unsatisfiable);
}

#[test]
fn false_assertion_is_unsatisfiable() {
    for policy in POLICIES {
        let report = verify_source("assert(1 == 2);", &config(policy), &mut EvalSolver::new())
            .unwrap();
        assert_eq!(report.verdict, Verdict::Unsatisfiable, "{policy}");
        assert!(report.examples.models.is_empty());
    }
}

#[test]
fn distinct_examples_are_enumerated() {
    // `(div 0 0)` is unspecified, so the quotient can take any value.
    let config = AnalysisConfig::default().with_max_examples(3);
    let report = verify_source("d := 0; q := 0 / d;", &config, &mut EvalSolver::new()).unwrap();
    assert_eq!(report.verdict, Verdict::Satisfiable);
    assert_eq!(report.examples.models.len(), 3);
    let mut quotients: Vec<i128> = report
        .examples
        .models
        .iter()
        .filter_map(|m| m.get("q_0"))
        .collect();
    quotients.sort_unstable();
    quotients.dedup();
    assert_eq!(quotients.len(), 3);
}

#[test]
fn repeated_zero_division_agrees() {
    for policy in POLICIES {
        let report = verify_source(
            "x := 0 / 0; y := 0 / 0; assert(x != y);",
            &config(policy),
            &mut EvalSolver::new(),
        )
        .unwrap();
        assert_eq!(report.verdict, Verdict::Unsatisfiable, "{policy}");
    }
}

#[test]
fn zero_division_is_self_equivalent() {
    for policy in POLICIES {
        let run = check_equivalence_source(
            "a := 0 / 0;",
            "a := 0 / 0;",
            &parse_output_vars("a"),
            &config(policy),
            &mut EvalSolver::new(),
        )
        .unwrap();
        assert_eq!(run.report.outcome, EquivalenceOutcome::Equivalent, "{policy}");
    }
}

#[test]
fn division_constrains_quotient() {
    let report = verify_source(
        "a := 12; b := 4; c := a / b; assert(c == 3);",
        &AnalysisConfig::default(),
        &mut EvalSolver::new(),
    )
    .unwrap();
    assert_eq!(report.verdict, Verdict::Satisfiable);
    assert_eq!(report.examples.models.len(), 1);
    assert_eq!(report.examples.models[0].get("c_0"), Some(3));
}

// ============================================================
// External solvers
// ============================================================

#[test]
fn scenarios_with_external_solvers() {
    for mut backend in external_backends() {
        let name = backend.name();

        let run = check_equivalence_source(
            COMMUTED_A,
            COMMUTED_B,
            &parse_output_vars("c"),
            &AnalysisConfig::default(),
            backend.as_mut(),
        )
        .unwrap();
        assert_eq!(run.report.outcome, EquivalenceOutcome::Equivalent, "{name}");

        let run = check_equivalence_source(
            THRESHOLD_A,
            THRESHOLD_B,
            &parse_output_vars("y"),
            &config(BranchPolicy::Guarded),
            backend.as_mut(),
        )
        .unwrap();
        assert_eq!(run.report.outcome, EquivalenceOutcome::Differ, "{name}");
        assert_eq!(
            run.report.counterexamples[0].get("x", Namespace::First),
            Some(4),
            "{name}"
        );

        let config = AnalysisConfig::default().with_unroll_depth(4);
        let report = verify_source(COUNTER, &config, backend.as_mut()).unwrap();
        assert_eq!(report.verdict, Verdict::Satisfiable, "{name}");
        assert_eq!(report.examples.models[0].get("x_4"), Some(4), "{name}");

        let report =
            verify_source("assert(1 == 2);", &AnalysisConfig::default(), backend.as_mut())
                .unwrap();
        assert_eq!(report.verdict, Verdict::Unsatisfiable, "{name}");
    }
}
