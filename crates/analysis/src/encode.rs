//! Translate SSA instructions into solver formulas.
//!
//! Every SSA variable becomes an integer constant named by
//! [`SsaVar::symbol`]. Definitions become equalities, guards and assertions
//! become boolean constraints according to the program's [`BranchPolicy`].
//!
//! Division is exact: `a / b` is encoded as `(div a b)` together with the
//! side constraint `b * (div a b) == a`, so a non-exact division or a
//! division of a non-zero value by zero makes the constraint set
//! unsatisfiable. `(div 0 0)` is left to the solver, and being a function of
//! its operands it is the same value wherever it occurs. Inside a guarded
//! branch the side constraint only applies when the branch is taken.

use std::collections::{BTreeMap, HashMap, HashSet};

use minicheck_smtlib::command::Command;
use minicheck_smtlib::script::Script;
use minicheck_smtlib::sort::Sort;
use minicheck_smtlib::term::Term;
use minicheck_solver::{Model, SolverBackend, SolverError, SolverResult};

use crate::ast::{BinOp, CmpOp};
use crate::branch::BranchPolicy;
use crate::error::AnalysisError;
use crate::ssa::{Namespace, SsaCond, SsaExpr, SsaInstruction, SsaProgram, SsaVar};

/// Builds the constraint set for one program.
///
/// State accumulates across `build` calls until [`reset`](Self::reset).
#[derive(Debug, Default)]
pub struct ConstraintBuilder {
    /// Declared symbols in declaration order.
    pool: Vec<String>,
    declared: HashSet<String>,
    /// SSA variables with a definition seen so far.
    defined: HashSet<SsaVar>,
    variable_mapping: BTreeMap<String, SsaVar>,
    /// Translated conditions keyed by (path, condition), so the division
    /// side constraints of a condition are emitted once per path.
    cond_cache: HashMap<(Vec<SsaCond>, SsaCond), Term>,
    formulas: Vec<Term>,
}

impl ConstraintBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Translate `program`, returning the formulas it contributed.
    pub fn build(&mut self, program: &SsaProgram) -> Result<Vec<Term>, AnalysisError> {
        let first = self.formulas.len();
        for instruction in &program.instructions {
            self.instruction(instruction, program.policy, program.namespace)?;
        }
        let added = self.formulas[first..].to_vec();
        tracing::debug!(
            policy = %program.policy,
            formulas = added.len(),
            declared = self.pool.len(),
            "Built constraints"
        );
        Ok(added)
    }

    /// Every formula built so far.
    pub fn formulas(&self) -> &[Term] {
        &self.formulas
    }

    /// Declared symbols in declaration order, one per SSA variable.
    pub fn declared(&self) -> &[String] {
        &self.pool
    }

    /// Base name to the most recently declared versioned variable.
    pub fn variable_mapping(&self) -> &BTreeMap<String, SsaVar> {
        &self.variable_mapping
    }

    /// Declarations and assertions as an SMT-LIB script.
    pub fn script(&self) -> Script {
        let mut script = Script::new();
        script.extend(
            self.pool
                .iter()
                .map(|name| Command::DeclareConst(name.clone(), Sort::Int)),
        );
        script.extend(self.formulas.iter().cloned().map(Command::Assert));
        script
    }

    /// Declare every symbol and assert every formula on `backend`.
    pub fn load_into(&self, backend: &mut dyn SolverBackend) -> Result<(), SolverError> {
        for name in &self.pool {
            backend.declare_int(name)?;
        }
        for formula in &self.formulas {
            backend.assert(formula)?;
        }
        Ok(())
    }

    /// Build `program` from scratch and collect up to `limit` distinct
    /// satisfying assignments of its program variables.
    ///
    /// The backend is used inside a `push`/`pop` pair and left as it was.
    pub fn get_satisfying_examples(
        &mut self,
        program: &SsaProgram,
        limit: usize,
        backend: &mut dyn SolverBackend,
    ) -> Result<ExampleSet, AnalysisError> {
        self.reset();
        self.build(program)?;
        let symbols = self.pool.clone();

        backend.push()?;
        let collected = self
            .load_into(backend)
            .map_err(AnalysisError::from)
            .and_then(|()| enumerate_models(backend, &symbols, limit));
        let popped = backend.pop();
        let examples = collected?;
        popped?;

        tracing::info!(
            found = examples.models.len(),
            stop = ?examples.stop,
            "Collected satisfying examples"
        );
        Ok(examples)
    }

    // ---- Instructions ----

    fn instruction(
        &mut self,
        instruction: &SsaInstruction,
        policy: BranchPolicy,
        namespace: Namespace,
    ) -> Result<(), AnalysisError> {
        match instruction {
            SsaInstruction::Define { target, expr, path } => {
                let value = self.expr(expr, path, namespace)?;
                let target = self.define(target)?;
                self.formulas.push(target.equals(value));
            }
            SsaInstruction::Merge {
                target,
                cond,
                then_var,
                else_var,
                path,
            } => {
                if !policy.merges_branches() {
                    return Err(AnalysisError::Encoding(format!(
                        "merge of `{target}` in a program converted with the {policy} policy"
                    )));
                }
                let cond = self.cond(cond, path, namespace)?;
                let then_term = self.use_var(then_var)?;
                let else_term = self.use_var(else_var)?;
                let target = self.define(target)?;
                self.formulas.push(target.equals(Term::Ite(
                    Box::new(cond),
                    Box::new(then_term),
                    Box::new(else_term),
                )));
            }
            SsaInstruction::Guard { cond, path } => {
                let cond = self.cond(cond, path, namespace)?;
                if policy.asserts_guards() {
                    self.formulas.push(cond);
                }
            }
            SsaInstruction::ElseMarker => {}
            SsaInstruction::Assertion { cond, path } => {
                let cond = self.cond(cond, path, namespace)?;
                let formula = match self.path_term(path, namespace)? {
                    Some(guard) => Term::Or(vec![guard.negate(), cond]),
                    None => cond,
                };
                self.formulas.push(formula);
            }
        }
        Ok(())
    }

    fn declare(&mut self, symbol: String) {
        if self.declared.insert(symbol.clone()) {
            self.pool.push(symbol);
        }
    }

    fn define(&mut self, var: &SsaVar) -> Result<Term, AnalysisError> {
        if !self.defined.insert(var.clone()) {
            return Err(AnalysisError::Encoding(format!(
                "`{var}` is defined more than once"
            )));
        }
        let symbol = var.symbol();
        self.declare(symbol.clone());
        self.variable_mapping.insert(var.base.clone(), var.clone());
        Ok(Term::Const(symbol))
    }

    fn use_var(&self, var: &SsaVar) -> Result<Term, AnalysisError> {
        if self.defined.contains(var) {
            Ok(Term::Const(var.symbol()))
        } else {
            Err(AnalysisError::Encoding(format!(
                "`{var}` is used before its definition"
            )))
        }
    }

    // ---- Expressions and conditions ----

    fn expr(
        &mut self,
        expr: &SsaExpr,
        path: &[SsaCond],
        namespace: Namespace,
    ) -> Result<Term, AnalysisError> {
        Ok(match expr {
            SsaExpr::Num(n) => Term::IntLit(*n),
            SsaExpr::Var(v) => self.use_var(v)?,
            SsaExpr::Binary { op, lhs, rhs } => {
                let a = Box::new(self.expr(lhs, path, namespace)?);
                let b = Box::new(self.expr(rhs, path, namespace)?);
                match op {
                    BinOp::Add => Term::IntAdd(a, b),
                    BinOp::Sub => Term::IntSub(a, b),
                    BinOp::Mul => Term::IntMul(a, b),
                    BinOp::Div => self.quotient(a, b, path, namespace)?,
                }
            }
        })
    }

    /// `(div dividend divisor)`, with `divisor * q == dividend` asserted
    /// under `path`.
    fn quotient(
        &mut self,
        dividend: Box<Term>,
        divisor: Box<Term>,
        path: &[SsaCond],
        namespace: Namespace,
    ) -> Result<Term, AnalysisError> {
        let q = Term::IntDiv(dividend.clone(), divisor.clone());
        let exact = Term::IntMul(divisor, Box::new(q.clone())).equals(*dividend);
        let side = match self.path_term(path, namespace)? {
            Some(guard) => Term::Or(vec![guard.negate(), exact]),
            None => exact,
        };
        self.formulas.push(side);
        Ok(q)
    }

    fn cond(
        &mut self,
        cond: &SsaCond,
        path: &[SsaCond],
        namespace: Namespace,
    ) -> Result<Term, AnalysisError> {
        let key = (path.to_vec(), cond.clone());
        if let Some(term) = self.cond_cache.get(&key) {
            return Ok(term.clone());
        }
        let term = match cond {
            SsaCond::Compare { op, lhs, rhs } => {
                let a = Box::new(self.expr(lhs, path, namespace)?);
                let b = Box::new(self.expr(rhs, path, namespace)?);
                match op {
                    CmpOp::Lt => Term::IntLt(a, b),
                    CmpOp::Gt => Term::IntGt(a, b),
                    CmpOp::Eq => Term::Eq(a, b),
                    CmpOp::Ne => Term::Eq(a, b).negate(),
                    CmpOp::Le => Term::IntLe(a, b),
                    CmpOp::Ge => Term::IntGe(a, b),
                }
            }
            SsaCond::Not(inner) => self.cond(inner, path, namespace)?.negate(),
            SsaCond::And(a, b) => {
                let a = self.cond(a, path, namespace)?;
                Term::And(vec![a, self.cond(b, path, namespace)?])
            }
            SsaCond::Or(a, b) => {
                let a = self.cond(a, path, namespace)?;
                Term::Or(vec![a, self.cond(b, path, namespace)?])
            }
            SsaCond::Truthy(e) => self.expr(e, path, namespace)?.equals(Term::IntLit(0)).negate(),
        };
        self.cond_cache.insert(key, term.clone());
        Ok(term)
    }

    /// Conjunction of the path conditions, `None` for an empty path.
    ///
    /// Each path condition was translated when its guard was, so this only
    /// hits the cache.
    fn path_term(
        &mut self,
        path: &[SsaCond],
        namespace: Namespace,
    ) -> Result<Option<Term>, AnalysisError> {
        let mut terms = Vec::with_capacity(path.len());
        for (depth, cond) in path.iter().enumerate() {
            terms.push(self.cond(cond, &path[..depth], namespace)?);
        }
        Ok(match terms.len() {
            0 => None,
            1 => terms.pop(),
            _ => Some(Term::And(terms)),
        })
    }
}

/// One satisfying assignment, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Example {
    pub values: Vec<(String, i128)>,
}

impl Example {
    pub fn get(&self, symbol: &str) -> Option<i128> {
        self.values
            .iter()
            .find(|(name, _)| name == symbol)
            .map(|&(_, value)| value)
    }
}

/// Why example collection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The requested number of examples was reached.
    Limit,
    /// No further distinct assignment exists.
    Exhausted,
    /// The backend could not decide the next query.
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExampleSet {
    pub models: Vec<Example>,
    pub stop: StopReason,
}

impl ExampleSet {
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// Repeatedly check the live assertions, recording the values of `symbols`
/// and blocking each recorded assignment before the next check.
///
/// An `unknown` answer before the first model is an error; after it, the
/// loop stops and reports why.
pub(crate) fn enumerate_models(
    backend: &mut dyn SolverBackend,
    symbols: &[String],
    limit: usize,
) -> Result<ExampleSet, AnalysisError> {
    let mut models = Vec::new();
    let stop = loop {
        if models.len() >= limit {
            break StopReason::Limit;
        }
        match backend.check()? {
            SolverResult::Unsat => break StopReason::Exhausted,
            SolverResult::Unknown(reason) if models.is_empty() => {
                return Err(AnalysisError::SolverUnknown(reason));
            }
            SolverResult::Unknown(reason) => {
                tracing::warn!(%reason, found = models.len(), "Solver gave up during enumeration");
                break StopReason::Unknown(reason);
            }
            SolverResult::Sat(model) => {
                let example = decode_example(&model.unwrap_or_default(), symbols)?;
                let differs: Vec<Term> = example
                    .values
                    .iter()
                    .map(|(s, v)| Term::var(s.as_str()).equals(Term::IntLit(*v)).negate())
                    .collect();
                models.push(example);
                if differs.is_empty() {
                    break StopReason::Exhausted;
                }
                backend.assert(&Term::Or(differs))?;
            }
        }
    };
    Ok(ExampleSet { models, stop })
}

/// Values of `symbols` in `model`. Symbols the backend left out are skipped;
/// a value that is not an `i128` literal is an error.
fn decode_example(model: &Model, symbols: &[String]) -> Result<Example, AnalysisError> {
    let mut values = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        let Some(text) = model.get(symbol) else {
            continue;
        };
        let value = model.int_value(symbol).ok_or_else(|| {
            SolverError::ParseError(format!("`{symbol}` = `{text}` is not an i128 integer"))
        })?;
        values.push((symbol.clone(), value));
    }
    Ok(Example { values })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::ssa::SsaConverter;
    use minicheck_solver::EvalSolver;

    fn ssa(src: &str, policy: BranchPolicy, unroll: usize) -> SsaProgram {
        SsaConverter::new(policy)
            .convert(&parse(src).unwrap(), unroll)
            .unwrap()
    }

    fn rendered(builder: &ConstraintBuilder) -> Vec<String> {
        builder.formulas().iter().map(ToString::to_string).collect()
    }

    #[test]
    fn definitions_become_equalities() {
        let mut builder = ConstraintBuilder::new();
        builder
            .build(&ssa("a := 5; b := a * 2 + 1;", BranchPolicy::Unconditional, 1))
            .unwrap();
        assert_eq!(
            rendered(&builder),
            vec!["(= a_0 5)", "(= b_0 (+ (* a_0 2) 1))"]
        );
        assert_eq!(builder.declared(), ["a_0", "b_0"]);
        assert_eq!(builder.variable_mapping()["b"], SsaVar::new("b", 0));
    }

    #[test]
    fn unconditional_guards_are_asserted() {
        let mut builder = ConstraintBuilder::new();
        builder
            .build(&ssa(
                "x := 4; if (x > 3) { y := 10; } else { y := 0; }",
                BranchPolicy::Unconditional,
                1,
            ))
            .unwrap();
        assert_eq!(
            rendered(&builder),
            vec!["(= x_0 4)", "(> x_0 3)", "(= y_0 10)", "(= y_1 0)"]
        );
    }

    #[test]
    fn guarded_guards_become_ite_merges() {
        let mut builder = ConstraintBuilder::new();
        builder
            .build(&ssa(
                "x := 4; if (x > 3) { y := 10; } else { y := 0; assert(y == 0); }",
                BranchPolicy::Guarded,
                1,
            ))
            .unwrap();
        assert_eq!(
            rendered(&builder),
            vec![
                "(= x_0 4)",
                "(= y_0 10)",
                "(= y_1 0)",
                "(or (not (not (> x_0 3))) (= y_1 0))",
                "(= y_2 (ite (> x_0 3) y_0 y_1))",
            ]
        );
    }

    #[test]
    fn division_introduces_exact_quotient() {
        let mut builder = ConstraintBuilder::new();
        builder
            .build(&ssa("a := 10; b := a / 4;", BranchPolicy::Unconditional, 1))
            .unwrap();
        assert_eq!(
            rendered(&builder),
            vec![
                "(= a_0 10)",
                "(= (* 4 (div a_0 4)) a_0)",
                "(= b_0 (div a_0 4))"
            ]
        );
        assert_eq!(builder.declared(), ["a_0", "b_0"]);

        let mut solver = EvalSolver::new();
        let examples = builder
            .get_satisfying_examples(
                &ssa("a := 10; b := a / 4;", BranchPolicy::Unconditional, 1),
                2,
                &mut solver,
            )
            .unwrap();
        assert!(examples.is_empty());
        assert_eq!(examples.stop, StopReason::Exhausted);
    }

    #[test]
    fn guarded_division_only_constrains_taken_branch() {
        let program = ssa(
            "d := 0; n := 6; if (d != 0) { q := n / d; } else { q := 0; }",
            BranchPolicy::Guarded,
            1,
        );
        let mut builder = ConstraintBuilder::new();
        let mut solver = EvalSolver::new();
        let examples = builder
            .get_satisfying_examples(&program, 3, &mut solver)
            .unwrap();
        // q_0 is unconstrained on the untaken branch, so models differ there
        assert_eq!(examples.models.len(), 3);
        assert!(examples.models.iter().all(|m| m.get("q_2") == Some(0)));
        assert!(
            builder
                .formulas()
                .iter()
                .any(|f| f.to_string() == "(or (not (not (= d_0 0))) (= (* d_0 (div n_0 d_0)) n_0))")
        );
    }

    #[test]
    fn namespace_suffix_on_all_symbols() {
        let program = ssa("a := 8; b := a / 2;", BranchPolicy::Unconditional, 1)
            .in_namespace(Namespace::Second);
        let mut builder = ConstraintBuilder::new();
        builder.build(&program).unwrap();
        assert_eq!(builder.declared(), ["a_0@2", "b_0@2"]);
        assert!(
            builder
                .formulas()
                .iter()
                .any(|f| f.to_string() == "(= b_0@2 (div a_0@2 2))")
        );
    }

    #[test]
    fn examples_are_distinct_and_bounded() {
        let program = ssa(
            "x := 0; while (x < 4) { x := x + 1; } assert(x == 4);",
            BranchPolicy::Unconditional,
            4,
        );
        let mut builder = ConstraintBuilder::new();
        let mut solver = EvalSolver::new();
        let examples = builder
            .get_satisfying_examples(&program, 2, &mut solver)
            .unwrap();
        // every value is forced, so there is exactly one assignment
        assert_eq!(examples.models.len(), 1);
        assert_eq!(examples.models[0].get("x_4"), Some(4));
        assert_eq!(examples.stop, StopReason::Exhausted);
        // the backend is left without the program's assertions
        assert!(solver.check().unwrap().is_sat());
    }

    #[test]
    fn limit_stops_enumeration() {
        let program = ssa("a := 1; if (a > 0) { b := a; }", BranchPolicy::Unconditional, 1);
        let mut solver = EvalSolver::new();
        let examples = ConstraintBuilder::new()
            .get_satisfying_examples(&program, 1, &mut solver)
            .unwrap();
        assert_eq!(examples.models.len(), 1);
        assert_eq!(examples.stop, StopReason::Limit);
    }

    #[test]
    fn false_assertion_has_no_examples() {
        let program = ssa("assert(1 == 2);", BranchPolicy::Unconditional, 1);
        let mut solver = EvalSolver::new();
        let examples = ConstraintBuilder::new()
            .get_satisfying_examples(&program, 2, &mut solver)
            .unwrap();
        assert!(examples.is_empty());
        assert_eq!(examples.stop, StopReason::Exhausted);
    }

    #[test]
    fn variable_free_program_has_one_empty_example() {
        let program = ssa("assert(1 < 2);", BranchPolicy::Unconditional, 1);
        let mut solver = EvalSolver::new();
        let examples = ConstraintBuilder::new()
            .get_satisfying_examples(&program, 5, &mut solver)
            .unwrap();
        assert_eq!(examples.models, vec![Example::default()]);
        assert_eq!(examples.stop, StopReason::Exhausted);
    }

    #[test]
    fn unknown_before_first_model_is_an_error() {
        // free * free == 1000 has no integer root, so the bounded search gives up
        let mut builder = ConstraintBuilder::new();
        builder.declare("free".to_string());
        builder.formulas.push(
            Term::IntMul(Box::new(Term::var("free")), Box::new(Term::var("free")))
                .equals(Term::IntLit(1000)),
        );
        let mut solver = EvalSolver::new();
        solver.push().unwrap();
        builder.load_into(&mut solver).unwrap();
        let err = enumerate_models(&mut solver, &["free".to_string()], 1).unwrap_err();
        assert!(matches!(err, AnalysisError::SolverUnknown(_)));
    }

    #[test]
    fn hand_built_ssa_with_forward_reference_is_rejected() {
        let program = SsaProgram {
            instructions: vec![SsaInstruction::Define {
                target: SsaVar::new("a", 0),
                expr: SsaExpr::Var(SsaVar::new("b", 3)),
                path: vec![],
            }],
            policy: BranchPolicy::Unconditional,
            namespace: Namespace::First,
            final_versions: BTreeMap::new(),
        };
        let err = ConstraintBuilder::new().build(&program).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::Encoding("`b_3` is used before its definition".to_string())
        );
    }

    #[test]
    fn merge_requires_guarded_policy() {
        let mut program = ssa(
            "x := 1; if (x > 0) { x := 2; }",
            BranchPolicy::Guarded,
            1,
        );
        program.policy = BranchPolicy::Unconditional;
        let err = ConstraintBuilder::new().build(&program).unwrap_err();
        assert!(matches!(err, AnalysisError::Encoding(msg) if msg.contains("unconditional")));
    }

    #[test]
    fn script_lists_declarations_then_assertions() {
        let mut builder = ConstraintBuilder::new();
        builder
            .build(&ssa("a := 1; assert(a != 0);", BranchPolicy::Unconditional, 1))
            .unwrap();
        assert_eq!(
            builder.script().to_string(),
            "(declare-const a_0 Int)\n(assert (= a_0 1))\n(assert (not (= a_0 0)))"
        );
    }

    #[test]
    fn model_values_must_be_integers() {
        let symbols = vec!["a_0".to_string(), "b_0".to_string()];
        let partial = Model::with_assignments(vec![("a_0".into(), "(- 4)".into())]);
        assert_eq!(
            decode_example(&partial, &symbols).unwrap().values,
            vec![("a_0".to_string(), -4)]
        );

        let huge = Model::with_assignments(vec![(
            "b_0".into(),
            "1701411834604692317316873037158841057280".into(),
        )]);
        assert!(matches!(
            decode_example(&huge, &symbols),
            Err(AnalysisError::Solver(SolverError::ParseError(msg))) if msg.contains("b_0")
        ));
    }
}
