//! In-process decision procedure for the formulas the constraint builder
//! emits.
//!
//! The evaluator is sound but incomplete:
//!
//! 1. Top-level equalities are inverted to a fixpoint. `v == t` assigns `v`
//!    once `t` is known, and `b * q == a` assigns `q = a / b` (or proves the
//!    set contradictory when `b` does not divide `a`). Values found this way
//!    are forced in every model.
//! 2. Every assertion is evaluated three-valued over the forced values. A
//!    false assertion means `Unsat`; all true means `Sat`.
//! 3. Otherwise the remaining free constants are enumerated over a small
//!    window around zero, re-running propagation for each candidate. A
//!    candidate that makes every assertion true is returned as the model;
//!    running out of candidates yields `Unknown`.
//!
//! SMT-LIB leaves `(div a 0)` unspecified but still a function of `a`: one
//! unknown per dividend value, shared by every occurrence. The evaluator keys
//! such a cell by its printed form, e.g. `(div 0 0)`. Arithmetic on a cell
//! that has no value yet produces a symbolic term, and constants equated
//! with it are bound to that term, so two structurally equal terms compare
//! equal without ever choosing the quotient. Open cells are enumerated
//! alongside the free constants.
//!
//! Arithmetic is checked `i128`; overflow never produces a verdict.

use std::collections::{HashMap, HashSet};

use minicheck_smtlib::term::Term;

use crate::backend::SolverBackend;
use crate::error::SolverError;
use crate::model::Model;
use crate::result::SolverResult;
use crate::stack::AssertionStack;

/// Default search window: candidates are drawn from `-16..=16`.
pub const DEFAULT_WINDOW: i128 = 16;
/// Default cap on candidate assignments tried per `check`.
pub const DEFAULT_MAX_CANDIDATES: usize = 4096;

/// Constants and zero-division cells. Cells only ever hold `Int`.
type Env = HashMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Value {
    Int(i128),
    Bool(bool),
    /// Integer term over literals and open cells; never mentions a constant.
    Sym(Term),
}

/// Why a term has no value under the current assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Stuck {
    Unassigned,
    Overflow,
    /// Depends on the value of an open `(div a 0)` cell.
    Opaque,
    IllSorted(String),
}

/// A forced equality with no integer solution.
#[derive(Debug)]
struct Contradiction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    True,
    False,
    Pending,
    Overflow,
}

/// Builtin solver backend.
#[derive(Debug, Clone)]
pub struct EvalSolver {
    stack: AssertionStack,
    window: i128,
    max_candidates: usize,
}

impl Default for EvalSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl EvalSolver {
    pub fn new() -> Self {
        Self::with_search(DEFAULT_WINDOW, DEFAULT_MAX_CANDIDATES)
    }

    /// Configure the bounded search: values in `-window..=window`, at most
    /// `max_candidates` assignments.
    pub fn with_search(window: i128, max_candidates: usize) -> Self {
        Self {
            stack: AssertionStack::new(),
            window: window.max(0),
            max_candidates: max_candidates.max(1),
        }
    }

    fn solve(&self) -> Result<SolverResult, SolverError> {
        let declared: Vec<&str> = self.stack.declared().collect();
        let mut assertions = Vec::new();
        for term in self.stack.assertions() {
            flatten(term, &mut assertions);
        }

        let mut forced = Env::new();
        if propagate(&assertions, &mut forced).is_err() {
            return Ok(SolverResult::Unsat);
        }

        match classify(&assertions, &forced)? {
            Verdict::True => Ok(SolverResult::Sat(Some(build_model(&declared, &forced)))),
            Verdict::False => Ok(SolverResult::Unsat),
            Verdict::Overflow => Ok(SolverResult::Unknown("integer overflow".to_string())),
            Verdict::Pending => self.search(&declared, &assertions, &forced),
        }
    }

    fn search(
        &self,
        declared: &[&str],
        assertions: &[&Term],
        forced: &Env,
    ) -> Result<SolverResult, SolverError> {
        let defined: HashSet<&str> = assertions
            .iter()
            .filter_map(|&t| match t {
                Term::Eq(lhs, _) => match lhs.as_ref() {
                    Term::Const(name) => Some(name.as_str()),
                    _ => None,
                },
                _ => None,
            })
            .collect();
        let mentioned: HashSet<&str> = assertions.iter().flat_map(|&t| t.free_vars()).collect();
        let mut vars: Vec<String> = declared
            .iter()
            .filter(|v| mentioned.contains(*v) && !defined.contains(*v) && !forced.contains_key(**v))
            .map(|v| v.to_string())
            .collect();
        for term in assertions {
            open_cells(term, forced, &mut vars);
        }

        if vars.is_empty() {
            return Ok(SolverResult::Unknown(
                "constraints not decidable by evaluation".to_string(),
            ));
        }

        let radius = search_radius(self.window, vars.len(), self.max_candidates);
        let values: Vec<i128> = std::iter::once(0)
            .chain((1..=radius).flat_map(|n| [n, -n]))
            .collect();
        let mut idx = vec![0usize; vars.len()];
        let mut tried = 0usize;
        let mut overflowed = false;

        loop {
            let mut env = forced.clone();
            for (var, &i) in vars.iter().zip(&idx) {
                env.insert(var.clone(), Value::Int(values[i]));
            }
            tried += 1;
            if propagate(assertions, &mut env).is_ok() {
                match classify(assertions, &env)? {
                    Verdict::True => {
                        tracing::debug!(tried, free = vars.len(), "Bounded search found a model");
                        return Ok(SolverResult::Sat(Some(build_model(declared, &env))));
                    }
                    Verdict::Overflow => overflowed = true,
                    Verdict::False | Verdict::Pending => {}
                }
            }
            if !advance(&mut idx, values.len()) {
                break;
            }
        }

        tracing::warn!(free = vars.len(), radius, tried, "Bounded search exhausted");
        let reason = if overflowed {
            "integer overflow during bounded search"
        } else {
            "bounded search exhausted"
        };
        Ok(SolverResult::Unknown(reason.to_string()))
    }
}

impl SolverBackend for EvalSolver {
    fn name(&self) -> String {
        "builtin".to_string()
    }

    fn declare_int(&mut self, name: &str) -> Result<(), SolverError> {
        self.stack.declare(name);
        Ok(())
    }

    fn assert(&mut self, term: &Term) -> Result<(), SolverError> {
        self.stack.assert(term.clone())
    }

    fn push(&mut self) -> Result<(), SolverError> {
        self.stack.push();
        Ok(())
    }

    fn pop(&mut self) -> Result<(), SolverError> {
        self.stack.pop()
    }

    fn check(&mut self) -> Result<SolverResult, SolverError> {
        let result = self.solve()?;
        tracing::debug!(
            depth = self.stack.depth(),
            sat = result.is_sat(),
            unsat = result.is_unsat(),
            "Builtin check"
        );
        Ok(result)
    }

    fn reset(&mut self) {
        self.stack.reset();
    }
}

/// Largest radius `r <= window` with `(2r + 1)^vars <= max_candidates`.
fn search_radius(window: i128, vars: usize, max_candidates: usize) -> i128 {
    let exp = u32::try_from(vars).unwrap_or(u32::MAX);
    let cap = i128::try_from(max_candidates).unwrap_or(i128::MAX);
    (0..=window)
        .rev()
        .find(|&r| (2 * r + 1).checked_pow(exp).is_some_and(|n| n <= cap))
        .unwrap_or(0)
}

/// Odometer step; `false` once every combination has been produced.
fn advance(idx: &mut [usize], base: usize) -> bool {
    for slot in idx.iter_mut().rev() {
        *slot += 1;
        if *slot < base {
            return true;
        }
        *slot = 0;
    }
    false
}

/// Open cells are closed with 0 as they are met; a verdict reached on
/// symbolic terms holds for any choice.
fn build_model(declared: &[&str], env: &Env) -> Model {
    let mut env = env.clone();
    let mut assignments = Vec::with_capacity(declared.len());
    for name in declared {
        let value = loop {
            match lookup(name, &env) {
                Ok(Value::Int(n)) => break n,
                Ok(Value::Sym(term)) => {
                    let mut open = Vec::new();
                    open_cells(&term, &env, &mut open);
                    if open.is_empty() {
                        break 0;
                    }
                    for key in open {
                        env.insert(key, Value::Int(0));
                    }
                }
                _ => break 0,
            }
        };
        assignments.push((name.to_string(), Term::IntLit(value).to_string()));
    }
    Model::with_assignments(assignments)
}

fn flatten<'a>(term: &'a Term, out: &mut Vec<&'a Term>) {
    match term {
        Term::And(terms) => {
            for t in terms {
                flatten(t, out);
            }
        }
        other => out.push(other),
    }
}

fn cell(dividend: i128) -> Term {
    Term::IntDiv(Box::new(Term::IntLit(dividend)), Box::new(Term::IntLit(0)))
}

/// Key of the `(div dividend 0)` cell.
fn cell_key(dividend: i128) -> String {
    cell(dividend).to_string()
}

/// Collect keys of zero-division cells under `term` whose dividend is known
/// but whose value is not.
fn open_cells(term: &Term, env: &Env, out: &mut Vec<String>) {
    if let Term::IntDiv(a, b) = term
        && let (Ok(x), Ok(0)) = (eval_int(a, env), eval_int(b, env))
    {
        let key = cell_key(x);
        if !env.contains_key(&key) && !out.contains(&key) {
            out.push(key);
        }
    }
    for child in term.children() {
        open_cells(child, env, out);
    }
}

// ---------------------------------------------------------------------------
// Propagation
// ---------------------------------------------------------------------------

fn propagate(assertions: &[&Term], env: &mut Env) -> Result<(), Contradiction> {
    loop {
        let mut progressed = false;
        for term in assertions {
            let Term::Eq(lhs, rhs) = term else {
                continue;
            };
            for (known, unknown) in [(rhs, lhs), (lhs, rhs)] {
                let Ok(target) = eval(known, env) else {
                    continue;
                };
                match eval(unknown, env) {
                    Err(Stuck::Unassigned | Stuck::Opaque) | Ok(Value::Sym(_)) => {}
                    _ => continue,
                }
                let solved = match (&target, unknown.as_ref()) {
                    (Value::Int(n), _) => invert(unknown, *n, env)?.map(|(k, n)| (k, Value::Int(n))),
                    (Value::Sym(_), Term::Const(name)) if !env.contains_key(name.as_str()) => {
                        Some((name.clone(), target.clone()))
                    }
                    _ => None,
                };
                if let Some((name, value)) = solved {
                    env.insert(name, value);
                    progressed = true;
                    break;
                }
            }
        }
        if !progressed {
            return Ok(());
        }
    }
}

/// Solve `term == target` for the single unassigned constant or open cell
/// on the evaluation path of `term`.
fn invert(term: &Term, target: i128, env: &Env) -> Result<Option<(String, i128)>, Contradiction> {
    match term {
        Term::Const(name) => match env.get(name.as_str()) {
            None => Ok(Some((name.clone(), target))),
            Some(Value::Sym(bound)) => invert(bound, target, env),
            Some(_) => Ok(None),
        },
        Term::IntDiv(a, b) => Ok(match (eval_int(a, env), eval_int(b, env)) {
            (Ok(x), Ok(0)) => {
                let key = cell_key(x);
                (!env.contains_key(&key)).then_some((key, target))
            }
            _ => None,
        }),
        Term::IntAdd(a, b) => {
            if let Ok(x) = eval_int(a, env) {
                target.checked_sub(x).map_or(Ok(None), |t| invert(b, t, env))
            } else if let Ok(y) = eval_int(b, env) {
                target.checked_sub(y).map_or(Ok(None), |t| invert(a, t, env))
            } else {
                Ok(None)
            }
        }
        Term::IntSub(a, b) => {
            if let Ok(x) = eval_int(a, env) {
                x.checked_sub(target).map_or(Ok(None), |t| invert(b, t, env))
            } else if let Ok(y) = eval_int(b, env) {
                target.checked_add(y).map_or(Ok(None), |t| invert(a, t, env))
            } else {
                Ok(None)
            }
        }
        Term::IntMul(a, b) => {
            if let Ok(x) = eval_int(a, env) {
                invert_factor(x, target, b, env)
            } else if let Ok(y) = eval_int(b, env) {
                invert_factor(y, target, a, env)
            } else {
                Ok(None)
            }
        }
        Term::IntNeg(a) => target.checked_neg().map_or(Ok(None), |t| invert(a, t, env)),
        _ => Ok(None),
    }
}

/// `factor * rest == target`
fn invert_factor(
    factor: i128,
    target: i128,
    rest: &Term,
    env: &Env,
) -> Result<Option<(String, i128)>, Contradiction> {
    if factor == 0 {
        return if target == 0 {
            Ok(None)
        } else {
            Err(Contradiction)
        };
    }
    match target.checked_rem(factor) {
        Some(0) => target
            .checked_div(factor)
            .map_or(Ok(None), |t| invert(rest, t, env)),
        Some(_) => Err(Contradiction),
        None => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

fn classify(assertions: &[&Term], env: &Env) -> Result<Verdict, SolverError> {
    let mut verdict = Verdict::True;
    for term in assertions {
        match eval_bool(term, env) {
            Ok(true) => {}
            Ok(false) => return Ok(Verdict::False),
            Err(Stuck::IllSorted(msg)) => return Err(SolverError::Unsupported(msg)),
            Err(Stuck::Overflow) => verdict = Verdict::Overflow,
            Err(Stuck::Unassigned | Stuck::Opaque) => {
                if verdict == Verdict::True {
                    verdict = Verdict::Pending;
                }
            }
        }
    }
    Ok(verdict)
}

/// Value of a constant. A symbolic binding is re-evaluated, so cells closed
/// since it was bound are seen.
fn lookup(name: &str, env: &Env) -> Result<Value, Stuck> {
    match env.get(name) {
        Some(Value::Sym(term)) => eval(term, env),
        Some(value) => Ok(value.clone()),
        None => Err(Stuck::Unassigned),
    }
}

/// Integer value, concrete or symbolic.
fn eval_operand(term: &Term, env: &Env) -> Result<Value, Stuck> {
    match eval(term, env)? {
        Value::Bool(_) => Err(Stuck::IllSorted(format!("expected Int, found `{term}`"))),
        value => Ok(value),
    }
}

fn eval_int(term: &Term, env: &Env) -> Result<i128, Stuck> {
    match eval_operand(term, env)? {
        Value::Int(n) => Ok(n),
        _ => Err(Stuck::Opaque),
    }
}

fn eval_bool(term: &Term, env: &Env) -> Result<bool, Stuck> {
    match eval(term, env)? {
        Value::Bool(b) => Ok(b),
        Value::Int(_) | Value::Sym(_) => {
            Err(Stuck::IllSorted(format!("expected Bool, found `{term}`")))
        }
    }
}

fn reify(value: Value) -> Box<Term> {
    Box::new(match value {
        Value::Int(n) => Term::IntLit(n),
        Value::Bool(b) => Term::BoolLit(b),
        Value::Sym(term) => term,
    })
}

/// Apply `op`, or build `node` when an operand is symbolic.
fn arith(
    a: &Term,
    b: &Term,
    env: &Env,
    op: fn(i128, i128) -> Option<i128>,
    node: fn(Box<Term>, Box<Term>) -> Term,
) -> Result<Value, Stuck> {
    match (eval_operand(a, env)?, eval_operand(b, env)?) {
        (Value::Int(x), Value::Int(y)) => op(x, y).map(Value::Int).ok_or(Stuck::Overflow),
        (x, y) => Ok(Value::Sym(node(reify(x), reify(y)))),
    }
}

fn compare(a: &Term, b: &Term, env: &Env, op: fn(&i128, &i128) -> bool) -> Result<Value, Stuck> {
    let (x, y) = (eval_int(a, env)?, eval_int(b, env)?);
    Ok(Value::Bool(op(&x, &y)))
}

/// n-ary `and`/`or`: a `decisive` operand settles the result even when
/// others are stuck.
fn junction(terms: &[Term], env: &Env, decisive: bool) -> Result<Value, Stuck> {
    let mut stuck = None;
    for t in terms {
        match eval_bool(t, env) {
            Ok(v) if v == decisive => return Ok(Value::Bool(decisive)),
            Ok(_) => {}
            Err(Stuck::IllSorted(msg)) => return Err(Stuck::IllSorted(msg)),
            Err(e) => {
                stuck.get_or_insert(e);
            }
        }
    }
    match stuck {
        Some(e) => Err(e),
        None => Ok(Value::Bool(!decisive)),
    }
}

/// Equality of two evaluated operands. Structurally equal symbolic terms
/// are equal; anything else involving one is undecided.
fn equal(x: &Value, y: &Value, term: &Term) -> Result<bool, Stuck> {
    match (x, y) {
        (Value::Bool(p), Value::Bool(q)) => Ok(p == q),
        (Value::Int(m), Value::Int(n)) => Ok(m == n),
        (Value::Sym(s), Value::Sym(t)) if s == t => Ok(true),
        (Value::Sym(_), Value::Int(_) | Value::Sym(_)) | (Value::Int(_), Value::Sym(_)) => {
            Err(Stuck::Opaque)
        }
        _ => Err(Stuck::IllSorted(format!("sort mismatch in `{term}`"))),
    }
}

fn eval(term: &Term, env: &Env) -> Result<Value, Stuck> {
    match term {
        Term::BoolLit(b) => Ok(Value::Bool(*b)),
        Term::IntLit(n) => Ok(Value::Int(*n)),
        Term::Const(name) => lookup(name, env),

        Term::Not(a) => Ok(Value::Bool(!eval_bool(a, env)?)),
        Term::And(terms) => junction(terms, env, false),
        Term::Or(terms) => junction(terms, env, true),
        Term::Implies(a, b) => match eval_bool(a, env) {
            Ok(false) => Ok(Value::Bool(true)),
            Ok(true) => eval_bool(b, env).map(Value::Bool),
            Err(e) => match eval_bool(b, env) {
                Ok(true) => Ok(Value::Bool(true)),
                _ => Err(e),
            },
        },

        Term::Eq(a, b) => {
            let (x, y) = (eval(a, env)?, eval(b, env)?);
            equal(&x, &y, term).map(Value::Bool)
        }
        Term::Distinct(terms) => {
            let values = terms
                .iter()
                .map(|t| eval(t, env))
                .collect::<Result<Vec<_>, _>>()?;
            let mut undecided = false;
            for (i, x) in values.iter().enumerate() {
                for y in &values[i + 1..] {
                    match equal(x, y, term) {
                        Ok(true) => return Ok(Value::Bool(false)),
                        Ok(false) => {}
                        Err(Stuck::Opaque) => undecided = true,
                        Err(e) => return Err(e),
                    }
                }
            }
            if undecided {
                Err(Stuck::Opaque)
            } else {
                Ok(Value::Bool(true))
            }
        }
        Term::Ite(c, t, e) => {
            if eval_bool(c, env)? {
                eval(t, env)
            } else {
                eval(e, env)
            }
        }

        Term::IntAdd(a, b) => arith(a, b, env, i128::checked_add, Term::IntAdd),
        Term::IntSub(a, b) => arith(a, b, env, i128::checked_sub, Term::IntSub),
        // `0 * t` is 0 whatever `t` turns out to be.
        Term::IntMul(a, b) => match (eval_int(a, env), eval_int(b, env)) {
            (Ok(0), Ok(_) | Err(Stuck::Unassigned | Stuck::Opaque))
            | (Err(Stuck::Unassigned | Stuck::Opaque), Ok(0)) => Ok(Value::Int(0)),
            _ => arith(a, b, env, i128::checked_mul, Term::IntMul),
        },
        Term::IntDiv(a, b) => match (eval_operand(a, env)?, eval_operand(b, env)?) {
            (Value::Int(x), Value::Int(0)) => {
                Ok(env.get(&cell_key(x)).cloned().unwrap_or(Value::Sym(cell(x))))
            }
            (Value::Int(x), Value::Int(y)) => {
                x.checked_div_euclid(y).map(Value::Int).ok_or(Stuck::Overflow)
            }
            (x, y) => Ok(Value::Sym(Term::IntDiv(reify(x), reify(y)))),
        },
        Term::IntNeg(a) => match eval_operand(a, env)? {
            Value::Int(n) => n.checked_neg().map(Value::Int).ok_or(Stuck::Overflow),
            other => Ok(Value::Sym(Term::IntNeg(reify(other)))),
        },
        Term::IntLt(a, b) => compare(a, b, env, i128::lt),
        Term::IntLe(a, b) => compare(a, b, env, i128::le),
        Term::IntGt(a, b) => compare(a, b, env, i128::gt),
        Term::IntGe(a, b) => compare(a, b, env, i128::ge),
    }
}
