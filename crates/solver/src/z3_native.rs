//! Native Z3 backend using the z3 crate.
//!
//! `Z3NativeSolver` translates the live assertion stack into z3 API calls,
//! which avoids starting a process per query. It keeps scopes in memory like
//! [`CliSolver`](crate::cli::CliSolver) and replays them into a fresh
//! `z3::Solver` on every `check`.
//!
//! ## Requirements
//!
//! The z3 crate links against the system Z3 library:
//! - macOS: `brew install z3`
//! - Ubuntu/Debian: `apt-get install libz3-dev`
//!
//! Builds without Z3 installed can disable the default `z3-native` feature;
//! the subprocess and builtin backends remain available.

use std::collections::HashMap;

use minicheck_smtlib::term::Term;
use z3::ast::{Bool, Int};
use z3::{Params, SatResult, Solver};

use crate::backend::SolverBackend;
use crate::error::SolverError;
use crate::model::Model;
use crate::result::SolverResult;
use crate::stack::AssertionStack;

/// Native Z3 solver backend.
#[derive(Debug, Default)]
pub struct Z3NativeSolver {
    stack: AssertionStack,
    timeout_ms: u64,
}

impl Z3NativeSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-check time limit; zero leaves Z3 unbounded.
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    fn solve(&self) -> Result<SolverResult, SolverError> {
        let start = std::time::Instant::now();

        // z3 0.19 keeps a thread-local context, so no Context is threaded through.
        let solver = Solver::new();
        if self.timeout_ms > 0 {
            let mut params = Params::new();
            params.set_u32("timeout", u32::try_from(self.timeout_ms).unwrap_or(u32::MAX));
            solver.set_params(&params);
        }

        let symbols: HashMap<&str, Int> = self
            .stack
            .declared()
            .map(|name| (name, Int::new_const(name)))
            .collect();
        for term in self.stack.assertions() {
            solver.assert(&translate_bool(&symbols, term)?);
        }

        let result = match solver.check() {
            SatResult::Sat => {
                tracing::debug!("Z3 native: SAT in {:?}", start.elapsed());
                let model = solver.get_model().map(|m| extract_model(&m, &self.stack, &symbols));
                SolverResult::Sat(model)
            }
            SatResult::Unsat => {
                tracing::debug!("Z3 native: UNSAT in {:?}", start.elapsed());
                SolverResult::Unsat
            }
            SatResult::Unknown => {
                let reason = solver
                    .get_reason_unknown()
                    .unwrap_or_else(|| "unknown".to_string());
                tracing::debug!(%reason, "Z3 native: UNKNOWN in {:?}", start.elapsed());
                SolverResult::Unknown(reason)
            }
        };
        Ok(result)
    }
}

impl SolverBackend for Z3NativeSolver {
    fn name(&self) -> String {
        "Z3 (native)".to_string()
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
        self.solve()
    }

    fn reset(&mut self) {
        self.stack.reset();
    }
}

/// Z3 value wrapper over the two sorts the constraint builder uses.
#[derive(Clone, Debug)]
enum Z3Value {
    Bool(Bool),
    Int(Int),
}

/// Integer literal of any `i128`; Z3 only takes 64-bit numerals directly.
fn int_literal(value: i128) -> Int {
    if let Ok(small) = i64::try_from(value) {
        return Int::from_i64(small);
    }
    let magnitude = value.unsigned_abs();
    let high = Int::from_u64((magnitude >> 64) as u64);
    let low = Int::from_u64(magnitude as u64);
    let half = Int::from_u64(1 << 32);
    let wide = Int::add(&[&Int::mul(&[&high, &half, &half]), &low]);
    if value < 0 { wide.unary_minus() } else { wide }
}

fn translate_bool(symbols: &HashMap<&str, Int>, term: &Term) -> Result<Bool, SolverError> {
    match translate_term(symbols, term)? {
        Z3Value::Bool(b) => Ok(b),
        Z3Value::Int(_) => Err(SolverError::Unsupported(format!(
            "expected Bool, found `{term}`"
        ))),
    }
}

fn translate_int(symbols: &HashMap<&str, Int>, term: &Term) -> Result<Int, SolverError> {
    match translate_term(symbols, term)? {
        Z3Value::Int(i) => Ok(i),
        Z3Value::Bool(_) => Err(SolverError::Unsupported(format!(
            "expected Int, found `{term}`"
        ))),
    }
}

fn translate_bools(symbols: &HashMap<&str, Int>, terms: &[Term]) -> Result<Vec<Bool>, SolverError> {
    terms.iter().map(|t| translate_bool(symbols, t)).collect()
}

/// Translate a term into a Z3 AST.
fn translate_term(symbols: &HashMap<&str, Int>, term: &Term) -> Result<Z3Value, SolverError> {
    let value = match term {
        Term::BoolLit(b) => Z3Value::Bool(Bool::from_bool(*b)),
        Term::IntLit(n) => Z3Value::Int(int_literal(*n)),
        Term::Const(name) => Z3Value::Int(symbols.get(name.as_str()).cloned().ok_or_else(|| {
            SolverError::Unsupported(format!("undeclared constant `{name}`"))
        })?),

        Term::Not(a) => Z3Value::Bool(translate_bool(symbols, a)?.not()),
        Term::And(terms) => {
            let bools = translate_bools(symbols, terms)?;
            let refs: Vec<&Bool> = bools.iter().collect();
            Z3Value::Bool(Bool::and(&refs))
        }
        Term::Or(terms) => {
            let bools = translate_bools(symbols, terms)?;
            let refs: Vec<&Bool> = bools.iter().collect();
            Z3Value::Bool(Bool::or(&refs))
        }
        Term::Implies(a, b) => {
            let (a, b) = (translate_bool(symbols, a)?, translate_bool(symbols, b)?);
            Z3Value::Bool(a.implies(&b))
        }
        Term::Eq(a, b) => match (translate_term(symbols, a)?, translate_term(symbols, b)?) {
            (Z3Value::Bool(x), Z3Value::Bool(y)) => Z3Value::Bool(x.eq(&y)),
            (Z3Value::Int(x), Z3Value::Int(y)) => Z3Value::Bool(x.eq(&y)),
            _ => {
                return Err(SolverError::Unsupported(format!(
                    "sort mismatch in `{term}`"
                )));
            }
        },
        Term::Distinct(terms) => {
            let ints = terms
                .iter()
                .map(|t| translate_int(symbols, t))
                .collect::<Result<Vec<_>, _>>()?;
            let mut apart = Vec::new();
            for (i, x) in ints.iter().enumerate() {
                for y in &ints[i + 1..] {
                    apart.push(x.eq(y).not());
                }
            }
            let refs: Vec<&Bool> = apart.iter().collect();
            Z3Value::Bool(Bool::and(&refs))
        }
        Term::Ite(c, t, e) => {
            let cond = translate_bool(symbols, c)?;
            match (translate_term(symbols, t)?, translate_term(symbols, e)?) {
                (Z3Value::Int(t), Z3Value::Int(e)) => Z3Value::Int(cond.ite(&t, &e)),
                (Z3Value::Bool(t), Z3Value::Bool(e)) => Z3Value::Bool(cond.ite(&t, &e)),
                _ => {
                    return Err(SolverError::Unsupported(format!(
                        "ite branches differ in sort in `{term}`"
                    )));
                }
            }
        }

        Term::IntAdd(a, b) => translate_int_binary(symbols, a, b, |x, y| Int::add(&[&x, &y]))?,
        Term::IntSub(a, b) => translate_int_binary(symbols, a, b, |x, y| Int::sub(&[&x, &y]))?,
        Term::IntMul(a, b) => translate_int_binary(symbols, a, b, |x, y| Int::mul(&[&x, &y]))?,
        // Z3's `div` is SMT-LIB `div`, including the free value of `(div a 0)`.
        Term::IntDiv(a, b) => translate_int_binary(symbols, a, b, |x, y| x.div(&y))?,
        Term::IntNeg(a) => Z3Value::Int(translate_int(symbols, a)?.unary_minus()),

        Term::IntLt(a, b) => translate_int_cmp(symbols, a, b, |x, y| x.lt(&y))?,
        Term::IntLe(a, b) => translate_int_cmp(symbols, a, b, |x, y| x.le(&y))?,
        Term::IntGt(a, b) => translate_int_cmp(symbols, a, b, |x, y| x.gt(&y))?,
        Term::IntGe(a, b) => translate_int_cmp(symbols, a, b, |x, y| x.ge(&y))?,
    };
    Ok(value)
}

/// Helper for integer binary operations.
fn translate_int_binary<F>(
    symbols: &HashMap<&str, Int>,
    a: &Term,
    b: &Term,
    op: F,
) -> Result<Z3Value, SolverError>
where
    F: FnOnce(Int, Int) -> Int,
{
    let (x, y) = (translate_int(symbols, a)?, translate_int(symbols, b)?);
    Ok(Z3Value::Int(op(x, y)))
}

/// Helper for integer comparisons.
fn translate_int_cmp<F>(
    symbols: &HashMap<&str, Int>,
    a: &Term,
    b: &Term,
    op: F,
) -> Result<Z3Value, SolverError>
where
    F: FnOnce(Int, Int) -> Bool,
{
    let (x, y) = (translate_int(symbols, a)?, translate_int(symbols, b)?);
    Ok(Z3Value::Bool(op(x, y)))
}

/// Every declared constant, in declaration order, with model completion on.
fn extract_model(model: &z3::Model, stack: &AssertionStack, symbols: &HashMap<&str, Int>) -> Model {
    let assignments = stack
        .declared()
        .filter_map(|name| {
            let value: Int = model.eval(symbols.get(name)?, true)?;
            Some((name.to_string(), value.to_string()))
        })
        .collect();
    Model::with_assignments(assignments)
}
