//! Property tests for the builtin evaluator on fully determined formulas,
//! where its verdict must match plain integer arithmetic.

use minicheck_smtlib::term::Term;
use minicheck_solver::model::parse_int_literal;
use minicheck_solver::{EvalSolver, SolverBackend, SolverResult};
use proptest::prelude::*;

fn v(name: &str) -> Box<Term> {
    Box::new(Term::var(name))
}

fn n(value: i128) -> Box<Term> {
    Box::new(Term::IntLit(value))
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Add,
    Sub,
    Mul,
}

impl Op {
    fn term(self, lhs: Box<Term>, rhs: Box<Term>) -> Term {
        match self {
            Op::Add => Term::IntAdd(lhs, rhs),
            Op::Sub => Term::IntSub(lhs, rhs),
            Op::Mul => Term::IntMul(lhs, rhs),
        }
    }

    fn apply(self, a: i128, b: i128) -> i128 {
        match self {
            Op::Add => a + b,
            Op::Sub => a - b,
            Op::Mul => a * b,
        }
    }
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![Just(Op::Add), Just(Op::Sub), Just(Op::Mul)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// x == a; y == x op b; y > c
    #[test]
    fn determined_chain_matches_arithmetic(
        a in -1000i128..1000,
        b in -1000i128..1000,
        c in -1000i128..1000,
        op in op(),
    ) {
        let mut solver = EvalSolver::new();
        solver.declare_int("x").unwrap();
        solver.declare_int("y").unwrap();
        solver.assert(&Term::var("x").equals(Term::IntLit(a))).unwrap();
        solver.assert(&Term::var("y").equals(op.term(v("x"), n(b)))).unwrap();
        solver.assert(&Term::IntGt(v("y"), n(c))).unwrap();

        let y = op.apply(a, b);
        match solver.check().unwrap() {
            SolverResult::Sat(model) => {
                prop_assert!(y > c);
                prop_assert_eq!(model.and_then(|m| m.int_value("y")), Some(y));
            }
            SolverResult::Unsat => prop_assert!(y <= c),
            SolverResult::Unknown(reason) => {
                prop_assert!(false, "undecided on a determined formula: {}", reason)
            }
        }
    }

    /// b * q == a has a model exactly when b divides a.
    #[test]
    fn quotient_constraint_is_exact(a in -500i128..500, b in -20i128..20) {
        prop_assume!(b != 0);
        let mut solver = EvalSolver::new();
        solver.declare_int("q").unwrap();
        solver
            .assert(&Term::IntMul(n(b), v("q")).equals(Term::IntLit(a)))
            .unwrap();

        let result = solver.check().unwrap();
        if a % b == 0 {
            prop_assert_eq!(result.model().and_then(|m| m.int_value("q")), Some(a / b));
        } else {
            prop_assert_eq!(result, SolverResult::Unsat);
        }
    }

    /// A popped contradiction leaves the earlier verdict intact.
    #[test]
    fn pop_discards_scoped_assertions(a in -100i128..100) {
        let mut solver = EvalSolver::new();
        solver.declare_int("x").unwrap();
        solver.assert(&Term::var("x").equals(Term::IntLit(a))).unwrap();
        let before = solver.check().unwrap();

        solver.push().unwrap();
        solver.assert(&Term::var("x").equals(Term::IntLit(a)).negate()).unwrap();
        prop_assert_eq!(solver.check().unwrap(), SolverResult::Unsat);
        solver.pop().unwrap();

        prop_assert_eq!(solver.check().unwrap(), before);
    }

    /// Printed literals decode to the same value.
    #[test]
    fn printed_literals_decode(value in any::<i128>()) {
        prop_assert_eq!(parse_int_literal(&Term::IntLit(value).to_string()), Some(value));
    }
}
