//! SMT-LIB2 text for the AST types.
//!
//! Every compound term is printed as a prefix application `(op arg ...)`;
//! the only special cases are literals, constants and empty connectives.

use std::fmt;

use crate::command::Command;
use crate::script::Script;
use crate::sort::Sort;
use crate::term::Term;

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Sort::Bool => "Bool",
            Sort::Int => "Int",
        })
    }
}

impl Term {
    /// Operator symbol and operands of a compound term.
    fn application(&self) -> Option<(&'static str, Vec<&Term>)> {
        let (op, args): (&str, Vec<&Term>) = match self {
            Term::BoolLit(_) | Term::IntLit(_) | Term::Const(_) => return None,
            Term::And(ts) if ts.is_empty() => return None,
            Term::Or(ts) if ts.is_empty() => return None,
            Term::Not(a) => ("not", vec![&**a]),
            Term::IntNeg(a) => ("-", vec![&**a]),
            Term::And(ts) => ("and", ts.iter().collect()),
            Term::Or(ts) => ("or", ts.iter().collect()),
            Term::Distinct(ts) => ("distinct", ts.iter().collect()),
            Term::Implies(a, b) => ("=>", vec![&**a, &**b]),
            Term::Eq(a, b) => ("=", vec![&**a, &**b]),
            Term::IntAdd(a, b) => ("+", vec![&**a, &**b]),
            Term::IntSub(a, b) => ("-", vec![&**a, &**b]),
            Term::IntMul(a, b) => ("*", vec![&**a, &**b]),
            Term::IntDiv(a, b) => ("div", vec![&**a, &**b]),
            Term::IntLt(a, b) => ("<", vec![&**a, &**b]),
            Term::IntLe(a, b) => ("<=", vec![&**a, &**b]),
            Term::IntGt(a, b) => (">", vec![&**a, &**b]),
            Term::IntGe(a, b) => (">=", vec![&**a, &**b]),
            Term::Ite(c, t, e) => ("ite", vec![&**c, &**t, &**e]),
        };
        Some((op, args))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some((op, args)) = self.application() {
            f.write_str("(")?;
            f.write_str(op)?;
            for arg in args {
                write!(f, " {arg}")?;
            }
            return f.write_str(")");
        }
        match self {
            Term::BoolLit(b) => write!(f, "{b}"),
            // Negative numerals are not SMT-LIB literals.
            Term::IntLit(n) if *n < 0 => write!(f, "(- {})", n.unsigned_abs()),
            Term::IntLit(n) => write!(f, "{n}"),
            Term::Const(name) => f.write_str(name),
            Term::And(_) => f.write_str("true"),
            _ => f.write_str("false"),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Comment(text) => write!(f, ";; {text}"),
            Command::SetLogic(logic) => write!(f, "(set-logic {logic})"),
            Command::SetOption(key, value) => write!(f, "(set-option :{key} {value})"),
            Command::DeclareConst(name, sort) => write!(f, "(declare-const {name} {sort})"),
            Command::Assert(term) => write!(f, "(assert {term})"),
            Command::Push(levels) => write!(f, "(push {levels})"),
            Command::Pop(levels) => write!(f, "(pop {levels})"),
            Command::CheckSat => f.write_str("(check-sat)"),
            Command::GetModel => f.write_str("(get-model)"),
            Command::Exit => f.write_str("(exit)"),
        }
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = "";
        for cmd in self.commands() {
            write!(f, "{sep}{cmd}")?;
            sep = "\n";
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::command::Command;
    use crate::script::Script;
    use crate::sort::Sort;
    use crate::term::Term;

    fn v(name: &str) -> Box<Term> {
        Box::new(Term::var(name))
    }

    fn n(value: i128) -> Box<Term> {
        Box::new(Term::IntLit(value))
    }

    fn renders(cases: &[(Term, &str)]) {
        for (term, text) in cases {
            assert_eq!(term.to_string(), *text, "{term:?}");
        }
    }

    #[test]
    fn atoms() {
        renders(&[
            (Term::BoolLit(false), "false"),
            (Term::IntLit(0), "0"),
            (Term::IntLit(17), "17"),
            (Term::IntLit(-17), "(- 17)"),
            (Term::var("x_3"), "x_3"),
        ]);
        assert_eq!(format!("{} {}", Sort::Int, Sort::Bool), "Int Bool");
    }

    #[test]
    fn most_negative_literal() {
        assert_eq!(
            Term::IntLit(i128::MIN).to_string(),
            "(- 170141183460469231731687303715884105728)"
        );
    }

    #[test]
    fn connectives() {
        renders(&[
            (Term::And(vec![]), "true"),
            (Term::Or(vec![]), "false"),
            (Term::And(vec![Term::var("p")]), "(and p)"),
            (
                Term::Or(vec![Term::var("p"), Term::var("q"), Term::var("r")]),
                "(or p q r)",
            ),
            (Term::var("p").negate(), "(not p)"),
            (Term::Implies(v("g"), v("h")), "(=> g h)"),
            (
                Term::Distinct(vec![Term::var("a"), Term::IntLit(2)]),
                "(distinct a 2)",
            ),
        ]);
    }

    #[test]
    fn arithmetic_and_relations() {
        renders(&[
            (Term::IntSub(v("a"), n(-2)), "(- a (- 2))"),
            (Term::IntNeg(v("a")), "(- a)"),
            (Term::IntDiv(v("a"), v("b")), "(div a b)"),
            (Term::IntLe(v("i_1"), n(10)), "(<= i_1 10)"),
            (Term::IntGe(v("i_1"), n(0)), "(>= i_1 0)"),
            (Term::Ite(v("g_0"), v("y_0"), v("y_1")), "(ite g_0 y_0 y_1)"),
        ]);
    }

    #[test]
    fn nesting() {
        let sum = Term::IntAdd(v("a_0"), Box::new(Term::IntMul(v("b_0"), n(2))));
        assert_eq!(
            Term::var("c_0").equals(sum).to_string(),
            "(= c_0 (+ a_0 (* b_0 2)))"
        );
    }

    #[test]
    fn command_text() {
        let cases = [
            (Command::SetLogic("QF_NIA".into()), "(set-logic QF_NIA)"),
            (
                Command::SetOption("produce-models".into(), "true".into()),
                "(set-option :produce-models true)",
            ),
            (
                Command::DeclareConst("q_0".into(), Sort::Int),
                "(declare-const q_0 Int)",
            ),
            (Command::Assert(Term::BoolLit(true)), "(assert true)"),
            (Command::Push(1), "(push 1)"),
            (Command::Pop(3), "(pop 3)"),
            (Command::Comment("branch".into()), ";; branch"),
            (Command::Exit, "(exit)"),
        ];
        for (cmd, text) in cases {
            assert_eq!(cmd.to_string(), text);
        }
    }

    #[test]
    fn script_has_no_trailing_newline() {
        let script = Script::with_commands(vec![
            Command::DeclareConst("x_0".into(), Sort::Int),
            Command::Assert(Term::var("x_0").equals(Term::IntLit(0))),
            Command::CheckSat,
            Command::GetModel,
        ]);
        assert_eq!(
            script.to_string(),
            "(declare-const x_0 Int)\n(assert (= x_0 0))\n(check-sat)\n(get-model)"
        );
        assert_eq!(Script::new().to_string(), "");
    }
}
