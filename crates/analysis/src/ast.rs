//! Statement tree for the mini-language.
//!
//! Expressions and conditions are generic over the variable representation:
//! the parser produces `Expr<String>` (source identifiers), the SSA converter
//! rewrites them into `Expr<SsaVar>` with [`Expr::try_map_vars`].

use std::convert::Infallible;
use std::fmt;

/// Arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
        }
    }

    /// Binding strength: multiplicative operators bind tighter.
    fn precedence(self) -> u8 {
        match self {
            BinOp::Add | BinOp::Sub => 1,
            BinOp::Mul | BinOp::Div => 2,
        }
    }
}

/// Relational or equality operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Lt,
    Gt,
    Eq,
    Ne,
    Le,
    Ge,
}

impl CmpOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Lt => "<",
            CmpOp::Gt => ">",
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Le => "<=",
            CmpOp::Ge => ">=",
        }
    }
}

/// Integer expression. Parentheses are structural and not retained.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr<V = String> {
    Num(i128),
    Var(V),
    Binary {
        op: BinOp,
        lhs: Box<Expr<V>>,
        rhs: Box<Expr<V>>,
    },
}

impl<V> Expr<V> {
    pub fn binary(op: BinOp, lhs: Expr<V>, rhs: Expr<V>) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Rebuild the expression with every variable passed through `f`,
    /// left to right. Stops at the first error.
    pub fn try_map_vars<W, E>(
        &self,
        f: &mut impl FnMut(&V) -> Result<W, E>,
    ) -> Result<Expr<W>, E> {
        Ok(match self {
            Expr::Num(n) => Expr::Num(*n),
            Expr::Var(v) => Expr::Var(f(v)?),
            Expr::Binary { op, lhs, rhs } => {
                let lhs = lhs.try_map_vars(f)?;
                let rhs = rhs.try_map_vars(f)?;
                Expr::binary(*op, lhs, rhs)
            }
        })
    }

    pub fn map_vars<W>(&self, f: &mut impl FnMut(&V) -> W) -> Expr<W> {
        match self.try_map_vars(&mut |v| Ok::<_, Infallible>(f(v))) {
            Ok(expr) => expr,
            Err(never) => match never {},
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Binary { op, .. } => op.precedence(),
            _ => 3,
        }
    }
}

/// Boolean condition over expressions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Cond<V = String> {
    Compare {
        op: CmpOp,
        lhs: Expr<V>,
        rhs: Expr<V>,
    },
    Not(Box<Cond<V>>),
    And(Box<Cond<V>>, Box<Cond<V>>),
    Or(Box<Cond<V>>, Box<Cond<V>>),
    /// Bare expression, true when non-zero.
    Truthy(Expr<V>),
}

impl<V> Cond<V> {
    pub fn compare(op: CmpOp, lhs: Expr<V>, rhs: Expr<V>) -> Self {
        Cond::Compare { op, lhs, rhs }
    }

    pub fn negated(self) -> Self {
        Cond::Not(Box::new(self))
    }

    pub fn and(self, other: Cond<V>) -> Self {
        Cond::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Cond<V>) -> Self {
        Cond::Or(Box::new(self), Box::new(other))
    }

    pub fn try_map_vars<W, E>(
        &self,
        f: &mut impl FnMut(&V) -> Result<W, E>,
    ) -> Result<Cond<W>, E> {
        Ok(match self {
            Cond::Compare { op, lhs, rhs } => {
                let lhs = lhs.try_map_vars(f)?;
                let rhs = rhs.try_map_vars(f)?;
                Cond::compare(*op, lhs, rhs)
            }
            Cond::Not(inner) => inner.try_map_vars(f)?.negated(),
            Cond::And(a, b) => {
                let a = a.try_map_vars(f)?;
                a.and(b.try_map_vars(f)?)
            }
            Cond::Or(a, b) => {
                let a = a.try_map_vars(f)?;
                a.or(b.try_map_vars(f)?)
            }
            Cond::Truthy(e) => Cond::Truthy(e.try_map_vars(f)?),
        })
    }

    pub fn map_vars<W>(&self, f: &mut impl FnMut(&V) -> W) -> Cond<W> {
        match self.try_map_vars(&mut |v| Ok::<_, Infallible>(f(v))) {
            Ok(cond) => cond,
            Err(never) => match never {},
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Cond::Or(..) => 1,
            Cond::And(..) => 2,
            _ => 3,
        }
    }
}

/// `target := expr`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assign {
    pub target: String,
    pub expr: Expr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    Assign(Assign),
    If {
        cond: Cond,
        body: Vec<Stmt>,
        else_body: Option<Vec<Stmt>>,
    },
    While {
        cond: Cond,
        body: Vec<Stmt>,
    },
    For {
        init: Option<Assign>,
        cond: Cond,
        update: Option<Assign>,
        body: Vec<Stmt>,
    },
    Assert(Cond),
}

// ---- Pretty printing ----
//
// Parentheses are emitted only where precedence or left-associativity
// requires them, so printing a parsed tree and parsing it again yields the
// same tree.

impl<V: fmt::Display> fmt::Display for Expr<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Num(n) => write!(f, "{n}"),
            Expr::Var(v) => write!(f, "{v}"),
            Expr::Binary { op, lhs, rhs } => {
                let prec = op.precedence();
                if lhs.precedence() < prec {
                    write!(f, "({lhs})")?;
                } else {
                    write!(f, "{lhs}")?;
                }
                write!(f, " {} ", op.symbol())?;
                if rhs.precedence() <= prec {
                    write!(f, "({rhs})")
                } else {
                    write!(f, "{rhs}")
                }
            }
        }
    }
}

impl<V: fmt::Display> fmt::Display for Cond<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cond::Compare { op, lhs, rhs } => write!(f, "{lhs} {} {rhs}", op.symbol()),
            Cond::Truthy(e) => write!(f, "{e}"),
            Cond::Not(inner) => match inner.as_ref() {
                Cond::Not(_) | Cond::Truthy(Expr::Num(_) | Expr::Var(_)) => write!(f, "!{inner}"),
                _ => write!(f, "!({inner})"),
            },
            Cond::And(a, b) | Cond::Or(a, b) => {
                let prec = self.precedence();
                let symbol = if prec == 1 { "||" } else { "&&" };
                if a.precedence() < prec {
                    write!(f, "({a})")?;
                } else {
                    write!(f, "{a}")?;
                }
                write!(f, " {symbol} ")?;
                if b.precedence() <= prec {
                    write!(f, "({b})")
                } else {
                    write!(f, "{b}")
                }
            }
        }
    }
}

impl fmt::Display for Assign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} := {}", self.target, self.expr)
    }
}

const INDENT: &str = "    ";

impl Stmt {
    fn render(&self, depth: usize, out: &mut String) {
        let pad = INDENT.repeat(depth);
        match self {
            Stmt::Assign(assign) => out.push_str(&format!("{pad}{assign};\n")),
            Stmt::Assert(cond) => out.push_str(&format!("{pad}assert({cond});\n")),
            Stmt::If {
                cond,
                body,
                else_body,
            } => {
                out.push_str(&format!("{pad}if ({cond}) {{\n"));
                render_block(body, depth + 1, out);
                match else_body {
                    Some(else_body) => {
                        out.push_str(&format!("{pad}}} else {{\n"));
                        render_block(else_body, depth + 1, out);
                        out.push_str(&format!("{pad}}}\n"));
                    }
                    None => out.push_str(&format!("{pad}}}\n")),
                }
            }
            Stmt::While { cond, body } => {
                out.push_str(&format!("{pad}while ({cond}) {{\n"));
                render_block(body, depth + 1, out);
                out.push_str(&format!("{pad}}}\n"));
            }
            Stmt::For {
                init,
                cond,
                update,
                body,
            } => {
                let init = init.as_ref().map(Assign::to_string).unwrap_or_default();
                let update = update
                    .as_ref()
                    .map(|u| format!(" {u}"))
                    .unwrap_or_default();
                out.push_str(&format!("{pad}for ({init}; {cond};{update}) {{\n"));
                render_block(body, depth + 1, out);
                out.push_str(&format!("{pad}}}\n"));
            }
        }
    }
}

fn render_block(stmts: &[Stmt], depth: usize, out: &mut String) {
    for stmt in stmts {
        stmt.render(depth, out);
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.render(0, &mut out);
        f.write_str(out.trim_end_matches('\n'))
    }
}

/// Canonical source text for a program, one statement per line.
pub fn print_program(stmts: &[Stmt]) -> String {
    let mut out = String::new();
    render_block(stmts, 0, &mut out);
    out
}
