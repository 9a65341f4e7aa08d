/// Integer and boolean SMT-LIB terms.
///
/// Only the fragment the constraint builder emits is modelled. Integer
/// literals are `i128`; SMT-LIB integers are unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    BoolLit(bool),
    IntLit(i128),
    /// Reference to a declared constant.
    Const(String),

    Not(Box<Term>),
    And(Vec<Term>),
    Or(Vec<Term>),
    Implies(Box<Term>, Box<Term>),
    Eq(Box<Term>, Box<Term>),
    /// Pairwise inequality of all operands.
    Distinct(Vec<Term>),
    Ite(Box<Term>, Box<Term>, Box<Term>),

    IntAdd(Box<Term>, Box<Term>),
    IntSub(Box<Term>, Box<Term>),
    IntMul(Box<Term>, Box<Term>),
    /// SMT-LIB `div`: Euclidean, remainder never negative.
    IntDiv(Box<Term>, Box<Term>),
    IntNeg(Box<Term>),
    IntLt(Box<Term>, Box<Term>),
    IntLe(Box<Term>, Box<Term>),
    IntGt(Box<Term>, Box<Term>),
    IntGe(Box<Term>, Box<Term>),
}

impl Term {
    /// Shorthand for `Term::Const(name.into())`.
    pub fn var(name: impl Into<String>) -> Self {
        Term::Const(name.into())
    }

    /// `(= self other)`
    pub fn equals(self, other: Term) -> Self {
        Term::Eq(Box::new(self), Box::new(other))
    }

    /// `(not self)`
    pub fn negate(self) -> Self {
        Term::Not(Box::new(self))
    }

    /// Collect the names of every `Const` in this term, in first-occurrence order.
    pub fn free_vars(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_vars(&mut out);
        out
    }

    /// Immediate subterms, left to right.
    pub fn children(&self) -> Vec<&Term> {
        match self {
            Term::BoolLit(_) | Term::IntLit(_) | Term::Const(_) => Vec::new(),
            Term::Not(a) | Term::IntNeg(a) => vec![a.as_ref()],
            Term::And(terms) | Term::Or(terms) | Term::Distinct(terms) => terms.iter().collect(),
            Term::Implies(a, b)
            | Term::Eq(a, b)
            | Term::IntAdd(a, b)
            | Term::IntSub(a, b)
            | Term::IntMul(a, b)
            | Term::IntDiv(a, b)
            | Term::IntLt(a, b)
            | Term::IntLe(a, b)
            | Term::IntGt(a, b)
            | Term::IntGe(a, b) => vec![a.as_ref(), b.as_ref()],
            Term::Ite(c, t, e) => vec![c.as_ref(), t.as_ref(), e.as_ref()],
        }
    }

    fn collect_vars<'a>(&'a self, out: &mut Vec<&'a str>) {
        if let Term::Const(name) = self {
            if !out.contains(&name.as_str()) {
                out.push(name);
            }
            return;
        }
        for child in self.children() {
            child.collect_vars(out);
        }
    }
}
