//! Static single assignment form with bounded loop unrolling.
//!
//! The SSA form is a flat instruction sequence: control flow is erased into
//! version-stamped definitions plus guard and assertion markers. How branch
//! conditions interact with definitions is decided by the program's
//! [`BranchPolicy`].

use std::collections::BTreeMap;
use std::fmt;

use crate::ast::{Assign, Cond, Expr, Stmt};
use crate::branch::BranchPolicy;
use crate::error::AnalysisError;

/// Which of two programs under comparison a variable belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Namespace {
    #[default]
    First,
    Second,
}

impl Namespace {
    /// Suffix appended to solver symbols. `@` never occurs in identifiers.
    pub fn suffix(self) -> &'static str {
        match self {
            Namespace::First => "",
            Namespace::Second => "@2",
        }
    }

    /// Label used when reporting values, e.g. `y (prog2)`.
    pub fn label(self) -> &'static str {
        match self {
            Namespace::First => "prog1",
            Namespace::Second => "prog2",
        }
    }
}

/// A versioned variable: the `version`-th assignment to `base`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SsaVar {
    pub base: String,
    pub version: u32,
    pub namespace: Namespace,
}

impl SsaVar {
    pub fn new(base: impl Into<String>, version: u32) -> Self {
        Self {
            base: base.into(),
            version,
            namespace: Namespace::First,
        }
    }

    pub fn in_namespace(&self, namespace: Namespace) -> Self {
        Self {
            namespace,
            ..self.clone()
        }
    }

    /// Name of the solver constant for this variable.
    pub fn symbol(&self) -> String {
        format!("{}_{}{}", self.base, self.version, self.namespace.suffix())
    }
}

impl fmt::Display for SsaVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.base, self.version)
    }
}

pub type SsaExpr = Expr<SsaVar>;
pub type SsaCond = Cond<SsaVar>;

/// One SSA instruction.
///
/// `path` holds the enclosing guard conditions. It is always empty under
/// [`BranchPolicy::Unconditional`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SsaInstruction {
    /// `target := expr`
    Define {
        target: SsaVar,
        expr: SsaExpr,
        path: Vec<SsaCond>,
    },
    /// `target := phi(cond, then_var, else_var)`; only produced by
    /// [`BranchPolicy::Guarded`]. `path` is the path of the guard that
    /// produced `cond`.
    Merge {
        target: SsaVar,
        cond: SsaCond,
        then_var: SsaVar,
        else_var: SsaVar,
        path: Vec<SsaCond>,
    },
    /// Branch or loop-iteration condition.
    Guard { cond: SsaCond, path: Vec<SsaCond> },
    /// Start of an else branch. Contributes no constraint.
    ElseMarker,
    Assertion { cond: SsaCond, path: Vec<SsaCond> },
}

impl SsaInstruction {
    /// The variable this instruction defines, if any.
    pub fn target(&self) -> Option<&SsaVar> {
        match self {
            SsaInstruction::Define { target, .. } | SsaInstruction::Merge { target, .. } => {
                Some(target)
            }
            _ => None,
        }
    }

    /// For assertions, the condition actually constrained: `cond` itself,
    /// or `!(path) || cond` inside a guarded branch.
    pub fn effective_condition(&self) -> Option<SsaCond> {
        match self {
            SsaInstruction::Assertion { cond, path } => Some(implied_by(path, cond.clone())),
            _ => None,
        }
    }

    fn map_vars(&self, f: &mut impl FnMut(&SsaVar) -> SsaVar) -> SsaInstruction {
        match self {
            SsaInstruction::Define { target, expr, path } => SsaInstruction::Define {
                target: f(target),
                expr: expr.map_vars(f),
                path: map_path(path, f),
            },
            SsaInstruction::Merge {
                target,
                cond,
                then_var,
                else_var,
                path,
            } => SsaInstruction::Merge {
                target: f(target),
                cond: cond.map_vars(f),
                then_var: f(then_var),
                else_var: f(else_var),
                path: map_path(path, f),
            },
            SsaInstruction::Guard { cond, path } => SsaInstruction::Guard {
                cond: cond.map_vars(f),
                path: map_path(path, f),
            },
            SsaInstruction::ElseMarker => SsaInstruction::ElseMarker,
            SsaInstruction::Assertion { cond, path } => SsaInstruction::Assertion {
                cond: cond.map_vars(f),
                path: map_path(path, f),
            },
        }
    }
}

fn map_path(path: &[SsaCond], f: &mut impl FnMut(&SsaVar) -> SsaVar) -> Vec<SsaCond> {
    path.iter().map(|c| c.map_vars(f)).collect()
}

/// `!(p1 && p2 && ...) || cond`, or `cond` when the path is empty.
pub fn implied_by(path: &[SsaCond], cond: SsaCond) -> SsaCond {
    match path_conjunction(path) {
        Some(guard) => guard.negated().or(cond),
        None => cond,
    }
}

/// Left-nested conjunction of the path, `None` when empty.
pub fn path_conjunction(path: &[SsaCond]) -> Option<SsaCond> {
    path.iter().cloned().reduce(|acc, c| acc.and(c))
}

impl fmt::Display for SsaInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SsaInstruction::Define { target, expr, .. } => write!(f, "{target} := {expr}"),
            SsaInstruction::Merge {
                target,
                cond,
                then_var,
                else_var,
                ..
            } => write!(f, "{target} := phi({cond}, {then_var}, {else_var})"),
            SsaInstruction::Guard { cond, .. } => write!(f, "if ({cond})"),
            SsaInstruction::ElseMarker => write!(f, "else"),
            SsaInstruction::Assertion { cond, path } => {
                write!(f, "assert({})", implied_by(path, cond.clone()))
            }
        }
    }
}

/// Output of one conversion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsaProgram {
    pub instructions: Vec<SsaInstruction>,
    pub policy: BranchPolicy,
    pub namespace: Namespace,
    /// Current version of every base name when conversion finished.
    pub final_versions: BTreeMap<String, SsaVar>,
}

impl SsaProgram {
    /// Textual rendering, one line per instruction.
    pub fn lines(&self) -> Vec<String> {
        self.instructions.iter().map(ToString::to_string).collect()
    }

    /// The same program with every variable moved into `namespace`.
    pub fn in_namespace(&self, namespace: Namespace) -> SsaProgram {
        let mut rename = |v: &SsaVar| v.in_namespace(namespace);
        SsaProgram {
            instructions: self
                .instructions
                .iter()
                .map(|inst| inst.map_vars(&mut rename))
                .collect(),
            policy: self.policy,
            namespace,
            final_versions: self
                .final_versions
                .iter()
                .map(|(base, v)| (base.clone(), v.in_namespace(namespace)))
                .collect(),
        }
    }

    /// Targets of every definition and merge, in program order.
    pub fn defined_vars(&self) -> impl Iterator<Item = &SsaVar> {
        self.instructions.iter().filter_map(SsaInstruction::target)
    }

    /// The highest-numbered version defined for `base`.
    pub fn highest_version(&self, base: &str) -> Option<&SsaVar> {
        self.defined_vars()
            .filter(|v| v.base == base)
            .max_by_key(|v| v.version)
    }

    /// Base names with at least one definition, sorted.
    pub fn bases(&self) -> Vec<&str> {
        let mut bases: Vec<&str> = self.defined_vars().map(|v| v.base.as_str()).collect();
        bases.sort_unstable();
        bases.dedup();
        bases
    }

    pub fn count_defines(&self) -> usize {
        self.instructions
            .iter()
            .filter(|i| matches!(i, SsaInstruction::Define { .. }))
            .count()
    }

    pub fn count_assertions(&self) -> usize {
        self.instructions
            .iter()
            .filter(|i| matches!(i, SsaInstruction::Assertion { .. }))
            .count()
    }
}

/// Next and current version per base name.
///
/// `next` only ever grows; `current` can be snapshotted and restored around
/// branches.
#[derive(Debug, Clone, Default)]
pub struct VersionTable {
    next: BTreeMap<String, u32>,
    current: BTreeMap<String, u32>,
}

impl VersionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh version for `base` and make it current.
    pub fn allocate(&mut self, base: &str) -> SsaVar {
        let slot = self.next.entry(base.to_string()).or_insert(0);
        let version = *slot;
        *slot += 1;
        self.current.insert(base.to_string(), version);
        SsaVar::new(base, version)
    }

    pub fn current(&self, base: &str) -> Option<SsaVar> {
        self.current.get(base).map(|&v| SsaVar::new(base, v))
    }

    pub fn snapshot(&self) -> BTreeMap<String, u32> {
        self.current.clone()
    }

    pub fn restore(&mut self, snapshot: BTreeMap<String, u32>) {
        self.current = snapshot;
    }

    pub fn current_vars(&self) -> BTreeMap<String, SsaVar> {
        self.current
            .iter()
            .map(|(base, &v)| (base.clone(), SsaVar::new(base.as_str(), v)))
            .collect()
    }

    pub fn reset(&mut self) {
        self.next.clear();
        self.current.clear();
    }
}

/// Converts statement trees into SSA form.
///
/// Version numbering continues across `convert` calls until [`reset`]
/// is called; independent programs need a reset or a fresh converter.
///
/// [`reset`]: SsaConverter::reset
#[derive(Debug, Clone, Default)]
pub struct SsaConverter {
    policy: BranchPolicy,
    versions: VersionTable,
    path: Vec<SsaCond>,
    out: Vec<SsaInstruction>,
}

impl SsaConverter {
    pub fn new(policy: BranchPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> BranchPolicy {
        self.policy
    }

    /// Forget every version recorded so far.
    pub fn reset(&mut self) {
        self.versions.reset();
        self.path.clear();
        self.out.clear();
    }

    /// Convert `stmts`, unrolling every loop `unroll_depth` times.
    ///
    /// Each unrolled loop ends with an assertion that its condition is false:
    /// executions needing more iterations are excluded, not analysed.
    pub fn convert(
        &mut self,
        stmts: &[Stmt],
        unroll_depth: usize,
    ) -> Result<SsaProgram, AnalysisError> {
        if unroll_depth == 0 {
            return Err(AnalysisError::InvalidConfig(
                "unroll depth must be at least 1".to_string(),
            ));
        }
        self.path.clear();
        self.out.clear();
        self.block(stmts, unroll_depth)?;

        let program = SsaProgram {
            instructions: std::mem::take(&mut self.out),
            policy: self.policy,
            namespace: Namespace::First,
            final_versions: self.versions.current_vars(),
        };
        tracing::debug!(
            policy = %self.policy,
            unroll_depth,
            instructions = program.instructions.len(),
            "Converted program to SSA"
        );
        Ok(program)
    }

    fn block(&mut self, stmts: &[Stmt], unroll: usize) -> Result<(), AnalysisError> {
        for stmt in stmts {
            self.stmt(stmt, unroll)?;
        }
        Ok(())
    }

    fn stmt(&mut self, stmt: &Stmt, unroll: usize) -> Result<(), AnalysisError> {
        match stmt {
            Stmt::Assign(assign) => self.assign(assign),
            Stmt::Assert(cond) => {
                let cond = self.resolve_cond(cond)?;
                self.out.push(SsaInstruction::Assertion {
                    cond,
                    path: self.path.clone(),
                });
                Ok(())
            }
            Stmt::If {
                cond,
                body,
                else_body,
            } => self.branch(cond, body, else_body.as_deref(), unroll),
            Stmt::While { cond, body } => self.unrolled_loop(cond, body, None, unroll),
            Stmt::For {
                init,
                cond,
                update,
                body,
            } => {
                if let Some(init) = init {
                    self.assign(init)?;
                }
                self.unrolled_loop(cond, body, update.as_ref(), unroll)
            }
        }
    }

    fn assign(&mut self, assign: &Assign) -> Result<(), AnalysisError> {
        // The right-hand side reads the versions current before the write.
        let expr = self.resolve_expr(&assign.expr)?;
        let target = self.versions.allocate(&assign.target);
        tracing::trace!(%target, %expr, "Define");
        self.out.push(SsaInstruction::Define {
            target,
            expr,
            path: self.path.clone(),
        });
        Ok(())
    }

    fn guard(&mut self, cond: &SsaCond) {
        self.out.push(SsaInstruction::Guard {
            cond: cond.clone(),
            path: self.path.clone(),
        });
    }

    fn branch(
        &mut self,
        cond: &Cond,
        body: &[Stmt],
        else_body: Option<&[Stmt]>,
        unroll: usize,
    ) -> Result<(), AnalysisError> {
        let cond = self.resolve_cond(cond)?;
        self.guard(&cond);

        if !self.policy.merges_branches() {
            self.block(body, unroll)?;
            if let Some(else_body) = else_body {
                self.out.push(SsaInstruction::ElseMarker);
                self.block(else_body, unroll)?;
            }
            return Ok(());
        }

        let before = self.versions.snapshot();
        let guard_path = self.path.clone();
        self.path.push(cond.clone());
        self.block(body, unroll)?;
        self.path.pop();
        let then_state = self.versions.snapshot();

        self.versions.restore(before);
        if let Some(else_body) = else_body {
            self.out.push(SsaInstruction::ElseMarker);
            self.path.push(cond.clone().negated());
            self.block(else_body, unroll)?;
            self.path.pop();
        }
        let else_state = self.versions.snapshot();

        self.merge(&cond, guard_path, then_state, else_state);
        Ok(())
    }

    fn unrolled_loop(
        &mut self,
        cond: &Cond,
        body: &[Stmt],
        update: Option<&Assign>,
        unroll: usize,
    ) -> Result<(), AnalysisError> {
        let outer_path = self.path.len();
        for _ in 0..unroll {
            let guard = self.resolve_cond(cond)?;
            self.guard(&guard);
            let before = self.versions.snapshot();
            let guard_path = self.path.clone();
            if self.policy.merges_branches() {
                self.path.push(guard.clone());
            }
            self.block(body, unroll)?;
            if let Some(update) = update {
                self.assign(update)?;
            }
            if self.policy.merges_branches() {
                let iteration = self.versions.snapshot();
                self.merge(&guard, guard_path, iteration, before);
            }
        }
        self.path.truncate(outer_path);

        let exit = self.resolve_cond(cond)?.negated();
        self.out.push(SsaInstruction::Assertion {
            cond: exit,
            path: self.path.clone(),
        });
        Ok(())
    }

    /// Join two branch states: every base whose versions differ gets a fresh
    /// version defined by a `Merge`. A base known to only one side keeps
    /// that side's version.
    fn merge(
        &mut self,
        cond: &SsaCond,
        path: Vec<SsaCond>,
        then_state: BTreeMap<String, u32>,
        else_state: BTreeMap<String, u32>,
    ) {
        let mut joined = else_state.clone();
        for (base, &then_version) in &then_state {
            match else_state.get(base) {
                Some(&else_version) if else_version != then_version => {
                    let target = self.versions.allocate(base);
                    joined.insert(base.clone(), target.version);
                    self.out.push(SsaInstruction::Merge {
                        target,
                        cond: cond.clone(),
                        then_var: SsaVar::new(base.as_str(), then_version),
                        else_var: SsaVar::new(base.as_str(), else_version),
                        path: path.clone(),
                    });
                }
                Some(_) => {}
                None => {
                    joined.insert(base.clone(), then_version);
                }
            }
        }
        self.versions.restore(joined);
    }

    fn resolve_expr(&self, expr: &Expr) -> Result<SsaExpr, AnalysisError> {
        expr.try_map_vars(&mut |name| self.lookup(name))
    }

    fn resolve_cond(&self, cond: &Cond) -> Result<SsaCond, AnalysisError> {
        cond.try_map_vars(&mut |name| self.lookup(name))
    }

    fn lookup(&self, name: &str) -> Result<SsaVar, AnalysisError> {
        self.versions
            .current(name)
            .ok_or_else(|| AnalysisError::UndefinedVariable {
                name: name.to_string(),
            })
    }
}
