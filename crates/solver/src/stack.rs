//! Scoped declaration/assertion storage shared by the backends.
//!
//! Each `push` opens a frame; `pop` discards everything declared or asserted
//! since the matching `push`. The bottom frame can only be cleared by
//! `reset`.

use minicheck_smtlib::command::Command;
use minicheck_smtlib::script::Script;
use minicheck_smtlib::sort::Sort;
use minicheck_smtlib::term::Term;

use crate::error::SolverError;

#[derive(Debug, Clone, Default)]
struct Frame {
    declared: Vec<String>,
    assertions: Vec<Term>,
}

#[derive(Debug, Clone)]
pub struct AssertionStack {
    frames: Vec<Frame>,
}

impl Default for AssertionStack {
    fn default() -> Self {
        Self::new()
    }
}

impl AssertionStack {
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::default()],
        }
    }

    /// Number of open `push` scopes.
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.frames
            .iter()
            .any(|f| f.declared.iter().any(|d| d == name))
    }

    /// Declare an integer constant. Redeclaring a live name is a no-op.
    pub fn declare(&mut self, name: &str) {
        if self.is_declared(name) {
            return;
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.declared.push(name.to_string());
        }
    }

    /// Record an assertion. Every constant it mentions must be declared.
    pub fn assert(&mut self, term: Term) -> Result<(), SolverError> {
        if let Some(name) = term.free_vars().into_iter().find(|v| !self.is_declared(v)) {
            return Err(SolverError::Unsupported(format!(
                "undeclared constant `{name}`"
            )));
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.assertions.push(term);
        }
        Ok(())
    }

    pub fn push(&mut self) {
        self.frames.push(Frame::default());
    }

    pub fn pop(&mut self) -> Result<(), SolverError> {
        if self.frames.len() <= 1 {
            return Err(SolverError::ScopeUnderflow);
        }
        self.frames.pop();
        Ok(())
    }

    pub fn reset(&mut self) {
        self.frames = vec![Frame::default()];
    }

    /// Live declarations in declaration order.
    pub fn declared(&self) -> impl Iterator<Item = &str> {
        self.frames
            .iter()
            .flat_map(|f| f.declared.iter().map(String::as_str))
    }

    /// Live assertions in assertion order.
    pub fn assertions(&self) -> impl Iterator<Item = &Term> {
        self.frames.iter().flat_map(|f| f.assertions.iter())
    }

    /// Render the live state as a one-shot query ending in
    /// `(check-sat)` and `(get-model)`.
    pub fn to_query(&self, logic: &str) -> Script {
        let mut script = Script::new();
        script.push(Command::SetOption("produce-models".into(), "true".into()));
        script.push(Command::SetLogic(logic.to_string()));
        script.extend(
            self.declared()
                .map(|name| Command::DeclareConst(name.to_string(), Sort::Int)),
        );
        script.extend(self.assertions().cloned().map(Command::Assert));
        script.push(Command::CheckSat);
        script.push(Command::GetModel);
        script
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gt0(name: &str) -> Term {
        Term::IntGt(Box::new(Term::var(name)), Box::new(Term::IntLit(0)))
    }

    #[test]
    fn pop_discards_frame() {
        let mut stack = AssertionStack::new();
        stack.declare("x_0");
        stack.assert(gt0("x_0")).unwrap();
        stack.push();
        stack.declare("y_0");
        stack.assert(gt0("y_0")).unwrap();
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.assertions().count(), 2);

        stack.pop().unwrap();
        assert_eq!(stack.depth(), 0);
        assert_eq!(stack.declared().collect::<Vec<_>>(), vec!["x_0"]);
        assert_eq!(stack.assertions().count(), 1);
    }

    #[test]
    fn pop_on_base_frame_underflows() {
        let mut stack = AssertionStack::new();
        assert_eq!(stack.pop(), Err(SolverError::ScopeUnderflow));
    }

    #[test]
    fn redeclare_is_noop() {
        let mut stack = AssertionStack::new();
        stack.declare("a");
        stack.push();
        stack.declare("a");
        assert_eq!(stack.declared().count(), 1);
    }

    #[test]
    fn assert_rejects_undeclared() {
        let mut stack = AssertionStack::new();
        let err = stack.assert(gt0("ghost")).unwrap_err();
        assert_eq!(
            err,
            SolverError::Unsupported("undeclared constant `ghost`".to_string())
        );
    }

    #[test]
    fn query_text() {
        let mut stack = AssertionStack::new();
        stack.declare("x_0");
        stack.assert(gt0("x_0")).unwrap();
        assert_eq!(
            stack.to_query("QF_NIA").to_string(),
            "(set-option :produce-models true)\n(set-logic QF_NIA)\n\
             (declare-const x_0 Int)\n(assert (> x_0 0))\n(check-sat)\n(get-model)"
        );
    }

    #[test]
    fn reset_clears_everything() {
        let mut stack = AssertionStack::new();
        stack.declare("x_0");
        stack.push();
        stack.reset();
        assert_eq!(stack.depth(), 0);
        assert!(!stack.is_declared("x_0"));
    }
}
