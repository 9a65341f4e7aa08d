use std::io::Write;
use std::process::{Command, Stdio};

use minicheck_smtlib::script::Script;
use minicheck_smtlib::term::Term;

use crate::backend::SolverBackend;
use crate::config::{SolverConfig, SolverKind};
use crate::error::SolverError;
use crate::parser::parse_solver_output;
use crate::result::SolverResult;
use crate::stack::AssertionStack;

/// Logic announced to external solvers: integer arithmetic with
/// multiplication between variables.
const LOGIC: &str = "QF_NIA";

/// External SMT solver driven over stdin.
///
/// Scopes are kept in memory; every `check` replays the live declarations
/// and assertions into a fresh process, so a crashed or timed-out solver
/// never leaves stale state behind.
#[derive(Debug)]
pub struct CliSolver {
    config: SolverConfig,
    stack: AssertionStack,
}

impl CliSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            stack: AssertionStack::new(),
        }
    }

    /// Create a solver with auto-detected binary location and default settings.
    pub fn with_default_config_for(kind: SolverKind) -> Result<Self, SolverError> {
        Ok(Self::new(SolverConfig::auto_detect_for(kind)?))
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// The query the next `check` would send.
    pub fn query(&self) -> Script {
        self.stack.to_query(LOGIC)
    }

    /// Feed `smtlib` to a fresh solver process and read its verdict.
    pub fn check_sat_raw(&self, smtlib: &str) -> Result<SolverResult, SolverError> {
        self.config.validate()?;
        let kind = self.config.kind;
        let failed = |what: &str, err: std::io::Error| {
            SolverError::ProcessError(format!("{kind}: cannot {what}: {err}"))
        };

        let mut child = Command::new(&self.config.solver_path)
            .args(self.config.build_args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| failed("start", e))?;

        // Dropping the handle closes stdin so the solver sees end of input.
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(smtlib.as_bytes())
                .map_err(|e| failed("write query", e))?;
        }
        let output = child.wait_with_output().map_err(|e| failed("wait", e))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stdout.trim() == "timeout" || stderr.contains("timeout") {
            return Ok(SolverResult::Unknown("timeout".to_string()));
        }
        parse_solver_output(&stdout, &stderr)
    }
}

impl SolverBackend for CliSolver {
    fn name(&self) -> String {
        self.config.kind.to_string()
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
        let query = self.query();
        tracing::debug!(
            solver = %self.config.kind,
            commands = query.len(),
            depth = self.stack.depth(),
            "Sending query"
        );
        let mut text = query.to_string();
        text.push('\n');
        self.check_sat_raw(&text)
    }

    fn reset(&mut self) {
        self.stack.reset();
    }
}
