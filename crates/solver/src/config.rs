use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::SolverError;

/// Install prefixes searched after `PATH`.
const FALLBACK_DIRS: &[&str] = &["/opt/homebrew/bin", "/usr/local/bin", "/usr/bin"];

/// Which engine answers `check-sat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolverKind {
    Z3,
    Cvc5,
    /// In-process evaluator; needs no binary.
    Builtin,
}

impl SolverKind {
    pub fn binary_name(&self) -> &'static str {
        match self {
            SolverKind::Z3 => "z3",
            SolverKind::Cvc5 => "cvc5",
            SolverKind::Builtin => "builtin",
        }
    }

    pub fn is_external(&self) -> bool {
        *self != SolverKind::Builtin
    }

    /// Flags that make the binary read an SMT-LIB script from stdin.
    pub fn stdin_args(&self) -> Vec<String> {
        let flags: &[&str] = match self {
            SolverKind::Z3 => &["-in"],
            SolverKind::Cvc5 => &["--lang", "smt2", "--produce-models", "--incremental"],
            SolverKind::Builtin => &[],
        };
        flags.iter().map(|f| f.to_string()).collect()
    }

    /// Per-query time limit flag. Zero means unlimited and yields no flag.
    pub fn timeout_arg(&self, timeout_ms: u64) -> Option<String> {
        match (self, timeout_ms) {
            (_, 0) | (SolverKind::Builtin, _) => None,
            (SolverKind::Z3, ms) => Some(format!("-t:{ms}")),
            (SolverKind::Cvc5, ms) => Some(format!("--tlimit={ms}")),
        }
    }

    /// First executable named `binary_name` on `PATH`, then in the fallback prefixes.
    fn locate(&self) -> Option<PathBuf> {
        let binary = self.binary_name();
        let on_path = std::env::var_os("PATH")
            .map(|paths| std::env::split_paths(&paths).collect::<Vec<_>>())
            .unwrap_or_default();
        on_path
            .into_iter()
            .chain(FALLBACK_DIRS.iter().map(PathBuf::from))
            .map(|dir| dir.join(binary))
            .find(|candidate| is_file(candidate))
    }
}

fn is_file(path: &Path) -> bool {
    path.metadata().map(|m| m.is_file()).unwrap_or(false)
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SolverKind::Z3 => "Z3",
            SolverKind::Cvc5 => "CVC5",
            SolverKind::Builtin => "builtin",
        };
        f.write_str(label)
    }
}

impl std::str::FromStr for SolverKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "z3" => Ok(SolverKind::Z3),
            "cvc5" => Ok(SolverKind::Cvc5),
            "builtin" | "eval" => Ok(SolverKind::Builtin),
            other => Err(format!(
                "unknown solver `{other}` (expected z3, cvc5 or builtin)"
            )),
        }
    }
}

/// How to launch a backend.
///
/// `solver_path` is empty for the builtin evaluator. A `timeout_ms` of zero
/// leaves the solver unbounded.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    pub kind: SolverKind,
    pub solver_path: PathBuf,
    pub timeout_ms: u64,
    /// Appended after the generated flags.
    pub extra_args: Vec<String>,
}

impl SolverConfig {
    pub fn new(kind: SolverKind, solver_path: PathBuf) -> Self {
        Self {
            kind,
            solver_path,
            timeout_ms: 0,
            extra_args: Vec::new(),
        }
    }

    pub fn builtin() -> Self {
        Self::new(SolverKind::Builtin, PathBuf::new())
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    /// Find the binary for `kind`. The builtin kind always resolves.
    pub fn auto_detect_for(kind: SolverKind) -> Result<Self, SolverError> {
        if !kind.is_external() {
            return Ok(Self::builtin());
        }
        match kind.locate() {
            Some(path) => {
                tracing::debug!(solver = %kind, path = %path.display(), "Located solver binary");
                Ok(Self::new(kind, path))
            }
            None => Err(SolverError::NotFound(kind, PathBuf::from(kind.binary_name()))),
        }
    }

    pub fn auto_detect() -> Result<Self, SolverError> {
        Self::auto_detect_for(SolverKind::Z3)
    }

    /// Command line for one invocation: stdin flags, time limit, extras.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = self.kind.stdin_args();
        args.extend(self.kind.timeout_arg(self.timeout_ms));
        args.extend_from_slice(&self.extra_args);
        args
    }

    pub fn validate(&self) -> Result<(), SolverError> {
        if self.kind.is_external() && !is_file(&self.solver_path) {
            return Err(SolverError::NotFound(self.kind, self.solver_path.clone()));
        }
        Ok(())
    }
}
