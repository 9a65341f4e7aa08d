//! Subcommand execution.
//!
//! Each command renders its whole result before anything is written, so a
//! run produces either a complete report or a diagnostic, never half of one.

use std::io::Write;
use std::path::Path;

use minicheck_analysis::{
    AnalysisError, SsaConverter, Verdict, check_equivalence_programs, parse, parse_output_vars,
    print_program, verify_program,
};
use minicheck_solver::{SolverBackend, SolverError, create_backend_for, create_default_backend};

use crate::cli::{AnalysisArgs, Command, OutputFormat, ReportArgs, SolverArgs};
use crate::diagnostics::{render_error, render_message};
use crate::json_output::{JsonEquivalence, JsonError, JsonVerification, to_json};
use crate::output::{render_equivalence, render_verification};

/// Process exit status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Satisfiable, equivalent, or an informational command that succeeded.
    Success,
    /// Unsatisfiable or not equivalent.
    Negative,
    /// Usage, input, syntax, encoding or solver failure.
    Error,
    /// The solver could not decide.
    Unknown,
}

impl Status {
    pub fn code(self) -> u8 {
        match self {
            Status::Success => 0,
            Status::Negative => 1,
            Status::Error => 2,
            Status::Unknown => 3,
        }
    }
}

/// What a command wants written once it has finished.
#[derive(Debug)]
pub struct Rendered {
    pub status: Status,
    pub stdout: String,
    pub stderr: String,
}

enum Failure {
    Analysis {
        path: String,
        source: String,
        error: AnalysisError,
    },
    Plain {
        kind: &'static str,
        message: String,
    },
}

impl Failure {
    fn analysis(path: &Path, source: &str, error: impl Into<AnalysisError>) -> Self {
        Failure::Analysis {
            path: path.display().to_string(),
            source: source.to_string(),
            error: error.into(),
        }
    }

    fn solver(error: SolverError) -> Self {
        Failure::Analysis {
            path: String::new(),
            source: String::new(),
            error: AnalysisError::Solver(error),
        }
    }

    fn status(&self) -> Status {
        match self {
            Failure::Analysis {
                error: AnalysisError::SolverUnknown(_),
                ..
            } => Status::Unknown,
            _ => Status::Error,
        }
    }

    fn render(&self, format: OutputFormat, color: bool) -> Rendered {
        let status = self.status();
        match format {
            OutputFormat::Text => Rendered {
                status,
                stdout: String::new(),
                stderr: match self {
                    Failure::Analysis {
                        path,
                        source,
                        error,
                    } => render_error(path, source, error, color),
                    Failure::Plain { message, .. } => render_message(message),
                },
            },
            OutputFormat::Json => {
                let doc = match self {
                    Failure::Analysis { error, .. } => JsonError::from_analysis(error),
                    Failure::Plain { kind, message } => JsonError::plain(kind, message.clone()),
                };
                match to_json(&doc) {
                    Ok(json) => Rendered {
                        status,
                        stdout: json + "\n",
                        stderr: String::new(),
                    },
                    Err(err) => Rendered {
                        status,
                        stdout: String::new(),
                        stderr: render_message(&format!("cannot serialize error report: {err}")),
                    },
                }
            }
        }
    }
}

fn read_program(path: &Path) -> Result<String, Failure> {
    std::fs::read_to_string(path).map_err(|err| Failure::Plain {
        kind: "io",
        message: format!("cannot read {}: {err}", path.display()),
    })
}

fn create_solver(args: &SolverArgs) -> Result<Box<dyn SolverBackend>, Failure> {
    match args.solver {
        Some(kind) => create_backend_for(kind, args.timeout).map_err(Failure::solver),
        None => Ok(create_default_backend(args.timeout)),
    }
}

fn json(value: &impl serde::Serialize) -> Result<String, Failure> {
    to_json(value)
        .map(|text| text + "\n")
        .map_err(|err| Failure::Plain {
            kind: "output",
            message: format!("cannot serialize report: {err}"),
        })
}

/// Run one subcommand and render its result.
pub fn run(command: &Command, color: bool) -> Rendered {
    let format = match command {
        Command::Verify { report, .. } | Command::Equiv { report, .. } => report.output_format,
        Command::Parse { .. } | Command::Ssa { .. } => OutputFormat::Text,
    };
    let result = match command {
        Command::Parse { file } => parse_command(file),
        Command::Ssa { file, analysis } => ssa_command(file, analysis),
        Command::Verify {
            file,
            analysis,
            solver,
            report,
            examples,
        } => verify_command(file, analysis, solver, report, *examples),
        Command::Equiv {
            first,
            second,
            outputs,
            analysis,
            solver,
            report,
            counterexamples,
        } => equiv_command(
            [first.as_path(), second.as_path()],
            outputs,
            analysis,
            solver,
            report,
            *counterexamples,
        ),
    };
    result.unwrap_or_else(|failure| failure.render(format, color))
}

/// Run one subcommand and write its result to the given streams.
pub fn execute(
    command: &Command,
    color: bool,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Status {
    let rendered = run(command, color);
    let written = stdout
        .write_all(rendered.stdout.as_bytes())
        .and_then(|()| stdout.flush())
        .and_then(|()| stderr.write_all(rendered.stderr.as_bytes()));
    match written {
        Ok(()) => rendered.status,
        Err(_) => Status::Error,
    }
}

fn success(stdout: String) -> Rendered {
    Rendered {
        status: Status::Success,
        stdout,
        stderr: String::new(),
    }
}

fn parse_command(file: &Path) -> Result<Rendered, Failure> {
    let source = read_program(file)?;
    let statements = parse(&source).map_err(|e| Failure::analysis(file, &source, e))?;
    Ok(success(print_program(&statements)))
}

fn ssa_command(file: &Path, analysis: &AnalysisArgs) -> Result<Rendered, Failure> {
    let source = read_program(file)?;
    let config = analysis.config();
    config
        .validate()
        .map_err(|e| Failure::analysis(file, &source, e))?;
    let statements = parse(&source).map_err(|e| Failure::analysis(file, &source, e))?;
    let program = SsaConverter::new(config.branch_policy)
        .convert(&statements, config.unroll_depth)
        .map_err(|e| Failure::analysis(file, &source, e))?;
    let mut text = program.lines().join("\n");
    if !text.is_empty() {
        text.push('\n');
    }
    Ok(success(text))
}

fn verify_command(
    file: &Path,
    analysis: &AnalysisArgs,
    solver: &SolverArgs,
    report_args: &ReportArgs,
    examples: usize,
) -> Result<Rendered, Failure> {
    let source = read_program(file)?;
    let config = analysis.config().with_max_examples(examples);
    let statements = parse(&source).map_err(|e| Failure::analysis(file, &source, e))?;
    let mut backend = create_solver(solver)?;
    tracing::info!(file = %file.display(), backend = %backend.name(), "Verifying");
    let report = verify_program(statements, &config, backend.as_mut())
        .map_err(|e| Failure::analysis(file, &source, e))?;

    let name = file.display().to_string();
    let stdout = match report_args.output_format {
        OutputFormat::Text => render_verification(
            &name,
            &report,
            report_args.show_ssa,
            report_args.show_smt,
        ),
        OutputFormat::Json => json(&JsonVerification::from_report(
            &name,
            &report,
            &backend.name(),
            config.unroll_depth,
            report_args.show_ssa || report_args.show_smt,
        ))?,
    };
    let status = match report.verdict {
        Verdict::Satisfiable => Status::Success,
        Verdict::Unsatisfiable => Status::Negative,
    };
    Ok(Rendered {
        status,
        stdout,
        stderr: String::new(),
    })
}

fn equiv_command(
    files: [&Path; 2],
    outputs: &str,
    analysis: &AnalysisArgs,
    solver: &SolverArgs,
    report_args: &ReportArgs,
    counterexamples: usize,
) -> Result<Rendered, Failure> {
    let [first, second] = files;
    let first_source = read_program(first)?;
    let second_source = read_program(second)?;
    let first_stmts =
        parse(&first_source).map_err(|e| Failure::analysis(first, &first_source, e))?;
    let second_stmts =
        parse(&second_source).map_err(|e| Failure::analysis(second, &second_source, e))?;

    let outputs = parse_output_vars(outputs);
    if outputs.is_empty() {
        return Err(Failure::Plain {
            kind: "config",
            message: "--outputs names no variables".to_string(),
        });
    }
    let config = analysis
        .config()
        .with_max_counterexamples(counterexamples);
    let mut backend = create_solver(solver)?;
    tracing::info!(
        first = %first.display(),
        second = %second.display(),
        backend = %backend.name(),
        "Checking equivalence"
    );
    let run = check_equivalence_programs(
        first_stmts,
        second_stmts,
        &outputs,
        &config,
        backend.as_mut(),
    )
    .map_err(|e| Failure::analysis(first, &first_source, e))?;

    let (a, b) = (first.display().to_string(), second.display().to_string());
    let stdout = match report_args.output_format {
        OutputFormat::Text => render_equivalence(
            &a,
            &b,
            &run,
            report_args.show_ssa,
            report_args.show_smt,
        ),
        OutputFormat::Json => json(&JsonEquivalence::from_run(
            &a,
            &b,
            &run,
            report_args.show_ssa || report_args.show_smt,
        ))?,
    };
    let status = if run.report.is_equivalent() {
        Status::Success
    } else {
        Status::Negative
    };
    Ok(Rendered {
        status,
        stdout,
        stderr: String::new(),
    })
}
