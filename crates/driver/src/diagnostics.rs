/// Diagnostics for failed runs.
///
/// Syntax errors are drawn against the program text with ariadne. Every
/// other failure is a colored header with an optional hint.
use ariadne::{ColorGenerator, Config, Label, Report, ReportKind, Source};
use colored::Colorize;
use minicheck_analysis::{AnalysisError, ParseError};
use minicheck_solver::SolverError;

use crate::cli::unroll_hint;

/// Render a syntax error as a source snippet with the offending token marked.
pub fn render_syntax_error(path: &str, source: &str, err: &ParseError, color: bool) -> String {
    // ariadne counts characters; the parser reports byte offsets.
    let chars = |byte: usize| source.get(..byte).map_or(0, |s| s.chars().count());
    let total = source.chars().count();
    if total == 0 {
        return format!("{err}\n");
    }
    let mut span = chars(err.span.start)..chars(err.span.end);
    if span.is_empty() {
        span = total - 1..total;
    }

    let mut colors = ColorGenerator::new();
    let report = Report::build(ReportKind::Error, path, span.start)
        .with_config(Config::default().with_color(color))
        .with_message(format!("syntax error: {}", err.message))
        .with_label(
            Label::new((path, span))
                .with_message(format!("near `{}`", err.fragment))
                .with_color(colors.next()),
        )
        .finish();

    let mut buf = Vec::new();
    match report.write((path, Source::from(source.to_string())), &mut buf) {
        Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
        Err(_) => format!("{err}\n"),
    }
}

/// Render any analysis failure. `source` is the text of `path`.
pub fn render_error(path: &str, source: &str, err: &AnalysisError, color: bool) -> String {
    if let AnalysisError::Syntax(parse) = err {
        return render_syntax_error(path, source, parse, color);
    }
    let mut out = format!("{}: {}\n", "error".red().bold(), err);
    if let Some(hint) = suggest_fix(err) {
        out.push_str(&format!("  {}: {}\n", "help".cyan().bold(), hint));
    }
    out
}

/// Render a failure that has no program text to point into.
pub fn render_message(message: &str) -> String {
    format!("{}: {}\n", "error".red().bold(), message)
}

fn suggest_fix(err: &AnalysisError) -> Option<String> {
    match err {
        AnalysisError::UndefinedVariable { name } => Some(format!(
            "assign `{name}` before reading it; programs have no implicit inputs"
        )),
        AnalysisError::InvalidConfig(msg) if msg.contains("unroll") => Some(unroll_hint()),
        AnalysisError::SolverUnknown(_) => {
            Some("raise --timeout or try another --solver".to_string())
        }
        AnalysisError::Solver(SolverError::NotFound(..)) => {
            Some("install the solver or pass --solver builtin".to_string())
        }
        _ => None,
    }
}
