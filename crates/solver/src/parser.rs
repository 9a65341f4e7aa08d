//! Reading what an external solver prints back.
//!
//! The verdict is the first non-empty line. After `sat` the rest of the
//! output is read as s-expressions and every nullary `define-fun` becomes a
//! model entry, whether or not the list is wrapped in `(model ...)`.

use crate::error::SolverError;
use crate::model::Model;
use crate::result::SolverResult;

#[derive(Debug, Clone, PartialEq)]
enum Sexp {
    /// Symbol, numeral or string contents. `|quoted|` symbols lose their bars.
    Atom(String),
    List(Vec<Sexp>),
}

impl Sexp {
    fn atom(&self) -> Option<&str> {
        match self {
            Sexp::Atom(text) => Some(text),
            Sexp::List(_) => None,
        }
    }

    /// Single-spaced text form, as stored in a [`Model`].
    fn render(&self) -> String {
        match self {
            Sexp::Atom(text) => text.clone(),
            Sexp::List(items) => {
                let inner: Vec<String> = items.iter().map(Sexp::render).collect();
                format!("({})", inner.join(" "))
            }
        }
    }
}

/// Read every top-level s-expression in `text`.
fn read_sexps(text: &str) -> Result<Vec<Sexp>, String> {
    let mut stack: Vec<Vec<Sexp>> = vec![Vec::new()];
    let mut chars = text.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        let atom = match c {
            c if c.is_whitespace() => continue,
            '(' => {
                stack.push(Vec::new());
                continue;
            }
            ')' => {
                let items = stack.pop().filter(|_| !stack.is_empty());
                let Some(items) = items else {
                    return Err(format!("unexpected `)` at offset {offset}"));
                };
                if let Some(parent) = stack.last_mut() {
                    parent.push(Sexp::List(items));
                }
                continue;
            }
            '|' | '"' => {
                let mut quoted = String::new();
                loop {
                    match chars.next() {
                        Some((_, q)) if q == c => break,
                        Some((_, q)) => quoted.push(q),
                        None => return Err(format!("unterminated {c} at offset {offset}")),
                    }
                }
                quoted
            }
            _ => {
                let mut word = c.to_string();
                while let Some(&(_, next)) = chars.peek() {
                    if next.is_whitespace() || matches!(next, '(' | ')' | '|' | '"') {
                        break;
                    }
                    word.push(next);
                    chars.next();
                }
                word
            }
        };
        if let Some(current) = stack.last_mut() {
            current.push(Sexp::Atom(atom));
        }
    }

    match stack.pop() {
        Some(top) if stack.is_empty() => Ok(top),
        _ => Err(format!("{} unclosed `(`", stack.len())),
    }
}

/// Collect `(name, value)` for every constant definition under `sexp`.
fn collect_definitions(sexp: &Sexp, out: &mut Vec<(String, String)>) {
    let Sexp::List(items) = sexp else {
        return;
    };
    if items.first().and_then(Sexp::atom) == Some("define-fun") {
        // (define-fun name () Sort value)
        if let [_, Sexp::Atom(name), Sexp::List(params), _sort, value] = items.as_slice()
            && params.is_empty()
        {
            out.push((name.clone(), value.render()));
        }
        return;
    }
    for item in items {
        collect_definitions(item, out);
    }
}

fn parse_model(text: &str) -> Result<Option<Model>, SolverError> {
    let sexps = read_sexps(text)
        .map_err(|msg| SolverError::ParseError(format!("malformed model: {msg}")))?;
    let mut assignments = Vec::new();
    for sexp in &sexps {
        collect_definitions(sexp, &mut assignments);
    }
    Ok((!assignments.is_empty()).then(|| Model::with_assignments(assignments)))
}

/// Message of an `(error "...")` line, or the line itself if it does not read.
fn error_message(line: &str) -> String {
    match read_sexps(line).as_deref() {
        Ok([Sexp::List(items)]) => match items.as_slice() {
            [_, Sexp::Atom(message)] => message.clone(),
            _ => line.to_string(),
        },
        _ => line.to_string(),
    }
}

/// Reason printed after `unknown`, falling back to stderr.
///
/// A `(get-model)` after `unknown` produces an error line; that is not a reason.
fn unknown_reason(after: Option<&str>, stderr: &str) -> String {
    match after {
        Some(line) if !line.starts_with("(error") && !line.contains("define-fun") => line
            .strip_prefix('(')
            .and_then(|inner| inner.strip_suffix(')'))
            .unwrap_or(line)
            .to_string(),
        _ if !stderr.trim().is_empty() => stderr.trim().to_string(),
        _ => "unknown".to_string(),
    }
}

/// Turn one solver run's stdout and stderr into a [`SolverResult`].
///
/// An `(error ...)` in place of the verdict is a [`SolverError::ProcessError`].
pub fn parse_solver_output(stdout: &str, stderr: &str) -> Result<SolverResult, SolverError> {
    let mut lines = stdout.lines().map(str::trim).filter(|l| !l.is_empty());
    let Some(verdict) = lines.next() else {
        if stderr.contains("timeout") {
            return Ok(SolverResult::Unknown("timeout".to_string()));
        }
        return Err(SolverError::ParseError(format!(
            "solver printed nothing (stderr: {})",
            stderr.trim()
        )));
    };

    match verdict {
        "sat" => {
            let rest: Vec<&str> = lines.collect();
            Ok(SolverResult::Sat(parse_model(&rest.join("\n"))?))
        }
        "unsat" => Ok(SolverResult::Unsat),
        "unknown" => Ok(SolverResult::Unknown(unknown_reason(lines.next(), stderr))),
        "timeout" => Ok(SolverResult::Unknown("timeout".to_string())),
        line if line.starts_with("(error") => Err(SolverError::ProcessError(error_message(line))),
        other => Err(SolverError::ParseError(format!(
            "expected sat, unsat or unknown, got `{other}`"
        ))),
    }
}
