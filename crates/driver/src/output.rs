/// Colored text output for verification and equivalence results.
///
///   [SAT]     prog.mc (2 examples)
///   [UNSAT]   prog.mc - no input satisfies every assertion
///   [EQUIV]   a.mc == b.mc on x, y
///   [DIFFER]  a.mc != b.mc on x (3 counterexamples)
use colored::Colorize;
use minicheck_analysis::{
    EquivalenceOutcome, EquivalenceRun, ProgramAnalysis, StopReason, Verdict, VerificationReport,
};

/// Print the SSA lines of a program, numbered.
pub fn render_ssa(lines: &[String]) -> String {
    let width = lines.len().to_string().len();
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{:>width$}  {line}\n", i + 1))
        .collect()
}

fn render_detail(
    title: &str,
    program: &ProgramAnalysis,
    show_ssa: bool,
    show_smt: bool,
) -> String {
    let mut out = String::new();
    if show_ssa {
        out.push_str(&format!("{}\n", format!("SSA ({title}):").bold()));
        out.push_str(&render_ssa(&program.ssa.lines()));
        out.push('\n');
    }
    if show_smt {
        out.push_str(&format!("{}\n", format!("SMT-LIB ({title}):").bold()));
        out.push_str(&program.smt.to_string());
        out.push_str("\n\n");
    }
    out
}

fn stop_note(stop: &StopReason) -> Option<String> {
    match stop {
        StopReason::Limit => Some("more may exist".to_string()),
        StopReason::Exhausted => None,
        StopReason::Unknown(reason) => Some(format!(
            "search stopped: solver returned unknown ({reason})"
        )),
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

pub fn render_verification(
    file: &str,
    report: &VerificationReport,
    show_ssa: bool,
    show_smt: bool,
) -> String {
    let mut out = render_detail(file, &report.program, show_ssa, show_smt);
    match report.verdict {
        Verdict::Satisfiable => {
            let mut line = format!(
                "  {}     {} ({})",
                "[SAT]".green().bold(),
                file,
                plural(report.examples.models.len(), "example"),
            );
            if let Some(note) = stop_note(&report.examples.stop) {
                line.push_str(&format!(" -- {note}"));
            }
            out.push_str(&line);
            out.push('\n');
            for (i, example) in report.examples.models.iter().enumerate() {
                let values: Vec<String> = example
                    .values
                    .iter()
                    .map(|(name, value)| format!("{name} = {value}"))
                    .collect();
                out.push_str(&format!("    #{}: {}\n", i + 1, values.join(", ")));
            }
        }
        Verdict::Unsatisfiable => {
            out.push_str(&format!(
                "  {}   {} - no input satisfies every assertion\n",
                "[UNSAT]".red().bold(),
                file,
            ));
        }
    }
    out
}

pub fn render_equivalence(
    first: &str,
    second: &str,
    run: &EquivalenceRun,
    show_ssa: bool,
    show_smt: bool,
) -> String {
    let mut out = render_detail(first, &run.first, show_ssa, show_smt);
    out.push_str(&render_detail(second, &run.second, show_ssa, show_smt));

    let report = &run.report;
    let names: Vec<&str> = report.compared.iter().map(|p| p.name.as_str()).collect();
    match report.outcome {
        EquivalenceOutcome::Equivalent => {
            out.push_str(&format!(
                "  {}   {first} == {second} on {}\n",
                "[EQUIV]".green().bold(),
                names.join(", "),
            ));
        }
        EquivalenceOutcome::Differ => {
            out.push_str(&format!(
                "  {}  {first} != {second} on {} ({})\n",
                "[DIFFER]".red().bold(),
                names.join(", "),
                plural(report.counterexamples.len(), "counterexample"),
            ));
            for (i, cex) in report.counterexamples.iter().enumerate() {
                out.push_str(&format!("    {}\n", format!("counterexample #{}", i + 1).bold()));
                for (key, value) in &cex.values {
                    out.push_str(&format!("      {key:<16} = {value}\n"));
                }
            }
        }
        EquivalenceOutcome::NoComparableOutputs => {
            out.push_str(&format!(
                "  {}  no requested output is assigned in both programs\n",
                "[NO OUTPUTS]".yellow().bold(),
            ));
        }
        EquivalenceOutcome::Inconsistent => {
            out.push_str(&format!(
                "  {}  {first} and {second} admit no common input; nothing to compare\n",
                "[INCONSISTENT]".yellow().bold(),
            ));
        }
    }
    if !report.unresolved.is_empty() {
        out.push_str(&format!(
            "  {}: not assigned in both programs: {}\n",
            "warning".yellow().bold(),
            report.unresolved.join(", "),
        ));
    }
    if report.outcome == EquivalenceOutcome::Differ
        && let Some(note) = report.stop.as_ref().and_then(stop_note)
    {
        out.push_str(&format!("  ({note})\n"));
    }
    out
}
