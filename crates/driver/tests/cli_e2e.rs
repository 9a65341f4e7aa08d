//! End-to-end runs of the `minicheck` subcommands through the library entry
//! point, with program files written to the target temp directory and the
//! builtin solver selected so no external binary is needed.

use std::path::PathBuf;

use clap::Parser;
use minicheck_driver::cli::Cli;
use minicheck_driver::commands::{Rendered, Status, execute, run};

// ---- Helpers ----

fn program(name: &str, text: &str) -> String {
    let dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("minicheck-cli");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, text).unwrap();
    path.display().to_string()
}

fn minicheck(args: &[&str]) -> Rendered {
    let mut argv = vec!["minicheck"];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv).unwrap();
    run(&cli.command, false)
}

fn json(rendered: &Rendered) -> serde_json::Value {
    serde_json::from_str(&rendered.stdout).unwrap()
}

// ============================================================
// parse / ssa
// ============================================================

#[test]
fn parse_prints_canonical_form() {
    let file = program("canonical.mc", "x:=1;if(x>0){y:=(x+1)*2;}");
    let out = minicheck(&["parse", &file]);
    assert_eq!(out.status, Status::Success);
    assert!(out.stdout.contains("x := 1;"), "{}", out.stdout);
    assert!(out.stdout.contains("y := (x + 1) * 2;"), "{}", out.stdout);
}

#[test]
fn ssa_follows_policy() {
    let file = program(
        "branch.mc",
        "x := 4; if (x > 3) { y := 10; } else { y := 0; }",
    );
    let unconditional = minicheck(&["ssa", &file]);
    assert!(!unconditional.stdout.contains("phi"));
    assert!(unconditional.stdout.contains("y_1 := 0"));

    let guarded = minicheck(&["ssa", &file, "--policy", "guarded"]);
    assert!(guarded.stdout.contains("y_2 := phi("), "{}", guarded.stdout);
}

#[test]
fn syntax_error_is_rendered_with_location() {
    let file = program("broken.mc", "x := 1;\ny := * 2;\n");
    let out = minicheck(&["ssa", &file]);
    assert_eq!(out.status, Status::Error);
    assert!(out.stdout.is_empty());
    assert!(out.stderr.contains("syntax error"), "{}", out.stderr);
    assert!(out.stderr.contains("y := * 2;"), "{}", out.stderr);
}

#[test]
fn missing_file_is_an_error() {
    let out = minicheck(&["parse", "/nonexistent/minicheck/prog.mc"]);
    assert_eq!(out.status, Status::Error);
    assert!(out.stderr.contains("cannot read"));
}

// ============================================================
// verify
// ============================================================

#[test]
fn verify_exit_codes() {
    let counter = program(
        "counter.mc",
        "x := 0; while (x < 4) { x := x + 1; } assert(x == 4);",
    );
    let out = minicheck(&["verify", &counter, "--unroll", "4", "--solver", "builtin"]);
    assert_eq!(out.status, Status::Success);
    assert_eq!(out.status.code(), 0);
    assert!(out.stdout.contains("[SAT]"));
    assert!(out.stdout.contains("x_4 = 4"), "{}", out.stdout);

    let false_assert = program("false.mc", "assert(1 == 2);");
    let out = minicheck(&["verify", &false_assert, "--solver", "builtin"]);
    assert_eq!(out.status, Status::Negative);
    assert_eq!(out.status.code(), 1);
}

#[test]
fn verify_rejects_out_of_range_unroll() {
    let file = program("unroll.mc", "x := 1;");
    let out = minicheck(&["verify", &file, "--unroll", "11", "--solver", "builtin"]);
    assert_eq!(out.status, Status::Error);
    assert!(out.stderr.contains("--unroll accepts 1 to 10"), "{}", out.stderr);
}

#[test]
fn verify_json_with_detail() {
    let file = program("json.mc", "a := 6; b := a / 3; assert(b == 2);");
    let out = minicheck(&[
        "verify",
        &file,
        "--solver",
        "builtin",
        "--output-format",
        "json",
        "--show-smt",
    ]);
    assert_eq!(out.status, Status::Success);
    let doc = json(&out);
    assert_eq!(doc["verdict"], "satisfiable");
    assert_eq!(doc["solver"], "builtin");
    let smt = doc["smt"].as_str().unwrap();
    assert!(smt.contains("(assert (= (* 3 (div a_0 3)) a_0))"), "{smt}");
    let example = doc["examples"][0].as_array().unwrap();
    let variables: Vec<&str> = example
        .iter()
        .map(|a| a["variable"].as_str().unwrap())
        .collect();
    assert_eq!(variables, ["a_0", "b_0"]);
}

#[test]
fn verify_json_reports_errors() {
    let file = program("undefined.mc", "y := z + 1;");
    let out = minicheck(&[
        "verify",
        &file,
        "--solver",
        "builtin",
        "--output-format",
        "json",
    ]);
    assert_eq!(out.status, Status::Error);
    let doc = json(&out);
    assert_eq!(doc["kind"], "undefined_variable");
}

// ============================================================
// equiv
// ============================================================

#[test]
fn equiv_outcomes() {
    let a = program("sum_a.mc", "a := 5; b := 10; c := a + b;");
    let b = program("sum_b.mc", "a := 5; b := 10; c := b + a;");
    let out = minicheck(&["equiv", &a, &b, "--outputs", "c", "--solver", "builtin"]);
    assert_eq!(out.status, Status::Success);
    assert!(out.stdout.contains("[EQUIV]"));

    let a = program("thr_a.mc", "x := 4; if (x > 3) { y := 10; } else { y := 0; }");
    let b = program("thr_b.mc", "x := 4; if (x > 4) { y := 10; } else { y := 0; }");
    let out = minicheck(&[
        "equiv",
        &a,
        &b,
        "--outputs",
        "y",
        "--policy",
        "guarded",
        "--solver",
        "builtin",
        "--output-format",
        "json",
    ]);
    assert_eq!(out.status, Status::Negative);
    let doc = json(&out);
    assert_eq!(doc["outcome"], "differ");
    let cex = doc["counterexamples"][0].as_array().unwrap();
    assert!(
        cex.iter()
            .any(|a| a["variable"] == "x (prog1)" && a["value"] == "4")
    );

    let out = minicheck(&["equiv", &a, &b, "--outputs", "y", "--solver", "builtin"]);
    assert_eq!(out.status, Status::Negative);
    assert!(out.stdout.contains("[INCONSISTENT]"));
}

#[test]
fn equiv_needs_named_outputs() {
    let a = program("empty_out.mc", "a := 1;");
    let out = minicheck(&["equiv", &a, &a, "--outputs", " , ", "--solver", "builtin"]);
    assert_eq!(out.status, Status::Error);
    assert!(out.stderr.contains("--outputs names no variables"));
}

#[test]
fn execute_writes_streams() {
    let file = program("streams.mc", "x := 1;");
    let cli = Cli::try_parse_from(["minicheck", "parse", file.as_str()]).unwrap();
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let status = execute(&cli.command, false, &mut stdout, &mut stderr);
    assert_eq!(status, Status::Success);
    assert_eq!(String::from_utf8(stdout).unwrap(), "x := 1;\n");
    assert!(stderr.is_empty());
}
