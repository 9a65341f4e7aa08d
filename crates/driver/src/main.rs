//! minicheck: bounded verification and equivalence checking from the
//! command line.
//!
//! Usage:
//!   minicheck verify prog.mc --unroll 4
//!   minicheck equiv a.mc b.mc --outputs x,y --policy guarded
//!
//! Logging goes to stderr and is controlled by `MINICHECK_LOG` (or
//! `RUST_LOG`); `-v` raises the default level from `warn` to `debug`.

use std::process::ExitCode;

use clap::Parser;
use minicheck_driver::cli::Cli;
use minicheck_driver::commands::execute;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = std::env::var("MINICHECK_LOG")
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let color = colored::control::SHOULD_COLORIZE.should_colorize();
    let status = execute(
        &cli.command,
        color,
        &mut std::io::stdout().lock(),
        &mut std::io::stderr().lock(),
    );
    ExitCode::from(status.code())
}
