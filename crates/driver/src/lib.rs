//! minicheck-driver library exports.
//!
//! The `minicheck` binary is a thin shell over [`commands::execute`]; keeping
//! the command logic here lets integration tests drive it without spawning a
//! process.

pub mod cli;
pub mod commands;
pub mod diagnostics;
pub mod json_output;
pub mod output;
