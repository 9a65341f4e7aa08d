//! # minicheck-smtlib
//!
//! SMT-LIB2 abstract syntax for the integer/boolean fragment used by the
//! minicheck constraint builder, plus a `Display` formatter that renders it as
//! solver-ready text.

pub mod command;
mod formatter;
pub mod script;
pub mod sort;
pub mod term;

pub use command::Command;
pub use script::Script;
pub use sort::Sort;
pub use term::Term;
