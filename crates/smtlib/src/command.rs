use crate::sort::Sort;
use crate::term::Term;

/// The subset of SMT-LIB commands the constraint builder and the solver
/// backends exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetLogic(String),
    /// Option name without the leading colon, and its value.
    SetOption(String, String),
    DeclareConst(String, Sort),
    Assert(Term),
    CheckSat,
    GetModel,
    /// Number of assertion levels to open.
    Push(u32),
    /// Number of assertion levels to discard.
    Pop(u32),
    /// Printed as `;; text`.
    Comment(String),
    Exit,
}
