use crate::command::Command;
use crate::term::Term;

/// Ordered list of commands, printed one per line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Script {
    commands: Vec<Command>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_commands(commands: Vec<Command>) -> Self {
        Self { commands }
    }

    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn extend(&mut self, commands: impl IntoIterator<Item = Command>) {
        self.commands.extend(commands);
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Asserted terms in script order.
    pub fn assertions(&self) -> impl Iterator<Item = &Term> {
        self.commands.iter().filter_map(|command| match command {
            Command::Assert(term) => Some(term),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sort::Sort;

    #[test]
    fn starts_empty() {
        let script = Script::new();
        assert!(script.is_empty());
        assert_eq!(script, Script::with_commands(vec![]));
    }

    #[test]
    fn push_and_extend_append_in_order() {
        let mut script = Script::new();
        script.push(Command::DeclareConst("n_0".into(), Sort::Int));
        script.extend([
            Command::Assert(Term::var("n_0").equals(Term::IntLit(7))),
            Command::CheckSat,
        ]);
        assert_eq!(script.len(), 3);
        assert!(matches!(
            script.commands(),
            [Command::DeclareConst(..), Command::Assert(_), Command::CheckSat]
        ));
    }

    #[test]
    fn assertions_filter_other_commands() {
        let script = Script::with_commands(vec![
            Command::SetLogic("QF_NIA".into()),
            Command::Assert(Term::BoolLit(false)),
            Command::Comment("loop copy 1".into()),
            Command::Assert(Term::var("g_0")),
            Command::GetModel,
        ]);
        let asserted: Vec<String> = script.assertions().map(|t| t.to_string()).collect();
        assert_eq!(asserted, ["false", "g_0"]);
    }
}
