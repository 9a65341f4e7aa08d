//! Branch encoding policy shared by the SSA converter and the constraint builder.

use std::fmt;

/// How `if` and loop-iteration conditions are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BranchPolicy {
    /// Conditions are asserted as facts and both branches advance one shared
    /// version table in sequence. No merges are emitted, so a program whose
    /// branches diverge on some input is only analysed along the branch its
    /// guards force.
    #[default]
    Unconditional,
    /// Conditions guard the effects of their branch. Each branch starts from
    /// the pre-branch versions, the join point merges differing versions with
    /// `ite`, and assertions are implied by the enclosing path condition.
    Guarded,
}

impl BranchPolicy {
    /// Whether guards become top-level constraints.
    pub fn asserts_guards(self) -> bool {
        matches!(self, BranchPolicy::Unconditional)
    }

    /// Whether branches are converted from the pre-branch versions and merged.
    pub fn merges_branches(self) -> bool {
        matches!(self, BranchPolicy::Guarded)
    }
}

impl fmt::Display for BranchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BranchPolicy::Unconditional => write!(f, "unconditional"),
            BranchPolicy::Guarded => write!(f, "guarded"),
        }
    }
}

impl std::str::FromStr for BranchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unconditional" => Ok(BranchPolicy::Unconditional),
            "guarded" | "phi" => Ok(BranchPolicy::Guarded),
            _ => Err(format!(
                "Unknown branch policy: {s}. Valid options: unconditional, guarded"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_unconditional() {
        assert_eq!(BranchPolicy::default(), BranchPolicy::Unconditional);
        assert!(BranchPolicy::default().asserts_guards());
        assert!(!BranchPolicy::default().merges_branches());
    }

    #[test]
    fn parse_and_display() {
        for policy in [BranchPolicy::Unconditional, BranchPolicy::Guarded] {
            assert_eq!(policy.to_string().parse::<BranchPolicy>(), Ok(policy));
        }
        assert_eq!("PHI".parse::<BranchPolicy>(), Ok(BranchPolicy::Guarded));
        assert!("lazy".parse::<BranchPolicy>().is_err());
    }
}
