use crate::branch::BranchPolicy;
use crate::error::AnalysisError;

/// Largest accepted loop unroll depth.
pub const MAX_UNROLL_DEPTH: usize = 10;

/// Knobs for one verification or equivalence run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Copies of each loop body, `1..=MAX_UNROLL_DEPTH`.
    pub unroll_depth: usize,
    pub branch_policy: BranchPolicy,
    /// Satisfying assignments reported by verification.
    pub max_examples: usize,
    /// Counterexamples reported when two programs differ.
    pub max_counterexamples: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            unroll_depth: 3,
            branch_policy: BranchPolicy::default(),
            max_examples: 2,
            max_counterexamples: 3,
        }
    }
}

impl AnalysisConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unroll_depth(mut self, unroll_depth: usize) -> Self {
        self.unroll_depth = unroll_depth;
        self
    }

    pub fn with_branch_policy(mut self, branch_policy: BranchPolicy) -> Self {
        self.branch_policy = branch_policy;
        self
    }

    pub fn with_max_examples(mut self, max_examples: usize) -> Self {
        self.max_examples = max_examples;
        self
    }

    pub fn with_max_counterexamples(mut self, max_counterexamples: usize) -> Self {
        self.max_counterexamples = max_counterexamples;
        self
    }

    /// Reject values outside their accepted ranges.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !(1..=MAX_UNROLL_DEPTH).contains(&self.unroll_depth) {
            return Err(AnalysisError::InvalidConfig(format!(
                "unroll depth must be between 1 and {MAX_UNROLL_DEPTH}, got {}",
                self.unroll_depth
            )));
        }
        if self.max_examples == 0 {
            return Err(AnalysisError::InvalidConfig(
                "max examples must be at least 1".to_string(),
            ));
        }
        if self.max_counterexamples == 0 {
            return Err(AnalysisError::InvalidConfig(
                "max counterexamples must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.unroll_depth, 3);
        assert_eq!(config.branch_policy, BranchPolicy::Unconditional);
        assert_eq!(config.max_examples, 2);
        assert_eq!(config.max_counterexamples, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unroll_bounds() {
        assert!(AnalysisConfig::new().with_unroll_depth(1).validate().is_ok());
        assert!(AnalysisConfig::new().with_unroll_depth(10).validate().is_ok());
        let err = AnalysisConfig::new()
            .with_unroll_depth(11)
            .validate()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid configuration: unroll depth must be between 1 and 10, got 11"
        );
        assert!(AnalysisConfig::new().with_unroll_depth(0).validate().is_err());
    }

    #[test]
    fn counts_must_be_positive() {
        assert!(AnalysisConfig::new().with_max_examples(0).validate().is_err());
        assert!(
            AnalysisConfig::new()
                .with_max_counterexamples(0)
                .validate()
                .is_err()
        );
    }
}
