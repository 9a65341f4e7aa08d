use crate::model::Model;

/// Verdict of one `check`.
#[derive(Debug, Clone, PartialEq)]
pub enum SolverResult {
    /// The model is absent when the backend printed no definitions.
    Sat(Option<Model>),
    Unsat,
    /// Undecided, with the backend's reason (`timeout`, `incomplete`, ...).
    Unknown(String),
}

impl SolverResult {
    pub fn is_sat(&self) -> bool {
        matches!(self, SolverResult::Sat(_))
    }

    pub fn is_unsat(&self) -> bool {
        *self == SolverResult::Unsat
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, SolverResult::Unknown(_))
    }

    pub fn model(&self) -> Option<&Model> {
        match self {
            SolverResult::Sat(model) => model.as_ref(),
            _ => None,
        }
    }

    pub fn into_model(self) -> Option<Model> {
        match self {
            SolverResult::Sat(model) => model,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_one_predicate_holds() {
        for (result, expected) in [
            (SolverResult::Sat(None), [true, false, false]),
            (SolverResult::Unsat, [false, true, false]),
            (SolverResult::Unknown("incomplete".into()), [false, false, true]),
        ] {
            assert_eq!(
                [result.is_sat(), result.is_unsat(), result.is_unknown()],
                expected,
                "{result:?}"
            );
        }
    }

    #[test]
    fn only_sat_carries_a_model() {
        let model = Model::with_assignments(vec![("q_0".into(), "3".into())]);
        let sat = SolverResult::Sat(Some(model.clone()));
        assert_eq!(sat.model(), Some(&model));
        assert_eq!(sat.into_model(), Some(model));
        assert_eq!(SolverResult::Sat(None).model(), None);
        assert_eq!(SolverResult::Unknown("timeout".into()).into_model(), None);
    }
}
