/// Constant values reported with a `sat` verdict.
///
/// Values stay in SMT-LIB text (`5`, `(- 3)`, `true`) as the backend printed
/// them; [`Model::int_value`] decodes integers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Model {
    pub assignments: Vec<(String, String)>,
}

impl Model {
    pub fn with_assignments(assignments: Vec<(String, String)>) -> Self {
        Self { assignments }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.assignments
            .iter()
            .find_map(|(symbol, value)| (symbol == name).then_some(value.as_str()))
    }

    /// `None` when `name` is absent or not bound to an integer that fits `i128`.
    pub fn int_value(&self, name: &str) -> Option<i128> {
        parse_int_literal(self.get(name)?)
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

/// Decode `42`, `-42` or `(- 42)`.
pub fn parse_int_literal(text: &str) -> Option<i128> {
    let text = text.trim();
    match text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        Some(inner) => {
            let magnitude = inner.trim().strip_prefix('-')?.trim();
            if magnitude.starts_with('-') {
                return None;
            }
            // Sign attached before parsing so i128::MIN decodes.
            format!("-{magnitude}").parse().ok()
        }
        None => text.parse().ok(),
    }
}
