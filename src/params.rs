//! Positional and named bind values for a single execution.

use crate::value::Value;

/// Parameter bindings for one statement execution.
///
/// Positional values bind to `?` / `?N` placeholders in order. Named values
/// bind to `:name`, `@name` or `$name`; a name given without a prefix is
/// bound as `:name`. A single execution uses one style or the other.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Params {
    pub positional: Vec<Value>,
    pub named: Vec<(String, Value)>,
}

impl Params {
    /// Create an empty Params object
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional value
    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Add a named value
    pub fn with_named(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.named.push((placeholder_name(name), value.into()));
        self
    }

    pub fn len(&self) -> usize {
        self.positional.len() + self.named.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn is_mixed(&self) -> bool {
        !self.positional.is_empty() && !self.named.is_empty()
    }
}

fn placeholder_name(name: &str) -> String {
    if name.starts_with([':', '@', '$']) {
        name.to_string()
    } else {
        format!(":{name}")
    }
}

impl From<()> for Params {
    fn from(_: ()) -> Self {
        Params::default()
    }
}

impl<V: Into<Value>> From<Vec<V>> for Params {
    fn from(values: Vec<V>) -> Self {
        Params {
            positional: values.into_iter().map(Into::into).collect(),
            named: Vec::new(),
        }
    }
}

impl<V: Into<Value>, const N: usize> From<[V; N]> for Params {
    fn from(values: [V; N]) -> Self {
        Params {
            positional: values.into_iter().map(Into::into).collect(),
            named: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_builder() {
        let params = Params::new().with_value("Bob").with_value(1);
        assert_eq!(
            params.positional,
            vec![Value::Text("Bob".into()), Value::Integer(1)]
        );
        assert_eq!(params.len(), 2);
        assert!(!params.is_mixed());
    }

    #[test]
    fn named_builder_adds_prefix() {
        let params = Params::new().with_named("id", 1).with_named("@name", "Bob");
        assert_eq!(
            params.named,
            vec![
                (":id".to_string(), Value::Integer(1)),
                ("@name".to_string(), Value::Text("Bob".into())),
            ]
        );
    }

    #[test]
    fn from_collections() {
        assert!(Params::from(()).is_empty());
        assert_eq!(Params::from([1, 2]).len(), 2);
        assert_eq!(Params::from(vec![Value::Null]).positional, vec![Value::Null]);
    }

    #[test]
    fn mixed_styles_are_detected() {
        assert!(Params::new().with_value(1).with_named("id", 2).is_mixed());
    }
}
