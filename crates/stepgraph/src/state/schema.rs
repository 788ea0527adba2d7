//! Declared state fields and the merge that enforces them.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::StateError;

use super::{PartialState, State};

/// Semantic type of a declared field. Every kind also accepts `null` (absent).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Any string.
    Text,
    /// One of a closed list of strings.
    Enum(Vec<String>),
    /// Any JSON value.
    Any,
}

impl FieldKind {
    fn describe(&self) -> &'static str {
        match self {
            FieldKind::Text => "a string",
            FieldKind::Enum(_) => "an enum string",
            FieldKind::Any => "any value",
        }
    }

    fn check(&self, field: &str, value: &Value) -> Result<(), StateError> {
        match (self, value) {
            (_, Value::Null) | (FieldKind::Any, _) | (FieldKind::Text, Value::String(_)) => Ok(()),
            (FieldKind::Enum(variants), Value::String(s)) => {
                if variants.iter().any(|v| v == s) {
                    Ok(())
                } else {
                    Err(StateError::InvalidVariant {
                        field: field.to_string(),
                        value: s.clone(),
                        allowed: variants.clone(),
                    })
                }
            }
            (kind, other) => Err(StateError::TypeMismatch {
                field: field.to_string(),
                expected: kind.describe(),
                found: json_type(other),
            }),
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// The fixed set of fields a graph's state may hold.
///
/// **Interaction**: Passed to `StateGraph::new`; the compiled graph uses it to build the
/// initial state and to merge every step's `PartialState`.
#[derive(Debug, Clone, Default)]
pub struct StateSchema {
    fields: BTreeMap<String, FieldKind>,
}

impl StateSchema {
    pub fn builder() -> StateSchemaBuilder {
        StateSchemaBuilder::default()
    }

    /// Kind of a declared field.
    pub fn field(&self, name: &str) -> Option<&FieldKind> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldKind)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Checks every field of `partial` without applying anything.
    pub fn validate(&self, partial: &PartialState) -> Result<(), StateError> {
        for (field, value) in partial.iter() {
            let kind = self
                .fields
                .get(field)
                .ok_or_else(|| StateError::UnknownField(field.to_string()))?;
            kind.check(field, value)?;
        }
        Ok(())
    }

    /// Builds a run's initial state from caller-supplied values (any field may be absent).
    pub fn initial(&self, values: &PartialState) -> Result<State, StateError> {
        self.merge(&State::default(), values)
    }

    /// Returns `current` with `partial` overlaid. `current` is left untouched.
    ///
    /// The whole update is validated first, so a rejected update changes nothing.
    pub fn merge(&self, current: &State, partial: &PartialState) -> Result<State, StateError> {
        self.validate(partial)?;
        let mut next = current.clone();
        for (field, value) in partial.iter() {
            if value.is_null() {
                next.fields.remove(field);
            } else {
                next.fields.insert(field.to_string(), value.clone());
            }
        }
        Ok(next)
    }
}

/// Builder for `StateSchema`. Declaring a field twice keeps the last kind.
#[derive(Debug, Default)]
pub struct StateSchemaBuilder {
    fields: BTreeMap<String, FieldKind>,
}

impl StateSchemaBuilder {
    pub fn text(mut self, name: impl Into<String>) -> Self {
        self.fields.insert(name.into(), FieldKind::Text);
        self
    }

    pub fn enumeration<I, V>(mut self, name: impl Into<String>, variants: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let variants = variants.into_iter().map(Into::into).collect();
        self.fields.insert(name.into(), FieldKind::Enum(variants));
        self
    }

    pub fn any(mut self, name: impl Into<String>) -> Self {
        self.fields.insert(name.into(), FieldKind::Any);
        self
    }

    pub fn build(self) -> StateSchema {
        StateSchema {
            fields: self.fields,
        }
    }
}
