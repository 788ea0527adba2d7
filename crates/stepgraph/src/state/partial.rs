//! Partial state update returned by a step.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fields a step changed. `null` clears a field; an empty update means "no change".
///
/// Built with `set` / `clear` (builder style) or `insert`. Validated against the
/// schema only when merged, so a step can build it freely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartialState {
    updates: BTreeMap<String, Value>,
}

impl PartialState {
    /// Empty update (no state change).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `field` to `value` (builder).
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    /// Clears `field`, i.e. sets it to `null` (builder).
    pub fn clear(mut self, field: impl Into<String>) -> Self {
        self.updates.insert(field.into(), Value::Null);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.updates.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.updates.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.updates.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Overlays `later` on this update; fields in `later` win.
    pub fn overlay(mut self, later: &PartialState) -> Self {
        for (k, v) in &later.updates {
            self.updates.insert(k.clone(), v.clone());
        }
        self
    }
}

/// A step that produced nothing (`None`) is the same as an empty update.
impl From<Option<PartialState>> for PartialState {
    fn from(value: Option<PartialState>) -> Self {
        value.unwrap_or_default()
    }
}

impl<K, V> FromIterator<(K, V)> for PartialState
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            updates: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
