//! Run state: named fields checked against a declared schema, merged once per step.
//!
//! A `State` is an immutable snapshot. Steps never mutate it; they return a
//! `PartialState` that `StateSchema::merge` overlays onto a copy. Fields missing from
//! the partial keep their value; a field set to `null` becomes absent.
//!
//! **Interaction**: `Node::run` reads `&State` and returns `PartialState`;
//! `CompiledStateGraph` merges and checkpoints the result.

mod partial;
mod schema;

pub use partial::PartialState;
pub use schema::{FieldKind, StateSchema, StateSchemaBuilder};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Snapshot of a run's state. Absent fields are simply not present in the map.
///
/// Built only through `StateSchema::initial` / `StateSchema::merge` (or deserialized
/// from a checkpoint), so every stored value has already passed schema validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct State {
    fields: BTreeMap<String, Value>,
}

impl State {
    /// Value of `field`, or `None` when absent.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// String value of `field`; `None` when absent or not a string.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    /// True when `field` holds a value.
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Present fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// State as a JSON object (for printing and debugging).
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}
