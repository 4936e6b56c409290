// Target record model - JSON documents with selector/modifier semantics
//
// Target records are schemaless JSON objects addressed by a string id within
// a named collection. Handlers refine which record their mutation applies to
// with an equality `Selector` (always intersected with the target id by the
// store adapter) and describe the mutation with a `Modifier`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A target record: a JSON object keyed by field name.
pub type Document = Map<String, Value>;

/// Equality match on top-level document fields.
///
/// An empty selector matches every document. The store adapter always scopes
/// the match by the job's target id first; the selector only narrows it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selector(pub Map<String, Value>);

impl Selector {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `doc` satisfies every field equality in this selector.
    pub fn matches(&self, doc: &Document) -> bool {
        self.0
            .iter()
            .all(|(field, expected)| doc.get(field) == Some(expected))
    }
}

impl From<Map<String, Value>> for Selector {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Mutation description applied to a matched document.
///
/// `set` overwrites fields, `unset` removes them, `inc` adds to numeric
/// fields (treating an absent field as 0). Application order: set, inc,
/// unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Modifier {
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub set: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unset: Vec<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub inc: Map<String, Value>,
}

impl Modifier {
    /// A modifier that only sets the given fields.
    pub fn set_fields(fields: Map<String, Value>) -> Self {
        Self {
            set: fields,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.unset.is_empty() && self.inc.is_empty()
    }

    /// Apply this modifier to `doc` in place.
    pub fn apply(&self, doc: &mut Document) {
        for (field, value) in &self.set {
            doc.insert(field.clone(), value.clone());
        }
        for (field, delta) in &self.inc {
            let current = doc.get(field).and_then(Value::as_f64).unwrap_or(0.0);
            let delta = delta.as_f64().unwrap_or(0.0);
            let sum = current + delta;
            // Keep integers integral when both sides are
            let value = if sum.fract() == 0.0 {
                Value::from(sum as i64)
            } else {
                Value::from(sum)
            };
            doc.insert(field.clone(), value);
        }
        for field in &self.unset {
            doc.remove(field);
        }
    }
}

/// Options forwarded with an update outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOptions {
    /// Insert a fresh document built from the modifier when no record matches.
    #[serde(default)]
    pub upsert: bool,
}
