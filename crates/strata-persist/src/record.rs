//! The transport-neutral component record.
//!
//! A [`ComponentRecord`] is a type tag plus an ordered list of
//! [`NameValue`] pairs. Names keep the case they were registered with;
//! readers match them ignoring case. Absent values are never represented.

use serde::{Deserialize, Serialize};

use crate::field::fold_name;
use crate::value::Value;

/// One encoded field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameValue {
    pub name: String,
    pub value: Value,
}

/// Encoded form of one component instance (or of a delta between two).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentRecord {
    /// Registered component type name.
    pub type_name: String,
    /// Encoded fields in write order.
    pub fields: Vec<NameValue>,
}

impl ComponentRecord {
    /// An empty record tagged with `type_name`.
    pub fn new(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_owned(),
            fields: Vec::new(),
        }
    }

    pub fn push(&mut self, name: &str, value: Value) {
        self.fields.push(NameValue {
            name: name.to_owned(),
            value,
        });
    }

    /// Builder-style [`push`](Self::push).
    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.push(name, value.into());
        self
    }

    /// First value whose name matches `name` ignoring case.
    pub fn get(&self, name: &str) -> Option<&Value> {
        let key = fold_name(name);
        self.fields
            .iter()
            .find(|nv| fold_name(&nv.name) == key)
            .map(|nv| &nv.value)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|nv| nv.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_ignores_case_and_keeps_written_case() {
        let record = ComponentRecord::new("Position")
            .with_field("X", 1.0)
            .with_field("name", "A");
        assert_eq!(record.get("x"), Some(&Value::Float(1.0)));
        assert_eq!(record.get("NAME"), Some(&Value::String("A".to_owned())));
        assert_eq!(record.field_names().collect::<Vec<_>>(), vec!["X", "name"]);
    }

    #[test]
    fn empty_record() {
        let record = ComponentRecord::new("Tag");
        assert!(record.is_empty());
        assert_eq!(record.len(), 0);
        assert!(record.get("anything").is_none());
    }
}
