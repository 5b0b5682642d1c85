use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::value::Value;
use crate::core::{DataError, Result};
use crate::meta::EntityTypeMetadata;

/// One record of an entity type: attribute name to value.
///
/// Absent attributes and attributes set to `Value::Null` are equivalent on
/// the read side; backends may store either.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    values: BTreeMap<String, Value>,
}

impl Entity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter, convenient for literals in tests.
    pub fn with(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(attribute, value);
        self
    }

    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.values.get(attribute)
    }

    pub fn set(&mut self, attribute: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(attribute.into(), value.into());
    }

    pub fn take(&mut self, attribute: &str) -> Option<Value> {
        self.values.remove(attribute)
    }

    pub fn has(&self, attribute: &str) -> bool {
        self.values.contains_key(attribute)
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the id value as declared by the metadata.
    pub fn id(&self, meta: &EntityTypeMetadata) -> Result<Value> {
        match self.get(meta.id_attribute()) {
            Some(Value::Null) | None => Err(DataError::Backend(format!(
                "Entity of type '{}' has no value for id attribute '{}'",
                meta.name(),
                meta.id_attribute()
            ))),
            Some(value) => Ok(value.clone()),
        }
    }
}

impl FromIterator<(String, Value)> for Entity {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
