use std::collections::HashSet;
use std::sync::Arc;

use crate::core::{DataError, Result};
use crate::meta::attribute::AttributeMetadata;
use crate::meta::SYSTEM_ACCOUNT_ENTITY;

/// The small, closed set of entity types that receive bespoke decoration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WellKnownType {
    /// The privileged system account type.
    SystemAccount,
}

impl WellKnownType {
    pub fn of(entity_type_name: &str) -> Option<Self> {
        match entity_type_name {
            SYSTEM_ACCOUNT_ENTITY => Some(Self::SystemAccount),
            _ => None,
        }
    }
}

/// Immutable description of one entity collection.
///
/// Built through [`EntityTypeBuilder`], which validates the structural
/// invariants once, at wiring time.
#[derive(Debug)]
pub struct EntityTypeMetadata {
    name: String,
    backend: String,
    id_attribute: String,
    extends: Option<Arc<EntityTypeMetadata>>,
    own_attributes: Vec<AttributeMetadata>,
    /// Parent-first flattened attribute list, resolved once at build time.
    flattened: Vec<AttributeMetadata>,
    is_abstract: bool,
}

impl EntityTypeMetadata {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    pub fn id_attribute(&self) -> &str {
        &self.id_attribute
    }

    pub fn extends(&self) -> Option<&Arc<EntityTypeMetadata>> {
        self.extends.as_ref()
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Attributes declared directly on this type.
    pub fn own_attributes(&self) -> &[AttributeMetadata] {
        &self.own_attributes
    }

    /// All attributes, inherited ones first.
    pub fn attributes(&self) -> &[AttributeMetadata] {
        &self.flattened
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeMetadata> {
        self.flattened.iter().find(|a| a.name() == name)
    }

    /// Walks the `extends` chain looking for a type of the given name.
    pub fn extends_type(&self, type_name: &str) -> bool {
        let mut current = self.extends.as_ref();
        while let Some(parent) = current {
            if parent.name() == type_name {
                return true;
            }
            current = parent.extends();
        }
        false
    }

    /// Ownable types extend the `sys_Owned` trait type.
    pub fn is_ownable(&self) -> bool {
        self.extends_type(crate::meta::OWNED_ENTITY)
    }

    pub fn well_known(&self) -> Option<WellKnownType> {
        WellKnownType::of(&self.name)
    }
}

/// Builder validating and assembling [`EntityTypeMetadata`].
pub struct EntityTypeBuilder {
    name: String,
    backend: String,
    id_attribute: Option<String>,
    extends: Option<Arc<EntityTypeMetadata>>,
    attributes: Vec<AttributeMetadata>,
    is_abstract: bool,
}

impl EntityTypeBuilder {
    pub fn new(name: impl Into<String>, backend: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            backend: backend.into(),
            id_attribute: None,
            extends: None,
            attributes: Vec::new(),
            is_abstract: false,
        }
    }

    pub fn attribute(mut self, attribute: AttributeMetadata) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn id_attribute(mut self, name: impl Into<String>) -> Self {
        self.id_attribute = Some(name.into());
        self
    }

    pub fn extends(mut self, parent: Arc<EntityTypeMetadata>) -> Self {
        self.extends = Some(parent);
        self
    }

    /// Marks a trait type that only exists to be extended.
    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn build(self) -> Result<Arc<EntityTypeMetadata>> {
        let name = self.name;

        let id_attribute = self.id_attribute.ok_or_else(|| {
            DataError::configuration(&name, "no id attribute declared")
        })?;

        // Parent-first flattened list; names must be unique across the chain.
        let mut flattened: Vec<AttributeMetadata> = Vec::new();
        if let Some(parent) = &self.extends {
            flattened.extend(parent.attributes().iter().cloned());
        }
        flattened.extend(self.attributes.iter().cloned());

        let mut seen = HashSet::new();
        for attr in &flattened {
            if !seen.insert(attr.name().to_string()) {
                return Err(DataError::configuration(
                    &name,
                    format!("duplicate attribute '{}' in inheritance chain", attr.name()),
                ));
            }
        }

        let id = flattened
            .iter()
            .find(|a| a.name() == id_attribute)
            .ok_or_else(|| {
                DataError::configuration(
                    &name,
                    format!("id attribute '{}' not found in attribute list", id_attribute),
                )
            })?;
        if id.is_nillable() {
            return Err(DataError::configuration(
                &name,
                format!("id attribute '{}' may not be nillable", id_attribute),
            ));
        }
        if id.is_computed() {
            return Err(DataError::configuration(
                &name,
                format!("id attribute '{}' may not be computed", id_attribute),
            ));
        }

        Ok(Arc::new(EntityTypeMetadata {
            name,
            backend: self.backend,
            id_attribute,
            extends: self.extends,
            own_attributes: self.attributes,
            flattened,
            is_abstract: self.is_abstract,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DataType;
    use crate::meta::{owned_entity_metadata, OWNED_ENTITY, OWNER_ATTRIBUTE};

    fn person_builder() -> EntityTypeBuilder {
        EntityTypeBuilder::new("person", "memory")
            .attribute(AttributeMetadata::new("id", DataType::Text).nillable(false))
            .attribute(AttributeMetadata::new("name", DataType::Text))
            .id_attribute("id")
    }

    #[test]
    fn test_build_validates_id_attribute_exists() {
        let err = EntityTypeBuilder::new("broken", "memory")
            .attribute(AttributeMetadata::new("name", DataType::Text))
            .id_attribute("id")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("broken"));
        assert!(err.to_string().contains("id"));
    }

    #[test]
    fn test_build_requires_id_attribute_declared() {
        let err = EntityTypeBuilder::new("broken", "memory")
            .attribute(AttributeMetadata::new("name", DataType::Text))
            .build()
            .unwrap_err();
        assert!(matches!(err, DataError::Configuration { .. }));
    }

    #[test]
    fn test_nillable_id_rejected() {
        let err = EntityTypeBuilder::new("broken", "memory")
            .attribute(AttributeMetadata::new("id", DataType::Text))
            .id_attribute("id")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("nillable"));
    }

    #[test]
    fn test_attribute_inheritance_is_flattened() {
        let owned = owned_entity_metadata().unwrap();
        let note = EntityTypeBuilder::new("note", "memory")
            .extends(owned)
            .attribute(AttributeMetadata::new("text", DataType::Text))
            .id_attribute("id")
            .build()
            .unwrap();

        let names: Vec<&str> = note.attributes().iter().map(|a| a.name()).collect();
        assert_eq!(names, vec!["id", OWNER_ATTRIBUTE, "text"]);
        assert!(note.is_ownable());
        assert!(note.extends_type(OWNED_ENTITY));
    }

    #[test]
    fn test_duplicate_attribute_in_chain_rejected() {
        let owned = owned_entity_metadata().unwrap();
        let err = EntityTypeBuilder::new("note", "memory")
            .extends(owned)
            .attribute(AttributeMetadata::new(OWNER_ATTRIBUTE, DataType::Text))
            .id_attribute("id")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_well_known_lookup() {
        let person = person_builder().build().unwrap();
        assert_eq!(person.well_known(), None);
        assert_eq!(
            WellKnownType::of(crate::meta::SYSTEM_ACCOUNT_ENTITY),
            Some(WellKnownType::SystemAccount)
        );
    }
}
