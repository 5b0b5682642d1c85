use serde::{Deserialize, Serialize};

use crate::core::DataType;

/// Describes one attribute of an entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeMetadata {
    name: String,
    data_type: DataType,
    nillable: bool,
    unique: bool,
    auto: bool,
    /// Expression deriving this attribute's value at read time. A computed
    /// attribute is never persisted.
    computed_expression: Option<String>,
    /// Boolean expression every stored value must satisfy.
    validation_expression: Option<String>,
    /// Target entity type name for `DataType::Xref` attributes.
    ref_entity: Option<String>,
}

impl AttributeMetadata {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nillable: true,
            unique: false,
            auto: false,
            computed_expression: None,
            validation_expression: None,
            ref_entity: None,
        }
    }

    pub fn nillable(mut self, nillable: bool) -> Self {
        self.nillable = nillable;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Marks the attribute auto-generated: the auto-value layer fills it
    /// when the caller leaves it empty.
    pub fn auto(mut self) -> Self {
        self.auto = true;
        self
    }

    pub fn computed(mut self, expression: impl Into<String>) -> Self {
        self.computed_expression = Some(expression.into());
        self
    }

    pub fn validation(mut self, expression: impl Into<String>) -> Self {
        self.validation_expression = Some(expression.into());
        self
    }

    pub fn references(mut self, entity_type: impl Into<String>) -> Self {
        self.ref_entity = Some(entity_type.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn is_nillable(&self) -> bool {
        self.nillable
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn is_auto(&self) -> bool {
        self.auto
    }

    pub fn is_computed(&self) -> bool {
        self.computed_expression.is_some()
    }

    pub fn computed_expression(&self) -> Option<&str> {
        self.computed_expression.as_deref()
    }

    pub fn validation_expression(&self) -> Option<&str> {
        self.validation_expression.as_deref()
    }

    pub fn ref_entity(&self) -> Option<&str> {
        self.ref_entity.as_deref()
    }
}
