use std::sync::Arc;

use crate::core::{Entity, Result, ValidationErrors, Value, Violation};
use crate::repo::query::Query;
use crate::repo::{Repository, RepositoryDecorator};
use crate::support::ExpressionEvaluator;

/// Derives computed attribute values at read time. The derived value is
/// never persisted; a write supplying one is rejected, not silently
/// ignored.
pub struct ComputedValueDecorator {
    inner: Box<dyn Repository>,
    expressions: Arc<dyn ExpressionEvaluator>,
}

impl ComputedValueDecorator {
    pub const NAME: &'static str = "ComputedValue";

    pub fn new(inner: Box<dyn Repository>, expressions: Arc<dyn ExpressionEvaluator>) -> Self {
        Self { inner, expressions }
    }

    fn derive(&self, entity: &mut Entity) -> Result<()> {
        let meta = self.inner.metadata();
        for attr in meta.attributes() {
            let Some(expression) = attr.computed_expression() else {
                continue;
            };
            let value = self.expressions.evaluate(expression, entity)?;
            entity.set(attr.name(), value);
        }
        Ok(())
    }

    fn derive_all(&self, mut entities: Vec<Entity>) -> Result<Vec<Entity>> {
        for entity in &mut entities {
            self.derive(entity)?;
        }
        Ok(entities)
    }

    fn reject_computed_writes(&self, entities: &[Entity]) -> Result<()> {
        let meta = self.inner.metadata();
        let mut errors = ValidationErrors::new();
        for entity in entities {
            for attr in meta.attributes() {
                if !attr.is_computed() {
                    continue;
                }
                if matches!(entity.get(attr.name()), Some(value) if !value.is_null()) {
                    errors.push(Violation::new(
                        attr.name(),
                        "is computed and cannot be written",
                    ));
                }
            }
        }
        errors.into_result()
    }
}

impl RepositoryDecorator for ComputedValueDecorator {
    fn inner(&self) -> &dyn Repository {
        self.inner.as_ref()
    }

    fn decorator_name(&self) -> &'static str {
        Self::NAME
    }

    fn find_one(&self, id: &Value) -> Result<Option<Entity>> {
        match self.inner.find_one(id)? {
            Some(mut entity) => {
                self.derive(&mut entity)?;
                Ok(Some(entity))
            }
            None => Ok(None),
        }
    }

    fn find_all(&self, query: &Query) -> Result<Vec<Entity>> {
        let entities = self.inner.find_all(query)?;
        self.derive_all(entities)
    }

    fn add(&self, entity: Entity) -> Result<Entity> {
        self.reject_computed_writes(std::slice::from_ref(&entity))?;
        self.inner.add(entity)
    }

    fn add_all(&self, entities: Vec<Entity>) -> Result<Vec<Entity>> {
        self.reject_computed_writes(&entities)?;
        self.inner.add_all(entities)
    }

    fn update(&self, entity: Entity) -> Result<()> {
        self.reject_computed_writes(std::slice::from_ref(&entity))?;
        self.inner.update(entity)
    }

    fn update_all(&self, entities: Vec<Entity>) -> Result<()> {
        self.reject_computed_writes(&entities)?;
        self.inner.update_all(entities)
    }
}
