use std::sync::Arc;

use crate::core::{Entity, Result, ValidationErrors, Value, Violation};
use crate::meta::EntityTypeMetadata;
use crate::repo::query::Query;
use crate::repo::{Repository, RepositoryDecorator};
use crate::support::ExpressionEvaluator;

/// Validates every record against the metadata before the inner repository
/// sees it: declared type, nillable flag, uniqueness, unknown attributes and
/// attribute-level validation expressions.
///
/// All violations found in one pass are reported together, and any violation
/// aborts the whole batch, so a batch is never partially applied.
///
/// Uniqueness probes read the primary store directly, not the chain below:
/// the ownership layer would scope the probe to the caller's own records,
/// and the routed index lags behind batch writes.
pub struct ValidationDecorator {
    inner: Box<dyn Repository>,
    expressions: Arc<dyn ExpressionEvaluator>,
    primary: Arc<dyn Repository>,
}

enum WriteKind {
    Add,
    Update,
}

impl ValidationDecorator {
    pub const NAME: &'static str = "Validation";

    pub fn new(
        inner: Box<dyn Repository>,
        expressions: Arc<dyn ExpressionEvaluator>,
        primary: Arc<dyn Repository>,
    ) -> Self {
        Self {
            inner,
            expressions,
            primary,
        }
    }

    fn validate_batch(&self, entities: &[Entity], kind: WriteKind) -> Result<()> {
        let meta = self.inner.metadata();
        let mut errors = ValidationErrors::new();

        for entity in entities {
            self.validate_attributes(&meta, entity, &mut errors);
            self.validate_expressions(&meta, entity, &mut errors);
        }
        self.validate_uniqueness(&meta, entities, &kind, &mut errors);

        errors.into_result()
    }

    fn validate_attributes(
        &self,
        meta: &EntityTypeMetadata,
        entity: &Entity,
        errors: &mut ValidationErrors,
    ) {
        for name in entity.attribute_names() {
            if meta.attribute(name).is_none() {
                errors.push(Violation::new(
                    name.clone(),
                    format!("unknown attribute on entity type '{}'", meta.name()),
                ));
            }
        }

        for attr in meta.attributes() {
            // Writes to computed attributes are rejected one layer down.
            if attr.is_computed() {
                continue;
            }
            match entity.get(attr.name()) {
                None | Some(Value::Null) => {
                    if !attr.is_nillable() {
                        errors.push(Violation::new(attr.name(), "may not be null"));
                    }
                }
                Some(value) => {
                    if !attr.data_type().is_compatible(value) {
                        errors.push(Violation::new(
                            attr.name(),
                            format!(
                                "expects type {}, got {}",
                                attr.data_type(),
                                value.type_name()
                            ),
                        ));
                    }
                }
            }
        }
    }

    fn validate_expressions(
        &self,
        meta: &EntityTypeMetadata,
        entity: &Entity,
        errors: &mut ValidationErrors,
    ) {
        for attr in meta.attributes() {
            let Some(expression) = attr.validation_expression() else {
                continue;
            };
            match self.expressions.evaluate(expression, entity) {
                Ok(value) if value.as_bool() => {}
                Ok(_) => errors.push(Violation::new(
                    attr.name(),
                    format!("violates constraint '{}'", expression),
                )),
                Err(err) => errors.push(Violation::new(
                    attr.name(),
                    format!("constraint '{}' failed to evaluate: {}", expression, err),
                )),
            }
        }
    }

    fn validate_uniqueness(
        &self,
        meta: &EntityTypeMetadata,
        entities: &[Entity],
        kind: &WriteKind,
        errors: &mut ValidationErrors,
    ) {
        for attr in meta.attributes() {
            if !attr.is_unique() && attr.name() != meta.id_attribute() {
                continue;
            }
            // Duplicates within the batch itself
            let mut seen: Vec<&Value> = Vec::new();
            for entity in entities {
                let Some(value) = entity.get(attr.name()) else {
                    continue;
                };
                if value.is_null() {
                    continue;
                }
                if seen.contains(&value) {
                    errors.push(Violation::new(
                        attr.name(),
                        format!("duplicate value '{}' within batch", value),
                    ));
                    continue;
                }
                seen.push(value);

                // Collisions with stored records; on update the record may
                // collide with itself. The probe must see every owner's
                // records and records the index has not caught up with.
                let query = Query::new().eq(attr.name(), value.clone()).fetch_depth(0);
                match self.primary.find_all(&query) {
                    Ok(existing) => {
                        let own_id = entity.get(meta.id_attribute());
                        let collides = existing.iter().any(|candidate| match kind {
                            WriteKind::Add => true,
                            WriteKind::Update => candidate.get(meta.id_attribute()) != own_id,
                        });
                        if collides {
                            errors.push(Violation::new(
                                attr.name(),
                                format!("value '{}' is not unique", value),
                            ));
                        }
                    }
                    Err(err) => errors.push(Violation::new(
                        attr.name(),
                        format!("uniqueness check failed: {}", err),
                    )),
                }
            }
        }
    }
}

impl RepositoryDecorator for ValidationDecorator {
    fn inner(&self) -> &dyn Repository {
        self.inner.as_ref()
    }

    fn decorator_name(&self) -> &'static str {
        Self::NAME
    }

    fn add(&self, entity: Entity) -> Result<Entity> {
        self.validate_batch(std::slice::from_ref(&entity), WriteKind::Add)?;
        self.inner.add(entity)
    }

    fn add_all(&self, entities: Vec<Entity>) -> Result<Vec<Entity>> {
        self.validate_batch(&entities, WriteKind::Add)?;
        self.inner.add_all(entities)
    }

    fn update(&self, entity: Entity) -> Result<()> {
        self.validate_batch(std::slice::from_ref(&entity), WriteKind::Update)?;
        self.inner.update(entity)
    }

    fn update_all(&self, entities: Vec<Entity>) -> Result<()> {
        self.validate_batch(&entities, WriteKind::Update)?;
        self.inner.update_all(entities)
    }
}
