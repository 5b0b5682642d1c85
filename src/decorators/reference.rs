use std::sync::Arc;

use crate::core::{DataError, Entity, Result, Value};
use crate::meta::EntityTypeMetadata;
use crate::repo::query::Query;
use crate::repo::{Repository, RepositoryDecorator};
use crate::service::DataService;

/// Expands xref id values into the referenced records on the read side,
/// bounded by the query's fetch depth. On the write side both forms are
/// accepted: a resolved record is normalized back to its id before the
/// inner repository sees it.
pub struct ReferenceResolverDecorator {
    inner: Box<dyn Repository>,
    data_service: Arc<DataService>,
    default_depth: usize,
}

impl ReferenceResolverDecorator {
    pub const NAME: &'static str = "ReferenceResolver";

    pub fn new(
        inner: Box<dyn Repository>,
        data_service: Arc<DataService>,
        default_depth: usize,
    ) -> Self {
        Self {
            inner,
            data_service,
            default_depth,
        }
    }

    /// Fetches a referenced record without triggering the target's own
    /// resolution pass; nesting is handled here so the caller's depth bound
    /// holds across types.
    fn fetch_referenced(&self, target_type: &str, id: &Value) -> Result<Option<Entity>> {
        let target = self.data_service.repository(target_type)?;
        let target_meta = target.metadata();
        let query = Query::new()
            .eq(target_meta.id_attribute(), id.clone())
            .fetch_depth(0);
        Ok(target.find_all(&query)?.into_iter().next())
    }

    fn resolve(&self, meta: &EntityTypeMetadata, entity: &mut Entity, depth: usize) -> Result<()> {
        if depth == 0 {
            return Ok(());
        }
        for attr in meta.attributes() {
            let Some(target_type) = attr.ref_entity() else {
                continue;
            };
            let id = match entity.get(attr.name()) {
                Some(value @ (Value::Text(_) | Value::Int(_))) => value.clone(),
                _ => continue,
            };
            if let Some(mut referenced) = self.fetch_referenced(target_type, &id)? {
                let target_meta = self.data_service.repository(target_type)?.metadata();
                self.resolve(&target_meta, &mut referenced, depth - 1)?;
                entity.set(attr.name(), Value::Record(Box::new(referenced)));
            }
        }
        Ok(())
    }

    /// Replaces resolved records by their ids; backends only store scalars.
    fn normalize(&self, meta: &EntityTypeMetadata, entity: &mut Entity) -> Result<()> {
        for attr in meta.attributes() {
            let Some(target_type) = attr.ref_entity() else {
                continue;
            };
            let Some(Value::Record(record)) = entity.get(attr.name()).cloned() else {
                continue;
            };
            let target_meta = self.data_service.repository(target_type)?.metadata();
            let id = record.id(&target_meta).map_err(|_| {
                DataError::Backend(format!(
                    "referenced '{}' entity in attribute '{}' has no id",
                    target_type,
                    attr.name()
                ))
            })?;
            entity.set(attr.name(), id);
        }
        Ok(())
    }

    fn normalize_all(&self, mut entities: Vec<Entity>) -> Result<Vec<Entity>> {
        let meta = self.inner.metadata();
        for entity in &mut entities {
            self.normalize(&meta, entity)?;
        }
        Ok(entities)
    }
}

impl RepositoryDecorator for ReferenceResolverDecorator {
    fn inner(&self) -> &dyn Repository {
        self.inner.as_ref()
    }

    fn decorator_name(&self) -> &'static str {
        Self::NAME
    }

    fn find_one(&self, id: &Value) -> Result<Option<Entity>> {
        match self.inner.find_one(id)? {
            Some(mut entity) => {
                let meta = self.inner.metadata();
                self.resolve(&meta, &mut entity, self.default_depth)?;
                Ok(Some(entity))
            }
            None => Ok(None),
        }
    }

    fn find_all(&self, query: &Query) -> Result<Vec<Entity>> {
        let mut entities = self.inner.find_all(query)?;
        let meta = self.inner.metadata();
        for entity in &mut entities {
            self.resolve(&meta, entity, query.get_fetch_depth())?;
        }
        Ok(entities)
    }

    fn add(&self, mut entity: Entity) -> Result<Entity> {
        let meta = self.inner.metadata();
        self.normalize(&meta, &mut entity)?;
        self.inner.add(entity)
    }

    fn add_all(&self, entities: Vec<Entity>) -> Result<Vec<Entity>> {
        self.inner.add_all(self.normalize_all(entities)?)
    }

    fn update(&self, mut entity: Entity) -> Result<()> {
        let meta = self.inner.metadata();
        self.normalize(&meta, &mut entity)?;
        self.inner.update(entity)
    }

    fn update_all(&self, entities: Vec<Entity>) -> Result<()> {
        self.inner.update_all(self.normalize_all(entities)?)
    }
}
