use crate::core::{Entity, Result, Value};
use crate::meta::QUALIFIED_NAME_ATTRIBUTE;
use crate::repo::query::Query;
use crate::repo::{Repository, RepositoryDecorator};

/// Bespoke decoration for the privileged system account type: returned
/// records carry a derived, never-persisted qualified name; writes have it
/// stripped before delegation.
pub struct SystemAccountDecorator {
    inner: Box<dyn Repository>,
}

impl SystemAccountDecorator {
    pub const NAME: &'static str = "SystemAccount";

    pub fn new(inner: Box<dyn Repository>) -> Self {
        Self { inner }
    }

    fn qualify(&self, entity: &mut Entity) {
        let meta = self.inner.metadata();
        let id = entity
            .get(meta.id_attribute())
            .cloned()
            .unwrap_or(Value::Null);
        entity.set(
            QUALIFIED_NAME_ATTRIBUTE,
            Value::Text(format!("system:{}", id)),
        );
    }

    fn strip(entity: &mut Entity) {
        entity.take(QUALIFIED_NAME_ATTRIBUTE);
    }
}

impl RepositoryDecorator for SystemAccountDecorator {
    fn inner(&self) -> &dyn Repository {
        self.inner.as_ref()
    }

    fn decorator_name(&self) -> &'static str {
        Self::NAME
    }

    fn find_one(&self, id: &Value) -> Result<Option<Entity>> {
        match self.inner.find_one(id)? {
            Some(mut entity) => {
                self.qualify(&mut entity);
                Ok(Some(entity))
            }
            None => Ok(None),
        }
    }

    fn find_all(&self, query: &Query) -> Result<Vec<Entity>> {
        let mut entities = self.inner.find_all(query)?;
        for entity in &mut entities {
            self.qualify(entity);
        }
        Ok(entities)
    }

    fn add(&self, mut entity: Entity) -> Result<Entity> {
        Self::strip(&mut entity);
        let mut stored = self.inner.add(entity)?;
        self.qualify(&mut stored);
        Ok(stored)
    }

    fn add_all(&self, mut entities: Vec<Entity>) -> Result<Vec<Entity>> {
        for entity in &mut entities {
            Self::strip(entity);
        }
        let mut stored = self.inner.add_all(entities)?;
        for entity in &mut stored {
            self.qualify(entity);
        }
        Ok(stored)
    }

    fn update(&self, mut entity: Entity) -> Result<()> {
        Self::strip(&mut entity);
        self.inner.update(entity)
    }

    fn update_all(&self, mut entities: Vec<Entity>) -> Result<()> {
        for entity in &mut entities {
            Self::strip(entity);
        }
        self.inner.update_all(entities)
    }
}
