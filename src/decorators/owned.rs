use std::sync::Arc;

use crate::core::{DataError, Entity, Result, Value};
use crate::meta::OWNER_ATTRIBUTE;
use crate::repo::query::Query;
use crate::repo::{Repository, RepositoryDecorator};
use crate::support::{Action, PermissionChecker};

/// Row-level access for ownable entity types: reads are filtered to the
/// caller's own records, writes are stamped with the caller's username and
/// deletes of foreign records are denied. Elevated callers bypass all
/// three.
pub struct OwnershipDecorator {
    inner: Box<dyn Repository>,
    permissions: Arc<dyn PermissionChecker>,
}

impl OwnershipDecorator {
    pub const NAME: &'static str = "Ownership";

    pub fn new(inner: Box<dyn Repository>, permissions: Arc<dyn PermissionChecker>) -> Self {
        Self { inner, permissions }
    }

    fn caller(&self) -> Result<Option<String>> {
        if self.permissions.is_elevated() {
            return Ok(None);
        }
        match self.permissions.current_username() {
            Some(username) => Ok(Some(username)),
            None => Err(DataError::Authorization {
                entity_type: self.inner.metadata().name().to_string(),
                permission: Action::Read.to_string(),
            }),
        }
    }

    fn scoped_query(&self, query: &Query) -> Result<Query> {
        let mut scoped = query.clone();
        if let Some(username) = self.caller()? {
            scoped.and_eq(OWNER_ATTRIBUTE, username);
        }
        Ok(scoped)
    }

    fn stamp(&self, entity: &mut Entity) -> Result<()> {
        if let Some(username) = self.caller()? {
            entity.set(OWNER_ATTRIBUTE, username);
        }
        Ok(())
    }

    fn check_owned(&self, id: &Value) -> Result<()> {
        let Some(username) = self.caller()? else {
            return Ok(());
        };
        let meta = self.inner.metadata();
        if let Some(existing) = self.inner.find_one(id)? {
            let owner = existing.get(OWNER_ATTRIBUTE);
            if owner != Some(&Value::Text(username)) {
                return Err(DataError::Authorization {
                    entity_type: meta.name().to_string(),
                    permission: Action::Write.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl RepositoryDecorator for OwnershipDecorator {
    fn inner(&self) -> &dyn Repository {
        self.inner.as_ref()
    }

    fn decorator_name(&self) -> &'static str {
        Self::NAME
    }

    fn find_one(&self, id: &Value) -> Result<Option<Entity>> {
        let entity = self.inner.find_one(id)?;
        if let (Some(entity), Some(username)) = (&entity, self.caller()?) {
            if entity.get(OWNER_ATTRIBUTE) != Some(&Value::Text(username)) {
                return Ok(None);
            }
        }
        Ok(entity)
    }

    fn find_all(&self, query: &Query) -> Result<Vec<Entity>> {
        self.inner.find_all(&self.scoped_query(query)?)
    }

    fn count(&self, query: &Query) -> Result<u64> {
        self.inner.count(&self.scoped_query(query)?)
    }

    fn aggregate(&self, attribute: &str, query: &Query) -> Result<Vec<(Value, u64)>> {
        self.inner.aggregate(attribute, &self.scoped_query(query)?)
    }

    fn add(&self, mut entity: Entity) -> Result<Entity> {
        self.stamp(&mut entity)?;
        self.inner.add(entity)
    }

    fn add_all(&self, mut entities: Vec<Entity>) -> Result<Vec<Entity>> {
        for entity in &mut entities {
            self.stamp(entity)?;
        }
        self.inner.add_all(entities)
    }

    fn update(&self, mut entity: Entity) -> Result<()> {
        let id = entity.id(&self.inner.metadata())?;
        self.check_owned(&id)?;
        self.stamp(&mut entity)?;
        self.inner.update(entity)
    }

    fn update_all(&self, mut entities: Vec<Entity>) -> Result<()> {
        let meta = self.inner.metadata();
        for entity in &mut entities {
            let id = entity.id(&meta)?;
            self.check_owned(&id)?;
            self.stamp(entity)?;
        }
        self.inner.update_all(entities)
    }

    fn delete_by_id(&self, id: &Value) -> Result<()> {
        self.check_owned(id)?;
        self.inner.delete_by_id(id)
    }

    fn delete_all(&self, ids: &[Value]) -> Result<()> {
        for id in ids {
            self.check_owned(id)?;
        }
        self.inner.delete_all(ids)
    }
}
