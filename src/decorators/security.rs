use std::sync::Arc;

use crate::core::{DataError, Entity, Result, Value};
use crate::repo::query::Query;
use crate::repo::{Repository, RepositoryDecorator};
use crate::support::{Action, PermissionChecker};

/// Outermost layer: checks the caller's permission before anything else
/// sees the request. A denied call never reaches the inner repository.
pub struct SecurityDecorator {
    inner: Box<dyn Repository>,
    permissions: Arc<dyn PermissionChecker>,
}

impl SecurityDecorator {
    pub const NAME: &'static str = "Security";

    pub fn new(inner: Box<dyn Repository>, permissions: Arc<dyn PermissionChecker>) -> Self {
        Self { inner, permissions }
    }

    fn check(&self, action: Action) -> Result<()> {
        let entity_type = self.inner.metadata().name().to_string();
        if self.permissions.has_permission(&entity_type, action) {
            Ok(())
        } else {
            Err(DataError::Authorization {
                entity_type,
                permission: action.to_string(),
            })
        }
    }
}

impl RepositoryDecorator for SecurityDecorator {
    fn inner(&self) -> &dyn Repository {
        self.inner.as_ref()
    }

    fn decorator_name(&self) -> &'static str {
        Self::NAME
    }

    fn find_one(&self, id: &Value) -> Result<Option<Entity>> {
        self.check(Action::Read)?;
        self.inner.find_one(id)
    }

    fn find_all(&self, query: &Query) -> Result<Vec<Entity>> {
        self.check(Action::Read)?;
        self.inner.find_all(query)
    }

    fn count(&self, query: &Query) -> Result<u64> {
        self.check(Action::Count)?;
        self.inner.count(query)
    }

    fn aggregate(&self, attribute: &str, query: &Query) -> Result<Vec<(Value, u64)>> {
        self.check(Action::Read)?;
        self.inner.aggregate(attribute, query)
    }

    fn add(&self, entity: Entity) -> Result<Entity> {
        self.check(Action::Write)?;
        self.inner.add(entity)
    }

    fn add_all(&self, entities: Vec<Entity>) -> Result<Vec<Entity>> {
        self.check(Action::Write)?;
        self.inner.add_all(entities)
    }

    fn update(&self, entity: Entity) -> Result<()> {
        self.check(Action::Write)?;
        self.inner.update(entity)
    }

    fn update_all(&self, entities: Vec<Entity>) -> Result<()> {
        self.check(Action::Write)?;
        self.inner.update_all(entities)
    }

    fn delete_by_id(&self, id: &Value) -> Result<()> {
        self.check(Action::Write)?;
        self.inner.delete_by_id(id)
    }

    fn delete_all(&self, ids: &[Value]) -> Result<()> {
        self.check(Action::Write)?;
        self.inner.delete_all(ids)
    }

    fn clear(&self) -> Result<()> {
        self.check(Action::Write)?;
        self.inner.clear()
    }

    fn rebuild_index(&self) -> Result<()> {
        // Same guard as any write
        self.check(Action::Write)?;
        self.inner.rebuild_index()
    }

    fn flush(&self) -> Result<()> {
        self.check(Action::Write)?;
        self.inner.flush()
    }
}
