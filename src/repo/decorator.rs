use std::collections::BTreeSet;
use std::sync::Arc;

use crate::core::{Entity, Result, Value};
use crate::meta::EntityTypeMetadata;
use crate::repo::query::Query;
use crate::repo::{Repository, RepositoryCapability};

/// A cross-cutting behavior wrapped around exactly one inner repository.
///
/// Every method defaults to pass-through delegation; a decorator overrides
/// only the operations its behavior touches. The blanket impl below turns
/// any `RepositoryDecorator` into a full [`Repository`], which is what makes
/// the chain compose: each layer is again a repository.
///
/// Metadata is forwarded unchanged; none of the core decorators override it.
pub trait RepositoryDecorator: Send + Sync {
    fn inner(&self) -> &dyn Repository;

    /// Name reported in [`Repository::layers`].
    fn decorator_name(&self) -> &'static str;

    fn find_one(&self, id: &Value) -> Result<Option<Entity>> {
        self.inner().find_one(id)
    }

    fn find_all(&self, query: &Query) -> Result<Vec<Entity>> {
        self.inner().find_all(query)
    }

    fn count(&self, query: &Query) -> Result<u64> {
        self.inner().count(query)
    }

    fn aggregate(&self, attribute: &str, query: &Query) -> Result<Vec<(Value, u64)>> {
        self.inner().aggregate(attribute, query)
    }

    fn add(&self, entity: Entity) -> Result<Entity> {
        self.inner().add(entity)
    }

    fn add_all(&self, entities: Vec<Entity>) -> Result<Vec<Entity>> {
        self.inner().add_all(entities)
    }

    fn update(&self, entity: Entity) -> Result<()> {
        self.inner().update(entity)
    }

    fn update_all(&self, entities: Vec<Entity>) -> Result<()> {
        self.inner().update_all(entities)
    }

    fn delete_by_id(&self, id: &Value) -> Result<()> {
        self.inner().delete_by_id(id)
    }

    fn delete_all(&self, ids: &[Value]) -> Result<()> {
        self.inner().delete_all(ids)
    }

    fn clear(&self) -> Result<()> {
        self.inner().clear()
    }

    fn rebuild_index(&self) -> Result<()> {
        self.inner().rebuild_index()
    }

    fn flush(&self) -> Result<()> {
        self.inner().flush()
    }

    fn capabilities(&self) -> BTreeSet<RepositoryCapability> {
        self.inner().capabilities()
    }
}

impl<T: RepositoryDecorator> Repository for T {
    fn metadata(&self) -> Arc<EntityTypeMetadata> {
        self.inner().metadata()
    }

    fn layers(&self) -> Vec<&'static str> {
        let mut chain = vec![self.decorator_name()];
        chain.extend(self.inner().layers());
        chain
    }

    fn capabilities(&self) -> BTreeSet<RepositoryCapability> {
        RepositoryDecorator::capabilities(self)
    }

    fn find_one(&self, id: &Value) -> Result<Option<Entity>> {
        RepositoryDecorator::find_one(self, id)
    }

    fn find_all(&self, query: &Query) -> Result<Vec<Entity>> {
        RepositoryDecorator::find_all(self, query)
    }

    fn count(&self, query: &Query) -> Result<u64> {
        RepositoryDecorator::count(self, query)
    }

    fn aggregate(&self, attribute: &str, query: &Query) -> Result<Vec<(Value, u64)>> {
        RepositoryDecorator::aggregate(self, attribute, query)
    }

    fn add(&self, entity: Entity) -> Result<Entity> {
        RepositoryDecorator::add(self, entity)
    }

    fn add_all(&self, entities: Vec<Entity>) -> Result<Vec<Entity>> {
        RepositoryDecorator::add_all(self, entities)
    }

    fn update(&self, entity: Entity) -> Result<()> {
        RepositoryDecorator::update(self, entity)
    }

    fn update_all(&self, entities: Vec<Entity>) -> Result<()> {
        RepositoryDecorator::update_all(self, entities)
    }

    fn delete_by_id(&self, id: &Value) -> Result<()> {
        RepositoryDecorator::delete_by_id(self, id)
    }

    fn delete_all(&self, ids: &[Value]) -> Result<()> {
        RepositoryDecorator::delete_all(self, ids)
    }

    fn clear(&self) -> Result<()> {
        RepositoryDecorator::clear(self)
    }

    fn rebuild_index(&self) -> Result<()> {
        RepositoryDecorator::rebuild_index(self)
    }

    fn flush(&self) -> Result<()> {
        RepositoryDecorator::flush(self)
    }
}
