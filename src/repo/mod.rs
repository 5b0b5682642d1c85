//! The storage-agnostic repository abstraction and its decorator contract.

pub mod decorator;
pub mod memory;
pub mod query;

pub use decorator::RepositoryDecorator;
pub use memory::{MemoryBackend, MemoryRepository};
pub use query::{Filter, Query, Sort};

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::core::{DataError, Entity, Result, Value};
use crate::meta::EntityTypeMetadata;

/// What a repository instance can do beyond plain CRUD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RepositoryCapability {
    Writable,
    Aggregateable,
    Indexable,
}

/// CRUD + query access to one entity type's records, independent of backend.
///
/// Decorators implement this same contract, so `D2(D1(R))` is
/// indistinguishable from `R` to a caller apart from the added behavior.
/// Implementations must be safe for concurrent callers once constructed.
pub trait Repository: Send + Sync {
    fn metadata(&self) -> Arc<EntityTypeMetadata>;

    /// The decoration chain from the outermost layer inward, for
    /// introspection. Undecorated repositories report a single entry.
    fn layers(&self) -> Vec<&'static str>;

    fn capabilities(&self) -> BTreeSet<RepositoryCapability>;

    /// Point lookup. A missing id is `Ok(None)`, not an error.
    fn find_one(&self, id: &Value) -> Result<Option<Entity>>;

    fn find_all(&self, query: &Query) -> Result<Vec<Entity>>;

    fn count(&self, query: &Query) -> Result<u64>;

    /// Group-count aggregation over one attribute.
    fn aggregate(&self, attribute: &str, query: &Query) -> Result<Vec<(Value, u64)>>;

    /// Stores a record and returns it as stored (auto values filled in).
    fn add(&self, entity: Entity) -> Result<Entity>;

    fn add_all(&self, entities: Vec<Entity>) -> Result<Vec<Entity>>;

    /// Replaces the record with the entity's id; `NotFound` if absent.
    fn update(&self, entity: Entity) -> Result<()>;

    fn update_all(&self, entities: Vec<Entity>) -> Result<()>;

    /// `NotFound` if no record has the id.
    fn delete_by_id(&self, id: &Value) -> Result<()>;

    fn delete_all(&self, ids: &[Value]) -> Result<()>;

    /// Full-collection delete.
    fn clear(&self) -> Result<()>;

    /// Re-derives the secondary search index from the primary store.
    /// Only meaningful behind the index-routing layer.
    fn rebuild_index(&self) -> Result<()> {
        Err(DataError::UnsupportedOperation(format!(
            "entity type '{}' is not indexed",
            self.metadata().name()
        )))
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Shareable handle to one repository; every clone reaches the same
/// underlying store.
///
/// Layers that must read the store below the decorator chain (uniqueness
/// probes, post-mutation reads for notification) hold one of these while
/// the chain itself wraps another.
#[derive(Clone)]
pub struct RepositoryHandle {
    target: Arc<dyn Repository>,
}

impl RepositoryHandle {
    pub fn new(target: Arc<dyn Repository>) -> Self {
        Self { target }
    }
}

impl Repository for RepositoryHandle {
    fn metadata(&self) -> Arc<EntityTypeMetadata> {
        self.target.metadata()
    }

    fn layers(&self) -> Vec<&'static str> {
        self.target.layers()
    }

    fn capabilities(&self) -> BTreeSet<RepositoryCapability> {
        self.target.capabilities()
    }

    fn find_one(&self, id: &Value) -> Result<Option<Entity>> {
        self.target.find_one(id)
    }

    fn find_all(&self, query: &Query) -> Result<Vec<Entity>> {
        self.target.find_all(query)
    }

    fn count(&self, query: &Query) -> Result<u64> {
        self.target.count(query)
    }

    fn aggregate(&self, attribute: &str, query: &Query) -> Result<Vec<(Value, u64)>> {
        self.target.aggregate(attribute, query)
    }

    fn add(&self, entity: Entity) -> Result<Entity> {
        self.target.add(entity)
    }

    fn add_all(&self, entities: Vec<Entity>) -> Result<Vec<Entity>> {
        self.target.add_all(entities)
    }

    fn update(&self, entity: Entity) -> Result<()> {
        self.target.update(entity)
    }

    fn update_all(&self, entities: Vec<Entity>) -> Result<()> {
        self.target.update_all(entities)
    }

    fn delete_by_id(&self, id: &Value) -> Result<()> {
        self.target.delete_by_id(id)
    }

    fn delete_all(&self, ids: &[Value]) -> Result<()> {
        self.target.delete_all(ids)
    }

    fn clear(&self) -> Result<()> {
        self.target.clear()
    }

    fn rebuild_index(&self) -> Result<()> {
        self.target.rebuild_index()
    }

    fn flush(&self) -> Result<()> {
        self.target.flush()
    }
}

/// Constructs raw repositories for a storage backend.
///
/// The factory decorates what a collection hands out; the undecorated form
/// must never leak past it.
pub trait RepositoryCollection: Send + Sync {
    fn name(&self) -> &str;

    fn create_repository(&self, meta: Arc<EntityTypeMetadata>) -> Result<Box<dyn Repository>>;

    fn has_repository(&self, entity_type_name: &str) -> bool;

    fn drop_repository(&self, entity_type_name: &str) -> Result<()>;
}
