use std::collections::BTreeSet;
use std::sync::Arc;

use crate::core::{Entity, Result, Value};
use crate::index::{IndexingMode, SearchService};
use crate::repo::query::Query;
use crate::repo::{Repository, RepositoryCapability, RepositoryDecorator};

/// Routes all read-side queries to the secondary search index; the primary
/// store stays authoritative for writes, which pass straight through.
///
/// The routing decision is fixed at construction from the entity type's
/// backend; there is no runtime transition.
pub struct IndexRoutingDecorator {
    inner: Box<dyn Repository>,
    search: Arc<dyn SearchService>,
}

impl IndexRoutingDecorator {
    pub const NAME: &'static str = "IndexRouting";

    pub fn new(inner: Box<dyn Repository>, search: Arc<dyn SearchService>) -> Self {
        Self { inner, search }
    }
}

impl RepositoryDecorator for IndexRoutingDecorator {
    fn inner(&self) -> &dyn Repository {
        self.inner.as_ref()
    }

    fn decorator_name(&self) -> &'static str {
        Self::NAME
    }

    fn capabilities(&self) -> BTreeSet<RepositoryCapability> {
        let mut capabilities = self.inner.capabilities();
        capabilities.insert(RepositoryCapability::Indexable);
        capabilities.insert(RepositoryCapability::Aggregateable);
        capabilities
    }

    fn find_one(&self, id: &Value) -> Result<Option<Entity>> {
        self.search.get(&self.inner.metadata(), id)
    }

    fn find_all(&self, query: &Query) -> Result<Vec<Entity>> {
        self.search.search(&self.inner.metadata(), query)
    }

    fn count(&self, query: &Query) -> Result<u64> {
        self.search.count(&self.inner.metadata(), query)
    }

    fn aggregate(&self, attribute: &str, query: &Query) -> Result<Vec<(Value, u64)>> {
        self.search.aggregate(&self.inner.metadata(), attribute, query)
    }

    /// Re-derives the whole index for this entity type from the primary
    /// store: drop everything, then bulk-index the authoritative records.
    fn rebuild_index(&self) -> Result<()> {
        let meta = self.inner.metadata();
        let entities = self.inner.find_all(&Query::new().fetch_depth(0))?;
        self.search.delete_all(&meta)?;
        self.search.index(&meta, &entities, IndexingMode::Add)?;
        self.search.flush()
    }
}
