//! Secondary search index contract and the in-memory reference engine.

pub mod reindex;

pub use reindex::{ReindexAction, ReindexActionSink, ReindexQueue, ReindexScope};

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::core::{DataError, Entity, Result, Value};
use crate::meta::EntityTypeMetadata;
use crate::repo::query::{self, Query};

/// How a record batch is applied to the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexingMode {
    Add,
    Update,
}

/// The search index engine, reduced to the surface this layer consumes.
///
/// The index holds a denormalized, query-optimized projection per entity
/// type; the primary store stays authoritative for writes.
pub trait SearchService: Send + Sync {
    fn search(&self, meta: &EntityTypeMetadata, query: &Query) -> Result<Vec<Entity>>;

    fn count(&self, meta: &EntityTypeMetadata, query: &Query) -> Result<u64>;

    fn get(&self, meta: &EntityTypeMetadata, id: &Value) -> Result<Option<Entity>>;

    fn aggregate(
        &self,
        meta: &EntityTypeMetadata,
        attribute: &str,
        query: &Query,
    ) -> Result<Vec<(Value, u64)>>;

    fn index(
        &self,
        meta: &EntityTypeMetadata,
        entities: &[Entity],
        mode: IndexingMode,
    ) -> Result<()>;

    fn delete_by_ids(&self, meta: &EntityTypeMetadata, ids: &[Value]) -> Result<()>;

    /// Drops every document of the entity type.
    fn delete_all(&self, meta: &EntityTypeMetadata) -> Result<()>;

    fn flush(&self) -> Result<()>;
}

/// In-memory search engine: one document map per entity type.
///
/// Stands in for the real engine in tests and serves as the primary store
/// for entity types living on the index backend itself.
#[derive(Default)]
pub struct InMemorySearchService {
    documents: RwLock<HashMap<String, HashMap<Value, Entity>>>,
}

impl InMemorySearchService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn collection(&self, meta: &EntityTypeMetadata) -> Result<Vec<Entity>> {
        let documents = self.documents.read()?;
        Ok(documents
            .get(meta.name())
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }

    /// Number of indexed documents for an entity type.
    pub fn document_count(&self, entity_type_name: &str) -> usize {
        self.documents
            .read()
            .map(|documents| {
                documents
                    .get(entity_type_name)
                    .map(|docs| docs.len())
                    .unwrap_or(0)
            })
            .unwrap_or(0)
    }
}

impl SearchService for InMemorySearchService {
    fn search(&self, meta: &EntityTypeMetadata, q: &Query) -> Result<Vec<Entity>> {
        let mut hits: Vec<Entity> = self
            .collection(meta)?
            .into_iter()
            .filter(|e| query::matches(e, q.filters()))
            .collect();
        query::apply_sort(&mut hits, q.sort())?;
        Ok(query::apply_page(hits, q.get_offset(), q.get_limit()))
    }

    fn count(&self, meta: &EntityTypeMetadata, q: &Query) -> Result<u64> {
        Ok(self
            .collection(meta)?
            .iter()
            .filter(|e| query::matches(e, q.filters()))
            .count() as u64)
    }

    fn get(&self, meta: &EntityTypeMetadata, id: &Value) -> Result<Option<Entity>> {
        let documents = self.documents.read()?;
        Ok(documents
            .get(meta.name())
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    fn aggregate(
        &self,
        meta: &EntityTypeMetadata,
        attribute: &str,
        q: &Query,
    ) -> Result<Vec<(Value, u64)>> {
        let hits = self.search(meta, q)?;
        let mut groups: Vec<(Value, u64)> = Vec::new();
        for entity in &hits {
            let key = entity.get(attribute).cloned().unwrap_or(Value::Null);
            match groups.iter_mut().find(|(k, _)| *k == key) {
                Some((_, n)) => *n += 1,
                None => groups.push((key, 1)),
            }
        }
        Ok(groups)
    }

    fn index(
        &self,
        meta: &EntityTypeMetadata,
        entities: &[Entity],
        _mode: IndexingMode,
    ) -> Result<()> {
        let mut documents = self.documents.write()?;
        let docs = documents.entry(meta.name().to_string()).or_default();
        for entity in entities {
            let id = entity.id(meta)?;
            docs.insert(id, entity.clone());
        }
        Ok(())
    }

    fn delete_by_ids(&self, meta: &EntityTypeMetadata, ids: &[Value]) -> Result<()> {
        let mut documents = self.documents.write()?;
        if let Some(docs) = documents.get_mut(meta.name()) {
            for id in ids {
                docs.remove(id);
            }
        }
        Ok(())
    }

    fn delete_all(&self, meta: &EntityTypeMetadata) -> Result<()> {
        let mut documents = self.documents.write()?;
        documents.remove(meta.name());
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// A search-backed repository for entity types whose backend *is* the index
/// engine. For those, the index is the primary store and no routing or
/// reindex bookkeeping applies.
pub struct SearchRepository {
    meta: Arc<EntityTypeMetadata>,
    search: Arc<dyn SearchService>,
}

impl SearchRepository {
    pub fn new(meta: Arc<EntityTypeMetadata>, search: Arc<dyn SearchService>) -> Self {
        Self { meta, search }
    }
}

impl crate::repo::Repository for SearchRepository {
    fn metadata(&self) -> Arc<EntityTypeMetadata> {
        Arc::clone(&self.meta)
    }

    fn layers(&self) -> Vec<&'static str> {
        vec!["Search"]
    }

    fn capabilities(&self) -> std::collections::BTreeSet<crate::repo::RepositoryCapability> {
        [
            crate::repo::RepositoryCapability::Writable,
            crate::repo::RepositoryCapability::Aggregateable,
            crate::repo::RepositoryCapability::Indexable,
        ]
        .into_iter()
        .collect()
    }

    fn find_one(&self, id: &Value) -> Result<Option<Entity>> {
        self.search.get(&self.meta, id)
    }

    fn find_all(&self, q: &Query) -> Result<Vec<Entity>> {
        self.search.search(&self.meta, q)
    }

    fn count(&self, q: &Query) -> Result<u64> {
        self.search.count(&self.meta, q)
    }

    fn aggregate(&self, attribute: &str, q: &Query) -> Result<Vec<(Value, u64)>> {
        self.search.aggregate(&self.meta, attribute, q)
    }

    fn add(&self, entity: Entity) -> Result<Entity> {
        self.search
            .index(&self.meta, std::slice::from_ref(&entity), IndexingMode::Add)?;
        Ok(entity)
    }

    fn add_all(&self, entities: Vec<Entity>) -> Result<Vec<Entity>> {
        self.search.index(&self.meta, &entities, IndexingMode::Add)?;
        Ok(entities)
    }

    fn update(&self, entity: Entity) -> Result<()> {
        let id = entity.id(&self.meta)?;
        if self.search.get(&self.meta, &id)?.is_none() {
            return Err(DataError::not_found(self.meta.name(), &id));
        }
        self.search
            .index(&self.meta, std::slice::from_ref(&entity), IndexingMode::Update)
    }

    fn update_all(&self, entities: Vec<Entity>) -> Result<()> {
        for entity in entities {
            self.update(entity)?;
        }
        Ok(())
    }

    fn delete_by_id(&self, id: &Value) -> Result<()> {
        if self.search.get(&self.meta, id)?.is_none() {
            return Err(DataError::not_found(self.meta.name(), id));
        }
        self.search.delete_by_ids(&self.meta, std::slice::from_ref(id))
    }

    fn delete_all(&self, ids: &[Value]) -> Result<()> {
        self.search.delete_by_ids(&self.meta, ids)
    }

    fn clear(&self) -> Result<()> {
        self.search.delete_all(&self.meta)
    }

    fn flush(&self) -> Result<()> {
        self.search.flush()
    }
}
