use std::sync::Arc;

use tracing::warn;

use crate::core::{Entity, Result, Value};
use crate::index::{IndexingMode, ReindexAction, ReindexActionSink, SearchService};
use crate::repo::{Repository, RepositoryDecorator};

/// Mirrors every successful mutation into the secondary index.
///
/// Mutations touching at most `sync_threshold` records are applied to the
/// index synchronously; larger batches and full-collection deletes enqueue
/// one [`ReindexAction`] instead, trading immediate consistency for write
/// throughput. A failed synchronous update never fails the caller's write:
/// it is logged and compensated with an enqueued action.
pub struct ReindexActionDecorator {
    inner: Box<dyn Repository>,
    search: Arc<dyn SearchService>,
    sink: Arc<dyn ReindexActionSink>,
    sync_threshold: usize,
}

impl ReindexActionDecorator {
    pub const NAME: &'static str = "ReindexAction";

    pub fn new(
        inner: Box<dyn Repository>,
        search: Arc<dyn SearchService>,
        sink: Arc<dyn ReindexActionSink>,
        sync_threshold: usize,
    ) -> Self {
        Self {
            inner,
            search,
            sink,
            sync_threshold,
        }
    }

    fn entity_type_name(&self) -> String {
        self.inner.metadata().name().to_string()
    }

    fn mirror_upsert(&self, entities: &[Entity], mode: IndexingMode) -> Result<()> {
        let meta = self.inner.metadata();
        if entities.len() > self.sync_threshold {
            let ids: Result<Vec<Value>> = entities.iter().map(|e| e.id(&meta)).collect();
            self.sink
                .enqueue(ReindexAction::ids(self.entity_type_name(), ids?));
            return Ok(());
        }
        if let Err(err) = self.search.index(&meta, entities, mode) {
            warn!(
                entity_type = %meta.name(),
                "index update failed, compensating with reindex action: {}",
                err
            );
            let ids: Result<Vec<Value>> = entities.iter().map(|e| e.id(&meta)).collect();
            self.sink
                .enqueue(ReindexAction::ids(self.entity_type_name(), ids?));
        }
        Ok(())
    }

    fn mirror_delete(&self, ids: &[Value]) {
        let meta = self.inner.metadata();
        if ids.len() > self.sync_threshold {
            self.sink
                .enqueue(ReindexAction::ids(self.entity_type_name(), ids.to_vec()));
            return;
        }
        if let Err(err) = self.search.delete_by_ids(&meta, ids) {
            warn!(
                entity_type = %meta.name(),
                "index delete failed, compensating with reindex action: {}",
                err
            );
            self.sink
                .enqueue(ReindexAction::ids(self.entity_type_name(), ids.to_vec()));
        }
    }
}

impl RepositoryDecorator for ReindexActionDecorator {
    fn inner(&self) -> &dyn Repository {
        self.inner.as_ref()
    }

    fn decorator_name(&self) -> &'static str {
        Self::NAME
    }

    fn add(&self, entity: Entity) -> Result<Entity> {
        let stored = self.inner.add(entity)?;
        self.mirror_upsert(std::slice::from_ref(&stored), IndexingMode::Add)?;
        Ok(stored)
    }

    fn add_all(&self, entities: Vec<Entity>) -> Result<Vec<Entity>> {
        let stored = self.inner.add_all(entities)?;
        self.mirror_upsert(&stored, IndexingMode::Add)?;
        Ok(stored)
    }

    fn update(&self, entity: Entity) -> Result<()> {
        let mirrored = entity.clone();
        self.inner.update(entity)?;
        self.mirror_upsert(std::slice::from_ref(&mirrored), IndexingMode::Update)?;
        Ok(())
    }

    fn update_all(&self, entities: Vec<Entity>) -> Result<()> {
        let mirrored = entities.clone();
        self.inner.update_all(entities)?;
        self.mirror_upsert(&mirrored, IndexingMode::Update)?;
        Ok(())
    }

    fn delete_by_id(&self, id: &Value) -> Result<()> {
        self.inner.delete_by_id(id)?;
        self.mirror_delete(std::slice::from_ref(id));
        Ok(())
    }

    fn delete_all(&self, ids: &[Value]) -> Result<()> {
        self.inner.delete_all(ids)?;
        self.mirror_delete(ids);
        Ok(())
    }

    /// Affected ids are unknown for a full-collection delete.
    fn clear(&self) -> Result<()> {
        self.inner.clear()?;
        self.sink.enqueue(ReindexAction::full(self.entity_type_name()));
        Ok(())
    }
}
