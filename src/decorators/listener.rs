use std::sync::{Arc, RwLock};

use tracing::warn;

use crate::core::{Entity, Result, Value};
use crate::repo::{Repository, RepositoryDecorator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Updated,
    Deleted,
}

/// Post-mutation notification. Deletions carry ids; adds and updates carry
/// the records as persisted.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub entity_type_name: String,
    pub kind: ChangeKind,
    pub entities: Vec<Entity>,
    pub ids: Vec<Value>,
}

impl ChangeEvent {
    fn records(entity_type_name: &str, kind: ChangeKind, entities: Vec<Entity>) -> Self {
        Self {
            entity_type_name: entity_type_name.to_string(),
            kind,
            entities,
            ids: Vec::new(),
        }
    }

    fn deletions(entity_type_name: &str, ids: Vec<Value>) -> Self {
        Self {
            entity_type_name: entity_type_name.to_string(),
            kind: ChangeKind::Deleted,
            entities: Vec::new(),
            ids,
        }
    }
}

/// Interested party notified after successful mutations.
///
/// Notification is best-effort: an `Err` is logged and swallowed, it never
/// rolls back the mutation.
pub trait ChangeListener: Send + Sync {
    fn entity_changed(&self, event: &ChangeEvent) -> Result<()>;
}

/// Process-wide listener set; registered at startup, read afterwards.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: RwLock<Vec<Arc<dyn ChangeListener>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, listener: Arc<dyn ChangeListener>) {
        if let Ok(mut listeners) = self.listeners.write() {
            listeners.push(listener);
        }
    }

    fn notify(&self, event: &ChangeEvent) {
        let listeners = match self.listeners.read() {
            Ok(listeners) => listeners.clone(),
            Err(err) => {
                warn!("listener registry poisoned, skipping notification: {}", err);
                return;
            }
        };
        // The lock is released before any listener runs.
        for listener in listeners {
            if let Err(err) = listener.entity_changed(event) {
                warn!(
                    entity_type = %event.entity_type_name,
                    "change listener failed: {}",
                    err
                );
            }
        }
    }
}

/// Invokes registered listeners synchronously after a successful mutation.
///
/// Update events are re-read from the primary store before notification:
/// reference normalization and owner stamping happen in lower layers, so
/// the entity handed in by the caller is not what the store holds.
pub struct ChangeListenerDecorator {
    inner: Box<dyn Repository>,
    listeners: Arc<ListenerRegistry>,
    primary: Arc<dyn Repository>,
}

impl ChangeListenerDecorator {
    pub const NAME: &'static str = "ChangeListener";

    pub fn new(
        inner: Box<dyn Repository>,
        listeners: Arc<ListenerRegistry>,
        primary: Arc<dyn Repository>,
    ) -> Self {
        Self {
            inner,
            listeners,
            primary,
        }
    }

    fn entity_type_name(&self) -> String {
        self.inner.metadata().name().to_string()
    }

    /// Loads records as persisted. A read failure is logged, never raised;
    /// the mutation has already succeeded.
    fn persisted(&self, ids: &[Value]) -> Vec<Entity> {
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            match self.primary.find_one(id) {
                Ok(Some(entity)) => records.push(entity),
                Ok(None) => {}
                Err(err) => warn!(
                    entity_type = %self.entity_type_name(),
                    "could not load record '{}' for notification: {}",
                    id,
                    err
                ),
            }
        }
        records
    }
}

impl RepositoryDecorator for ChangeListenerDecorator {
    fn inner(&self) -> &dyn Repository {
        self.inner.as_ref()
    }

    fn decorator_name(&self) -> &'static str {
        Self::NAME
    }

    fn add(&self, entity: Entity) -> Result<Entity> {
        let stored = self.inner.add(entity)?;
        self.listeners.notify(&ChangeEvent::records(
            &self.entity_type_name(),
            ChangeKind::Added,
            vec![stored.clone()],
        ));
        Ok(stored)
    }

    fn add_all(&self, entities: Vec<Entity>) -> Result<Vec<Entity>> {
        let stored = self.inner.add_all(entities)?;
        self.listeners.notify(&ChangeEvent::records(
            &self.entity_type_name(),
            ChangeKind::Added,
            stored.clone(),
        ));
        Ok(stored)
    }

    fn update(&self, entity: Entity) -> Result<()> {
        let ids: Vec<Value> = entity.id(&self.inner.metadata()).ok().into_iter().collect();
        self.inner.update(entity)?;
        self.listeners.notify(&ChangeEvent::records(
            &self.entity_type_name(),
            ChangeKind::Updated,
            self.persisted(&ids),
        ));
        Ok(())
    }

    fn update_all(&self, entities: Vec<Entity>) -> Result<()> {
        let meta = self.inner.metadata();
        let ids: Vec<Value> = entities
            .iter()
            .filter_map(|entity| entity.id(&meta).ok())
            .collect();
        self.inner.update_all(entities)?;
        self.listeners.notify(&ChangeEvent::records(
            &self.entity_type_name(),
            ChangeKind::Updated,
            self.persisted(&ids),
        ));
        Ok(())
    }

    fn delete_by_id(&self, id: &Value) -> Result<()> {
        self.inner.delete_by_id(id)?;
        self.listeners.notify(&ChangeEvent::deletions(
            &self.entity_type_name(),
            vec![id.clone()],
        ));
        Ok(())
    }

    fn delete_all(&self, ids: &[Value]) -> Result<()> {
        self.inner.delete_all(ids)?;
        self.listeners.notify(&ChangeEvent::deletions(
            &self.entity_type_name(),
            ids.to_vec(),
        ));
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.inner.clear()?;
        self.listeners.notify(&ChangeEvent::deletions(
            &self.entity_type_name(),
            Vec::new(),
        ));
        Ok(())
    }
}
