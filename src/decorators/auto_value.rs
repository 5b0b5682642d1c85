use std::sync::Arc;

use crate::core::{Entity, Result, Value};
use crate::repo::{Repository, RepositoryDecorator};
use crate::support::IdGenerator;

/// Fills attributes flagged `auto` when the caller leaves them empty.
/// Caller-supplied values are never overwritten.
pub struct AutoValueDecorator {
    inner: Box<dyn Repository>,
    ids: Arc<dyn IdGenerator>,
}

impl AutoValueDecorator {
    pub const NAME: &'static str = "AutoValue";

    pub fn new(inner: Box<dyn Repository>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { inner, ids }
    }

    fn generate(&self, entity: &mut Entity) {
        let meta = self.inner.metadata();
        for attr in meta.attributes() {
            if !attr.is_auto() {
                continue;
            }
            let missing = matches!(entity.get(attr.name()), None | Some(Value::Null));
            if missing {
                entity.set(attr.name(), self.ids.next_id(meta.name()));
            }
        }
    }
}

impl RepositoryDecorator for AutoValueDecorator {
    fn inner(&self) -> &dyn Repository {
        self.inner.as_ref()
    }

    fn decorator_name(&self) -> &'static str {
        Self::NAME
    }

    fn add(&self, mut entity: Entity) -> Result<Entity> {
        self.generate(&mut entity);
        self.inner.add(entity)
    }

    fn add_all(&self, mut entities: Vec<Entity>) -> Result<Vec<Entity>> {
        for entity in &mut entities {
            self.generate(entity);
        }
        self.inner.add_all(entities)
    }
}
