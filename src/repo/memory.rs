use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use crate::core::{DataError, Entity, Result, Value};
use crate::meta::EntityTypeMetadata;
use crate::repo::query::{self, Query};
use crate::repo::{Repository, RepositoryCapability, RepositoryCollection};

/// Reference primary store: one id-keyed map per entity type behind a
/// read-write lock. Insertion order is kept so unsorted queries are stable.
pub struct MemoryRepository {
    meta: Arc<EntityTypeMetadata>,
    rows: RwLock<MemoryRows>,
}

#[derive(Default)]
struct MemoryRows {
    by_id: HashMap<Value, Entity>,
    order: Vec<Value>,
}

impl MemoryRepository {
    pub fn new(meta: Arc<EntityTypeMetadata>) -> Self {
        Self {
            meta,
            rows: RwLock::new(MemoryRows::default()),
        }
    }

    fn snapshot(&self, filters: &[query::Filter]) -> Result<Vec<Entity>> {
        let rows = self.rows.read()?;
        Ok(rows
            .order
            .iter()
            .filter_map(|id| rows.by_id.get(id))
            .filter(|e| query::matches(e, filters))
            .cloned()
            .collect())
    }
}

impl Repository for MemoryRepository {
    fn metadata(&self) -> Arc<EntityTypeMetadata> {
        Arc::clone(&self.meta)
    }

    fn layers(&self) -> Vec<&'static str> {
        vec!["Memory"]
    }

    fn capabilities(&self) -> BTreeSet<RepositoryCapability> {
        [
            RepositoryCapability::Writable,
            RepositoryCapability::Aggregateable,
        ]
        .into_iter()
        .collect()
    }

    fn find_one(&self, id: &Value) -> Result<Option<Entity>> {
        let rows = self.rows.read()?;
        Ok(rows.by_id.get(id).cloned())
    }

    fn find_all(&self, q: &Query) -> Result<Vec<Entity>> {
        let mut entities = self.snapshot(q.filters())?;
        query::apply_sort(&mut entities, q.sort())?;
        Ok(query::apply_page(entities, q.get_offset(), q.get_limit()))
    }

    fn count(&self, q: &Query) -> Result<u64> {
        Ok(self.snapshot(q.filters())?.len() as u64)
    }

    fn aggregate(&self, attribute: &str, q: &Query) -> Result<Vec<(Value, u64)>> {
        let entities = self.snapshot(q.filters())?;
        let mut groups: Vec<(Value, u64)> = Vec::new();
        for entity in &entities {
            let key = entity.get(attribute).cloned().unwrap_or(Value::Null);
            match groups.iter_mut().find(|(k, _)| *k == key) {
                Some((_, n)) => *n += 1,
                None => groups.push((key, 1)),
            }
        }
        Ok(groups)
    }

    fn add(&self, entity: Entity) -> Result<Entity> {
        let id = entity.id(&self.meta)?;
        let mut rows = self.rows.write()?;
        if rows.by_id.contains_key(&id) {
            return Err(DataError::Backend(format!(
                "duplicate id '{}' in '{}'",
                id,
                self.meta.name()
            )));
        }
        rows.by_id.insert(id.clone(), entity.clone());
        rows.order.push(id);
        Ok(entity)
    }

    fn add_all(&self, entities: Vec<Entity>) -> Result<Vec<Entity>> {
        let mut stored = Vec::with_capacity(entities.len());
        for entity in entities {
            stored.push(self.add(entity)?);
        }
        Ok(stored)
    }

    fn update(&self, entity: Entity) -> Result<()> {
        let id = entity.id(&self.meta)?;
        let mut rows = self.rows.write()?;
        match rows.by_id.get_mut(&id) {
            Some(existing) => {
                *existing = entity;
                Ok(())
            }
            None => Err(DataError::not_found(self.meta.name(), &id)),
        }
    }

    fn update_all(&self, entities: Vec<Entity>) -> Result<()> {
        for entity in entities {
            self.update(entity)?;
        }
        Ok(())
    }

    fn delete_by_id(&self, id: &Value) -> Result<()> {
        let mut rows = self.rows.write()?;
        if rows.by_id.remove(id).is_none() {
            return Err(DataError::not_found(self.meta.name(), id));
        }
        rows.order.retain(|existing| existing != id);
        Ok(())
    }

    fn delete_all(&self, ids: &[Value]) -> Result<()> {
        for id in ids {
            self.delete_by_id(id)?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut rows = self.rows.write()?;
        rows.by_id.clear();
        rows.order.clear();
        Ok(())
    }
}

/// The default primary backend: a set of [`MemoryRepository`] instances.
pub struct MemoryBackend {
    name: String,
    repositories: RwLock<HashMap<String, ()>>,
}

impl MemoryBackend {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            repositories: RwLock::new(HashMap::new()),
        }
    }
}

impl RepositoryCollection for MemoryBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn create_repository(&self, meta: Arc<EntityTypeMetadata>) -> Result<Box<dyn Repository>> {
        let mut repositories = self.repositories.write()?;
        if repositories.contains_key(meta.name()) {
            return Err(DataError::configuration(
                meta.name(),
                format!("repository already exists on backend '{}'", self.name),
            ));
        }
        repositories.insert(meta.name().to_string(), ());
        Ok(Box::new(MemoryRepository::new(meta)))
    }

    fn has_repository(&self, entity_type_name: &str) -> bool {
        self.repositories
            .read()
            .map(|repositories| repositories.contains_key(entity_type_name))
            .unwrap_or(false)
    }

    fn drop_repository(&self, entity_type_name: &str) -> Result<()> {
        let mut repositories = self.repositories.write()?;
        if repositories.remove(entity_type_name).is_none() {
            return Err(DataError::UnknownEntityType(entity_type_name.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DataType;
    use crate::meta::{AttributeMetadata, EntityTypeBuilder};

    fn person_meta() -> Arc<EntityTypeMetadata> {
        EntityTypeBuilder::new("person", "memory")
            .attribute(AttributeMetadata::new("id", DataType::Text).nillable(false))
            .attribute(AttributeMetadata::new("name", DataType::Text))
            .attribute(AttributeMetadata::new("age", DataType::Int))
            .id_attribute("id")
            .build()
            .unwrap()
    }

    #[test]
    fn test_add_and_find_one() {
        let repo = MemoryRepository::new(person_meta());
        repo.add(Entity::new().with("id", "p1").with("name", "Alice"))
            .unwrap();

        let found = repo.find_one(&"p1".into()).unwrap().unwrap();
        assert_eq!(found.get("name"), Some(&Value::Text("Alice".into())));
        assert!(repo.find_one(&"p2".into()).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let repo = MemoryRepository::new(person_meta());
        repo.add(Entity::new().with("id", "p1")).unwrap();
        assert!(repo.add(Entity::new().with("id", "p1")).is_err());
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let repo = MemoryRepository::new(person_meta());
        let err = repo
            .update(Entity::new().with("id", "ghost"))
            .unwrap_err();
        assert!(matches!(err, DataError::NotFound { .. }));
    }

    #[test]
    fn test_query_filter_sort_page() {
        let repo = MemoryRepository::new(person_meta());
        repo.add_all(vec![
            Entity::new().with("id", "a").with("age", 30i64),
            Entity::new().with("id", "b").with("age", 25i64),
            Entity::new().with("id", "c").with("age", 35i64),
        ])
        .unwrap();

        let all = repo
            .find_all(&Query::new().sort_by("age").limit(2))
            .unwrap();
        assert_eq!(all[0].get("id"), Some(&Value::Text("b".into())));
        assert_eq!(all.len(), 2);

        assert_eq!(repo.count(&Query::new().eq("age", 25i64)).unwrap(), 1);
    }

    #[test]
    fn test_aggregate_group_count() {
        let repo = MemoryRepository::new(person_meta());
        repo.add_all(vec![
            Entity::new().with("id", "a").with("age", 30i64),
            Entity::new().with("id", "b").with("age", 30i64),
            Entity::new().with("id", "c").with("age", 35i64),
        ])
        .unwrap();

        let groups = repo.aggregate("age", &Query::new()).unwrap();
        assert!(groups.contains(&(Value::Int(30), 2)));
        assert!(groups.contains(&(Value::Int(35), 1)));
    }

    #[test]
    fn test_clear() {
        let repo = MemoryRepository::new(person_meta());
        repo.add(Entity::new().with("id", "a")).unwrap();
        repo.clear().unwrap();
        assert_eq!(repo.count(&Query::new()).unwrap(), 0);
    }

    #[test]
    fn test_backend_creates_once() {
        let backend = MemoryBackend::new("memory");
        backend.create_repository(person_meta()).unwrap();
        assert!(backend.has_repository("person"));
        assert!(backend.create_repository(person_meta()).is_err());
        backend.drop_repository("person").unwrap();
        assert!(!backend.has_repository("person"));
    }
}
