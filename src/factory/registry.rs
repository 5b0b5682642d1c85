use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::core::{DataError, Result};
use crate::repo::Repository;

/// Builds one additional decoration layer around a repository.
pub type DecoratorBuilder =
    Arc<dyn Fn(Box<dyn Repository>) -> Result<Box<dyn Repository>> + Send + Sync>;

/// Open extension point: independently developed modules attach decorators
/// to an entity type without the factory knowing about them.
///
/// Builders are keyed by entity type name plus a per-module key. The same
/// key re-registers in place (last write wins, keeping its position), so a
/// module can replace its builder during development without reordering the
/// chain. Registration happens at startup; decoration passes only take the
/// read lock.
#[derive(Default)]
pub struct DecoratorRegistry {
    builders: RwLock<HashMap<String, Vec<(String, DecoratorBuilder)>>>,
}

impl DecoratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        entity_type_name: impl Into<String>,
        key: impl Into<String>,
        builder: DecoratorBuilder,
    ) -> Result<()> {
        let entity_type_name = entity_type_name.into();
        let key = key.into();
        let mut builders = self.builders.write()?;
        let entries = builders.entry(entity_type_name.clone()).or_default();
        match entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => {
                debug!(entity_type = %entity_type_name, key = %key, "replaced decorator builder");
                entry.1 = builder;
            }
            None => {
                debug!(entity_type = %entity_type_name, key = %key, "registered decorator builder");
                entries.push((key, builder));
            }
        }
        Ok(())
    }

    /// Applies all builders registered for the repository's entity type, in
    /// registration order. Unregistered types pass through unchanged. A
    /// failing builder aborts decoration; the factory surfaces that as a
    /// configuration error at wiring time.
    pub fn decorate(&self, repository: Box<dyn Repository>) -> Result<Box<dyn Repository>> {
        let entity_type_name = repository.metadata().name().to_string();
        let builders: Vec<DecoratorBuilder> = {
            let map = self.builders.read()?;
            match map.get(&entity_type_name) {
                Some(entries) => entries.iter().map(|(_, b)| Arc::clone(b)).collect(),
                None => return Ok(repository),
            }
        };

        let mut decorated = repository;
        for builder in builders {
            decorated = builder(decorated).map_err(|err| {
                DataError::configuration(
                    &entity_type_name,
                    format!("decorator builder failed: {}", err),
                )
            })?;
        }
        Ok(decorated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DataType, Entity, Value};
    use crate::meta::{AttributeMetadata, EntityTypeBuilder};
    use crate::repo::{MemoryRepository, RepositoryDecorator};

    struct Tagging {
        inner: Box<dyn Repository>,
        tag: &'static str,
    }

    impl RepositoryDecorator for Tagging {
        fn inner(&self) -> &dyn Repository {
            self.inner.as_ref()
        }

        fn decorator_name(&self) -> &'static str {
            self.tag
        }
    }

    fn raw_repo() -> Box<dyn Repository> {
        let meta = EntityTypeBuilder::new("person", "memory")
            .attribute(AttributeMetadata::new("id", DataType::Text).nillable(false))
            .id_attribute("id")
            .build()
            .unwrap();
        Box::new(MemoryRepository::new(meta))
    }

    fn tagging_builder(tag: &'static str) -> DecoratorBuilder {
        Arc::new(move |inner| Ok(Box::new(Tagging { inner, tag }) as Box<dyn Repository>))
    }

    #[test]
    fn test_unregistered_type_passes_through() {
        let registry = DecoratorRegistry::new();
        let decorated = registry.decorate(raw_repo()).unwrap();
        assert_eq!(decorated.layers(), vec!["Memory"]);
    }

    #[test]
    fn test_builders_apply_in_registration_order() {
        let registry = DecoratorRegistry::new();
        registry
            .register("person", "first", tagging_builder("First"))
            .unwrap();
        registry
            .register("person", "second", tagging_builder("Second"))
            .unwrap();

        let decorated = registry.decorate(raw_repo()).unwrap();
        // Applied in order, so the last registered is outermost
        assert_eq!(decorated.layers(), vec!["Second", "First", "Memory"]);
    }

    #[test]
    fn test_same_key_replaces_in_place() {
        let registry = DecoratorRegistry::new();
        registry
            .register("person", "module", tagging_builder("Old"))
            .unwrap();
        registry
            .register("person", "other", tagging_builder("Other"))
            .unwrap();
        registry
            .register("person", "module", tagging_builder("New"))
            .unwrap();

        let decorated = registry.decorate(raw_repo()).unwrap();
        assert_eq!(decorated.layers(), vec!["Other", "New", "Memory"]);
    }

    #[test]
    fn test_failing_builder_is_configuration_error() {
        let registry = DecoratorRegistry::new();
        registry
            .register(
                "person",
                "broken",
                Arc::new(|_inner| Err(DataError::Backend("boom".into()))),
            )
            .unwrap();

        let err = registry.decorate(raw_repo()).err().unwrap();
        assert!(matches!(err, DataError::Configuration { .. }));
        assert!(err.to_string().contains("person"));
    }

    #[test]
    fn test_decorated_repository_still_behaves_like_one() {
        let registry = DecoratorRegistry::new();
        registry
            .register("person", "tag", tagging_builder("Tag"))
            .unwrap();
        let decorated = registry.decorate(raw_repo()).unwrap();

        decorated.add(Entity::new().with("id", "p1")).unwrap();
        let found = decorated.find_one(&"p1".into()).unwrap().unwrap();
        assert_eq!(found.get("id"), Some(&Value::Text("p1".into())));
    }
}
