use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::core::{DataError, Result};
use crate::repo::Repository;

/// Process-wide map of entity type name to *decorated* repository.
///
/// Everything outside the factory reaches data through this service; raw
/// repositories are never registered here. Registration happens at wiring
/// time, lookups afterwards take a read lock only.
#[derive(Default)]
pub struct DataService {
    repositories: RwLock<HashMap<String, Arc<dyn Repository>>>,
}

impl DataService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn register(&self, repository: Arc<dyn Repository>) -> Result<()> {
        let name = repository.metadata().name().to_string();
        let mut repositories = self.repositories.write()?;
        if repositories.contains_key(&name) {
            return Err(DataError::configuration(
                &name,
                "entity type already registered",
            ));
        }
        repositories.insert(name, repository);
        Ok(())
    }

    pub fn repository(&self, entity_type_name: &str) -> Result<Arc<dyn Repository>> {
        let repositories = self.repositories.read()?;
        repositories
            .get(entity_type_name)
            .cloned()
            .ok_or_else(|| DataError::UnknownEntityType(entity_type_name.to_string()))
    }

    pub fn has_repository(&self, entity_type_name: &str) -> bool {
        self.repositories
            .read()
            .map(|repositories| repositories.contains_key(entity_type_name))
            .unwrap_or(false)
    }

    pub fn entity_type_names(&self) -> Vec<String> {
        self.repositories
            .read()
            .map(|repositories| repositories.keys().cloned().collect())
            .unwrap_or_default()
    }
}
