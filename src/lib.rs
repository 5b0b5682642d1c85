// ============================================================================
// Metastore Library
// ============================================================================

pub mod core;
pub mod decorators;
pub mod factory;
pub mod index;
pub mod meta;
pub mod repo;
pub mod service;
pub mod settings;
pub mod support;

// Re-export main types for convenience
pub use crate::core::{DataError, DataType, Entity, Result, ValidationErrors, Value, Violation};
pub use crate::factory::{DecoratorBuilder, DecoratorRegistry, RepositoryDecoratorFactory};
pub use crate::index::{
    InMemorySearchService, IndexingMode, ReindexAction, ReindexActionSink, ReindexQueue,
    ReindexScope, SearchRepository, SearchService,
};
pub use crate::meta::{AttributeMetadata, EntityTypeBuilder, EntityTypeMetadata, WellKnownType};
pub use crate::repo::{
    MemoryBackend, MemoryRepository, Query, Repository, RepositoryCapability, RepositoryCollection,
};
pub use crate::service::DataService;
pub use crate::settings::Settings;
pub use crate::support::{
    Action, ExpressionEvaluator, IdGenerator, PermissionChecker, SequenceIds, SimpleEvaluator,
    StaticPermissions, UuidGenerator,
};

use std::sync::Arc;

use crate::decorators::{ChangeListener, ListenerRegistry};

// ============================================================================
// High-level wiring API
// ============================================================================

/// One wired instance of the data layer: backends, search index, reindex
/// queue and the decorator factory, with in-memory defaults.
///
/// This is the recommended way to assemble the layer in applications and
/// tests. Entity types registered here come back fully decorated; the raw
/// repository never leaves the platform.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use metastore::{
///     AttributeMetadata, DataType, Entity, EntityTypeBuilder, Platform, StaticPermissions,
/// };
///
/// # fn main() -> metastore::Result<()> {
/// let permissions = Arc::new(StaticPermissions::elevated("admin"));
/// let platform = Platform::new(permissions);
///
/// let meta = EntityTypeBuilder::new("person", "memory")
///     .attribute(AttributeMetadata::new("id", DataType::Text).nillable(false).auto())
///     .attribute(AttributeMetadata::new("name", DataType::Text))
///     .id_attribute("id")
///     .build()?;
///
/// let people = platform.register_entity_type(meta)?;
/// let stored = people.add(Entity::new().with("name", "Alice"))?;
/// assert!(stored.get("id").is_some());
/// # Ok(())
/// # }
/// ```
pub struct Platform {
    backend: MemoryBackend,
    search: Arc<InMemorySearchService>,
    reindex_queue: Arc<ReindexQueue>,
    registry: Arc<DecoratorRegistry>,
    factory: RepositoryDecoratorFactory,
}

impl Platform {
    /// Wires the layer with in-memory defaults and UUID id generation.
    pub fn new(permissions: Arc<dyn PermissionChecker>) -> Self {
        Self::with_settings(permissions, Settings::new())
    }

    pub fn with_settings(permissions: Arc<dyn PermissionChecker>, settings: Settings) -> Self {
        let registry = Arc::new(DecoratorRegistry::new());
        let search = InMemorySearchService::new();
        let reindex_queue = Arc::new(ReindexQueue::new());
        let factory = RepositoryDecoratorFactory::new(
            Arc::clone(&registry),
            search.clone(),
            reindex_queue.clone(),
            permissions,
            Arc::new(SimpleEvaluator::new()),
            Arc::new(UuidGenerator::new()),
            Arc::new(ListenerRegistry::new()),
            DataService::new(),
            settings,
        );
        Self {
            backend: MemoryBackend::new(crate::meta::DEFAULT_BACKEND),
            search,
            reindex_queue,
            registry,
            factory,
        }
    }

    /// Creates, decorates and registers the repository for an entity type.
    pub fn register_entity_type(
        &self,
        meta: Arc<EntityTypeMetadata>,
    ) -> Result<Arc<dyn Repository>> {
        self.factory.register_entity_type(&self.backend, meta)
    }

    pub fn repository(&self, entity_type_name: &str) -> Result<Arc<dyn Repository>> {
        self.factory.data_service().repository(entity_type_name)
    }

    pub fn data_service(&self) -> &Arc<DataService> {
        self.factory.data_service()
    }

    /// Extension point for contributed decorators; register before the
    /// entity type is wired.
    pub fn decorator_registry(&self) -> &Arc<DecoratorRegistry> {
        &self.registry
    }

    pub fn register_listener(&self, listener: Arc<dyn ChangeListener>) {
        self.factory.listeners().register(listener);
    }

    pub fn search_service(&self) -> &Arc<InMemorySearchService> {
        &self.search
    }

    /// Queue drained by the asynchronous reindexing worker.
    pub fn reindex_queue(&self) -> &Arc<ReindexQueue> {
        &self.reindex_queue
    }
}
