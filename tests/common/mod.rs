#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use metastore::decorators::{ChangeEvent, ChangeKind, ChangeListener, ListenerRegistry};
use metastore::repo::RepositoryDecorator;
use metastore::{
    AttributeMetadata, DataService, DataType, DecoratorRegistry, Entity, EntityTypeBuilder,
    EntityTypeMetadata, InMemorySearchService, IndexingMode, MemoryRepository, Query, Repository,
    RepositoryDecoratorFactory, ReindexQueue, Result, SearchService, SequenceIds, Settings,
    SimpleEvaluator, StaticPermissions, Value,
};

/// Everything a test needs to wire repositories through the real factory
/// with observable collaborators.
pub struct TestBed {
    pub registry: Arc<DecoratorRegistry>,
    pub search: Arc<InMemorySearchService>,
    pub queue: Arc<ReindexQueue>,
    pub permissions: Arc<StaticPermissions>,
    pub listeners: Arc<ListenerRegistry>,
    pub data_service: Arc<DataService>,
    pub factory: RepositoryDecoratorFactory,
}

impl TestBed {
    pub fn new() -> Self {
        Self::with_settings(Settings::new())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let search = InMemorySearchService::new();
        Self::assemble(search.clone(), search, settings)
    }

    /// Wires the factory around a wrapping search service while keeping the
    /// in-memory engine behind it reachable for assertions.
    pub fn with_search(
        inspectable: Arc<InMemorySearchService>,
        search: Arc<dyn SearchService>,
        settings: Settings,
    ) -> Self {
        Self::assemble(inspectable, search, settings)
    }

    fn assemble(
        inspectable: Arc<InMemorySearchService>,
        search: Arc<dyn SearchService>,
        settings: Settings,
    ) -> Self {
        let registry = Arc::new(DecoratorRegistry::new());
        let queue = Arc::new(ReindexQueue::new());
        let permissions = Arc::new(StaticPermissions::elevated("admin"));
        let listeners = Arc::new(ListenerRegistry::new());
        let data_service = DataService::new();
        let factory = RepositoryDecoratorFactory::new(
            Arc::clone(&registry),
            search,
            queue.clone(),
            permissions.clone(),
            Arc::new(SimpleEvaluator::new()),
            Arc::new(SequenceIds::new()),
            Arc::clone(&listeners),
            Arc::clone(&data_service),
            settings,
        );
        Self {
            registry,
            search: inspectable,
            queue,
            permissions,
            listeners,
            data_service,
            factory,
        }
    }

    /// Decorates a raw repository and registers the result.
    pub fn wire(&self, raw: Box<dyn Repository>) -> Arc<dyn Repository> {
        let decorated: Arc<dyn Repository> =
            Arc::from(self.factory.create_decorated(raw).unwrap());
        self.data_service.register(Arc::clone(&decorated)).unwrap();
        decorated
    }

    pub fn wire_memory(&self, meta: Arc<EntityTypeMetadata>) -> Arc<dyn Repository> {
        self.wire(Box::new(MemoryRepository::new(meta)))
    }
}

pub fn person_meta() -> Arc<EntityTypeMetadata> {
    EntityTypeBuilder::new("person", "memory")
        .attribute(
            AttributeMetadata::new("id", DataType::Text)
                .nillable(false)
                .auto(),
        )
        .attribute(AttributeMetadata::new("firstName", DataType::Text))
        .attribute(AttributeMetadata::new("lastName", DataType::Text))
        .attribute(AttributeMetadata::new("email", DataType::Text).unique())
        .attribute(AttributeMetadata::new("age", DataType::Int))
        .attribute(
            AttributeMetadata::new("fullName", DataType::Text)
                .computed("firstName + ' ' + lastName"),
        )
        .id_attribute("id")
        .build()
        .unwrap()
}

/// Call counters for the raw primary store, shared with the test.
#[derive(Default)]
pub struct PrimaryCalls {
    pub finds: AtomicUsize,
    pub queries: AtomicUsize,
    pub counts: AtomicUsize,
    pub writes: AtomicUsize,
}

impl PrimaryCalls {
    pub fn total(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
            + self.queries.load(Ordering::SeqCst)
            + self.counts.load(Ordering::SeqCst)
            + self.writes.load(Ordering::SeqCst)
    }
}

/// Raw primary store that records which operations reach it. The wrapped
/// memory store stays shared with the test so it can bypass the chain.
pub struct RecordingRepository {
    inner: Arc<MemoryRepository>,
    pub calls: Arc<PrimaryCalls>,
}

impl RecordingRepository {
    pub fn create(
        meta: Arc<EntityTypeMetadata>,
    ) -> (Box<dyn Repository>, Arc<PrimaryCalls>, Arc<MemoryRepository>) {
        let calls = Arc::new(PrimaryCalls::default());
        let store = Arc::new(MemoryRepository::new(meta));
        let repo = Self {
            inner: Arc::clone(&store),
            calls: Arc::clone(&calls),
        };
        (Box::new(repo), calls, store)
    }
}

impl RepositoryDecorator for RecordingRepository {
    fn inner(&self) -> &dyn Repository {
        self.inner.as_ref()
    }

    fn decorator_name(&self) -> &'static str {
        "Recording"
    }

    fn find_one(&self, id: &Value) -> Result<Option<Entity>> {
        self.calls.finds.fetch_add(1, Ordering::SeqCst);
        self.inner.find_one(id)
    }

    fn find_all(&self, query: &Query) -> Result<Vec<Entity>> {
        self.calls.queries.fetch_add(1, Ordering::SeqCst);
        self.inner.find_all(query)
    }

    fn count(&self, query: &Query) -> Result<u64> {
        self.calls.counts.fetch_add(1, Ordering::SeqCst);
        self.inner.count(query)
    }

    fn add(&self, entity: Entity) -> Result<Entity> {
        self.calls.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.add(entity)
    }

    fn add_all(&self, entities: Vec<Entity>) -> Result<Vec<Entity>> {
        self.calls.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.add_all(entities)
    }

    fn update(&self, entity: Entity) -> Result<()> {
        self.calls.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.update(entity)
    }

    fn update_all(&self, entities: Vec<Entity>) -> Result<()> {
        self.calls.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.update_all(entities)
    }

    fn delete_by_id(&self, id: &Value) -> Result<()> {
        self.calls.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_by_id(id)
    }

    fn delete_all(&self, ids: &[Value]) -> Result<()> {
        self.calls.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_all(ids)
    }

    fn clear(&self) -> Result<()> {
        self.calls.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.clear()
    }
}

/// Search service whose mutation side can be switched to fail, for
/// compensation tests. Reads keep working against the wrapped engine.
pub struct FlakySearchService {
    inner: Arc<InMemorySearchService>,
    pub fail_mutations: AtomicBool,
}

impl FlakySearchService {
    pub fn new(inner: Arc<InMemorySearchService>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            fail_mutations: AtomicBool::new(false),
        })
    }

    pub fn break_mutations(&self) {
        self.fail_mutations.store(true, Ordering::SeqCst);
    }

    pub fn repair(&self) {
        self.fail_mutations.store(false, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.fail_mutations.load(Ordering::SeqCst) {
            Err(metastore::DataError::Backend(
                "index engine unavailable".into(),
            ))
        } else {
            Ok(())
        }
    }
}

impl SearchService for FlakySearchService {
    fn search(&self, meta: &EntityTypeMetadata, query: &Query) -> Result<Vec<Entity>> {
        self.inner.search(meta, query)
    }

    fn count(&self, meta: &EntityTypeMetadata, query: &Query) -> Result<u64> {
        self.inner.count(meta, query)
    }

    fn get(&self, meta: &EntityTypeMetadata, id: &Value) -> Result<Option<Entity>> {
        self.inner.get(meta, id)
    }

    fn aggregate(
        &self,
        meta: &EntityTypeMetadata,
        attribute: &str,
        query: &Query,
    ) -> Result<Vec<(Value, u64)>> {
        self.inner.aggregate(meta, attribute, query)
    }

    fn index(
        &self,
        meta: &EntityTypeMetadata,
        entities: &[Entity],
        mode: IndexingMode,
    ) -> Result<()> {
        self.check()?;
        self.inner.index(meta, entities, mode)
    }

    fn delete_by_ids(&self, meta: &EntityTypeMetadata, ids: &[Value]) -> Result<()> {
        self.check()?;
        self.inner.delete_by_ids(meta, ids)
    }

    fn delete_all(&self, meta: &EntityTypeMetadata) -> Result<()> {
        self.check()?;
        self.inner.delete_all(meta)
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Listener that remembers the records carried by update events.
#[derive(Default)]
pub struct UpdateLog {
    updates: Mutex<Vec<Entity>>,
}

impl UpdateLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn updated(&self) -> Vec<Entity> {
        self.updates.lock().unwrap().clone()
    }
}

impl ChangeListener for UpdateLog {
    fn entity_changed(&self, event: &ChangeEvent) -> Result<()> {
        if event.kind == ChangeKind::Updated {
            self.updates
                .lock()
                .unwrap()
                .extend(event.entities.iter().cloned());
        }
        Ok(())
    }
}

/// Replays queued reindex actions against the index, the way the external
/// worker would.
pub fn consume_reindex_actions(bed: &TestBed, primary: &dyn Repository) {
    let meta = primary.metadata();
    for action in bed.queue.drain() {
        match action.scope {
            metastore::ReindexScope::All => {
                bed.search.delete_all(&meta).unwrap();
            }
            metastore::ReindexScope::Ids(ids) => {
                for id in ids {
                    // At-least-once semantics: the worker re-reads the
                    // primary store and upserts or deletes accordingly.
                    match primary.find_one(&id).unwrap() {
                        Some(entity) => bed
                            .search
                            .index(&meta, &[entity], IndexingMode::Update)
                            .unwrap(),
                        None => bed.search.delete_by_ids(&meta, &[id]).unwrap(),
                    }
                }
            }
        }
    }
}
