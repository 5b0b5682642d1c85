//! Builds the single decorated repository the rest of the system uses.
//!
//! The decoration order is a fixed total order of concerns, each gated by a
//! metadata predicate. Layers are listed innermost-applied-first; the layer
//! applied last becomes the outermost boundary a caller hits first.

pub mod registry;

pub use registry::{DecoratorBuilder, DecoratorRegistry};

use std::sync::Arc;

use crate::core::{DataError, Result};
use crate::decorators::{
    AutoValueDecorator, ChangeListenerDecorator, ComputedValueDecorator, IndexRoutingDecorator,
    ListenerRegistry, OwnershipDecorator, ReferenceResolverDecorator, ReindexActionDecorator,
    SecurityDecorator, SystemAccountDecorator, ValidationDecorator,
};
use crate::index::{ReindexActionSink, SearchService};
use crate::meta::{EntityTypeMetadata, WellKnownType, INDEX_BACKEND};
use crate::repo::{Repository, RepositoryCollection, RepositoryHandle};
use crate::service::DataService;
use crate::settings::Settings;
use crate::support::{ExpressionEvaluator, IdGenerator, PermissionChecker};

/// Wires raw repositories into their decorated form.
///
/// Runs once per entity type at wiring time (or at dynamic registration
/// time); the construction pass itself is not concurrent-safe, the product
/// is.
pub struct RepositoryDecoratorFactory {
    registry: Arc<DecoratorRegistry>,
    search: Arc<dyn SearchService>,
    reindex_sink: Arc<dyn ReindexActionSink>,
    permissions: Arc<dyn PermissionChecker>,
    expressions: Arc<dyn ExpressionEvaluator>,
    ids: Arc<dyn IdGenerator>,
    listeners: Arc<ListenerRegistry>,
    data_service: Arc<DataService>,
    settings: Settings,
}

impl RepositoryDecoratorFactory {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<DecoratorRegistry>,
        search: Arc<dyn SearchService>,
        reindex_sink: Arc<dyn ReindexActionSink>,
        permissions: Arc<dyn PermissionChecker>,
        expressions: Arc<dyn ExpressionEvaluator>,
        ids: Arc<dyn IdGenerator>,
        listeners: Arc<ListenerRegistry>,
        data_service: Arc<DataService>,
        settings: Settings,
    ) -> Self {
        Self {
            registry,
            search,
            reindex_sink,
            permissions,
            expressions,
            ids,
            listeners,
            data_service,
            settings,
        }
    }

    pub fn data_service(&self) -> &Arc<DataService> {
        &self.data_service
    }

    pub fn listeners(&self) -> &Arc<ListenerRegistry> {
        &self.listeners
    }

    /// Applies the fixed decoration order to a raw repository.
    pub fn create_decorated(&self, repository: Box<dyn Repository>) -> Result<Box<dyn Repository>> {
        let meta = repository.metadata();
        self.check_metadata(&meta)?;

        // Kept aside for layers that must read the store beneath the whole
        // chain: uniqueness probes and post-update notification reads.
        let primary: Arc<dyn Repository> = Arc::from(repository);

        // Extension point first, so contributed layers sit closest to the
        // raw store.
        let mut decorated = self
            .registry
            .decorate(Box::new(RepositoryHandle::new(Arc::clone(&primary))))?;

        if meta.backend() != INDEX_BACKEND {
            decorated = Box::new(IndexRoutingDecorator::new(
                decorated,
                Arc::clone(&self.search),
            ));
            decorated = Box::new(ReindexActionDecorator::new(
                decorated,
                Arc::clone(&self.search),
                Arc::clone(&self.reindex_sink),
                self.settings.index_sync_threshold,
            ));
        }

        if meta.well_known() == Some(WellKnownType::SystemAccount) {
            decorated = Box::new(SystemAccountDecorator::new(decorated));
        }

        if meta.is_ownable() {
            decorated = Box::new(OwnershipDecorator::new(
                decorated,
                Arc::clone(&self.permissions),
            ));
        }

        decorated = Box::new(ReferenceResolverDecorator::new(
            decorated,
            Arc::clone(&self.data_service),
            self.settings.default_fetch_depth,
        ));

        decorated = Box::new(ComputedValueDecorator::new(
            decorated,
            Arc::clone(&self.expressions),
        ));

        decorated = Box::new(ChangeListenerDecorator::new(
            decorated,
            Arc::clone(&self.listeners),
            Arc::clone(&primary),
        ));

        decorated = Box::new(ValidationDecorator::new(
            decorated,
            Arc::clone(&self.expressions),
            Arc::clone(&primary),
        ));

        decorated = Box::new(AutoValueDecorator::new(decorated, Arc::clone(&self.ids)));

        // Security last, so it is the first check any caller encounters.
        decorated = Box::new(SecurityDecorator::new(
            decorated,
            Arc::clone(&self.permissions),
        ));

        Ok(decorated)
    }

    /// Creates the raw repository on its backend, decorates it and registers
    /// the decorated form in the data service.
    pub fn register_entity_type(
        &self,
        backend: &dyn RepositoryCollection,
        meta: Arc<EntityTypeMetadata>,
    ) -> Result<Arc<dyn Repository>> {
        if meta.backend() != backend.name() {
            return Err(DataError::configuration(
                meta.name(),
                format!(
                    "entity type declares backend '{}' but was registered on '{}'",
                    meta.backend(),
                    backend.name()
                ),
            ));
        }
        let raw = backend.create_repository(meta)?;
        let decorated: Arc<dyn Repository> = Arc::from(self.create_decorated(raw)?);
        self.data_service.register(Arc::clone(&decorated))?;
        Ok(decorated)
    }

    /// Metadata problems surface here, at wiring time, never at first use.
    fn check_metadata(&self, meta: &EntityTypeMetadata) -> Result<()> {
        if meta.attribute(meta.id_attribute()).is_none() {
            return Err(DataError::configuration(
                meta.name(),
                format!("id attribute '{}' is not declared", meta.id_attribute()),
            ));
        }
        for attr in meta.attributes() {
            if attr.data_type() == crate::core::DataType::Xref && attr.ref_entity().is_none() {
                return Err(DataError::configuration(
                    meta.name(),
                    format!("xref attribute '{}' names no target type", attr.name()),
                ));
            }
        }
        Ok(())
    }
}
