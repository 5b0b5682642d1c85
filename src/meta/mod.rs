//! Entity type metadata: the shape of a collection.
//!
//! Metadata is immutable once built; all structural invariants (unique
//! attribute names, existing id attribute, terminating `extends` chain) are
//! enforced by [`EntityTypeBuilder::build`], so a constructed
//! [`EntityTypeMetadata`] can be shared freely behind an `Arc`.

pub mod attribute;
pub mod entity_type;

pub use attribute::AttributeMetadata;
pub use entity_type::{EntityTypeBuilder, EntityTypeMetadata, WellKnownType};

/// Name of the trait type whose descendants carry an owner identity.
pub const OWNED_ENTITY: &str = "sys_Owned";

/// Attribute on [`OWNED_ENTITY`] holding the owning username.
pub const OWNER_ATTRIBUTE: &str = "ownerUsername";

/// Name of the privileged system account entity type.
pub const SYSTEM_ACCOUNT_ENTITY: &str = "sys_Account";

/// Derived, never-persisted attribute added by the system-account layer.
pub const QUALIFIED_NAME_ATTRIBUTE: &str = "qualifiedName";

/// Backend name of the search index engine itself.
pub const INDEX_BACKEND: &str = "search";

/// Backend name of the default primary store.
pub const DEFAULT_BACKEND: &str = "memory";

use std::sync::Arc;

use crate::core::{DataType, Result};

/// Builds the metadata of the ownable trait type.
///
/// Entity types become ownable by extending this type, which contributes the
/// owner attribute to their flattened attribute list.
pub fn owned_entity_metadata() -> Result<Arc<EntityTypeMetadata>> {
    EntityTypeBuilder::new(OWNED_ENTITY, DEFAULT_BACKEND)
        .attribute(AttributeMetadata::new("id", DataType::Text).nillable(false))
        .attribute(AttributeMetadata::new(OWNER_ATTRIBUTE, DataType::Text))
        .id_attribute("id")
        .abstract_type()
        .build()
}
