//! The core decorators applied by the factory.
//!
//! Each decorator wraps one inner repository and adds a single cross-cutting
//! behavior; the factory composes them in a fixed, metadata-dependent order
//! (see [`crate::factory`]). None of them hold a lock across a delegated
//! call.

pub mod auto_value;
pub mod computed;
pub mod indexed;
pub mod listener;
pub mod owned;
pub mod reference;
pub mod reindex;
pub mod security;
pub mod system_account;
pub mod validation;

pub use auto_value::AutoValueDecorator;
pub use computed::ComputedValueDecorator;
pub use indexed::IndexRoutingDecorator;
pub use listener::{
    ChangeEvent, ChangeKind, ChangeListener, ChangeListenerDecorator, ListenerRegistry,
};
pub use owned::OwnershipDecorator;
pub use reference::ReferenceResolverDecorator;
pub use reindex::ReindexActionDecorator;
pub use security::SecurityDecorator;
pub use system_account::SystemAccountDecorator;
pub use validation::ValidationDecorator;
