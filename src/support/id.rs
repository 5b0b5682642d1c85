use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

use crate::core::Value;

/// Supplies fresh identifiers for auto attributes.
///
/// Must be collision-free across concurrent callers for the same entity
/// type. Generation is not idempotent: a retried `add` draws a new id.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self, entity_type_name: &str) -> Value;
}

/// Default generator: random v4 UUIDs.
#[derive(Debug, Default)]
pub struct UuidGenerator;

impl UuidGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl IdGenerator for UuidGenerator {
    fn next_id(&self, _entity_type_name: &str) -> Value {
        Value::Text(Uuid::new_v4().simple().to_string())
    }
}

/// Deterministic generator for tests: `<type>-1`, `<type>-2`, …
#[derive(Debug, Default)]
pub struct SequenceIds {
    counter: AtomicU64,
}

impl SequenceIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SequenceIds {
    fn next_id(&self, entity_type_name: &str) -> Value {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        Value::Text(format!("{}-{}", entity_type_name, n))
    }
}
