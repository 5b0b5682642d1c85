use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::Value;

/// Which part of an entity type's index a rebuild covers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReindexScope {
    Ids(Vec<Value>),
    #[serde(rename = "ALL")]
    All,
}

/// Queued instruction: "rebuild entity type X's index for these ids (or in
/// full)". Consumed asynchronously by an out-of-process worker; delivery is
/// at-least-once, so consumers must be idempotent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReindexAction {
    pub entity_type_name: String,
    pub scope: ReindexScope,
    pub enqueued_at: DateTime<Utc>,
}

impl ReindexAction {
    pub fn ids(entity_type_name: impl Into<String>, ids: Vec<Value>) -> Self {
        Self {
            entity_type_name: entity_type_name.into(),
            scope: ReindexScope::Ids(ids),
            enqueued_at: Utc::now(),
        }
    }

    pub fn full(entity_type_name: impl Into<String>) -> Self {
        Self {
            entity_type_name: entity_type_name.into(),
            scope: ReindexScope::All,
            enqueued_at: Utc::now(),
        }
    }
}

/// Accepts reindex actions, fire-and-forget.
///
/// Enqueueing must not fail the caller's mutation; implementations swallow
/// their own errors.
pub trait ReindexActionSink: Send + Sync {
    fn enqueue(&self, action: ReindexAction);
}

/// In-process action queue drained by the reindexing worker.
#[derive(Default)]
pub struct ReindexQueue {
    actions: Mutex<VecDeque<ReindexAction>>,
}

impl ReindexQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.actions.lock().map(|q| q.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes and returns all queued actions, oldest first.
    pub fn drain(&self) -> Vec<ReindexAction> {
        self.actions
            .lock()
            .map(|mut q| q.drain(..).collect())
            .unwrap_or_default()
    }
}

impl ReindexActionSink for ReindexQueue {
    fn enqueue(&self, action: ReindexAction) {
        match self.actions.lock() {
            Ok(mut queue) => queue.push_back(action),
            Err(err) => {
                tracing::warn!("reindex queue poisoned, dropping action: {}", err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enqueue_and_drain_in_order() {
        let queue = ReindexQueue::new();
        queue.enqueue(ReindexAction::ids("person", vec!["p1".into()]));
        queue.enqueue(ReindexAction::full("person"));

        assert_eq!(queue.len(), 2);
        let drained = queue.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].scope, ReindexScope::Ids(vec!["p1".into()]));
        assert_eq!(drained[1].scope, ReindexScope::All);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_action_serializes_full_scope_as_all() {
        let action = ReindexAction::full("person");
        let json = serde_json::to_string(&action).unwrap();
        assert!(json.contains("\"ALL\""));
        let back: ReindexAction = serde_json::from_str(&json).unwrap();
        assert_eq!(back.scope, ReindexScope::All);
    }
}
