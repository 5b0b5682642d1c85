mod common;

use metastore::{
    Entity, InMemorySearchService, Query, ReindexScope, Repository, Settings, Value,
};

use common::{consume_reindex_actions, person_meta, FlakySearchService, RecordingRepository, TestBed};

fn person(id: &str) -> Entity {
    Entity::new()
        .with("id", id)
        .with("firstName", id)
        .with("lastName", "Tester")
}

#[test]
fn test_reads_are_answered_by_the_index() {
    let bed = TestBed::new();
    let (raw, calls, _store) = RecordingRepository::create(person_meta());
    let repo = bed.wire(raw);

    let stored = repo.add(person("p1")).unwrap();
    let id = stored.get("id").cloned().unwrap();

    // The write path probes the primary store for uniqueness; only the
    // caller-facing reads below are measured.
    let queries_before = calls.queries.load(std::sync::atomic::Ordering::SeqCst);

    repo.find_one(&id).unwrap().unwrap();
    assert_eq!(repo.find_all(&Query::new()).unwrap().len(), 1);
    assert_eq!(repo.count(&Query::new()).unwrap(), 1);
    repo.aggregate("lastName", &Query::new()).unwrap();

    // Every read above was served by the search engine.
    assert_eq!(calls.finds.load(std::sync::atomic::Ordering::SeqCst), 0);
    assert_eq!(
        calls.queries.load(std::sync::atomic::Ordering::SeqCst),
        queries_before
    );
    assert_eq!(calls.counts.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[test]
fn test_single_mutation_updates_index_synchronously() {
    let bed = TestBed::new();
    let repo = bed.wire_memory(person_meta());

    repo.add(person("p1")).unwrap();
    assert_eq!(bed.search.document_count("person"), 1);
    assert!(bed.queue.is_empty());

    repo.delete_by_id(&Value::Text("p1".into())).unwrap();
    assert_eq!(bed.search.document_count("person"), 0);
    assert!(bed.queue.is_empty());
}

#[test]
fn test_batch_mutation_enqueues_one_action() {
    let bed = TestBed::new();
    let repo = bed.wire_memory(person_meta());

    repo.add_all(vec![person("p1"), person("p2"), person("p3")])
        .unwrap();

    // Above the sync threshold nothing touches the index inline.
    assert_eq!(bed.search.document_count("person"), 0);
    let actions = bed.queue.drain();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].entity_type_name, "person");
    match &actions[0].scope {
        ReindexScope::Ids(ids) => assert_eq!(ids.len(), 3),
        other => panic!("expected id scope, got {:?}", other),
    }
}

#[test]
fn test_sync_threshold_is_tunable() {
    let bed = TestBed::with_settings(Settings::new().index_sync_threshold(10));
    let repo = bed.wire_memory(person_meta());

    repo.add_all(vec![person("p1"), person("p2"), person("p3")])
        .unwrap();

    assert_eq!(bed.search.document_count("person"), 3);
    assert!(bed.queue.is_empty());
}

#[test]
fn test_clear_enqueues_full_reindex() {
    let bed = TestBed::new();
    let (raw, _calls, store) = RecordingRepository::create(person_meta());
    let repo = bed.wire(raw);

    repo.add(person("p1")).unwrap();
    repo.clear().unwrap();

    let actions = bed.queue.drain();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].scope, ReindexScope::All);
    assert_eq!(store.count(&Query::new()).unwrap(), 0);
}

#[test]
fn test_index_failure_never_fails_the_write() {
    let engine = InMemorySearchService::new();
    let flaky = FlakySearchService::new(engine.clone());
    let bed = TestBed::with_search(engine, flaky.clone(), Settings::new());
    let (raw, _calls, store) = RecordingRepository::create(person_meta());
    let repo = bed.wire(raw);

    repo.add(person("p1")).unwrap();
    assert_eq!(bed.search.document_count("person"), 1);

    flaky.break_mutations();
    repo.add(person("p2")).unwrap();

    // The write landed in the primary store; the missed index update was
    // compensated with a queued action.
    assert_eq!(store.count(&Query::new()).unwrap(), 2);
    assert_eq!(bed.search.document_count("person"), 1);
    assert_eq!(bed.queue.len(), 1);

    flaky.repair();
    consume_reindex_actions(&bed, store.as_ref());
    assert_eq!(bed.search.document_count("person"), 2);
}

#[test]
fn test_worker_consumption_makes_batch_visible() {
    let bed = TestBed::new();
    let (raw, _calls, store) = RecordingRepository::create(person_meta());
    let repo = bed.wire(raw);

    repo.add_all(vec![person("p1"), person("p2"), person("p3")])
        .unwrap();
    assert_eq!(repo.find_all(&Query::new()).unwrap().len(), 0);

    consume_reindex_actions(&bed, store.as_ref());
    assert_eq!(repo.find_all(&Query::new()).unwrap().len(), 3);
    assert_eq!(repo.count(&Query::new()).unwrap(), 3);
}

#[test]
fn test_rebuild_index_rederives_from_primary_store() {
    let bed = TestBed::new();
    let (raw, _calls, store) = RecordingRepository::create(person_meta());
    let repo = bed.wire(raw);

    repo.add_all(vec![person("p1"), person("p2")]).unwrap();
    bed.queue.drain();
    assert_eq!(bed.search.document_count("person"), 0);

    repo.rebuild_index().unwrap();
    assert_eq!(bed.search.document_count("person"), 2);
    assert_eq!(store.count(&Query::new()).unwrap(), 2);
}

#[test]
fn test_update_keeps_index_in_step() {
    let bed = TestBed::new();
    let repo = bed.wire_memory(person_meta());

    repo.add(person("p1")).unwrap();
    let mut changed = person("p1");
    changed.set("lastName", "Changed");
    repo.update(changed).unwrap();

    let hits = repo
        .find_all(&Query::new().eq("lastName", "Changed"))
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].get("id"), Some(&Value::Text("p1".into())));
}
