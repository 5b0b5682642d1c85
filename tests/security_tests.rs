mod common;

use metastore::{Action, DataError, Entity, Query, Repository, Value};

use common::{person_meta, RecordingRepository, TestBed};

fn ada() -> Entity {
    Entity::new()
        .with("firstName", "Ada")
        .with("lastName", "Lovelace")
}

#[test]
fn test_denied_write_never_reaches_the_store() {
    let bed = TestBed::new();
    let (raw, calls, _store) = RecordingRepository::create(person_meta());
    let repo = bed.wire(raw);

    bed.permissions.become_user("alice", false);
    let err = repo.add(ada()).unwrap_err();

    assert!(matches!(err, DataError::Authorization { .. }));
    assert_eq!(calls.total(), 0);
    assert!(bed.queue.is_empty());
    assert_eq!(bed.search.document_count("person"), 0);
}

#[test]
fn test_write_grant_does_not_imply_read() {
    let bed = TestBed::new();
    let repo = bed.wire_memory(person_meta());

    bed.permissions.become_user("alice", false);
    bed.permissions.grant("person", Action::Write);

    repo.add(ada()).unwrap();
    let err = repo.find_all(&Query::new()).unwrap_err();
    assert!(matches!(err, DataError::Authorization { .. }));
}

#[test]
fn test_count_requires_its_own_grant() {
    let bed = TestBed::new();
    let repo = bed.wire_memory(person_meta());

    bed.permissions.become_user("alice", false);
    bed.permissions.grant("person", Action::Read);
    bed.permissions.grant("person", Action::Write);

    assert!(repo.count(&Query::new()).is_err());
    bed.permissions.grant("person", Action::Count);
    assert_eq!(repo.count(&Query::new()).unwrap(), 0);
}

#[test]
fn test_rebuild_index_guarded_like_a_write() {
    let bed = TestBed::new();
    let repo = bed.wire_memory(person_meta());

    bed.permissions.become_user("alice", false);
    bed.permissions.grant("person", Action::Read);

    let err = repo.rebuild_index().unwrap_err();
    match err {
        DataError::Authorization { permission, .. } => assert_eq!(permission, "WRITE"),
        other => panic!("expected authorization error, got {}", other),
    }

    bed.permissions.grant("person", Action::Write);
    repo.rebuild_index().unwrap();
}

#[test]
fn test_authorization_error_names_type_and_permission() {
    let bed = TestBed::new();
    let repo = bed.wire_memory(person_meta());

    bed.permissions.become_user("alice", false);
    let err = repo.find_one(&Value::Text("p1".into())).unwrap_err();
    let rendered = err.to_string();
    assert!(rendered.contains("person"));
    assert!(rendered.contains("READ"));
}

#[test]
fn test_grants_are_per_entity_type() {
    let bed = TestBed::new();
    let people = bed.wire_memory(person_meta());
    let books = bed.wire_memory(
        metastore::EntityTypeBuilder::new("book", "memory")
            .attribute(
                metastore::AttributeMetadata::new("id", metastore::DataType::Text).nillable(false),
            )
            .attribute(metastore::AttributeMetadata::new(
                "title",
                metastore::DataType::Text,
            ))
            .id_attribute("id")
            .build()
            .unwrap(),
    );

    bed.permissions.become_user("alice", false);
    bed.permissions.grant("book", Action::Read);

    assert!(books.find_all(&Query::new()).is_ok());
    assert!(people.find_all(&Query::new()).is_err());
}
